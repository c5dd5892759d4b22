//! The driver object handed to applications
//!
//! [`SpiDevice`] ties a [`BusHandle`] to an [`Executor`]: configuration
//! calls are synchronous and run on the caller's thread, transfers are
//! validated on the caller's thread and executed on a worker.

use crate::bus::BusHandle;
use crate::config::SpiOptions;
use crate::error::{ConfigError, OpenError, Result, TransferError};
use crate::executor::{Executor, PendingTransfer};
use crate::io::SpidevIo;
use crate::spidev::Spidev;

use spibus_core::transfer::{TransferBatch, TransferRequest};

use std::path::Path;
use std::sync::Arc;

/// An open SPI device
///
/// Generic over the backend so the same driver runs against `/dev/spidevX.Y`
/// ([`Spidev`], the default) or an emulator.
pub struct SpiDevice<D: SpidevIo + 'static = Spidev> {
    bus: Arc<BusHandle<D>>,
    /// Pinned executor; `None` resolves one per submission
    executor: Option<Executor>,
}

impl SpiDevice<Spidev> {
    /// Open a spidev node with default options (mode 0, 8 bits, 1 MHz)
    pub fn open(path: impl AsRef<Path>) -> std::result::Result<Self, OpenError> {
        Self::open_with(path, &SpiOptions::default())
    }

    /// Open a spidev node and apply `options`
    ///
    /// If the options are invalid or the kernel rejects one of them, the
    /// device is closed again and the open fails with
    /// [`OpenError::InvalidConfig`].
    pub fn open_with(
        path: impl AsRef<Path>,
        options: &SpiOptions,
    ) -> std::result::Result<Self, OpenError> {
        let spidev = Spidev::open(path)?;
        Self::from_io(spidev, options)
    }
}

impl<D: SpidevIo + 'static> SpiDevice<D> {
    /// Build a device on an already opened backend and apply `options`
    pub fn from_io(io: D, options: &SpiOptions) -> std::result::Result<Self, OpenError> {
        let bus = BusHandle::new(io);

        if let Err(e) = bus.apply_options(options) {
            log::debug!("bus {}: initial configuration failed: {}", bus.name(), e);
            bus.close();
            return Err(OpenError::InvalidConfig(e));
        }

        log::info!(
            "Opened {} (mode={}, bits={}, speed={} kHz)",
            bus.name(),
            options.mode,
            options.bits_per_word,
            options.max_speed_hz / 1000
        );

        Ok(Self {
            bus: Arc::new(bus),
            executor: None,
        })
    }

    /// Build a device on an already opened backend, keeping its registers
    ///
    /// Nothing is validated or written. This lets a node left in a mode the
    /// setters refuse (`SPI_LOOP`, or `SPI_NO_CS` with `SPI_CS_HIGH`) be
    /// inspected and reconfigured.
    pub fn from_io_unconfigured(io: D) -> Self {
        let bus = BusHandle::new(io);
        log::info!("Opened {} (configuration unchanged)", bus.name());
        Self {
            bus: Arc::new(bus),
            executor: None,
        }
    }

    /// Run transfers on `executor` instead of the ambient runtime
    pub fn with_executor(mut self, executor: Executor) -> Self {
        self.executor = Some(executor);
        self
    }

    /// The underlying bus handle
    pub fn bus(&self) -> &Arc<BusHandle<D>> {
        &self.bus
    }

    /// Whether [`close`](Self::close) has not been called yet
    pub fn is_open(&self) -> bool {
        self.bus.is_open()
    }

    /// Current mode word
    pub fn mode(&self) -> std::result::Result<u8, ConfigError> {
        self.bus.mode()
    }

    /// Set the mode word
    pub fn set_mode(&self, mode: u8) -> std::result::Result<(), ConfigError> {
        self.bus.set_mode(mode)
    }

    /// Current word size
    pub fn bits_per_word(&self) -> std::result::Result<u8, ConfigError> {
        self.bus.bits_per_word()
    }

    /// Set the word size (1-32)
    pub fn set_bits_per_word(&self, bits: u32) -> std::result::Result<(), ConfigError> {
        self.bus.set_bits_per_word(bits)
    }

    /// Current maximum clock speed in Hz
    pub fn max_speed_hz(&self) -> std::result::Result<u32, ConfigError> {
        self.bus.max_speed_hz()
    }

    /// Set the maximum clock speed in Hz
    pub fn set_max_speed_hz(&self, speed_hz: u32) -> std::result::Result<(), ConfigError> {
        self.bus.set_max_speed_hz(speed_hz)
    }

    /// Validate `requests` and submit them as one transfer
    ///
    /// Validation happens here, on the caller's thread; an invalid segment
    /// fails the call before anything is queued. The returned
    /// [`PendingTransfer`] resolves to one receive buffer per request.
    pub fn transfer<I, R>(&self, requests: I) -> Result<PendingTransfer>
    where
        I: IntoIterator<Item = R>,
        R: Into<TransferRequest>,
    {
        if !self.bus.is_open() {
            return Err(TransferError::NotOpen.into());
        }

        let batch = TransferBatch::build(requests).map_err(TransferError::Invalid)?;
        let executor = self.executor.clone().unwrap_or_else(Executor::current);
        Ok(executor.submit(Arc::clone(&self.bus), batch))
    }

    /// Submit a transfer and block until it completes
    pub fn transfer_blocking<I, R>(&self, requests: I) -> Result<Vec<Vec<u8>>>
    where
        I: IntoIterator<Item = R>,
        R: Into<TransferRequest>,
    {
        Ok(self.transfer(requests)?.wait()?)
    }

    /// Release the lock and close the device
    ///
    /// Later calls fail with `NotOpen`. Closing twice is harmless.
    pub fn close(&self) {
        self.bus.close();
    }
}
