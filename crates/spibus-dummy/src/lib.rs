//! spibus-dummy - In-memory spidev emulator for testing
//!
//! This crate provides a [`SpidevIo`] backend that emulates the spidev
//! driver in memory. It keeps the three configuration registers, counts
//! every kernel call, records when each transfer ran, and can connect MOSI
//! to MISO so transmitted bytes come back. It's useful for testing and
//! development without real hardware.

use spibus_core::transfer::{SegmentSettings, TransferBatch};
use spibus_core::Mode;
use spibus_linux::SpidevIo;

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// `EINVAL` as returned by the spidev driver for rejected settings
const EINVAL: i32 = 22;

/// Configuration for the dummy device
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Name reported to the driver
    pub name: String,
    /// Mode register at power-up
    pub mode: u8,
    /// Word size register at power-up
    pub bits_per_word: u8,
    /// Speed register at power-up
    pub max_speed_hz: u32,
    /// Fastest clock the emulated controller accepts
    pub speed_limit_hz: u32,
    /// MOSI wired to MISO
    pub loopback: bool,
    /// Byte read back when nothing drives MISO
    pub miso_fill: u8,
    /// Time each transfer spends "on the wire"
    pub transfer_latency: Duration,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            name: "dummy".to_string(),
            mode: 0,
            bits_per_word: 8,
            max_speed_hz: 500_000,
            speed_limit_hz: 50_000_000,
            loopback: false,
            miso_fill: 0xFF,
            transfer_latency: Duration::ZERO,
        }
    }
}

impl DummyConfig {
    /// Connect or disconnect the loopback wire
    pub fn with_loopback(mut self, loopback: bool) -> Self {
        self.loopback = loopback;
        self
    }

    /// Make every transfer take at least `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.transfer_latency = latency;
        self
    }

    /// Limit the accepted clock speed
    pub fn with_speed_limit(mut self, speed_limit_hz: u32) -> Self {
        self.speed_limit_hz = speed_limit_hz;
        self
    }
}

/// Number of kernel calls seen, per operation
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub mode_reads: usize,
    pub mode_writes: usize,
    pub bits_reads: usize,
    pub bits_writes: usize,
    pub speed_reads: usize,
    pub speed_writes: usize,
    pub transfers: usize,
}

impl CallCounts {
    /// All configuration writes
    pub fn writes(&self) -> usize {
        self.mode_writes + self.bits_writes + self.speed_writes
    }
}

/// One completed `SPI_IOC_MESSAGE` call
#[derive(Debug, Clone)]
pub struct TransferRecord {
    /// When the call entered the emulator
    pub start: Instant,
    /// When it returned
    pub end: Instant,
    /// Length and overrides of each segment, in order
    pub segments: Vec<(usize, SegmentSettings)>,
}

#[derive(Debug)]
struct Shared {
    mode: u8,
    bits_per_word: u8,
    max_speed_hz: u32,
    counts: CallCounts,
    /// Names of the registers written, in order
    write_log: Vec<&'static str>,
    records: Vec<TransferRecord>,
    fail_next_transfer: Option<i32>,
    in_flight: usize,
    max_in_flight: usize,
    released: bool,
}

/// Dummy spidev device
///
/// Hand it to [`spibus_linux::SpiDevice::from_io`]; keep a [`DummyProbe`]
/// (from [`probe`](Self::probe)) to inspect it afterwards.
pub struct DummySpidev {
    config: DummyConfig,
    shared: Arc<Mutex<Shared>>,
}

impl DummySpidev {
    /// Create a new dummy device with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let shared = Shared {
            mode: config.mode,
            bits_per_word: config.bits_per_word,
            max_speed_hz: config.max_speed_hz,
            counts: CallCounts::default(),
            write_log: Vec::new(),
            records: Vec::new(),
            fail_next_transfer: None,
            in_flight: 0,
            max_in_flight: 0,
            released: false,
        };
        Self {
            config,
            shared: Arc::new(Mutex::new(shared)),
        }
    }

    /// Create a new dummy device with default configuration
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// A handle for observing this device after it has been moved
    pub fn probe(&self) -> DummyProbe {
        DummyProbe {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    fn shared(&self) -> MutexGuard<'_, Shared> {
        lock(&self.shared)
    }
}

impl Drop for DummySpidev {
    fn drop(&mut self) {
        self.shared().released = true;
    }
}

impl SpidevIo for DummySpidev {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn read_mode(&mut self) -> io::Result<u8> {
        let mut s = self.shared();
        s.counts.mode_reads += 1;
        Ok(s.mode)
    }

    fn write_mode(&mut self, mode: u8) -> io::Result<()> {
        let mut s = self.shared();
        s.counts.mode_writes += 1;
        s.write_log.push("mode");
        s.mode = mode;
        Ok(())
    }

    fn read_bits_per_word(&mut self) -> io::Result<u8> {
        let mut s = self.shared();
        s.counts.bits_reads += 1;
        Ok(s.bits_per_word)
    }

    fn write_bits_per_word(&mut self, bits: u8) -> io::Result<()> {
        let mut s = self.shared();
        s.counts.bits_writes += 1;
        if bits == 0 || bits > 32 {
            return Err(io::Error::from_raw_os_error(EINVAL));
        }
        s.write_log.push("bits_per_word");
        s.bits_per_word = bits;
        Ok(())
    }

    fn read_max_speed_hz(&mut self) -> io::Result<u32> {
        let mut s = self.shared();
        s.counts.speed_reads += 1;
        Ok(s.max_speed_hz)
    }

    fn write_max_speed_hz(&mut self, speed_hz: u32) -> io::Result<()> {
        let mut s = self.shared();
        s.counts.speed_writes += 1;
        if speed_hz > self.config.speed_limit_hz {
            return Err(io::Error::from_raw_os_error(EINVAL));
        }
        s.write_log.push("max_speed_hz");
        s.max_speed_hz = speed_hz;
        Ok(())
    }

    fn transfer(&mut self, batch: &mut TransferBatch) -> io::Result<()> {
        let start = Instant::now();
        let loopback = {
            let mut s = self.shared();
            s.counts.transfers += 1;
            if let Some(errno) = s.fail_next_transfer.take() {
                return Err(io::Error::from_raw_os_error(errno));
            }
            s.in_flight += 1;
            s.max_in_flight = s.max_in_flight.max(s.in_flight);
            self.config.loopback || Mode::from_bits_truncate(s.mode).contains(Mode::LOOP)
        };

        // Sleep outside the lock so overlapping callers would be visible
        if !self.config.transfer_latency.is_zero() {
            thread::sleep(self.config.transfer_latency);
        }

        let mut segments = Vec::with_capacity(batch.len());
        for segment in batch.segments_mut() {
            segments.push((segment.len(), *segment.settings()));
            let (tx, rx) = segment.buffers_mut();
            if loopback {
                rx.copy_from_slice(tx);
            } else {
                rx.fill(self.config.miso_fill);
            }
        }

        let mut s = self.shared();
        s.in_flight -= 1;
        s.records.push(TransferRecord {
            start,
            end: Instant::now(),
            segments,
        });
        log::trace!("dummy: transfer #{} done", s.counts.transfers);
        Ok(())
    }
}

/// Observer for a [`DummySpidev`] that has been handed to a driver
#[derive(Clone)]
pub struct DummyProbe {
    shared: Arc<Mutex<Shared>>,
}

impl DummyProbe {
    /// Kernel calls seen so far
    pub fn counts(&self) -> CallCounts {
        lock(&self.shared).counts
    }

    /// Forget the calls seen so far
    pub fn reset_counts(&self) {
        let mut s = lock(&self.shared);
        s.counts = CallCounts::default();
        s.write_log.clear();
    }

    /// Registers written, in order
    pub fn write_log(&self) -> Vec<&'static str> {
        lock(&self.shared).write_log.clone()
    }

    /// Mode register, without counting a read
    pub fn mode(&self) -> u8 {
        lock(&self.shared).mode
    }

    /// Word size register, without counting a read
    pub fn bits_per_word(&self) -> u8 {
        lock(&self.shared).bits_per_word
    }

    /// Speed register, without counting a read
    pub fn max_speed_hz(&self) -> u32 {
        lock(&self.shared).max_speed_hz
    }

    /// Completed transfers, in completion order
    pub fn records(&self) -> Vec<TransferRecord> {
        lock(&self.shared).records.clone()
    }

    /// Most transfers ever inside the emulator at once
    pub fn max_concurrency(&self) -> usize {
        lock(&self.shared).max_in_flight
    }

    /// Make the next transfer fail with `errno`
    pub fn fail_next_transfer(&self, errno: i32) {
        lock(&self.shared).fail_next_transfer = Some(errno);
    }

    /// Whether the driver has dropped the device
    pub fn is_released(&self) -> bool {
        lock(&self.shared).released
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spibus_core::validate;
    use spibus_core::{Field, ValidationError};
    use spibus_linux::{
        ConfigError, Error, Executor, OpenError, SpiDevice, SpiOptions, TransferError,
        TransferRequest, TransferState,
    };

    const EIO: i32 = 5;

    fn open(config: DummyConfig) -> (SpiDevice<DummySpidev>, DummyProbe) {
        let dev = DummySpidev::new(config);
        let probe = dev.probe();
        let spi = SpiDevice::from_io(dev, &SpiOptions::default()).unwrap();
        probe.reset_counts();
        (spi, probe)
    }

    #[test]
    fn test_set_mode_round_trip() {
        let (spi, _probe) = open(DummyConfig::default());
        for mode in 0..=u8::MAX {
            if validate::validate_mode(mode.into()).is_err() {
                assert!(spi.set_mode(mode).is_err());
                continue;
            }
            spi.set_mode(mode).unwrap();
            assert_eq!(spi.mode().unwrap(), mode);
        }
    }

    #[test]
    fn test_rejected_mode_leaves_register_alone() {
        let (spi, probe) = open(DummyConfig::default());
        spi.set_mode(Mode::MODE_2.bits()).unwrap();
        probe.reset_counts();

        let err = spi.set_mode((Mode::NO_CS | Mode::CS_HIGH).bits()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(ValidationError::ConflictingModeFlags)
        ));
        let err = spi.set_mode(Mode::LOOP.bits()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(ValidationError::LoopbackNotAllowed)
        ));

        assert_eq!(probe.mode(), Mode::MODE_2.bits());
        assert_eq!(probe.counts(), CallCounts::default());
    }

    #[test]
    fn test_bits_per_word_range() {
        let (spi, probe) = open(DummyConfig::default());
        for bits in 1..=32 {
            spi.set_bits_per_word(bits).unwrap();
            assert_eq!(spi.bits_per_word().unwrap() as u32, bits);
        }

        probe.reset_counts();
        for bits in [0, 33] {
            let err = spi.set_bits_per_word(bits).unwrap_err();
            assert!(matches!(
                err,
                ConfigError::Invalid(ValidationError::OutOfRange {
                    field: Field::BitsPerWord,
                    ..
                })
            ));
        }
        assert_eq!(probe.bits_per_word(), 32);
        assert_eq!(probe.counts().writes(), 0);
    }

    #[test]
    fn test_speed() {
        let (spi, probe) = open(DummyConfig::default());
        spi.set_max_speed_hz(8_000_000).unwrap();
        assert_eq!(spi.max_speed_hz().unwrap(), 8_000_000);
        assert!(matches!(
            spi.set_max_speed_hz(0),
            Err(ConfigError::Invalid(_))
        ));
        assert_eq!(probe.max_speed_hz(), 8_000_000);
    }

    #[test]
    fn test_equal_value_skips_write() {
        let (spi, probe) = open(DummyConfig::default());

        spi.set_mode(0).unwrap();
        spi.set_bits_per_word(8).unwrap();
        spi.set_max_speed_hz(1_000_000).unwrap();

        let counts = probe.counts();
        assert_eq!(counts.writes(), 0);
        assert_eq!(counts.mode_reads, 1);
        assert_eq!(counts.bits_reads, 1);
        assert_eq!(counts.speed_reads, 1);
    }

    #[test]
    fn test_getters_always_read() {
        let (spi, probe) = open(DummyConfig::default());
        spi.mode().unwrap();
        spi.mode().unwrap();
        spi.max_speed_hz().unwrap();
        assert_eq!(probe.counts().mode_reads, 2);
        assert_eq!(probe.counts().speed_reads, 1);
    }

    #[test]
    fn test_kernel_write_failure() {
        let (spi, probe) = open(DummyConfig::default().with_speed_limit(10_000_000));
        match spi.set_max_speed_hz(20_000_000) {
            Err(ConfigError::IoctlFailed { action, source }) => {
                assert_eq!(action, "Set max speed");
                assert_eq!(source.raw_os_error(), Some(EINVAL));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(probe.max_speed_hz(), 1_000_000);
    }

    #[test]
    fn test_open_applies_options_in_order() {
        let dev = DummySpidev::new_default();
        let probe = dev.probe();
        let options = SpiOptions::new()
            .with_mode(3)
            .with_speed(2_000_000)
            .with_bits_per_word(16);
        let _spi = SpiDevice::from_io(dev, &options).unwrap();

        assert_eq!(probe.write_log(), ["mode", "max_speed_hz", "bits_per_word"]);
        assert_eq!(probe.mode(), 3);
        assert_eq!(probe.max_speed_hz(), 2_000_000);
        assert_eq!(probe.bits_per_word(), 16);
    }

    #[test]
    fn test_open_with_default_options() {
        let dev = DummySpidev::new_default();
        let probe = dev.probe();
        let _spi = SpiDevice::from_io(dev, &SpiOptions::default()).unwrap();

        // Mode and word size already match the power-up registers
        assert_eq!(probe.write_log(), ["max_speed_hz"]);
    }

    #[test]
    fn test_invalid_options_close_device() {
        let dev = DummySpidev::new_default();
        let probe = dev.probe();
        let options = SpiOptions::new().with_speed(4_000_000).with_mode(0x20);

        let err = SpiDevice::from_io(dev, &options).err().unwrap();
        assert!(matches!(
            err,
            OpenError::InvalidConfig(ConfigError::Invalid(ValidationError::LoopbackNotAllowed))
        ));
        assert!(probe.is_released());
        assert_eq!(probe.counts(), CallCounts::default());
    }

    #[test]
    fn test_rejected_options_close_device() {
        let dev = DummySpidev::new(DummyConfig::default().with_speed_limit(1_000));
        let probe = dev.probe();
        let options = SpiOptions::new().with_mode(1);

        let err = SpiDevice::from_io(dev, &options).err().unwrap();
        assert!(matches!(
            err,
            OpenError::InvalidConfig(ConfigError::IoctlFailed {
                action: "Set max speed",
                ..
            })
        ));
        assert!(probe.is_released());
        // Bits per word comes after speed and was never attempted
        assert_eq!(probe.counts().bits_reads, 0);
    }

    #[test]
    fn test_unconfigured_open_keeps_loopback_mode() {
        let dev = DummySpidev::new(DummyConfig {
            mode: Mode::LOOP.bits(),
            ..Default::default()
        });
        let probe = dev.probe();
        let spi = SpiDevice::from_io_unconfigured(dev);

        assert!(spi.is_open());
        assert_eq!(spi.mode().unwrap(), Mode::LOOP.bits());
        assert_eq!(probe.counts().writes(), 0);

        spi.set_mode(Mode::MODE_0.bits()).unwrap();
        assert_eq!(probe.mode(), 0);
    }

    #[test]
    fn test_pinned_executor() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap();
        let (spi, probe) = open(DummyConfig::default().with_loopback(true));
        let spi = spi.with_executor(Executor::new(runtime.handle().clone()));

        let rx = spi.transfer_blocking([vec![0x11u8, 0x22]]).unwrap();
        assert_eq!(rx, vec![vec![0x11, 0x22]]);
        assert_eq!(probe.counts().transfers, 1);
    }

    #[test]
    fn test_single_segment() {
        let (spi, _probe) = open(DummyConfig::default());
        let rx = spi.transfer_blocking([vec![0x01u8, 0x02, 0x03]]).unwrap();
        assert_eq!(rx.len(), 1);
        assert_eq!(rx[0].len(), 3);
    }

    #[test]
    fn test_single_segment_loopback() {
        let (spi, _probe) = open(DummyConfig::default().with_loopback(true));
        let rx = spi.transfer_blocking([vec![0x01u8, 0x02, 0x03]]).unwrap();
        assert_eq!(rx, vec![vec![0x01, 0x02, 0x03]]);
    }

    #[test]
    fn test_segments_keep_order_and_overrides() {
        let (spi, probe) = open(DummyConfig::default().with_loopback(true));
        let rx = spi
            .transfer_blocking([
                TransferRequest::new([0xEE]).with_speed(250_000),
                TransferRequest::new([0x00, 0x11])
                    .with_cs_change(true)
                    .with_delay_usecs(10),
                TransferRequest::new([0x22, 0x33, 0x44]).with_bits_per_word(16),
            ])
            .unwrap();
        assert_eq!(rx, vec![vec![0xEE], vec![0x00, 0x11], vec![0x22, 0x33, 0x44]]);

        let records = probe.records();
        assert_eq!(records.len(), 1);
        let segments = &records[0].segments;
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].0, 1);
        assert_eq!(segments[0].1.speed_hz, 250_000);
        assert!(segments[1].1.cs_change);
        assert_eq!(segments[1].1.delay_usecs, 10);
        assert_eq!(segments[2].1.bits_per_word, 16);
        assert_eq!(segments[2].1.speed_hz, 0);
    }

    #[test]
    fn test_empty_transfer() {
        let (spi, probe) = open(DummyConfig::default());
        let err = spi.transfer(Vec::<Vec<u8>>::new()).err().unwrap();
        assert!(matches!(
            err,
            Error::Transfer(TransferError::Invalid(ValidationError::EmptyBatch))
        ));
        assert_eq!(probe.counts().transfers, 0);
    }

    #[test]
    fn test_executor_rechecks_empty_batch() {
        let (spi, probe) = open(DummyConfig::default());
        let pending = Executor::current().submit(Arc::clone(spi.bus()), TransferBatch::default());
        assert!(matches!(pending.wait(), Err(TransferError::NoTransfers)));
        assert_eq!(probe.counts().transfers, 0);
    }

    #[test]
    fn test_invalid_segment_stops_whole_batch() {
        let (spi, probe) = open(DummyConfig::default().with_loopback(true));
        let err = spi
            .transfer([
                TransferRequest::new([1, 2, 3]),
                TransferRequest::new([4, 5, 6]).with_delay_usecs(70000),
                TransferRequest::new([7, 8, 9]),
            ])
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::Transfer(TransferError::Invalid(ValidationError::OutOfRange {
                field: Field::DelayUsecs,
                value: 70000
            }))
        ));
        assert_eq!(probe.counts().transfers, 0);
        assert!(probe.records().is_empty());
    }

    #[test]
    fn test_oversized_buffer_rejected() {
        let (spi, probe) = open(DummyConfig::default());
        let err = spi.transfer([vec![0u8; 4097]]).err().unwrap();
        assert!(matches!(
            err,
            Error::Transfer(TransferError::Invalid(ValidationError::BufferSizeInvalid {
                len: 4097
            }))
        ));
        assert_eq!(probe.counts().transfers, 0);
    }

    #[test]
    fn test_concurrent_transfers_never_overlap() {
        let (spi, probe) = open(
            DummyConfig::default()
                .with_loopback(true)
                .with_latency(Duration::from_millis(20)),
        );

        let pending: Vec<_> = (0u8..4)
            .map(|i| spi.transfer([vec![i; 16]]).unwrap())
            .collect();
        for (i, p) in pending.into_iter().enumerate() {
            assert_eq!(p.wait().unwrap(), vec![vec![i as u8; 16]]);
        }

        assert_eq!(probe.max_concurrency(), 1);
        let mut records = probe.records();
        assert_eq!(records.len(), 4);
        records.sort_by_key(|r| r.start);
        for pair in records.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn test_config_waits_for_transfer() {
        let (spi, probe) = open(
            DummyConfig::default()
                .with_loopback(true)
                .with_latency(Duration::from_millis(50)),
        );
        let pending = spi.transfer([vec![0xA5u8; 4]]).unwrap();
        // Takes the bus guard, so it cannot interleave with the transfer
        spi.set_max_speed_hz(2_000_000).unwrap();
        pending.wait().unwrap();
        assert_eq!(probe.max_speed_hz(), 2_000_000);
        assert_eq!(probe.max_concurrency(), 1);
    }

    #[test]
    fn test_transfer_failure_is_not_retried() {
        let (spi, probe) = open(DummyConfig::default());
        probe.fail_next_transfer(EIO);

        let err = spi.transfer_blocking([vec![0x9Fu8]]).err().unwrap();
        match err {
            Error::Transfer(TransferError::IoctlFailed(source)) => {
                assert_eq!(source.raw_os_error(), Some(EIO));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(probe.counts().transfers, 1);

        // The caller decides to retry
        assert!(spi.transfer_blocking([vec![0x9Fu8]]).is_ok());
        assert_eq!(probe.counts().transfers, 2);
    }

    #[test]
    fn test_close() {
        let (spi, probe) = open(DummyConfig::default());
        assert!(spi.is_open());
        spi.close();
        spi.close();

        assert!(!spi.is_open());
        assert!(probe.is_released());
        assert!(matches!(spi.mode(), Err(ConfigError::NotOpen)));
        assert!(matches!(spi.set_bits_per_word(8), Err(ConfigError::NotOpen)));
        assert!(matches!(
            spi.transfer([vec![0u8]]),
            Err(Error::Transfer(TransferError::NotOpen))
        ));
    }

    #[test]
    fn test_drop_releases_device() {
        let (spi, probe) = open(DummyConfig::default());
        drop(spi);
        assert!(probe.is_released());
    }

    #[tokio::test]
    async fn test_await_transfer() {
        let (spi, _probe) = open(DummyConfig::default().with_loopback(true));
        let rx = spi.transfer([[0xDEu8, 0xAD], [0xBE, 0xEF]]).unwrap().await.unwrap();
        assert_eq!(rx, vec![vec![0xDE, 0xAD], vec![0xBE, 0xEF]]);
    }

    #[tokio::test]
    async fn test_pending_state() {
        let (spi, _probe) = open(
            DummyConfig::default()
                .with_loopback(true)
                .with_latency(Duration::from_millis(10)),
        );
        let mut pending = spi.transfer([vec![0x42u8]]).unwrap();
        assert!(matches!(
            pending.state(),
            TransferState::Submitted | TransferState::Executing
        ));

        let rx = (&mut pending).await.unwrap();
        assert_eq!(rx, vec![vec![0x42]]);
        assert_eq!(pending.state(), TransferState::Completed);
    }

    #[tokio::test]
    async fn test_failed_state() {
        let (spi, probe) = open(DummyConfig::default());
        probe.fail_next_transfer(EIO);
        let mut pending = spi.transfer([vec![0x42u8]]).unwrap();
        assert!((&mut pending).await.is_err());
        assert_eq!(pending.state(), TransferState::Failed);
    }
}
