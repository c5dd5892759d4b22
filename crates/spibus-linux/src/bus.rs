//! Bus handle: ownership and serialization of one spidev node
//!
//! A [`BusHandle`] owns the backend (and with it the descriptor and the
//! exclusive lock) behind a mutex. Every kernel call made through the
//! handle, configuration or transfer, runs with that mutex held for its
//! whole duration, so calls against one handle never overlap.

use crate::error::{NotOpen, OpenError};
use crate::io::SpidevIo;
use crate::spidev::Spidev;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Exclusive, serialized access to one spidev backend
pub struct BusHandle<D> {
    /// `None` once closed
    io: Mutex<Option<D>>,
    /// Device name, kept for log messages after close
    name: String,
}

impl BusHandle<Spidev> {
    /// Open and lock the spidev node at `path`
    pub fn open(path: &str) -> Result<Self, OpenError> {
        Ok(Self::new(Spidev::open(path)?))
    }
}

impl<D: SpidevIo> BusHandle<D> {
    /// Wrap an already opened backend
    pub fn new(io: D) -> Self {
        let name = io.name().to_string();
        Self {
            io: Mutex::new(Some(io)),
            name,
        }
    }

    /// Device name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the handle has not been closed yet
    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Run `f` on the backend with the bus guard held
    ///
    /// Fails with [`NotOpen`] (converted into `E`) if the handle is closed.
    pub fn with_io<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut D) -> Result<T, E>,
        E: From<NotOpen>,
    {
        let mut guard = self.lock();
        match guard.as_mut() {
            Some(io) => f(io),
            None => Err(NotOpen.into()),
        }
    }

    /// Release the lock and close the descriptor
    ///
    /// Waits for an in-flight operation to finish first. Returns `false`
    /// if the handle was already closed.
    pub fn close(&self) -> bool {
        let io = self.lock().take();
        match io {
            Some(io) => {
                drop(io);
                log::debug!("bus {}: closed", self.name);
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<D>> {
        // A panic inside a kernel call leaves the backend itself intact
        self.io.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
