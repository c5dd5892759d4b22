//! Linux spidev backend
//!
//! Opens `/dev/spidevX.Y`, takes an exclusive advisory lock on it, and
//! implements [`SpidevIo`] with the spidev ioctls.

use crate::error::OpenError;
use crate::io::SpidevIo;
use crate::ioctl::{self, SpiIocTransfer};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use spibus_core::transfer::TransferBatch;

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::Path;

/// Path to kernel spidev buffer size parameter
const BUF_SIZE_SYSFS: &str = "/sys/module/spidev/parameters/bufsiz";

/// An open, exclusively locked spidev node
///
/// The lock is released and the descriptor closed when this is dropped.
pub struct Spidev {
    /// Locked file handle for the device
    file: Flock<File>,
    /// Device path, for log messages
    path: String,
}

impl Spidev {
    /// Open `path` read/write and lock it
    ///
    /// Uses a non-blocking `flock(LOCK_EX)`. If the lock cannot be taken
    /// the descriptor is closed before returning the error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OpenError> {
        let path = path.as_ref().display().to_string();

        log::debug!("spidev: Opening device {}", path);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| OpenError::from_io(&path, e))?;

        let file = Flock::lock(file, FlockArg::LockExclusiveNonblock).map_err(|(file, errno)| {
            drop(file);
            if errno == Errno::EWOULDBLOCK {
                OpenError::AlreadyLocked { path: path.clone() }
            } else {
                OpenError::Other {
                    path: path.clone(),
                    source: io::Error::from(errno),
                }
            }
        })?;

        log::debug!("spidev: Locked {}", path);

        Ok(Self { file, path })
    }

    /// Device path this handle was opened with
    pub fn path(&self) -> &str {
        &self.path
    }

    fn fd(&self) -> libc::c_int {
        self.file.as_raw_fd()
    }
}

impl Drop for Spidev {
    fn drop(&mut self) {
        log::debug!("spidev: Closing {}", self.path);
    }
}

impl SpidevIo for Spidev {
    fn name(&self) -> &str {
        &self.path
    }

    fn read_mode(&mut self) -> io::Result<u8> {
        let mut mode = 0u8;
        unsafe { ioctl::spi_ioc_rd_mode(self.fd(), &mut mode) }?;
        Ok(mode)
    }

    fn write_mode(&mut self, mode: u8) -> io::Result<()> {
        unsafe { ioctl::spi_ioc_wr_mode(self.fd(), &mode) }?;
        Ok(())
    }

    fn read_bits_per_word(&mut self) -> io::Result<u8> {
        let mut bits = 0u8;
        unsafe { ioctl::spi_ioc_rd_bits_per_word(self.fd(), &mut bits) }?;
        Ok(bits)
    }

    fn write_bits_per_word(&mut self, bits: u8) -> io::Result<()> {
        unsafe { ioctl::spi_ioc_wr_bits_per_word(self.fd(), &bits) }?;
        Ok(())
    }

    fn read_max_speed_hz(&mut self) -> io::Result<u32> {
        let mut speed = 0u32;
        unsafe { ioctl::spi_ioc_rd_max_speed_hz(self.fd(), &mut speed) }?;
        Ok(speed)
    }

    fn write_max_speed_hz(&mut self, speed_hz: u32) -> io::Result<()> {
        unsafe { ioctl::spi_ioc_wr_max_speed_hz(self.fd(), &speed_hz) }?;
        Ok(())
    }

    fn transfer(&mut self, batch: &mut TransferBatch) -> io::Result<()> {
        let fd = self.fd();

        let mut transfers: Vec<SpiIocTransfer> = batch
            .segments_mut()
            .iter_mut()
            .map(|segment| {
                let settings = *segment.settings();
                let (tx, rx) = segment.buffers_mut();
                SpiIocTransfer {
                    tx_buf: tx.as_ptr() as u64,
                    rx_buf: rx.as_mut_ptr() as u64,
                    len: tx.len() as u32,
                    speed_hz: settings.speed_hz,
                    delay_usecs: settings.delay_usecs,
                    bits_per_word: settings.bits_per_word,
                    cs_change: settings.cs_change as u8,
                    tx_nbits: settings.tx_nbits,
                    rx_nbits: settings.rx_nbits,
                    word_delay_usecs: settings.word_delay_usecs,
                    _pad: 0,
                }
            })
            .collect();

        log::trace!(
            "spidev: {} segment(s), {} bytes on {}",
            transfers.len(),
            batch.total_len(),
            self.path
        );

        // The buffers referenced by `transfers` are owned by `batch`, which
        // stays mutably borrowed until the call returns.
        let request = ioctl::spi_ioc_message(transfers.len());
        let ret = unsafe { libc::ioctl(fd, request, transfers.as_mut_ptr()) };

        if ret < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }
}

/// Read the spidev buffer size limit from sysfs
///
/// Returns `None` if the module parameter is not readable, e.g. when
/// spidev is built in without sysfs or not loaded.
pub fn kernel_buf_size() -> Option<usize> {
    let content = std::fs::read_to_string(BUF_SIZE_SYSFS).ok()?;
    match content.trim().parse::<usize>() {
        Ok(size) if size > 0 => Some(size),
        _ => {
            log::warn!("spidev: Invalid buffer size in {}", BUF_SIZE_SYSFS);
            None
        }
    }
}
