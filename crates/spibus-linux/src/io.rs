//! Kernel boundary of a bus handle
//!
//! [`SpidevIo`] lists the kernel calls the driver makes on a spidev node.
//! [`Spidev`](crate::Spidev) implements it with real ioctls; the
//! `spibus-dummy` crate implements it in memory for tests.

use spibus_core::transfer::TransferBatch;
use std::io;

/// Kernel operations on one open spidev node
///
/// Implementations do no validation of their own; callers go through
/// [`BusHandle`](crate::BusHandle), which validates and serializes.
pub trait SpidevIo: Send {
    /// Device name for log messages
    fn name(&self) -> &str;

    /// `SPI_IOC_RD_MODE`
    fn read_mode(&mut self) -> io::Result<u8>;
    /// `SPI_IOC_WR_MODE`
    fn write_mode(&mut self, mode: u8) -> io::Result<()>;

    /// `SPI_IOC_RD_BITS_PER_WORD`
    fn read_bits_per_word(&mut self) -> io::Result<u8>;
    /// `SPI_IOC_WR_BITS_PER_WORD`
    fn write_bits_per_word(&mut self, bits: u8) -> io::Result<()>;

    /// `SPI_IOC_RD_MAX_SPEED_HZ`
    fn read_max_speed_hz(&mut self) -> io::Result<u32>;
    /// `SPI_IOC_WR_MAX_SPEED_HZ`
    fn write_max_speed_hz(&mut self, speed_hz: u32) -> io::Result<()>;

    /// `SPI_IOC_MESSAGE(n)` covering every segment of `batch`
    ///
    /// Fills the receive buffer of each segment. Either all segments run
    /// as one hardware transaction or the call fails.
    fn transfer(&mut self, batch: &mut TransferBatch) -> io::Result<()>;
}

impl<T: SpidevIo + ?Sized> SpidevIo for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn read_mode(&mut self) -> io::Result<u8> {
        (**self).read_mode()
    }

    fn write_mode(&mut self, mode: u8) -> io::Result<()> {
        (**self).write_mode(mode)
    }

    fn read_bits_per_word(&mut self) -> io::Result<u8> {
        (**self).read_bits_per_word()
    }

    fn write_bits_per_word(&mut self, bits: u8) -> io::Result<()> {
        (**self).write_bits_per_word(bits)
    }

    fn read_max_speed_hz(&mut self) -> io::Result<u32> {
        (**self).read_max_speed_hz()
    }

    fn write_max_speed_hz(&mut self, speed_hz: u32) -> io::Result<()> {
        (**self).write_max_speed_hz(speed_hz)
    }

    fn transfer(&mut self, batch: &mut TransferBatch) -> io::Result<()> {
        (**self).transfer(batch)
    }
}
