//! SPI mode flags
//!
//! The bit positions are those of `SPI_IOC_WR_MODE` in `<linux/spi/spidev.h>`.
//! Only the low byte is covered; the 32-bit mode word (dual/quad lanes) is
//! not used by this driver.

use bitflags::bitflags;
use core::fmt;

bitflags! {
    /// Mode flags of a spidev bus handle
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Mode: u8 {
        /// Clock phase: sample on the second clock edge
        const CPHA       = 1 << 0;
        /// Clock polarity: clock idles high
        const CPOL       = 1 << 1;
        /// Chip select is active high
        const CS_HIGH    = 1 << 2;
        /// Shift out the least significant bit first
        const LSB_FIRST  = 1 << 3;
        /// Shared MOSI/MISO line (SI/SO signals)
        const THREE_WIRE = 1 << 4;
        /// Controller-internal loopback, for testing only
        const LOOP       = 1 << 5;
        /// Do not drive a chip select line at all
        const NO_CS      = 1 << 6;
        /// Target pulls low to pause (ready/flow-control)
        const READY      = 1 << 7;
    }
}

impl Mode {
    /// CPOL=0, CPHA=0
    pub const MODE_0: Self = Self::empty();
    /// CPOL=0, CPHA=1
    pub const MODE_1: Self = Self::CPHA;
    /// CPOL=1, CPHA=0
    pub const MODE_2: Self = Self::CPOL;
    /// CPOL=1, CPHA=1
    pub const MODE_3: Self = Self::CPOL.union(Self::CPHA);

    /// The clock mode number (0-3) encoded in CPOL/CPHA
    pub const fn clock_mode(self) -> u8 {
        self.bits() & (Self::CPOL.bits() | Self::CPHA.bits())
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self::MODE_0
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mode {} (0x{:02x})", self.clock_mode(), self.bits())
    }
}

/// Raw mode constants, for callers that carry the mode as a plain integer
pub mod raw {
    use super::Mode;

    /// SPI mode 0: CPOL=0, CPHA=0
    pub const MODE_0: u8 = Mode::MODE_0.bits();
    /// SPI mode 1: CPOL=0, CPHA=1
    pub const MODE_1: u8 = Mode::MODE_1.bits();
    /// SPI mode 2: CPOL=1, CPHA=0
    pub const MODE_2: u8 = Mode::MODE_2.bits();
    /// SPI mode 3: CPOL=1, CPHA=1
    pub const MODE_3: u8 = Mode::MODE_3.bits();

    /// `SPI_CPHA`
    pub const CPHA: u8 = Mode::CPHA.bits();
    /// `SPI_CPOL`
    pub const CPOL: u8 = Mode::CPOL.bits();
    /// `SPI_CS_HIGH`
    pub const CS_HIGH: u8 = Mode::CS_HIGH.bits();
    /// `SPI_LSB_FIRST`
    pub const LSB_FIRST: u8 = Mode::LSB_FIRST.bits();
    /// `SPI_3WIRE`
    pub const THREE_WIRE: u8 = Mode::THREE_WIRE.bits();
    /// `SPI_LOOP`
    pub const LOOP: u8 = Mode::LOOP.bits();
    /// `SPI_NO_CS`
    pub const NO_CS: u8 = Mode::NO_CS.bits();
    /// `SPI_READY`
    pub const READY: u8 = Mode::READY.bits();
}
