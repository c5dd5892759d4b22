//! spibus-linux - Linux spidev driver
//!
//! This crate drives SPI controllers exposed through `/dev/spidevX.Y`: it
//! opens and exclusively locks the device node, reads and changes the bus
//! configuration, and runs multi-segment transfers on a worker thread so
//! the caller never blocks on the hardware.
//!
//! # Example
//!
//! ```no_run
//! use spibus_linux::{SpiDevice, SpiOptions, TransferRequest};
//!
//! // Open with default settings (1 MHz, mode 0, 8 bits per word)
//! // using SpiDevice::open, or with custom settings:
//! let options = SpiOptions::new()
//!     .with_speed(2_000_000)
//!     .with_mode(3);
//! let spi = SpiDevice::open_with("/dev/spidev0.0", &options)?;
//!
//! // Write an address byte, then clock in one byte, as one transaction
//! let rx = spi.transfer_blocking([
//!     TransferRequest::new([0x37 << 1 | 0x80]),
//!     TransferRequest::new([0x00]),
//! ])?;
//! println!("register: 0x{:02x}", rx[1][0]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! From async code, await the transfer instead:
//!
//! ```no_run
//! # async fn run(spi: spibus_linux::SpiDevice) -> spibus_linux::Result<()> {
//! let rx = spi.transfer([vec![0x9F, 0, 0, 0]])?.await?;
//! println!("JEDEC ID: {:02X?}", &rx[0][1..]);
//! # Ok(())
//! # }
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with spidev support enabled (`CONFIG_SPI_SPIDEV`)
//! - Read/write access to `/dev/spidevX.Y` device
//! - May require adding user to `spi` group or using udev rules

pub mod bus;
pub mod config;
pub mod device;
pub mod error;
pub mod executor;
pub mod io;
pub mod ioctl;
pub mod spidev;

// Re-exports
pub use bus::BusHandle;
pub use config::{SpiOptions, DEFAULT_BITS_PER_WORD, DEFAULT_SPEED_HZ};
pub use device::SpiDevice;
pub use error::{ConfigError, Error, NotOpen, OpenError, Result, TransferError};
pub use executor::{Executor, PendingTransfer, TransferResult, TransferState};
pub use io::SpidevIo;
pub use spibus_core::mode::{self, Mode};
pub use spibus_core::transfer::{SegmentSettings, TransferBatch, TransferRequest};
pub use spibus_core::ValidationError;
pub use spidev::Spidev;
