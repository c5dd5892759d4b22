//! spibus-core - Protocol-level pieces of the spidev driver
//!
//! This crate holds everything about a spidev bus that does not need the
//! kernel: the mode flag definitions, the limits the `SPI_IOC_*` protocol
//! imposes on every field, and the construction of multi-segment transfer
//! batches. It is `no_std` so the same checks can run anywhere.
//!
//! # Features
//!
//! - `alloc` - Enable [`transfer`], which owns the segment buffers
//! - `std` - Implement `std::error::Error` for [`ValidationError`] (includes `alloc`)
//!
//! # Example
//!
//! ```
//! use spibus_core::{validate, Mode};
//!
//! let mode = validate::validate_mode((Mode::CPOL | Mode::CPHA).bits().into())?;
//! assert_eq!(mode, Mode::MODE_3);
//!
//! assert!(validate::validate_bits_per_word(0).is_err());
//! # Ok::<(), spibus_core::ValidationError>(())
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod mode;
#[cfg(feature = "alloc")]
pub mod transfer;
pub mod validate;

pub use error::{Field, Result, ValidationError};
pub use mode::Mode;
