//! Validation errors
//!
//! Every configuration value and transfer field is checked against the
//! limits of the spidev protocol before anything reaches the kernel. The
//! error type is `no_std` and `Copy` so it can be produced by the pure
//! checks in [`crate::validate`].

use core::fmt;

/// A range-checked numeric field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Word size of the bus handle or of one segment
    BitsPerWord,
    /// Maximum clock speed of the bus handle
    MaxSpeedHz,
    /// Delay after a segment, 16-bit field
    DelayUsecs,
    /// Delay between words of a segment, 8-bit field
    WordDelayUsecs,
    /// Chip-select release flag
    CsChange,
    /// Transmit lane width
    TxNbits,
    /// Receive lane width
    RxNbits,
}

impl Field {
    /// Name of the field as it appears in `struct spi_ioc_transfer`
    pub const fn name(self) -> &'static str {
        match self {
            Self::BitsPerWord => "bits_per_word",
            Self::MaxSpeedHz => "max_speed_hz",
            Self::DelayUsecs => "delay_usecs",
            Self::WordDelayUsecs => "word_delay_usecs",
            Self::CsChange => "cs_change",
            Self::TxNbits => "tx_nbits",
            Self::RxNbits => "rx_nbits",
        }
    }

    /// Inclusive range of accepted values
    pub const fn range(self) -> (u32, u32) {
        match self {
            Self::BitsPerWord => (1, 32),
            Self::MaxSpeedHz => (1, u32::MAX),
            Self::DelayUsecs => (0, u16::MAX as u32),
            Self::WordDelayUsecs => (0, u8::MAX as u32),
            Self::CsChange => (0, 1),
            Self::TxNbits | Self::RxNbits => (1, 64),
        }
    }
}

/// Reasons a setting or transfer request is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Mode uses bits outside the defined flags (or beyond 8 bits)
    InvalidModeFlags {
        /// The rejected mode word
        mode: u32,
    },
    /// `SPI_LOOP` is for controller testing, not normal operation
    LoopbackNotAllowed,
    /// `SPI_NO_CS` combined with `SPI_CS_HIGH`
    ConflictingModeFlags,
    /// A numeric field is outside its range
    OutOfRange {
        /// Which field
        field: Field,
        /// The rejected value
        value: u32,
    },
    /// Segment buffer is empty or larger than the transfer limit
    BufferSizeInvalid {
        /// Length of the rejected buffer
        len: usize,
    },
    /// A transfer needs at least one segment
    EmptyBatch,
    /// More segments than one `SPI_IOC_MESSAGE` request can describe
    TooManySegments {
        /// Number of segments requested
        count: usize,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidModeFlags { mode } => write!(
                f,
                "invalid SPI mode flags 0x{:x}: unknown or unsupported bits set",
                mode
            ),
            Self::LoopbackNotAllowed => write!(
                f,
                "SPI_LOOP is intended for testing and not normal operation"
            ),
            Self::ConflictingModeFlags => write!(f, "cannot combine SPI_NO_CS with SPI_CS_HIGH"),
            Self::OutOfRange {
                field: Field::MaxSpeedHz,
                ..
            } => write!(f, "max_speed_hz must be greater than 0"),
            Self::OutOfRange {
                field: Field::CsChange,
                value,
            } => write!(
                f,
                "cs_change must be 0 (keep CS active) or 1 (release CS), got {}",
                value
            ),
            Self::OutOfRange { field, value } => {
                let (min, max) = field.range();
                write!(
                    f,
                    "{} must be between {} and {}, got {}",
                    field.name(),
                    min,
                    max,
                    value
                )
            }
            Self::BufferSizeInvalid { len: 0 } => write!(f, "transfer buffer cannot be empty"),
            Self::BufferSizeInvalid { len } => write!(
                f,
                "transfer buffer too large: {} bytes (max {})",
                len,
                crate::validate::MAX_TRANSFER_SIZE
            ),
            Self::EmptyBatch => write!(f, "no transfers specified"),
            Self::TooManySegments { count } => write!(
                f,
                "{} segments requested, at most {} fit in one transfer",
                count,
                crate::validate::MAX_SEGMENTS
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ValidationError {}

/// Result type alias using [`ValidationError`]
pub type Result<T> = core::result::Result<T, ValidationError>;
