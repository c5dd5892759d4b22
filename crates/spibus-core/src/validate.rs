//! Protocol limits and the checks that enforce them
//!
//! All functions here are pure: they take the raw value a caller supplied
//! and either return the narrowed kernel-width value or a
//! [`ValidationError`]. Nothing in this module talks to a device, so a
//! rejected value never leaves partial state behind.

use crate::error::{Field, Result, ValidationError};
use crate::mode::Mode;

/// Largest segment buffer accepted, in bytes
///
/// Matches the default `bufsiz` of the spidev driver.
pub const MAX_TRANSFER_SIZE: usize = 4096;

/// Largest number of segments in one `SPI_IOC_MESSAGE(n)` request
///
/// The ioctl size field is 14 bits wide and each `spi_ioc_transfer` is
/// 32 bytes.
pub const MAX_SEGMENTS: usize = ((1 << 14) - 1) / 32;

/// Union of every defined mode flag
pub const VALID_MODE_MASK: u32 = Mode::all().bits() as u32;

/// Check a mode word
///
/// Rejects undefined bits, `SPI_LOOP`, and `SPI_NO_CS` combined with
/// `SPI_CS_HIGH`.
pub fn validate_mode(mode: u32) -> Result<Mode> {
    if mode & !VALID_MODE_MASK != 0 {
        return Err(ValidationError::InvalidModeFlags { mode });
    }

    let flags = Mode::from_bits_truncate(mode as u8);
    if flags.contains(Mode::LOOP) {
        return Err(ValidationError::LoopbackNotAllowed);
    }
    if flags.contains(Mode::NO_CS | Mode::CS_HIGH) {
        return Err(ValidationError::ConflictingModeFlags);
    }

    Ok(flags)
}

/// Check a word size (1-32)
///
/// Sizes other than 8, 16 and 32 are accepted with a warning.
pub fn validate_bits_per_word(bits: u32) -> Result<u8> {
    check_range(Field::BitsPerWord, bits)?;
    if !is_conventional_word_size(bits) {
        log::warn!(
            "bits_per_word={} is unconventional (typical: 8, 16, 32)",
            bits
        );
    }
    Ok(bits as u8)
}

/// Whether `bits` is one of the common word sizes
pub const fn is_conventional_word_size(bits: u32) -> bool {
    matches!(bits, 8 | 16 | 32)
}

/// Check a clock speed (must be non-zero)
pub fn validate_max_speed_hz(speed_hz: u32) -> Result<u32> {
    check_range(Field::MaxSpeedHz, speed_hz)
}

/// Check a transmit/receive lane width (1-64)
///
/// `field` must be [`Field::TxNbits`] or [`Field::RxNbits`].
pub fn validate_lane_width(field: Field, nbits: u32) -> Result<u8> {
    debug_assert!(matches!(field, Field::TxNbits | Field::RxNbits));
    check_range(field, nbits)?;
    if !matches!(nbits, 1 | 2 | 4 | 8) {
        log::debug!("{}={} is not a common lane width", field.name(), nbits);
    }
    Ok(nbits as u8)
}

/// Check a delay-after-transfer (16-bit microseconds)
pub fn validate_delay_usecs(usecs: u32) -> Result<u16> {
    check_range(Field::DelayUsecs, usecs).map(|v| v as u16)
}

/// Check an inter-word delay (8-bit microseconds)
pub fn validate_word_delay_usecs(usecs: u32) -> Result<u8> {
    check_range(Field::WordDelayUsecs, usecs).map(|v| v as u8)
}

/// Check a chip-select release flag (exactly 0 or 1)
pub fn validate_cs_change(cs_change: u32) -> Result<bool> {
    check_range(Field::CsChange, cs_change).map(|v| v == 1)
}

/// Check a segment buffer length
pub fn validate_buffer_len(len: usize) -> Result<()> {
    if len == 0 || len > MAX_TRANSFER_SIZE {
        return Err(ValidationError::BufferSizeInvalid { len });
    }
    Ok(())
}

/// Check the number of segments in one transfer
pub fn validate_segment_count(count: usize) -> Result<()> {
    match count {
        0 => Err(ValidationError::EmptyBatch),
        n if n > MAX_SEGMENTS => Err(ValidationError::TooManySegments { count: n }),
        _ => Ok(()),
    }
}

fn check_range(field: Field, value: u32) -> Result<u32> {
    let (min, max) = field.range();
    if value < min || value > max {
        return Err(ValidationError::OutOfRange { field, value });
    }
    Ok(value)
}
