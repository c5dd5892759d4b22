//! Bus configuration: mode, bits per word and clock speed
//!
//! Getters always ask the kernel. Setters validate first, then read the
//! current value and only issue the write when it differs. The read and
//! the write happen under one acquisition of the bus guard.

use crate::bus::BusHandle;
use crate::error::ConfigError;
use crate::io::SpidevIo;

use spibus_core::validate;
use spibus_core::{Mode, ValidationError};

use std::fmt;
use std::io;

/// Default SPI clock speed in Hz (1 MHz)
pub const DEFAULT_SPEED_HZ: u32 = 1_000_000;

/// Default word size
pub const DEFAULT_BITS_PER_WORD: u32 = 8;

/// Initial configuration applied when a device is opened
///
/// Values are kept as the raw integers the caller supplied and are
/// validated together before any of them is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiOptions {
    /// Mode word (default: mode 0)
    pub mode: u32,
    /// Word size (default: 8)
    pub bits_per_word: u32,
    /// Clock speed in Hz (default: 1 MHz)
    pub max_speed_hz: u32,
}

impl Default for SpiOptions {
    fn default() -> Self {
        Self {
            mode: Mode::MODE_0.bits().into(),
            bits_per_word: DEFAULT_BITS_PER_WORD,
            max_speed_hz: DEFAULT_SPEED_HZ,
        }
    }
}

impl SpiOptions {
    /// Options with the defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the mode word
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    /// Set the clock speed in Hz
    pub fn with_speed(mut self, speed_hz: u32) -> Self {
        self.max_speed_hz = speed_hz;
        self
    }

    /// Set the word size
    pub fn with_bits_per_word(mut self, bits: u32) -> Self {
        self.bits_per_word = bits;
        self
    }

    /// Check all three values without touching a device
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate::validate_mode(self.mode)?;
        validate::validate_max_speed_hz(self.max_speed_hz)?;
        validate::validate_bits_per_word(self.bits_per_word)?;
        Ok(())
    }
}

/// One read-before-write setting
struct Setting<T> {
    read_action: &'static str,
    write_action: &'static str,
    read: fn(&mut dyn SpidevIo) -> io::Result<T>,
    write: fn(&mut dyn SpidevIo, T) -> io::Result<()>,
}

const MODE: Setting<u8> = Setting {
    read_action: "Read SPI mode",
    write_action: "Set SPI mode",
    read: |io| io.read_mode(),
    write: |io, v| io.write_mode(v),
};

const BITS_PER_WORD: Setting<u8> = Setting {
    read_action: "Read bits per word",
    write_action: "Set bits per word",
    read: |io| io.read_bits_per_word(),
    write: |io, v| io.write_bits_per_word(v),
};

const MAX_SPEED_HZ: Setting<u32> = Setting {
    read_action: "Read max speed",
    write_action: "Set max speed",
    read: |io| io.read_max_speed_hz(),
    write: |io, v| io.write_max_speed_hz(v),
};

impl<T: Copy + PartialEq + fmt::Debug> Setting<T> {
    fn get(&self, io: &mut dyn SpidevIo) -> Result<T, ConfigError> {
        (self.read)(io).map_err(|source| ConfigError::IoctlFailed {
            action: self.read_action,
            source,
        })
    }

    fn apply(&self, io: &mut dyn SpidevIo, wanted: T) -> Result<(), ConfigError> {
        let current = self.get(io)?;
        if current == wanted {
            log::trace!("{}: already {:?}", self.write_action, wanted);
            return Ok(());
        }

        (self.write)(io, wanted).map_err(|source| ConfigError::IoctlFailed {
            action: self.write_action,
            source,
        })?;
        log::debug!("{}: {:?} -> {:?}", self.write_action, current, wanted);
        Ok(())
    }
}

impl<D: SpidevIo> BusHandle<D> {
    /// Current mode word as reported by the kernel
    pub fn mode(&self) -> Result<u8, ConfigError> {
        self.with_io(|io| MODE.get(io))
    }

    /// Validate and apply a mode word
    pub fn set_mode(&self, mode: u8) -> Result<(), ConfigError> {
        let mode = validate::validate_mode(mode.into())?;
        self.with_io(|io| MODE.apply(io, mode.bits()))
    }

    /// Current word size as reported by the kernel
    pub fn bits_per_word(&self) -> Result<u8, ConfigError> {
        self.with_io(|io| BITS_PER_WORD.get(io))
    }

    /// Validate (1-32) and apply a word size
    pub fn set_bits_per_word(&self, bits: u32) -> Result<(), ConfigError> {
        let bits = validate::validate_bits_per_word(bits)?;
        self.with_io(|io| BITS_PER_WORD.apply(io, bits))
    }

    /// Current maximum clock speed as reported by the kernel
    pub fn max_speed_hz(&self) -> Result<u32, ConfigError> {
        self.with_io(|io| MAX_SPEED_HZ.get(io))
    }

    /// Validate (non-zero) and apply a maximum clock speed
    pub fn set_max_speed_hz(&self, speed_hz: u32) -> Result<(), ConfigError> {
        let speed_hz = validate::validate_max_speed_hz(speed_hz)?;
        self.with_io(|io| MAX_SPEED_HZ.apply(io, speed_hz))
    }

    /// Apply initial options in the order mode, speed, bits per word
    ///
    /// All three values are validated before the first write.
    pub fn apply_options(&self, options: &SpiOptions) -> Result<(), ConfigError> {
        let mode = validate::validate_mode(options.mode)?;
        let speed_hz = validate::validate_max_speed_hz(options.max_speed_hz)?;
        let bits = validate::validate_bits_per_word(options.bits_per_word)?;

        self.with_io(|io| {
            MODE.apply(io, mode.bits())?;
            MAX_SPEED_HZ.apply(io, speed_hz)?;
            BITS_PER_WORD.apply(io, bits)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = SpiOptions::default();
        assert_eq!(options.mode, 0);
        assert_eq!(options.bits_per_word, 8);
        assert_eq!(options.max_speed_hz, 1_000_000);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_options_builder() {
        let options = SpiOptions::new()
            .with_mode(3)
            .with_speed(4_000_000)
            .with_bits_per_word(16);
        assert_eq!(
            options,
            SpiOptions {
                mode: 3,
                bits_per_word: 16,
                max_speed_hz: 4_000_000,
            }
        );
    }

    #[test]
    fn test_options_validation() {
        assert_eq!(
            SpiOptions::new().with_mode(0x20).validate(),
            Err(ValidationError::LoopbackNotAllowed)
        );
        assert!(SpiOptions::new().with_speed(0).validate().is_err());
        assert!(SpiOptions::new().with_bits_per_word(33).validate().is_err());
    }
}
