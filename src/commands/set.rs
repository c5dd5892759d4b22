//! Set command implementation

use super::format_speed;
use crate::devices::Device;

/// Apply whichever settings were given, in the order mode, speed, bits
pub fn cmd_set(
    spi: &Device,
    mode: Option<u32>,
    bits: Option<u32>,
    speed: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    if mode.is_none() && bits.is_none() && speed.is_none() {
        return Err("Nothing to set (use --mode, --bits or --speed)".into());
    }

    if let Some(mode) = mode {
        let mode = u8::try_from(mode).map_err(|_| format!("Invalid mode 0x{:x}", mode))?;
        spi.set_mode(mode)?;
        println!("Mode set to 0x{:02x}", spi.mode()?);
    }

    if let Some(speed) = speed {
        spi.set_max_speed_hz(speed)?;
        println!("Max speed set to {}", format_speed(spi.max_speed_hz()?));
    }

    if let Some(bits) = bits {
        spi.set_bits_per_word(bits)?;
        println!("Bits per word set to {}", spi.bits_per_word()?);
    }

    Ok(())
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use crate::devices::open_device;
    use spibus_linux::SpiOptions;

    #[test]
    fn test_set_applies_values() {
        let spi = open_device("dummy", &SpiOptions::default()).unwrap();
        cmd_set(&spi, Some(3), Some(16), Some(2_000_000)).unwrap();
        assert_eq!(spi.mode().unwrap(), 3);
        assert_eq!(spi.bits_per_word().unwrap(), 16);
        assert_eq!(spi.max_speed_hz().unwrap(), 2_000_000);
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let spi = open_device("dummy", &SpiOptions::default()).unwrap();
        assert!(cmd_set(&spi, None, None, None).is_err());
        assert!(cmd_set(&spi, Some(0x100), None, None).is_err());
        assert!(cmd_set(&spi, None, Some(33), None).is_err());
        assert_eq!(spi.bits_per_word().unwrap(), 8);
    }
}
