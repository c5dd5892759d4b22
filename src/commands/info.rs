//! Info command implementation

use super::format_speed;
use crate::devices::Device;
use spibus_linux::{spidev, Mode};

/// Print the bus configuration as reported by the kernel
pub fn cmd_info(spi: &Device) -> Result<(), Box<dyn std::error::Error>> {
    let mode = Mode::from_bits_retain(spi.mode()?);
    let bits = spi.bits_per_word()?;
    let speed = spi.max_speed_hz()?;

    println!("Device:        {}", spi.bus().name());
    println!("Mode:          {}", mode_line(mode));
    println!("Bits per word: {}", bits);
    println!("Max speed:     {} ({} Hz)", format_speed(speed), speed);
    match spidev::kernel_buf_size() {
        Some(size) => println!("Buffer size:   {} bytes", size),
        None => println!("Buffer size:   unknown"),
    }

    Ok(())
}

/// Clock mode and raw value, plus any extra flags by name
fn mode_line(mode: Mode) -> String {
    let extra = mode.difference(Mode::MODE_3);
    if extra.is_empty() {
        mode.to_string()
    } else {
        let names: Vec<&str> = extra.iter_names().map(|(name, _)| name).collect();
        format!("{} [{}]", mode, names.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_line() {
        assert_eq!(mode_line(Mode::MODE_3), "mode 3 (0x03)");
        assert_eq!(
            mode_line(Mode::MODE_1 | Mode::CS_HIGH),
            "mode 1 (0x05) [CS_HIGH]"
        );
        assert_eq!(
            mode_line(Mode::LOOP | Mode::LSB_FIRST),
            "mode 0 (0x28) [LSB_FIRST | LOOP]"
        );
    }
}
