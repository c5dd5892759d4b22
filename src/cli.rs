//! CLI argument parsing

use clap::{Parser, Subcommand};

/// Parse a string as a hex or decimal u32
///
/// Underscores are ignored, so `4_000_000` and `0x00_ff` both parse.
pub fn parse_hex_u32(s: &str) -> Result<u32, String> {
    let s = s.replace('_', "");
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Bytes of one transfer segment given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

/// Parse a hex byte string such as `9f000000` or `9f:00:00` into bytes
pub fn parse_hex_bytes(s: &str) -> Result<HexBytes, String> {
    let digits: String = s
        .strip_prefix("0x")
        .unwrap_or(s)
        .chars()
        .filter(|c| !matches!(c, ':' | '_' | ' '))
        .collect();

    if digits.is_empty() {
        return Err("Empty hex string".to_string());
    }
    if !digits.is_ascii() {
        return Err(format!("Invalid hex string '{}'", s));
    }
    if digits.len() % 2 != 0 {
        return Err(format!("Odd number of hex digits in '{}'", s));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|e| format!("Invalid hex byte '{}': {}", &digits[i..i + 2], e))
        })
        .collect::<Result<Vec<u8>, String>>()
        .map(HexBytes)
}

const DEVICE_HELP: &str = "SPI device node (/dev/spidevX.Y) or 'dummy' for the in-memory emulator";

#[derive(Parser)]
#[command(name = "spibus")]
#[command(author, version, about = "Linux spidev SPI bus tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the current bus configuration
    Info {
        #[arg(short, long, help = DEVICE_HELP)]
        device: String,
    },

    /// Change the bus configuration
    Set {
        #[arg(short, long, help = DEVICE_HELP)]
        device: String,

        /// Mode word (0-3, or raw SPI_* flags)
        #[arg(short, long, value_parser = parse_hex_u32)]
        mode: Option<u32>,

        /// Bits per word (1-32)
        #[arg(short, long, value_parser = parse_hex_u32)]
        bits: Option<u32>,

        /// Maximum clock speed in Hz
        #[arg(short, long, value_parser = parse_hex_u32)]
        speed: Option<u32>,
    },

    /// Run one full-duplex transfer and print the received bytes
    Transfer {
        #[arg(short, long, help = DEVICE_HELP)]
        device: String,

        /// Clock speed in Hz for this transfer only
        #[arg(short, long, value_parser = parse_hex_u32)]
        speed: Option<u32>,

        /// Release chip select between segments
        #[arg(long)]
        cs_change: bool,

        /// Bytes to send, one segment per argument (hex, e.g. 9f000000)
        #[arg(required = true, value_parser = parse_hex_bytes)]
        segments: Vec<HexBytes>,
    },

    /// Send a test pattern with MOSI wired to MISO and compare the echo
    Loopback {
        #[arg(short, long, help = DEVICE_HELP)]
        device: String,

        /// Maximum clock speed in Hz
        #[arg(short, long, default_value = "1_000_000", value_parser = parse_hex_u32)]
        speed: u32,

        /// Mode (0-3)
        #[arg(short, long, default_value = "0", value_parser = parse_hex_u32)]
        mode: u32,

        /// Bits per word (8, 16 or 32)
        #[arg(short, long, default_value = "8", value_parser = parse_hex_u32)]
        bits: u32,

        /// Number of times to repeat the pattern
        #[arg(short, long, default_value = "1")]
        rounds: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("1000000"), Ok(1_000_000));
        assert_eq!(parse_hex_u32("4_000_000"), Ok(4_000_000));
        assert_eq!(parse_hex_u32("0x20"), Ok(0x20));
        assert_eq!(parse_hex_u32("0XFF"), Ok(0xFF));
        assert!(parse_hex_u32("").is_err());
        assert!(parse_hex_u32("0xZZ").is_err());
        assert!(parse_hex_u32("-1").is_err());
    }

    #[test]
    fn test_parse_hex_bytes() {
        assert_eq!(parse_hex_bytes("9f000000"), Ok(HexBytes(vec![0x9F, 0, 0, 0])));
        assert_eq!(parse_hex_bytes("0x01:02:03"), Ok(HexBytes(vec![1, 2, 3])));
        assert_eq!(parse_hex_bytes("AB_cd"), Ok(HexBytes(vec![0xAB, 0xCD])));
        assert!(parse_hex_bytes("éé").is_err());
        assert!(parse_hex_bytes("").is_err());
        assert!(parse_hex_bytes("abc").is_err());
        assert!(parse_hex_bytes("zz").is_err());
    }

    #[test]
    fn test_cli_parses_transfer() {
        let cli = Cli::try_parse_from([
            "spibus", "-vv", "transfer", "-d", "dummy", "-s", "0x1_0000", "9f00", "0102",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Transfer {
                device,
                speed,
                cs_change,
                segments,
            } => {
                assert_eq!(device, "dummy");
                assert_eq!(speed, Some(0x10000));
                assert!(!cs_change);
                assert_eq!(
                    segments,
                    vec![HexBytes(vec![0x9F, 0x00]), HexBytes(vec![0x01, 0x02])]
                );
            }
            _ => panic!("expected transfer command"),
        }
    }

    #[test]
    fn test_cli_loopback_defaults() {
        let cli = Cli::try_parse_from(["spibus", "loopback", "-d", "/dev/spidev0.0"]).unwrap();
        match cli.command {
            Commands::Loopback {
                speed,
                mode,
                bits,
                rounds,
                ..
            } => {
                assert_eq!(speed, 1_000_000);
                assert_eq!(mode, 0);
                assert_eq!(bits, 8);
                assert_eq!(rounds, 1);
            }
            _ => panic!("expected loopback command"),
        }
    }
}
