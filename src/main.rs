//! spibus - Linux spidev SPI bus tool
//!
//! Command-line front end for `spibus-linux`: inspect and change the bus
//! configuration of a `/dev/spidevX.Y` node, run full-duplex transfers and
//! check a MOSI-to-MISO loopback wire.

mod cli;
mod commands;
mod devices;

use clap::Parser;
use cli::{Cli, Commands};
use spibus_linux::SpiOptions;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let result = match cli.command {
        Commands::Info { device } => {
            let spi = open(&device, None)?;
            commands::cmd_info(&spi)
        }
        Commands::Set {
            device,
            mode,
            bits,
            speed,
        } => {
            let spi = open(&device, None)?;
            commands::cmd_set(&spi, mode, bits, speed)
        }
        Commands::Transfer {
            device,
            speed,
            cs_change,
            segments,
        } => {
            let spi = open(&device, None)?;
            let segments = segments.into_iter().map(|s| s.0).collect();
            commands::cmd_transfer(&spi, segments, speed, cs_change)
        }
        Commands::Loopback {
            device,
            speed,
            mode,
            bits,
            rounds,
        } => {
            let options = SpiOptions::new()
                .with_mode(mode)
                .with_speed(speed)
                .with_bits_per_word(bits);
            let spi = open(&device, Some(&options))?;
            commands::cmd_loopback(&spi, rounds)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Open `device`, applying `options` or keeping its current configuration
fn open(
    device: &str,
    options: Option<&SpiOptions>,
) -> Result<devices::Device, Box<dyn std::error::Error>> {
    let opened: Result<devices::Device, Box<dyn std::error::Error>> = match options {
        Some(options) => devices::open_device(device, options).map_err(Into::into),
        None => devices::open_device_as_is(device).map_err(Into::into),
    };

    opened.map_err(|e| {
        log::debug!("{}", devices::device_help());
        e
    })
}
