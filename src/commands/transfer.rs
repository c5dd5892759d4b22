//! Transfer command implementation

use super::format_hex;
use crate::devices::Device;
use spibus_linux::TransferRequest;

/// Send each segment as part of one transaction and return what came back
pub fn run_transfer(
    spi: &Device,
    segments: Vec<Vec<u8>>,
    speed: Option<u32>,
    cs_change: bool,
) -> Result<Vec<Vec<u8>>, Box<dyn std::error::Error>> {
    let count = segments.len();
    let requests = segments.into_iter().enumerate().map(|(i, tx)| {
        let mut req = TransferRequest::new(tx);
        if let Some(speed) = speed {
            req = req.with_speed(speed);
        }
        // cs_change on the last segment would keep chip select asserted after the message
        if cs_change && i + 1 < count {
            req = req.with_cs_change(true);
        }
        req
    });

    Ok(spi.transfer_blocking(requests)?)
}

/// Print one line of received bytes per segment
pub fn cmd_transfer(
    spi: &Device,
    segments: Vec<Vec<u8>>,
    speed: Option<u32>,
    cs_change: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let total: usize = segments.iter().map(Vec::len).sum();
    log::info!("Transferring {} segment(s), {} bytes", segments.len(), total);

    for rx in run_transfer(spi, segments, speed, cs_change)? {
        println!("{}", format_hex(&rx));
    }
    Ok(())
}
