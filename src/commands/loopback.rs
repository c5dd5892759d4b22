//! Loopback self test
//!
//! With MOSI wired to MISO every byte sent must come back unchanged.

use crate::devices::Device;

/// Eight rows of eight bytes, each row sent as its own segment
pub const TEST_PATTERN: [[u8; 8]; 8] = [
    [0x3a, 0xf7, 0x42, 0x91, 0x5e, 0xc8, 0x2d, 0xb0],
    [0x67, 0x1f, 0x9d, 0xe4, 0x33, 0xaa, 0x76, 0x08],
    [0xcd, 0x50, 0xb2, 0x7f, 0x19, 0x84, 0xeb, 0x26],
    [0x72, 0x39, 0xa5, 0x0c, 0xd8, 0x63, 0xfe, 0x47],
    [0x15, 0x8e, 0x21, 0xda, 0x54, 0xbf, 0x30, 0x9a],
    [0x4d, 0xe7, 0x82, 0x3b, 0x69, 0xf0, 0x5c, 0x97],
    [0x0a, 0x75, 0xd1, 0x6e, 0xbb, 0x24, 0x8f, 0x52],
    [0x38, 0xc3, 0x7a, 0x95, 0x01, 0xec, 0x57, 0xa2],
];

/// Byte positions where `rx` differs from `tx`
pub fn mismatches(tx: &[u8], rx: &[u8]) -> Vec<usize> {
    (0..tx.len().max(rx.len()))
        .filter(|&i| tx.get(i) != rx.get(i))
        .collect()
}

/// Send the pattern `rounds` times and count the bad bytes
pub fn run_loopback(spi: &Device, rounds: u32) -> Result<usize, Box<dyn std::error::Error>> {
    let mut errors = 0;

    for round in 1..=rounds {
        let rx = spi.transfer_blocking(TEST_PATTERN)?;

        for (row, (tx, rx)) in TEST_PATTERN.iter().zip(&rx).enumerate() {
            let bad = mismatches(tx, rx);
            if bad.is_empty() {
                log::debug!("round {} row {}: ok", round, row);
                continue;
            }
            errors += bad.len();
            println!("Round {} row {}:", round, row);
            println!("  In:  {}", super::format_hex(tx));
            println!("  Out: {}", super::format_hex(rx));
        }
    }

    Ok(errors)
}

/// Run the self test and fail if any byte came back wrong
pub fn cmd_loopback(spi: &Device, rounds: u32) -> Result<(), Box<dyn std::error::Error>> {
    println!("SPI device:    {}", spi.bus().name());
    println!("Max speed Hz:  {}", spi.max_speed_hz()?);
    println!("Mode:          {}", spi.mode()?);
    println!("Bits per word: {}", spi.bits_per_word()?);
    println!("-- Loopback test --");

    let errors = run_loopback(spi, rounds)?;
    if errors > 0 {
        return Err(format!("Loopback test failed: {} byte(s) differ", errors).into());
    }

    println!(
        "Loopback test passed ({} round(s), {} bytes)",
        rounds,
        rounds as usize * TEST_PATTERN.len() * TEST_PATTERN[0].len()
    );
    Ok(())
}
