//! CLI command implementations
//!
//! Each command takes an already opened [`Device`](crate::devices::Device)
//! and reports through stdout and the log.

mod info;
mod loopback;
mod set;
mod transfer;

pub use info::cmd_info;
pub use loopback::cmd_loopback;
pub use set::cmd_set;
pub use transfer::cmd_transfer;

/// Format bytes as space-separated hex pairs
pub fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format a clock speed for humans
pub fn format_speed(hz: u32) -> String {
    if hz >= 1_000_000 && hz % 1_000 == 0 {
        format!("{} MHz", hz as f64 / 1_000_000.0)
    } else if hz >= 1_000 {
        format!("{} kHz", hz as f64 / 1_000.0)
    } else {
        format!("{} Hz", hz)
    }
}
