//! Linux spidev ioctl definitions
//!
//! Mirrors `<linux/spi/spidev.h>`. The request numbers and the
//! `spi_ioc_transfer` layout are fixed by the kernel ABI.

use nix::{ioctl_read, ioctl_write_ptr};

// SPI ioctl magic number
const SPI_IOC_MAGIC: u8 = b'k';

// SPI ioctl type numbers
const SPI_IOC_TYPE_MESSAGE: u8 = 0;
const SPI_IOC_TYPE_MODE: u8 = 1;
const SPI_IOC_TYPE_BITS_PER_WORD: u8 = 3;
const SPI_IOC_TYPE_MAX_SPEED_HZ: u8 = 4;

ioctl_read!(spi_ioc_rd_mode, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, u8);
ioctl_write_ptr!(spi_ioc_wr_mode, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, u8);
ioctl_read!(
    spi_ioc_rd_bits_per_word,
    SPI_IOC_MAGIC,
    SPI_IOC_TYPE_BITS_PER_WORD,
    u8
);
ioctl_write_ptr!(
    spi_ioc_wr_bits_per_word,
    SPI_IOC_MAGIC,
    SPI_IOC_TYPE_BITS_PER_WORD,
    u8
);
ioctl_read!(
    spi_ioc_rd_max_speed_hz,
    SPI_IOC_MAGIC,
    SPI_IOC_TYPE_MAX_SPEED_HZ,
    u32
);
ioctl_write_ptr!(
    spi_ioc_wr_max_speed_hz,
    SPI_IOC_MAGIC,
    SPI_IOC_TYPE_MAX_SPEED_HZ,
    u32
);

/// Size of `struct spi_ioc_transfer`, identical on 32- and 64-bit
pub const SPI_IOC_TRANSFER_SIZE: usize = 32;

// _IOC field widths
const IOC_SIZEBITS: u32 = 14;
const IOC_SIZESHIFT: u32 = 16;
const IOC_TYPESHIFT: u32 = 8;
const IOC_DIRSHIFT: u32 = 30;
const IOC_WRITE: u32 = 1;

/// Request number for `SPI_IOC_MESSAGE(n)`
///
/// `_IOW(SPI_IOC_MAGIC, 0, char[n * sizeof(struct spi_ioc_transfer)])`.
/// Like the kernel macro, a message too large for the size field encodes a
/// size of 0, which the driver rejects.
pub fn spi_ioc_message(n: usize) -> libc::c_ulong {
    let bytes = n * SPI_IOC_TRANSFER_SIZE;
    let size = if bytes < (1 << IOC_SIZEBITS) {
        bytes as u32
    } else {
        0
    };
    ((IOC_WRITE << IOC_DIRSHIFT)
        | (size << IOC_SIZESHIFT)
        | ((SPI_IOC_MAGIC as u32) << IOC_TYPESHIFT)
        | SPI_IOC_TYPE_MESSAGE as u32) as libc::c_ulong
}

/// SPI transfer structure for ioctl
/// This must match the kernel's struct spi_ioc_transfer layout
#[repr(C)]
#[derive(Debug, Default, Clone)]
pub struct SpiIocTransfer {
    pub tx_buf: u64,          // __u64 tx_buf
    pub rx_buf: u64,          // __u64 rx_buf
    pub len: u32,             // __u32 len
    pub speed_hz: u32,        // __u32 speed_hz
    pub delay_usecs: u16,     // __u16 delay_usecs
    pub bits_per_word: u8,    // __u8 bits_per_word
    pub cs_change: u8,        // __u8 cs_change
    pub tx_nbits: u8,         // __u8 tx_nbits
    pub rx_nbits: u8,         // __u8 rx_nbits
    pub word_delay_usecs: u8, // __u8 word_delay_usecs
    pub _pad: u8,             // padding
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_struct_layout() {
        assert_eq!(std::mem::size_of::<SpiIocTransfer>(), SPI_IOC_TRANSFER_SIZE);
    }

    #[test]
    fn test_message_request_numbers() {
        // Values of SPI_IOC_MESSAGE(1) and SPI_IOC_MESSAGE(2) from spidev.h
        assert_eq!(spi_ioc_message(1), 0x4020_6b00);
        assert_eq!(spi_ioc_message(2), 0x4040_6b00);
        assert_eq!(spi_ioc_message(511), 0x7fe0_6b00);
        // Too large for the 14-bit size field
        assert_eq!(spi_ioc_message(512), 0x4000_6b00);
    }
}
