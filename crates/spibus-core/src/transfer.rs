//! Multi-segment transfer batches
//!
//! A transfer is described by one [`TransferRequest`] per segment: an
//! output buffer plus optional per-segment overrides. [`TransferBatch::build`]
//! validates every request, allocates a receive buffer of the same length
//! for each one, and returns the batch that a backend hands to the kernel as
//! a single `SPI_IOC_MESSAGE(n)` call.
//!
//! Building is all-or-nothing: the first invalid request (in segment order)
//! fails the whole batch and no receive buffer is allocated.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::{Field, Result};
use crate::validate;

/// One segment as described by the caller
///
/// Numeric overrides are kept as the raw values the caller supplied; they
/// are range-checked when the batch is built. `None` means "use the bus
/// handle's current setting".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferRequest {
    /// Bytes to shift out; the segment length is the length of this buffer
    pub tx_buf: Vec<u8>,
    /// Clock speed for this segment
    pub speed_hz: Option<u32>,
    /// Word size for this segment (1-32)
    pub bits_per_word: Option<u32>,
    /// Delay after the segment in microseconds (0-65535)
    pub delay_usecs: Option<u32>,
    /// 1 to release chip select after the segment, 0 to keep it asserted
    pub cs_change: Option<u32>,
    /// Delay between words in microseconds (0-255)
    pub word_delay_usecs: Option<u32>,
    /// Transmit lane width (1-64)
    pub tx_nbits: Option<u32>,
    /// Receive lane width (1-64)
    pub rx_nbits: Option<u32>,
}

impl TransferRequest {
    /// Create a request with no overrides
    pub fn new(tx_buf: impl Into<Vec<u8>>) -> Self {
        Self {
            tx_buf: tx_buf.into(),
            ..Default::default()
        }
    }

    /// Override the clock speed for this segment
    pub fn with_speed(mut self, speed_hz: u32) -> Self {
        self.speed_hz = Some(speed_hz);
        self
    }

    /// Override the word size for this segment
    pub fn with_bits_per_word(mut self, bits: u32) -> Self {
        self.bits_per_word = Some(bits);
        self
    }

    /// Delay after this segment
    pub fn with_delay_usecs(mut self, usecs: u32) -> Self {
        self.delay_usecs = Some(usecs);
        self
    }

    /// Release chip select after this segment
    pub fn with_cs_change(mut self, release: bool) -> Self {
        self.cs_change = Some(release as u32);
        self
    }

    /// Delay between words of this segment
    pub fn with_word_delay_usecs(mut self, usecs: u32) -> Self {
        self.word_delay_usecs = Some(usecs);
        self
    }

    /// Transmit lane width
    pub fn with_tx_nbits(mut self, nbits: u32) -> Self {
        self.tx_nbits = Some(nbits);
        self
    }

    /// Receive lane width
    pub fn with_rx_nbits(mut self, nbits: u32) -> Self {
        self.rx_nbits = Some(nbits);
        self
    }
}

impl From<Vec<u8>> for TransferRequest {
    fn from(tx_buf: Vec<u8>) -> Self {
        Self::new(tx_buf)
    }
}

impl From<&[u8]> for TransferRequest {
    fn from(tx_buf: &[u8]) -> Self {
        Self::new(tx_buf)
    }
}

impl<const N: usize> From<[u8; N]> for TransferRequest {
    fn from(tx_buf: [u8; N]) -> Self {
        Self::new(tx_buf)
    }
}

/// Validated per-segment overrides
///
/// Zero (or `false`) means "inherit from the bus handle", which is also
/// what the kernel assumes for a zeroed `spi_ioc_transfer` field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentSettings {
    /// Clock speed, 0 = handle default
    pub speed_hz: u32,
    /// Word size, 0 = handle default
    pub bits_per_word: u8,
    /// Delay after the segment
    pub delay_usecs: u16,
    /// Release chip select after the segment
    pub cs_change: bool,
    /// Delay between words
    pub word_delay_usecs: u8,
    /// Transmit lane width, 0 = single
    pub tx_nbits: u8,
    /// Receive lane width, 0 = single
    pub rx_nbits: u8,
}

impl SegmentSettings {
    /// Validate the overrides and buffer of one request
    pub fn from_request(req: &TransferRequest) -> Result<Self> {
        validate::validate_buffer_len(req.tx_buf.len())?;

        let mut settings = Self::default();
        if let Some(speed_hz) = req.speed_hz {
            settings.speed_hz = speed_hz;
        }
        if let Some(bits) = req.bits_per_word {
            settings.bits_per_word = validate::validate_bits_per_word(bits)?;
        }
        if let Some(usecs) = req.delay_usecs {
            settings.delay_usecs = validate::validate_delay_usecs(usecs)?;
        }
        if let Some(cs_change) = req.cs_change {
            settings.cs_change = validate::validate_cs_change(cs_change)?;
        }
        if let Some(usecs) = req.word_delay_usecs {
            settings.word_delay_usecs = validate::validate_word_delay_usecs(usecs)?;
        }
        if let Some(nbits) = req.tx_nbits {
            settings.tx_nbits = validate::validate_lane_width(Field::TxNbits, nbits)?;
        }
        if let Some(nbits) = req.rx_nbits {
            settings.rx_nbits = validate::validate_lane_width(Field::RxNbits, nbits)?;
        }
        Ok(settings)
    }
}

/// One segment of a built batch
///
/// Owns both buffers for the lifetime of the transfer. The receive buffer
/// is freshly allocated and never aliases the transmit buffer.
#[derive(Debug)]
pub struct Segment {
    tx: Vec<u8>,
    rx: Vec<u8>,
    settings: SegmentSettings,
}

impl Segment {
    /// Number of bytes shifted in each direction
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    /// Always false for a built segment
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    /// Transmit buffer
    pub fn tx(&self) -> &[u8] {
        &self.tx
    }

    /// Receive buffer
    pub fn rx(&self) -> &[u8] {
        &self.rx
    }

    /// Transmit and receive buffers together, for the backend
    pub fn buffers_mut(&mut self) -> (&[u8], &mut [u8]) {
        (&self.tx, &mut self.rx)
    }

    /// Validated overrides
    pub fn settings(&self) -> &SegmentSettings {
        &self.settings
    }
}

/// An ordered, validated set of segments executed as one kernel call
#[derive(Debug, Default)]
pub struct TransferBatch {
    segments: Vec<Segment>,
}

impl TransferBatch {
    /// Validate `requests` and allocate their receive buffers
    ///
    /// Returns the first validation error in segment order. Nothing is
    /// allocated for the receive side unless every request is valid.
    pub fn build<I, R>(requests: I) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: Into<TransferRequest>,
    {
        let requests: Vec<TransferRequest> = requests.into_iter().map(Into::into).collect();
        validate::validate_segment_count(requests.len())?;

        let mut settings = Vec::with_capacity(requests.len());
        for (index, req) in requests.iter().enumerate() {
            let segment = SegmentSettings::from_request(req).inspect_err(|e| {
                log::debug!("transfer segment {} rejected: {}", index, e);
            })?;
            settings.push(segment);
        }

        let segments = requests
            .into_iter()
            .zip(settings)
            .map(|(req, settings)| Segment {
                rx: vec![0u8; req.tx_buf.len()],
                tx: req.tx_buf,
                settings,
            })
            .collect();

        Ok(Self { segments })
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True only for a default-constructed batch
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total bytes shifted in one direction
    pub fn total_len(&self) -> usize {
        self.segments.iter().map(Segment::len).sum()
    }

    /// Segments in execution order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Segments in execution order, for the backend to fill the receive side
    pub fn segments_mut(&mut self) -> &mut [Segment] {
        &mut self.segments
    }

    /// Hand the receive buffers to the caller, in segment order
    pub fn into_rx_buffers(self) -> Vec<Vec<u8>> {
        self.segments.into_iter().map(|s| s.rx).collect()
    }
}
