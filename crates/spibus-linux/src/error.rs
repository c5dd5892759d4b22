//! Error types for spidev operations

use spibus_core::ValidationError;
use thiserror::Error;

/// Failure to acquire a bus handle
#[derive(Debug, Error)]
pub enum OpenError {
    /// The device node does not exist
    #[error("SPI device {path} not found")]
    NotFound { path: String },

    /// The device node exists but cannot be opened read/write
    #[error("Permission denied opening {path}")]
    PermissionDenied { path: String },

    /// Another process holds the exclusive lock
    #[error("SPI device {path} is already locked by another process")]
    AlreadyLocked { path: String },

    /// Any other open or lock failure
    #[error("Failed to open {path}: {source}")]
    Other {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Initial options were rejected; the handle has been closed
    #[error("Invalid initial configuration: {0}")]
    InvalidConfig(#[source] ConfigError),
}

impl OpenError {
    /// Classify an error from `open(2)` on `path`
    pub(crate) fn from_io(path: &str, source: std::io::Error) -> Self {
        let path = path.to_string();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Other { path, source },
        }
    }
}

/// Failure to read or change a bus setting
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The requested value was rejected before any kernel call
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The kernel rejected the ioctl
    #[error("{action} failed: {source}")]
    IoctlFailed {
        action: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The bus handle has been closed
    #[error("SPI device is not open")]
    NotOpen,
}

/// Failure of a submitted transfer
#[derive(Debug, Error)]
pub enum TransferError {
    /// A segment was rejected before any kernel call
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The batch reached the worker without segments
    #[error("No transfers specified")]
    NoTransfers,

    /// `SPI_IOC_MESSAGE` failed
    #[error("SPI transfer failed: {0}")]
    IoctlFailed(#[source] std::io::Error),

    /// The bus handle has been closed
    #[error("SPI device is not open")]
    NotOpen,

    /// The worker ended without delivering a result
    #[error("SPI transfer worker terminated before completing")]
    WorkerLost,
}

/// Marker returned by [`BusHandle::with_io`](crate::BusHandle::with_io) on a closed handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotOpen;

impl From<NotOpen> for ConfigError {
    fn from(_: NotOpen) -> Self {
        Self::NotOpen
    }
}

impl From<NotOpen> for TransferError {
    fn from(_: NotOpen) -> Self {
        Self::NotOpen
    }
}

/// Any spidev driver error
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Open(#[from] OpenError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// Result type for spidev operations
pub type Result<T> = std::result::Result<T, Error>;
