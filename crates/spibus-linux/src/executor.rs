//! Asynchronous transfer execution
//!
//! `SPI_IOC_MESSAGE` blocks for as long as the hardware transfer takes, so
//! it runs on the tokio blocking pool: one task per submitted batch, one
//! oneshot channel per task for the result. The caller gets a
//! [`PendingTransfer`], which can be awaited or waited on from plain
//! threads.
//!
//! There is no cancellation. Dropping a [`PendingTransfer`] discards the
//! result but the transfer itself still runs to completion.

use crate::bus::BusHandle;
use crate::error::TransferError;
use crate::io::SpidevIo;

use spibus_core::transfer::TransferBatch;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};

use tokio::runtime::{Handle, Runtime};
use tokio::sync::oneshot;

/// Global tokio runtime for callers outside any runtime
static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Monotonic id for log messages
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Get or create the global tokio runtime
fn get_runtime() -> &'static Runtime {
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .thread_name("spibus-worker")
            .enable_all()
            .build()
            .expect("Failed to create tokio runtime")
    })
}

/// Received buffers, one per segment, in segment order
pub type TransferResult = Result<Vec<Vec<u8>>, TransferError>;

/// Lifecycle of a submitted transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// Queued on the worker pool
    Submitted,
    /// Holding the bus guard, inside the kernel call
    Executing,
    /// Receive buffers delivered
    Completed,
    /// Error delivered
    Failed,
}

impl TransferState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Submitted,
            1 => Self::Executing,
            2 => Self::Completed,
            _ => Self::Failed,
        }
    }
}

/// Runs transfers on a tokio blocking pool
#[derive(Debug, Clone)]
pub struct Executor {
    handle: Handle,
}

impl Executor {
    /// Use the given runtime
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the current runtime, or a process-wide one outside of tokio
    pub fn current() -> Self {
        match Handle::try_current() {
            Ok(handle) => Self::new(handle),
            Err(_) => Self::new(get_runtime().handle().clone()),
        }
    }

    /// Queue `batch` for execution on `bus`
    ///
    /// Returns immediately. The result is delivered exactly once through
    /// the returned [`PendingTransfer`].
    pub fn submit<D>(&self, bus: Arc<BusHandle<D>>, batch: TransferBatch) -> PendingTransfer
    where
        D: SpidevIo + 'static,
    {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let state = Arc::new(AtomicU8::new(TransferState::Submitted as u8));
        let (tx, rx) = oneshot::channel();

        log::debug!(
            "transfer {}: submitted {} segment(s) on {}",
            id,
            batch.len(),
            bus.name()
        );

        let worker_state = Arc::clone(&state);
        self.handle.spawn_blocking(move || {
            let result = execute(&bus, batch, &worker_state);
            let end = match &result {
                Ok(_) => TransferState::Completed,
                Err(e) => {
                    log::debug!("transfer {}: failed: {}", id, e);
                    TransferState::Failed
                }
            };
            worker_state.store(end as u8, Ordering::Release);

            if tx.send(result).is_err() {
                log::debug!("transfer {}: result dropped by caller", id);
            }
        });

        PendingTransfer { id, state, rx }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::current()
    }
}

/// Body of one worker task
fn execute<D: SpidevIo>(
    bus: &BusHandle<D>,
    mut batch: TransferBatch,
    state: &AtomicU8,
) -> TransferResult {
    bus.with_io(|io| {
        state.store(TransferState::Executing as u8, Ordering::Release);
        if batch.is_empty() {
            return Err(TransferError::NoTransfers);
        }
        io.transfer(&mut batch).map_err(TransferError::IoctlFailed)
    })?;

    Ok(batch.into_rx_buffers())
}

/// A submitted transfer whose result has not been collected yet
///
/// Resolves to the received buffers or a [`TransferError`].
#[derive(Debug)]
pub struct PendingTransfer {
    id: u64,
    state: Arc<AtomicU8>,
    rx: oneshot::Receiver<TransferResult>,
}

impl PendingTransfer {
    /// Identifier used in log messages
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Where the transfer currently is in its lifecycle
    pub fn state(&self) -> TransferState {
        TransferState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Block the current thread until the result is available
    ///
    /// Must not be called from within an async context; `.await` the
    /// transfer there instead.
    pub fn wait(self) -> TransferResult {
        self.rx
            .blocking_recv()
            .unwrap_or(Err(TransferError::WorkerLost))
    }
}

impl Future for PendingTransfer {
    type Output = TransferResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.unwrap_or(Err(TransferError::WorkerLost)))
    }
}
