//! Progress events published by the pool
//!
//! Events go over a bounded `tokio::sync::mpsc` channel handed to the pool at
//! construction. Publishing never blocks a worker: when the channel is full or
//! closed the event is dropped and counted.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::trace;

use super::ledger::WorkerId;
use super::report::RunSummary;
use crate::scrape_types::ExtractionStatus;
use crate::session::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Primary,
    Retry,
}

impl Pass {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Retry => "retry",
        }
    }
}

#[derive(Debug, Clone)]
pub enum PoolEvent {
    WorkerStarted {
        pass: Pass,
        worker: WorkerId,
        session: SessionId,
        assigned: usize,
    },
    WorkerFailedToStart {
        pass: Pass,
        worker: WorkerId,
        error: String,
    },
    UrlProcessed {
        pass: Pass,
        worker: WorkerId,
        url: String,
        status: ExtractionStatus,
        attempts: u32,
        /// Records in the store after this one
        processed: usize,
        total: usize,
    },
    WorkerFinished {
        pass: Pass,
        worker: WorkerId,
        completed: usize,
        cancelled: bool,
    },
    RetryPassStarted {
        urls: usize,
        workers: usize,
    },
    RetryPassSkipped {
        held: usize,
    },
    Finished {
        summary: RunSummary,
        cancelled: bool,
    },
}

/// Sending half used by the pool; a no-op when no channel was supplied
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::Sender<PoolEvent>>,
    dropped: Arc<AtomicU64>,
}

impl EventSink {
    #[must_use]
    pub fn new(tx: mpsc::Sender<PoolEvent>) -> Self {
        Self {
            tx: Some(tx),
            dropped: Arc::default(),
        }
    }

    /// Channel of `capacity` with its sink
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<PoolEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: PoolEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(e) = tx.try_send(event) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            trace!(target: "marketscrape::pool", "Pool event dropped: {e}");
        }
    }

    /// Events that could not be delivered
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
