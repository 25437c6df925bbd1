//! Worker pool orchestration
//!
//! - `partition`: round-robin assignment
//! - `store`: mutex-guarded result collection
//! - `retry_queue`: one-shot secondary pass queue
//! - `ledger`: session ownership tracking
//! - `events`: bounded progress channel
//! - `orchestrator`: `WorkerPool` itself

pub mod cancel;
pub mod events;
pub mod ledger;
pub mod orchestrator;
pub mod partition;
pub mod report;
pub mod retry_queue;
pub mod store;

pub use cancel::CancellationFlag;
pub use events::{EventSink, Pass, PoolEvent};
pub use ledger::{LedgerViolation, SessionLedger, WorkerId};
pub use orchestrator::WorkerPool;
pub use partition::round_robin;
pub use report::{PoolReport, RunSummary};
pub use retry_queue::RetryQueue;
pub use store::ResultStore;
