//! Session ownership ledger
//!
//! Records which worker holds which session while the pool runs. A claim on a
//! session already held by another worker, or a second session claimed by the
//! same worker, is recorded as a violation instead of panicking so tests can
//! assert on the full history.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::error;

use crate::session::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub usize);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerViolation {
    /// Session claimed while another worker held it
    SharedSession {
        session: SessionId,
        holder: WorkerId,
        claimant: WorkerId,
    },
    /// Worker claimed a second session without releasing the first
    SecondSession { worker: WorkerId, session: SessionId },
}

#[derive(Debug, Default)]
pub struct SessionLedger {
    holders: DashMap<SessionId, WorkerId>,
    violations: Mutex<Vec<LedgerViolation>>,
    peak: AtomicUsize,
}

impl SessionLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&self, session: SessionId, worker: WorkerId) {
        if self.holders.iter().any(|e| *e.value() == worker) {
            self.violate(LedgerViolation::SecondSession { worker, session });
        }
        if let Some(holder) = self.holders.insert(session, worker)
            && holder != worker
        {
            self.violate(LedgerViolation::SharedSession {
                session,
                holder,
                claimant: worker,
            });
        }
        self.peak.fetch_max(self.holders.len(), Ordering::Relaxed);
    }

    pub fn release(&self, session: SessionId, worker: WorkerId) {
        self.holders.remove_if(&session, |_, holder| *holder == worker);
    }

    fn violate(&self, violation: LedgerViolation) {
        error!(target: "marketscrape::pool", "Session isolation violated: {violation:?}");
        self.violations.lock().push(violation);
    }

    #[must_use]
    pub fn violations(&self) -> Vec<LedgerViolation> {
        self.violations.lock().clone()
    }

    /// Sessions currently held
    #[must_use]
    pub fn active(&self) -> usize {
        self.holders.len()
    }

    /// Most sessions held at the same time during the run
    #[must_use]
    pub fn peak_active(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }
}
