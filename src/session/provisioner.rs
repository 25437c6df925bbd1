//! Live-session registry
//!
//! `acquire` launches a session and records it; `release` closes it and drops
//! the record. `release_all` closes whatever is still registered and is the
//! shutdown safety net for a pipeline run.

use dashmap::DashMap;
use futures::future::join_all;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use super::{BrowserSession, SessionId, SessionLauncher};
use crate::error::{ScrapeError, ScrapeResult};

/// Exclusive handle to one provisioned session
///
/// Deliberately not `Clone`: the worker holding it is the only user.
pub struct SessionHandle {
    id: SessionId,
    session: Arc<dyn BrowserSession>,
}

impl SessionHandle {
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl Deref for SessionHandle {
    type Target = dyn BrowserSession;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle").field("id", &self.id).finish()
    }
}

pub struct DriverProvisioner {
    launcher: Arc<dyn SessionLauncher>,
    live: DashMap<SessionId, Arc<dyn BrowserSession>>,
    shutting_down: AtomicBool,
}

impl DriverProvisioner {
    pub fn new(launcher: Arc<dyn SessionLauncher>) -> Arc<Self> {
        Arc::new(Self {
            launcher,
            live: DashMap::new(),
            shutting_down: AtomicBool::new(false),
        })
    }

    /// Launch a new isolated session
    ///
    /// No retries here; a launch failure is returned to the caller as
    /// `ScrapeError::Provision`.
    pub async fn acquire(&self, headless: bool) -> ScrapeResult<SessionHandle> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(ScrapeError::Provision("provisioner is shutting down".into()));
        }

        let id = SessionId::next();
        let session: Arc<dyn BrowserSession> = self
            .launcher
            .launch(headless, id)
            .await
            .map_err(|e| ScrapeError::Provision(format!("{e:#}")))?
            .into();

        self.live.insert(id, Arc::clone(&session));
        debug!(
            target: "marketscrape::session",
            "Acquired {id} ({} live)",
            self.live.len()
        );
        Ok(SessionHandle { id, session })
    }

    /// Close a session and forget it; close failures are logged
    pub async fn release(&self, handle: SessionHandle) {
        let id = handle.id;
        self.live.remove(&id);
        if let Err(e) = handle.session.close().await {
            warn!(target: "marketscrape::session", "Error closing {id}: {e:#}");
        }
        debug!(
            target: "marketscrape::session",
            "Released {id} ({} live)",
            self.live.len()
        );
    }

    /// Close every registered session and refuse new acquisitions
    ///
    /// Returns how many sessions were still live.
    pub async fn release_all(&self) -> usize {
        self.shutting_down.store(true, Ordering::Release);

        let ids: Vec<SessionId> = self.live.iter().map(|e| *e.key()).collect();
        let sessions: Vec<_> = ids
            .into_iter()
            .filter_map(|id| self.live.remove(&id).map(|(_, s)| s))
            .collect();

        let count = sessions.len();
        if count > 0 {
            info!(target: "marketscrape::session", "Closing {count} leftover sessions");
        }
        let results = join_all(sessions.iter().map(|s| s.close())).await;
        for (session, result) in sessions.iter().zip(results) {
            if let Err(e) = result {
                warn!(target: "marketscrape::session", "Error closing {}: {e:#}", session.id());
            }
        }
        count
    }

    /// Sessions acquired and not yet released
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn is_live(&self, id: SessionId) -> bool {
        self.live.contains_key(&id)
    }
}
