//! Browser sessions and their provisioning
//!
//! Everything above this module talks to a page through the `BrowserSession`
//! trait. The Chromium implementation lives in `chromium`; tests drive the
//! collector, extractor and pool with scripted fakes.

pub mod chromium;
pub mod launch;
pub mod profile;
pub mod provisioner;

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub use chromium::{ChromiumLauncher, ChromiumSession};
pub use provisioner::{DriverProvisioner, SessionHandle};

/// Process-unique identifier of one browser session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate the next id
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// One isolated browser tab owned by exactly one worker
///
/// Methods take `&self` so a session can sit behind an `Arc` in the
/// provisioner registry while its worker drives it.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    fn id(&self) -> SessionId;

    /// Navigate and wait for the load event
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Reload the current document in place
    async fn reload(&self) -> Result<()>;

    async fn title(&self) -> Result<String>;

    /// Address after redirects
    async fn current_url(&self) -> Result<String>;

    /// Evaluate a script expression; `undefined` comes back as `Null`
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Native input click on the first element matching `selector`
    async fn click(&self, selector: &str) -> Result<()>;

    /// Terminate the browser process and remove its profile
    async fn close(&self) -> Result<()>;
}

/// Starts browser sessions; one call spawns one browser process
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self, headless: bool, id: SessionId) -> Result<Box<dyn BrowserSession>>;
}
