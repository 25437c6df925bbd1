//! `BrowserSession` backed by a dedicated Chrome process

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::launch::{browser_config, browser_executable, launch_browser};
use super::profile::create_unique_profile;
use super::{BrowserSession, SessionId, SessionLauncher};
use crate::stealth::{self, Fingerprint};
use crate::wait::with_page_timeout;

/// Launches one Chrome process per session
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    disable_images: bool,
    navigation_timeout: Duration,
}

impl ChromiumLauncher {
    #[must_use]
    pub fn new(disable_images: bool, navigation_timeout: Duration) -> Self {
        Self {
            disable_images,
            navigation_timeout,
        }
    }
}

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    async fn launch(&self, headless: bool, id: SessionId) -> Result<Box<dyn BrowserSession>> {
        let executable = browser_executable().await?;
        let profile = create_unique_profile()?;
        let config = browser_config(
            &executable,
            profile.path(),
            headless,
            self.disable_images,
            Fingerprint::jittered_viewport(),
        )?;

        let (mut browser, handler) = launch_browser(config).await?;
        let profile_dir = profile.into_path();

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                shutdown(&mut browser, handler, &profile_dir).await;
                return Err(e).context("Failed to open session tab");
            }
        };

        // A session without evasions still works, it is just easier to flag
        if let Err(e) = stealth::inject(&page, &Fingerprint::randomized()).await {
            warn!(target: "marketscrape::session", "{id}: stealth injection failed: {e}");
        }

        info!(target: "marketscrape::session", "{id}: browser ready (headless: {headless})");
        Ok(Box::new(ChromiumSession {
            id,
            page,
            browser: tokio::sync::Mutex::new(Some(browser)),
            handler: parking_lot::Mutex::new(Some(handler)),
            profile_dir,
            navigation_timeout: self.navigation_timeout,
        }))
    }
}

pub struct ChromiumSession {
    id: SessionId,
    page: Page,
    browser: tokio::sync::Mutex<Option<Browser>>,
    handler: parking_lot::Mutex<Option<JoinHandle<()>>>,
    profile_dir: PathBuf,
    navigation_timeout: Duration,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    fn id(&self) -> SessionId {
        self.id
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        with_page_timeout(
            async {
                self.page.goto(url).await?;
                Ok(())
            },
            self.navigation_timeout,
            "navigation",
        )
        .await
    }

    async fn reload(&self) -> Result<()> {
        with_page_timeout(
            async {
                self.page.reload().await?;
                Ok(())
            },
            self.navigation_timeout,
            "reload",
        )
        .await
    }

    async fn title(&self) -> Result<String> {
        Ok(self.page.get_title().await?.unwrap_or_default())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("Script evaluation failed")?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.page.find_element(selector).await?.click().await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };
        let Some(handler) = self.handler.lock().take() else {
            return Ok(());
        };
        let errors = shutdown(&mut browser, handler, &self.profile_dir).await;
        if errors.is_empty() {
            Ok(())
        } else {
            Err(anyhow::anyhow!("{}: {}", self.id, errors.join("; ")))
        }
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.get_mut().take() {
            warn!(target: "marketscrape::session", "{} dropped without close()", self.id);
            handler.abort();
            let _ = std::fs::remove_dir_all(&self.profile_dir);
        }
    }
}

/// Close the browser, wait for the process, remove the profile, stop the handler
async fn shutdown(browser: &mut Browser, handler: JoinHandle<()>, profile_dir: &Path) -> Vec<String> {
    let mut errors = Vec::new();

    if let Err(e) = browser.close().await {
        warn!(target: "marketscrape::session", "Failed to close browser: {e}");
        errors.push(format!("Browser close failed: {e}"));
    }

    // Wait for the process to exit before deleting its profile
    if let Err(e) = browser.wait().await {
        warn!(target: "marketscrape::session", "Failed to wait for browser exit: {e}");
        errors.push(format!("Browser wait failed: {e}"));
    }

    if let Err(e) = tokio::fs::remove_dir_all(profile_dir).await {
        warn!(target: "marketscrape::session", "Failed to remove profile {}: {e}", profile_dir.display());
        errors.push(format!("Profile cleanup failed: {e}"));
    }

    handler.abort();
    debug!(target: "marketscrape::session", "Browser shut down ({} cleanup errors)", errors.len());
    errors
}
