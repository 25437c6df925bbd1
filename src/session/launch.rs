//! Chrome discovery and launch configuration

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

use crate::utils::constants::CHROME_USER_AGENT;

/// Resolved once per process; twenty workers must not each search or download
static BROWSER_EXECUTABLE: OnceCell<PathBuf> = OnceCell::const_new();

/// Find Chrome/Chromium on this machine, honouring `CHROMIUM_PATH` first
pub fn find_browser_executable() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!(target: "marketscrape::session", "Using browser from CHROMIUM_PATH: {}", path.display());
            return Some(path);
        }
        warn!(
            target: "marketscrape::session",
            "CHROMIUM_PATH points to non-existent file: {}",
            path.display()
        );
    }

    let candidates: &[&str] = if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ]
    } else if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "~/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
        ]
    };

    for candidate in candidates {
        let path = match candidate.strip_prefix("~/") {
            Some(rest) => match dirs::home_dir() {
                Some(home) => home.join(rest),
                None => continue,
            },
            None => PathBuf::from(candidate),
        };
        if path.exists() {
            info!(target: "marketscrape::session", "Found browser at: {}", path.display());
            return Some(path);
        }
    }

    if !cfg!(target_os = "windows") {
        for cmd in ["chromium", "chromium-browser", "google-chrome", "chrome"] {
            if let Ok(output) = Command::new("which").arg(cmd).output()
                && output.status.success()
            {
                let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !found.is_empty() {
                    return Some(PathBuf::from(found));
                }
            }
        }
    }

    None
}

/// Download a managed Chromium into the user cache directory
pub async fn download_managed_browser() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("marketscrape")
        .join("chromium");
    tokio::fs::create_dir_all(&cache_dir)
        .await
        .context("Failed to create browser cache directory")?;

    info!(target: "marketscrape::session", "Downloading managed Chromium into {}", cache_dir.display());
    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .context("Failed to build fetcher options")?,
    );
    let revision = fetcher.fetch().await.context("Failed to fetch browser")?;
    Ok(revision.executable_path)
}

/// Local browser if one exists, otherwise a downloaded one; cached per process
pub async fn browser_executable() -> Result<PathBuf> {
    BROWSER_EXECUTABLE
        .get_or_try_init(|| async {
            match find_browser_executable() {
                Some(path) => Ok(path),
                None => {
                    warn!(target: "marketscrape::session", "No local Chrome/Chromium found, using fetcher");
                    download_managed_browser().await
                }
            }
        })
        .await
        .cloned()
}

/// Command-line flags for a scraping session
///
/// Images are disabled by launch flag; JavaScript stays on because the
/// extractor's DOM-script fallbacks depend on it.
pub fn launch_args(disable_images: bool) -> Vec<String> {
    let mut args: Vec<String> = [
        "--disable-blink-features=AutomationControlled",
        "--disable-gpu",
        "--disable-dev-shm-usage",
        "--disable-infobars",
        "--disable-notifications",
        "--disable-extensions",
        "--disable-popup-blocking",
        "--disable-background-timer-throttling",
        "--disable-backgrounding-occluded-windows",
        "--disable-breakpad",
        "--disable-features=TranslateUI",
        "--disable-hang-monitor",
        "--no-first-run",
        "--no-default-browser-check",
        "--no-sandbox",
        "--password-store=basic",
        "--use-mock-keychain",
        "--mute-audio",
        "--lang=ru-RU",
    ]
    .iter()
    .map(ToString::to_string)
    .collect();

    args.push(format!("--user-agent={CHROME_USER_AGENT}"));
    if disable_images {
        args.push("--blink-settings=imagesEnabled=false".to_string());
    }
    args
}

pub fn browser_config(
    executable: &Path,
    user_data_dir: &Path,
    headless: bool,
    disable_images: bool,
    (width, height): (u32, u32),
) -> Result<BrowserConfig> {
    let mut builder = BrowserConfigBuilder::default()
        .request_timeout(Duration::from_secs(30))
        .window_size(width, height)
        .user_data_dir(user_data_dir)
        .chrome_executable(executable)
        .args(launch_args(disable_images));

    builder = if headless {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head()
    };

    builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build browser config: {e}"))
}

/// Launch Chrome and spawn its CDP handler task
pub async fn launch_browser(config: BrowserConfig) -> Result<(Browser, JoinHandle<()>)> {
    let (browser, mut handler) = Browser::launch(config)
        .await
        .context("Failed to launch browser")?;

    let handler_task = task::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                let message = e.to_string();
                // Chrome emits CDP events chromiumoxide cannot deserialize; they are harmless
                let benign = message.contains("data did not match any variant of untagged enum Message")
                    || message.contains("Failed to deserialize WS response");
                if benign {
                    trace!(target: "marketscrape::session", "Suppressed CDP serialization error: {message}");
                } else {
                    error!(target: "marketscrape::session", "Browser handler error: {e:?}");
                }
            }
        }
        debug!(target: "marketscrape::session", "Browser handler task completed");
    });

    Ok((browser, handler_task))
}
