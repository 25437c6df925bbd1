//! Core configuration types for scrape runs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ScrapeError, ScrapeResult};
use crate::utils::constants::{
    DEFAULT_EVENT_CHANNEL_CAPACITY, DEFAULT_INTER_URL_DELAY_MS, DEFAULT_LINK_WORKERS,
    DEFAULT_LINKS_FILE_NAME, DEFAULT_MAX_EXTRACTION_ATTEMPTS, DEFAULT_MAX_IDLE_SCROLLS,
    DEFAULT_PAGE_LOAD_TIMEOUT_SECS, DEFAULT_PRODUCT_URL_PREFIX, DEFAULT_PRODUCT_WORKERS,
    DEFAULT_RELOAD_DELAY_MS, DEFAULT_RETRY_WORKERS, DEFAULT_SCROLL_DELAY_MS,
    DEFAULT_SETTLE_DELAY_MS, DEFAULT_TARGET_LINKS, DEFAULT_WORKER_STAGGER_MS,
};

/// On-disk layout of the collected links file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkFormat {
    /// JSON array of `CollectedLink` objects
    #[default]
    Json,
    /// One URL per line
    Lines,
}

/// Resolved settings for one scrape run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Directory receiving the links file and result tables
    pub(crate) results_dir: PathBuf,
    pub(crate) links_file_name: String,
    pub(crate) link_format: LinkFormat,

    pub(crate) target_links: usize,
    pub(crate) max_idle_scrolls: u32,
    pub(crate) scroll_delay_ms: u64,
    /// Upper bound for the listing container or product content to appear
    pub(crate) page_load_timeout_secs: u64,

    pub(crate) product_workers: usize,
    pub(crate) link_workers: usize,
    pub(crate) retry_workers: usize,
    pub(crate) worker_stagger_ms: u64,
    pub(crate) inter_url_delay_ms: u64,
    pub(crate) settle_delay_ms: u64,
    pub(crate) reload_delay_ms: u64,

    /// Full extraction attempts per URL, first load included
    pub(crate) max_extraction_attempts: u32,
    pub(crate) retry_on_missing_product: bool,
    /// Retry a successful page whose company name was not found.
    ///
    /// Sellers that never publish company details will burn the whole attempt
    /// budget when this is on.
    pub(crate) retry_on_missing_company: bool,

    pub(crate) headless: bool,
    pub(crate) disable_images: bool,
    pub(crate) product_url_prefix: String,
    pub(crate) event_channel_capacity: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            links_file_name: DEFAULT_LINKS_FILE_NAME.to_string(),
            link_format: LinkFormat::Json,
            target_links: DEFAULT_TARGET_LINKS,
            max_idle_scrolls: DEFAULT_MAX_IDLE_SCROLLS,
            scroll_delay_ms: DEFAULT_SCROLL_DELAY_MS,
            page_load_timeout_secs: DEFAULT_PAGE_LOAD_TIMEOUT_SECS,
            product_workers: DEFAULT_PRODUCT_WORKERS,
            link_workers: DEFAULT_LINK_WORKERS,
            retry_workers: DEFAULT_RETRY_WORKERS,
            worker_stagger_ms: DEFAULT_WORKER_STAGGER_MS,
            inter_url_delay_ms: DEFAULT_INTER_URL_DELAY_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            reload_delay_ms: DEFAULT_RELOAD_DELAY_MS,
            max_extraction_attempts: DEFAULT_MAX_EXTRACTION_ATTEMPTS,
            retry_on_missing_product: true,
            retry_on_missing_company: true,
            headless: true,
            disable_images: true,
            product_url_prefix: DEFAULT_PRODUCT_URL_PREFIX.to_string(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl ScrapeConfig {
    /// Load a config from a JSON file; absent keys keep their defaults
    ///
    /// # Errors
    ///
    /// Returns `ScrapeError::Io` if the file cannot be read and
    /// `ScrapeError::Config` if it does not parse or fails validation.
    pub fn from_json_file(path: impl AsRef<Path>) -> ScrapeResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| ScrapeError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make a run meaningless
    ///
    /// # Errors
    ///
    /// Returns `ScrapeError::Config` naming the first offending field.
    pub fn validate(&self) -> ScrapeResult<()> {
        let positive = [
            ("target_links", self.target_links),
            ("product_workers", self.product_workers),
            ("link_workers", self.link_workers),
            ("retry_workers", self.retry_workers),
            ("event_channel_capacity", self.event_channel_capacity),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(ScrapeError::Config(format!("{name} must be greater than zero")));
        }
        if self.max_extraction_attempts == 0 {
            return Err(ScrapeError::Config(
                "max_extraction_attempts must be greater than zero".into(),
            ));
        }
        if self.page_load_timeout_secs == 0 {
            return Err(ScrapeError::Config(
                "page_load_timeout_secs must be greater than zero".into(),
            ));
        }
        match url::Url::parse(&self.product_url_prefix) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => {}
            _ => {
                return Err(ScrapeError::Config(format!(
                    "product_url_prefix is not an absolute http(s) URL: {}",
                    self.product_url_prefix
                )));
            }
        }
        if self.links_file_name.trim().is_empty() {
            return Err(ScrapeError::Config("links_file_name is empty".into()));
        }
        Ok(())
    }
}
