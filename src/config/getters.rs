//! Getter methods for `ScrapeConfig`

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::{LinkFormat, ScrapeConfig};

impl ScrapeConfig {
    #[must_use]
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Full path of the links file inside `results_dir`
    #[must_use]
    pub fn links_path(&self) -> PathBuf {
        self.results_dir.join(&self.links_file_name)
    }

    #[must_use]
    pub fn links_file_name(&self) -> &str {
        &self.links_file_name
    }

    #[must_use]
    pub fn link_format(&self) -> LinkFormat {
        self.link_format
    }

    #[must_use]
    pub fn target_links(&self) -> usize {
        self.target_links
    }

    #[must_use]
    pub fn max_idle_scrolls(&self) -> u32 {
        self.max_idle_scrolls
    }

    #[must_use]
    pub fn scroll_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_delay_ms)
    }

    #[must_use]
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    #[must_use]
    pub fn product_workers(&self) -> usize {
        self.product_workers
    }

    #[must_use]
    pub fn link_workers(&self) -> usize {
        self.link_workers
    }

    #[must_use]
    pub fn retry_workers(&self) -> usize {
        self.retry_workers
    }

    #[must_use]
    pub fn worker_stagger(&self) -> Duration {
        Duration::from_millis(self.worker_stagger_ms)
    }

    #[must_use]
    pub fn inter_url_delay(&self) -> Duration {
        Duration::from_millis(self.inter_url_delay_ms)
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    #[must_use]
    pub fn reload_delay(&self) -> Duration {
        Duration::from_millis(self.reload_delay_ms)
    }

    #[must_use]
    pub fn max_extraction_attempts(&self) -> u32 {
        self.max_extraction_attempts
    }

    #[must_use]
    pub fn retry_on_missing_product(&self) -> bool {
        self.retry_on_missing_product
    }

    #[must_use]
    pub fn retry_on_missing_company(&self) -> bool {
        self.retry_on_missing_company
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn disable_images(&self) -> bool {
        self.disable_images
    }

    #[must_use]
    pub fn product_url_prefix(&self) -> &str {
        &self.product_url_prefix
    }

    #[must_use]
    pub fn event_channel_capacity(&self) -> usize {
        self.event_channel_capacity
    }
}
