//! Type-safe builder for `ScrapeConfig` using the typestate pattern
//!
//! `results_dir` is the one required field; `build()` only exists once it has
//! been set.

use std::marker::PhantomData;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ScrapeResult;

use super::types::{LinkFormat, ScrapeConfig};

// Type states for the builder
pub struct WithResultsDir;

pub struct ScrapeConfigBuilder<State = ()> {
    pub(crate) draft: ScrapeConfig,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for ScrapeConfigBuilder<()> {
    fn default() -> Self {
        Self {
            draft: ScrapeConfig::default(),
            _phantom: PhantomData,
        }
    }
}

impl ScrapeConfig {
    /// Create a builder for configuring a `ScrapeConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> ScrapeConfigBuilder<()> {
        ScrapeConfigBuilder::default()
    }

    /// Reopen a resolved config for overrides, e.g. CLI flags over a file
    #[must_use]
    pub fn into_builder(self) -> ScrapeConfigBuilder<WithResultsDir> {
        ScrapeConfigBuilder {
            draft: self,
            _phantom: PhantomData,
        }
    }
}

impl ScrapeConfigBuilder<()> {
    pub fn results_dir(mut self, dir: impl Into<PathBuf>) -> ScrapeConfigBuilder<WithResultsDir> {
        self.draft.results_dir = dir.into();
        ScrapeConfigBuilder {
            draft: self.draft,
            _phantom: PhantomData,
        }
    }
}

// Build method only available when all required fields are set
impl ScrapeConfigBuilder<WithResultsDir> {
    #[must_use]
    pub fn results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.draft.results_dir = dir.into();
        self
    }

    /// # Errors
    ///
    /// Returns `ScrapeError::Config` when a value fails `ScrapeConfig::validate`.
    pub fn build(self) -> ScrapeResult<ScrapeConfig> {
        // Headed Chrome is a debugging aid; release builds always run headless
        #[cfg(not(debug_assertions))]
        let draft = {
            let mut draft = self.draft;
            if !draft.headless {
                tracing::warn!(
                    "Forcing headless mode in release build. \
                    Headed mode is only available in debug builds for development."
                );
                draft.headless = true;
            }
            draft
        };

        #[cfg(debug_assertions)]
        let draft = self.draft;

        draft.validate()?;
        Ok(draft)
    }
}

// Optional settings, available in every state
impl<State> ScrapeConfigBuilder<State> {
    #[must_use]
    pub fn links_file_name(mut self, name: impl Into<String>) -> Self {
        self.draft.links_file_name = name.into();
        self
    }

    #[must_use]
    pub fn link_format(mut self, format: LinkFormat) -> Self {
        self.draft.link_format = format;
        self
    }

    /// Stop collecting once this many unique links were seen
    #[must_use]
    pub fn target_links(mut self, target: usize) -> Self {
        self.draft.target_links = target;
        self
    }

    #[must_use]
    pub fn max_idle_scrolls(mut self, max: u32) -> Self {
        self.draft.max_idle_scrolls = max;
        self
    }

    #[must_use]
    pub fn scroll_delay(mut self, delay: Duration) -> Self {
        self.draft.scroll_delay_ms = duration_ms(delay);
        self
    }

    #[must_use]
    pub fn page_load_timeout_secs(mut self, secs: u64) -> Self {
        self.draft.page_load_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn product_workers(mut self, workers: usize) -> Self {
        self.draft.product_workers = workers;
        self
    }

    #[must_use]
    pub fn link_workers(mut self, workers: usize) -> Self {
        self.draft.link_workers = workers;
        self
    }

    #[must_use]
    pub fn retry_workers(mut self, workers: usize) -> Self {
        self.draft.retry_workers = workers;
        self
    }

    #[must_use]
    pub fn worker_stagger(mut self, delay: Duration) -> Self {
        self.draft.worker_stagger_ms = duration_ms(delay);
        self
    }

    #[must_use]
    pub fn inter_url_delay(mut self, delay: Duration) -> Self {
        self.draft.inter_url_delay_ms = duration_ms(delay);
        self
    }

    #[must_use]
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.draft.settle_delay_ms = duration_ms(delay);
        self
    }

    #[must_use]
    pub fn reload_delay(mut self, delay: Duration) -> Self {
        self.draft.reload_delay_ms = duration_ms(delay);
        self
    }

    /// Set the per-URL attempt ceiling (first load included)
    ///
    /// # Example
    /// ```rust
    /// # use marketscrape::config::ScrapeConfig;
    /// # fn main() -> marketscrape::ScrapeResult<()> {
    /// let config = ScrapeConfig::builder()
    ///     .results_dir("./results")
    ///     .max_extraction_attempts(3)
    ///     .retry_on_missing_company(false)
    ///     .build()?;
    /// assert_eq!(config.max_extraction_attempts(), 3);
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn max_extraction_attempts(mut self, attempts: u32) -> Self {
        self.draft.max_extraction_attempts = attempts;
        self
    }

    #[must_use]
    pub fn retry_on_missing_product(mut self, retry: bool) -> Self {
        self.draft.retry_on_missing_product = retry;
        self
    }

    #[must_use]
    pub fn retry_on_missing_company(mut self, retry: bool) -> Self {
        self.draft.retry_on_missing_company = retry;
        self
    }

    /// Set browser headless mode
    ///
    /// Headed mode is only honoured in debug builds.
    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.draft.headless = headless;
        self
    }

    #[must_use]
    pub fn disable_images(mut self, disable: bool) -> Self {
        self.draft.disable_images = disable;
        self
    }

    #[must_use]
    pub fn product_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.draft.product_url_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.draft.event_channel_capacity = capacity;
        self
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
