use crate::config::ScrapeConfig;
use crate::scrape_types::{ExtractionResult, ExtractionStatus};

/// When a finished attempt is worth reloading the page for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_on_missing_product: bool,
    /// Retry even a `success` page whose company name was not found
    pub retry_on_missing_company: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::utils::DEFAULT_MAX_EXTRACTION_ATTEMPTS,
            retry_on_missing_product: true,
            retry_on_missing_company: true,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &ScrapeConfig) -> Self {
        Self {
            max_attempts: config.max_extraction_attempts(),
            retry_on_missing_product: config.retry_on_missing_product(),
            retry_on_missing_company: config.retry_on_missing_company(),
        }
    }

    #[must_use]
    pub fn should_retry(&self, result: &ExtractionResult) -> bool {
        match result.status {
            ExtractionStatus::AccessDenied | ExtractionStatus::Error => true,
            ExtractionStatus::Success | ExtractionStatus::OutOfStock => {
                (self.retry_on_missing_product && result.product_name.is_not_found())
                    || (self.retry_on_missing_company && result.company_name.is_not_found())
            }
        }
    }
}
