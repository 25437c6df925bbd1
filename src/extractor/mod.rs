//! Product-page extraction
//!
//! One attempt runs the ordered checks (access denial, out-of-stock widget,
//! normal extraction) against the page currently loaded in the session.
//! `ProductExtractor::extract_product` wraps attempts in the reload-and-retry
//! loop and never fails: every problem ends up in the returned record.

pub mod access;
pub mod chain;
pub mod overlay;
pub mod retry;
pub mod scripts;
pub mod seller;

pub use access::{AccessSignals, DenialReason, detect_access_denial};
pub use overlay::{CompanyDetails, is_company_overlay, parse_company_overlay};
pub use retry::RetryPolicy;

use anyhow::Result;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ScrapeConfig;
use crate::scrape_types::{ExtractionResult, ExtractionStatus, Field};
use crate::session::BrowserSession;
use crate::utils::upscale_image_url;
use crate::wait::poll_until;

const CONTENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageKind {
    Product,
    OutOfStock,
}

#[derive(Debug, Clone)]
pub struct ProductExtractor {
    policy: RetryPolicy,
    settle_delay: Duration,
    reload_delay: Duration,
    content_timeout: Duration,
}

impl ProductExtractor {
    #[must_use]
    pub fn new(config: &ScrapeConfig) -> Self {
        Self {
            policy: RetryPolicy::from_config(config),
            settle_delay: config.settle_delay(),
            reload_delay: config.reload_delay(),
            content_timeout: config.page_load_timeout(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Extract `url`, reloading and retrying up to the attempt ceiling
    ///
    /// Returns the first result the retry policy accepts, or the last attempt's
    /// result once the ceiling is reached.
    pub async fn extract_product(&self, session: &dyn BrowserSession, url: &str) -> ExtractionResult {
        let mut loaded = false;
        let mut last = None;

        for attempt in 1..=self.policy.max_attempts {
            let mut result = match self.load(session, url, attempt, loaded).await {
                Ok(()) => {
                    loaded = true;
                    match self.attempt(session, url).await {
                        Ok(result) => result,
                        Err(e) => ExtractionResult::failed(url, format!("{e:#}")),
                    }
                }
                Err(e) => {
                    loaded = false;
                    ExtractionResult::failed(url, format!("{e:#}"))
                }
            };
            result.attempts = attempt;

            if !self.policy.should_retry(&result) {
                debug!(
                    target: "marketscrape::extractor",
                    "{url}: {} after {attempt} attempt(s)",
                    result.status
                );
                return result;
            }
            warn!(
                target: "marketscrape::extractor",
                "{url}: attempt {attempt}/{} unsatisfactory (status {}, product '{}', company '{}')",
                self.policy.max_attempts,
                result.status,
                result.product_name,
                result.company_name
            );
            last = Some(result);
        }

        warn!(
            target: "marketscrape::extractor",
            "{url}: giving up after {} attempts",
            self.policy.max_attempts
        );
        last.unwrap_or_else(|| ExtractionResult::failed(url, "no extraction attempt ran"))
    }

    /// First attempt navigates; later ones reload in place, navigating afresh
    /// if the reload fails or the page never loaded
    async fn load(&self, session: &dyn BrowserSession, url: &str, attempt: u32, loaded: bool) -> Result<()> {
        if attempt == 1 || !loaded {
            session.navigate(url).await?;
        } else {
            if let Err(e) = session.reload().await {
                warn!(target: "marketscrape::extractor", "{url}: reload failed ({e:#}), navigating again");
                session.navigate(url).await?;
            }
            tokio::time::sleep(self.reload_delay).await;
        }
        tokio::time::sleep(self.settle_delay).await;
        Ok(())
    }

    /// One pass of the ordered checks against the loaded page
    pub async fn attempt(&self, session: &dyn BrowserSession, url: &str) -> Result<ExtractionResult> {
        let signals = access::gather_signals(session).await?;
        if let Some(reason) = detect_access_denial(&signals, url) {
            info!(target: "marketscrape::extractor", "{url}: access denied ({reason})");
            return Ok(ExtractionResult::access_denied(url));
        }

        let kind = poll_until(self.content_timeout, CONTENT_POLL_INTERVAL, move || async move {
            match session.evaluate(scripts::PAGE_KIND).await.ok()?.as_str()? {
                "out_of_stock" => Some(PageKind::OutOfStock),
                "heading" => Some(PageKind::Product),
                _ => None,
            }
        })
        .await;

        match kind {
            Some(PageKind::OutOfStock) => return Ok(self.out_of_stock(session, url).await),
            Some(PageKind::Product) => {}
            None => {
                // Block screens sometimes replace the page after the first probe
                let signals = access::gather_signals(session).await?;
                if let Some(reason) = detect_access_denial(&signals, url) {
                    info!(target: "marketscrape::extractor", "{url}: access denied ({reason})");
                    return Ok(ExtractionResult::access_denied(url));
                }
                warn!(target: "marketscrape::extractor", "{url}: product content did not render");
            }
        }

        let mut result = ExtractionResult::new(url);
        result.product_name = match chain::first_usable(session, chain::PRODUCT_NAME).await {
            Some((strategy, name)) => {
                debug!(target: "marketscrape::extractor", "{url}: product name via {strategy}");
                Field::Value(name)
            }
            None => Field::NotFound,
        };

        let seller = seller::extract_seller(session, self.content_timeout, self.settle_delay).await;
        result.seller_name = seller.seller_name;
        result.company_name = seller.company_name;
        result.tax_id = seller.tax_id;
        result.image_url = self.image(session).await;
        Ok(result)
    }

    /// Product and seller from the out-of-stock widget; company is not looked up
    async fn out_of_stock(&self, session: &dyn BrowserSession, url: &str) -> ExtractionResult {
        info!(target: "marketscrape::extractor", "{url}: out of stock");
        let mut result = ExtractionResult::new(url);
        result.status = ExtractionStatus::OutOfStock;
        result.product_name = Field::found_or_not(
            chain::first_usable(session, chain::OOS_PRODUCT_NAME)
                .await
                .map(|(_, t)| t),
        );
        result.seller_name = Field::found_or_not(
            chain::first_usable(session, chain::OOS_SELLER_NAME)
                .await
                .map(|(_, t)| t),
        );
        result.image_url = self.image(session).await;
        result
    }

    async fn image(&self, session: &dyn BrowserSession) -> Field {
        Field::found_or_not(
            chain::first_usable(session, chain::IMAGE)
                .await
                .map(|(_, src)| upscale_image_url(&src)),
        )
    }
}
