//! Listing-page link collection
//!
//! Loads a category page, scrolls it to trigger lazy tile rendering and
//! accumulates product links until the target count is reached, the page stops
//! producing new links for `max_idle_scrolls` scrolls, or scrolling no longer
//! moves because the document has ended.

pub mod link_set;
pub mod persist;
pub mod scripts;
pub mod state;

pub use link_set::{LinkSet, RawTile};
pub use persist::{load_links, save_links};
pub use state::{CollectionOutcome, CollectionStats, CollectorState, Persistence, StopReason};

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{LinkFormat, ScrapeConfig};
use crate::error::{ScrapeError, ScrapeResult};
use crate::session::BrowserSession;
use crate::utils::category_name;
use crate::wait::poll_until;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, Deserialize)]
struct ScrollPosition {
    y: i64,
    viewport: i64,
    height: i64,
}

impl ScrollPosition {
    fn at_bottom(&self) -> bool {
        self.y + self.viewport >= self.height - 2
    }
}

#[derive(Debug, Clone)]
pub struct LinkCollector {
    target: usize,
    max_idle_scrolls: u32,
    scroll_delay: Duration,
    load_timeout: Duration,
    product_url_prefix: String,
    output: Option<(PathBuf, LinkFormat)>,
}

impl LinkCollector {
    #[must_use]
    pub fn new(config: &ScrapeConfig) -> Self {
        Self {
            target: config.target_links(),
            max_idle_scrolls: config.max_idle_scrolls(),
            scroll_delay: config.scroll_delay(),
            load_timeout: config.page_load_timeout(),
            product_url_prefix: config.product_url_prefix().to_string(),
            output: None,
        }
    }

    /// Persist links to `path` once collection finishes
    #[must_use]
    pub fn with_output(mut self, path: impl Into<PathBuf>, format: LinkFormat) -> Self {
        self.output = Some((path.into(), format));
        self
    }

    /// Collect links from `url` and persist them if an output is configured
    ///
    /// # Errors
    ///
    /// `ScrapeError::Load` when navigation fails or the listing never appears.
    /// A failed save is reported in `CollectionOutcome::persistence`, not here.
    pub async fn run(&self, session: &dyn BrowserSession, url: &str) -> ScrapeResult<CollectionOutcome> {
        let mut outcome = self.collect(session, url).await?;

        if let Some((path, format)) = &self.output {
            match save_links(path, &outcome.links, *format).await {
                Ok(()) => {
                    info!(
                        target: "marketscrape::collector",
                        "Saved {} links to {}",
                        outcome.links.len(),
                        path.display()
                    );
                    outcome.state = CollectorState::Saved;
                    outcome.persistence = Persistence::Saved(path.clone());
                }
                Err(e) => {
                    warn!(target: "marketscrape::collector", "{e}");
                    outcome.persistence = Persistence::Failed(e.to_string());
                }
            }
        }
        Ok(outcome)
    }

    /// Load, scroll and accumulate without persisting
    pub async fn collect(&self, session: &dyn BrowserSession, url: &str) -> ScrapeResult<CollectionOutcome> {
        let category = category_name(url);
        info!(target: "marketscrape::collector", "Collecting '{category}' from {url}");

        // Init -> PageLoaded
        session
            .navigate(url)
            .await
            .map_err(|e| ScrapeError::load(url, e))?;
        let ready = poll_until(self.load_timeout, READY_POLL_INTERVAL, move || async move {
            session
                .evaluate(scripts::LISTING_READY)
                .await
                .ok()
                .and_then(|v| v.as_bool())
                .filter(|ready| *ready)
        })
        .await;
        if ready.is_none() {
            return Err(ScrapeError::load(
                url,
                format!(
                    "listing container did not appear within {}s",
                    self.load_timeout.as_secs()
                ),
            ));
        }
        debug!(target: "marketscrape::collector", "Listing ready: {url}");

        let mut links = LinkSet::new(&self.product_url_prefix, self.target);
        links.absorb(self.rendered_tiles(session).await);

        let mut idle_scrolls = 0_u32;
        let mut scroll_cycles = 0_u32;
        let mut last_position: Option<ScrollPosition> = None;
        let mut reached_page_end = false;

        while !links.is_full() && idle_scrolls < self.max_idle_scrolls {
            scroll_cycles += 1;
            if let Err(e) = session.evaluate(scripts::SCROLL_STEP).await {
                warn!(target: "marketscrape::collector", "Scroll failed: {e:#}");
            }
            tokio::time::sleep(self.scroll_delay).await;

            let added = links.absorb(self.rendered_tiles(session).await);
            if added > 0 {
                idle_scrolls = 0;
                info!(
                    target: "marketscrape::collector",
                    "+{added} links | {}/{}",
                    links.len(),
                    self.target
                );
                last_position = self.position(session).await;
                continue;
            }

            idle_scrolls += 1;
            debug!(
                target: "marketscrape::collector",
                "No new links, idle scroll {idle_scrolls}/{}",
                self.max_idle_scrolls
            );

            let position = self.position(session).await;
            if let (Some(prev), Some(now)) = (last_position, position)
                && now.y <= prev.y
                && now.at_bottom()
            {
                reached_page_end = true;
                break;
            }
            last_position = position;
        }

        let stop_reason = if links.is_full() {
            StopReason::TargetReached
        } else if links.is_empty() {
            StopReason::EmptyListing
        } else if reached_page_end {
            StopReason::PageEnd
        } else {
            StopReason::IdleLimit
        };

        let state = if stop_reason == StopReason::TargetReached {
            CollectorState::Converged
        } else {
            CollectorState::Exhausted
        };

        if stop_reason == StopReason::TargetReached {
            info!(target: "marketscrape::collector", "Collected {} links from '{category}'", links.len());
        } else {
            warn!(
                target: "marketscrape::collector",
                "Collected only {} of {} links from '{category}' [{stop_reason}]",
                links.len(),
                self.target
            );
        }

        let stats = CollectionStats {
            collected: links.len(),
            target: self.target,
            idle_scrolls,
            scroll_cycles,
            category,
        };
        Ok(CollectionOutcome {
            links: links.into_links(),
            state,
            stop_reason,
            stats,
            persistence: Persistence::NotRequested,
        })
    }

    async fn rendered_tiles(&self, session: &dyn BrowserSession) -> Vec<RawTile> {
        match session.evaluate(scripts::EXTRACT_TILES).await {
            Ok(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                warn!(target: "marketscrape::collector", "Unexpected tile payload: {e}");
                Vec::new()
            }),
            Err(e) => {
                warn!(target: "marketscrape::collector", "Tile extraction failed: {e:#}");
                Vec::new()
            }
        }
    }

    async fn position(&self, session: &dyn BrowserSession) -> Option<ScrollPosition> {
        let value = session.evaluate(scripts::SCROLL_POSITION).await.ok()?;
        serde_json::from_value(value).ok()
    }
}
