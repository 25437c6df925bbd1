//! End-to-end runs: listing -> links -> products -> results file
//!
//! `Pipeline` owns the provisioner for a run and wires the collector, the
//! worker pool and the CSV sink together. Whatever path a run takes, every
//! session it opened is closed through `DriverProvisioner::release_all`
//! before `run` returns.

use chrono::Local;
use futures::StreamExt;
use futures::stream;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::collector::{CollectionOutcome, LinkCollector, Persistence};
use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::pool::{CancellationFlag, EventSink, PoolReport, WorkerPool};
use crate::session::{ChromiumLauncher, DriverProvisioner, SessionLauncher};
use crate::sink::{suggested_results_path, write_results_csv};
use crate::utils::category_name;

/// Everything a full run produced
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub collection: CollectionOutcome,
    pub report: PoolReport,
    /// Where the results CSV was written, or why it was not
    pub results_file: Persistence,
}

pub struct Pipeline {
    config: ScrapeConfig,
    provisioner: Arc<DriverProvisioner>,
    events: EventSink,
    cancel: CancellationFlag,
}

impl Pipeline {
    #[must_use]
    pub fn new(config: ScrapeConfig, launcher: Arc<dyn SessionLauncher>) -> Self {
        Self {
            config,
            provisioner: DriverProvisioner::new(launcher),
            events: EventSink::default(),
            cancel: CancellationFlag::new(),
        }
    }

    /// Pipeline backed by real Chromium sessions
    #[must_use]
    pub fn chromium(config: ScrapeConfig) -> Self {
        let launcher = ChromiumLauncher::new(config.disable_images(), config.page_load_timeout());
        Self::new(config, Arc::new(launcher))
    }

    #[must_use]
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    #[must_use]
    pub fn provisioner(&self) -> Arc<DriverProvisioner> {
        Arc::clone(&self.provisioner)
    }

    /// Collect one listing into the configured links file
    pub async fn collect_links(&self, listing_url: &str) -> ScrapeResult<CollectionOutcome> {
        let collector = LinkCollector::new(&self.config)
            .with_output(self.config.links_path(), self.config.link_format());
        self.collect_with(&collector, listing_url).await
    }

    /// Collect several listings with `link_workers` sessions at a time
    ///
    /// Each listing gets its own `<category>_<links file>` in the results
    /// directory, numbered `<category>_2_<links file>` onward when a category
    /// repeats. Results come back in input order.
    pub async fn collect_many(&self, listing_urls: &[String]) -> Vec<ScrapeResult<CollectionOutcome>> {
        let workers = self.config.link_workers();
        info!(
            target: "marketscrape::collector",
            "Collecting {} listings with {workers} sessions",
            listing_urls.len()
        );

        let names = listing_links_names(listing_urls, self.config.links_file_name());
        let names = &names;
        let mut indexed: Vec<(usize, ScrapeResult<CollectionOutcome>)> =
            stream::iter(listing_urls.iter().enumerate())
                .map(|(i, url)| async move {
                    if self.cancel.is_cancelled() {
                        return (i, Err(ScrapeError::Cancelled));
                    }
                    let path = self.config.results_dir().join(&names[i]);
                    let collector =
                        LinkCollector::new(&self.config).with_output(path, self.config.link_format());
                    (i, self.collect_with(&collector, url).await)
                })
                .buffer_unordered(workers)
                .collect()
                .await;

        indexed.sort_by_key(|(i, _)| *i);
        indexed.into_iter().map(|(_, r)| r).collect()
    }

    async fn collect_with(
        &self,
        collector: &LinkCollector,
        listing_url: &str,
    ) -> ScrapeResult<CollectionOutcome> {
        let handle = self.provisioner.acquire(self.config.headless()).await?;
        let outcome = collector.run(&*handle, listing_url).await;
        self.provisioner.release(handle).await;
        outcome
    }

    /// Run the worker pool over `urls`
    pub async fn scrape_products(&self, urls: Vec<String>) -> ScrapeResult<PoolReport> {
        WorkerPool::new(&self.config, Arc::clone(&self.provisioner))
            .with_events(self.events.clone())
            .with_cancellation(self.cancel.clone())
            .run(urls)
            .await
    }

    /// Write `report` to `<results_dir>/<category>_<timestamp>.csv`, rows in `order`
    pub async fn write_results(&self, report: &PoolReport, category: &str, order: &[String]) -> ScrapeResult<PathBuf> {
        let path = suggested_results_path(self.config.results_dir(), category, Local::now());
        write_results_csv(&path, report.results_in_order(order)).await
    }

    /// Collect `listing_url`, scrape every collected product, save the results
    ///
    /// # Errors
    ///
    /// `Load` if the listing never became ready, `Provision` if no session
    /// could be started, `Cancelled` if a stop was requested before the
    /// product stage began. A failed results write is reported in
    /// `RunOutput::results_file`.
    pub async fn run(&self, listing_url: &str) -> ScrapeResult<RunOutput> {
        let outcome = self.run_inner(listing_url).await;
        let leftover = self.provisioner.release_all().await;
        if leftover > 0 {
            warn!(target: "marketscrape::session", "{leftover} sessions were still open at shutdown");
        }
        outcome
    }

    async fn run_inner(&self, listing_url: &str) -> ScrapeResult<RunOutput> {
        let collection = self.collect_links(listing_url).await?;
        if collection.is_partial() {
            warn!(
                target: "marketscrape::collector",
                "Collected {}/{} links ({})",
                collection.stats.collected,
                collection.stats.target,
                collection.stop_reason.tag()
            );
        }
        if self.cancel.is_cancelled() {
            return Err(ScrapeError::Cancelled);
        }

        let order: Vec<String> = collection.urls().map(str::to_string).collect();
        let report = self.scrape_products(order.clone()).await?;

        let results_file = match self.write_results(&report, &category_name(listing_url), &order).await {
            Ok(path) => Persistence::Saved(path),
            Err(e) => {
                warn!(target: "marketscrape::sink", "{e}");
                Persistence::Failed(e.to_string())
            }
        };

        Ok(RunOutput {
            collection,
            report,
            results_file,
        })
    }

    /// Close any session still open; returns how many there were
    pub async fn shutdown(&self) -> usize {
        self.provisioner.release_all().await
    }
}

/// One distinct links file name per listing, in input order
fn listing_links_names(listing_urls: &[String], links_file_name: &str) -> Vec<String> {
    let mut taken = HashSet::with_capacity(listing_urls.len());
    listing_urls
        .iter()
        .map(|url| {
            let category = category_name(url);
            let mut name = format!("{category}_{links_file_name}");
            let mut n = 1;
            while !taken.insert(name.clone()) {
                n += 1;
                name = format!("{category}_{n}_{links_file_name}");
            }
            name
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_categories_get_numbered_files() {
        let urls = [
            "https://www.ozon.ru/category/chayniki-1/?page=1",
            "https://www.ozon.ru/category/chayniki-1/?page=2",
            "https://www.ozon.ru/search/?text=tea",
            "https://www.ozon.ru/search/?text=coffee",
        ]
        .map(String::from);

        assert_eq!(
            listing_links_names(&urls, "links.json"),
            vec![
                "chayniki-1_links.json",
                "chayniki-1_2_links.json",
                "unknown_category_links.json",
                "unknown_category_2_links.json",
            ]
        );
    }
}
