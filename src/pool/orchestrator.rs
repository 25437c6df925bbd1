//! Worker pool orchestration
//!
//! URLs are dealt round-robin to a fixed number of workers. Each worker is a
//! spawned task that owns one session from start to finish and walks its
//! assignment in order, checking the cancellation flag between URLs.
//! Unrecoverable results are held in a `RetryQueue`; once the primary pass has
//! drained, a smaller pool runs the held URLs a single time.

use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::cancel::CancellationFlag;
use super::events::{EventSink, Pass, PoolEvent};
use super::ledger::{SessionLedger, WorkerId};
use super::partition::round_robin;
use super::report::{PoolReport, RunSummary};
use super::retry_queue::RetryQueue;
use super::store::ResultStore;
use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::extractor::ProductExtractor;
use crate::scrape_types::ExtractionResult;
use crate::session::DriverProvisioner;

#[derive(Debug, Clone, Copy)]
struct PoolSettings {
    workers: usize,
    retry_workers: usize,
    stagger: Duration,
    inter_url_delay: Duration,
    headless: bool,
}

/// Shared state cloned into every worker task
#[derive(Clone)]
struct WorkerContext {
    pass: Pass,
    total: usize,
    settings: PoolSettings,
    provisioner: Arc<DriverProvisioner>,
    extractor: Arc<ProductExtractor>,
    store: Arc<ResultStore>,
    retry: Option<Arc<RetryQueue>>,
    ledger: Arc<SessionLedger>,
    events: EventSink,
    cancel: CancellationFlag,
}

#[derive(Debug)]
enum WorkerOutcome {
    Finished { completed: usize },
    FailedToStart(String),
}

#[derive(Debug, Default)]
struct PassTally {
    started: usize,
    failed_to_start: usize,
    /// URLs workers finished, summed over `WorkerOutcome::Finished`
    completed: usize,
    last_error: Option<String>,
}

pub struct WorkerPool {
    provisioner: Arc<DriverProvisioner>,
    extractor: Arc<ProductExtractor>,
    settings: PoolSettings,
    events: EventSink,
    cancel: CancellationFlag,
    ledger: Arc<SessionLedger>,
}

impl WorkerPool {
    #[must_use]
    pub fn new(config: &ScrapeConfig, provisioner: Arc<DriverProvisioner>) -> Self {
        Self {
            provisioner,
            extractor: Arc::new(ProductExtractor::new(config)),
            settings: PoolSettings {
                workers: config.product_workers(),
                retry_workers: config.retry_workers(),
                stagger: config.worker_stagger(),
                inter_url_delay: config.inter_url_delay(),
                headless: config.headless(),
            },
            events: EventSink::default(),
            cancel: CancellationFlag::new(),
            ledger: Arc::new(SessionLedger::new()),
        }
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
    pub fn with_extractor(mut self, extractor: ProductExtractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    #[must_use]
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Ownership history for the sessions this pool has used
    #[must_use]
    pub fn ledger(&self) -> Arc<SessionLedger> {
        Arc::clone(&self.ledger)
    }

    /// Scrape `urls` and return one record per distinct URL reached
    ///
    /// Per-URL failures are folded into the records. The only error is
    /// `ScrapeError::Provision`, returned when no primary worker could start a
    /// session. After cancellation, URLs no worker reached are absent from the
    /// report.
    pub async fn run(&self, urls: Vec<String>) -> ScrapeResult<PoolReport> {
        let started = Instant::now();
        let urls = dedup_in_order(urls);
        let total = urls.len();
        let store = Arc::new(ResultStore::new());
        let retry = Arc::new(RetryQueue::new());

        info!(
            target: "marketscrape::pool",
            "Scraping {total} URLs with up to {} workers",
            self.settings.workers
        );

        let primary = self
            .run_pass(Pass::Primary, &urls, self.settings.workers, total, &store, Some(&retry))
            .await;

        if primary.started == 0 && primary.failed_to_start > 0 {
            return Err(ScrapeError::Provision(
                primary
                    .last_error
                    .unwrap_or_else(|| "no worker could start a session".into()),
            ));
        }

        let held = retry.drain_once();
        let retried = if held.is_empty() {
            0
        } else if self.cancel.is_cancelled() {
            info!(
                target: "marketscrape::pool",
                "Cancelled, skipping retry pass for {} URLs",
                held.len()
            );
            self.events.emit(PoolEvent::RetryPassSkipped { held: held.len() });
            0
        } else {
            let retry_urls: Vec<String> = held.iter().map(|r| r.url.clone()).collect();
            let workers = self.settings.retry_workers.min(retry_urls.len());
            info!(
                target: "marketscrape::pool",
                "Retry pass: {} URLs across {workers} workers",
                retry_urls.len()
            );
            self.events.emit(PoolEvent::RetryPassStarted {
                urls: retry_urls.len(),
                workers,
            });
            let tally = self
                .run_pass(Pass::Retry, &retry_urls, workers, total, &store, None)
                .await;
            if tally.started == 0 {
                warn!(
                    target: "marketscrape::pool",
                    "No retry worker started; keeping first-pass results"
                );
                0
            } else {
                tally.completed
            }
        };

        let cancelled = self.cancel.is_cancelled();
        let results = Arc::try_unwrap(store)
            .map(ResultStore::into_results)
            .unwrap_or_else(|shared| shared.snapshot().0);
        let summary = RunSummary::from_results(&results, started.elapsed(), retried);

        info!(target: "marketscrape::pool", "Run finished: {summary}");
        self.events.emit(PoolEvent::Finished {
            summary: summary.clone(),
            cancelled,
        });

        Ok(PoolReport {
            results,
            summary,
            cancelled,
        })
    }

    async fn run_pass(
        &self,
        pass: Pass,
        urls: &[String],
        workers: usize,
        total: usize,
        store: &Arc<ResultStore>,
        retry: Option<&Arc<RetryQueue>>,
    ) -> PassTally {
        let ctx = WorkerContext {
            pass,
            total,
            settings: self.settings,
            provisioner: Arc::clone(&self.provisioner),
            extractor: Arc::clone(&self.extractor),
            store: Arc::clone(store),
            retry: retry.map(Arc::clone),
            ledger: Arc::clone(&self.ledger),
            events: self.events.clone(),
            cancel: self.cancel.clone(),
        };

        let mut active = FuturesUnordered::new();
        for (index, assignment) in round_robin(urls, workers).into_iter().enumerate() {
            if index > 0 && !self.settings.stagger.is_zero() {
                tokio::time::sleep(self.settings.stagger).await;
            }
            if self.cancel.is_cancelled() {
                info!(
                    target: "marketscrape::pool",
                    "Cancelled before {} {} worker {index} started",
                    assignment.len(),
                    pass.as_str()
                );
                break;
            }
            let worker = WorkerId(index);
            let task = tokio::spawn(run_worker(ctx.clone(), worker, assignment.clone()));
            active.push(async move { (worker, assignment, task.await) });
        }

        let mut tally = PassTally::default();
        while let Some((worker, assignment, joined)) = active.next().await {
            match joined {
                Ok(WorkerOutcome::Finished { completed }) => {
                    tally.started += 1;
                    tally.completed += completed;
                    debug!(target: "marketscrape::pool", "Worker {worker} done after {completed} URLs");
                }
                Ok(WorkerOutcome::FailedToStart(e)) => {
                    tally.failed_to_start += 1;
                    tally.last_error = Some(e);
                }
                Err(e) => {
                    tally.started += 1;
                    error!(target: "marketscrape::pool", "Worker {worker} task failed: {e}");
                    let message = format!("worker task failed: {e}");
                    for url in &assignment {
                        let failed = ExtractionResult::failed(url.as_str(), message.as_str());
                        if ctx.store.push_missing(failed.clone())
                            && let Some(retry) = &ctx.retry
                        {
                            retry.add(failed);
                        }
                    }
                }
            }
        }
        tally
    }
}

async fn run_worker(ctx: WorkerContext, worker: WorkerId, urls: Vec<String>) -> WorkerOutcome {
    let handle = match ctx.provisioner.acquire(ctx.settings.headless).await {
        Ok(handle) => handle,
        Err(e) => {
            let message = e.to_string();
            warn!(
                target: "marketscrape::pool",
                "Worker {worker} could not start a session: {message}"
            );
            // The primary pass hands the whole assignment to the retry pass;
            // in the retry pass the first-pass records already stand.
            if let Some(retry) = &ctx.retry {
                for url in &urls {
                    let failed = ExtractionResult::failed(url.as_str(), &message);
                    ctx.store.push(failed.clone());
                    retry.add(failed);
                }
            }
            ctx.events.emit(PoolEvent::WorkerFailedToStart {
                pass: ctx.pass,
                worker,
                error: message.clone(),
            });
            return WorkerOutcome::FailedToStart(message);
        }
    };

    let session = handle.id();
    ctx.ledger.claim(session, worker);
    ctx.events.emit(PoolEvent::WorkerStarted {
        pass: ctx.pass,
        worker,
        session,
        assigned: urls.len(),
    });
    debug!(
        target: "marketscrape::pool",
        "Worker {worker} on {session} with {} URLs",
        urls.len()
    );

    let mut completed = 0;
    let mut cancelled = false;
    for (i, url) in urls.iter().enumerate() {
        if i > 0 && !ctx.settings.inter_url_delay.is_zero() {
            tokio::time::sleep(ctx.settings.inter_url_delay).await;
        }
        if ctx.cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        let attempt = AssertUnwindSafe(ctx.extractor.extract_product(&*handle, url))
            .catch_unwind()
            .await;
        let result = match attempt {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(
                    target: "marketscrape::pool",
                    "Worker {worker} panicked on {url}: {message}"
                );
                ExtractionResult::failed(url.as_str(), format!("panic: {message}"))
            }
        };
        let (status, attempts) = (result.status, result.attempts);

        let processed = match &ctx.retry {
            Some(retry) if result.is_unrecoverable() => {
                retry.add(result.clone());
                ctx.store.push(result)
            }
            Some(_) => ctx.store.push(result),
            None => ctx.store.upsert(result),
        };
        completed += 1;

        ctx.events.emit(PoolEvent::UrlProcessed {
            pass: ctx.pass,
            worker,
            url: url.clone(),
            status,
            attempts,
            processed,
            total: ctx.total,
        });
    }

    ctx.ledger.release(session, worker);
    ctx.provisioner.release(handle).await;
    ctx.events.emit(PoolEvent::WorkerFinished {
        pass: ctx.pass,
        worker,
        completed,
        cancelled,
    });
    WorkerOutcome::Finished { completed }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Drop repeated URLs, keeping first occurrences in order
fn dedup_in_order(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(urls.len());
    urls.into_iter().filter(|u| seen.insert(u.clone())).collect()
}
