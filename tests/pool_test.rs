//! Worker pool: partitioning, isolation, retry pass, cancellation

mod common;

use anyhow::Result;
use async_trait::async_trait;
use common::{FakeLauncher, FakeSite, ProductVariant, product_url, test_config};
use marketscrape::pool::{Pass, round_robin};
use marketscrape::{
    BrowserSession, CancellationFlag, DriverProvisioner, EventSink, ExtractionStatus, PoolEvent, ScrapeConfig,
    ScrapeError, SessionId, SessionLauncher, WorkerPool,
};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

const OVERLAY: &str = "ИП Петров Пётр Петрович\nИНН 500100732259";

fn kettle(i: usize) -> ProductVariant {
    ProductVariant::complete(&format!("Чайник модель {i}"), "Техносклад", OVERLAY)
}

fn urls(n: usize) -> Vec<String> {
    (1..=n).map(|i| product_url(&format!("kettle-{i}"))).collect()
}

fn site_with(urls: &[String], variants: impl Fn(usize) -> Vec<ProductVariant>) -> FakeSite {
    urls.iter()
        .enumerate()
        .fold(FakeSite::default(), |site, (i, url)| site.with_product(url, variants(i)))
}

fn config_with_workers(dir: &Path, workers: usize) -> ScrapeConfig {
    test_config(dir).into_builder().product_workers(workers).build().unwrap()
}

fn drain(rx: &mut tokio::sync::mpsc::Receiver<PoolEvent>) -> Vec<PoolEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[test]
fn seven_urls_over_three_workers() {
    let parts = round_robin(&urls(7), 3);
    let sizes: Vec<usize> = parts.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![3, 2, 2]);
    let all: HashSet<&String> = parts.iter().flatten().collect();
    assert_eq!(all.len(), 7);
}

#[tokio::test(start_paused = true)]
async fn every_url_scraped_once_with_isolated_sessions() {
    let dir = TempDir::new().unwrap();
    let input = urls(7);
    let launcher = FakeLauncher::new(site_with(&input, |i| vec![kettle(i)]));
    let provisioner = launcher.provisioner();
    let (events, mut rx) = EventSink::channel(256);

    let pool = WorkerPool::new(&test_config(dir.path()), Arc::clone(&provisioner)).with_events(events);
    let mut with_duplicates = input.clone();
    with_duplicates.push(input[0].clone());
    let report = pool.run(with_duplicates).await.unwrap();

    assert_eq!(report.results.len(), 7);
    let seen: HashSet<&str> = report.results.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(seen.len(), 7);
    assert_eq!(report.summary.success, 7);
    assert_eq!(report.summary.retried, 0);
    assert!(!report.cancelled);

    let ledger = pool.ledger();
    assert!(ledger.violations().is_empty(), "{:?}", ledger.violations());
    assert!(ledger.peak_active() >= 2 && ledger.peak_active() <= 3);
    assert_eq!(ledger.active(), 0);

    assert_eq!(launcher.launched.load(std::sync::atomic::Ordering::SeqCst), 3);
    assert_eq!(launcher.closed(), 3);
    assert_eq!(provisioner.live_count(), 0);

    let events = drain(&mut rx);
    let sessions: HashSet<_> = events
        .iter()
        .filter_map(|e| match e {
            PoolEvent::WorkerStarted { session, .. } => Some(*session),
            _ => None,
        })
        .collect();
    assert_eq!(sessions.len(), 3);
    let processed: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            PoolEvent::UrlProcessed { processed, total, .. } => {
                assert_eq!(*total, 7);
                Some(*processed)
            }
            _ => None,
        })
        .collect();
    assert_eq!(processed.len(), 7);
    assert_eq!(processed.iter().max(), Some(&7));
    assert!(matches!(events.last(), Some(PoolEvent::Finished { cancelled: false, .. })));
}

#[tokio::test(start_paused = true)]
async fn worker_results_keep_assignment_order() {
    let dir = TempDir::new().unwrap();
    let input = urls(6);
    let launcher = FakeLauncher::new(site_with(&input, |i| vec![kettle(i)]));

    let report = WorkerPool::new(&config_with_workers(dir.path(), 2), launcher.provisioner())
        .run(input.clone())
        .await
        .unwrap();

    let position = |url: &str| report.results.iter().position(|r| r.url == url).unwrap();
    // worker 0 owns 1, 3, 5 and worker 1 owns 2, 4, 6
    assert!(position(&input[0]) < position(&input[2]));
    assert!(position(&input[2]) < position(&input[4]));
    assert!(position(&input[1]) < position(&input[3]));

    let ordered: Vec<String> = report.results_in_order(&input).into_iter().map(|r| r.url).collect();
    assert_eq!(ordered, input);
}

#[tokio::test(start_paused = true)]
async fn blocked_urls_get_one_secondary_pass() {
    let dir = TempDir::new().unwrap();
    let input = urls(4);
    let site = site_with(&input, |i| match i {
        // blocked for the whole first pass, clean on the sixth load
        0 => {
            let mut v = vec![ProductVariant::captcha(); 5];
            v.push(kettle(i));
            v
        }
        // never recovers
        1 => vec![ProductVariant::captcha()],
        _ => vec![kettle(i)],
    });
    let launcher = FakeLauncher::new(site);
    let (events, mut rx) = EventSink::channel(256);

    let report = WorkerPool::new(&config_with_workers(dir.path(), 2), launcher.provisioner())
        .with_events(events)
        .run(input.clone())
        .await
        .unwrap();

    assert_eq!(report.results.len(), 4);
    assert_eq!(report.summary.retried, 2);
    let status = |url: &str| report.results.iter().find(|r| r.url == url).unwrap().status;
    assert_eq!(status(&input[0]), ExtractionStatus::Success);
    assert_eq!(status(&input[1]), ExtractionStatus::AccessDenied);
    assert_eq!(report.summary.success, 3);
    assert_eq!(report.summary.access_denied, 1);

    // one full ceiling per pass, no third pass
    assert_eq!(launcher.site.loads(&input[0]), 6);
    assert_eq!(launcher.site.loads(&input[1]), 10);

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(e, PoolEvent::RetryPassStarted { urls: 2, workers: 1 })));
    assert!(events.iter().any(|e| matches!(e, PoolEvent::WorkerStarted { pass: Pass::Retry, .. })));
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_between_urls_and_skips_retry_pass() {
    let dir = TempDir::new().unwrap();
    let input = urls(4);
    let site = site_with(&input, |i| {
        if i == 0 { vec![ProductVariant::captcha()] } else { vec![kettle(i)] }
    });
    let launcher = FakeLauncher::new(site);
    let provisioner = launcher.provisioner();
    let cancel = CancellationFlag::new();
    let (events, mut rx) = EventSink::channel(256);

    let trigger = cancel.clone();
    let watcher = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            if matches!(event, PoolEvent::UrlProcessed { .. }) {
                trigger.cancel();
            }
            seen.push(event);
        }
        seen
    });

    let pool = WorkerPool::new(&config_with_workers(dir.path(), 1), Arc::clone(&provisioner))
        .with_events(events)
        .with_cancellation(cancel);
    let report = pool.run(input.clone()).await.unwrap();
    drop(pool);
    let events = watcher.await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].url, input[0]);
    assert_eq!(report.results[0].status, ExtractionStatus::AccessDenied);
    assert_eq!(report.summary.retried, 0);
    assert_eq!(launcher.site.loads(&input[0]), 5);
    assert_eq!(launcher.site.loads(&input[1]), 0);
    assert_eq!(provisioner.live_count(), 0);

    assert!(events.iter().any(|e| matches!(e, PoolEvent::RetryPassSkipped { held: 1 })));
    assert!(events.iter().any(|e| matches!(e, PoolEvent::WorkerFinished { cancelled: true, .. })));
}

#[tokio::test(start_paused = true)]
async fn no_session_at_all_is_a_provisioning_error() {
    let dir = TempDir::new().unwrap();
    let input = urls(3);
    let launcher = FakeLauncher::failing(site_with(&input, |i| vec![kettle(i)]), usize::MAX);
    let provisioner = launcher.provisioner();

    let err = WorkerPool::new(&test_config(dir.path()), Arc::clone(&provisioner))
        .run(input)
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::Provision(_)), "{err:?}");
    assert!(err.is_run_fatal());
    assert_eq!(provisioner.live_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_worker_assignment_moves_to_retry_pass() {
    let dir = TempDir::new().unwrap();
    let input = urls(7);
    let launcher = FakeLauncher::failing(site_with(&input, |i| vec![kettle(i)]), 1);

    let report = WorkerPool::new(&test_config(dir.path()), launcher.provisioner())
        .run(input.clone())
        .await
        .unwrap();

    assert_eq!(report.results.len(), 7);
    assert_eq!(report.summary.success, 7);
    // worker 0 held urls 1, 4 and 7
    assert_eq!(report.summary.retried, 3);
    for url in [&input[0], &input[3], &input[6]] {
        assert_eq!(launcher.site.loads(url), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn empty_input_is_an_empty_report() {
    let dir = TempDir::new().unwrap();
    let launcher = FakeLauncher::new(FakeSite::default());

    let report = WorkerPool::new(&test_config(dir.path()), launcher.provisioner())
        .run(Vec::new())
        .await
        .unwrap();

    assert!(report.results.is_empty());
    assert_eq!(report.summary.total, 0);
    assert_eq!(launcher.launched.load(std::sync::atomic::Ordering::SeqCst), 0);
}

/// Session whose driver panics on every navigation
struct PanickingSession {
    id: SessionId,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserSession for PanickingSession {
    fn id(&self) -> SessionId {
        self.id
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        panic!("driver crashed loading {url}");
    }

    async fn reload(&self) -> Result<()> {
        Ok(())
    }

    async fn title(&self) -> Result<String> {
        Ok(String::new())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(String::new())
    }

    async fn evaluate(&self, _script: &str) -> Result<Value> {
        Ok(Value::Null)
    }

    async fn click(&self, _selector: &str) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct PanickingLauncher {
    launched: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl SessionLauncher for PanickingLauncher {
    async fn launch(&self, _headless: bool, id: SessionId) -> Result<Box<dyn BrowserSession>> {
        self.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(PanickingSession {
            id,
            closed: Arc::clone(&self.closed),
        }))
    }
}

#[tokio::test(start_paused = true)]
async fn panicking_session_becomes_error_records_and_is_closed() {
    let dir = TempDir::new().unwrap();
    let input = urls(3);
    let launcher = Arc::new(PanickingLauncher::default());
    let provisioner = DriverProvisioner::new(Arc::clone(&launcher) as Arc<dyn SessionLauncher>);

    let pool = WorkerPool::new(&test_config(dir.path()), Arc::clone(&provisioner));
    let report = pool.run(input.clone()).await.unwrap();

    assert_eq!(report.results.len(), 3);
    for url in &input {
        let record = report.results.iter().find(|r| &r.url == url).unwrap();
        assert_eq!(record.status, ExtractionStatus::Error);
        assert!(record.seller_name.to_string().contains("driver crashed"));
    }
    assert_eq!(report.summary.error, 3);
    assert_eq!(report.summary.retried, 3);

    // three primary workers plus one retry worker, all closed
    assert_eq!(launcher.launched.load(Ordering::SeqCst), 4);
    assert_eq!(launcher.closed.load(Ordering::SeqCst), 4);
    assert_eq!(provisioner.live_count(), 0);
    assert_eq!(pool.ledger().active(), 0);
    assert!(pool.ledger().violations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn retried_counts_only_urls_reached_before_cancel() {
    let dir = TempDir::new().unwrap();
    let input = urls(3);
    let site = site_with(&input, |_| vec![ProductVariant::captcha()]);
    let launcher = FakeLauncher::new(site);
    let (events, mut rx) = EventSink::channel(256);
    let cancel = CancellationFlag::new();

    let pool = WorkerPool::new(&test_config(dir.path()), launcher.provisioner())
        .with_events(events)
        .with_cancellation(cancel.clone());
    let run = tokio::spawn(async move { pool.run(input).await });

    // stop once the retry worker has finished its first URL
    loop {
        match rx.recv().await {
            Some(PoolEvent::UrlProcessed { pass: Pass::Retry, .. }) => {
                cancel.cancel();
                break;
            }
            Some(_) => {}
            None => panic!("pool finished without a retry pass"),
        }
    }

    let report = run.await.unwrap().unwrap();
    assert_eq!(report.results.len(), 3);
    assert!(report.cancelled);
    assert_eq!(report.summary.retried, 1);
}
