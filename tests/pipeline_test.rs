//! Full runs over the fake site: listing, products, results file

mod common;

use common::{FakeLauncher, FakeSite, LISTING_URL, ProductVariant, product_url, test_config};
use marketscrape::collector::{Persistence, StopReason};
use marketscrape::{CancellationFlag, Pipeline, RESULT_COLUMNS, ScrapeError, SessionLauncher};
use std::sync::Arc;
use tempfile::TempDir;

fn catalogue(n: usize) -> (Vec<String>, FakeSite) {
    let urls: Vec<String> = (1..=n).map(|i| product_url(&format!("kettle-{i}"))).collect();
    let site = urls.iter().enumerate().fold(
        FakeSite::listing(vec![urls[..n / 2].to_vec(), urls.clone()]),
        |site, (i, url)| {
            site.with_product(
                url,
                vec![ProductVariant::complete(
                    &format!("Чайник модель {i}"),
                    "Техносклад",
                    "ООО \"Техносклад\"\nИНН 7701234567",
                )],
            )
        },
    );
    (urls, site)
}

#[tokio::test(start_paused = true)]
async fn run_collects_scrapes_and_writes_csv() {
    let dir = TempDir::new().unwrap();
    let (urls, site) = catalogue(6);
    let launcher = FakeLauncher::new(site);
    let pipeline = Pipeline::new(test_config(dir.path()), Arc::clone(&launcher) as Arc<dyn SessionLauncher>);

    let output = pipeline.run(LISTING_URL).await.unwrap();

    assert_eq!(output.collection.links.len(), 6);
    assert_ne!(output.collection.stop_reason, StopReason::TargetReached);
    assert!(matches!(output.collection.persistence, Persistence::Saved(_)));
    assert_eq!(output.report.summary.success, 6);

    let Persistence::Saved(path) = output.results_file else {
        panic!("results not saved: {:?}", output.results_file);
    };
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("elektrochayniki-10677_"), "{name}");
    assert!(name.ends_with(".csv"));

    let mut reader = csv::Reader::from_path(&path).unwrap();
    assert_eq!(reader.headers().unwrap().iter().collect::<Vec<_>>(), RESULT_COLUMNS.to_vec());
    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    let row_urls: Vec<&str> = rows.iter().map(|r| &r[0]).collect();
    assert_eq!(row_urls, urls.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(&rows[0][3], "ООО \"Техносклад\"");
    assert_eq!(&rows[0][5], "success");

    assert_eq!(pipeline.provisioner().live_count(), 0);
    assert_eq!(launcher.closed(), launcher.launched.load(std::sync::atomic::Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn listing_failure_aborts_run_and_closes_sessions() {
    let dir = TempDir::new().unwrap();
    let (_, mut site) = catalogue(4);
    site.listing_ready = false;
    let launcher = FakeLauncher::new(site);
    let pipeline = Pipeline::new(test_config(dir.path()), Arc::clone(&launcher) as Arc<dyn SessionLauncher>);

    let err = pipeline.run(LISTING_URL).await.unwrap_err();

    assert!(matches!(err, ScrapeError::Load { .. }));
    assert_eq!(pipeline.provisioner().live_count(), 0);
    assert_eq!(launcher.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_before_product_stage() {
    let dir = TempDir::new().unwrap();
    let (_, site) = catalogue(4);
    let launcher = FakeLauncher::new(site);
    let cancel = CancellationFlag::new();
    cancel.cancel();
    let pipeline = Pipeline::new(test_config(dir.path()), launcher as Arc<dyn SessionLauncher>)
        .with_cancellation(cancel);

    let err = pipeline.run(LISTING_URL).await.unwrap_err();
    assert!(matches!(err, ScrapeError::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn collect_many_writes_one_links_file_per_category() {
    let dir = TempDir::new().unwrap();
    let (_, site) = catalogue(4);
    let launcher = FakeLauncher::new(site);
    let pipeline = Pipeline::new(test_config(dir.path()), launcher as Arc<dyn SessionLauncher>);
    let listings = vec![
        "https://www.ozon.ru/category/chaniki-1/".to_string(),
        "https://www.ozon.ru/category/termosy-2/".to_string(),
        "https://www.ozon.ru/category/kofevarki-3/".to_string(),
    ];

    let outcomes = pipeline.collect_many(&listings).await;

    assert_eq!(outcomes.len(), 3);
    for (outcome, slug) in outcomes.iter().zip(["chaniki-1", "termosy-2", "kofevarki-3"]) {
        let outcome = outcome.as_ref().unwrap();
        assert_eq!(outcome.stats.category, slug);
        assert_eq!(
            outcome.persistence,
            Persistence::Saved(dir.path().join(format!("{slug}_links.json")))
        );
    }
    assert_eq!(pipeline.provisioner().live_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn collect_many_keeps_repeated_categories_apart() {
    let dir = TempDir::new().unwrap();
    let (_, site) = catalogue(4);
    let launcher = FakeLauncher::new(site);
    let pipeline = Pipeline::new(test_config(dir.path()), launcher as Arc<dyn SessionLauncher>);
    let listings = vec![
        "https://www.ozon.ru/category/chayniki-1/?page=1".to_string(),
        "https://www.ozon.ru/category/chayniki-1/?page=2".to_string(),
        "https://www.ozon.ru/search/?text=tea".to_string(),
        "https://www.ozon.ru/search/?text=coffee".to_string(),
    ];

    let outcomes = pipeline.collect_many(&listings).await;

    let paths: Vec<_> = outcomes
        .iter()
        .map(|o| match &o.as_ref().unwrap().persistence {
            Persistence::Saved(path) => path.clone(),
            other => panic!("links not saved: {other:?}"),
        })
        .collect();
    let names: Vec<_> = paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "chayniki-1_links.json",
            "chayniki-1_2_links.json",
            "unknown_category_links.json",
            "unknown_category_2_links.json",
        ]
    );
    for path in &paths {
        assert!(path.exists(), "{}", path.display());
    }
}
