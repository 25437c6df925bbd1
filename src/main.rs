// marketscrape: collect product links from marketplace category listings and
// scrape seller details from every product page.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{info, warn};

use marketscrape::collector::Persistence;
use marketscrape::{
    CancellationFlag, EventSink, Pipeline, PoolEvent, ScrapeConfig, load_links,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Settings {
    /// JSON config file; flags below override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for links and result files
    #[arg(short, long, global = true)]
    results_dir: Option<PathBuf>,

    /// Product-page worker count
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    /// Links to collect per listing
    #[arg(short, long, global = true)]
    target: Option<usize>,

    /// Show browser windows (debug builds only)
    #[arg(long, global = true)]
    headed: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Collect product links from one or more category pages
    Links {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Scrape product pages listed in a links file
    Products {
        links_file: PathBuf,
        /// Results CSV path; defaults to a timestamped name in the results dir
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Collect a category and scrape every product found
    Run { url: String },
}

fn load_config(settings: &Settings) -> Result<ScrapeConfig> {
    let base = match &settings.config {
        Some(path) => ScrapeConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ScrapeConfig::default(),
    };

    let mut builder = base.into_builder();
    if let Some(dir) = &settings.results_dir {
        builder = builder.results_dir(dir.clone());
    }
    if let Some(workers) = settings.workers {
        builder = builder.product_workers(workers);
    }
    if let Some(target) = settings.target {
        builder = builder.target_links(target);
    }
    if settings.headed {
        builder = builder.headless(false);
    }
    Ok(builder.build()?)
}

/// Log pool progress as `[n/total] worker k: url -> status`
async fn log_events(mut rx: mpsc::Receiver<PoolEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            PoolEvent::UrlProcessed {
                worker,
                url,
                status,
                attempts,
                processed,
                total,
                ..
            } => {
                info!("[{processed}/{total}] worker {worker}: {url} -> {status} ({attempts} attempts)");
            }
            PoolEvent::WorkerFailedToStart { worker, error, .. } => {
                warn!("worker {worker} failed to start: {error}");
            }
            PoolEvent::RetryPassStarted { urls, workers } => {
                info!("retrying {urls} URLs with {workers} workers");
            }
            PoolEvent::RetryPassSkipped { held } => {
                warn!("stop requested, {held} failed URLs not retried");
            }
            PoolEvent::Finished { summary, cancelled } => {
                info!("{}{summary}", if cancelled { "(cancelled) " } else { "" });
            }
            _ => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.settings)?;

    let cancel = CancellationFlag::new();
    let (events, rx) = EventSink::channel(config.event_channel_capacity());
    let logger = tokio::spawn(log_events(rx));

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Stop requested; finishing in-progress pages");
                cancel.cancel();
            }
        });
    }

    let pipeline = Pipeline::chromium(config)
        .with_events(events)
        .with_cancellation(cancel);

    let outcome = execute(&pipeline, cli.command).await;
    pipeline.shutdown().await;
    drop(pipeline);
    if let Err(e) = logger.await {
        warn!("Event logger stopped abnormally: {e}");
    }
    outcome
}

async fn execute(pipeline: &Pipeline, command: Command) -> Result<()> {
    match command {
        Command::Links { urls } => {
            if let [url] = urls.as_slice() {
                let outcome = pipeline.collect_links(url).await?;
                report_links(url, &outcome.persistence, outcome.links.len());
            } else {
                for (url, result) in urls.iter().zip(pipeline.collect_many(&urls).await) {
                    match result {
                        Ok(outcome) => report_links(url, &outcome.persistence, outcome.links.len()),
                        Err(e) => warn!("{url}: {e}"),
                    }
                }
            }
        }
        Command::Products { links_file, out } => {
            let urls = load_links(&links_file).await?;
            info!("Loaded {} URLs from {}", urls.len(), links_file.display());
            let report = pipeline.scrape_products(urls.clone()).await?;
            let path = match out {
                Some(path) => {
                    marketscrape::write_results_csv(&path, report.results_in_order(&urls)).await?
                }
                None => {
                    let stem = links_file
                        .file_stem()
                        .map_or_else(|| "products".to_string(), |s| s.to_string_lossy().into_owned());
                    pipeline.write_results(&report, &stem, &urls).await?
                }
            };
            info!("Results written to {}", path.display());
        }
        Command::Run { url } => {
            let output = pipeline.run(&url).await?;
            match output.results_file {
                Persistence::Saved(path) => info!("Results written to {}", path.display()),
                Persistence::Failed(e) => warn!("Results not saved: {e}"),
                Persistence::NotRequested => {}
            }
        }
    }
    Ok(())
}

fn report_links(url: &str, persistence: &Persistence, count: usize) {
    match persistence {
        Persistence::Saved(path) => info!("{url}: {count} links saved to {}", path.display()),
        Persistence::Failed(e) => warn!("{url}: {count} links collected but not saved: {e}"),
        Persistence::NotRequested => info!("{url}: {count} links collected"),
    }
}
