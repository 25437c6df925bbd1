pub mod collector;
pub mod config;
pub mod error;
pub mod extractor;
pub mod pipeline;
pub mod pool;
pub mod scrape_types;
pub mod session;
pub mod sink;
pub mod stealth;
pub mod utils;
pub mod wait;

pub use collector::{CollectionOutcome, LinkCollector, StopReason, load_links, save_links};
pub use config::{LinkFormat, ScrapeConfig, ScrapeConfigBuilder};
pub use error::{ScrapeError, ScrapeResult};
pub use extractor::{ProductExtractor, RetryPolicy};
pub use pipeline::{Pipeline, RunOutput};
pub use pool::{CancellationFlag, EventSink, PoolEvent, PoolReport, RunSummary, WorkerPool};
pub use scrape_types::{CollectedLink, ExtractionResult, ExtractionStatus, Field, RESULT_COLUMNS};
pub use session::{
    BrowserSession, ChromiumLauncher, DriverProvisioner, SessionHandle, SessionId, SessionLauncher,
};
pub use sink::{suggested_results_path, write_results_csv};

/// Collect one listing and scrape every product found on it
pub async fn scrape_category(config: ScrapeConfig, listing_url: &str) -> ScrapeResult<RunOutput> {
    Pipeline::chromium(config).run(listing_url).await
}
