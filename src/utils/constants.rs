//! Shared configuration constants for marketscrape
//!
//! Default values used by `ScrapeConfig` and the sentinel strings written for
//! fields the extractor could not fill.

/// Target number of product links collected per category
pub const DEFAULT_TARGET_LINKS: usize = 500;

/// Scrolls in a row without a new link before the collector gives up
pub const DEFAULT_MAX_IDLE_SCROLLS: u32 = 5;

/// Delay after each scroll so lazy tiles can render
pub const DEFAULT_SCROLL_DELAY_MS: u64 = 1500;

/// Wait for the listing container / product content to appear
pub const DEFAULT_PAGE_LOAD_TIMEOUT_SECS: u64 = 15;

/// Product workers, each owning one Chrome process
///
/// Every worker costs one browser process (~150-300 MB). Twenty keeps a
/// desktop machine responsive while the workload stays network-bound.
pub const DEFAULT_PRODUCT_WORKERS: usize = 20;

/// Concurrent category pages during link collection
pub const DEFAULT_LINK_WORKERS: usize = 2;

/// Workers used for the secondary retry pass
pub const DEFAULT_RETRY_WORKERS: usize = 2;

/// Pause between worker launches
pub const DEFAULT_WORKER_STAGGER_MS: u64 = 1000;

/// Pause between two URLs inside one worker
pub const DEFAULT_INTER_URL_DELAY_MS: u64 = 300;

/// Settle time after navigation before the first DOM probe
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2000;

/// Settle time after an in-place reload between attempts
pub const DEFAULT_RELOAD_DELAY_MS: u64 = 3000;

/// Full extraction attempts per URL
pub const DEFAULT_MAX_EXTRACTION_ATTEMPTS: u32 = 5;

/// Canonical product-path prefix; links outside it are ignored
pub const DEFAULT_PRODUCT_URL_PREFIX: &str = "https://www.ozon.ru/product/";

/// Capacity of the bounded worker event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default links file name inside `results_dir`
pub const DEFAULT_LINKS_FILE_NAME: &str = "links.json";

/// Minimum characters for extracted text to count as usable
pub const MIN_USABLE_TEXT_CHARS: usize = 4;

/// Sentinel written when an extractor ran but found nothing
pub const NOT_FOUND_TEXT: &str = "Not found";

/// Sentinel written for every text field of a blocked page
pub const ACCESS_RESTRICTED_TEXT: &str = "Access restricted";

/// Longest failure text kept in a result cell
pub const ERROR_TEXT_MAX_CHARS: usize = 300;

/// Timestamp layout used in result file names
pub const FILE_TIMESTAMP_FORMAT: &str = "%d.%m.%Y-%H_%M_%S";

/// Chrome user agent string for stealth mode
///
/// Keep within a few major versions of current stable.
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
