//! Error taxonomy for scrape runs
//!
//! Per-URL problems never travel as `ScrapeError`: the extractor folds them into
//! `ExtractionResult::status`. Only run-level failures (a session that cannot be
//! started, a listing page that never becomes ready) and persistence failures
//! are reported through this type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for scrape operations
pub type ScrapeResult<T> = Result<T, ScrapeError>;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Listing page did not reach a ready state
    #[error("Failed to load {url}: {message}")]
    Load { url: String, message: String },

    /// Site-level block or CAPTCHA
    #[error("Access denied at {url}: {reason}")]
    AccessDenied { url: String, reason: String },

    /// Unexpected failure while reading the DOM
    #[error("Extraction failed for {url}: {message}")]
    Extraction { url: String, message: String },

    /// Links or results could not be written
    #[error("Failed to save {}: {message}", path.display())]
    Save { path: PathBuf, message: String },

    /// Links file exists but does not parse
    #[error("Malformed links file {}: {message}", path.display())]
    MalformedLinks { path: PathBuf, message: String },

    /// Browser session could not be started
    #[error("Failed to provision browser session: {0}")]
    Provision(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Run stopped by an external signal
    #[error("Scrape run was cancelled")]
    Cancelled,
}

impl ScrapeError {
    /// Errors that abort a whole run rather than a single URL
    #[must_use]
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, Self::Provision(_) | Self::Load { .. })
    }

    pub(crate) fn load(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Load {
            url: url.into(),
            message: format!("{err:#}"),
        }
    }

    pub(crate) fn save(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Save {
            path: path.into(),
            message: format!("{err:#}"),
        }
    }
}
