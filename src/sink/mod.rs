//! Result persistence
//!
//! The pool hands over plain `ExtractionResult` records; how they become a
//! file is decided here. The CSV sink writes `RESULT_COLUMNS` in order.

pub mod csv_sink;

pub use csv_sink::{write_results_csv, write_rows};

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

use crate::utils::result_file_name;

/// `<results_dir>/<category>_<timestamp>.csv`
#[must_use]
pub fn suggested_results_path(results_dir: &Path, category: &str, at: DateTime<Local>) -> PathBuf {
    results_dir.join(result_file_name(category, at))
}
