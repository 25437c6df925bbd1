//! CSV result writer

use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{ScrapeError, ScrapeResult};
use crate::scrape_types::{ExtractionResult, RESULT_COLUMNS};
use crate::utils::flatten_cell_text;

/// Write the header and one row per result to `writer`
///
/// Cell text is flattened to a single line.
pub fn write_rows<W: Write>(writer: W, results: &[ExtractionResult]) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(RESULT_COLUMNS)?;
    for result in results {
        out.write_record(result.to_row().iter().map(|cell| flatten_cell_text(cell)))?;
    }
    out.flush()?;
    Ok(())
}

/// Write `results` to `path` as CSV, creating the parent directory
///
/// Encoding runs on the blocking pool. Returns the written path.
pub async fn write_results_csv(path: &Path, results: Vec<ExtractionResult>) -> ScrapeResult<PathBuf> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ScrapeError::save(parent, e))?;
    }

    let target = path.to_path_buf();
    let count = results.len();
    let written = tokio::task::spawn_blocking(move || -> Result<PathBuf, String> {
        let file = std::fs::File::create(&target).map_err(|e| e.to_string())?;
        write_rows(std::io::BufWriter::new(file), &results).map_err(|e| e.to_string())?;
        Ok(target)
    })
    .await
    .map_err(|e| ScrapeError::save(path, format!("CSV writer task panicked: {e}")))?
    .map_err(|e| ScrapeError::save(path, e))?;

    info!(
        target: "marketscrape::sink",
        "Saved {count} results to {}",
        written.display()
    );
    Ok(written)
}
