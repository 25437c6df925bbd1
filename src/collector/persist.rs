//! Links file reading and writing

use serde::Deserialize;
use std::path::Path;

use crate::config::LinkFormat;
use crate::error::{ScrapeError, ScrapeResult};
use crate::scrape_types::CollectedLink;

/// Write links in `format`, creating the parent directory if needed
pub async fn save_links(path: &Path, links: &[CollectedLink], format: LinkFormat) -> ScrapeResult<()> {
    let body = match format {
        LinkFormat::Json => {
            serde_json::to_string_pretty(links).map_err(|e| ScrapeError::save(path, e))?
        }
        LinkFormat::Lines => links
            .iter()
            .map(|l| l.url.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ScrapeError::save(parent, e))?;
    }
    tokio::fs::write(path, body)
        .await
        .map_err(|e| ScrapeError::save(path, e))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LinkEntry {
    Url(String),
    Link(CollectedLink),
}

/// Read product URLs back from either format
///
/// A file whose first non-blank character is `[` is parsed as JSON (an array
/// of link objects or plain strings); anything else is one URL per line.
pub async fn load_links(path: &Path) -> ScrapeResult<Vec<String>> {
    let raw = tokio::fs::read_to_string(path).await?;
    parse_links(&raw).map_err(|message| ScrapeError::MalformedLinks {
        path: path.to_path_buf(),
        message,
    })
}

pub(crate) fn parse_links(raw: &str) -> Result<Vec<String>, String> {
    let trimmed = raw.trim_start_matches('\u{feff}').trim();
    if trimmed.starts_with('[') {
        let entries: Vec<LinkEntry> = serde_json::from_str(trimmed).map_err(|e| e.to_string())?;
        Ok(entries
            .into_iter()
            .map(|e| match e {
                LinkEntry::Url(url) => url,
                LinkEntry::Link(link) => link.url,
            })
            .collect())
    } else {
        Ok(trimmed
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }
}
