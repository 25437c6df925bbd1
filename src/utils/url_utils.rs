//! URL and file-name helpers.
//!
//! Listing tiles link to product pages with tracking query strings attached;
//! links are compared after normalization so the same product found twice
//! during scrolling counts once.

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::constants::FILE_TIMESTAMP_FORMAT;

static CATEGORY_SLUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/category/([^/?#]+)").expect("Invalid category slug regex"));

static THUMBNAIL_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/wc(50|250|500)/").expect("Invalid thumbnail segment regex"));

/// Category slug from a listing URL, `unknown_category` when absent
///
/// ```
/// # use marketscrape::utils::category_name;
/// assert_eq!(category_name("https://www.ozon.ru/category/smartfony-15502/?page=2"), "smartfony-15502");
/// assert_eq!(category_name("https://www.ozon.ru/search/?text=tea"), "unknown_category");
/// ```
#[must_use]
pub fn category_name(url: &str) -> String {
    CATEGORY_SLUG
        .captures(url)
        .and_then(|c| c.get(1))
        .map_or_else(|| "unknown_category".to_string(), |m| m.as_str().to_string())
}

/// Canonical form of a product link, or `None` if it is not a product page
///
/// Query and fragment are dropped; the result must start with `prefix`.
#[must_use]
pub fn normalize_product_url(raw: &str, prefix: &str) -> Option<String> {
    let mut parsed = Url::parse(raw.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    parsed.set_query(None);
    parsed.set_fragment(None);

    let normalized = parsed.to_string();
    if normalized.starts_with(prefix) && normalized.len() > prefix.len() {
        Some(normalized)
    } else {
        None
    }
}

/// Rewrite thumbnail CDN paths to the full-size variant
#[must_use]
pub fn upscale_image_url(src: &str) -> String {
    THUMBNAIL_SEGMENT.replace_all(src, "/wc1000/").into_owned()
}

/// Suggested result file name: `<category>_<timestamp>.csv`
#[must_use]
pub fn result_file_name(category: &str, at: DateTime<Local>) -> String {
    format!("{category}_{}.csv", at.format(FILE_TIMESTAMP_FORMAT))
}
