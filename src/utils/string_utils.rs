//! UTF-8-safe text helpers shared by the extractor and the result sink

use super::constants::MIN_USABLE_TEXT_CHARS;

/// Truncate a string to at most `max_chars` characters without splitting a
/// multi-byte character.
///
/// # Examples
/// ```
/// # use marketscrape::utils::string_utils::safe_truncate_chars;
/// assert_eq!(safe_truncate_chars("Hello, World!", 5), "Hello");
/// assert_eq!(safe_truncate_chars("Привет", 3), "При");
/// assert_eq!(safe_truncate_chars("Hi", 100), "Hi");
/// ```
#[inline]
#[must_use]
pub fn safe_truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Text the extractor may accept: non-empty after trimming and longer than a
/// stray label or price fragment.
#[inline]
#[must_use]
pub fn is_usable_text(text: &str) -> bool {
    text.trim().chars().count() >= MIN_USABLE_TEXT_CHARS
}

/// Collapse line breaks so a value fits one spreadsheet cell
#[must_use]
pub fn flatten_cell_text(text: &str) -> String {
    text.split(['\n', '\r'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
