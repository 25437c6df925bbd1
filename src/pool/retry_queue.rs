//! Secondary-pass queue for URLs that stayed unrecoverable
//!
//! Each entry keeps the failed record so a URL that never gets a second
//! chance (cancelled run, no retry session) still reports its first outcome.
//! The queue hands its contents out once; later drains come back empty.

use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info};

use crate::scrape_types::ExtractionResult;

#[derive(Debug)]
struct Held {
    seq: u64,
    result: ExtractionResult,
}

#[derive(Debug, Default)]
pub struct RetryQueue {
    /// URL -> failed record, insertion sequence for ordering
    items: DashMap<String, Held>,
    seq: AtomicU64,
    drained: AtomicBool,
}

impl RetryQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold a failed record for the secondary pass
    ///
    /// Returns `false` once the queue has been drained; the record is then
    /// left as the final outcome.
    pub fn add(&self, result: ExtractionResult) -> bool {
        if self.drained.load(Ordering::Acquire) {
            debug!(
                target: "marketscrape::pool",
                "Retry queue already drained, keeping {} as-is",
                result.url
            );
            return false;
        }
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.items
            .entry(result.url.clone())
            .or_insert(Held { seq, result });
        true
    }

    /// Take every held record, oldest first; only the first call yields items
    pub fn drain_once(&self) -> Vec<ExtractionResult> {
        if self.drained.swap(true, Ordering::AcqRel) {
            return Vec::new();
        }

        let urls: Vec<String> = self.items.iter().map(|e| e.key().clone()).collect();
        let mut held: Vec<Held> = urls
            .into_iter()
            .filter_map(|url| self.items.remove(&url).map(|(_, h)| h))
            .collect();
        held.sort_by_key(|h| h.seq);

        if !held.is_empty() {
            info!(
                target: "marketscrape::pool",
                "Draining {} URLs for the retry pass",
                held.len()
            );
        }
        held.into_iter().map(|h| h.result).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.drained.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_in_insertion_order_exactly_once() {
        let queue = RetryQueue::new();
        for slug in ["c", "a", "b"] {
            assert!(queue.add(ExtractionResult::access_denied(format!("https://x/product/{slug}/"))));
        }
        assert_eq!(queue.len(), 3);

        let urls: Vec<String> = queue.drain_once().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "https://x/product/c/",
                "https://x/product/a/",
                "https://x/product/b/"
            ]
        );
        assert!(queue.drain_once().is_empty());
        assert!(!queue.add(ExtractionResult::access_denied("https://x/product/d/")));
        assert!(queue.is_empty());
    }

    #[test]
    fn duplicate_url_keeps_first_record() {
        let queue = RetryQueue::new();
        queue.add(ExtractionResult::access_denied("https://x/product/a/"));
        queue.add(ExtractionResult::failed("https://x/product/a/", "boom"));
        let drained = queue.drain_once();
        assert_eq!(drained.len(), 1);
        assert!(drained[0].is_unrecoverable());
        assert_eq!(drained[0].seller_name.to_string(), "Access restricted");
    }
}
