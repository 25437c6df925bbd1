//! Shared result collection
//!
//! Records and the processed counter live behind one lock so a reader never
//! sees a count that runs ahead of the records.

use parking_lot::Mutex;

use crate::scrape_types::ExtractionResult;

#[derive(Debug, Default)]
struct StoreInner {
    results: Vec<ExtractionResult>,
    processed: usize,
}

#[derive(Debug, Default)]
pub struct ResultStore {
    inner: Mutex<StoreInner>,
}

impl ResultStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and bump the counter; returns the new count
    pub fn push(&self, result: ExtractionResult) -> usize {
        let mut inner = self.inner.lock();
        inner.results.push(result);
        inner.processed += 1;
        inner.processed
    }

    /// Replace the record for `result.url` if one exists, else append
    ///
    /// Used by the retry pass so a URL never appears twice. The counter only
    /// moves on append.
    pub fn upsert(&self, result: ExtractionResult) -> usize {
        let mut inner = self.inner.lock();
        if let Some(slot) = inner.results.iter_mut().find(|r| r.url == result.url) {
            *slot = result;
        } else {
            inner.results.push(result);
            inner.processed += 1;
        }
        inner.processed
    }

    /// Append only if `result.url` has no record yet; returns whether it did
    pub fn push_missing(&self, result: ExtractionResult) -> bool {
        let mut inner = self.inner.lock();
        if inner.results.iter().any(|r| r.url == result.url) {
            return false;
        }
        inner.results.push(result);
        inner.processed += 1;
        true
    }

    /// Consistent `(records, counter)` view
    #[must_use]
    pub fn snapshot(&self) -> (Vec<ExtractionResult>, usize) {
        let inner = self.inner.lock();
        (inner.results.clone(), inner.processed)
    }

    #[must_use]
    pub fn processed(&self) -> usize {
        self.inner.lock().processed
    }

    #[must_use]
    pub fn into_results(self) -> Vec<ExtractionResult> {
        self.inner.into_inner().results
    }
}
