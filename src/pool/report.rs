//! Run summary derived from the final result list

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::scrape_types::{ExtractionResult, ExtractionStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub success: usize,
    pub out_of_stock: usize,
    pub error: usize,
    pub access_denied: usize,
    /// URLs that went through the secondary pass
    pub retried: usize,
    pub duration: Duration,
}

impl RunSummary {
    #[must_use]
    pub fn from_results(results: &[ExtractionResult], duration: Duration, retried: usize) -> Self {
        let mut summary = Self {
            total: results.len(),
            retried,
            duration,
            ..Self::default()
        };
        for result in results {
            *summary.slot(result.status) += 1;
        }
        summary
    }

    fn slot(&mut self, status: ExtractionStatus) -> &mut usize {
        match status {
            ExtractionStatus::Success => &mut self.success,
            ExtractionStatus::OutOfStock => &mut self.out_of_stock,
            ExtractionStatus::Error => &mut self.error,
            ExtractionStatus::AccessDenied => &mut self.access_denied,
        }
    }

    #[must_use]
    pub fn count(&self, status: ExtractionStatus) -> usize {
        match status {
            ExtractionStatus::Success => self.success,
            ExtractionStatus::OutOfStock => self.out_of_stock,
            ExtractionStatus::Error => self.error,
            ExtractionStatus::AccessDenied => self.access_denied,
        }
    }

    /// Throughput over the whole run, zero for an instant run
    #[must_use]
    pub fn items_per_sec(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.total as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} items in {:.1}s ({:.2} items/s): ",
            self.total,
            self.duration.as_secs_f64(),
            self.items_per_sec()
        )?;
        let parts: Vec<String> = ExtractionStatus::ALL
            .iter()
            .map(|s| format!("{s}={}", self.count(*s)))
            .collect();
        write!(f, "{}, retried={}", parts.join(", "), self.retried)
    }
}

/// Outcome of one `WorkerPool::run`
#[derive(Debug, Clone)]
pub struct PoolReport {
    /// One record per URL; grouped by worker, not in input order
    pub results: Vec<ExtractionResult>,
    pub summary: RunSummary,
    pub cancelled: bool,
}

impl PoolReport {
    /// Results reordered to follow `order`; URLs missing from `order` go last
    #[must_use]
    pub fn results_in_order(&self, order: &[String]) -> Vec<ExtractionResult> {
        let positions: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .rev()
            .map(|(i, url)| (url.as_str(), i))
            .collect();
        let mut results = self.results.clone();
        results.sort_by_key(|r| positions.get(r.url.as_str()).copied().unwrap_or(usize::MAX));
        results
    }
}
