//! Timeout and polling primitives for page operations
//!
//! Everything here runs on `tokio::time`, so tests drive it with a paused
//! clock instead of real sleeps.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Run a page operation with an explicit timeout
///
/// Distinguishes a timeout (`"<name> timeout after Ns"`) from the operation's
/// own failure.
pub async fn with_page_timeout<F, T>(operation: F, timeout: Duration, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "{operation_name} timeout after {} seconds",
            timeout.as_secs_f64()
        )),
    }
}

/// Call `probe` every `interval` until it yields a value or `timeout` passes
///
/// The probe runs at least once, even with a zero timeout.
pub async fn poll_until<F, Fut, T>(timeout: Duration, interval: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await {
            return Some(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}
