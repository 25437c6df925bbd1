//! Round-robin assignment of URLs to workers

/// Deal `urls` across `workers` buckets in round-robin order
///
/// Bucket sizes differ by at most one and each bucket keeps the input order.
/// Empty buckets are dropped, so fewer than `workers` partitions come back
/// when there are fewer URLs than workers.
///
/// ```
/// # use marketscrape::pool::round_robin;
/// let urls: Vec<String> = (1..=7).map(|i| format!("u{i}")).collect();
/// let parts = round_robin(&urls, 3);
/// assert_eq!(parts.iter().map(Vec::len).collect::<Vec<_>>(), vec![3, 2, 2]);
/// assert_eq!(parts[0], vec!["u1", "u4", "u7"]);
/// ```
#[must_use]
pub fn round_robin(urls: &[String], workers: usize) -> Vec<Vec<String>> {
    let workers = workers.max(1).min(urls.len());
    let mut buckets: Vec<Vec<String>> = vec![Vec::new(); workers];
    for (i, url) in urls.iter().enumerate() {
        buckets[i % workers].push(url.clone());
    }
    buckets
}
