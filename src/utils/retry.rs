//! Retry utilities: backoff builders for transient failures.
//!
//! Uses `backon` for exponential backoff with jitter. Range-limit errors
//! from the chain provider are NOT retried here; the fetcher narrows the
//! block window for those instead.

use std::time::Duration;

use backon::ExponentialBuilder;

/// Backoff for transient JSON-RPC failures (429, 5xx, dropped connections).
///
/// - Min delay: 200ms
/// - Max delay: 5s
/// - Max attempts: 4
/// - Jitter enabled
pub fn rpc_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(200))
        .with_max_delay(Duration::from_secs(5))
        .with_max_times(4)
        .with_jitter()
}

/// Backoff for storage connection retries at startup.
///
/// - Min delay: 100ms
/// - Max delay: 5s
/// - Max attempts: 30
/// - Jitter enabled
pub fn connection_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_secs(5))
        .with_max_times(30)
        .with_jitter()
}
