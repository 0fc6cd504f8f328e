//! Adaptive block-range log fetcher.
//!
//! Providers cap `eth_getLogs` by block span or result count, each in their
//! own way. The fetcher walks `[from, to]` in chunks, starting with the
//! widest configured window. When the provider rejects a chunk as too large
//! it steps down to the next smaller window, waits a linearly growing delay,
//! and retries the same start block. Windows never grow back within a call.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256};
use tracing::{debug, warn};

use super::{ChainProvider, ErrorClass, ErrorClassifier, LogFilter, ProviderError, RawLog};

/// Errors from [`LogFetcher::fetch`].
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Provider error: {0}")]
    Provider(#[source] ProviderError),

    #[error(
        "Block range {from}..={to} still rejected after {attempts} window reductions: {last_error}"
    )]
    WindowsExhausted {
        from: u64,
        to: u64,
        attempts: usize,
        last_error: ProviderError,
    },
}

/// Fetches logs for a contract over a block range with window backoff.
pub struct LogFetcher {
    provider: Arc<dyn ChainProvider>,
    classifier: Arc<dyn ErrorClassifier>,
    windows: Vec<u64>,
    retry_delay: Duration,
}

impl LogFetcher {
    /// `windows` must be non-empty and strictly decreasing.
    pub fn new(
        provider: Arc<dyn ChainProvider>,
        classifier: Arc<dyn ErrorClassifier>,
        windows: Vec<u64>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            provider,
            classifier,
            windows,
            retry_delay,
        }
    }

    pub fn provider(&self) -> &Arc<dyn ChainProvider> {
        &self.provider
    }

    /// Fetch all logs emitted by `address` with any of `topic0s` in
    /// `[from, to]`, in chain order.
    ///
    /// Returns an empty list when `from > to` without calling the provider.
    pub async fn fetch(
        &self,
        address: Address,
        topic0s: &[B256],
        from: u64,
        to: u64,
    ) -> Result<Vec<RawLog>, FetchError> {
        let mut logs = Vec::new();
        if from > to || self.windows.is_empty() {
            return Ok(logs);
        }

        let mut level = 0usize;
        let mut retries = 0usize;
        let mut cursor = from;

        loop {
            let window = self.windows[level];
            let chunk_end = cursor.saturating_add(window.saturating_sub(1)).min(to);
            let filter = LogFilter {
                address,
                topic0s: topic0s.to_vec(),
                from_block: cursor,
                to_block: chunk_end,
            };

            match self.provider.get_logs(&filter).await {
                Ok(mut chunk) => {
                    record_call("success");
                    debug!(
                        from = cursor,
                        to = chunk_end,
                        window,
                        logs = chunk.len(),
                        "Fetched log chunk"
                    );
                    logs.append(&mut chunk);
                    if chunk_end >= to {
                        return Ok(logs);
                    }
                    cursor = chunk_end + 1;
                }
                Err(err) => match self.classifier.classify(&err) {
                    ErrorClass::Fatal => {
                        record_call("error");
                        return Err(FetchError::Provider(err));
                    }
                    ErrorClass::RangeLimit => {
                        record_call("range_limited");
                        retries += 1;
                        if level + 1 >= self.windows.len() {
                            warn!(
                                from = cursor,
                                to = chunk_end,
                                window,
                                error = %err,
                                "Smallest block window still rejected"
                            );
                            return Err(FetchError::WindowsExhausted {
                                from: cursor,
                                to: chunk_end,
                                attempts: retries,
                                last_error: err,
                            });
                        }
                        level += 1;

                        #[cfg(feature = "otel")]
                        crate::utils::metrics::FETCH_WINDOW_SHRINK_TOTAL.add(1, &[]);

                        let delay = self.retry_delay * retries as u32;
                        warn!(
                            from = cursor,
                            window = self.windows[level],
                            error = %err,
                            "Block range rejected, narrowing window in {:?}",
                            delay
                        );
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                },
            }
        }
    }
}

#[cfg(feature = "otel")]
fn record_call(outcome: &str) {
    use crate::utils::metrics::{self, FETCH_CALLS_TOTAL};
    FETCH_CALLS_TOTAL.add(1, &[metrics::outcome_attr(outcome)]);
}

#[cfg(not(feature = "otel"))]
fn record_call(_outcome: &str) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::{created_log, ScriptedProvider, MOCK_CONTRACT};
    use crate::chain::{topic0, PatternClassifier};
    use crate::events::EventType;

    fn fetcher(provider: Arc<ScriptedProvider>) -> LogFetcher {
        LogFetcher::new(
            provider,
            Arc::new(PatternClassifier::default()),
            vec![5000, 2000, 1000, 500, 100],
            Duration::ZERO,
        )
    }

    fn created_topic() -> Vec<B256> {
        vec![topic0(EventType::GiftCreated).unwrap()]
    }

    #[tokio::test]
    async fn test_empty_range_makes_no_calls() {
        let provider = Arc::new(ScriptedProvider::new(1000));
        let logs = fetcher(provider.clone())
            .fetch(MOCK_CONTRACT, &created_topic(), 200, 100)
            .await
            .unwrap();
        assert!(logs.is_empty());
        assert!(provider.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_single_call_when_range_accepted() {
        let provider = Arc::new(ScriptedProvider::new(1000));
        provider.push_log(created_log("0x01", 0, 150, 1, 5)).await;
        provider.push_log(created_log("0x02", 0, 900, 2, 5)).await;

        let logs = fetcher(provider.clone())
            .fetch(MOCK_CONTRACT, &created_topic(), 100, 1000)
            .await
            .unwrap();

        assert_eq!(logs.len(), 2);
        assert_eq!(provider.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_steps_down_until_accepted_then_covers_range() {
        let provider = Arc::new(ScriptedProvider::new(10_000));
        provider.set_max_range(Some(1000)).await;
        provider.push_log(created_log("0x01", 0, 10, 1, 5)).await;
        provider.push_log(created_log("0x02", 1, 1500, 2, 5)).await;
        provider.push_log(created_log("0x03", 2, 2999, 3, 5)).await;

        let logs = fetcher(provider.clone())
            .fetch(MOCK_CONTRACT, &created_topic(), 0, 2999)
            .await
            .unwrap();

        assert_eq!(logs.len(), 3);
        let calls = provider.calls().await;
        let spans: Vec<(u64, u64)> = calls.iter().map(|c| (c.from_block, c.to_block)).collect();
        // 5000 and 2000 rejected, then three 1000-block chunks
        assert_eq!(
            spans,
            vec![
                (0, 2999),
                (0, 1999),
                (0, 999),
                (1000, 1999),
                (2000, 2999)
            ]
        );
    }

    #[tokio::test]
    async fn test_exhaustion_terminates() {
        let provider = Arc::new(ScriptedProvider::new(10_000));
        provider.set_max_range(Some(50)).await;

        let err = fetcher(provider.clone())
            .fetch(MOCK_CONTRACT, &created_topic(), 0, 9999)
            .await
            .unwrap_err();

        match err {
            FetchError::WindowsExhausted { attempts, .. } => assert_eq!(attempts, 5),
            other => panic!("expected WindowsExhausted, got {other:?}"),
        }
        assert_eq!(provider.calls().await.len(), 5);
    }

    #[tokio::test]
    async fn test_non_range_error_is_not_retried() {
        let provider = Arc::new(ScriptedProvider::new(1000));
        provider
            .fail_topic(
                topic0(EventType::GiftCreated).unwrap(),
                ProviderError::Http { status: 401 },
            )
            .await;

        let err = fetcher(provider.clone())
            .fetch(MOCK_CONTRACT, &created_topic(), 0, 100)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FetchError::Provider(ProviderError::Http { status: 401 })
        ));
        assert_eq!(provider.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_linear_retry_delay() {
        let provider = Arc::new(ScriptedProvider::new(10_000));
        provider.set_max_range(Some(500)).await;
        let fetcher = LogFetcher::new(
            provider,
            Arc::new(PatternClassifier::default()),
            vec![2000, 1000, 500],
            Duration::from_millis(10),
        );

        let start = std::time::Instant::now();
        fetcher
            .fetch(MOCK_CONTRACT, &created_topic(), 0, 499)
            .await
            .unwrap();
        // The first chunk is clamped to the range, so no rejection happens
        assert!(start.elapsed() < Duration::from_millis(10));

        let start = std::time::Instant::now();
        fetcher
            .fetch(MOCK_CONTRACT, &created_topic(), 0, 1999)
            .await
            .unwrap();
        // 10ms after the first rejection, 20ms after the second
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
