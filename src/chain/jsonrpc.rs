//! Ethereum JSON-RPC provider over HTTP, backed by an alloy provider.

use std::time::Duration;

use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::transports::http::Http;
use alloy::transports::{RpcError, TransportErrorKind};
use async_trait::async_trait;
use backon::Retryable;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ChainProvider, LogFilter, ProviderError, RawLog};
use crate::utils::retry::rpc_backoff;

/// JSON-RPC error envelope, as some providers send it on a 4xx/5xx.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: RpcErrorBody,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Chain provider speaking Ethereum JSON-RPC over HTTP.
///
/// Transient failures (429, 5xx, dropped connections) are retried with
/// backoff. Everything else is returned to the caller for classification.
pub struct JsonRpcProvider {
    inner: DynProvider,
}

impl JsonRpcProvider {
    /// Create a provider with the given per-request timeout.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        // Provider URLs often embed API keys, keep them out of errors
        let url: reqwest::Url = url
            .parse()
            .map_err(|_| ProviderError::Transport("invalid provider URL".to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.without_url().to_string()))?;

        let rpc = RpcClient::new(Http::with_client(client, url), false);
        let inner = ProviderBuilder::new().connect_client(rpc).erased();

        Ok(Self { inner })
    }
}

fn log_retry(method: &'static str) -> impl Fn(&ProviderError, Duration) {
    move |err, dur| {
        warn!(method, error = %err, "Transient RPC failure, retrying in {:?}", dur);
    }
}

/// Map an alloy transport error onto [`ProviderError`].
fn map_rpc_error(err: RpcError<TransportErrorKind>) -> ProviderError {
    match err {
        RpcError::ErrorResp(payload) => ProviderError::Rpc {
            code: payload.code,
            message: payload.message.to_string(),
        },
        RpcError::Transport(TransportErrorKind::HttpError(http)) => {
            // Some providers report range errors as JSON-RPC errors on a 4xx/5xx
            match serde_json::from_str::<ErrorEnvelope>(&http.body) {
                Ok(envelope) => ProviderError::Rpc {
                    code: envelope.error.code,
                    message: envelope.error.message,
                },
                Err(_) => ProviderError::Http {
                    status: http.status,
                },
            }
        }
        RpcError::Transport(TransportErrorKind::Custom(source)) => {
            match source.downcast::<reqwest::Error>() {
                Ok(err) if err.is_timeout() => ProviderError::Timeout,
                Ok(err) => ProviderError::Transport((*err).without_url().to_string()),
                Err(other) => ProviderError::Transport(other.to_string()),
            }
        }
        RpcError::Transport(kind) => ProviderError::Transport(kind.to_string()),
        RpcError::DeserError { err, .. } => ProviderError::Decode(err.to_string()),
        other => ProviderError::Decode(other.to_string()),
    }
}

#[async_trait]
impl ChainProvider for JsonRpcProvider {
    async fn block_number(&self) -> Result<u64, ProviderError> {
        (|| async move { self.inner.get_block_number().await.map_err(map_rpc_error) })
            .retry(rpc_backoff())
            .when(ProviderError::is_transient)
            .notify(log_retry("eth_blockNumber"))
            .await
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, ProviderError> {
        let rpc_filter = &filter.to_rpc();

        let logs = (|| async move { self.inner.get_logs(rpc_filter).await.map_err(map_rpc_error) })
            .retry(rpc_backoff())
            .when(ProviderError::is_transient)
            .notify(log_retry("eth_getLogs"))
            .await?;

        let total = logs.len();
        let raw: Vec<RawLog> = logs.into_iter().filter_map(RawLog::from_rpc).collect();

        debug!(
            from = filter.from_block,
            to = filter.to_block,
            returned = total,
            kept = raw.len(),
            "eth_getLogs"
        );
        Ok(raw)
    }
}
