//! ChainProvider trait definition.

use alloy::primitives::{Address, LogData, B256};
use alloy::rpc::types::Filter;
use async_trait::async_trait;

/// One log entry as returned by the provider, undecoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    /// Topics plus the ABI-encoded non-indexed arguments.
    pub data: LogData,
    pub block_number: u64,
    pub transaction_hash: B256,
    pub log_index: u64,
    /// Unix seconds, when the provider includes it on the log.
    pub block_timestamp: Option<u64>,
}

impl RawLog {
    /// Convert an RPC log. Pending logs (no block or transaction yet) and
    /// logs flagged `removed` by a reorg yield `None`.
    pub fn from_rpc(log: alloy::rpc::types::Log) -> Option<Self> {
        if log.removed {
            return None;
        }
        Some(Self {
            block_number: log.block_number?,
            transaction_hash: log.transaction_hash?,
            log_index: log.log_index?,
            block_timestamp: log.block_timestamp,
            address: log.inner.address,
            data: log.inner.data,
        })
    }

    pub fn topics(&self) -> &[B256] {
        self.data.topics()
    }

    /// Lower-case `0x`-prefixed transaction hash.
    pub fn tx_hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.transaction_hash))
    }
}

/// Logs query: one contract, any of `topic0s` in the first topic position,
/// inclusive block range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub topic0s: Vec<B256>,
    pub from_block: u64,
    pub to_block: u64,
}

impl LogFilter {
    /// Number of blocks covered by the filter.
    pub fn span(&self) -> u64 {
        self.to_block.saturating_sub(self.from_block) + 1
    }

    pub fn to_rpc(&self) -> Filter {
        Filter::new()
            .from_block(self.from_block)
            .to_block(self.to_block)
            .address(self.address)
            .event_signature(self.topic0s.clone())
    }
}

/// Errors reported by a chain provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("HTTP status {status}")]
    Http { status: u16 },

    #[error("Request timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed RPC response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Failures worth retrying as-is (rate limiting, upstream hiccups).
    ///
    /// Range-limit errors are not transient: repeating the same request
    /// fails the same way, the range has to shrink.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Http { status } => *status == 429 || *status >= 500,
            ProviderError::Transport(_) => true,
            _ => false,
        }
    }
}

/// Interface for a blockchain RPC backend.
///
/// Implementations:
/// - `JsonRpcProvider`: Ethereum JSON-RPC over HTTP (alloy)
/// - `ScriptedProvider`: in-memory chain for tests
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Current head block number.
    async fn block_number(&self) -> Result<u64, ProviderError>;

    /// Logs matching the filter, in chain order.
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, ProviderError>;
}
