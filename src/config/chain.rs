//! Chain RPC configuration.

use std::time::Duration;

use alloy::primitives::Address;
use serde::Deserialize;

use super::ConfigError;

/// Provider error substrings that mean "ask for a smaller block range".
///
/// Matched case-insensitively against the provider's error message.
pub const DEFAULT_RANGE_ERROR_PATTERNS: &[&str] = &[
    "block range",
    "range too large",
    "range is too large",
    "too many",
    "limit exceeded",
    "query returned more than",
    "response size",
    "exceed",
    "timeout",
    "timed out",
];

/// JSON-RPC error codes that mean "ask for a smaller block range".
pub const DEFAULT_RANGE_ERROR_CODES: &[i64] = &[-32005];

/// Chain RPC configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,
    /// Address of the gifting contract whose logs are reconciled.
    pub contract_address: String,
    /// Average block interval, used to estimate timestamps when the
    /// provider omits `blockTimestamp` on logs.
    pub block_time_secs: u64,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
    /// Block-range sizes tried by the fetcher, largest first.
    pub range_windows: Vec<u64>,
    /// Base delay between range-narrowing retries; the actual delay is
    /// this value times the retry count.
    pub retry_delay_ms: u64,
    /// Error-message substrings classified as range-limit errors.
    pub range_error_patterns: Vec<String>,
    /// JSON-RPC error codes classified as range-limit errors.
    pub range_error_codes: Vec<i64>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            contract_address: String::new(),
            block_time_secs: 2,
            request_timeout_secs: 30,
            range_windows: vec![5000, 2000, 1000, 500, 100],
            retry_delay_ms: 1000,
            range_error_patterns: DEFAULT_RANGE_ERROR_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            range_error_codes: DEFAULT_RANGE_ERROR_CODES.to_vec(),
        }
    }
}

impl ChainConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn block_time(&self) -> Duration {
        Duration::from_secs(self.block_time_secs)
    }

    /// Parsed `contract_address`.
    pub fn contract(&self) -> Result<Address, ConfigError> {
        self.contract_address.trim().parse().map_err(|e| {
            ConfigError::Invalid(format!(
                "chain.contract_address is not a valid address: {e}"
            ))
        })
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc_url.trim().is_empty() {
            return Err(ConfigError::Invalid("chain.rpc_url is required".to_string()));
        }
        if self.contract_address.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "chain.contract_address is required".to_string(),
            ));
        }
        self.contract()?;
        if self.range_windows.is_empty() {
            return Err(ConfigError::Invalid(
                "chain.range_windows must list at least one window".to_string(),
            ));
        }
        if self.range_windows.contains(&0) {
            return Err(ConfigError::Invalid(
                "chain.range_windows entries must be greater than zero".to_string(),
            ));
        }
        if self.range_windows.windows(2).any(|w| w[0] <= w[1]) {
            return Err(ConfigError::Invalid(
                "chain.range_windows must be strictly decreasing".to_string(),
            ));
        }
        Ok(())
    }
}
