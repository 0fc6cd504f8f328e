//! Storage configuration types.

use std::time::Duration;

use serde::Deserialize;

/// Storage type discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Memory,
    Redis,
}

/// Storage configuration (discriminated union).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type discriminator.
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// Redis-specific configuration.
    pub redis: RedisConfig,
    /// Retention of idempotency guards. Must outlive the rewind window plus
    /// the reconciliation interval, or re-scans will record duplicates.
    pub guard_ttl_secs: u64,
    /// Approximate cap on the event stream length; unbounded when unset.
    pub stream_max_len: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Memory,
            redis: RedisConfig::default(),
            guard_ttl_secs: 7 * 24 * 3600,
            stream_max_len: None,
        }
    }
}

impl StorageConfig {
    pub fn guard_ttl(&self) -> Duration {
        Duration::from_secs(self.guard_ttl_secs)
    }
}

/// Redis-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: String,
    /// Prefix for all keys (default: "rollcall").
    pub key_prefix: Option<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            key_prefix: None,
        }
    }
}
