//! RollupStore trait definition.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use super::Result;

/// Field/value pairs of one roll-up record, ordered for stable output.
pub type RollupFields = BTreeMap<String, String>;

/// Dimension a roll-up record is keyed by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RollupKey {
    /// Hour bucket, `YYYY-MM-DDTHH` (UTC).
    Hourly(String),
    /// Day bucket, `YYYY-MM-DD` (UTC).
    Daily(String),
    Campaign(String),
    Global,
}

impl RollupKey {
    /// Parse the `kind` / `id` pair used by the read API.
    pub fn from_parts(kind: &str, id: Option<&str>) -> Option<Self> {
        match (kind, id) {
            ("hourly", Some(id)) => Some(RollupKey::Hourly(id.to_string())),
            ("daily", Some(id)) => Some(RollupKey::Daily(id.to_string())),
            ("campaign", Some(id)) => Some(RollupKey::Campaign(id.to_string())),
            ("global", None) => Some(RollupKey::Global),
            _ => None,
        }
    }
}

impl fmt::Display for RollupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollupKey::Hourly(hour) => write!(f, "rollup:hourly:{}", hour),
            RollupKey::Daily(day) => write!(f, "rollup:daily:{}", day),
            RollupKey::Campaign(id) => write!(f, "rollup:campaign:{}", id),
            RollupKey::Global => f.write_str("rollup:global"),
        }
    }
}

/// Interface for materialized roll-up records.
///
/// Records are replaced wholesale on every write: stale fields from a
/// previous run never survive.
#[async_trait]
pub trait RollupStore: Send + Sync {
    /// Replace the record at `key`. `ttl = None` keeps it indefinitely.
    async fn put(&self, key: &RollupKey, fields: &RollupFields, ttl: Option<Duration>)
        -> Result<()>;

    /// Fetch the record at `key`; `None` means no activity observed yet.
    async fn get(&self, key: &RollupKey) -> Result<Option<RollupFields>>;
}
