//! PositionStore trait definition.

use async_trait::async_trait;

use super::Result;

/// Interface for watermark tracking.
///
/// Holds the last block number fully reconciled, keyed by name:
/// `"reconcile"` for the shared watermark, `"reconcile:<EventType>"` when
/// each event type keeps its own.
///
/// # Implementations
///
/// - `MemoryPositionStore`: in-process storage
/// - `RedisPositionStore`: one scalar key per name
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Get the last reconciled block for `name`.
    ///
    /// Returns `None` if no position has been recorded.
    async fn get(&self, name: &str) -> Result<Option<u64>>;

    /// Store the last reconciled block for `name`.
    ///
    /// Upserts unconditionally; callers are responsible for never moving a
    /// watermark backwards.
    async fn put(&self, name: &str, block: u64) -> Result<()>;
}
