//! Redis EventStore implementation.
//!
//! Canonical events live in a single Redis stream. The idempotency guard is
//! a plain key set with `NX EX`; a Lua script sets the guard and appends to
//! the stream in one atomic step so a crash can never leave a guard without
//! its entry.

use std::time::Duration;

use async_trait::async_trait;
use redis::streams::StreamRangeReply;
use redis::{aio::ConnectionManager, AsyncCommands, Script};
use tracing::debug;

use super::DEFAULT_KEY_PREFIX;
use crate::events::CanonicalEvent;
use crate::storage::{EventStore, Result, StreamEntry, StreamId};

/// KEYS[1] guard key, KEYS[2] stream key.
/// ARGV[1] guard ttl secs, ARGV[2] event json, ARGV[3] approx max stream length (0 = unbounded).
const APPEND_IF_NEW: &str = r#"
if redis.call('SET', KEYS[1], '1', 'NX', 'EX', ARGV[1]) then
  if tonumber(ARGV[3]) > 0 then
    return redis.call('XADD', KEYS[2], 'MAXLEN', '~', ARGV[3], '*', 'data', ARGV[2])
  end
  return redis.call('XADD', KEYS[2], '*', 'data', ARGV[2])
end
return false
"#;

/// Redis event store.
pub struct RedisEventStore {
    conn: ConnectionManager,
    key_prefix: String,
    stream_max_len: Option<u64>,
    append_script: Script,
}

impl RedisEventStore {
    /// Create a new Redis event store.
    ///
    /// # Arguments
    /// * `url` - Redis connection URL (e.g., redis://localhost:6379)
    /// * `key_prefix` - Prefix for all keys (default: "rollcall")
    pub async fn new(url: &str, key_prefix: Option<&str>) -> Result<Self> {
        let conn = super::connect_manager(url).await?;
        Ok(Self::from_connection(conn, key_prefix, None))
    }

    pub fn from_connection(
        conn: ConnectionManager,
        key_prefix: Option<&str>,
        stream_max_len: Option<u64>,
    ) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.unwrap_or(DEFAULT_KEY_PREFIX).to_string(),
            stream_max_len,
            append_script: Script::new(APPEND_IF_NEW),
        }
    }

    fn stream_key(&self) -> String {
        format!("{}:events", self.key_prefix)
    }

    fn guard_key(&self, event_id: &str) -> String {
        format!("{}:processed:{}", self.key_prefix, event_id)
    }
}

#[async_trait]
impl EventStore for RedisEventStore {
    async fn append_if_new(
        &self,
        event: &CanonicalEvent,
        guard_ttl: Duration,
    ) -> Result<Option<StreamId>> {
        let data = event.to_json()?;
        let mut conn = self.conn.clone();

        let id: Option<String> = self
            .append_script
            .key(self.guard_key(&event.event_id))
            .key(self.stream_key())
            .arg(guard_ttl.as_secs().max(1))
            .arg(data)
            .arg(self.stream_max_len.unwrap_or(0))
            .invoke_async(&mut conn)
            .await?;

        match id {
            Some(id) => {
                debug!(event_id = %event.event_id, stream_id = %id, "Appended event to Redis stream");
                Ok(Some(id.parse()?))
            }
            None => Ok(None),
        }
    }

    async fn is_recorded(&self, event_id: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(self.guard_key(event_id)).await?;
        Ok(exists)
    }

    async fn read_range(
        &self,
        start: StreamId,
        end: Option<StreamId>,
        limit: usize,
    ) -> Result<Vec<StreamEntry>> {
        let mut conn = self.conn.clone();
        let end = end.map_or_else(|| "+".to_string(), |id| id.to_string());

        let reply: StreamRangeReply = conn
            .xrange_count(self.stream_key(), start.to_string(), end, limit)
            .await?;

        reply
            .ids
            .into_iter()
            .map(|entry| {
                Ok(StreamEntry {
                    id: entry.id.parse()?,
                    data: entry.get::<String>("data").unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn len(&self) -> Result<u64> {
        let mut conn = self.conn.clone();
        let len: u64 = conn.xlen(self.stream_key()).await?;
        Ok(len)
    }
}
