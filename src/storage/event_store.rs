//! EventStore trait definition.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;

use super::{Result, StorageError};
use crate::events::CanonicalEvent;

/// Position of an entry in the event stream.
///
/// Mirrors Redis stream ids (`<millis>-<seq>`): ordered first by the
/// append wall-clock millisecond, then by a per-millisecond sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId {
    pub millis: u64,
    pub seq: u64,
}

impl StreamId {
    pub const MIN: StreamId = StreamId { millis: 0, seq: 0 };

    /// First possible id at or after the given millisecond.
    pub fn from_millis(millis: u64) -> Self {
        Self { millis, seq: 0 }
    }

    /// Smallest id strictly greater than this one at the given clock reading.
    pub fn next_after(self, now_millis: u64) -> Self {
        if now_millis > self.millis {
            Self {
                millis: now_millis,
                seq: 0,
            }
        } else {
            Self {
                millis: self.millis,
                seq: self.seq + 1,
            }
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.millis, self.seq)
    }
}

impl FromStr for StreamId {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || StorageError::InvalidStreamId(s.to_string());
        let (millis, seq) = match s.split_once('-') {
            Some((m, q)) => (m, Some(q)),
            None => (s, None),
        };
        let millis = millis.parse().map_err(|_| invalid())?;
        let seq = match seq {
            Some(q) => q.parse().map_err(|_| invalid())?,
            None => 0,
        };
        Ok(Self { millis, seq })
    }
}

/// Raw stream entry. `data` is the canonical event JSON as stored; it is
/// decoded by readers so a single malformed entry can be skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    pub id: StreamId,
    pub data: String,
}

/// Interface for the canonical event stream.
///
/// Implementations:
/// - `MemoryEventStore`: in-process storage for tests and local runs
/// - `RedisEventStore`: Redis stream + `SET NX EX` guards
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Record an event unless its `event_id` has been seen.
    ///
    /// Marking the guard and appending to the stream happen atomically.
    /// Returns the generated stream id, or `None` for a duplicate. The guard
    /// expires after `guard_ttl`.
    async fn append_if_new(
        &self,
        event: &CanonicalEvent,
        guard_ttl: Duration,
    ) -> Result<Option<StreamId>>;

    /// Check whether the idempotency guard for `event_id` is present.
    async fn is_recorded(&self, event_id: &str) -> Result<bool>;

    /// Read up to `limit` entries with `start <= id <= end`, oldest first.
    ///
    /// `end = None` reads through the latest entry.
    async fn read_range(
        &self,
        start: StreamId,
        end: Option<StreamId>,
        limit: usize,
    ) -> Result<Vec<StreamEntry>>;

    /// Number of entries in the stream.
    async fn len(&self) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_id_parse_and_display() {
        let id: StreamId = "1704103200000-3".parse().unwrap();
        assert_eq!(id.millis, 1_704_103_200_000);
        assert_eq!(id.seq, 3);
        assert_eq!(id.to_string(), "1704103200000-3");

        let bare: StreamId = "42".parse().unwrap();
        assert_eq!(bare, StreamId::from_millis(42));

        assert!("abc-1".parse::<StreamId>().is_err());
        assert!("1-x".parse::<StreamId>().is_err());
    }

    #[test]
    fn test_stream_id_ordering() {
        let a = StreamId { millis: 10, seq: 5 };
        let b = StreamId { millis: 11, seq: 0 };
        assert!(a < b);
        assert!(StreamId::MIN < a);
    }

    #[test]
    fn test_next_after_is_strictly_increasing() {
        let id = StreamId { millis: 100, seq: 0 };
        assert_eq!(id.next_after(100), StreamId { millis: 100, seq: 1 });
        assert_eq!(id.next_after(99), StreamId { millis: 100, seq: 1 });
        assert_eq!(id.next_after(101), StreamId { millis: 101, seq: 0 });
    }
}
