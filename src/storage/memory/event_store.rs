//! In-memory EventStore implementation.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::events::CanonicalEvent;
use crate::storage::{EventStore, Result, StorageError, StreamEntry, StreamId};

#[derive(Default)]
struct Inner {
    entries: Vec<StreamEntry>,
    guards: HashMap<String, Instant>,
    last_id: Option<StreamId>,
}

impl Inner {
    fn next_id(&mut self) -> StreamId {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let id = match self.last_id {
            Some(last) => last.next_after(now),
            None => StreamId::from_millis(now),
        };
        self.last_id = Some(id);
        id
    }

    /// Drop guards whose TTL has elapsed.
    fn prune_guards(&mut self, now: Instant) {
        self.guards.retain(|_, expires| *expires > now);
    }

    fn guard_live(&self, event_id: &str) -> bool {
        self.guards
            .get(event_id)
            .is_some_and(|expires| *expires > Instant::now())
    }
}

/// Event stream held in memory.
///
/// Guard check and append happen under one write lock, so concurrent
/// callers racing on the same `event_id` record it exactly once.
#[derive(Default)]
pub struct MemoryEventStore {
    inner: RwLock<Inner>,
    fail_on_append: RwLock<bool>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent append fail with a storage error.
    pub async fn set_fail_on_append(&self, fail: bool) {
        *self.fail_on_append.write().await = fail;
    }

    /// Number of idempotency guards currently held, expired or not.
    pub async fn guard_count(&self) -> usize {
        self.inner.read().await.guards.len()
    }

    /// Append raw entry data without a guard, bypassing serialization.
    ///
    /// Lets tests plant malformed entries in the stream.
    pub async fn append_raw(&self, data: impl Into<String>) -> StreamId {
        let mut inner = self.inner.write().await;
        let id = inner.next_id();
        inner.entries.push(StreamEntry {
            id,
            data: data.into(),
        });
        id
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append_if_new(
        &self,
        event: &CanonicalEvent,
        guard_ttl: Duration,
    ) -> Result<Option<StreamId>> {
        if *self.fail_on_append.read().await {
            return Err(StorageError::Unavailable(
                "memory store configured to fail appends".to_string(),
            ));
        }

        let data = event.to_json()?;
        let mut inner = self.inner.write().await;
        let now = Instant::now();
        inner.prune_guards(now);
        if inner.guard_live(&event.event_id) {
            return Ok(None);
        }

        inner.guards.insert(event.event_id.clone(), now + guard_ttl);
        let id = inner.next_id();
        inner.entries.push(StreamEntry { id, data });
        Ok(Some(id))
    }

    async fn is_recorded(&self, event_id: &str) -> Result<bool> {
        Ok(self.inner.read().await.guard_live(event_id))
    }

    async fn read_range(
        &self,
        start: StreamId,
        end: Option<StreamId>,
        limit: usize,
    ) -> Result<Vec<StreamEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.id >= start && end.map_or(true, |end| e.id <= end))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn len(&self) -> Result<u64> {
        Ok(self.inner.read().await.entries.len() as u64)
    }
}
