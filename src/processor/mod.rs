//! Canonical event processor.
//!
//! Turns a decoded chain log into a [`CanonicalEvent`] and records it at
//! most once. The idempotency guard and the stream append happen in one
//! store operation, so concurrent passes (cron overlap, webhook plus
//! reconciliation) cannot both record the same `event_id`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::chain::{decode_log, DecodeError, RawLog};
use crate::events::{CanonicalEvent, EventPayload, EventSource, EventType};
use crate::storage::{EventStore, StorageError, StreamId};

/// Errors from [`EventProcessor::process`].
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Payload is {found}, expected {expected}")]
    PayloadMismatch {
        expected: EventType,
        found: EventType,
    },
}

/// Result of recording one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Newly appended under this stream id.
    Recorded(StreamId),
    /// Guard already present; nothing written.
    Duplicate,
}

impl ProcessOutcome {
    pub fn is_new(&self) -> bool {
        matches!(self, ProcessOutcome::Recorded(_))
    }
}

/// Records canonical events exactly once.
#[derive(Clone)]
pub struct EventProcessor {
    store: Arc<dyn EventStore>,
    guard_ttl: Duration,
}

impl EventProcessor {
    /// `guard_ttl` must outlive the rewind window plus the pass interval.
    pub fn new(store: Arc<dyn EventStore>, guard_ttl: Duration) -> Self {
        Self { store, guard_ttl }
    }

    /// Record an already-built event.
    pub async fn record(&self, event: &CanonicalEvent) -> Result<ProcessOutcome, StorageError> {
        match self.store.append_if_new(event, self.guard_ttl).await? {
            Some(id) => {
                debug!(event_id = %event.event_id, stream_id = %id, "Recorded event");
                Ok(ProcessOutcome::Recorded(id))
            }
            None => {
                debug!(event_id = %event.event_id, "Duplicate event skipped");
                Ok(ProcessOutcome::Duplicate)
            }
        }
    }

    /// Build and record an event. Returns `true` when newly recorded,
    /// `false` for a duplicate.
    #[allow(clippy::too_many_arguments)]
    pub async fn process(
        &self,
        event_type: EventType,
        tx_hash: &str,
        log_index: u64,
        block_number: u64,
        timestamp: DateTime<Utc>,
        payload: EventPayload,
        source: EventSource,
    ) -> Result<bool, ProcessError> {
        if payload.event_type() != event_type {
            return Err(ProcessError::PayloadMismatch {
                expected: event_type,
                found: payload.event_type(),
            });
        }

        let event = CanonicalEvent::new(tx_hash, log_index, block_number, timestamp, payload, source);
        Ok(self.record(&event).await?.is_new())
    }

    /// Decode a raw log as `event_type` and record it.
    pub async fn process_log(
        &self,
        event_type: EventType,
        log: &RawLog,
        timestamp: DateTime<Utc>,
        source: EventSource,
    ) -> Result<bool, ProcessError> {
        let payload = decode_log(event_type, log)?;
        self.process(
            event_type,
            &log.tx_hash_hex(),
            log.log_index,
            log.block_number,
            timestamp,
            payload,
            source,
        )
        .await
    }
}
