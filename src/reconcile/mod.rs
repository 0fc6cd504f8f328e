//! Reconciliation driver.
//!
//! One pass: read the watermark, compute a confirmed block window (with a
//! small rewind for reorg safety), fetch and record each configured event
//! type over that window, then advance the watermark.
//!
//! Passes are idempotent. Re-scanning rewound blocks only produces
//! duplicates, which the processor skips.

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::chain::{topic0, LogFetcher, ProviderError};
use crate::config::{ReconcileConfig, WatermarkMode};
use crate::events::{EventSource, EventType};
use crate::processor::{EventProcessor, ProcessError};
use crate::storage::{PositionStore, StorageError};

/// Position name of the shared watermark.
pub const GLOBAL_POSITION: &str = "reconcile";

/// Position name of a per-event-type watermark.
pub fn event_type_position(event_type: EventType) -> String {
    format!("{GLOBAL_POSITION}:{event_type}")
}

/// Errors that abort a pass before any watermark moves.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Failed to read chain head: {0}")]
    Head(#[from] ProviderError),

    #[error("Watermark storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Block window for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub from: u64,
    /// Highest confirmed block.
    pub to: u64,
    /// End of this pass's slice, capped by `max_blocks_per_pass`.
    pub actual_to: u64,
}

impl Window {
    pub fn is_empty(&self) -> bool {
        self.from > self.to
    }

    pub fn has_more(&self) -> bool {
        !self.is_empty() && self.actual_to < self.to
    }

    pub fn next_block(&self) -> u64 {
        if self.is_empty() {
            self.from
        } else {
            self.actual_to + 1
        }
    }
}

/// Compute the block window for a pass.
///
/// Starts `rewind_blocks` before the block after the watermark, or at
/// `start_block` when there is no watermark yet. An explicit `from_override`
/// wins over both.
///
/// With a watermark, `max_blocks_per_pass` counts blocks past the watermark,
/// so every pass moves forward even when the rewind is wider than the cap.
pub fn compute_window(
    watermark: Option<u64>,
    from_override: Option<u64>,
    head: u64,
    config: &ReconcileConfig,
) -> Window {
    let from = from_override.unwrap_or_else(|| match watermark {
        Some(last) => (last + 1).saturating_sub(config.rewind_blocks),
        None => config.start_block,
    });
    let to = head.saturating_sub(config.confirmations);
    let cap = config.max_blocks_per_pass.max(1);
    let limit = match (watermark, from_override) {
        (Some(last), None) => from
            .saturating_add(cap - 1)
            .max(last.saturating_add(cap)),
        _ => from.saturating_add(cap - 1),
    };
    let actual_to = if from > to { to } else { to.min(limit) };

    Window {
        from,
        to,
        actual_to,
    }
}

/// Estimate a block's timestamp from its distance to the head block.
pub fn estimate_block_timestamp(
    block: u64,
    head: u64,
    now: DateTime<Utc>,
    block_time: Duration,
) -> DateTime<Utc> {
    let behind = head.saturating_sub(block);
    let secs = i64::try_from(behind.saturating_mul(block_time.as_secs())).unwrap_or(i64::MAX);
    chrono::TimeDelta::try_seconds(secs)
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub from_block: u64,
    pub to_block: u64,
    pub events_processed: u64,
    pub duplicates_skipped: u64,
    pub has_more: bool,
    pub next_block: u64,
    pub decode_errors: u64,
    pub store_errors: u64,
    pub failed_event_types: Vec<EventType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ReconcileReport {
    fn up_to_date(window: &Window) -> Self {
        Self {
            from_block: window.from,
            to_block: window.to,
            next_block: window.next_block(),
            message: Some("no new blocks".to_string()),
            ..Default::default()
        }
    }
}

/// Per-event-type counts within a pass.
#[derive(Debug, Default)]
struct TypeTally {
    processed: u64,
    duplicates: u64,
    decode_errors: u64,
    store_errors: u64,
    fetch_failed: bool,
}

impl TypeTally {
    /// Whether every log in the window was durably handled.
    fn complete(&self) -> bool {
        !self.fetch_failed && self.store_errors == 0
    }

    fn add_to(&self, event_type: EventType, report: &mut ReconcileReport) {
        report.events_processed += self.processed;
        report.duplicates_skipped += self.duplicates;
        report.decode_errors += self.decode_errors;
        report.store_errors += self.store_errors;
        if self.fetch_failed {
            report.failed_event_types.push(event_type);
        }

        #[cfg(feature = "otel")]
        {
            use crate::utils::metrics::{self, RECONCILE_EVENTS_TOTAL};
            for (outcome, count) in [
                ("recorded", self.processed),
                ("duplicate", self.duplicates),
                ("decode_error", self.decode_errors),
                ("store_error", self.store_errors),
            ] {
                RECONCILE_EVENTS_TOTAL.add(
                    count,
                    &[
                        metrics::event_type_attr(event_type.as_str()),
                        metrics::outcome_attr(outcome),
                    ],
                );
            }
        }
    }
}

/// Drives reconciliation passes against one contract.
pub struct Reconciler {
    fetcher: LogFetcher,
    processor: EventProcessor,
    positions: Arc<dyn PositionStore>,
    contract: Address,
    block_time: Duration,
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(
        fetcher: LogFetcher,
        processor: EventProcessor,
        positions: Arc<dyn PositionStore>,
        contract: Address,
        block_time: Duration,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            fetcher,
            processor,
            positions,
            contract,
            block_time,
            config,
        }
    }

    /// Run one pass. `from_override` replaces the watermark-derived start.
    #[tracing::instrument(
        name = "reconcile.pass",
        skip_all,
        fields(trace_id = %uuid::Uuid::new_v4(), from_override = ?from_override)
    )]
    pub async fn run(&self, from_override: Option<u64>) -> Result<ReconcileReport, ReconcileError> {
        let start = Instant::now();
        let head = self.fetcher.provider().block_number().await?;
        let now = Utc::now();

        let report = match self.config.watermark_mode {
            WatermarkMode::Global => self.run_global(head, now, from_override).await?,
            WatermarkMode::PerEventType => self.run_per_type(head, now, from_override).await?,
        };

        info!(
            head,
            from = report.from_block,
            to = report.to_block,
            processed = report.events_processed,
            duplicates = report.duplicates_skipped,
            failed = report.failed_event_types.len(),
            has_more = report.has_more,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Reconciliation pass complete"
        );

        #[cfg(feature = "otel")]
        {
            use crate::utils::metrics::{self, RECONCILE_DURATION};
            let outcome = if report.failed_event_types.is_empty() { "success" } else { "partial" };
            RECONCILE_DURATION.record(start.elapsed().as_secs_f64(), &[metrics::outcome_attr(outcome)]);
        }

        Ok(report)
    }

    async fn run_global(
        &self,
        head: u64,
        now: DateTime<Utc>,
        from_override: Option<u64>,
    ) -> Result<ReconcileReport, ReconcileError> {
        let watermark = self.positions.get(GLOBAL_POSITION).await?;
        let window = compute_window(watermark, from_override, head, &self.config);
        if window.is_empty() {
            info!(from = window.from, to = window.to, "No new blocks");
            return Ok(ReconcileReport::up_to_date(&window));
        }

        let mut report = ReconcileReport {
            from_block: window.from,
            to_block: window.actual_to,
            has_more: window.has_more(),
            next_block: window.next_block(),
            ..Default::default()
        };

        for &event_type in &self.config.event_types {
            let tally = self
                .reconcile_type(event_type, window.from, window.actual_to, head, now)
                .await;
            tally.add_to(event_type, &mut report);
        }

        // Fetch failures leave a gap behind the watermark (reported in
        // failedEventTypes); store failures hold it back.
        if report.store_errors == 0 {
            self.advance(GLOBAL_POSITION, watermark, window.actual_to).await?;
        } else {
            warn!(
                store_errors = report.store_errors,
                watermark = ?watermark,
                "Store errors during pass, watermark not advanced"
            );
            report.has_more = true;
            report.next_block = window.from;
        }

        Ok(report)
    }

    async fn run_per_type(
        &self,
        head: u64,
        now: DateTime<Utc>,
        from_override: Option<u64>,
    ) -> Result<ReconcileReport, ReconcileError> {
        let mut report = ReconcileReport::default();
        let mut covered: Option<(u64, u64)> = None;
        let mut next_block: Option<u64> = None;
        let mut last_empty: Option<Window> = None;

        for &event_type in &self.config.event_types {
            let name = event_type_position(event_type);
            let own = self.positions.get(&name).await?;
            let watermark = self.seed_watermark(own).await?;
            let window = compute_window(watermark, from_override, head, &self.config);
            if window.is_empty() {
                last_empty = Some(window);
                continue;
            }

            let tally = self
                .reconcile_type(event_type, window.from, window.actual_to, head, now)
                .await;
            tally.add_to(event_type, &mut report);

            let next = if tally.complete() {
                let reached = watermark.map_or(window.actual_to, |w| w.max(window.actual_to));
                self.advance(&name, own, reached).await?;
                report.has_more |= window.has_more();
                window.next_block()
            } else {
                warn!(%event_type, watermark = ?watermark, "Event type incomplete, watermark held");
                window.from
            };

            covered = Some(match covered {
                Some((lo, hi)) => (lo.min(window.from), hi.max(window.actual_to)),
                None => (window.from, window.actual_to),
            });
            next_block = Some(next_block.map_or(next, |n| n.min(next)));
        }

        match (covered, last_empty) {
            (Some((from, to)), _) => {
                report.from_block = from;
                report.to_block = to;
                report.next_block = next_block.unwrap_or(to + 1);
                Ok(report)
            }
            (None, Some(window)) => {
                info!(from = window.from, to = window.to, "No new blocks");
                Ok(ReconcileReport::up_to_date(&window))
            }
            (None, None) => Ok(report),
        }
    }

    /// A type without its own position starts from the shared one, so
    /// switching from global to per-type mode does not rescan history.
    async fn seed_watermark(&self, own: Option<u64>) -> Result<Option<u64>, StorageError> {
        match own {
            Some(block) => Ok(Some(block)),
            None => self.positions.get(GLOBAL_POSITION).await,
        }
    }

    /// Persist `actual_to`, never moving the watermark backwards.
    async fn advance(
        &self,
        name: &str,
        previous: Option<u64>,
        actual_to: u64,
    ) -> Result<(), StorageError> {
        let next = previous.map_or(actual_to, |prev| prev.max(actual_to));
        if previous == Some(next) {
            return Ok(());
        }
        self.positions.put(name, next).await?;

        #[cfg(feature = "otel")]
        crate::utils::metrics::RECONCILE_WATERMARK.record(next, &[]);

        info!(position = name, block = next, "Watermark advanced");
        Ok(())
    }

    async fn reconcile_type(
        &self,
        event_type: EventType,
        from: u64,
        to: u64,
        head: u64,
        now: DateTime<Utc>,
    ) -> TypeTally {
        let mut tally = TypeTally::default();

        let Some(topic) = topic0(event_type) else {
            warn!(%event_type, "Event type has no on-chain log, skipping");
            tally.fetch_failed = true;
            return tally;
        };

        let logs = match self.fetcher.fetch(self.contract, &[topic], from, to).await {
            Ok(logs) => logs,
            Err(err) => {
                warn!(%event_type, from, to, error = %err, "Fetch failed, abandoning event type for this pass");
                tally.fetch_failed = true;
                return tally;
            }
        };

        for log in &logs {
            let timestamp = log
                .block_timestamp
                .and_then(|secs| i64::try_from(secs).ok())
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .unwrap_or_else(|| {
                    estimate_block_timestamp(log.block_number, head, now, self.block_time)
                });

            match self
                .processor
                .process_log(event_type, log, timestamp, EventSource::Reconciliation)
                .await
            {
                Ok(true) => tally.processed += 1,
                Ok(false) => tally.duplicates += 1,
                Err(ProcessError::Storage(err)) => {
                    warn!(
                        %event_type,
                        tx = %log.transaction_hash,
                        log_index = log.log_index,
                        error = %err,
                        "Failed to record event"
                    );
                    tally.store_errors += 1;
                }
                Err(err) => {
                    warn!(
                        %event_type,
                        tx = %log.transaction_hash,
                        log_index = log.log_index,
                        error = %err,
                        "Skipping undecodable log"
                    );
                    tally.decode_errors += 1;
                }
            }
        }

        tally
    }
}
