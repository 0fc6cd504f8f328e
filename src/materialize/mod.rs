//! Roll-up materializer.
//!
//! Re-reads the trailing window of the event stream and rewrites the hourly,
//! daily, campaign and global roll-ups from scratch. Records are replaced,
//! never incremented, so reruns over the same events are no-ops.

mod rollup;

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

pub use rollup::{Buckets, Rollup, DAY_FORMAT, HOUR_FORMAT};

use crate::config::MaterializeConfig;
use crate::events::CanonicalEvent;
use crate::storage::{EventStore, RollupKey, RollupStore, StorageError, StreamId};

/// Errors from a materialization pass.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Number of records written per dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RollupCounts {
    pub hourly: usize,
    pub daily: usize,
    pub campaigns: usize,
}

/// Summary of one materialization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializeReport {
    pub events_processed: u64,
    pub skipped: u64,
    pub rollups: RollupCounts,
    pub processing_time_ms: u64,
}

/// Rebuilds roll-ups from the event stream.
pub struct Materializer {
    events: Arc<dyn EventStore>,
    rollups: Arc<dyn RollupStore>,
    config: MaterializeConfig,
}

impl Materializer {
    pub fn new(
        events: Arc<dyn EventStore>,
        rollups: Arc<dyn RollupStore>,
        config: MaterializeConfig,
    ) -> Self {
        Self {
            events,
            rollups,
            config,
        }
    }

    pub async fn run(&self) -> Result<MaterializeReport, MaterializeError> {
        self.run_at(Utc::now()).await
    }

    /// Run with an explicit "now", which fixes the start of the window.
    #[tracing::instrument(name = "materialize.pass", skip_all, fields(trace_id = %uuid::Uuid::new_v4()))]
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<MaterializeReport, MaterializeError> {
        let start = Instant::now();
        let since = chrono::TimeDelta::from_std(self.config.window())
            .ok()
            .and_then(|window| now.checked_sub_signed(window))
            .map_or(0, |t| t.timestamp_millis().max(0) as u64);

        let entries = self
            .events
            .read_range(StreamId::from_millis(since), None, self.config.batch_size)
            .await?;
        if entries.len() >= self.config.batch_size {
            warn!(
                batch_size = self.config.batch_size,
                "Batch limit reached, newer events in the window were not read"
            );
        }

        let mut skipped = 0u64;
        let mut events = Vec::with_capacity(entries.len());
        for entry in &entries {
            match CanonicalEvent::from_json(&entry.data) {
                Ok(event) => events.push(event),
                Err(e) => {
                    warn!(stream_id = %entry.id, error = %e, "Skipping malformed stream entry");
                    skipped += 1;
                }
            }
        }

        let buckets: Buckets = events.iter().collect();
        let mut report = MaterializeReport {
            events_processed: events.len() as u64,
            skipped,
            ..Default::default()
        };

        if buckets.is_empty() {
            info!(skipped, "No events in window, nothing to materialize");
            report.processing_time_ms = start.elapsed().as_millis() as u64;
            return Ok(report);
        }

        report.rollups = self.write(&buckets).await?;
        report.processing_time_ms = start.elapsed().as_millis() as u64;

        info!(
            events = report.events_processed,
            skipped = report.skipped,
            hourly = report.rollups.hourly,
            daily = report.rollups.daily,
            campaigns = report.rollups.campaigns,
            elapsed_ms = report.processing_time_ms,
            "Materialization pass complete"
        );

        #[cfg(feature = "otel")]
        {
            use crate::utils::metrics::{self, MATERIALIZE_DURATION, MATERIALIZE_ROLLUPS_TOTAL};
            MATERIALIZE_DURATION.record(start.elapsed().as_secs_f64(), &[]);
            MATERIALIZE_ROLLUPS_TOTAL.add(report.rollups.hourly as u64, &[metrics::kind_attr("hourly")]);
            MATERIALIZE_ROLLUPS_TOTAL.add(report.rollups.daily as u64, &[metrics::kind_attr("daily")]);
            MATERIALIZE_ROLLUPS_TOTAL.add(report.rollups.campaigns as u64, &[metrics::kind_attr("campaign")]);
            MATERIALIZE_ROLLUPS_TOTAL.add(1, &[metrics::kind_attr("global")]);
        }

        Ok(report)
    }

    async fn write(&self, buckets: &Buckets) -> Result<RollupCounts, StorageError> {
        let decimals = self.config.value_decimals;
        let hourly_ttl = Some(self.config.hourly_ttl());
        let daily_ttl = Some(self.config.daily_ttl());

        for (hour, rollup) in &buckets.hourly {
            let key = RollupKey::Hourly(hour.clone());
            self.rollups.put(&key, &rollup.to_fields(decimals), hourly_ttl).await?;
            debug!(%key, events = rollup.events, "Wrote roll-up");
        }
        for (day, rollup) in &buckets.daily {
            let key = RollupKey::Daily(day.clone());
            self.rollups.put(&key, &rollup.to_fields(decimals), daily_ttl).await?;
            debug!(%key, events = rollup.events, "Wrote roll-up");
        }
        for (campaign, rollup) in &buckets.campaigns {
            let key = RollupKey::Campaign(campaign.clone());
            self.rollups.put(&key, &rollup.to_fields(decimals), None).await?;
            debug!(%key, events = rollup.events, "Wrote roll-up");
        }
        self.rollups
            .put(&RollupKey::Global, &buckets.global.to_fields(decimals), None)
            .await?;

        Ok(RollupCounts {
            hourly: buckets.hourly.len(),
            daily: buckets.daily.len(),
            campaigns: buckets.campaigns.len(),
        })
    }
}

#[cfg(test)]
mod tests;
