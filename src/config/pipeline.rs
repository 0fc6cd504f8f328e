//! Reconciliation and materialization pass configuration.

use std::time::Duration;

use serde::Deserialize;

use super::ConfigError;
use crate::events::EventType;

/// How the reconciliation watermark reacts to an event type that fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkMode {
    /// One watermark for all event types. It advances over the scanned
    /// window even when an event type's fetch failed, so a type that keeps
    /// failing can miss that window for good.
    #[default]
    Global,
    /// One watermark per event type. A failing type keeps its watermark
    /// and is re-scanned next pass; the others move on.
    PerEventType,
}

/// Reconciliation pass configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Block to start from when no watermark has been stored yet.
    pub start_block: u64,
    /// Already-processed blocks re-scanned each pass to absorb reorgs.
    pub rewind_blocks: u64,
    /// Blocks behind head treated as not yet final.
    pub confirmations: u64,
    /// Upper bound on blocks scanned per pass; the rest waits for the next tick.
    pub max_blocks_per_pass: u64,
    /// Event types fetched from chain, in processing order.
    pub event_types: Vec<EventType>,
    pub watermark_mode: WatermarkMode,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            start_block: 0,
            rewind_blocks: 20,
            confirmations: 3,
            max_blocks_per_pass: 2000,
            event_types: vec![
                EventType::GiftCreated,
                EventType::GiftClaimed,
                EventType::GiftExpired,
                EventType::GiftReturned,
            ],
            watermark_mode: WatermarkMode::Global,
        }
    }
}

impl ReconcileConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_blocks_per_pass == 0 {
            return Err(ConfigError::Invalid(
                "reconcile.max_blocks_per_pass must be greater than zero".to_string(),
            ));
        }
        if self.event_types.is_empty() {
            return Err(ConfigError::Invalid(
                "reconcile.event_types must list at least one event type".to_string(),
            ));
        }
        if self.event_types.contains(&EventType::GiftViewed) {
            return Err(ConfigError::Invalid(
                "GiftViewed has no on-chain log and cannot be reconciled".to_string(),
            ));
        }
        Ok(())
    }
}

/// Materialization pass configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MaterializeConfig {
    /// Trailing window of the event stream re-read each run.
    pub window_secs: u64,
    /// Maximum stream entries read per run.
    pub batch_size: usize,
    /// Token decimals used to convert summed base units for display.
    pub value_decimals: u32,
    pub hourly_ttl_secs: u64,
    pub daily_ttl_secs: u64,
}

impl Default for MaterializeConfig {
    fn default() -> Self {
        Self {
            window_secs: 3600,
            batch_size: 1000,
            value_decimals: 18,
            hourly_ttl_secs: 24 * 3600,
            daily_ttl_secs: 30 * 24 * 3600,
        }
    }
}

impl MaterializeConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn hourly_ttl(&self) -> Duration {
        Duration::from_secs(self.hourly_ttl_secs)
    }

    pub fn daily_ttl(&self) -> Duration {
        Duration::from_secs(self.daily_ttl_secs)
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "materialize.batch_size must be greater than zero".to_string(),
            ));
        }
        if self.value_decimals > 36 {
            return Err(ConfigError::Invalid(
                "materialize.value_decimals must be at most 36".to_string(),
            ));
        }
        if self.hourly_ttl_secs == 0 || self.daily_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "materialize roll-up TTLs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
