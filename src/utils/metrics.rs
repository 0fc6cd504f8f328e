//! OTel-native metrics instruments.
//!
//! Centralized metric definitions using OpenTelemetry meters.
//! All instruments are lazily initialized and feature-gated behind `otel`.
//!
//! Naming follows OTel semantic conventions (dot-separated).
//! The OTel Collector / Prometheus exporter converts dots to underscores.

use std::sync::LazyLock;

use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use opentelemetry::{global, KeyValue};

static METER: LazyLock<Meter> = LazyLock::new(|| global::meter("rollcall"));

// ============================================================================
// Chain Fetcher
// ============================================================================

/// Total eth_getLogs calls, by outcome.
pub static FETCH_CALLS_TOTAL: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("rollcall.fetch.calls.total")
        .with_description("Total log fetch calls issued to the chain provider")
        .build()
});

/// Times the fetcher narrowed its block window after a range-limit error.
pub static FETCH_WINDOW_SHRINK_TOTAL: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("rollcall.fetch.window_shrink.total")
        .with_description("Block window reductions after range-limit errors")
        .build()
});

// ============================================================================
// Reconciliation
// ============================================================================

/// Duration of a reconciliation pass.
pub static RECONCILE_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("rollcall.reconcile.duration")
        .with_description("Reconciliation pass duration")
        .with_unit("s")
        .build()
});

/// Events recorded or skipped by reconciliation, by outcome.
pub static RECONCILE_EVENTS_TOTAL: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("rollcall.reconcile.events.total")
        .with_description("Events seen by reconciliation passes")
        .build()
});

/// Last persisted watermark block.
pub static RECONCILE_WATERMARK: LazyLock<Gauge<u64>> = LazyLock::new(|| {
    METER
        .u64_gauge("rollcall.reconcile.watermark")
        .with_description("Last fully reconciled block")
        .build()
});

// ============================================================================
// Materializer
// ============================================================================

/// Duration of a materialization pass.
pub static MATERIALIZE_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("rollcall.materialize.duration")
        .with_description("Materialization pass duration")
        .with_unit("s")
        .build()
});

/// Roll-up records written, by kind.
pub static MATERIALIZE_ROLLUPS_TOTAL: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("rollcall.materialize.rollups.total")
        .with_description("Roll-up records written")
        .build()
});

// ============================================================================
// Attribute helpers
// ============================================================================

/// Event type attribute (GiftCreated, GiftClaimed, ...).
pub fn event_type_attr(event_type: &str) -> KeyValue {
    KeyValue::new("event_type", event_type.to_string())
}

/// Outcome attribute (success, error, duplicate, ...).
pub fn outcome_attr(outcome: &str) -> KeyValue {
    KeyValue::new("outcome", outcome.to_string())
}

/// Roll-up kind attribute (hourly, daily, campaign, global).
pub fn kind_attr(kind: &str) -> KeyValue {
    KeyValue::new("kind", kind.to_string())
}
