use std::time::Duration;

use alloy::primitives::U256;
use chrono::TimeZone;

use super::*;
use crate::events::{
    EventPayload, EventSource, GiftClaimed, GiftCreated, GiftViewed,
};
use crate::storage::{MemoryEventStore, MemoryRollupStore, RollupFields};

const CREATOR: &str = "0x1111111111111111111111111111111111111111";
const CLAIMER: &str = "0x2222222222222222222222222222222222222222";
const FIVE_TOKENS: u128 = 5_000_000_000_000_000_000;

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
}

fn created(tx: &str, ts: DateTime<Utc>, campaign: Option<&str>, amount: u128) -> CanonicalEvent {
    CanonicalEvent::new(
        tx,
        0,
        100,
        ts,
        EventPayload::GiftCreated(GiftCreated {
            gift_id: U256::from(1u64),
            creator: CREATOR.to_string(),
            campaign_id: campaign.map(str::to_string),
            amount: U256::from(amount),
            expires_at: 0,
        }),
        EventSource::Reconciliation,
    )
}

fn claimed(tx: &str, ts: DateTime<Utc>, claimer: &str, campaign: Option<&str>) -> CanonicalEvent {
    CanonicalEvent::new(
        tx,
        0,
        101,
        ts,
        EventPayload::GiftClaimed(GiftClaimed {
            gift_id: U256::from(1u64),
            claimer: claimer.to_string(),
            campaign_id: campaign.map(str::to_string),
        }),
        EventSource::Reconciliation,
    )
}

struct Harness {
    events: Arc<MemoryEventStore>,
    rollups: Arc<MemoryRollupStore>,
    materializer: Materializer,
}

fn harness() -> Harness {
    let events = Arc::new(MemoryEventStore::new());
    let rollups = Arc::new(MemoryRollupStore::new());
    let materializer = Materializer::new(
        events.clone(),
        rollups.clone(),
        MaterializeConfig::default(),
    );
    Harness {
        events,
        rollups,
        materializer,
    }
}

async fn append(h: &Harness, events: &[CanonicalEvent]) {
    for event in events {
        h.events
            .append_if_new(event, Duration::from_secs(3600))
            .await
            .unwrap();
    }
}

async fn snapshot(store: &MemoryRollupStore) -> Vec<(RollupKey, RollupFields)> {
    let mut out = Vec::new();
    for key in store.keys().await {
        let fields = store.get(&key).await.unwrap().unwrap();
        out.push((key, fields));
    }
    out.sort();
    out
}

#[tokio::test]
async fn test_hourly_example_scenario() {
    let h = harness();
    append(
        &h,
        &[
            created("0x01", at(10, 5), None, FIVE_TOKENS),
            claimed("0x02", at(10, 40), CLAIMER, None),
        ],
    )
    .await;

    let report = h.materializer.run().await.unwrap();
    assert_eq!(report.events_processed, 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.rollups.hourly, 1);
    assert_eq!(report.rollups.daily, 1);
    assert_eq!(report.rollups.campaigns, 0);

    let hourly = h
        .rollups
        .get(&RollupKey::Hourly("2024-01-01T10".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hourly["created"], "1");
    assert_eq!(hourly["claimed"], "1");
    assert_eq!(hourly["viewed"], "0");
    assert_eq!(hourly["totalValue"], "5.00");
    assert_eq!(hourly["uniqueUsers"], "1");
    assert_eq!(hourly["conversionRate"], "100.00");
    assert_eq!(hourly["eventsProcessed"], "2");
    assert!(!hourly.contains_key("updatedAt"));
}

#[tokio::test]
async fn test_buckets_split_by_hour_day_and_campaign() {
    let h = harness();
    append(
        &h,
        &[
            created("0x01", at(10, 0), Some("spring"), FIVE_TOKENS),
            created("0x02", at(11, 0), Some("spring"), FIVE_TOKENS),
            created("0x03", at(11, 30), Some("summer"), FIVE_TOKENS),
            claimed("0x04", at(11, 45), CLAIMER, Some("spring")),
        ],
    )
    .await;

    let report = h.materializer.run().await.unwrap();
    assert_eq!(report.rollups.hourly, 2);
    assert_eq!(report.rollups.daily, 1);
    assert_eq!(report.rollups.campaigns, 2);

    let spring = h
        .rollups
        .get(&RollupKey::Campaign("spring".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(spring["created"], "2");
    assert_eq!(spring["claimed"], "1");
    assert_eq!(spring["totalValue"], "10.00");
    assert_eq!(spring["conversionRate"], "50.00");

    let global = h.rollups.get(&RollupKey::Global).await.unwrap().unwrap();
    assert_eq!(global["created"], "3");
    assert_eq!(global["totalValue"], "15.00");
    assert_eq!(global["conversionRate"], "33.33");
}

#[tokio::test]
async fn test_ttls_per_dimension() {
    let h = harness();
    append(&h, &[created("0x01", at(10, 0), Some("spring"), 1)]).await;

    h.materializer.run().await.unwrap();

    assert_eq!(
        h.rollups
            .ttl_of(&RollupKey::Hourly("2024-01-01T10".to_string()))
            .await,
        Some(Some(Duration::from_secs(86_400)))
    );
    assert_eq!(
        h.rollups
            .ttl_of(&RollupKey::Daily("2024-01-01".to_string()))
            .await,
        Some(Some(Duration::from_secs(2_592_000)))
    );
    assert_eq!(
        h.rollups
            .ttl_of(&RollupKey::Campaign("spring".to_string()))
            .await,
        Some(None)
    );
    assert_eq!(h.rollups.ttl_of(&RollupKey::Global).await, Some(None));
}

#[tokio::test]
async fn test_rerun_is_byte_identical() {
    let h = harness();
    append(
        &h,
        &[
            created("0x01", at(10, 0), Some("spring"), FIVE_TOKENS),
            claimed("0x02", at(10, 30), CLAIMER, Some("spring")),
        ],
    )
    .await;

    let now = Utc::now();
    h.materializer.run_at(now).await.unwrap();
    let first = snapshot(&h.rollups).await;
    h.materializer.run_at(now).await.unwrap();
    let second = snapshot(&h.rollups).await;

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_empty_window_writes_nothing() {
    let h = harness();

    let report = h.materializer.run().await.unwrap();

    assert_eq!(report.events_processed, 0);
    assert_eq!(report.rollups, RollupCounts::default());
    assert!(h.rollups.keys().await.is_empty());
}

#[tokio::test]
async fn test_events_outside_window_are_ignored() {
    let h = harness();
    append(&h, &[created("0x01", at(10, 0), None, 1)]).await;

    // Two hours on, the entry's stream id is older than the window
    let later = Utc::now() + chrono::TimeDelta::hours(2);
    let report = h.materializer.run_at(later).await.unwrap();

    assert_eq!(report.events_processed, 0);
    assert!(h.rollups.keys().await.is_empty());
}

#[tokio::test]
async fn test_malformed_entries_are_skipped() {
    let h = harness();
    h.events.append_raw("{not json").await;
    append(&h, &[created("0x01", at(10, 0), None, FIVE_TOKENS)]).await;
    h.events.append_raw(r#"{"eventId":"x"}"#).await;

    let report = h.materializer.run().await.unwrap();

    assert_eq!(report.events_processed, 1);
    assert_eq!(report.skipped, 2);
    let global = h.rollups.get(&RollupKey::Global).await.unwrap().unwrap();
    assert_eq!(global["created"], "1");
}

#[tokio::test]
async fn test_batch_size_caps_read() {
    let events = Arc::new(MemoryEventStore::new());
    let rollups = Arc::new(MemoryRollupStore::new());
    let materializer = Materializer::new(
        events.clone(),
        rollups.clone(),
        MaterializeConfig {
            batch_size: 2,
            ..Default::default()
        },
    );
    for i in 0..5 {
        events
            .append_if_new(
                &created(&format!("0x{i:02}"), at(10, i), None, 1),
                Duration::from_secs(60),
            )
            .await
            .unwrap();
    }

    let report = materializer.run().await.unwrap();
    assert_eq!(report.events_processed, 2);
}

#[test]
fn test_unique_users_dedupes_case() {
    let mut rollup = Rollup::default();
    rollup.apply(&claimed(
        "0x01",
        at(10, 0),
        "0xabcdef0000000000000000000000000000000001",
        None,
    ));
    rollup.apply(&claimed(
        "0x02",
        at(10, 1),
        "0xABCDEF0000000000000000000000000000000001",
        None,
    ));
    rollup.apply(&CanonicalEvent::new(
        "0x03",
        0,
        1,
        at(10, 2),
        EventPayload::GiftViewed(GiftViewed {
            gift_id: U256::from(1u64),
            viewer: Some("0x3333333333333333333333333333333333333333".to_string()),
            campaign_id: None,
        }),
        EventSource::Webhook,
    ));

    assert_eq!(rollup.users.len(), 2);
    assert_eq!(rollup.to_fields(18)["uniqueUsers"], "2");
    assert_eq!(rollup.to_fields(18)["conversionRate"], "0.00");
}

#[test]
fn test_report_serializes_camel_case() {
    let report = MaterializeReport {
        events_processed: 3,
        skipped: 1,
        rollups: RollupCounts {
            hourly: 1,
            daily: 1,
            campaigns: 0,
        },
        processing_time_ms: 4,
    };
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["eventsProcessed"], 3);
    assert_eq!(json["rollups"]["campaigns"], 0);
    assert_eq!(json["processingTimeMs"], 4);
}

#[test]
fn test_total_value_sums_past_u128() {
    let mut rollup = Rollup::default();
    rollup.apply(&created("0x01", at(10, 0), None, u128::MAX));
    rollup.apply(&created("0x02", at(10, 1), None, u128::MAX));

    assert_eq!(rollup.total_value, U256::from(u128::MAX) * U256::from(2u8));
    assert_eq!(
        rollup.to_fields(18)["totalValue"],
        "680564733841876926926.75"
    );
}
