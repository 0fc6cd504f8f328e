//! Roll-up aggregation.
//!
//! Pure in-memory folding of canonical events into per-dimension records.
//! Output is a function of the input events only: field order is fixed
//! and no wall-clock values are written.

use std::collections::{BTreeMap, BTreeSet};

use alloy::primitives::U256;

use crate::events::{format_percent, format_units, CanonicalEvent, EventType};
use crate::storage::RollupFields;

/// Hour bucket label, `YYYY-MM-DDTHH` in UTC.
pub const HOUR_FORMAT: &str = "%Y-%m-%dT%H";
/// Day bucket label, `YYYY-MM-DD` in UTC.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Aggregate for one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rollup {
    pub created: u64,
    pub viewed: u64,
    pub claimed: u64,
    pub expired: u64,
    pub returned: u64,
    /// Sum of created amounts, base units.
    pub total_value: U256,
    /// Distinct claimers and viewers.
    pub users: BTreeSet<String>,
    pub events: u64,
}

impl Rollup {
    pub fn apply(&mut self, event: &CanonicalEvent) {
        match event.event_type {
            EventType::GiftCreated => self.created += 1,
            EventType::GiftViewed => self.viewed += 1,
            EventType::GiftClaimed => self.claimed += 1,
            EventType::GiftExpired => self.expired += 1,
            EventType::GiftReturned => self.returned += 1,
        }
        if let Some(value) = event.payload.value() {
            self.total_value = self.total_value.saturating_add(value);
        }
        if let Some(actor) = event.payload.actor() {
            self.users.insert(actor.to_ascii_lowercase());
        }
        self.events += 1;
    }

    /// `claimed / created * 100`, two decimals; `0.00` with nothing created.
    pub fn conversion_rate(&self) -> String {
        format_percent(self.claimed, self.created)
    }

    /// Stored representation. `value_decimals` converts base units for display.
    pub fn to_fields(&self, value_decimals: u32) -> RollupFields {
        let mut fields = RollupFields::new();
        for event_type in EventType::ALL {
            let count = match event_type {
                EventType::GiftCreated => self.created,
                EventType::GiftViewed => self.viewed,
                EventType::GiftClaimed => self.claimed,
                EventType::GiftExpired => self.expired,
                EventType::GiftReturned => self.returned,
            };
            fields.insert(event_type.counter_field().to_string(), count.to_string());
        }
        fields.insert(
            "totalValue".to_string(),
            format_units(self.total_value, value_decimals, 2),
        );
        fields.insert("uniqueUsers".to_string(), self.users.len().to_string());
        fields.insert("conversionRate".to_string(), self.conversion_rate());
        fields.insert("eventsProcessed".to_string(), self.events.to_string());
        fields
    }
}

/// All buckets produced by one materialization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buckets {
    pub hourly: BTreeMap<String, Rollup>,
    pub daily: BTreeMap<String, Rollup>,
    pub campaigns: BTreeMap<String, Rollup>,
    pub global: Rollup,
}

impl Buckets {
    pub fn add(&mut self, event: &CanonicalEvent) {
        let hour = event.timestamp.format(HOUR_FORMAT).to_string();
        let day = event.timestamp.format(DAY_FORMAT).to_string();

        self.hourly.entry(hour).or_default().apply(event);
        self.daily.entry(day).or_default().apply(event);
        if let Some(campaign) = event.payload.campaign_id() {
            self.campaigns
                .entry(campaign.to_string())
                .or_default()
                .apply(event);
        }
        self.global.apply(event);
    }

    pub fn is_empty(&self) -> bool {
        self.global.events == 0
    }
}

impl<'a> FromIterator<&'a CanonicalEvent> for Buckets {
    fn from_iter<I: IntoIterator<Item = &'a CanonicalEvent>>(iter: I) -> Self {
        let mut buckets = Buckets::default();
        for event in iter {
            buckets.add(event);
        }
        buckets
    }
}
