//! Canonical event model.
//!
//! A [`CanonicalEvent`] is the deduplicated, trusted form of one on-chain log
//! (or one live webhook notification). Its `event_id` is derived from the
//! transaction hash and log index and is the idempotency key for the stream.
//!
//! Payloads are a tagged union over [`EventType`]; each variant carries its
//! own typed struct. Gift ids and token amounts stay full-width `uint256`
//! ([`U256`]) base units everywhere and are serialized as decimal strings so
//! JSON never rounds them.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod units;

pub use units::{format_percent, format_units};

/// The fixed taxonomy of gift lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventType {
    GiftCreated,
    GiftViewed,
    GiftClaimed,
    GiftExpired,
    GiftReturned,
}

impl EventType {
    pub const ALL: [EventType; 5] = [
        EventType::GiftCreated,
        EventType::GiftViewed,
        EventType::GiftClaimed,
        EventType::GiftExpired,
        EventType::GiftReturned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::GiftCreated => "GiftCreated",
            EventType::GiftViewed => "GiftViewed",
            EventType::GiftClaimed => "GiftClaimed",
            EventType::GiftExpired => "GiftExpired",
            EventType::GiftReturned => "GiftReturned",
        }
    }

    /// Counter field name used in roll-up records.
    pub fn counter_field(&self) -> &'static str {
        match self {
            EventType::GiftCreated => "created",
            EventType::GiftViewed => "viewed",
            EventType::GiftClaimed => "claimed",
            EventType::GiftExpired => "expired",
            EventType::GiftReturned => "returned",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown event type: {0}")]
pub struct UnknownEventType(pub String);

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s) || t.counter_field() == s)
            .ok_or_else(|| UnknownEventType(s.to_string()))
    }
}

/// Where a canonical event was observed. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    Reconciliation,
    Webhook,
    Backfill,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftCreated {
    #[serde(with = "u256_string")]
    pub gift_id: U256,
    pub creator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(with = "u256_string")]
    pub amount: U256,
    pub expires_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftViewed {
    #[serde(with = "u256_string")]
    pub gift_id: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftClaimed {
    #[serde(with = "u256_string")]
    pub gift_id: U256,
    pub claimer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftExpired {
    #[serde(with = "u256_string")]
    pub gift_id: U256,
    pub creator: String,
    #[serde(with = "u256_string")]
    pub amount: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftReturned {
    #[serde(with = "u256_string")]
    pub gift_id: U256,
    pub creator: String,
    pub returned_by: String,
    #[serde(with = "u256_string")]
    pub amount: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
}

/// Typed payload, one variant per [`EventType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EventPayload {
    GiftCreated(GiftCreated),
    GiftViewed(GiftViewed),
    GiftClaimed(GiftClaimed),
    GiftExpired(GiftExpired),
    GiftReturned(GiftReturned),
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::GiftCreated(_) => EventType::GiftCreated,
            EventPayload::GiftViewed(_) => EventType::GiftViewed,
            EventPayload::GiftClaimed(_) => EventType::GiftClaimed,
            EventPayload::GiftExpired(_) => EventType::GiftExpired,
            EventPayload::GiftReturned(_) => EventType::GiftReturned,
        }
    }

    pub fn gift_id(&self) -> U256 {
        match self {
            EventPayload::GiftCreated(p) => p.gift_id,
            EventPayload::GiftViewed(p) => p.gift_id,
            EventPayload::GiftClaimed(p) => p.gift_id,
            EventPayload::GiftExpired(p) => p.gift_id,
            EventPayload::GiftReturned(p) => p.gift_id,
        }
    }

    pub fn campaign_id(&self) -> Option<&str> {
        match self {
            EventPayload::GiftCreated(p) => p.campaign_id.as_deref(),
            EventPayload::GiftViewed(p) => p.campaign_id.as_deref(),
            EventPayload::GiftClaimed(p) => p.campaign_id.as_deref(),
            EventPayload::GiftExpired(p) => p.campaign_id.as_deref(),
            EventPayload::GiftReturned(p) => p.campaign_id.as_deref(),
        }
    }

    /// The end user this event counts towards in unique-user cardinality.
    ///
    /// Only recipients are counted: claimers and (when known) viewers.
    pub fn actor(&self) -> Option<&str> {
        match self {
            EventPayload::GiftClaimed(p) => Some(p.claimer.as_str()),
            EventPayload::GiftViewed(p) => p.viewer.as_deref(),
            _ => None,
        }
    }

    /// Value contributed to `totalValue`, in base units.
    ///
    /// Only creation moves value into the system; expiry and return
    /// amounts refer to the same funds and are not summed again.
    pub fn value(&self) -> Option<U256> {
        match self {
            EventPayload::GiftCreated(p) => Some(p.amount),
            _ => None,
        }
    }
}

/// Build the idempotency key for a log: `txHash:logIndex`.
///
/// Hashes are lower-cased so the same log reported by different sources
/// (RPC vs. webhook) maps to one key.
pub fn event_id(tx_hash: &str, log_index: u64) -> String {
    format!("{}:{}", tx_hash.to_ascii_lowercase(), log_index)
}

/// One recorded occurrence of interest. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalEvent {
    pub event_id: String,
    pub event_type: EventType,
    pub transaction_hash: String,
    pub log_index: u64,
    pub block_number: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
    pub source: EventSource,
}

impl CanonicalEvent {
    pub fn new(
        tx_hash: &str,
        log_index: u64,
        block_number: u64,
        timestamp: DateTime<Utc>,
        payload: EventPayload,
        source: EventSource,
    ) -> Self {
        Self {
            event_id: event_id(tx_hash, log_index),
            event_type: payload.event_type(),
            transaction_hash: tx_hash.to_ascii_lowercase(),
            log_index,
            block_number,
            timestamp,
            payload,
            source,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }
}

/// Serde adapter keeping `uint256` values exact in JSON.
///
/// Serializes as a decimal string; accepts either a decimal string, a
/// `0x` hex quantity or a plain integer on the way in.
pub mod u256_string {
    use alloy::primitives::U256;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => match s.strip_prefix("0x") {
                Some(hex) => U256::from_str_radix(hex, 16).map_err(D::Error::custom),
                None => U256::from_str_radix(&s, 10).map_err(D::Error::custom),
            },
            Repr::Number(n) => Ok(U256::from(n)),
        }
    }
}

#[cfg(test)]
mod tests;
