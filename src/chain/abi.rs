//! ABI of the gifting contract's events.
//!
//! | Event        | Indexed (topics 1..)             | Data                 |
//! |--------------|----------------------------------|----------------------|
//! | GiftCreated  | giftId, creator, campaignId      | amount, expiresAt    |
//! | GiftClaimed  | giftId, claimer, campaignId      |                      |
//! | GiftExpired  | giftId, creator                  | amount               |
//! | GiftReturned | giftId, creator, returnedBy      | amount               |
//!
//! `GiftViewed` is an off-chain signal and has no log form.

use alloy::primitives::{Address, B256};
use alloy::sol_types::SolEvent;

use super::RawLog;
use crate::events::{
    EventPayload, EventType, GiftClaimed, GiftCreated, GiftExpired, GiftReturned,
};

/// Event declarations as emitted by the contract.
pub mod contract {
    alloy::sol! {
        #[derive(Debug, PartialEq, Eq)]
        event GiftCreated(
            uint256 indexed giftId,
            address indexed creator,
            bytes32 indexed campaignId,
            uint256 amount,
            uint256 expiresAt
        );

        #[derive(Debug, PartialEq, Eq)]
        event GiftClaimed(
            uint256 indexed giftId,
            address indexed claimer,
            bytes32 indexed campaignId
        );

        #[derive(Debug, PartialEq, Eq)]
        event GiftExpired(uint256 indexed giftId, address indexed creator, uint256 amount);

        #[derive(Debug, PartialEq, Eq)]
        event GiftReturned(
            uint256 indexed giftId,
            address indexed creator,
            address indexed returnedBy,
            uint256 amount
        );
    }
}

/// Errors decoding a log into a typed payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("{0} has no on-chain log form")]
    NotOnChain(EventType),

    #[error("Topic0 mismatch: expected {expected}, got {found}")]
    TopicMismatch { expected: B256, found: B256 },

    #[error("Missing topic {0}")]
    MissingTopic(usize),

    #[error("ABI decode failed: {0}")]
    Abi(String),

    #[error("Value of {0} does not fit in 64 bits")]
    Overflow(&'static str),
}

impl From<alloy::sol_types::Error> for DecodeError {
    fn from(err: alloy::sol_types::Error) -> Self {
        DecodeError::Abi(err.to_string())
    }
}

/// Topic0 for an event type, if it is emitted on-chain.
pub fn topic0(event_type: EventType) -> Option<B256> {
    match event_type {
        EventType::GiftCreated => Some(contract::GiftCreated::SIGNATURE_HASH),
        EventType::GiftClaimed => Some(contract::GiftClaimed::SIGNATURE_HASH),
        EventType::GiftExpired => Some(contract::GiftExpired::SIGNATURE_HASH),
        EventType::GiftReturned => Some(contract::GiftReturned::SIGNATURE_HASH),
        EventType::GiftViewed => None,
    }
}

/// Decode a raw log as the given event type.
pub fn decode_log(event_type: EventType, log: &RawLog) -> Result<EventPayload, DecodeError> {
    let expected = topic0(event_type).ok_or(DecodeError::NotOnChain(event_type))?;
    let found = *log.topics().first().ok_or(DecodeError::MissingTopic(0))?;
    if found != expected {
        return Err(DecodeError::TopicMismatch { expected, found });
    }

    let payload = match event_type {
        EventType::GiftCreated => {
            let event = contract::GiftCreated::decode_log_data(&log.data)?;
            EventPayload::GiftCreated(GiftCreated {
                gift_id: event.giftId,
                creator: as_address(&event.creator),
                campaign_id: as_campaign(&event.campaignId),
                amount: event.amount,
                expires_at: u64::try_from(event.expiresAt)
                    .map_err(|_| DecodeError::Overflow("expiresAt"))?,
            })
        }
        EventType::GiftClaimed => {
            let event = contract::GiftClaimed::decode_log_data(&log.data)?;
            EventPayload::GiftClaimed(GiftClaimed {
                gift_id: event.giftId,
                claimer: as_address(&event.claimer),
                campaign_id: as_campaign(&event.campaignId),
            })
        }
        EventType::GiftExpired => {
            let event = contract::GiftExpired::decode_log_data(&log.data)?;
            EventPayload::GiftExpired(GiftExpired {
                gift_id: event.giftId,
                creator: as_address(&event.creator),
                amount: event.amount,
                campaign_id: None,
            })
        }
        EventType::GiftReturned => {
            let event = contract::GiftReturned::decode_log_data(&log.data)?;
            EventPayload::GiftReturned(GiftReturned {
                gift_id: event.giftId,
                creator: as_address(&event.creator),
                returned_by: as_address(&event.returnedBy),
                amount: event.amount,
                campaign_id: None,
            })
        }
        EventType::GiftViewed => return Err(DecodeError::NotOnChain(event_type)),
    };

    Ok(payload)
}

/// Addresses are rendered lower-case.
fn as_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

/// Campaign ids are right-padded short strings; zero means "no campaign".
/// Non-text values fall back to their hex form.
fn as_campaign(word: &B256) -> Option<String> {
    if word.is_zero() {
        return None;
    }
    let end = word.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    match std::str::from_utf8(&word[..end]) {
        Ok(text) if !text.is_empty() && text.chars().all(|c| !c.is_control()) => {
            Some(text.to_string())
        }
        _ => Some(format!("0x{}", hex::encode(word))),
    }
}

/// Encode a campaign id as a right-padded bytes32. `None` is the zero word.
pub fn encode_campaign(campaign: Option<&str>) -> Result<B256, DecodeError> {
    let Some(campaign) = campaign else {
        return Ok(B256::ZERO);
    };
    let bytes = campaign.as_bytes();
    if bytes.len() > B256::len_bytes() {
        return Err(DecodeError::Abi(format!(
            "campaign id longer than 32 bytes: {campaign}"
        )));
    }
    Ok(B256::right_padding_from(bytes))
}
