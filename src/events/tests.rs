use chrono::TimeZone;

use super::*;

fn created(amount: u128) -> EventPayload {
    created_u256(U256::from(amount))
}

fn created_u256(amount: U256) -> EventPayload {
    EventPayload::GiftCreated(GiftCreated {
        gift_id: U256::from(7u64),
        creator: "0xcreator".to_string(),
        campaign_id: Some("spring-drop".to_string()),
        amount,
        expires_at: 1_704_200_000,
    })
}

#[test]
fn test_event_id_is_tx_hash_and_log_index() {
    assert_eq!(event_id("0xaa", 0), "0xaa:0");
    assert_eq!(event_id("0xAbC", 12), "0xabc:12");
}

#[test]
fn test_canonical_event_derives_type_and_id() {
    let ts = Utc.with_ymd_and_hms(2024, 1, 1, 10, 5, 0).unwrap();
    let event = CanonicalEvent::new(
        "0xAA",
        3,
        100,
        ts,
        created(1),
        EventSource::Reconciliation,
    );

    assert_eq!(event.event_id, "0xaa:3");
    assert_eq!(event.event_type, EventType::GiftCreated);
    assert_eq!(event.transaction_hash, "0xaa");
}

#[test]
fn test_json_keeps_large_amounts_exact() {
    let ts = Utc.with_ymd_and_hms(2024, 1, 1, 10, 5, 0).unwrap();
    let amount = 123_456_789_000_000_000_000_000_001u128;
    let event = CanonicalEvent::new("0xaa", 0, 1, ts, created(amount), EventSource::Webhook);

    let json = event.to_json().unwrap();
    assert!(json.contains("\"amount\":\"123456789000000000000000001\""));

    let parsed = CanonicalEvent::from_json(&json).unwrap();
    assert_eq!(parsed, event);
}

#[test]
fn test_json_keeps_uint256_amounts_exact() {
    let ts = Utc.with_ymd_and_hms(2024, 1, 1, 10, 5, 0).unwrap();
    let amount = U256::from(1u8) << 128;
    let event = CanonicalEvent::new("0xaa", 0, 1, ts, created_u256(amount), EventSource::Webhook);

    let json = event.to_json().unwrap();
    assert!(json.contains("\"amount\":\"340282366920938463463374607431768211456\""));

    let parsed = CanonicalEvent::from_json(&json).unwrap();
    assert_eq!(parsed.payload.value(), Some(amount));
}

#[test]
fn test_payload_accepts_hex_quantities() {
    let json = r#"{"type":"GiftExpired","data":{"giftId":"0x10","creator":"0xc","amount":"0x0"}}"#;
    let payload: EventPayload = serde_json::from_str(json).unwrap();
    assert_eq!(payload.gift_id(), U256::from(16u64));
}

#[test]
fn test_payload_accepts_numeric_amounts() {
    let json = r#"{"type":"GiftExpired","data":{"giftId":5,"creator":"0xc","amount":42}}"#;
    let payload: EventPayload = serde_json::from_str(json).unwrap();
    match payload {
        EventPayload::GiftExpired(p) => {
            assert_eq!(p.gift_id, U256::from(5u64));
            assert_eq!(p.amount, U256::from(42u64));
            assert!(p.campaign_id.is_none());
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[test]
fn test_payload_accessors() {
    let claimed = EventPayload::GiftClaimed(GiftClaimed {
        gift_id: U256::from(1u64),
        claimer: "0xc1".to_string(),
        campaign_id: None,
    });
    assert_eq!(claimed.actor(), Some("0xc1"));
    assert_eq!(claimed.value(), None);
    assert_eq!(claimed.campaign_id(), None);

    let created = created(9);
    assert_eq!(created.actor(), None);
    assert_eq!(created.value(), Some(U256::from(9u64)));
    assert_eq!(created.campaign_id(), Some("spring-drop"));
    assert_eq!(created.gift_id(), U256::from(7u64));
}

#[test]
fn test_event_type_parses_names_and_counter_fields() {
    assert_eq!("GiftClaimed".parse::<EventType>().unwrap(), EventType::GiftClaimed);
    assert_eq!("giftcreated".parse::<EventType>().unwrap(), EventType::GiftCreated);
    assert_eq!("returned".parse::<EventType>().unwrap(), EventType::GiftReturned);
    assert!("Minted".parse::<EventType>().is_err());
}
