use std::io::Write;

use serial_test::serial;

use super::*;
use crate::events::EventType;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.storage.storage_type, StorageType::Memory);
    assert_eq!(config.storage.guard_ttl_secs, 604_800);
    assert_eq!(config.chain.range_windows, vec![5000, 2000, 1000, 500, 100]);
    assert_eq!(config.reconcile.rewind_blocks, 20);
    assert_eq!(config.reconcile.max_blocks_per_pass, 2000);
    assert_eq!(config.reconcile.watermark_mode, WatermarkMode::Global);
    assert_eq!(config.materialize.batch_size, 1000);
    assert_eq!(config.materialize.hourly_ttl_secs, 86_400);
    assert_eq!(config.materialize.daily_ttl_secs, 2_592_000);
}

#[test]
fn test_default_requires_chain_endpoint() {
    let err = Config::default().validate().unwrap_err();
    assert!(err.to_string().contains("chain.rpc_url"));
}

#[test]
fn test_config_for_test_is_valid() {
    Config::for_test().validate().unwrap();
}

#[test]
fn test_validate_rejects_bad_windows() {
    let mut config = Config::for_test();
    config.chain.range_windows = vec![100, 500];
    assert!(config.validate().is_err());

    config.chain.range_windows = vec![500, 0];
    assert!(config.validate().is_err());

    config.chain.range_windows = Vec::new();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_viewed_reconciliation() {
    let mut config = Config::for_test();
    config.reconcile.event_types.push(EventType::GiftViewed);
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("GiftViewed"));
}

#[test]
fn test_validate_rejects_malformed_contract_address() {
    let mut config = Config::for_test();
    config.chain.contract_address = "0xnot-an-address".to_string();
    assert!(config.validate().is_err());

    let config = Config::for_test();
    assert_eq!(
        config.chain.contract().unwrap(),
        "0x00000000000000000000000000000000000000aa"
            .parse::<alloy::primitives::Address>()
            .unwrap()
    );
}

#[test]
fn test_validate_rejects_zero_sizes() {
    let mut config = Config::for_test();
    config.materialize.batch_size = 0;
    assert!(config.validate().is_err());

    let mut config = Config::for_test();
    config.reconcile.max_blocks_per_pass = 0;
    assert!(config.validate().is_err());

    let mut config = Config::for_test();
    config.storage.guard_ttl_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
#[serial]
fn test_load_from_yaml_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        r#"
server:
  port: 9090
  api_tokens: ["cron-secret"]
storage:
  type: redis
  redis:
    url: redis://cache:6379
    key_prefix: gifts
chain:
  rpc_url: https://rpc.example
  contract_address: "0x00000000000000000000000000000000000000bb"
  range_windows: [2000, 500]
reconcile:
  start_block: 1200
  event_types: [GiftCreated, GiftClaimed]
  watermark_mode: per_event_type
materialize:
  value_decimals: 6
"#
    )
    .unwrap();

    let config = Config::load(Some(file.path().to_str().unwrap())).unwrap();
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.server.api_tokens, vec!["cron-secret".to_string()]);
    assert_eq!(config.storage.storage_type, StorageType::Redis);
    assert_eq!(config.storage.redis.key_prefix.as_deref(), Some("gifts"));
    assert_eq!(config.chain.range_windows, vec![2000, 500]);
    assert_eq!(config.reconcile.start_block, 1200);
    assert_eq!(
        config.reconcile.event_types,
        vec![EventType::GiftCreated, EventType::GiftClaimed]
    );
    assert_eq!(config.reconcile.watermark_mode, WatermarkMode::PerEventType);
    assert_eq!(config.materialize.value_decimals, 6);
    // Untouched sections keep their defaults
    assert_eq!(config.reconcile.rewind_blocks, 20);
    config.validate().unwrap();
}

#[test]
#[serial]
fn test_env_overrides_file() {
    std::env::set_var("ROLLCALL__CHAIN__RPC_URL", "https://override.example");
    std::env::set_var("ROLLCALL__RECONCILE__REWIND_BLOCKS", "50");
    let config = Config::load(None);
    std::env::remove_var("ROLLCALL__CHAIN__RPC_URL");
    std::env::remove_var("ROLLCALL__RECONCILE__REWIND_BLOCKS");

    let config = config.unwrap();
    assert_eq!(config.chain.rpc_url, "https://override.example");
    assert_eq!(config.reconcile.rewind_blocks, 50);
}
