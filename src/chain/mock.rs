//! Scripted in-memory chain for tests.
//!
//! Serves `eth_getLogs`-style queries from a fixed set of logs and can be
//! told to reject wide ranges or fail specific topics, to exercise the
//! fetcher's backoff and the driver's per-type failure handling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use alloy::primitives::{address, Address, LogData, B256, U256};
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::abi::{contract, encode_campaign};
use super::{ChainProvider, LogFilter, ProviderError, RawLog};

/// Contract address the scripted logs are emitted from.
pub const MOCK_CONTRACT: Address = address!("00000000000000000000000000000000000000aa");

/// Default creator for logs built with [`created_log`].
pub const MOCK_CREATOR: &str = "0x1111111111111111111111111111111111111111";

/// In-memory chain provider with scripted failures.
pub struct ScriptedProvider {
    head: AtomicU64,
    logs: RwLock<Vec<RawLog>>,
    max_range: RwLock<Option<u64>>,
    failing_topics: RwLock<HashMap<B256, ProviderError>>,
    calls: RwLock<Vec<LogFilter>>,
}

impl ScriptedProvider {
    pub fn new(head: u64) -> Self {
        Self {
            head: AtomicU64::new(head),
            logs: RwLock::new(Vec::new()),
            max_range: RwLock::new(None),
            failing_topics: RwLock::new(HashMap::new()),
            calls: RwLock::new(Vec::new()),
        }
    }

    pub fn set_head(&self, head: u64) {
        self.head.store(head, Ordering::SeqCst);
    }

    pub async fn push_log(&self, log: RawLog) {
        self.logs.write().await.push(log);
    }

    /// Reject queries spanning more than `max` blocks with a range error.
    pub async fn set_max_range(&self, max: Option<u64>) {
        *self.max_range.write().await = max;
    }

    /// Fail every query that asks for `topic` with `error`.
    pub async fn fail_topic(&self, topic: B256, error: ProviderError) {
        self.failing_topics.write().await.insert(topic, error);
    }

    pub async fn clear_failures(&self) {
        self.failing_topics.write().await.clear();
    }

    /// Every `get_logs` filter received, in order.
    pub async fn calls(&self) -> Vec<LogFilter> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl ChainProvider for ScriptedProvider {
    async fn block_number(&self) -> Result<u64, ProviderError> {
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, ProviderError> {
        self.calls.write().await.push(filter.clone());

        {
            let failing = self.failing_topics.read().await;
            for topic in &filter.topic0s {
                if let Some(err) = failing.get(topic) {
                    return Err(err.clone());
                }
            }
        }

        if let Some(max) = *self.max_range.read().await {
            if filter.span() > max {
                return Err(ProviderError::Rpc {
                    code: -32005,
                    message: format!("query exceeds max block range {max}"),
                });
            }
        }

        let logs = self.logs.read().await;
        Ok(logs
            .iter()
            .filter(|log| log.address == filter.address)
            .filter(|log| {
                log.topics()
                    .first()
                    .is_some_and(|t| filter.topic0s.contains(t))
            })
            .filter(|log| log.block_number >= filter.from_block && log.block_number <= filter.to_block)
            .cloned()
            .collect())
    }
}

/// Wrap encoded log data as if emitted by [`MOCK_CONTRACT`].
///
/// Short hashes such as `"0xa1"` are left-padded to 32 bytes.
pub fn scripted_log(tx_hash: &str, log_index: u64, block_number: u64, data: LogData) -> RawLog {
    RawLog {
        address: MOCK_CONTRACT,
        data,
        block_number,
        transaction_hash: tx_hash_word(tx_hash),
        log_index,
        block_timestamp: None,
    }
}

fn tx_hash_word(tx_hash: &str) -> B256 {
    let digits = tx_hash.trim_start_matches("0x");
    let padded = format!("{digits:0>64}");
    padded
        .parse()
        .unwrap_or_else(|e| panic!("bad test tx hash {tx_hash}: {e}"))
}

fn address(value: &str) -> Address {
    value
        .parse()
        .unwrap_or_else(|e| panic!("bad test address {value}: {e}"))
}

fn campaign_word(campaign: Option<&str>) -> B256 {
    encode_campaign(campaign).unwrap_or_else(|e| panic!("bad test campaign: {e}"))
}

/// `GiftCreated` by [`MOCK_CREATOR`] with no campaign.
pub fn created_log(tx_hash: &str, log_index: u64, block: u64, gift_id: u128, amount: u128) -> RawLog {
    created_log_with(
        tx_hash,
        log_index,
        block,
        gift_id,
        MOCK_CREATOR,
        None,
        U256::from(amount),
        0,
    )
}

#[allow(clippy::too_many_arguments)]
pub fn created_log_with(
    tx_hash: &str,
    log_index: u64,
    block: u64,
    gift_id: u128,
    creator: &str,
    campaign: Option<&str>,
    amount: U256,
    expires_at: u64,
) -> RawLog {
    let event = contract::GiftCreated {
        giftId: U256::from(gift_id),
        creator: address(creator),
        campaignId: campaign_word(campaign),
        amount,
        expiresAt: U256::from(expires_at),
    };
    scripted_log(tx_hash, log_index, block, event.encode_log_data())
}

pub fn claimed_log(
    tx_hash: &str,
    log_index: u64,
    block: u64,
    gift_id: u128,
    claimer: &str,
    campaign: Option<&str>,
) -> RawLog {
    let event = contract::GiftClaimed {
        giftId: U256::from(gift_id),
        claimer: address(claimer),
        campaignId: campaign_word(campaign),
    };
    scripted_log(tx_hash, log_index, block, event.encode_log_data())
}

pub fn expired_log(tx_hash: &str, log_index: u64, block: u64, gift_id: u128, amount: u128) -> RawLog {
    let event = contract::GiftExpired {
        giftId: U256::from(gift_id),
        creator: address(MOCK_CREATOR),
        amount: U256::from(amount),
    };
    scripted_log(tx_hash, log_index, block, event.encode_log_data())
}

pub fn returned_log(
    tx_hash: &str,
    log_index: u64,
    block: u64,
    gift_id: u128,
    returned_by: &str,
    amount: u128,
) -> RawLog {
    let event = contract::GiftReturned {
        giftId: U256::from(gift_id),
        creator: address(MOCK_CREATOR),
        returnedBy: address(returned_by),
        amount: U256::from(amount),
    };
    scripted_log(tx_hash, log_index, block, event.encode_log_data())
}
