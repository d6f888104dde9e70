//! Entity rows and the per-transaction side records that hang off them.

use serde::{Deserialize, Serialize};

use super::{EntityId, EntityType, TimestampRange};
use crate::record::TransactionType;

/// Generic ledger object (account, contract, file, schedule, token, topic).
///
/// Populated incrementally by different transaction kinds; `None` fields are unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub entity_type: Option<EntityType>,
    pub timestamp_range: Option<TimestampRange>,
    pub created_timestamp: Option<i64>,
    pub deleted: Option<bool>,
    pub alias: Option<Vec<u8>>,
    pub auto_renew_account_id: Option<EntityId>,
    pub auto_renew_period: Option<i64>,
    /// Balance change in tinybars; merges add up.
    pub balance: Option<i64>,
    pub balance_timestamp: Option<i64>,
    pub decline_reward: Option<bool>,
    pub ethereum_nonce: Option<i64>,
    pub evm_address: Option<Vec<u8>>,
    pub expiration_timestamp: Option<i64>,
    pub key: Option<Vec<u8>>,
    pub max_automatic_token_associations: Option<i32>,
    pub memo: Option<String>,
    pub obtainer_id: Option<EntityId>,
    pub permanent_removal: Option<bool>,
    pub proxy_account_id: Option<EntityId>,
    pub receiver_sig_required: Option<bool>,
    pub stake_period_start: Option<i64>,
    pub staked_account_id: Option<EntityId>,
    pub staked_node_id: Option<i64>,
}

impl Entity {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn with_type(id: EntityId, entity_type: EntityType) -> Self {
        Self {
            id,
            entity_type: Some(entity_type),
            ..Self::default()
        }
    }
}

impl_historical!(
    Entity,
    key: EntityId = [id],
    merge = [
        entity_type,
        created_timestamp,
        deleted,
        alias,
        auto_renew_account_id,
        auto_renew_period,
        balance_timestamp,
        decline_reward,
        ethereum_nonce,
        evm_address,
        expiration_timestamp,
        key,
        max_automatic_token_associations,
        memo,
        obtainer_id,
        permanent_removal,
        proxy_account_id,
        receiver_sig_required,
        stake_period_start,
        staked_account_id,
        staked_node_id,
    ],
    add = [balance]
);

/// Contract-specific attributes (bytecode provenance).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: EntityId,
    pub file_id: Option<EntityId>,
    pub initcode: Option<Vec<u8>>,
    pub runtime_bytecode: Option<Vec<u8>>,
}

/// Topic-specific authorization keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: EntityId,
    pub timestamp_range: Option<TimestampRange>,
    pub created_timestamp: Option<i64>,
    pub admin_key: Option<Vec<u8>>,
    pub fee_exempt_key_list: Option<Vec<u8>>,
    pub fee_schedule_key: Option<Vec<u8>>,
    pub submit_key: Option<Vec<u8>>,
}

impl_historical!(
    Topic,
    key: EntityId = [id],
    merge = [
        created_timestamp,
        admin_key,
        fee_exempt_key_list,
        fee_schedule_key,
        submit_key,
    ]
);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicMessage {
    pub consensus_timestamp: i64,
    pub topic_id: EntityId,
    pub sequence_number: i64,
    pub running_hash: Vec<u8>,
    pub running_hash_version: i32,
    pub message: Vec<u8>,
    pub payer_account_id: EntityId,
    pub chunk_num: Option<i32>,
    pub chunk_total: Option<i32>,
    pub initial_transaction_valid_start: Option<i64>,
    pub valid_start_timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileData {
    pub consensus_timestamp: i64,
    pub entity_id: EntityId,
    pub file_data: Vec<u8>,
    pub transaction_type: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub schedule_id: EntityId,
    pub consensus_timestamp: i64,
    pub creator_account_id: EntityId,
    pub payer_account_id: EntityId,
    pub transaction_body: Vec<u8>,
    pub expiration_time: Option<i64>,
    pub wait_for_expiry: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSignature {
    pub consensus_timestamp: i64,
    pub entity_id: EntityId,
    pub public_key_prefix: Vec<u8>,
    pub signature: Vec<u8>,
    pub signature_type: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveHash {
    pub consensus_timestamp: i64,
    pub account_id: EntityId,
    pub hash: Vec<u8>,
}

/// Consensus node attributes. Nodes are keyed by node id, not by entity id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub node_id: i64,
    pub timestamp_range: Option<TimestampRange>,
    pub created_timestamp: Option<i64>,
    pub account_id: Option<EntityId>,
    pub admin_key: Option<Vec<u8>>,
    pub decline_reward: Option<bool>,
    pub deleted: Option<bool>,
    pub description: Option<String>,
}

impl_historical!(
    Node,
    key: i64 = [node_id],
    merge = [
        created_timestamp,
        account_id,
        admin_key,
        decline_reward,
        deleted,
        description,
    ]
);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStake {
    pub consensus_timestamp: i64,
    pub epoch_day: i64,
    pub node_id: i64,
    pub max_stake: i64,
    pub min_stake: i64,
    pub reward_rate: i64,
    pub stake: i64,
    pub stake_not_rewarded: i64,
    pub stake_rewarded: i64,
    pub staking_period: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prng {
    pub consensus_timestamp: i64,
    pub payer_account_id: EntityId,
    pub range: i32,
    pub prng_bytes: Option<Vec<u8>>,
    pub prng_number: Option<i32>,
}

/// One row per processed record item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub consensus_timestamp: i64,
    pub transaction_type: TransactionType,
    pub payer_account_id: EntityId,
    pub node_account_id: Option<EntityId>,
    pub entity_id: Option<EntityId>,
    pub result: i32,
    pub valid_start_ns: i64,
    pub memo: Vec<u8>,
    pub charged_tx_fee: i64,
    pub max_fee: i64,
    pub nonce: i32,
    pub parent_consensus_timestamp: Option<i64>,
    pub scheduled: bool,
}
