use serde::{Deserialize, Serialize};

use super::EntityId;

/// EVM execution outcome of a contract call, create, or ethereum transaction.
///
/// Recorded regardless of receipt success so gas accounting stays complete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractResult {
    pub consensus_timestamp: i64,
    pub contract_id: EntityId,
    pub payer_account_id: EntityId,
    pub sender_id: Option<EntityId>,
    pub amount: Option<i64>,
    pub bloom: Vec<u8>,
    pub call_result: Vec<u8>,
    pub created_contract_ids: Vec<EntityId>,
    pub error_message: Option<String>,
    pub function_parameters: Vec<u8>,
    pub gas_limit: i64,
    pub gas_used: i64,
    pub transaction_result: i32,
    pub transaction_hash: Vec<u8>,
}

/// An EVM log. Synthetic logs mirror ERC events for native token operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractLog {
    pub consensus_timestamp: i64,
    pub index: i32,
    pub contract_id: EntityId,
    pub payer_account_id: EntityId,
    pub root_contract_id: Option<EntityId>,
    pub bloom: Vec<u8>,
    pub data: Vec<u8>,
    pub topic0: Option<Vec<u8>>,
    pub topic1: Option<Vec<u8>>,
    pub topic2: Option<Vec<u8>>,
    pub topic3: Option<Vec<u8>>,
    pub synthetic: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractStateChange {
    pub consensus_timestamp: i64,
    pub contract_id: EntityId,
    pub payer_account_id: EntityId,
    pub slot: Vec<u8>,
    pub value_read: Vec<u8>,
    pub value_written: Option<Vec<u8>>,
    pub migration: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthereumTransaction {
    pub consensus_timestamp: i64,
    pub hash: Vec<u8>,
    pub payer_account_id: EntityId,
    pub call_data_id: Option<EntityId>,
    pub call_data: Option<Vec<u8>>,
    pub chain_id: Option<Vec<u8>>,
    pub data: Vec<u8>,
    pub from_address: Option<Vec<u8>>,
    pub gas_limit: i64,
    pub gas_price: Option<Vec<u8>>,
    pub max_fee_per_gas: Option<Vec<u8>>,
    pub max_priority_fee_per_gas: Option<Vec<u8>>,
    pub max_gas_allowance: i64,
    pub nonce: i64,
    pub signature_r: Option<Vec<u8>>,
    pub signature_s: Option<Vec<u8>>,
    pub to_address: Option<Vec<u8>>,
    pub transaction_type: i32,
    pub value: Option<Vec<u8>>,
}
