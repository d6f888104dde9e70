//! Read-only input contract: one decoded consensus transaction with its receipt, record
//! extras, and sidecars.
//!
//! The projection never mutates source fields. The only thing it writes back is the set of
//! entity ids the record touched ([`RecordItem::entity_ids`]).

mod body;
mod refs;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::EntityId;

pub use body::*;
pub use refs::EntityRef;

/// Protocol outcome code of a transaction.
///
/// Only the codes the projection distinguishes are named; everything else travels as
/// [`ResponseCode::Other`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ResponseCode {
    Ok,
    InvalidSignature,
    InsufficientPayerBalance,
    DuplicateTransaction,
    Unknown,
    #[default]
    Success,
    FailInvalid,
    InsufficientGas,
    ContractRevertExecuted,
    FeeScheduleFilePartUploaded,
    SuccessButMissingExpectedOperation,
    Other(i32),
}

impl ResponseCode {
    pub const fn code(self) -> i32 {
        match self {
            ResponseCode::Ok => 0,
            ResponseCode::InvalidSignature => 7,
            ResponseCode::InsufficientPayerBalance => 10,
            ResponseCode::DuplicateTransaction => 11,
            ResponseCode::Unknown => 21,
            ResponseCode::Success => 22,
            ResponseCode::FailInvalid => 23,
            ResponseCode::InsufficientGas => 30,
            ResponseCode::ContractRevertExecuted => 33,
            ResponseCode::FeeScheduleFilePartUploaded => 104,
            ResponseCode::SuccessButMissingExpectedOperation => 220,
            ResponseCode::Other(code) => code,
        }
    }

    /// SUCCESS and the two "partial success" codes count as successful.
    pub const fn is_successful(self) -> bool {
        matches!(
            self,
            ResponseCode::Success
                | ResponseCode::FeeScheduleFilePartUploaded
                | ResponseCode::SuccessButMissingExpectedOperation
        )
    }
}

impl From<i32> for ResponseCode {
    fn from(code: i32) -> Self {
        match code {
            0 => ResponseCode::Ok,
            7 => ResponseCode::InvalidSignature,
            10 => ResponseCode::InsufficientPayerBalance,
            11 => ResponseCode::DuplicateTransaction,
            21 => ResponseCode::Unknown,
            22 => ResponseCode::Success,
            23 => ResponseCode::FailInvalid,
            30 => ResponseCode::InsufficientGas,
            33 => ResponseCode::ContractRevertExecuted,
            104 => ResponseCode::FeeScheduleFilePartUploaded,
            220 => ResponseCode::SuccessButMissingExpectedOperation,
            other => ResponseCode::Other(other),
        }
    }
}

impl From<ResponseCode> for i32 {
    fn from(code: ResponseCode) -> Self {
        code.code()
    }
}

/// Receipt: outcome status plus the ids the network assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionReceipt {
    pub status: ResponseCode,
    pub account_id: Option<EntityId>,
    pub contract_id: Option<EntityId>,
    pub file_id: Option<EntityId>,
    pub node_id: Option<i64>,
    pub schedule_id: Option<EntityId>,
    pub token_id: Option<EntityId>,
    pub topic_id: Option<EntityId>,
    pub new_total_supply: i64,
    pub serial_numbers: Vec<i64>,
    pub topic_running_hash: Vec<u8>,
    pub topic_running_hash_version: i32,
    pub topic_sequence_number: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountAmount {
    pub account_id: EntityId,
    pub amount: i64,
    pub is_approval: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NftTransfer {
    pub sender_account_id: EntityId,
    pub receiver_account_id: EntityId,
    pub serial_number: i64,
    pub is_approval: bool,
}

/// Token movements as settled by consensus (canonical ids only).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenTransferList {
    pub token_id: EntityId,
    pub transfers: Vec<AccountAmount>,
    pub nft_transfers: Vec<NftTransfer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenAssociation {
    pub account_id: EntityId,
    pub token_id: EntityId,
}

/// A pending airdrop created by this transaction. An empty `token_id` denotes HBAR.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PendingAirdropRecord {
    pub sender_account_id: EntityId,
    pub receiver_account_id: EntityId,
    pub token_id: EntityId,
    pub serial_number: Option<i64>,
    pub amount: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractLogInfo {
    pub contract_id: EntityId,
    pub bloom: Vec<u8>,
    pub data: Vec<u8>,
    pub topics: Vec<Vec<u8>>,
}

/// EVM execution result attached to contract and ethereum transaction records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractFunctionResult {
    pub contract_id: Option<EntityId>,
    pub amount: i64,
    pub bloom: Vec<u8>,
    pub contract_call_result: Vec<u8>,
    pub created_contract_ids: Vec<EntityId>,
    pub error_message: Option<String>,
    pub evm_address: Option<Vec<u8>>,
    pub function_parameters: Vec<u8>,
    pub gas: i64,
    pub gas_used: i64,
    pub logs: Vec<ContractLogInfo>,
    pub sender_id: Option<EntityId>,
    pub signer_nonce: Option<i64>,
}

/// Record-level data beyond the receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionRecordExtras {
    pub alias: Vec<u8>,
    pub automatic_token_associations: Vec<TokenAssociation>,
    pub contract_function_result: Option<ContractFunctionResult>,
    pub ethereum_hash: Vec<u8>,
    pub evm_address: Vec<u8>,
    pub new_pending_airdrops: Vec<PendingAirdropRecord>,
    pub prng_bytes: Option<Vec<u8>>,
    pub prng_number: Option<i32>,
    pub schedule_ref: Option<EntityId>,
    pub token_transfer_lists: Vec<TokenTransferList>,
    pub transfer_list: Vec<AccountAmount>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageChange {
    pub slot: Vec<u8>,
    pub value_read: Vec<u8>,
    pub value_written: Option<Vec<u8>>,
}

/// Auxiliary record delivered out of band with its primary transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SidecarRecord {
    Bytecode {
        contract_id: EntityId,
        #[serde(default)]
        initcode: Vec<u8>,
        #[serde(default)]
        runtime_bytecode: Vec<u8>,
    },
    StateChanges {
        contract_id: EntityId,
        #[serde(default)]
        migration: bool,
        #[serde(default)]
        storage_changes: Vec<StorageChange>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignatureType {
    Contract,
    Ed25519,
    Rsa3072,
    Ecdsa384,
    EcdsaSecp256k1,
}

impl SignatureType {
    /// Field number of the signature in the protocol `SignaturePair` message.
    pub const fn code(self) -> i32 {
        match self {
            SignatureType::Contract => 2,
            SignatureType::Ed25519 => 3,
            SignatureType::Rsa3072 => 4,
            SignatureType::Ecdsa384 => 5,
            SignatureType::EcdsaSecp256k1 => 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePair {
    pub pub_key_prefix: Vec<u8>,
    pub signature: Vec<u8>,
    pub signature_type: SignatureType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HapiVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl HapiVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for HapiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// One decoded transaction as handed to the projector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordItem {
    pub consensus_timestamp: i64,
    pub payer_account_id: EntityId,
    #[serde(default)]
    pub node_account_id: Option<EntityId>,
    #[serde(default)]
    pub valid_start_ns: i64,
    #[serde(default)]
    pub memo: Vec<u8>,
    #[serde(default)]
    pub charged_tx_fee: i64,
    #[serde(default)]
    pub max_fee: i64,
    #[serde(default)]
    pub nonce: i32,
    #[serde(default)]
    pub scheduled: bool,
    pub body: TransactionBody,
    #[serde(default)]
    pub receipt: TransactionReceipt,
    #[serde(default)]
    pub record: TransactionRecordExtras,
    #[serde(default)]
    pub sidecars: Vec<SidecarRecord>,
    #[serde(default)]
    pub signature_map: Vec<SignaturePair>,
    #[serde(default)]
    pub hapi_version: HapiVersion,
    #[serde(default)]
    pub parent: Option<Box<RecordItem>>,
    #[serde(skip)]
    entity_ids: BTreeSet<EntityId>,
}

impl RecordItem {
    /// A successful record with an otherwise empty receipt.
    pub fn new(consensus_timestamp: i64, payer_account_id: EntityId, body: TransactionBody) -> Self {
        Self {
            consensus_timestamp,
            payer_account_id,
            node_account_id: None,
            valid_start_ns: consensus_timestamp.saturating_sub(1),
            memo: Vec::new(),
            charged_tx_fee: 0,
            max_fee: 0,
            nonce: 0,
            scheduled: false,
            body,
            receipt: TransactionReceipt::default(),
            record: TransactionRecordExtras::default(),
            sidecars: Vec::new(),
            signature_map: Vec::new(),
            hapi_version: HapiVersion::default(),
            parent: None,
            entity_ids: BTreeSet::new(),
        }
    }

    pub fn with_status(mut self, status: ResponseCode) -> Self {
        self.receipt.status = status;
        self
    }

    pub fn with_receipt(mut self, receipt: TransactionReceipt) -> Self {
        self.receipt = receipt;
        self
    }

    pub fn with_record(mut self, record: TransactionRecordExtras) -> Self {
        self.record = record;
        self
    }

    pub fn with_node(mut self, node_account_id: EntityId) -> Self {
        self.node_account_id = Some(node_account_id);
        self
    }

    pub fn with_parent(mut self, parent: RecordItem) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    pub fn with_sidecars(mut self, sidecars: Vec<SidecarRecord>) -> Self {
        self.sidecars = sidecars;
        self
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.body.transaction_type()
    }

    pub fn is_successful(&self) -> bool {
        self.receipt.status.is_successful()
    }

    /// Child records (including scheduled executions) have a parent.
    pub fn is_child(&self) -> bool {
        self.parent.is_some()
    }

    pub fn parent(&self) -> Option<&RecordItem> {
        self.parent.as_deref()
    }

    /// Entity ids touched by this record, populated by the projector.
    pub fn entity_ids(&self) -> &BTreeSet<EntityId> {
        &self.entity_ids
    }

    pub(crate) fn add_entity_ids(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        self.entity_ids
            .extend(ids.into_iter().filter(|id| !id.is_empty()));
    }

    /// Bytecode sidecar for a contract, if delivered with this record.
    pub fn bytecode_sidecar(&self, contract_id: EntityId) -> Option<(&[u8], &[u8])> {
        self.sidecars.iter().find_map(|sidecar| match sidecar {
            SidecarRecord::Bytecode {
                contract_id: id,
                initcode,
                runtime_bytecode,
            } if *id == contract_id => Some((initcode.as_slice(), runtime_bytecode.as_slice())),
            _ => None,
        })
    }
}
