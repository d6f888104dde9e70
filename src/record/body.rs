//! Decoded transaction bodies, one variant per transaction kind.
//!
//! Create bodies use plain `Option` for optional inputs. Update bodies use [`Patch`] so an
//! explicit default value ("clear the memo", "auto-renew period 0") is distinguishable from
//! a field that was never specified.

use serde::{Deserialize, Serialize};

use super::EntityRef;
use crate::domain::{EntityId, HookExtensionPoint, Patch, TokenSupplyType, TokenType};

macro_rules! transaction_types {
    ($($variant:ident = $code:literal),+ $(,)?) => {
        /// Closed set of transaction kinds with their protocol discriminant codes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum TransactionType {
            $($variant,)+
            Unknown,
        }

        impl TransactionType {
            /// Every declared kind, excluding [`TransactionType::Unknown`].
            pub const ALL: &'static [TransactionType] = &[$(TransactionType::$variant),+];

            pub const fn code(self) -> i32 {
                match self {
                    $(TransactionType::$variant => $code,)+
                    TransactionType::Unknown => -1,
                }
            }

            /// Maps a protocol code to its kind; unrecognized codes map to `Unknown`.
            pub const fn from_code(code: i32) -> Self {
                match code {
                    $($code => TransactionType::$variant,)+
                    _ => TransactionType::Unknown,
                }
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $(TransactionType::$variant => stringify!($variant),)+
                    TransactionType::Unknown => "Unknown",
                }
            }
        }
    };
}

transaction_types! {
    ContractCall = 7,
    ContractCreate = 8,
    ContractUpdate = 9,
    CryptoAddLiveHash = 10,
    CryptoCreate = 11,
    CryptoDelete = 12,
    CryptoDeleteLiveHash = 13,
    CryptoTransfer = 14,
    CryptoUpdate = 15,
    FileAppend = 16,
    FileCreate = 17,
    FileDelete = 18,
    FileUpdate = 19,
    SystemDelete = 20,
    SystemUndelete = 21,
    ContractDelete = 22,
    Freeze = 23,
    ConsensusCreateTopic = 24,
    ConsensusUpdateTopic = 25,
    ConsensusDeleteTopic = 26,
    ConsensusSubmitMessage = 27,
    UncheckedSubmit = 28,
    TokenCreate = 29,
    TokenFreeze = 31,
    TokenUnfreeze = 32,
    TokenGrantKyc = 33,
    TokenRevokeKyc = 34,
    TokenDelete = 35,
    TokenUpdate = 36,
    TokenMint = 37,
    TokenBurn = 38,
    TokenWipe = 39,
    TokenAssociate = 40,
    TokenDissociate = 41,
    ScheduleCreate = 42,
    ScheduleDelete = 43,
    ScheduleSign = 44,
    TokenFeeScheduleUpdate = 45,
    TokenPause = 46,
    TokenUnpause = 47,
    CryptoApproveAllowance = 48,
    CryptoDeleteAllowance = 49,
    EthereumTransaction = 50,
    NodeStakeUpdate = 51,
    UtilPrng = 52,
    TokenUpdateNfts = 53,
    NodeCreate = 54,
    NodeUpdate = 55,
    NodeDelete = 56,
    TokenReject = 57,
    TokenAirdrop = 58,
    TokenCancelAirdrop = 59,
    TokenClaimAirdrop = 60,
    AtomicBatch = 74,
    HookStore = 75,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The decoded body of one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionBody {
    ConsensusCreateTopic(ConsensusCreateTopicBody),
    ConsensusUpdateTopic(ConsensusUpdateTopicBody),
    ConsensusDeleteTopic(TopicRefBody),
    ConsensusSubmitMessage(ConsensusSubmitMessageBody),
    ContractCall(ContractCallBody),
    ContractCreate(ContractCreateBody),
    ContractUpdate(ContractUpdateBody),
    ContractDelete(ContractDeleteBody),
    CryptoAddLiveHash(LiveHashBody),
    CryptoDeleteLiveHash(LiveHashBody),
    CryptoApproveAllowance(CryptoApproveAllowanceBody),
    CryptoDeleteAllowance(CryptoDeleteAllowanceBody),
    CryptoCreate(CryptoCreateBody),
    CryptoUpdate(CryptoUpdateBody),
    CryptoDelete(CryptoDeleteBody),
    CryptoTransfer(CryptoTransferBody),
    EthereumTransaction(EthereumTransactionBody),
    FileCreate(FileCreateBody),
    FileUpdate(FileUpdateBody),
    FileAppend(FileAppendBody),
    FileDelete(FileRefBody),
    Freeze(FreezeBody),
    NodeCreate(NodeCreateBody),
    NodeUpdate(NodeUpdateBody),
    NodeDelete(NodeDeleteBody),
    NodeStakeUpdate(NodeStakeUpdateBody),
    ScheduleCreate(ScheduleCreateBody),
    ScheduleSign(ScheduleRefBody),
    ScheduleDelete(ScheduleRefBody),
    SystemDelete(SystemDeleteBody),
    SystemUndelete(SystemUndeleteBody),
    TokenAirdrop(TokenAirdropBody),
    TokenCancelAirdrop(PendingAirdropsBody),
    TokenClaimAirdrop(PendingAirdropsBody),
    TokenAssociate(TokenAssociationBody),
    TokenDissociate(TokenAssociationBody),
    TokenCreate(TokenCreateBody),
    TokenUpdate(TokenUpdateBody),
    TokenDelete(TokenRefBody),
    TokenFeeScheduleUpdate(TokenFeeScheduleUpdateBody),
    TokenFreeze(TokenAccountBody),
    TokenUnfreeze(TokenAccountBody),
    TokenGrantKyc(TokenAccountBody),
    TokenRevokeKyc(TokenAccountBody),
    TokenPause(TokenRefBody),
    TokenUnpause(TokenRefBody),
    TokenMint(TokenMintBody),
    TokenBurn(TokenBurnBody),
    TokenWipe(TokenWipeBody),
    TokenReject(TokenRejectBody),
    TokenUpdateNfts(TokenUpdateNftsBody),
    HookStore(HookStoreBody),
    UtilPrng(UtilPrngBody),
    UncheckedSubmit(OpaqueBody),
    AtomicBatch(AtomicBatchBody),
    #[serde(other)]
    Unknown,
}

impl TransactionBody {
    pub fn transaction_type(&self) -> TransactionType {
        use TransactionBody as B;
        use TransactionType as T;

        match self {
            B::ConsensusCreateTopic(_) => T::ConsensusCreateTopic,
            B::ConsensusUpdateTopic(_) => T::ConsensusUpdateTopic,
            B::ConsensusDeleteTopic(_) => T::ConsensusDeleteTopic,
            B::ConsensusSubmitMessage(_) => T::ConsensusSubmitMessage,
            B::ContractCall(_) => T::ContractCall,
            B::ContractCreate(_) => T::ContractCreate,
            B::ContractUpdate(_) => T::ContractUpdate,
            B::ContractDelete(_) => T::ContractDelete,
            B::CryptoAddLiveHash(_) => T::CryptoAddLiveHash,
            B::CryptoDeleteLiveHash(_) => T::CryptoDeleteLiveHash,
            B::CryptoApproveAllowance(_) => T::CryptoApproveAllowance,
            B::CryptoDeleteAllowance(_) => T::CryptoDeleteAllowance,
            B::CryptoCreate(_) => T::CryptoCreate,
            B::CryptoUpdate(_) => T::CryptoUpdate,
            B::CryptoDelete(_) => T::CryptoDelete,
            B::CryptoTransfer(_) => T::CryptoTransfer,
            B::EthereumTransaction(_) => T::EthereumTransaction,
            B::FileCreate(_) => T::FileCreate,
            B::FileUpdate(_) => T::FileUpdate,
            B::FileAppend(_) => T::FileAppend,
            B::FileDelete(_) => T::FileDelete,
            B::Freeze(_) => T::Freeze,
            B::NodeCreate(_) => T::NodeCreate,
            B::NodeUpdate(_) => T::NodeUpdate,
            B::NodeDelete(_) => T::NodeDelete,
            B::NodeStakeUpdate(_) => T::NodeStakeUpdate,
            B::ScheduleCreate(_) => T::ScheduleCreate,
            B::ScheduleSign(_) => T::ScheduleSign,
            B::ScheduleDelete(_) => T::ScheduleDelete,
            B::SystemDelete(_) => T::SystemDelete,
            B::SystemUndelete(_) => T::SystemUndelete,
            B::TokenAirdrop(_) => T::TokenAirdrop,
            B::TokenCancelAirdrop(_) => T::TokenCancelAirdrop,
            B::TokenClaimAirdrop(_) => T::TokenClaimAirdrop,
            B::TokenAssociate(_) => T::TokenAssociate,
            B::TokenDissociate(_) => T::TokenDissociate,
            B::TokenCreate(_) => T::TokenCreate,
            B::TokenUpdate(_) => T::TokenUpdate,
            B::TokenDelete(_) => T::TokenDelete,
            B::TokenFeeScheduleUpdate(_) => T::TokenFeeScheduleUpdate,
            B::TokenFreeze(_) => T::TokenFreeze,
            B::TokenUnfreeze(_) => T::TokenUnfreeze,
            B::TokenGrantKyc(_) => T::TokenGrantKyc,
            B::TokenRevokeKyc(_) => T::TokenRevokeKyc,
            B::TokenPause(_) => T::TokenPause,
            B::TokenUnpause(_) => T::TokenUnpause,
            B::TokenMint(_) => T::TokenMint,
            B::TokenBurn(_) => T::TokenBurn,
            B::TokenWipe(_) => T::TokenWipe,
            B::TokenReject(_) => T::TokenReject,
            B::TokenUpdateNfts(_) => T::TokenUpdateNfts,
            B::HookStore(_) => T::HookStore,
            B::UtilPrng(_) => T::UtilPrng,
            B::UncheckedSubmit(_) => T::UncheckedSubmit,
            B::AtomicBatch(_) => T::AtomicBatch,
            B::Unknown => T::Unknown,
        }
    }
}

// ===== Consensus service =====

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusCreateTopicBody {
    pub admin_key: Option<Vec<u8>>,
    pub auto_renew_account: Option<EntityRef>,
    pub auto_renew_period: Option<i64>,
    pub custom_fees: Vec<CustomFeeSpec>,
    /// Serialized keys; absent means an empty list.
    pub fee_exempt_key_list: Option<Vec<Vec<u8>>>,
    pub fee_schedule_key: Option<Vec<u8>>,
    pub memo: String,
    pub submit_key: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusUpdateTopicBody {
    pub topic: Option<EntityRef>,
    pub admin_key: Patch<Vec<u8>>,
    pub auto_renew_account: Patch<EntityRef>,
    pub auto_renew_period: Patch<i64>,
    pub custom_fees: Patch<Vec<CustomFeeSpec>>,
    pub expiration_time: Patch<i64>,
    pub fee_exempt_key_list: Patch<Vec<Vec<u8>>>,
    pub fee_schedule_key: Patch<Vec<u8>>,
    pub memo: Patch<String>,
    pub submit_key: Patch<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicRefBody {
    pub topic: Option<EntityRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusSubmitMessageBody {
    pub topic: Option<EntityRef>,
    pub message: Vec<u8>,
    pub chunk_info: Option<ChunkInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkInfo {
    pub initial_transaction_valid_start: i64,
    pub number: i32,
    pub total: i32,
}

// ===== Smart contract service =====

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractCallBody {
    pub contract: Option<EntityRef>,
    pub amount: i64,
    pub function_parameters: Vec<u8>,
    pub gas: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractCreateBody {
    pub admin_key: Option<Vec<u8>>,
    pub auto_renew_account: Option<EntityRef>,
    pub auto_renew_period: Option<i64>,
    pub constructor_parameters: Vec<u8>,
    pub decline_reward: bool,
    pub file_id: Option<EntityId>,
    pub gas: i64,
    pub hook_creation_details: Vec<HookCreationDetails>,
    pub initial_balance: i64,
    pub initcode: Option<Vec<u8>>,
    pub max_automatic_token_associations: Option<i32>,
    pub memo: String,
    pub staked_account: Option<EntityRef>,
    pub staked_node_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractUpdateBody {
    pub contract: Option<EntityRef>,
    pub admin_key: Patch<Vec<u8>>,
    pub auto_renew_account: Patch<EntityRef>,
    pub auto_renew_period: Patch<i64>,
    pub decline_reward: Patch<bool>,
    pub expiration_time: Patch<i64>,
    pub hook_creation_details: Vec<HookCreationDetails>,
    pub hook_ids_to_delete: Vec<i64>,
    pub max_automatic_token_associations: Patch<i32>,
    pub memo: Patch<String>,
    pub staked_account: Patch<EntityRef>,
    pub staked_node_id: Patch<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractDeleteBody {
    pub contract: Option<EntityRef>,
    pub permanent_removal: bool,
    pub transfer_account: Option<EntityRef>,
    pub transfer_contract: Option<EntityRef>,
}

/// Ethereum transaction fields, already decoded from the raw RLP payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EthereumTransactionBody {
    pub ethereum_data: Vec<u8>,
    pub call_data_id: Option<EntityId>,
    pub max_gas_allowance: i64,
    pub call_data: Vec<u8>,
    pub chain_id: Option<Vec<u8>>,
    pub gas_limit: i64,
    pub gas_price: Option<Vec<u8>>,
    pub max_fee_per_gas: Option<Vec<u8>>,
    pub max_priority_fee_per_gas: Option<Vec<u8>>,
    pub nonce: i64,
    pub signature_r: Option<Vec<u8>>,
    pub signature_s: Option<Vec<u8>>,
    pub to_address: Option<Vec<u8>>,
    pub transaction_type: i32,
    pub value: Option<Vec<u8>>,
}

// ===== Crypto service =====

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveHashBody {
    pub account: Option<EntityRef>,
    pub hash: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoApproveAllowanceBody {
    pub crypto_allowances: Vec<CryptoAllowanceGrant>,
    pub nft_allowances: Vec<NftAllowanceGrant>,
    pub token_allowances: Vec<TokenAllowanceGrant>,
}

/// An `owner` of `None` (or an unset reference) means the fee payer owns the allowance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoAllowanceGrant {
    pub owner: Option<EntityRef>,
    pub spender: Option<EntityRef>,
    pub amount: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenAllowanceGrant {
    pub owner: Option<EntityRef>,
    pub spender: Option<EntityRef>,
    pub token_id: EntityId,
    pub amount: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NftAllowanceGrant {
    pub owner: Option<EntityRef>,
    pub spender: Option<EntityRef>,
    pub token_id: EntityId,
    pub approved_for_all: Patch<bool>,
    pub delegating_spender: Option<EntityRef>,
    pub serial_numbers: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoDeleteAllowanceBody {
    pub nft_allowances: Vec<NftRemoveAllowance>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NftRemoveAllowance {
    pub owner: Option<EntityRef>,
    pub token_id: EntityId,
    pub serial_numbers: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoCreateBody {
    pub alias: Vec<u8>,
    pub auto_renew_period: Option<i64>,
    pub decline_reward: bool,
    pub hook_creation_details: Vec<HookCreationDetails>,
    pub initial_balance: i64,
    pub key: Option<Vec<u8>>,
    pub max_automatic_token_associations: Option<i32>,
    pub memo: String,
    pub proxy_account: Option<EntityRef>,
    pub receiver_sig_required: bool,
    pub staked_account: Option<EntityRef>,
    pub staked_node_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoUpdateBody {
    pub account: Option<EntityRef>,
    pub auto_renew_period: Patch<i64>,
    pub decline_reward: Patch<bool>,
    pub expiration_time: Patch<i64>,
    pub hook_creation_details: Vec<HookCreationDetails>,
    pub hook_ids_to_delete: Vec<i64>,
    pub key: Patch<Vec<u8>>,
    pub max_automatic_token_associations: Patch<i32>,
    pub memo: Patch<String>,
    pub proxy_account: Patch<EntityRef>,
    pub receiver_sig_required: Patch<bool>,
    pub staked_account: Patch<EntityRef>,
    pub staked_node_id: Patch<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoDeleteBody {
    pub account: Option<EntityRef>,
    pub transfer_account: Option<EntityRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoTransferBody {
    pub transfers: Vec<TransferRef>,
    pub token_transfers: Vec<TokenTransferRefs>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferRef {
    pub account: Option<EntityRef>,
    pub amount: i64,
    pub is_approval: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NftTransferRef {
    pub sender: Option<EntityRef>,
    pub receiver: Option<EntityRef>,
    pub serial_number: i64,
    pub is_approval: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenTransferRefs {
    pub token_id: EntityId,
    pub transfers: Vec<TransferRef>,
    pub nft_transfers: Vec<NftTransferRef>,
}

// ===== File service =====

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCreateBody {
    pub contents: Vec<u8>,
    pub expiration_time: Option<i64>,
    /// Serialized keys making up the file's key list.
    pub keys: Option<Vec<Vec<u8>>>,
    pub memo: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileUpdateBody {
    pub file: Option<EntityId>,
    pub contents: Patch<Vec<u8>>,
    pub expiration_time: Patch<i64>,
    pub keys: Patch<Vec<Vec<u8>>>,
    pub memo: Patch<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAppendBody {
    pub file: Option<EntityId>,
    pub contents: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRefBody {
    pub file: Option<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemDeleteBody {
    pub contract: Option<EntityRef>,
    pub file: Option<EntityId>,
    pub expiration_time: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemUndeleteBody {
    pub contract: Option<EntityRef>,
    pub file: Option<EntityId>,
}

// ===== Network and node administration =====

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreezeBody {
    pub file_hash: Vec<u8>,
    pub file_id: Option<EntityId>,
    pub freeze_type: i32,
    pub start_time: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeCreateBody {
    pub account: Option<EntityRef>,
    pub admin_key: Option<Vec<u8>>,
    pub decline_reward: bool,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeUpdateBody {
    pub node_id: i64,
    pub account: Patch<EntityRef>,
    pub admin_key: Patch<Vec<u8>>,
    pub decline_reward: Patch<bool>,
    pub description: Patch<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeDeleteBody {
    pub node_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStakeUpdateBody {
    pub end_of_staking_period: i64,
    pub node_stakes: Vec<NodeStakeEntry>,
    pub staking_period: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStakeEntry {
    pub node_id: i64,
    pub max_stake: i64,
    pub min_stake: i64,
    pub reward_rate: i64,
    pub stake: i64,
    pub stake_not_rewarded: i64,
    pub stake_rewarded: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UtilPrngBody {
    pub range: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpaqueBody {
    pub transaction_bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtomicBatchBody {
    pub transactions: Vec<Vec<u8>>,
}

// ===== Schedule service =====

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleCreateBody {
    pub admin_key: Option<Vec<u8>>,
    pub expiration_time: Option<i64>,
    pub memo: String,
    pub payer_account: Option<EntityRef>,
    pub scheduled_transaction_body: Vec<u8>,
    pub wait_for_expiry: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleRefBody {
    pub schedule: Option<EntityId>,
}

// ===== Token service =====

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenCreateBody {
    pub admin_key: Option<Vec<u8>>,
    pub auto_renew_account: Option<EntityRef>,
    pub auto_renew_period: Option<i64>,
    pub custom_fees: Vec<CustomFeeSpec>,
    pub decimals: i32,
    pub expiration_time: Option<i64>,
    pub fee_schedule_key: Option<Vec<u8>>,
    pub freeze_default: bool,
    pub freeze_key: Option<Vec<u8>>,
    pub initial_supply: i64,
    pub kyc_key: Option<Vec<u8>>,
    pub max_supply: i64,
    pub memo: String,
    pub metadata: Vec<u8>,
    pub metadata_key: Option<Vec<u8>>,
    pub name: String,
    pub pause_key: Option<Vec<u8>>,
    pub supply_key: Option<Vec<u8>>,
    pub supply_type: TokenSupplyType,
    pub symbol: String,
    pub token_type: TokenType,
    pub treasury: Option<EntityRef>,
    pub wipe_key: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUpdateBody {
    pub token: Option<EntityId>,
    pub admin_key: Patch<Vec<u8>>,
    pub auto_renew_account: Patch<EntityRef>,
    pub auto_renew_period: Patch<i64>,
    pub expiration_time: Patch<i64>,
    pub fee_schedule_key: Patch<Vec<u8>>,
    pub freeze_key: Patch<Vec<u8>>,
    pub kyc_key: Patch<Vec<u8>>,
    pub memo: Patch<String>,
    pub metadata: Patch<Vec<u8>>,
    pub metadata_key: Patch<Vec<u8>>,
    pub name: Patch<String>,
    pub pause_key: Patch<Vec<u8>>,
    pub supply_key: Patch<Vec<u8>>,
    pub symbol: Patch<String>,
    pub treasury: Patch<EntityRef>,
    pub wipe_key: Patch<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenRefBody {
    pub token: Option<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenFeeScheduleUpdateBody {
    pub token: Option<EntityId>,
    pub custom_fees: Vec<CustomFeeSpec>,
}

/// Body shared by freeze, unfreeze, grant KYC, and revoke KYC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenAccountBody {
    pub token: Option<EntityId>,
    pub account: Option<EntityRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenAssociationBody {
    pub account: Option<EntityRef>,
    pub tokens: Vec<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenMintBody {
    pub token: Option<EntityId>,
    pub amount: i64,
    pub metadata: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenBurnBody {
    pub token: Option<EntityId>,
    pub amount: i64,
    pub serial_numbers: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenWipeBody {
    pub token: Option<EntityId>,
    pub account: Option<EntityRef>,
    pub amount: i64,
    pub serial_numbers: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenRejectBody {
    pub owner: Option<EntityRef>,
    pub rejections: Vec<TokenRejection>,
}

/// `serial_number` is `None` for a fungible rejection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenRejection {
    pub token_id: EntityId,
    pub serial_number: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUpdateNftsBody {
    pub token: Option<EntityId>,
    pub metadata: Patch<Vec<u8>>,
    pub serial_numbers: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenAirdropBody {
    pub token_transfers: Vec<TokenTransferRefs>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PendingAirdropsBody {
    pub pending_airdrops: Vec<PendingAirdropId>,
}

/// Identifies a pending airdrop. `serial_number` is `None` for fungible tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PendingAirdropId {
    pub sender: Option<EntityRef>,
    pub receiver: Option<EntityRef>,
    pub token_id: EntityId,
    pub serial_number: Option<i64>,
}

// ===== Custom fees =====

/// One entry of a custom fee schedule as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomFeeKind {
    Fixed(FixedFeeSpec),
    Fractional(FractionalFeeSpec),
    Royalty(RoyaltyFeeSpec),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFeeSpec {
    pub fee: CustomFeeKind,
    #[serde(default)]
    pub collector: Option<EntityId>,
    #[serde(default)]
    pub all_collectors_are_exempt: bool,
}

/// `denominating_token_id` of `0.0.0` denotes "the token this fee belongs to".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedFeeSpec {
    pub amount: i64,
    pub denominating_token_id: Option<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FractionalFeeSpec {
    pub numerator: i64,
    pub denominator: i64,
    pub minimum_amount: i64,
    pub maximum_amount: i64,
    pub net_of_transfers: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoyaltyFeeSpec {
    pub numerator: i64,
    pub denominator: i64,
    pub fallback_fee: Option<FixedFeeSpec>,
}

// ===== Hooks =====

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookCreationDetails {
    pub hook_id: i64,
    pub admin_key: Option<Vec<u8>>,
    pub extension_point: HookExtensionPoint,
    pub lambda_evm_hook: Option<LambdaEvmHook>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LambdaEvmHook {
    pub contract_id: Option<EntityId>,
    pub storage_updates: Vec<HookStorageUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookStoreBody {
    /// Owner of the hook: an account or a contract.
    pub owner: Option<EntityRef>,
    pub hook_id: i64,
    pub storage_updates: Vec<HookStorageUpdate>,
}

/// A storage update addressed either directly by slot or through a Solidity mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookStorageUpdate {
    StorageSlot {
        key: Vec<u8>,
        #[serde(default)]
        value: Vec<u8>,
    },
    MappingEntries {
        mapping_slot: Vec<u8>,
        entries: Vec<MappingEntry>,
    },
}

/// Exactly one of `key` and `preimage` is expected; `key` wins when both are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingEntry {
    pub key: Option<Vec<u8>>,
    pub preimage: Option<Vec<u8>>,
    pub value: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique_and_round_trip() {
        let mut seen = std::collections::BTreeSet::new();
        for &kind in TransactionType::ALL {
            assert!(seen.insert(kind.code()), "duplicate code for {kind}");
            assert_eq!(TransactionType::from_code(kind.code()), kind);
        }
        assert!(!TransactionType::ALL.contains(&TransactionType::Unknown));
    }

    #[test]
    fn test_unknown_code_maps_to_unknown() {
        assert_eq!(TransactionType::from_code(30), TransactionType::Unknown);
        assert_eq!(TransactionType::from_code(9999), TransactionType::Unknown);
        assert_eq!(TransactionType::Unknown.code(), -1);
    }

    #[test]
    fn test_body_deserialization() {
        let body: TransactionBody = serde_json::from_str(
            r#"{"type": "CONSENSUS_UPDATE_TOPIC", "topic": {"id": "0.0.5"}, "memo": ""}"#,
        )
        .unwrap();
        let TransactionBody::ConsensusUpdateTopic(update) = &body else {
            panic!("unexpected body {body:?}");
        };
        assert_eq!(update.memo, Patch::Set(String::new()));
        assert_eq!(update.admin_key, Patch::Unset);
        assert_eq!(body.transaction_type(), TransactionType::ConsensusUpdateTopic);

        let unknown: TransactionBody =
            serde_json::from_str(r#"{"type": "SOMETHING_NEW"}"#).unwrap();
        assert_eq!(unknown.transaction_type(), TransactionType::Unknown);
    }
}
