//! Token, token relationship, custom fee, and allowance records.

use serde::{Deserialize, Serialize};

use super::{EntityId, TimestampRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenFreezeStatus {
    NotApplicable,
    Frozen,
    Unfrozen,
}

impl TokenFreezeStatus {
    /// Status of a freshly associated account: UNFROZEN when the token has a freeze key.
    pub fn for_association(has_freeze_key: bool) -> Self {
        if has_freeze_key {
            TokenFreezeStatus::Unfrozen
        } else {
            TokenFreezeStatus::NotApplicable
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKycStatus {
    NotApplicable,
    Granted,
    Revoked,
}

impl TokenKycStatus {
    /// Status of a freshly associated account: GRANTED when the token has a KYC key.
    pub fn for_association(has_kyc_key: bool) -> Self {
        if has_kyc_key {
            TokenKycStatus::Granted
        } else {
            TokenKycStatus::NotApplicable
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenPauseStatus {
    NotApplicable,
    Paused,
    Unpaused,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    #[default]
    FungibleCommon,
    NonFungibleUnique,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenSupplyType {
    #[default]
    Infinite,
    Finite,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub token_id: EntityId,
    pub timestamp_range: Option<TimestampRange>,
    pub created_timestamp: Option<i64>,
    pub decimals: Option<i32>,
    pub fee_schedule_key: Option<Vec<u8>>,
    pub freeze_default: Option<bool>,
    pub freeze_key: Option<Vec<u8>>,
    pub initial_supply: Option<i64>,
    pub kyc_key: Option<Vec<u8>>,
    pub max_supply: Option<i64>,
    pub metadata: Option<Vec<u8>>,
    pub metadata_key: Option<Vec<u8>>,
    pub name: Option<String>,
    pub pause_key: Option<Vec<u8>>,
    pub pause_status: Option<TokenPauseStatus>,
    pub supply_key: Option<Vec<u8>>,
    pub supply_type: Option<TokenSupplyType>,
    pub symbol: Option<String>,
    pub token_type: Option<TokenType>,
    pub total_supply: Option<i64>,
    pub treasury_account_id: Option<EntityId>,
    pub wipe_key: Option<Vec<u8>>,
}

impl Token {
    pub fn new(token_id: EntityId) -> Self {
        Self {
            token_id,
            ..Self::default()
        }
    }
}

impl_historical!(
    Token,
    key: EntityId = [token_id],
    merge = [
        created_timestamp,
        decimals,
        fee_schedule_key,
        freeze_default,
        freeze_key,
        initial_supply,
        kyc_key,
        max_supply,
        metadata,
        metadata_key,
        name,
        pause_key,
        pause_status,
        supply_key,
        supply_type,
        symbol,
        token_type,
        total_supply,
        treasury_account_id,
        wipe_key,
    ]
);

/// Association between an account and a token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccount {
    pub account_id: EntityId,
    pub token_id: EntityId,
    pub timestamp_range: Option<TimestampRange>,
    pub associated: Option<bool>,
    pub automatic_association: Option<bool>,
    /// Balance change in the token's smallest unit, or serial count for NFTs.
    pub balance: Option<i64>,
    pub balance_timestamp: Option<i64>,
    pub created_timestamp: Option<i64>,
    pub freeze_status: Option<TokenFreezeStatus>,
    pub kyc_status: Option<TokenKycStatus>,
}

impl TokenAccount {
    pub fn new(account_id: EntityId, token_id: EntityId) -> Self {
        Self {
            account_id,
            token_id,
            ..Self::default()
        }
    }
}

impl_historical!(
    TokenAccount,
    key: (EntityId, EntityId) = [account_id, token_id],
    merge = [
        associated,
        automatic_association,
        balance_timestamp,
        created_timestamp,
        freeze_status,
        kyc_status,
    ],
    add = [balance]
);

/// Non-fungible token instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nft {
    pub token_id: EntityId,
    pub serial_number: i64,
    pub timestamp_range: Option<TimestampRange>,
    pub account_id: Option<EntityId>,
    pub created_timestamp: Option<i64>,
    pub deleted: Option<bool>,
    pub delegating_spender: Option<EntityId>,
    pub metadata: Option<Vec<u8>>,
    pub spender: Option<EntityId>,
}

impl Nft {
    pub fn new(token_id: EntityId, serial_number: i64) -> Self {
        Self {
            token_id,
            serial_number,
            ..Self::default()
        }
    }
}

impl_historical!(
    Nft,
    key: (EntityId, i64) = [token_id, serial_number],
    merge = [
        account_id,
        created_timestamp,
        deleted,
        delegating_spender,
        metadata,
        spender,
    ]
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenAirdropState {
    Pending,
    Cancelled,
    Claimed,
}

/// Pending airdrop between a sender and a receiver. HBAR airdrops use an empty token id and
/// fungible airdrops use serial number 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAirdrop {
    pub sender_account_id: EntityId,
    pub receiver_account_id: EntityId,
    pub token_id: EntityId,
    pub serial_number: i64,
    pub timestamp_range: Option<TimestampRange>,
    pub amount: Option<i64>,
    pub state: TokenAirdropState,
}

impl_historical!(
    TokenAirdrop,
    key: (EntityId, EntityId, EntityId, i64) = [sender_account_id, receiver_account_id, token_id, serial_number],
    merge = replace
);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedFee {
    pub amount: i64,
    pub collector_account_id: EntityId,
    pub denominating_token_id: Option<EntityId>,
    pub all_collectors_are_exempt: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FractionalFee {
    pub numerator: i64,
    pub denominator: i64,
    pub minimum_amount: i64,
    pub maximum_amount: Option<i64>,
    pub net_of_transfers: bool,
    pub collector_account_id: EntityId,
    pub all_collectors_are_exempt: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackFee {
    pub amount: i64,
    pub denominating_token_id: Option<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoyaltyFee {
    pub numerator: i64,
    pub denominator: i64,
    pub fallback_fee: Option<FallbackFee>,
    pub collector_account_id: EntityId,
    pub all_collectors_are_exempt: bool,
}

/// Fee schedule of a token or topic as of a timestamp.
///
/// A row with every fee list `None` means "no custom fees from this timestamp on".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFee {
    pub entity_id: EntityId,
    pub timestamp_range: Option<TimestampRange>,
    pub fixed_fees: Option<Vec<FixedFee>>,
    pub fractional_fees: Option<Vec<FractionalFee>>,
    pub royalty_fees: Option<Vec<RoyaltyFee>>,
}

impl CustomFee {
    pub fn is_empty(&self) -> bool {
        self.fixed_fees.is_none() && self.fractional_fees.is_none() && self.royalty_fees.is_none()
    }
}

impl_historical!(CustomFee, key: EntityId = [entity_id], merge = replace);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoAllowance {
    pub owner: EntityId,
    pub spender: EntityId,
    pub timestamp_range: Option<TimestampRange>,
    pub amount: i64,
    pub amount_granted: i64,
    pub payer_account_id: EntityId,
}

impl_historical!(
    CryptoAllowance,
    key: (EntityId, EntityId) = [owner, spender],
    merge = replace
);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAllowance {
    pub owner: EntityId,
    pub spender: EntityId,
    pub token_id: EntityId,
    pub timestamp_range: Option<TimestampRange>,
    pub amount: i64,
    pub amount_granted: i64,
    pub payer_account_id: EntityId,
}

impl_historical!(
    TokenAllowance,
    key: (EntityId, EntityId, EntityId) = [owner, spender, token_id],
    merge = replace
);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftAllowance {
    pub owner: EntityId,
    pub spender: EntityId,
    pub token_id: EntityId,
    pub timestamp_range: Option<TimestampRange>,
    pub approved_for_all: bool,
    pub payer_account_id: EntityId,
}

impl_historical!(
    NftAllowance,
    key: (EntityId, EntityId, EntityId) = [owner, spender, token_id],
    merge = replace
);
