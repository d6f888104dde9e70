//! Ledger domain model: identifiers, validity intervals, and every record the projection emits.
//!
//! Mutation records use `Option` fields where `None` means "unchanged". Only fields a
//! transaction explicitly changed are populated; the sink merges populated fields onto the
//! current version of the record.

/// Implements [`Historical`] for a mutation record.
///
/// `merge = [fields]` merges the listed `Option` fields; `merge = replace` replaces the
/// whole value (records without partial-update semantics).
macro_rules! impl_historical {
    (
        $t:ty,
        key: $key_ty:ty = [$($kf:ident),+],
        merge = [$($field:ident),* $(,)?]
        $(, add = [$($add:ident),* $(,)?])?
    ) => {
        impl $crate::domain::Historical for $t {
            type Key = $key_ty;

            fn history_key(&self) -> Self::Key {
                ($(self.$kf.clone()),+)
            }

            fn timestamp_range(&self) -> Option<$crate::domain::TimestampRange> {
                self.timestamp_range
            }

            fn set_timestamp_range(&mut self, range: Option<$crate::domain::TimestampRange>) {
                self.timestamp_range = range;
            }

            fn merge_from(&mut self, update: &Self) {
                $(
                    if update.$field.is_some() {
                        self.$field.clone_from(&update.$field);
                    }
                )*
                // Additive fields carry deltas.
                $($(
                    if let Some(delta) = update.$add {
                        self.$add = Some(self.$add.unwrap_or(0) + delta);
                    }
                )*)?
            }
        }
    };
    ($t:ty, key: $key_ty:ty = [$($kf:ident),+], merge = replace) => {
        impl $crate::domain::Historical for $t {
            type Key = $key_ty;

            fn history_key(&self) -> Self::Key {
                ($(self.$kf.clone()),+)
            }

            fn timestamp_range(&self) -> Option<$crate::domain::TimestampRange> {
                self.timestamp_range
            }

            fn set_timestamp_range(&mut self, range: Option<$crate::domain::TimestampRange>) {
                self.timestamp_range = range;
            }

            fn merge_from(&mut self, update: &Self) {
                let range = self.timestamp_range;
                self.clone_from(update);
                self.timestamp_range = range;
            }
        }
    };
}

mod contract;
mod entity;
mod hook;
mod patch;
mod token;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use contract::{ContractLog, ContractResult, ContractStateChange, EthereumTransaction};
pub use entity::{
    Contract, Entity, FileData, LiveHash, Node, NodeStake, Prng, Schedule, Topic, TopicMessage,
    Transaction, TransactionSignature,
};
pub use hook::{Hook, HookExtensionPoint, HookStorageChange, HookType};
pub use patch::Patch;
pub use token::{
    CryptoAllowance, CustomFee, FallbackFee, FixedFee, FractionalFee, Nft, NftAllowance,
    RoyaltyFee, Token, TokenAccount, TokenAirdrop, TokenAirdropState, TokenAllowance,
    TokenFreezeStatus, TokenKycStatus, TokenPauseStatus, TokenSupplyType, TokenType,
};

/// Canonical `shard.realm.num` identifier of a ledger entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    pub shard: i64,
    pub realm: i64,
    pub num: i64,
}

impl EntityId {
    /// The `0.0.0` id, used for "unresolved" and "not specified".
    pub const EMPTY: EntityId = EntityId::new(0, 0, 0);

    pub const fn new(shard: i64, realm: i64, num: i64) -> Self {
        Self { shard, realm, num }
    }

    /// Shorthand for an id in shard 0, realm 0.
    pub const fn of(num: i64) -> Self {
        Self::new(0, 0, num)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Long-zero EVM address of this id.
    pub fn to_evm_address(&self) -> [u8; 20] {
        mirror_common::long_zero_address(self.shard, self.realm, self.num)
    }

    /// The long-zero address left-padded to a 32-byte word, as used in log topics.
    pub fn to_evm_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&self.to_evm_address());
        word
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

impl FromStr for EntityId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        let parse = |part: &str| {
            part.parse::<i64>()
                .map_err(|e| format!("Invalid entity id '{s}': {e}"))
        };
        match parts.as_slice() {
            [num] => Ok(Self::of(parse(num)?)),
            [shard, realm, num] => Ok(Self::new(parse(shard)?, parse(realm)?, parse(num)?)),
            _ => Err(format!("Invalid entity id '{s}': expected shard.realm.num")),
        }
    }
}

impl TryFrom<String> for EntityId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.to_string()
    }
}

/// Kind of ledger object an [`Entity`] row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Account,
    Contract,
    File,
    Schedule,
    Token,
    Topic,
}

/// Half-open validity interval `[lower, upper)` in consensus nanoseconds.
///
/// `upper == None` marks the current version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampRange {
    pub lower: i64,
    pub upper: Option<i64>,
}

impl TimestampRange {
    /// An open-ended range starting at `lower`.
    pub const fn open(lower: i64) -> Self {
        Self { lower, upper: None }
    }

    pub const fn closed(lower: i64, upper: i64) -> Self {
        Self {
            lower,
            upper: Some(upper),
        }
    }

    pub fn is_current(&self) -> bool {
        self.upper.is_none()
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.lower && self.upper.map_or(true, |upper| timestamp < upper)
    }

    pub fn overlaps(&self, other: &TimestampRange) -> bool {
        let self_before_other = self.upper.is_some_and(|upper| upper <= other.lower);
        let other_before_self = other.upper.is_some_and(|upper| upper <= self.lower);
        !self_before_other && !other_before_self
    }
}

/// A record kept as a sequence of versions by the sink.
///
/// `merge_from` copies only the populated fields of `update` onto `self`; absent fields
/// never overwrite existing state.
pub trait Historical: Clone {
    type Key: Ord + Clone + fmt::Debug;

    fn history_key(&self) -> Self::Key;

    fn timestamp_range(&self) -> Option<TimestampRange>;

    fn set_timestamp_range(&mut self, range: Option<TimestampRange>);

    fn merge_from(&mut self, update: &Self);
}
