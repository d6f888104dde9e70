use serde::{Deserialize, Serialize};

use super::{EntityId, TimestampRange};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HookExtensionPoint {
    #[default]
    AccountAllowanceHook,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HookType {
    #[default]
    Lambda,
    Pure,
}

/// A hook attached to an account or contract.
///
/// A deletion is a tombstone carrying only the identifying fields and `deleted = true`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hook {
    pub hook_id: i64,
    pub owner_id: EntityId,
    pub timestamp_range: Option<TimestampRange>,
    pub created_timestamp: Option<i64>,
    pub admin_key: Option<Vec<u8>>,
    pub contract_id: Option<EntityId>,
    pub deleted: Option<bool>,
    pub extension_point: Option<HookExtensionPoint>,
    pub hook_type: Option<HookType>,
}

impl_historical!(
    Hook,
    key: (EntityId, i64) = [owner_id, hook_id],
    merge = [
        created_timestamp,
        admin_key,
        contract_id,
        deleted,
        extension_point,
        hook_type,
    ]
);

/// One resolved storage slot write of a hook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookStorageChange {
    pub consensus_timestamp: i64,
    pub hook_id: i64,
    pub owner_id: EntityId,
    pub key: Vec<u8>,
    pub value_read: Vec<u8>,
    pub value_written: Vec<u8>,
}
