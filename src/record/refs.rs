use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::EntityId;

/// A raw entity reference as it appears in a transaction body.
///
/// Numeric ids are already canonical. Aliases and EVM addresses may refer to entities whose
/// numeric id is only known to the resolver.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityRef {
    Id(EntityId),
    Alias(Vec<u8>),
    EvmAddress(Vec<u8>),
}

impl EntityRef {
    /// The numeric id if this reference carries one directly.
    pub fn as_id(&self) -> Option<EntityId> {
        match self {
            EntityRef::Id(id) => Some(*id),
            EntityRef::Alias(_) | EntityRef::EvmAddress(_) => None,
        }
    }

    /// Whether this is the "unset" reference (`0.0.0` or an empty alias/address).
    pub fn is_unset(&self) -> bool {
        match self {
            EntityRef::Id(id) => id.is_empty(),
            EntityRef::Alias(bytes) | EntityRef::EvmAddress(bytes) => bytes.is_empty(),
        }
    }
}

impl From<EntityId> for EntityRef {
    fn from(id: EntityId) -> Self {
        EntityRef::Id(id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Id(id) => write!(f, "{id}"),
            EntityRef::Alias(alias) => write!(f, "alias:{}", mirror_common::to_hex(alias)),
            EntityRef::EvmAddress(address) => {
                write!(f, "evm:{}", mirror_common::to_hex(address))
            }
        }
    }
}
