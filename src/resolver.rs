//! Entity reference resolution.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::domain::EntityId;
use crate::record::EntityRef;

/// Resolves an alias or EVM address reference to a canonical entity id.
///
/// Lookups never fail: an unknown reference is `None` and the caller records it as
/// unresolved.
pub trait EntityIdResolver {
    fn lookup(&self, reference: &EntityRef) -> Option<EntityId>;

    /// Freeze and KYC key presence of a token, if the resolver has seen it.
    fn token_keys(&self, _token_id: EntityId) -> Option<TokenKeys> {
        None
    }
}

/// Which of a token's association-relevant keys are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenKeys {
    pub freeze_key: bool,
    pub kyc_key: bool,
}

/// Deterministic in-memory resolver.
///
/// Uses interior mutability so a sink can register entities created by earlier records while
/// the projector holds a shared reference for later ones.
#[derive(Debug, Default)]
pub struct InMemoryEntityIdResolver {
    aliases: RwLock<BTreeMap<Vec<u8>, EntityId>>,
    evm_addresses: RwLock<BTreeMap<Vec<u8>, EntityId>>,
    token_keys: RwLock<BTreeMap<EntityId, TokenKeys>>,
}

impl InMemoryEntityIdResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_alias(&self, alias: Vec<u8>, id: EntityId) {
        if let Ok(mut aliases) = self.aliases.write() {
            aliases.insert(alias, id);
        }
    }

    pub fn register_evm_address(&self, evm_address: Vec<u8>, id: EntityId) {
        if let Ok(mut addresses) = self.evm_addresses.write() {
            addresses.insert(evm_address, id);
        }
    }

    /// Records key presence for a token. `None` leaves the previously known value.
    pub fn register_token_keys(
        &self,
        token_id: EntityId,
        freeze_key: Option<bool>,
        kyc_key: Option<bool>,
    ) {
        if let Ok(mut tokens) = self.token_keys.write() {
            let keys = tokens.entry(token_id).or_default();
            if let Some(freeze_key) = freeze_key {
                keys.freeze_key = freeze_key;
            }
            if let Some(kyc_key) = kyc_key {
                keys.kyc_key = kyc_key;
            }
        }
    }

    pub fn len(&self) -> usize {
        let aliases = self.aliases.read().map_or(0, |map| map.len());
        let addresses = self.evm_addresses.read().map_or(0, |map| map.len());
        aliases + addresses
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EntityIdResolver for InMemoryEntityIdResolver {
    fn lookup(&self, reference: &EntityRef) -> Option<EntityId> {
        match reference {
            EntityRef::Id(id) => Some(*id),
            EntityRef::Alias(alias) => {
                let found = self.aliases.read().ok()?.get(alias).copied();
                // A 20 byte alias is an EVM address alias.
                found.or_else(|| self.evm_addresses.read().ok()?.get(alias).copied())
            }
            EntityRef::EvmAddress(address) => {
                self.evm_addresses.read().ok()?.get(address).copied()
            }
        }
    }

    fn token_keys(&self, token_id: EntityId) -> Option<TokenKeys> {
        self.token_keys.read().ok()?.get(&token_id).copied()
    }
}

/// Resolver that knows nothing beyond numeric ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEntityIdResolver;

impl EntityIdResolver for NoopEntityIdResolver {
    fn lookup(&self, reference: &EntityRef) -> Option<EntityId> {
        reference.as_id()
    }
}
