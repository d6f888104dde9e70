//! In-memory reference sink.
//!
//! Turns partial mutations into copy-on-write version histories: a mutation at a later
//! timestamp closes the current version at that timestamp and opens a new one carrying the
//! merged fields; a mutation at the same timestamp merges into the current version in place.

use std::collections::BTreeMap;

use anyhow::Context;

use super::{EntityListener, Mutation};
use crate::domain::{
    Contract, CryptoAllowance, CustomFee, Entity, EntityId, Historical, Hook, HookStorageChange,
    Nft, NftAllowance, Node, Token, TokenAccount, TokenAirdrop, TokenAllowance, TimestampRange,
    Topic, Transaction,
};
use crate::error::{ImporterError, Result};

/// Ordered version history of one record family, keyed by the record's identity.
#[derive(Debug, Clone)]
pub struct HistoryTable<T: Historical> {
    rows: BTreeMap<T::Key, Vec<T>>,
}

impl<T: Historical> Default for HistoryTable<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }
}

impl<T: Historical> HistoryTable<T> {
    /// Applies a partial mutation to the history of its key.
    pub fn apply(&mut self, update: T) -> Result<()> {
        let key = update.history_key();
        let versions = self.rows.entry(key.clone()).or_default();
        let Some(current) = versions.last_mut() else {
            versions.push(update);
            return Ok(());
        };

        let current_lower = current.timestamp_range().map(|range| range.lower);
        let Some(range) = update.timestamp_range() else {
            current.merge_from(&update);
            return Ok(());
        };

        match current_lower {
            Some(lower) if lower == range.lower => {
                current.merge_from(&update);
            }
            // An unversioned row (balance changes seen before any lifecycle event) takes the
            // first range it is given.
            None => {
                current.merge_from(&update);
                current.set_timestamp_range(Some(range));
            }
            Some(lower) if range.lower < lower => {
                return Err(ImporterError::OutOfOrder {
                    key: format!("{key:?}"),
                    timestamp: range.lower,
                    current: lower,
                });
            }
            Some(lower) => {
                let mut next = current.clone();
                next.merge_from(&update);
                next.set_timestamp_range(Some(range));
                current.set_timestamp_range(Some(TimestampRange::closed(lower, range.lower)));
                versions.push(next);
            }
        }
        Ok(())
    }

    /// The current (open-ended) version.
    pub fn current(&self, key: &T::Key) -> Option<&T> {
        self.rows.get(key).and_then(|versions| versions.last())
    }

    /// All versions of a key, oldest first.
    pub fn history(&self, key: &T::Key) -> &[T] {
        self.rows.get(key).map_or(&[][..], Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &T::Key> {
        self.rows.keys()
    }

    /// Iterates the current version of every key.
    pub fn current_rows(&self) -> impl Iterator<Item = &T> {
        self.rows.values().filter_map(|versions| versions.last())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Checks that each key's versions are time ordered and never overlap.
    pub fn validate(&self) -> Result<()> {
        for (key, versions) in &self.rows {
            for pair in versions.windows(2) {
                let (Some(earlier), Some(later)) =
                    (pair[0].timestamp_range(), pair[1].timestamp_range())
                else {
                    continue;
                };
                if earlier.overlaps(&later) || later.lower < earlier.lower {
                    return Err(ImporterError::OutOfOrder {
                        key: format!("{key:?}"),
                        timestamp: later.lower,
                        current: earlier.lower,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Reference ledger holding the mutation log plus version histories of every entity family.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    mutations: Vec<Mutation>,
    pub entities: HistoryTable<Entity>,
    pub topics: HistoryTable<Topic>,
    pub nodes: HistoryTable<Node>,
    pub tokens: HistoryTable<Token>,
    pub token_accounts: HistoryTable<TokenAccount>,
    pub nfts: HistoryTable<Nft>,
    pub token_airdrops: HistoryTable<TokenAirdrop>,
    pub custom_fees: HistoryTable<CustomFee>,
    pub crypto_allowances: HistoryTable<CryptoAllowance>,
    pub token_allowances: HistoryTable<TokenAllowance>,
    pub nft_allowances: HistoryTable<NftAllowance>,
    pub hooks: HistoryTable<Hook>,
    contracts: BTreeMap<EntityId, Contract>,
    hook_storage: BTreeMap<(EntityId, i64, Vec<u8>), Vec<u8>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every mutation received, in emission order.
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.mutations.iter().filter_map(|mutation| match mutation {
            Mutation::Transaction(transaction) => Some(transaction),
            _ => None,
        })
    }

    /// Mutations of one kind, e.g. `"topic_message"`.
    pub fn mutations_of(&self, kind: &str) -> impl Iterator<Item = &Mutation> + '_ {
        let kind = kind.to_string();
        self.mutations
            .iter()
            .filter(move |mutation| mutation.kind() == kind)
    }

    pub fn contract(&self, id: &EntityId) -> Option<&Contract> {
        self.contracts.get(id)
    }

    /// Current value of a hook storage slot; cleared slots are absent.
    pub fn hook_storage(&self, owner_id: EntityId, hook_id: i64, key: &[u8]) -> Option<&[u8]> {
        self.hook_storage
            .get(&(owner_id, hook_id, key.to_vec()))
            .map(Vec::as_slice)
    }

    pub fn hook_storage_len(&self) -> usize {
        self.hook_storage.len()
    }

    /// Validates the non-overlap invariant across every history table.
    pub fn validate(&self) -> Result<()> {
        self.entities.validate()?;
        self.topics.validate()?;
        self.nodes.validate()?;
        self.tokens.validate()?;
        self.token_accounts.validate()?;
        self.nfts.validate()?;
        self.token_airdrops.validate()?;
        self.custom_fees.validate()?;
        self.crypto_allowances.validate()?;
        self.token_allowances.validate()?;
        self.nft_allowances.validate()?;
        self.hooks.validate()
    }

    fn apply(&mut self, mutation: &Mutation) -> Result<()> {
        match mutation {
            Mutation::Entity(entity) => self.entities.apply(entity.clone()),
            Mutation::Topic(topic) => self.topics.apply(topic.clone()),
            Mutation::Node(node) => self.nodes.apply(node.clone()),
            Mutation::Token(token) => self.tokens.apply(token.clone()),
            Mutation::TokenAccount(account) => self.token_accounts.apply(account.clone()),
            Mutation::Nft(nft) => self.nfts.apply(nft.clone()),
            Mutation::TokenAirdrop(airdrop) => self.token_airdrops.apply(airdrop.clone()),
            Mutation::CustomFee(fee) => self.custom_fees.apply(fee.clone()),
            Mutation::CryptoAllowance(allowance) => {
                self.crypto_allowances.apply(allowance.clone())
            }
            Mutation::TokenAllowance(allowance) => self.token_allowances.apply(allowance.clone()),
            Mutation::NftAllowance(allowance) => self.nft_allowances.apply(allowance.clone()),
            Mutation::Hook(hook) => self.hooks.apply(hook.clone()),
            Mutation::Contract(contract) => {
                let current = self.contracts.entry(contract.id).or_insert_with(|| Contract {
                    id: contract.id,
                    ..Contract::default()
                });
                if contract.file_id.is_some() {
                    current.file_id = contract.file_id;
                }
                if contract.initcode.is_some() {
                    current.initcode.clone_from(&contract.initcode);
                }
                if contract.runtime_bytecode.is_some() {
                    current.runtime_bytecode.clone_from(&contract.runtime_bytecode);
                }
                Ok(())
            }
            Mutation::HookStorageChange(change) => {
                self.apply_storage_change(change);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn apply_storage_change(&mut self, change: &HookStorageChange) {
        let key = (change.owner_id, change.hook_id, change.key.clone());
        if change.value_written.is_empty() {
            self.hook_storage.remove(&key);
        } else {
            self.hook_storage.insert(key, change.value_written.clone());
        }
    }
}

impl EntityListener for InMemoryLedger {
    fn on_mutation(&mut self, mutation: Mutation) -> anyhow::Result<()> {
        self.apply(&mutation)
            .with_context(|| format!("Failed to apply {} mutation", mutation.kind()))?;
        self.mutations.push(mutation);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityType;

    fn entity(id: i64, lower: i64) -> Entity {
        Entity {
            timestamp_range: Some(TimestampRange::open(lower)),
            ..Entity::new(EntityId::of(id))
        }
    }

    #[test]
    fn test_later_mutation_closes_current_version() {
        let mut table = HistoryTable::default();
        table
            .apply(Entity {
                memo: Some("first".to_string()),
                entity_type: Some(EntityType::Account),
                ..entity(5, 10)
            })
            .unwrap();
        table
            .apply(Entity {
                memo: Some("second".to_string()),
                ..entity(5, 20)
            })
            .unwrap();

        let history = table.history(&EntityId::of(5));
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].timestamp_range, Some(TimestampRange::closed(10, 20)));
        assert_eq!(history[1].timestamp_range, Some(TimestampRange::open(20)));
        assert_eq!(history[1].memo.as_deref(), Some("second"));
        assert_eq!(history[1].entity_type, Some(EntityType::Account));
        table.validate().unwrap();
    }

    #[test]
    fn test_same_timestamp_merges_in_place() {
        let mut table = HistoryTable::default();
        table
            .apply(Entity {
                balance: Some(100),
                ..entity(5, 10)
            })
            .unwrap();
        table
            .apply(Entity {
                deleted: Some(true),
                ..entity(5, 10)
            })
            .unwrap();

        let history = table.history(&EntityId::of(5));
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].balance, Some(100));
        assert_eq!(history[0].deleted, Some(true));
    }

    #[test]
    fn test_balance_changes_accumulate_on_current_version() {
        let mut table = HistoryTable::default();
        let change = |amount| Entity {
            balance: Some(amount),
            ..Entity::new(EntityId::of(5))
        };
        table.apply(change(300)).unwrap();
        table
            .apply(Entity {
                memo: Some("created".to_string()),
                ..entity(5, 10)
            })
            .unwrap();
        table.apply(change(-120)).unwrap();

        let history = table.history(&EntityId::of(5));
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].balance, Some(180));
        assert_eq!(history[0].timestamp_range, Some(TimestampRange::open(10)));
        table.validate().unwrap();
    }

    #[test]
    fn test_out_of_order_mutation_is_rejected() {
        let mut table = HistoryTable::default();
        table.apply(entity(5, 20)).unwrap();
        assert!(matches!(
            table.apply(entity(5, 10)),
            Err(ImporterError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn test_replace_semantics_for_allowances() {
        let mut table = HistoryTable::default();
        let allowance = |amount, lower| CryptoAllowance {
            owner: EntityId::of(1),
            spender: EntityId::of(2),
            amount,
            amount_granted: amount,
            timestamp_range: Some(TimestampRange::open(lower)),
            ..CryptoAllowance::default()
        };
        table.apply(allowance(10, 1)).unwrap();
        table.apply(allowance(0, 2)).unwrap();

        let current = table.current(&(EntityId::of(1), EntityId::of(2))).unwrap();
        assert_eq!(current.amount, 0);
        assert_eq!(current.timestamp_range, Some(TimestampRange::open(2)));
    }

    #[test]
    fn test_ledger_tracks_hook_storage() {
        let mut ledger = InMemoryLedger::new();
        let change = |value: Vec<u8>| HookStorageChange {
            consensus_timestamp: 1,
            hook_id: 3,
            owner_id: EntityId::of(9),
            key: vec![1; 32],
            value_read: value.clone(),
            value_written: value,
        };
        ledger.on_hook_storage_change(change(vec![7])).unwrap();
        assert_eq!(ledger.hook_storage(EntityId::of(9), 3, &[1; 32]), Some(&[7u8][..]));

        ledger.on_hook_storage_change(change(vec![])).unwrap();
        assert_eq!(ledger.hook_storage(EntityId::of(9), 3, &[1; 32]), None);
        assert_eq!(ledger.mutations_of("hook_storage_change").count(), 2);
    }
}
