//! Transaction handlers and the lifecycle template every record passes through.
//!
//! For each record the template runs, in order:
//! 1. common id tracking ([`TransactionHandler::add_common_entity_ids`]);
//! 2. transaction level effects ([`TransactionHandler::update_transaction`]);
//! 3. the main entity CRUD projection ([`TransactionHandler::update_entity`]), skipped when
//!    the operation is [`EntityOperation::None`], the main entity is unresolved, or the
//!    receipt reports failure.

mod consensus;
mod context;
mod contract;
mod crypto;
mod file;
mod node;
mod registry;
mod schedule;
#[cfg(test)]
mod test_support;
mod token;
mod util;

use crate::domain::{ContractResult, Entity, EntityId, Patch, TimestampRange, Transaction};
use crate::error::Result;
use crate::record::{EntityRef, RecordItem, TransactionType};

pub use context::HandlerContext;
pub use registry::HandlerRegistry;

pub(crate) use contract::record_contract_result;
pub(crate) use token::new_association;

/// CRUD kind of a handler's main entity projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityOperation {
    Create,
    Update,
    Delete,
    None,
}

/// Behavior of one transaction kind.
///
/// Defaults implement a handler with no main entity and no side effects, so each kind only
/// overrides the capabilities it has.
pub trait TransactionHandler: Send + Sync {
    fn transaction_type(&self) -> TransactionType;

    fn operation(&self) -> EntityOperation {
        EntityOperation::None
    }

    /// Main entity of the record; `EntityId::EMPTY` when absent or unresolved.
    fn entity_id(&self, _ctx: &HandlerContext<'_>, _item: &RecordItem) -> EntityId {
        EntityId::EMPTY
    }

    /// Tracks the main entity, fee payer, and submitting node as touched.
    fn add_common_entity_ids(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        entity_id: EntityId,
    ) {
        ctx.add_entity_id(entity_id);
        ctx.add_entity_id(item.payer_account_id);
        if let Some(node) = item.node_account_id {
            ctx.add_entity_id(node);
        }
    }

    /// Transaction level effects: relationship and side records.
    fn update_transaction(
        &self,
        _ctx: &mut HandlerContext<'_>,
        _item: &RecordItem,
        _transaction: &mut Transaction,
    ) -> Result<()> {
        Ok(())
    }

    /// Populates kind-specific fields on an entity already stamped by the template, then
    /// emits it.
    fn update_entity(
        &self,
        ctx: &mut HandlerContext<'_>,
        _item: &RecordItem,
        entity: Entity,
    ) -> Result<()> {
        ctx.emit(entity)
    }

    /// Kind-specific contract result fields (call parameters, gas limit, amount).
    fn update_contract_result(&self, _item: &RecordItem, _result: &mut ContractResult) {}
}

/// Runs the lifecycle template for one record and returns its transaction row.
pub fn handle(
    handler: &dyn TransactionHandler,
    ctx: &mut HandlerContext<'_>,
    item: &RecordItem,
) -> Result<Transaction> {
    let entity_id = handler.entity_id(ctx, item);
    handler.add_common_entity_ids(ctx, item, entity_id);

    let mut transaction = new_transaction(item, entity_id);
    handler.update_transaction(ctx, item, &mut transaction)?;

    let operation = handler.operation();
    if operation == EntityOperation::None || entity_id.is_empty() || !item.is_successful() {
        return Ok(transaction);
    }

    let consensus_timestamp = item.consensus_timestamp;
    let mut entity = Entity::new(entity_id);
    match operation {
        EntityOperation::Create => {
            entity.created_timestamp = Some(consensus_timestamp);
            entity.deleted = Some(false);
        }
        EntityOperation::Update => entity.deleted = Some(false),
        EntityOperation::Delete => entity.deleted = Some(true),
        EntityOperation::None => {}
    }
    entity.timestamp_range = Some(TimestampRange::open(consensus_timestamp));

    handler.update_entity(ctx, item, entity)?;
    Ok(transaction)
}

fn new_transaction(item: &RecordItem, entity_id: EntityId) -> Transaction {
    Transaction {
        consensus_timestamp: item.consensus_timestamp,
        transaction_type: item.transaction_type(),
        payer_account_id: item.payer_account_id,
        node_account_id: item.node_account_id,
        entity_id: (!entity_id.is_empty()).then_some(entity_id),
        result: item.receipt.status.code(),
        valid_start_ns: item.valid_start_ns,
        memo: item.memo.clone(),
        charged_tx_fee: item.charged_tx_fee,
        max_fee: item.max_fee,
        nonce: item.nonce,
        parent_consensus_timestamp: item.parent().map(|parent| parent.consensus_timestamp),
        scheduled: item.scheduled,
    }
}

/// Stake period start for a staking change at `consensus_timestamp`.
pub(crate) fn stake_period_start(consensus_timestamp: i64) -> i64 {
    mirror_common::epoch_day(consensus_timestamp)
}

/// Main entity resolution: a protocol-assigned id from the receipt wins, otherwise the body
/// reference is resolved.
fn receipt_or_resolve(
    ctx: &HandlerContext<'_>,
    receipt_id: Option<EntityId>,
    reference: Option<&EntityRef>,
) -> EntityId {
    receipt_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| ctx.resolve_or_empty(reference))
}

/// Resolves an explicitly set reference field; an unresolvable reference becomes `0.0.0`.
fn resolve_patch(ctx: &mut HandlerContext<'_>, reference: &Patch<EntityRef>) -> Option<EntityId> {
    reference
        .as_ref()
        .map(|reference| ctx.resolve_and_track(Some(reference)))
}

/// Staking election shared by accounts and contracts.
///
/// Staking to a node clears the staked account and vice versa. Any change restarts the
/// stake period at the day of the change.
fn apply_staking(
    entity: &mut Entity,
    consensus_timestamp: i64,
    staked_account_id: Option<EntityId>,
    staked_node_id: Option<i64>,
    decline_reward: Option<bool>,
) {
    if let Some(account_id) = staked_account_id {
        entity.staked_account_id = Some(account_id);
        entity.staked_node_id = Some(-1);
    }
    if let Some(node_id) = staked_node_id {
        entity.staked_node_id = Some(node_id);
        entity.staked_account_id = Some(EntityId::EMPTY);
    }
    if decline_reward.is_some() {
        entity.decline_reward = decline_reward;
    }
    if staked_account_id.is_some() || staked_node_id.is_some() || decline_reward.is_some() {
        entity.stake_period_start = Some(stake_period_start(consensus_timestamp));
    }
}

/// All built-in handlers, one per declared transaction kind.
pub fn default_handlers() -> Vec<Box<dyn TransactionHandler>> {
    let mut handlers: Vec<Box<dyn TransactionHandler>> = Vec::new();
    handlers.extend(consensus::handlers());
    handlers.extend(contract::handlers());
    handlers.extend(crypto::handlers());
    handlers.extend(file::handlers());
    handlers.extend(node::handlers());
    handlers.extend(schedule::handlers());
    handlers.extend(token::handlers());
    handlers.extend(util::handlers());
    handlers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImporterProperties;
    use crate::record::{ResponseCode, TransactionBody};
    use crate::resolver::NoopEntityIdResolver;
    use crate::sink::InMemoryLedger;

    struct CreateHandler;

    impl TransactionHandler for CreateHandler {
        fn transaction_type(&self) -> TransactionType {
            TransactionType::Unknown
        }

        fn operation(&self) -> EntityOperation {
            EntityOperation::Create
        }

        fn entity_id(&self, _ctx: &HandlerContext<'_>, _item: &RecordItem) -> EntityId {
            EntityId::of(900)
        }
    }

    fn run(item: &RecordItem) -> (Transaction, InMemoryLedger, Vec<EntityId>) {
        let properties = ImporterProperties::default();
        let mut ledger = InMemoryLedger::new();
        let mut ctx = HandlerContext::new(&properties, &NoopEntityIdResolver, &mut ledger, item);
        let transaction = handle(&CreateHandler, &mut ctx, item).unwrap();
        let ids = ctx.into_entity_ids().into_iter().collect();
        (transaction, ledger, ids)
    }

    #[test]
    fn test_create_stamps_entity() {
        let item = RecordItem::new(50, EntityId::of(2), TransactionBody::Unknown)
            .with_node(EntityId::of(3));
        let (transaction, ledger, ids) = run(&item);

        let entity = ledger.entities.current(&EntityId::of(900)).unwrap();
        assert_eq!(entity.created_timestamp, Some(50));
        assert_eq!(entity.deleted, Some(false));
        assert_eq!(entity.timestamp_range, Some(TimestampRange::open(50)));
        assert_eq!(transaction.entity_id, Some(EntityId::of(900)));
        assert_eq!(ids, vec![EntityId::of(2), EntityId::of(3), EntityId::of(900)]);
    }

    #[test]
    fn test_failed_receipt_skips_entity_but_tracks_ids() {
        let item = RecordItem::new(50, EntityId::of(2), TransactionBody::Unknown)
            .with_status(ResponseCode::InsufficientPayerBalance);
        let (transaction, ledger, ids) = run(&item);

        assert!(ledger.mutations().is_empty());
        assert_eq!(transaction.result, 10);
        assert_eq!(ids, vec![EntityId::of(2), EntityId::of(900)]);
    }

    #[test]
    fn test_staking_to_node_clears_account() {
        let day = 86_400 * 1_000_000_000;
        let mut entity = Entity::new(EntityId::of(1001));
        apply_staking(&mut entity, 3 * day + 5, None, Some(4), None);

        assert_eq!(entity.staked_node_id, Some(4));
        assert_eq!(entity.staked_account_id, Some(EntityId::EMPTY));
        assert_eq!(entity.stake_period_start, Some(3));
        assert_eq!(entity.decline_reward, None);
    }

    #[test]
    fn test_staking_untouched_without_fields() {
        let mut entity = Entity::new(EntityId::of(1001));
        apply_staking(&mut entity, 10, None, None, None);
        assert_eq!(entity.stake_period_start, None);
        assert_eq!(entity.staked_node_id, None);
    }
}
