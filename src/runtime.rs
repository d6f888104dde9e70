//! Projection entry point.
//!
//! [`Projector`] drives one record at a time through its handler, then applies the
//! effects shared by every kind: contract result recording, automatic token associations,
//! NFT ownership moves, balance changes from the record's transfer lists, and the
//! transaction row itself.

use std::collections::BTreeMap;

use crate::config::ImporterProperties;
use crate::domain::{Entity, EntityId, Nft, TimestampRange, TokenAccount, Transaction};
use crate::error::Result;
use crate::handler::{
    handle, new_association, record_contract_result, HandlerContext, HandlerRegistry,
};
use crate::record::{RecordItem, TransactionType};
use crate::resolver::EntityIdResolver;
use crate::sink::EntityListener;

pub struct Projector {
    properties: ImporterProperties,
    registry: HandlerRegistry,
}

impl Projector {
    /// Projector with the built-in handler registry.
    pub fn new(properties: ImporterProperties) -> Result<Self> {
        Ok(Self::with_registry(properties, HandlerRegistry::new()?))
    }

    pub fn with_registry(properties: ImporterProperties, registry: HandlerRegistry) -> Self {
        tracing::info!(
            target: "mirror::runtime",
            shard = properties.shard,
            realm = properties.realm,
            handlers = registry.len(),
            "Initialized projector"
        );
        Self {
            properties,
            registry,
        }
    }

    pub fn properties(&self) -> &ImporterProperties {
        &self.properties
    }

    /// Projects one record and appends the ids it touched to `item`.
    ///
    /// All mutations of the record reach `listener` before this returns, so a listener that
    /// feeds `resolver` makes them visible to the next record.
    pub fn process(
        &self,
        item: &mut RecordItem,
        resolver: &dyn EntityIdResolver,
        listener: &mut dyn EntityListener,
    ) -> Result<Transaction> {
        let transaction_type = item.transaction_type();
        let handler = self.registry.get(transaction_type);

        let mut ctx = HandlerContext::new(&self.properties, resolver, listener, item);
        let transaction = handle(handler, &mut ctx, item)?;
        let entity_id = transaction.entity_id.unwrap_or(EntityId::EMPTY);
        record_contract_result(handler, &mut ctx, item, entity_id)?;
        apply_automatic_associations(&mut ctx, item)?;
        apply_nft_transfers(&mut ctx, item)?;
        apply_balance_changes(&mut ctx, item)?;
        ctx.emit(transaction.clone())?;

        let emitted = ctx.emitted();
        let entity_ids = ctx.into_entity_ids();
        tracing::debug!(
            target: "mirror::runtime",
            consensus_timestamp = item.consensus_timestamp,
            transaction_type = %transaction_type,
            result = transaction.result,
            emitted,
            touched = entity_ids.len(),
            "Processed record"
        );
        metrics::counter!(
            "mirror_importer_transactions_total",
            "type" => transaction_type.name(),
            "successful" => if item.is_successful() { "true" } else { "false" }
        )
        .increment(1);

        item.add_entity_ids(entity_ids);
        Ok(transaction)
    }

    /// Processes records in the given order, returning how many were processed.
    pub fn process_all(
        &self,
        items: &mut [RecordItem],
        resolver: &dyn EntityIdResolver,
        listener: &mut dyn EntityListener,
    ) -> Result<usize> {
        for item in items.iter_mut() {
            self.process(item, resolver, &mut *listener)?;
        }
        if let (Some(first), Some(last)) = (items.first(), items.last()) {
            tracing::info!(
                target: "mirror::runtime",
                records = items.len(),
                first = %mirror_common::format_timestamp(first.consensus_timestamp),
                last = %mirror_common::format_timestamp(last.consensus_timestamp),
                "Processed batch"
            );
        }
        Ok(items.len())
    }
}

/// Moves NFT ownership to the receiver of every NFT transfer the network applied.
///
/// Transfers into `0.0.0` are burns and wipes, which their handlers already record.
fn apply_nft_transfers(ctx: &mut HandlerContext<'_>, item: &RecordItem) -> Result<()> {
    let transfer_lists = &item.record.token_transfer_lists;
    for list in transfer_lists {
        ctx.add_entity_id(list.token_id);
        for transfer in &list.transfers {
            ctx.add_entity_id(transfer.account_id);
        }
        for transfer in &list.nft_transfers {
            ctx.add_entity_id(transfer.sender_account_id);
            ctx.add_entity_id(transfer.receiver_account_id);
        }
    }
    if !item.is_successful() || !ctx.persist().tokens {
        return Ok(());
    }

    for list in transfer_lists {
        for transfer in &list.nft_transfers {
            if transfer.receiver_account_id.is_empty() {
                continue;
            }
            ctx.emit(Nft {
                timestamp_range: Some(TimestampRange::open(item.consensus_timestamp)),
                account_id: Some(transfer.receiver_account_id),
                delegating_spender: Some(EntityId::EMPTY),
                spender: Some(EntityId::EMPTY),
                ..Nft::new(list.token_id, transfer.serial_number)
            })?;
        }
    }
    Ok(())
}

/// Associations the network created implicitly, e.g. when a transfer reaches an account
/// with free automatic association slots. Token creation records its own.
fn apply_automatic_associations(ctx: &mut HandlerContext<'_>, item: &RecordItem) -> Result<()> {
    let associations = &item.record.automatic_token_associations;
    for association in associations {
        ctx.add_entity_id(association.account_id);
        ctx.add_entity_id(association.token_id);
    }
    if item.transaction_type() == TransactionType::TokenCreate
        || !item.is_successful()
        || !ctx.persist().tokens
    {
        return Ok(());
    }

    for association in associations {
        if association.account_id.is_empty() || association.token_id.is_empty() {
            continue;
        }
        let keys = ctx.token_keys(association.token_id);
        ctx.emit(new_association(
            association.account_id,
            association.token_id,
            item.consensus_timestamp,
            keys,
            true,
        ))?;
    }
    Ok(())
}

/// Applies the record's hbar and token transfers as balance changes.
///
/// Hbar transfers apply whatever the outcome since fees are charged on failure too. Changes
/// are summed per account and carry no timestamp range: a balance moves without starting a
/// new entity version.
fn apply_balance_changes(ctx: &mut HandlerContext<'_>, item: &RecordItem) -> Result<()> {
    let consensus_timestamp = item.consensus_timestamp;

    let mut hbar: BTreeMap<EntityId, i64> = BTreeMap::new();
    for transfer in &item.record.transfer_list {
        if !transfer.account_id.is_empty() {
            *hbar.entry(transfer.account_id).or_default() += transfer.amount;
        }
    }
    for (account_id, amount) in hbar {
        ctx.add_entity_id(account_id);
        ctx.emit(Entity {
            balance: Some(amount),
            balance_timestamp: Some(consensus_timestamp),
            ..Entity::new(account_id)
        })?;
    }

    if !item.is_successful() || !ctx.persist().tokens {
        return Ok(());
    }

    let mut tokens: BTreeMap<(EntityId, EntityId), i64> = BTreeMap::new();
    for list in &item.record.token_transfer_lists {
        for transfer in &list.transfers {
            *tokens.entry((transfer.account_id, list.token_id)).or_default() += transfer.amount;
        }
        for transfer in &list.nft_transfers {
            *tokens
                .entry((transfer.sender_account_id, list.token_id))
                .or_default() -= 1;
            *tokens
                .entry((transfer.receiver_account_id, list.token_id))
                .or_default() += 1;
        }
    }
    for ((account_id, token_id), amount) in tokens {
        // Mints come from and burns go to 0.0.0.
        if account_id.is_empty() {
            continue;
        }
        ctx.emit(TokenAccount {
            balance: Some(amount),
            balance_timestamp: Some(consensus_timestamp),
            ..TokenAccount::new(account_id, token_id)
        })?;
    }
    Ok(())
}
