//! Crypto service: accounts, transfers, allowances, and live hashes.

use super::{
    apply_staking, receipt_or_resolve, resolve_patch, EntityOperation, HandlerContext,
    TransactionHandler,
};
use crate::allowance::{approve_allowances, delete_allowances};
use crate::domain::{Entity, EntityId, EntityType, LiveHash, Transaction};
use crate::error::Result;
use crate::hook::{create_hooks, delete_hooks};
use crate::record::{RecordItem, TransactionBody, TransactionType};

pub(super) fn handlers() -> Vec<Box<dyn TransactionHandler>> {
    vec![
        Box::new(CryptoCreateHandler),
        Box::new(CryptoUpdateHandler),
        Box::new(CryptoDeleteHandler),
        Box::new(CryptoTransferHandler),
        Box::new(ApproveAllowanceHandler),
        Box::new(DeleteAllowanceHandler),
        Box::new(LiveHashHandler {
            transaction_type: TransactionType::CryptoAddLiveHash,
        }),
        Box::new(LiveHashHandler {
            transaction_type: TransactionType::CryptoDeleteLiveHash,
        }),
    ]
}

struct CryptoCreateHandler;

impl TransactionHandler for CryptoCreateHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::CryptoCreate
    }

    fn operation(&self) -> EntityOperation {
        EntityOperation::Create
    }

    fn entity_id(&self, _ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        item.receipt.account_id.unwrap_or(EntityId::EMPTY)
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        _transaction: &mut Transaction,
    ) -> Result<()> {
        if let TransactionBody::CryptoCreate(body) = &item.body {
            ctx.resolve_and_track(body.proxy_account.as_ref());
            ctx.resolve_and_track(body.staked_account.as_ref());
        }
        Ok(())
    }

    fn update_entity(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        mut entity: Entity,
    ) -> Result<()> {
        let TransactionBody::CryptoCreate(body) = &item.body else {
            return ctx.emit(entity);
        };
        let consensus_timestamp = item.consensus_timestamp;
        let account_id = entity.id;

        let alias = if body.alias.is_empty() {
            item.record.alias.clone()
        } else {
            body.alias.clone()
        };
        // A 20-byte alias is itself the account's EVM address.
        let evm_address = if !item.record.evm_address.is_empty() {
            Some(item.record.evm_address.clone())
        } else if alias.len() == mirror_common::EVM_ADDRESS_LEN {
            Some(alias.clone())
        } else {
            None
        };

        entity.entity_type = Some(EntityType::Account);
        entity.alias = (!alias.is_empty()).then_some(alias);
        entity.evm_address = evm_address;
        entity.auto_renew_period = body.auto_renew_period;
        entity.balance = Some(0);
        entity.key.clone_from(&body.key);
        entity.max_automatic_token_associations = body.max_automatic_token_associations;
        entity.memo = Some(body.memo.clone());
        entity.proxy_account_id = body
            .proxy_account
            .as_ref()
            .map(|reference| ctx.resolve_or_empty(Some(reference)));
        entity.receiver_sig_required = Some(body.receiver_sig_required);
        let staked_account_id = body
            .staked_account
            .as_ref()
            .map(|reference| ctx.resolve_or_empty(Some(reference)));
        apply_staking(
            &mut entity,
            consensus_timestamp,
            staked_account_id,
            body.staked_node_id,
            Some(body.decline_reward),
        );
        ctx.emit(entity)?;

        create_hooks(ctx, consensus_timestamp, account_id, &body.hook_creation_details)
    }
}

struct CryptoUpdateHandler;

impl TransactionHandler for CryptoUpdateHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::CryptoUpdate
    }

    fn operation(&self) -> EntityOperation {
        EntityOperation::Update
    }

    fn entity_id(&self, ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        match &item.body {
            TransactionBody::CryptoUpdate(body) => {
                receipt_or_resolve(ctx, item.receipt.account_id, body.account.as_ref())
            }
            _ => EntityId::EMPTY,
        }
    }

    fn update_entity(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        mut entity: Entity,
    ) -> Result<()> {
        let TransactionBody::CryptoUpdate(body) = &item.body else {
            return ctx.emit(entity);
        };
        let consensus_timestamp = item.consensus_timestamp;
        let account_id = entity.id;

        body.auto_renew_period.apply_to(&mut entity.auto_renew_period);
        body.expiration_time.apply_to(&mut entity.expiration_timestamp);
        body.key.apply_to(&mut entity.key);
        body.max_automatic_token_associations
            .apply_to(&mut entity.max_automatic_token_associations);
        body.memo.apply_to(&mut entity.memo);
        if let Some(proxy_account_id) = resolve_patch(ctx, &body.proxy_account) {
            entity.proxy_account_id = Some(proxy_account_id);
        }
        body.receiver_sig_required
            .apply_to(&mut entity.receiver_sig_required);
        let staked_account_id = resolve_patch(ctx, &body.staked_account);
        apply_staking(
            &mut entity,
            consensus_timestamp,
            staked_account_id,
            body.staked_node_id.as_ref().copied(),
            body.decline_reward.as_ref().copied(),
        );
        ctx.emit(entity)?;

        create_hooks(ctx, consensus_timestamp, account_id, &body.hook_creation_details)?;
        delete_hooks(ctx, consensus_timestamp, account_id, &body.hook_ids_to_delete)
    }
}

struct CryptoDeleteHandler;

impl TransactionHandler for CryptoDeleteHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::CryptoDelete
    }

    fn operation(&self) -> EntityOperation {
        EntityOperation::Delete
    }

    fn entity_id(&self, ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        match &item.body {
            TransactionBody::CryptoDelete(body) => ctx.resolve_or_empty(body.account.as_ref()),
            _ => EntityId::EMPTY,
        }
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        _transaction: &mut Transaction,
    ) -> Result<()> {
        if let TransactionBody::CryptoDelete(body) = &item.body {
            ctx.resolve_and_track(body.transfer_account.as_ref());
        }
        Ok(())
    }

    fn update_entity(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        mut entity: Entity,
    ) -> Result<()> {
        if let TransactionBody::CryptoDelete(body) = &item.body {
            entity.obtainer_id = body
                .transfer_account
                .as_ref()
                .map(|reference| ctx.resolve_or_empty(Some(reference)));
        }
        ctx.emit(entity)
    }
}

/// Tracks every transfer party. NFT ownership moves are applied by the projector for all
/// kinds that carry token transfer lists.
struct CryptoTransferHandler;

impl TransactionHandler for CryptoTransferHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::CryptoTransfer
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        _transaction: &mut Transaction,
    ) -> Result<()> {
        let TransactionBody::CryptoTransfer(body) = &item.body else {
            return Ok(());
        };
        for transfer in &body.transfers {
            ctx.resolve_and_track(transfer.account.as_ref());
        }
        for token_transfers in &body.token_transfers {
            ctx.add_entity_id(token_transfers.token_id);
            for transfer in &token_transfers.transfers {
                ctx.resolve_and_track(transfer.account.as_ref());
            }
            for nft_transfer in &token_transfers.nft_transfers {
                ctx.resolve_and_track(nft_transfer.sender.as_ref());
                ctx.resolve_and_track(nft_transfer.receiver.as_ref());
            }
        }
        for transfer in &item.record.transfer_list {
            ctx.add_entity_id(transfer.account_id);
        }
        Ok(())
    }
}

struct ApproveAllowanceHandler;

impl TransactionHandler for ApproveAllowanceHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::CryptoApproveAllowance
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        _transaction: &mut Transaction,
    ) -> Result<()> {
        match &item.body {
            TransactionBody::CryptoApproveAllowance(body) if item.is_successful() => {
                approve_allowances(ctx, item, body)
            }
            _ => Ok(()),
        }
    }
}

struct DeleteAllowanceHandler;

impl TransactionHandler for DeleteAllowanceHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::CryptoDeleteAllowance
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        _transaction: &mut Transaction,
    ) -> Result<()> {
        match &item.body {
            TransactionBody::CryptoDeleteAllowance(body) if item.is_successful() => {
                delete_allowances(ctx, item, body)
            }
            _ => Ok(()),
        }
    }
}

/// Add and delete live hash share resolution; only an add leaves a row behind.
struct LiveHashHandler {
    transaction_type: TransactionType,
}

impl TransactionHandler for LiveHashHandler {
    fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    fn entity_id(&self, ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        match &item.body {
            TransactionBody::CryptoAddLiveHash(body) | TransactionBody::CryptoDeleteLiveHash(body) => {
                ctx.resolve_or_empty(body.account.as_ref())
            }
            _ => EntityId::EMPTY,
        }
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        transaction: &mut Transaction,
    ) -> Result<()> {
        let TransactionBody::CryptoAddLiveHash(body) = &item.body else {
            return Ok(());
        };
        let Some(account_id) = transaction.entity_id else {
            return Ok(());
        };
        if !item.is_successful() || !ctx.persist().live_hashes {
            return Ok(());
        }
        ctx.emit(LiveHash {
            consensus_timestamp: item.consensus_timestamp,
            account_id,
            hash: body.hash.clone(),
        })
    }
}
