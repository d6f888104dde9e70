//! Utility transactions: random number generation, hook storage, and kinds with no
//! projection of their own.

use super::{HandlerContext, TransactionHandler};
use crate::domain::{EntityId, Prng, Transaction};
use crate::error::Result;
use crate::hook::apply_storage_updates;
use crate::record::{RecordItem, TransactionBody, TransactionType};

pub(super) fn handlers() -> Vec<Box<dyn TransactionHandler>> {
    vec![
        Box::new(UtilPrngHandler),
        Box::new(HookStoreHandler),
        // Network freezes and batches only produce the transaction row; the inner
        // transactions of a batch arrive as their own records.
        Box::new(NoopHandler(TransactionType::Freeze)),
        Box::new(NoopHandler(TransactionType::UncheckedSubmit)),
        Box::new(NoopHandler(TransactionType::AtomicBatch)),
    ]
}

/// Handler that only produces the transaction row.
pub(crate) struct NoopHandler(pub(crate) TransactionType);

impl TransactionHandler for NoopHandler {
    fn transaction_type(&self) -> TransactionType {
        self.0
    }
}

struct UtilPrngHandler;

impl TransactionHandler for UtilPrngHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::UtilPrng
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        _transaction: &mut Transaction,
    ) -> Result<()> {
        let TransactionBody::UtilPrng(body) = &item.body else {
            return Ok(());
        };
        if !item.is_successful() || !ctx.persist().prng {
            return Ok(());
        }

        let prng_bytes = item.record.prng_bytes.clone();
        let prng_number = item.record.prng_number;
        if prng_bytes.is_none() && prng_number.is_none() {
            tracing::warn!(
                target: "mirror::handler",
                consensus_timestamp = item.consensus_timestamp,
                "PRNG record carries neither bytes nor number"
            );
            return Ok(());
        }
        ctx.emit(Prng {
            consensus_timestamp: item.consensus_timestamp,
            payer_account_id: item.payer_account_id,
            range: body.range,
            prng_bytes,
            prng_number,
        })
    }
}

/// Direct writes to a hook's storage by its owner.
struct HookStoreHandler;

impl TransactionHandler for HookStoreHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::HookStore
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        _transaction: &mut Transaction,
    ) -> Result<()> {
        let TransactionBody::HookStore(body) = &item.body else {
            return Ok(());
        };
        let owner_id = match body.owner.as_ref() {
            Some(owner) if !owner.is_unset() => ctx.resolve_and_track(Some(owner)),
            _ => item.payer_account_id,
        };
        if !item.is_successful() {
            return Ok(());
        }
        if owner_id == EntityId::EMPTY {
            tracing::warn!(
                target: "mirror::handler",
                consensus_timestamp = item.consensus_timestamp,
                hook_id = body.hook_id,
                "Skipping hook storage updates for an unresolvable owner"
            );
            return Ok(());
        }
        apply_storage_updates(
            ctx,
            item.consensus_timestamp,
            owner_id,
            body.hook_id,
            &body.storage_updates,
        )
    }
}
