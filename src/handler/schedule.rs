//! Schedule service.

use std::collections::HashSet;

use super::{EntityOperation, HandlerContext, TransactionHandler};
use crate::domain::{Entity, EntityId, EntityType, Schedule, Transaction, TransactionSignature};
use crate::error::Result;
use crate::record::{RecordItem, TransactionBody, TransactionType};

pub(super) fn handlers() -> Vec<Box<dyn TransactionHandler>> {
    vec![
        Box::new(ScheduleCreateHandler),
        Box::new(ScheduleSignHandler),
        Box::new(ScheduleDeleteHandler),
    ]
}

/// One row per distinct public key prefix that signed toward the schedule.
fn emit_signatures(
    ctx: &mut HandlerContext<'_>,
    item: &RecordItem,
    schedule_id: EntityId,
) -> Result<()> {
    if schedule_id.is_empty() || !item.is_successful() || !ctx.persist().transaction_signatures {
        return Ok(());
    }

    let mut seen = HashSet::new();
    for pair in &item.signature_map {
        if !seen.insert(pair.pub_key_prefix.as_slice()) {
            continue;
        }
        ctx.emit(TransactionSignature {
            consensus_timestamp: item.consensus_timestamp,
            entity_id: schedule_id,
            public_key_prefix: pair.pub_key_prefix.clone(),
            signature: pair.signature.clone(),
            signature_type: pair.signature_type.code(),
        })?;
    }
    Ok(())
}

struct ScheduleCreateHandler;

impl TransactionHandler for ScheduleCreateHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::ScheduleCreate
    }

    fn operation(&self) -> EntityOperation {
        EntityOperation::Create
    }

    fn entity_id(&self, _ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        item.receipt.schedule_id.unwrap_or(EntityId::EMPTY)
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        transaction: &mut Transaction,
    ) -> Result<()> {
        let TransactionBody::ScheduleCreate(body) = &item.body else {
            return Ok(());
        };
        ctx.resolve_and_track(body.payer_account.as_ref());
        emit_signatures(ctx, item, transaction.entity_id.unwrap_or(EntityId::EMPTY))
    }

    fn update_entity(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        mut entity: Entity,
    ) -> Result<()> {
        let TransactionBody::ScheduleCreate(body) = &item.body else {
            return ctx.emit(entity);
        };
        let schedule_id = entity.id;

        entity.entity_type = Some(EntityType::Schedule);
        entity.expiration_timestamp = body.expiration_time;
        entity.key.clone_from(&body.admin_key);
        entity.memo = Some(body.memo.clone());
        ctx.emit(entity)?;

        if !ctx.persist().schedules {
            return Ok(());
        }
        // Without an explicit payer the creator pays for the scheduled transaction.
        let payer_account_id = body
            .payer_account
            .as_ref()
            .and_then(|reference| ctx.resolve(reference))
            .unwrap_or(item.payer_account_id);
        ctx.emit(Schedule {
            schedule_id,
            consensus_timestamp: item.consensus_timestamp,
            creator_account_id: item.payer_account_id,
            payer_account_id,
            transaction_body: body.scheduled_transaction_body.clone(),
            expiration_time: body.expiration_time,
            wait_for_expiry: body.wait_for_expiry,
        })
    }
}

struct ScheduleSignHandler;

impl TransactionHandler for ScheduleSignHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::ScheduleSign
    }

    fn entity_id(&self, _ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        match &item.body {
            TransactionBody::ScheduleSign(body) => body.schedule.unwrap_or(EntityId::EMPTY),
            _ => EntityId::EMPTY,
        }
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        transaction: &mut Transaction,
    ) -> Result<()> {
        emit_signatures(ctx, item, transaction.entity_id.unwrap_or(EntityId::EMPTY))
    }
}

struct ScheduleDeleteHandler;

impl TransactionHandler for ScheduleDeleteHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::ScheduleDelete
    }

    fn operation(&self) -> EntityOperation {
        EntityOperation::Delete
    }

    fn entity_id(&self, _ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        match &item.body {
            TransactionBody::ScheduleDelete(body) => body.schedule.unwrap_or(EntityId::EMPTY),
            _ => EntityId::EMPTY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::project;
    use crate::domain::EntityId;
    use crate::record::{
        RecordItem, ScheduleCreateBody, ScheduleRefBody, SignaturePair, SignatureType,
        TransactionBody, TransactionReceipt,
    };
    use crate::sink::Mutation;

    const SCHEDULE: EntityId = EntityId::of(7000);

    fn signatures() -> Vec<SignaturePair> {
        vec![
            SignaturePair {
                pub_key_prefix: vec![1, 2],
                signature: vec![9; 64],
                signature_type: SignatureType::Ed25519,
            },
            SignaturePair {
                pub_key_prefix: vec![1, 2],
                signature: vec![8; 64],
                signature_type: SignatureType::Ed25519,
            },
            SignaturePair {
                pub_key_prefix: vec![3],
                signature: vec![7; 64],
                signature_type: SignatureType::EcdsaSecp256k1,
            },
        ]
    }

    #[test]
    fn test_create_schedule_defaults_payer_to_creator() {
        let mut item = RecordItem::new(
            10,
            EntityId::of(2),
            TransactionBody::ScheduleCreate(ScheduleCreateBody {
                memo: "later".to_string(),
                scheduled_transaction_body: vec![0x0a, 0x01],
                ..ScheduleCreateBody::default()
            }),
        )
        .with_receipt(TransactionReceipt {
            schedule_id: Some(SCHEDULE),
            ..TransactionReceipt::default()
        });
        item.signature_map = signatures();
        let (_, ledger) = project(item);

        let Some(Mutation::Schedule(schedule)) = ledger.mutations_of("schedule").next() else {
            panic!("missing schedule");
        };
        assert_eq!(schedule.payer_account_id, EntityId::of(2));
        assert_eq!(schedule.creator_account_id, EntityId::of(2));
        assert_eq!(ledger.mutations_of("transaction_signature").count(), 2);
        assert_eq!(
            ledger.entities.current(&SCHEDULE).unwrap().entity_type,
            Some(crate::domain::EntityType::Schedule)
        );
    }

    #[test]
    fn test_sign_records_signatures_only() {
        let mut item = RecordItem::new(
            10,
            EntityId::of(2),
            TransactionBody::ScheduleSign(ScheduleRefBody {
                schedule: Some(SCHEDULE),
            }),
        );
        item.signature_map = signatures();
        let (_, ledger) = project(item);
        assert_eq!(ledger.mutations_of("transaction_signature").count(), 2);
        assert_eq!(ledger.mutations_of("entity").count(), 0);
    }
}
