//! Consensus service: topics and topic messages.

use super::{receipt_or_resolve, resolve_patch, EntityOperation, HandlerContext, TransactionHandler};
use crate::custom_fee::parse_custom_fees;
use crate::domain::{
    Entity, EntityId, EntityType, TimestampRange, Topic, TopicMessage, Transaction,
};
use crate::error::Result;
use crate::record::{RecordItem, TransactionBody, TransactionType};

pub(super) fn handlers() -> Vec<Box<dyn TransactionHandler>> {
    vec![
        Box::new(CreateTopicHandler),
        Box::new(UpdateTopicHandler),
        Box::new(DeleteTopicHandler),
        Box::new(SubmitMessageHandler),
    ]
}

struct CreateTopicHandler;

impl TransactionHandler for CreateTopicHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::ConsensusCreateTopic
    }

    fn operation(&self) -> EntityOperation {
        EntityOperation::Create
    }

    fn entity_id(&self, _ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        item.receipt.topic_id.unwrap_or(EntityId::EMPTY)
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        _transaction: &mut Transaction,
    ) -> Result<()> {
        if let TransactionBody::ConsensusCreateTopic(body) = &item.body {
            ctx.resolve_and_track(body.auto_renew_account.as_ref());
        }
        Ok(())
    }

    fn update_entity(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        mut entity: Entity,
    ) -> Result<()> {
        let TransactionBody::ConsensusCreateTopic(body) = &item.body else {
            return ctx.emit(entity);
        };
        let consensus_timestamp = item.consensus_timestamp;
        let topic_id = entity.id;

        entity.entity_type = Some(EntityType::Topic);
        entity.auto_renew_account_id = body
            .auto_renew_account
            .as_ref()
            .map(|reference| ctx.resolve_or_empty(Some(reference)));
        entity.auto_renew_period = body.auto_renew_period;
        entity.key.clone_from(&body.admin_key);
        entity.memo = Some(body.memo.clone());
        ctx.emit(entity)?;

        if !ctx.persist().topics {
            return Ok(());
        }

        // The exempt list is always serialized so "no exemptions" is distinguishable from a
        // topic created before exemptions existed.
        let fee_exempt_keys = body.fee_exempt_key_list.as_deref().unwrap_or(&[]);
        ctx.emit(Topic {
            id: topic_id,
            timestamp_range: Some(TimestampRange::open(consensus_timestamp)),
            created_timestamp: Some(consensus_timestamp),
            admin_key: body.admin_key.clone(),
            fee_exempt_key_list: Some(mirror_common::encode_key_list(fee_exempt_keys)),
            fee_schedule_key: body.fee_schedule_key.clone(),
            submit_key: body.submit_key.clone(),
        })?;

        let fees = parse_custom_fees(&body.custom_fees, topic_id, None, consensus_timestamp);
        ctx.emit(fees.custom_fee)
    }
}

struct UpdateTopicHandler;

impl TransactionHandler for UpdateTopicHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::ConsensusUpdateTopic
    }

    fn operation(&self) -> EntityOperation {
        EntityOperation::Update
    }

    fn entity_id(&self, ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        match &item.body {
            TransactionBody::ConsensusUpdateTopic(body) => {
                receipt_or_resolve(ctx, item.receipt.topic_id, body.topic.as_ref())
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
        let TransactionBody::ConsensusUpdateTopic(body) = &item.body else {
            return ctx.emit(entity);
        };
        let consensus_timestamp = item.consensus_timestamp;
        let topic_id = entity.id;

        if let Some(account_id) = resolve_patch(ctx, &body.auto_renew_account) {
            entity.auto_renew_account_id = Some(account_id);
        }
        body.auto_renew_period.apply_to(&mut entity.auto_renew_period);
        body.expiration_time.apply_to(&mut entity.expiration_timestamp);
        body.admin_key.apply_to(&mut entity.key);
        body.memo.apply_to(&mut entity.memo);
        ctx.emit(entity)?;

        if !ctx.persist().topics {
            return Ok(());
        }

        let keys_changed = body.admin_key.is_set()
            || body.fee_exempt_key_list.is_set()
            || body.fee_schedule_key.is_set()
            || body.submit_key.is_set();
        if keys_changed {
            ctx.emit(Topic {
                id: topic_id,
                timestamp_range: Some(TimestampRange::open(consensus_timestamp)),
                created_timestamp: None,
                admin_key: body.admin_key.as_ref().cloned(),
                fee_exempt_key_list: body
                    .fee_exempt_key_list
                    .as_ref()
                    .map(|keys| mirror_common::encode_key_list(keys)),
                fee_schedule_key: body.fee_schedule_key.as_ref().cloned(),
                submit_key: body.submit_key.as_ref().cloned(),
            })?;
        }

        if let Some(custom_fees) = body.custom_fees.as_ref() {
            let fees = parse_custom_fees(custom_fees, topic_id, None, consensus_timestamp);
            ctx.emit(fees.custom_fee)?;
        }
        Ok(())
    }
}

struct DeleteTopicHandler;

impl TransactionHandler for DeleteTopicHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::ConsensusDeleteTopic
    }

    fn operation(&self) -> EntityOperation {
        EntityOperation::Delete
    }

    fn entity_id(&self, ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        match &item.body {
            TransactionBody::ConsensusDeleteTopic(body) => ctx.resolve_or_empty(body.topic.as_ref()),
            _ => EntityId::EMPTY,
        }
    }
}

struct SubmitMessageHandler;

impl TransactionHandler for SubmitMessageHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::ConsensusSubmitMessage
    }

    fn entity_id(&self, ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        match &item.body {
            TransactionBody::ConsensusSubmitMessage(body) => {
                ctx.resolve_or_empty(body.topic.as_ref())
            }
            _ => EntityId::EMPTY,
        }
    }

    // The topic is referenced through the message row, not tracked as touched.
    fn add_common_entity_ids(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        _entity_id: EntityId,
    ) {
        ctx.add_entity_id(item.payer_account_id);
        if let Some(node) = item.node_account_id {
            ctx.add_entity_id(node);
        }
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        transaction: &mut Transaction,
    ) -> Result<()> {
        let TransactionBody::ConsensusSubmitMessage(body) = &item.body else {
            return Ok(());
        };
        let Some(topic_id) = transaction.entity_id else {
            return Ok(());
        };
        if !item.is_successful() || !ctx.persist().topic_messages {
            return Ok(());
        }

        let receipt = &item.receipt;
        let chunk = body.chunk_info.as_ref();
        ctx.emit(TopicMessage {
            consensus_timestamp: item.consensus_timestamp,
            topic_id,
            sequence_number: receipt.topic_sequence_number,
            running_hash: receipt.topic_running_hash.clone(),
            running_hash_version: receipt.topic_running_hash_version,
            message: body.message.clone(),
            payer_account_id: item.payer_account_id,
            chunk_num: chunk.map(|chunk| chunk.number),
            chunk_total: chunk.map(|chunk| chunk.total),
            initial_transaction_valid_start: chunk
                .map(|chunk| chunk.initial_transaction_valid_start),
            valid_start_timestamp: item.valid_start_ns,
        })
    }
}
