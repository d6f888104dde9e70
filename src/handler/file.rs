//! File service plus the privileged system delete/undelete.

use super::{receipt_or_resolve, EntityOperation, HandlerContext, TransactionHandler};
use crate::domain::{Entity, EntityId, EntityType, FileData, Transaction};
use crate::error::Result;
use crate::record::{RecordItem, TransactionBody, TransactionType};

pub(super) fn handlers() -> Vec<Box<dyn TransactionHandler>> {
    vec![
        Box::new(FileCreateHandler),
        Box::new(FileUpdateHandler),
        Box::new(FileAppendHandler),
        Box::new(FileDeleteHandler),
        Box::new(SystemDeleteHandler),
        Box::new(SystemUndeleteHandler),
    ]
}

/// Stores file contents when the matching toggle allows it. Files `0.0.1` to `0.0.1000` are
/// network configuration and are kept even when ordinary files are not.
fn emit_file_data(
    ctx: &mut HandlerContext<'_>,
    item: &RecordItem,
    file_id: EntityId,
    contents: &[u8],
) -> Result<()> {
    let persist = ctx.persist();
    let system_file = ctx
        .properties()
        .is_system_file(file_id.shard, file_id.realm, file_id.num);
    if !(persist.files || (persist.system_files && system_file)) {
        return Ok(());
    }
    ctx.emit(FileData {
        consensus_timestamp: item.consensus_timestamp,
        entity_id: file_id,
        file_data: contents.to_vec(),
        transaction_type: item.transaction_type().code(),
    })
}

struct FileCreateHandler;

impl TransactionHandler for FileCreateHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::FileCreate
    }

    fn operation(&self) -> EntityOperation {
        EntityOperation::Create
    }

    fn entity_id(&self, _ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        item.receipt.file_id.unwrap_or(EntityId::EMPTY)
    }

    fn update_entity(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        mut entity: Entity,
    ) -> Result<()> {
        let TransactionBody::FileCreate(body) = &item.body else {
            return ctx.emit(entity);
        };
        let file_id = entity.id;

        entity.entity_type = Some(EntityType::File);
        entity.expiration_timestamp = body.expiration_time;
        entity.key = body
            .keys
            .as_deref()
            .map(mirror_common::encode_key_list);
        entity.memo = Some(body.memo.clone());
        ctx.emit(entity)?;

        emit_file_data(ctx, item, file_id, &body.contents)
    }
}

struct FileUpdateHandler;

impl TransactionHandler for FileUpdateHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::FileUpdate
    }

    fn operation(&self) -> EntityOperation {
        EntityOperation::Update
    }

    fn entity_id(&self, _ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        match &item.body {
            TransactionBody::FileUpdate(body) => body.file.unwrap_or(EntityId::EMPTY),
            _ => EntityId::EMPTY,
        }
    }

    fn update_entity(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        mut entity: Entity,
    ) -> Result<()> {
        let TransactionBody::FileUpdate(body) = &item.body else {
            return ctx.emit(entity);
        };
        let file_id = entity.id;

        body.expiration_time.apply_to(&mut entity.expiration_timestamp);
        if let Some(keys) = body.keys.as_ref() {
            entity.key = Some(mirror_common::encode_key_list(keys));
        }
        body.memo.apply_to(&mut entity.memo);
        ctx.emit(entity)?;

        match body.contents.as_ref() {
            Some(contents) => emit_file_data(ctx, item, file_id, contents),
            None => Ok(()),
        }
    }
}

struct FileAppendHandler;

impl TransactionHandler for FileAppendHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::FileAppend
    }

    fn entity_id(&self, _ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        match &item.body {
            TransactionBody::FileAppend(body) => body.file.unwrap_or(EntityId::EMPTY),
            _ => EntityId::EMPTY,
        }
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        transaction: &mut Transaction,
    ) -> Result<()> {
        let TransactionBody::FileAppend(body) = &item.body else {
            return Ok(());
        };
        match transaction.entity_id {
            Some(file_id) if item.is_successful() => {
                emit_file_data(ctx, item, file_id, &body.contents)
            }
            _ => Ok(()),
        }
    }
}

struct FileDeleteHandler;

impl TransactionHandler for FileDeleteHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::FileDelete
    }

    fn operation(&self) -> EntityOperation {
        EntityOperation::Delete
    }

    fn entity_id(&self, _ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        match &item.body {
            TransactionBody::FileDelete(body) => body.file.unwrap_or(EntityId::EMPTY),
            _ => EntityId::EMPTY,
        }
    }
}

struct SystemDeleteHandler;

impl TransactionHandler for SystemDeleteHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::SystemDelete
    }

    fn operation(&self) -> EntityOperation {
        EntityOperation::Delete
    }

    fn entity_id(&self, ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        match &item.body {
            TransactionBody::SystemDelete(body) => {
                receipt_or_resolve(ctx, body.file, body.contract.as_ref())
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
        if let TransactionBody::SystemDelete(body) = &item.body {
            entity.expiration_timestamp = body.expiration_time;
        }
        ctx.emit(entity)
    }
}

struct SystemUndeleteHandler;

impl TransactionHandler for SystemUndeleteHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::SystemUndelete
    }

    fn operation(&self) -> EntityOperation {
        EntityOperation::Update
    }

    fn entity_id(&self, ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        match &item.body {
            TransactionBody::SystemUndelete(body) => {
                receipt_or_resolve(ctx, body.file, body.contract.as_ref())
            }
            _ => EntityId::EMPTY,
        }
    }
}
