//! Smart contract service: contract lifecycle, EVM results, and ethereum transactions.

use super::{
    apply_staking, receipt_or_resolve, resolve_patch, EntityOperation, HandlerContext,
    TransactionHandler,
};
use crate::domain::{
    Contract, ContractLog, ContractResult, ContractStateChange, Entity, EntityId, EntityType,
    EthereumTransaction, TimestampRange, Transaction,
};
use crate::error::Result;
use crate::hook::{create_hooks, delete_hooks};
use crate::record::{
    ContractCreateBody, RecordItem, SidecarRecord, TransactionBody, TransactionType,
};

pub(super) fn handlers() -> Vec<Box<dyn TransactionHandler>> {
    vec![
        Box::new(ContractCallHandler),
        Box::new(ContractCreateHandler),
        Box::new(ContractUpdateHandler),
        Box::new(ContractDeleteHandler),
        Box::new(EthereumTransactionHandler),
    ]
}

/// Records the EVM outcome of a record: the contract result, its logs, and the storage
/// changes delivered in sidecars. Runs regardless of receipt success.
pub(crate) fn record_contract_result(
    handler: &dyn TransactionHandler,
    ctx: &mut HandlerContext<'_>,
    item: &RecordItem,
    entity_id: EntityId,
) -> Result<()> {
    let Some(function_result) = item.record.contract_function_result.as_ref() else {
        return record_body_only_result(handler, ctx, item, entity_id);
    };
    let contract_id = function_result
        .contract_id
        .filter(|id| !id.is_empty())
        .unwrap_or(entity_id);
    let consensus_timestamp = item.consensus_timestamp;
    let payer_account_id = item.payer_account_id;

    ctx.add_entity_id(contract_id);
    if let Some(sender_id) = function_result.sender_id {
        ctx.add_entity_id(sender_id);
    }
    for &created in &function_result.created_contract_ids {
        ctx.add_entity_id(created);
    }

    if ctx.persist().contract_results {
        let mut result = ContractResult {
            consensus_timestamp,
            contract_id,
            payer_account_id,
            sender_id: function_result.sender_id,
            amount: None,
            bloom: function_result.bloom.clone(),
            call_result: function_result.contract_call_result.clone(),
            created_contract_ids: function_result.created_contract_ids.clone(),
            error_message: function_result.error_message.clone(),
            function_parameters: function_result.function_parameters.clone(),
            gas_limit: function_result.gas,
            gas_used: function_result.gas_used,
            transaction_result: item.receipt.status.code(),
            transaction_hash: item.record.ethereum_hash.clone(),
        };
        handler.update_contract_result(item, &mut result);
        ctx.emit(result)?;

        for (index, log) in function_result.logs.iter().enumerate() {
            let mut topics = log.topics.iter().cloned();
            ctx.add_entity_id(log.contract_id);
            ctx.emit(ContractLog {
                consensus_timestamp,
                index: index as i32,
                contract_id: log.contract_id,
                payer_account_id,
                root_contract_id: Some(contract_id),
                bloom: log.bloom.clone(),
                data: log.data.clone(),
                topic0: topics.next(),
                topic1: topics.next(),
                topic2: topics.next(),
                topic3: topics.next(),
                synthetic: false,
            })?;
        }
    }

    if ctx.persist().contracts {
        for sidecar in &item.sidecars {
            let SidecarRecord::StateChanges {
                contract_id,
                migration,
                storage_changes,
            } = sidecar
            else {
                continue;
            };
            for change in storage_changes {
                ctx.emit(ContractStateChange {
                    consensus_timestamp,
                    contract_id: *contract_id,
                    payer_account_id,
                    slot: change.slot.clone(),
                    value_read: change.value_read.clone(),
                    value_written: change.value_written.clone(),
                    migration: *migration,
                })?;
            }
        }
    }
    Ok(())
}

/// Calls and creates that never reached the EVM (precheck failures such as insufficient
/// gas) have no function result, but still get a contract result from the body.
fn record_body_only_result(
    handler: &dyn TransactionHandler,
    ctx: &mut HandlerContext<'_>,
    item: &RecordItem,
    contract_id: EntityId,
) -> Result<()> {
    let transaction_type = item.transaction_type();
    if !matches!(
        transaction_type,
        TransactionType::ContractCall | TransactionType::ContractCreate
    ) || !ctx.persist().contract_results
    {
        return Ok(());
    }

    let mut result = ContractResult {
        consensus_timestamp: item.consensus_timestamp,
        contract_id,
        payer_account_id: item.payer_account_id,
        transaction_result: item.receipt.status.code(),
        transaction_hash: item.record.ethereum_hash.clone(),
        ..ContractResult::default()
    };
    handler.update_contract_result(item, &mut result);
    ctx.emit(result)
}

struct ContractCallHandler;

impl TransactionHandler for ContractCallHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::ContractCall
    }

    fn entity_id(&self, ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        let TransactionBody::ContractCall(body) = &item.body else {
            return EntityId::EMPTY;
        };
        let from_result = item
            .record
            .contract_function_result
            .as_ref()
            .and_then(|result| result.contract_id);
        receipt_or_resolve(
            ctx,
            item.receipt.contract_id.or(from_result),
            body.contract.as_ref(),
        )
    }

    fn update_contract_result(&self, item: &RecordItem, result: &mut ContractResult) {
        if let TransactionBody::ContractCall(body) = &item.body {
            result.amount = Some(body.amount);
            result.function_parameters.clone_from(&body.function_parameters);
            result.gas_limit = body.gas;
        }
    }
}

struct ContractCreateHandler;

impl ContractCreateHandler {
    /// Bytecode provenance: the record's own file or initcode, else whatever the causal
    /// parent supplied.
    fn bytecode_source(item: &RecordItem, body: &ContractCreateBody) -> (Option<EntityId>, Option<Vec<u8>>) {
        if let Some(file_id) = body.file_id.filter(|id| !id.is_empty()) {
            return (Some(file_id), None);
        }
        if let Some(initcode) = body.initcode.as_ref().filter(|code| !code.is_empty()) {
            return (None, Some(initcode.clone()));
        }
        match item.parent().map(|parent| &parent.body) {
            Some(TransactionBody::ContractCreate(parent)) => match parent.file_id {
                Some(file_id) if !file_id.is_empty() => (Some(file_id), None),
                _ => (None, parent.initcode.clone()),
            },
            Some(TransactionBody::EthereumTransaction(parent)) => match parent.call_data_id {
                Some(file_id) if !file_id.is_empty() => (Some(file_id), None),
                _ if !parent.call_data.is_empty() => (None, Some(parent.call_data.clone())),
                _ => (None, None),
            },
            _ => (None, None),
        }
    }
}

impl TransactionHandler for ContractCreateHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::ContractCreate
    }

    fn operation(&self) -> EntityOperation {
        EntityOperation::Create
    }

    fn entity_id(&self, _ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        item.receipt
            .contract_id
            .or_else(|| {
                item.record
                    .contract_function_result
                    .as_ref()
                    .and_then(|result| result.contract_id)
            })
            .unwrap_or(EntityId::EMPTY)
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        _transaction: &mut Transaction,
    ) -> Result<()> {
        if let TransactionBody::ContractCreate(body) = &item.body {
            ctx.resolve_and_track(body.auto_renew_account.as_ref());
            ctx.resolve_and_track(body.staked_account.as_ref());
            if let Some(file_id) = body.file_id {
                ctx.add_entity_id(file_id);
            }
        }
        Ok(())
    }

    fn update_entity(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        mut entity: Entity,
    ) -> Result<()> {
        let TransactionBody::ContractCreate(body) = &item.body else {
            return ctx.emit(entity);
        };
        let consensus_timestamp = item.consensus_timestamp;
        let contract_id = entity.id;

        entity.entity_type = Some(EntityType::Contract);
        entity.auto_renew_account_id = body
            .auto_renew_account
            .as_ref()
            .map(|reference| ctx.resolve_or_empty(Some(reference)));
        entity.auto_renew_period = body.auto_renew_period;
        entity.key.clone_from(&body.admin_key);
        entity.max_automatic_token_associations = body.max_automatic_token_associations;
        entity.memo = Some(body.memo.clone());
        entity.evm_address = item
            .record
            .contract_function_result
            .as_ref()
            .and_then(|result| result.evm_address.clone())
            .filter(|address| !address.is_empty())
            .or_else(|| (!item.record.evm_address.is_empty()).then(|| item.record.evm_address.clone()));
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

        if ctx.persist().contracts {
            let (file_id, mut initcode) = Self::bytecode_source(item, body);
            let mut runtime_bytecode = None;
            if let Some((sidecar_initcode, sidecar_runtime)) = item.bytecode_sidecar(contract_id) {
                if file_id.is_none() && initcode.is_none() && !sidecar_initcode.is_empty() {
                    initcode = Some(sidecar_initcode.to_vec());
                }
                if !sidecar_runtime.is_empty() {
                    runtime_bytecode = Some(sidecar_runtime.to_vec());
                }
            }
            ctx.emit(Contract {
                id: contract_id,
                file_id,
                initcode,
                runtime_bytecode,
            })?;
        }

        create_hooks(ctx, consensus_timestamp, contract_id, &body.hook_creation_details)
    }

    fn update_contract_result(&self, item: &RecordItem, result: &mut ContractResult) {
        if let TransactionBody::ContractCreate(body) = &item.body {
            result.amount = Some(body.initial_balance);
            result.function_parameters.clone_from(&body.constructor_parameters);
            result.gas_limit = body.gas;
        }
    }
}

struct ContractUpdateHandler;

impl TransactionHandler for ContractUpdateHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::ContractUpdate
    }

    fn operation(&self) -> EntityOperation {
        EntityOperation::Update
    }

    fn entity_id(&self, ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        match &item.body {
            TransactionBody::ContractUpdate(body) => {
                receipt_or_resolve(ctx, item.receipt.contract_id, body.contract.as_ref())
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
        let TransactionBody::ContractUpdate(body) = &item.body else {
            return ctx.emit(entity);
        };
        let consensus_timestamp = item.consensus_timestamp;
        let contract_id = entity.id;

        if let Some(account_id) = resolve_patch(ctx, &body.auto_renew_account) {
            entity.auto_renew_account_id = Some(account_id);
        }
        body.auto_renew_period.apply_to(&mut entity.auto_renew_period);
        body.expiration_time.apply_to(&mut entity.expiration_timestamp);
        body.admin_key.apply_to(&mut entity.key);
        body.max_automatic_token_associations
            .apply_to(&mut entity.max_automatic_token_associations);
        body.memo.apply_to(&mut entity.memo);
        let staked_account_id = resolve_patch(ctx, &body.staked_account);
        apply_staking(
            &mut entity,
            consensus_timestamp,
            staked_account_id,
            body.staked_node_id.as_ref().copied(),
            body.decline_reward.as_ref().copied(),
        );
        ctx.emit(entity)?;

        create_hooks(ctx, consensus_timestamp, contract_id, &body.hook_creation_details)?;
        delete_hooks(ctx, consensus_timestamp, contract_id, &body.hook_ids_to_delete)
    }
}

struct ContractDeleteHandler;

impl TransactionHandler for ContractDeleteHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::ContractDelete
    }

    fn operation(&self) -> EntityOperation {
        EntityOperation::Delete
    }

    fn entity_id(&self, ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        match &item.body {
            TransactionBody::ContractDelete(body) => {
                receipt_or_resolve(ctx, item.receipt.contract_id, body.contract.as_ref())
            }
            _ => EntityId::EMPTY,
        }
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        _transaction: &mut Transaction,
    ) -> Result<()> {
        if let TransactionBody::ContractDelete(body) = &item.body {
            ctx.resolve_and_track(body.transfer_account.as_ref());
            ctx.resolve_and_track(body.transfer_contract.as_ref());
        }
        Ok(())
    }

    fn update_entity(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        mut entity: Entity,
    ) -> Result<()> {
        if let TransactionBody::ContractDelete(body) = &item.body {
            let obtainer = body
                .transfer_account
                .as_ref()
                .or(body.transfer_contract.as_ref());
            entity.obtainer_id = obtainer.map(|reference| ctx.resolve_or_empty(Some(reference)));
            entity.permanent_removal = Some(body.permanent_removal);
        }
        ctx.emit(entity)
    }
}

struct EthereumTransactionHandler;

impl TransactionHandler for EthereumTransactionHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::EthereumTransaction
    }

    fn entity_id(&self, _ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        item.record
            .contract_function_result
            .as_ref()
            .and_then(|result| result.contract_id)
            .unwrap_or(EntityId::EMPTY)
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        _transaction: &mut Transaction,
    ) -> Result<()> {
        let TransactionBody::EthereumTransaction(body) = &item.body else {
            return Ok(());
        };
        let consensus_timestamp = item.consensus_timestamp;
        if let Some(call_data_id) = body.call_data_id {
            ctx.add_entity_id(call_data_id);
        }

        if ctx.persist().ethereum_transactions {
            ctx.emit(EthereumTransaction {
                consensus_timestamp,
                hash: item.record.ethereum_hash.clone(),
                payer_account_id: item.payer_account_id,
                call_data_id: body.call_data_id,
                call_data: (!body.call_data.is_empty()).then(|| body.call_data.clone()),
                chain_id: body.chain_id.clone(),
                data: body.ethereum_data.clone(),
                from_address: item
                    .record
                    .contract_function_result
                    .as_ref()
                    .and_then(|result| result.sender_id)
                    .map(|sender| sender.to_evm_address().to_vec()),
                gas_limit: body.gas_limit,
                gas_price: body.gas_price.clone(),
                max_fee_per_gas: body.max_fee_per_gas.clone(),
                max_priority_fee_per_gas: body.max_priority_fee_per_gas.clone(),
                max_gas_allowance: body.max_gas_allowance,
                nonce: body.nonce,
                signature_r: body.signature_r.clone(),
                signature_s: body.signature_s.clone(),
                to_address: body.to_address.clone(),
                transaction_type: body.transaction_type,
                value: body.value.clone(),
            })?;
        }

        // The signer's nonce only advances when the network accepted the transaction.
        if !item.is_successful() {
            return Ok(());
        }
        let Some(function_result) = item.record.contract_function_result.as_ref() else {
            return Ok(());
        };
        if let (Some(sender_id), Some(nonce)) = (function_result.sender_id, function_result.signer_nonce) {
            if !sender_id.is_empty() {
                ctx.add_entity_id(sender_id);
                ctx.emit(Entity {
                    timestamp_range: Some(TimestampRange::open(consensus_timestamp)),
                    ethereum_nonce: Some(nonce),
                    ..Entity::new(sender_id)
                })?;
            }
        }
        Ok(())
    }

    fn update_contract_result(&self, item: &RecordItem, result: &mut ContractResult) {
        if let TransactionBody::EthereumTransaction(body) = &item.body {
            result.gas_limit = body.gas_limit;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::project;
    use crate::domain::{EntityId, Patch};
    use crate::record::{
        ContractCallBody, ContractCreateBody, ContractFunctionResult, ContractLogInfo,
        ContractUpdateBody, EntityRef, EthereumTransactionBody, RecordItem, ResponseCode,
        SidecarRecord, StorageChange, TransactionBody, TransactionReceipt,
        TransactionRecordExtras,
    };
    use crate::sink::Mutation;

    const CONTRACT: EntityId = EntityId::of(5001);

    fn function_result(contract_id: EntityId) -> ContractFunctionResult {
        ContractFunctionResult {
            contract_id: Some(contract_id),
            gas: 50_000,
            gas_used: 21_000,
            logs: vec![ContractLogInfo {
                contract_id,
                topics: vec![vec![1; 32], vec![2; 32]],
                data: vec![7],
                ..ContractLogInfo::default()
            }],
            ..ContractFunctionResult::default()
        }
    }

    #[test]
    fn test_failed_call_still_records_result() {
        let item = RecordItem::new(
            10,
            EntityId::of(2),
            TransactionBody::ContractCall(ContractCallBody {
                contract: Some(EntityRef::Id(CONTRACT)),
                amount: 5,
                function_parameters: vec![0xab],
                gas: 90_000,
            }),
        )
        .with_status(ResponseCode::ContractRevertExecuted)
        .with_record(TransactionRecordExtras {
            contract_function_result: Some(function_result(CONTRACT)),
            ..TransactionRecordExtras::default()
        });
        let (_, ledger) = project(item);

        let results: Vec<_> = ledger.mutations_of("contract_result").collect();
        assert_eq!(results.len(), 1);
        let Mutation::ContractResult(result) = results[0] else {
            panic!("unexpected mutation");
        };
        assert_eq!(result.contract_id, CONTRACT);
        assert_eq!(result.amount, Some(5));
        assert_eq!(result.gas_limit, 90_000);
        assert_eq!(result.function_parameters, vec![0xab]);
        assert_eq!(result.transaction_result, 33);

        let logs: Vec<_> = ledger.mutations_of("contract_log").collect();
        assert_eq!(logs.len(), 1);
        let Mutation::ContractLog(log) = logs[0] else {
            panic!("unexpected mutation");
        };
        assert_eq!(log.topic1, Some(vec![2; 32]));
        assert_eq!(log.topic2, None);
        assert!(!log.synthetic);
    }

    #[test]
    fn test_create_without_function_result_records_body() {
        let item = RecordItem::new(
            15,
            EntityId::of(2),
            TransactionBody::ContractCreate(ContractCreateBody {
                constructor_parameters: vec![0xcd],
                gas: 40_000,
                initial_balance: 12,
                ..ContractCreateBody::default()
            }),
        )
        .with_status(ResponseCode::InsufficientGas);
        let (_, ledger) = project(item);

        let Some(Mutation::ContractResult(result)) = ledger.mutations_of("contract_result").next()
        else {
            panic!("missing contract result");
        };
        assert_eq!(result.contract_id, EntityId::EMPTY);
        assert_eq!(result.amount, Some(12));
        assert_eq!(result.gas_limit, 40_000);
        assert_eq!(result.gas_used, 0);
        assert_eq!(result.function_parameters, vec![0xcd]);
        assert_eq!(result.transaction_result, 30);
        assert_eq!(ledger.mutations_of("contract_log").count(), 0);
    }

    #[test]
    fn test_child_create_inherits_parent_call_data() {
        let parent = RecordItem::new(
            19,
            EntityId::of(2),
            TransactionBody::EthereumTransaction(EthereumTransactionBody {
                call_data: vec![0x60, 0x80],
                ..EthereumTransactionBody::default()
            }),
        );
        let item = RecordItem::new(
            20,
            EntityId::of(2),
            TransactionBody::ContractCreate(ContractCreateBody::default()),
        )
        .with_receipt(TransactionReceipt {
            contract_id: Some(CONTRACT),
            ..TransactionReceipt::default()
        })
        .with_parent(parent)
        .with_sidecars(vec![
            SidecarRecord::Bytecode {
                contract_id: CONTRACT,
                initcode: vec![0x99],
                runtime_bytecode: vec![0x60, 0x01],
            },
            SidecarRecord::StateChanges {
                contract_id: CONTRACT,
                migration: false,
                storage_changes: vec![StorageChange {
                    slot: vec![1],
                    value_read: vec![0],
                    value_written: Some(vec![5]),
                }],
            },
        ]);
        let (_, ledger) = project(item);

        let contract = ledger.contract(&CONTRACT).unwrap();
        assert_eq!(contract.file_id, None);
        assert_eq!(contract.initcode, Some(vec![0x60, 0x80]));
        assert_eq!(contract.runtime_bytecode, Some(vec![0x60, 0x01]));

        let entity = ledger.entities.current(&CONTRACT).unwrap();
        assert_eq!(entity.entity_type, Some(crate::domain::EntityType::Contract));
        assert_eq!(entity.staked_node_id, None);
        assert_eq!(entity.decline_reward, Some(false));

        // No function result on this record, so no state changes either.
        assert_eq!(ledger.mutations_of("contract_state_change").count(), 0);
    }

    #[test]
    fn test_own_file_wins_over_parent() {
        let parent = RecordItem::new(
            19,
            EntityId::of(2),
            TransactionBody::ContractCreate(ContractCreateBody {
                file_id: Some(EntityId::of(111)),
                ..ContractCreateBody::default()
            }),
        );
        let item = RecordItem::new(
            20,
            EntityId::of(2),
            TransactionBody::ContractCreate(ContractCreateBody {
                file_id: Some(EntityId::of(222)),
                ..ContractCreateBody::default()
            }),
        )
        .with_receipt(TransactionReceipt {
            contract_id: Some(CONTRACT),
            ..TransactionReceipt::default()
        })
        .with_parent(parent);
        let (_, ledger) = project(item);
        assert_eq!(ledger.contract(&CONTRACT).unwrap().file_id, Some(EntityId::of(222)));
    }

    #[test]
    fn test_update_staking_to_node_clears_account() {
        let item = RecordItem::new(
            86_400_000_000_000 * 3 + 5,
            EntityId::of(2),
            TransactionBody::ContractUpdate(ContractUpdateBody {
                contract: Some(EntityRef::Id(CONTRACT)),
                staked_node_id: Patch::Set(3),
                ..ContractUpdateBody::default()
            }),
        );
        let (_, ledger) = project(item);
        let entity = ledger.entities.current(&CONTRACT).unwrap();
        assert_eq!(entity.staked_node_id, Some(3));
        assert_eq!(entity.staked_account_id, Some(EntityId::EMPTY));
        assert_eq!(entity.stake_period_start, Some(3));
        assert_eq!(entity.memo, None);
    }

    #[test]
    fn test_ethereum_nonce_and_row() {
        let sender = EntityId::of(1500);
        let item = RecordItem::new(
            30,
            EntityId::of(2),
            TransactionBody::EthereumTransaction(EthereumTransactionBody {
                gas_limit: 80_000,
                nonce: 4,
                ..EthereumTransactionBody::default()
            }),
        )
        .with_record(TransactionRecordExtras {
            ethereum_hash: vec![0xee; 32],
            contract_function_result: Some(ContractFunctionResult {
                sender_id: Some(sender),
                signer_nonce: Some(5),
                ..function_result(CONTRACT)
            }),
            ..TransactionRecordExtras::default()
        });
        let (item, ledger) = project(item);

        assert_eq!(ledger.entities.current(&sender).unwrap().ethereum_nonce, Some(5));
        assert_eq!(ledger.mutations_of("ethereum_transaction").count(), 1);
        let Some(Mutation::ContractResult(result)) = ledger.mutations_of("contract_result").next()
        else {
            panic!("missing contract result");
        };
        assert_eq!(result.gas_limit, 80_000);
        assert_eq!(result.transaction_hash, vec![0xee; 32]);
        assert!(item.entity_ids().contains(&sender));
    }
}
