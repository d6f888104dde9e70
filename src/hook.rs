//! Hook lifecycle and hook storage mutation.
//!
//! Storage slots follow the Solidity layout: a mapping entry lives at
//! `keccak256(pad32(key) ++ pad32(mapping_slot))`. Slot keys are full 32-byte words; values
//! are stored minimal (leading zero bytes trimmed) and an all-zero value deletes the slot.

use crate::domain::{EntityId, Hook, HookStorageChange, HookType, TimestampRange};
use crate::error::Result;
use crate::handler::HandlerContext;
use crate::record::{HookCreationDetails, HookStorageUpdate, MappingEntry};

/// Storage slot of a mapping entry, or `None` when either operand does not fit in a word.
pub fn mapping_slot(key: &[u8], mapping_slot: &[u8]) -> Option<[u8; 32]> {
    let key = mirror_common::left_pad_32(key)?;
    let slot = mirror_common::left_pad_32(mapping_slot)?;
    Some(mirror_common::keccak256_concat(&[&key, &slot]))
}

fn entry_slot(entry: &MappingEntry, declared_slot: &[u8]) -> Option<[u8; 32]> {
    match (&entry.key, &entry.preimage) {
        (Some(key), _) => mapping_slot(key, declared_slot),
        (None, Some(preimage)) => {
            mapping_slot(&mirror_common::keccak256(preimage), declared_slot)
        }
        (None, None) => None,
    }
}

/// Emits creation rows for the hooks declared on an account or contract, followed by their
/// initial storage.
pub fn create_hooks(
    ctx: &mut HandlerContext<'_>,
    consensus_timestamp: i64,
    owner_id: EntityId,
    details: &[HookCreationDetails],
) -> Result<()> {
    if details.is_empty() || !ctx.persist().hooks || owner_id.is_empty() {
        return Ok(());
    }

    for detail in details {
        let lambda = detail.lambda_evm_hook.as_ref();
        let contract_id = lambda.and_then(|hook| hook.contract_id);
        if let Some(contract_id) = contract_id {
            ctx.add_entity_id(contract_id);
        }

        ctx.emit(Hook {
            hook_id: detail.hook_id,
            owner_id,
            timestamp_range: Some(TimestampRange::open(consensus_timestamp)),
            created_timestamp: Some(consensus_timestamp),
            admin_key: detail.admin_key.clone(),
            contract_id,
            deleted: Some(false),
            extension_point: Some(detail.extension_point),
            hook_type: Some(HookType::Lambda),
        })?;

        if let Some(lambda) = lambda {
            apply_storage_updates(
                ctx,
                consensus_timestamp,
                owner_id,
                detail.hook_id,
                &lambda.storage_updates,
            )?;
        }
    }
    Ok(())
}

/// Emits soft-deletion tombstones.
pub fn delete_hooks(
    ctx: &mut HandlerContext<'_>,
    consensus_timestamp: i64,
    owner_id: EntityId,
    hook_ids: &[i64],
) -> Result<()> {
    if !ctx.persist().hooks || owner_id.is_empty() {
        return Ok(());
    }

    for &hook_id in hook_ids {
        ctx.emit(Hook {
            hook_id,
            owner_id,
            timestamp_range: Some(TimestampRange::open(consensus_timestamp)),
            deleted: Some(true),
            ..Hook::default()
        })?;
    }
    Ok(())
}

/// Resolves every update to a concrete slot and records it as written at
/// `consensus_timestamp`. Updates whose slot cannot be derived are skipped.
pub fn apply_storage_updates(
    ctx: &mut HandlerContext<'_>,
    consensus_timestamp: i64,
    owner_id: EntityId,
    hook_id: i64,
    updates: &[HookStorageUpdate],
) -> Result<()> {
    if !ctx.persist().hooks {
        return Ok(());
    }

    for update in updates {
        match update {
            HookStorageUpdate::StorageSlot { key, value } => {
                let Some(slot) = mirror_common::left_pad_32(key) else {
                    tracing::warn!(
                        target: "mirror::hook",
                        %owner_id,
                        hook_id,
                        key_len = key.len(),
                        "Skipping storage slot with oversized key"
                    );
                    continue;
                };
                emit_change(ctx, consensus_timestamp, owner_id, hook_id, slot, value)?;
            }
            HookStorageUpdate::MappingEntries {
                mapping_slot: declared_slot,
                entries,
            } => {
                for entry in entries {
                    let Some(slot) = entry_slot(entry, declared_slot) else {
                        tracing::warn!(
                            target: "mirror::hook",
                            %owner_id,
                            hook_id,
                            "Skipping mapping entry without a usable key"
                        );
                        continue;
                    };
                    emit_change(ctx, consensus_timestamp, owner_id, hook_id, slot, &entry.value)?;
                }
            }
        }
    }
    Ok(())
}

fn emit_change(
    ctx: &mut HandlerContext<'_>,
    consensus_timestamp: i64,
    owner_id: EntityId,
    hook_id: i64,
    slot: [u8; 32],
    value: &[u8],
) -> Result<()> {
    let trimmed = mirror_common::trim_leading_zeros(value);
    let value = if trimmed.iter().all(|&b| b == 0) {
        Vec::new()
    } else {
        trimmed.to_vec()
    };
    ctx.emit(HookStorageChange {
        consensus_timestamp,
        hook_id,
        owner_id,
        key: slot.to_vec(),
        value_read: value.clone(),
        value_written: value,
    })
}
