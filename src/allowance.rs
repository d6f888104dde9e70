//! Allowance reconciliation.
//!
//! One approve transaction may address the same allowance several times; only the last
//! entry in submission order counts. Grants are walked in reverse with a per-record set of
//! finalized keys, so the first occurrence seen is the authoritative one and every earlier
//! entry with the same key is dropped.

use std::collections::HashSet;

use crate::domain::{
    ContractLog, CryptoAllowance, EntityId, Nft, NftAllowance, TimestampRange, TokenAllowance,
};
use crate::error::Result;
use crate::handler::HandlerContext;
use crate::record::{CryptoApproveAllowanceBody, CryptoDeleteAllowanceBody, EntityRef, RecordItem};

const APPROVAL_SIGNATURE: &str = "Approval(address,address,uint256)";
const APPROVAL_FOR_ALL_SIGNATURE: &str = "ApprovalForAll(address,address,bool)";

/// `topic0` of the ERC-20/ERC-721 `Approval` event.
pub fn approval_topic() -> [u8; 32] {
    mirror_common::keccak256(APPROVAL_SIGNATURE.as_bytes())
}

/// `topic0` of the ERC-721 `ApprovalForAll` event.
pub fn approval_for_all_topic() -> [u8; 32] {
    mirror_common::keccak256(APPROVAL_FOR_ALL_SIGNATURE.as_bytes())
}

/// Resolves an allowance owner. An absent or unset owner is the fee payer; this
/// substitution happens before keys are computed so implicit and explicit references to the
/// payer collide.
fn resolve_owner(
    ctx: &HandlerContext<'_>,
    owner: Option<&EntityRef>,
    payer: EntityId,
) -> Option<EntityId> {
    match owner {
        None => Some(payer),
        Some(reference) if reference.is_unset() => Some(payer),
        Some(reference) => ctx.resolve(reference),
    }
}

fn resolve_spender(ctx: &HandlerContext<'_>, spender: Option<&EntityRef>) -> Option<EntityId> {
    spender.and_then(|reference| ctx.resolve(reference))
}

/// Emits the finalized allowances of an approve transaction.
pub fn approve_allowances(
    ctx: &mut HandlerContext<'_>,
    item: &RecordItem,
    body: &CryptoApproveAllowanceBody,
) -> Result<()> {
    let payer = item.payer_account_id;
    let range = TimestampRange::open(item.consensus_timestamp);

    let mut crypto_keys = HashSet::new();
    for grant in body.crypto_allowances.iter().rev() {
        let (Some(owner), Some(spender)) = (
            resolve_owner(ctx, grant.owner.as_ref(), payer),
            resolve_spender(ctx, grant.spender.as_ref()),
        ) else {
            tracing::warn!(
                target: "mirror::allowance",
                consensus_timestamp = item.consensus_timestamp,
                "Skipping crypto allowance with unresolvable owner or spender"
            );
            continue;
        };
        if !crypto_keys.insert((owner, spender)) {
            continue;
        }

        ctx.add_entity_id(owner);
        ctx.add_entity_id(spender);
        ctx.emit(CryptoAllowance {
            owner,
            spender,
            timestamp_range: Some(range),
            amount: grant.amount,
            amount_granted: grant.amount,
            payer_account_id: payer,
        })?;
    }

    let mut token_keys = HashSet::new();
    for grant in body.token_allowances.iter().rev() {
        let (Some(owner), Some(spender)) = (
            resolve_owner(ctx, grant.owner.as_ref(), payer),
            resolve_spender(ctx, grant.spender.as_ref()),
        ) else {
            tracing::warn!(
                target: "mirror::allowance",
                consensus_timestamp = item.consensus_timestamp,
                token_id = %grant.token_id,
                "Skipping token allowance with unresolvable owner or spender"
            );
            continue;
        };
        if !token_keys.insert((owner, spender, grant.token_id)) {
            continue;
        }

        ctx.add_entity_id(owner);
        ctx.add_entity_id(spender);
        ctx.add_entity_id(grant.token_id);
        ctx.emit(TokenAllowance {
            owner,
            spender,
            token_id: grant.token_id,
            timestamp_range: Some(range),
            amount: grant.amount,
            amount_granted: grant.amount,
            payer_account_id: payer,
        })?;
        emit_synthetic_log(
            ctx,
            item,
            grant.token_id,
            approval_topic(),
            [owner, spender],
            None,
            mirror_common::i64_to_word(grant.amount).to_vec(),
        )?;
    }

    let mut approved_for_all_keys = HashSet::new();
    let mut serial_keys = HashSet::new();
    for grant in body.nft_allowances.iter().rev() {
        let (Some(owner), Some(spender)) = (
            resolve_owner(ctx, grant.owner.as_ref(), payer),
            resolve_spender(ctx, grant.spender.as_ref()),
        ) else {
            tracing::warn!(
                target: "mirror::allowance",
                consensus_timestamp = item.consensus_timestamp,
                token_id = %grant.token_id,
                "Skipping NFT allowance with unresolvable owner or spender"
            );
            continue;
        };
        let token_id = grant.token_id;
        ctx.add_entity_id(owner);
        ctx.add_entity_id(spender);
        ctx.add_entity_id(token_id);

        if let Some(&approved_for_all) = grant.approved_for_all.as_ref() {
            if approved_for_all_keys.insert((owner, spender, token_id)) {
                ctx.emit(NftAllowance {
                    owner,
                    spender,
                    token_id,
                    timestamp_range: Some(range),
                    approved_for_all,
                    payer_account_id: payer,
                })?;
                emit_synthetic_log(
                    ctx,
                    item,
                    token_id,
                    approval_for_all_topic(),
                    [owner, spender],
                    None,
                    mirror_common::bool_to_word(approved_for_all).to_vec(),
                )?;
            }
        }

        let delegating_spender = grant
            .delegating_spender
            .as_ref()
            .and_then(|reference| ctx.resolve(reference))
            .unwrap_or(EntityId::EMPTY);
        ctx.add_entity_id(delegating_spender);

        for &serial_number in grant.serial_numbers.iter().rev() {
            // The approved spender of a serial is a property of the serial itself.
            if !serial_keys.insert((token_id, serial_number)) {
                continue;
            }
            ctx.emit(Nft {
                timestamp_range: Some(range),
                delegating_spender: Some(delegating_spender),
                spender: Some(spender),
                ..Nft::new(token_id, serial_number)
            })?;
            emit_synthetic_log(
                ctx,
                item,
                token_id,
                approval_topic(),
                [owner, spender],
                Some(mirror_common::i64_to_word(serial_number)),
                Vec::new(),
            )?;
        }
    }

    Ok(())
}

/// Clears the per-serial spender of NFTs listed in a delete allowance transaction.
pub fn delete_allowances(
    ctx: &mut HandlerContext<'_>,
    item: &RecordItem,
    body: &CryptoDeleteAllowanceBody,
) -> Result<()> {
    let payer = item.payer_account_id;
    let range = TimestampRange::open(item.consensus_timestamp);
    let mut serial_keys = HashSet::new();

    for removal in body.nft_allowances.iter().rev() {
        let Some(owner) = resolve_owner(ctx, removal.owner.as_ref(), payer) else {
            tracing::warn!(
                target: "mirror::allowance",
                consensus_timestamp = item.consensus_timestamp,
                token_id = %removal.token_id,
                "Skipping NFT allowance removal with unresolvable owner"
            );
            continue;
        };
        ctx.add_entity_id(owner);
        ctx.add_entity_id(removal.token_id);

        for &serial_number in removal.serial_numbers.iter().rev() {
            if !serial_keys.insert((removal.token_id, serial_number)) {
                continue;
            }
            ctx.emit(Nft {
                timestamp_range: Some(range),
                delegating_spender: Some(EntityId::EMPTY),
                spender: Some(EntityId::EMPTY),
                ..Nft::new(removal.token_id, serial_number)
            })?;
        }
    }
    Ok(())
}

/// Emits an ERC style event for a native allowance, when synthetic logs are enabled.
fn emit_synthetic_log(
    ctx: &mut HandlerContext<'_>,
    item: &RecordItem,
    contract_id: EntityId,
    topic0: [u8; 32],
    [owner, spender]: [EntityId; 2],
    topic3: Option<[u8; 32]>,
    data: Vec<u8>,
) -> Result<()> {
    if !ctx.persist().synthetic_contract_logs {
        return Ok(());
    }
    let index = ctx.next_log_index();
    ctx.emit(ContractLog {
        consensus_timestamp: item.consensus_timestamp,
        index,
        contract_id,
        payer_account_id: item.payer_account_id,
        root_contract_id: Some(contract_id),
        bloom: Vec::new(),
        data,
        topic0: Some(topic0.to_vec()),
        topic1: Some(owner.to_evm_word().to_vec()),
        topic2: Some(spender.to_evm_word().to_vec()),
        topic3: topic3.map(|word| word.to_vec()),
        synthetic: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_topics() {
        assert_eq!(
            hex::encode(approval_topic()),
            "8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925"
        );
        assert_eq!(
            hex::encode(approval_for_all_topic()),
            "17307eab39ab6107e8899845ad3d59bd9653f200f220920489ca2b5937696c31"
        );
    }
}
