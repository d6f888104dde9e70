//! Token service: token lifecycle, supply, associations, NFTs, and airdrops.

use std::collections::BTreeMap;

use super::{resolve_patch, EntityOperation, HandlerContext, TransactionHandler};
use crate::custom_fee::parse_custom_fees;
use crate::domain::{
    Entity, EntityId, EntityType, Nft, TimestampRange, Token, TokenAccount, TokenAirdrop,
    TokenAirdropState, TokenFreezeStatus, TokenKycStatus, TokenPauseStatus, Transaction,
};
use crate::error::Result;
use crate::record::{RecordItem, TransactionBody, TransactionType};
use crate::resolver::TokenKeys;

pub(super) fn handlers() -> Vec<Box<dyn TransactionHandler>> {
    use TransactionType as T;

    vec![
        Box::new(TokenCreateHandler),
        Box::new(TokenUpdateHandler),
        Box::new(TokenDeleteHandler),
        Box::new(TokenFeeScheduleUpdateHandler),
        Box::new(TokenAccountStatusHandler {
            transaction_type: T::TokenFreeze,
            freeze_status: Some(TokenFreezeStatus::Frozen),
            kyc_status: None,
        }),
        Box::new(TokenAccountStatusHandler {
            transaction_type: T::TokenUnfreeze,
            freeze_status: Some(TokenFreezeStatus::Unfrozen),
            kyc_status: None,
        }),
        Box::new(TokenAccountStatusHandler {
            transaction_type: T::TokenGrantKyc,
            freeze_status: None,
            kyc_status: Some(TokenKycStatus::Granted),
        }),
        Box::new(TokenAccountStatusHandler {
            transaction_type: T::TokenRevokeKyc,
            freeze_status: None,
            kyc_status: Some(TokenKycStatus::Revoked),
        }),
        Box::new(TokenPauseHandler {
            transaction_type: T::TokenPause,
            pause_status: TokenPauseStatus::Paused,
        }),
        Box::new(TokenPauseHandler {
            transaction_type: T::TokenUnpause,
            pause_status: TokenPauseStatus::Unpaused,
        }),
        Box::new(TokenAssociationHandler {
            transaction_type: T::TokenAssociate,
            associated: true,
        }),
        Box::new(TokenAssociationHandler {
            transaction_type: T::TokenDissociate,
            associated: false,
        }),
        Box::new(SupplyHandler {
            transaction_type: T::TokenMint,
        }),
        Box::new(SupplyHandler {
            transaction_type: T::TokenBurn,
        }),
        Box::new(SupplyHandler {
            transaction_type: T::TokenWipe,
        }),
        Box::new(TokenRejectHandler),
        Box::new(TokenUpdateNftsHandler),
        Box::new(TokenAirdropHandler),
        Box::new(PendingAirdropHandler {
            transaction_type: T::TokenCancelAirdrop,
            state: TokenAirdropState::Cancelled,
        }),
        Box::new(PendingAirdropHandler {
            transaction_type: T::TokenClaimAirdrop,
            state: TokenAirdropState::Claimed,
        }),
    ]
}

/// Token referenced by a body that addresses an existing token.
fn body_token(item: &RecordItem) -> Option<EntityId> {
    match &item.body {
        TransactionBody::TokenUpdate(body) => body.token,
        TransactionBody::TokenDelete(body)
        | TransactionBody::TokenPause(body)
        | TransactionBody::TokenUnpause(body) => body.token,
        TransactionBody::TokenFeeScheduleUpdate(body) => body.token,
        TransactionBody::TokenFreeze(body)
        | TransactionBody::TokenUnfreeze(body)
        | TransactionBody::TokenGrantKyc(body)
        | TransactionBody::TokenRevokeKyc(body) => body.token,
        TransactionBody::TokenMint(body) => body.token,
        TransactionBody::TokenBurn(body) => body.token,
        TransactionBody::TokenWipe(body) => body.token,
        TransactionBody::TokenUpdateNfts(body) => body.token,
        _ => None,
    }
}

fn token_entity_id(item: &RecordItem) -> EntityId {
    body_token(item).unwrap_or(EntityId::EMPTY)
}

fn emits_tokens(ctx: &HandlerContext<'_>, item: &RecordItem) -> bool {
    item.is_successful() && ctx.persist().tokens
}

/// Association row for an account newly linked to a token.
/// A fresh association. Statuses stay unset when the token's keys are unknown.
pub(crate) fn new_association(
    account_id: EntityId,
    token_id: EntityId,
    consensus_timestamp: i64,
    keys: Option<TokenKeys>,
    automatic: bool,
) -> TokenAccount {
    TokenAccount {
        timestamp_range: Some(TimestampRange::open(consensus_timestamp)),
        associated: Some(true),
        automatic_association: Some(automatic),
        created_timestamp: Some(consensus_timestamp),
        freeze_status: keys.map(|keys| TokenFreezeStatus::for_association(keys.freeze_key)),
        kyc_status: keys.map(|keys| TokenKycStatus::for_association(keys.kyc_key)),
        ..TokenAccount::new(account_id, token_id)
    }
}

struct TokenCreateHandler;

impl TransactionHandler for TokenCreateHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::TokenCreate
    }

    fn operation(&self) -> EntityOperation {
        EntityOperation::Create
    }

    fn entity_id(&self, _ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        item.receipt.token_id.unwrap_or(EntityId::EMPTY)
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        _transaction: &mut Transaction,
    ) -> Result<()> {
        if let TransactionBody::TokenCreate(body) = &item.body {
            ctx.resolve_and_track(body.treasury.as_ref());
            ctx.resolve_and_track(body.auto_renew_account.as_ref());
            for fee in &body.custom_fees {
                if let Some(collector) = fee.collector {
                    ctx.add_entity_id(collector);
                }
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
        let TransactionBody::TokenCreate(body) = &item.body else {
            return ctx.emit(entity);
        };
        let consensus_timestamp = item.consensus_timestamp;
        let token_id = entity.id;

        entity.entity_type = Some(EntityType::Token);
        entity.auto_renew_account_id = body
            .auto_renew_account
            .as_ref()
            .map(|reference| ctx.resolve_or_empty(Some(reference)));
        entity.auto_renew_period = body.auto_renew_period;
        entity.expiration_timestamp = body.expiration_time;
        entity.key.clone_from(&body.admin_key);
        entity.memo = Some(body.memo.clone());
        ctx.emit(entity)?;

        if !ctx.persist().tokens {
            return Ok(());
        }

        let treasury = ctx.resolve_or_empty(body.treasury.as_ref());
        let pause_status = if body.pause_key.is_some() {
            TokenPauseStatus::Unpaused
        } else {
            TokenPauseStatus::NotApplicable
        };
        ctx.emit(Token {
            token_id,
            timestamp_range: Some(TimestampRange::open(consensus_timestamp)),
            created_timestamp: Some(consensus_timestamp),
            decimals: Some(body.decimals),
            fee_schedule_key: body.fee_schedule_key.clone(),
            freeze_default: Some(body.freeze_default),
            freeze_key: body.freeze_key.clone(),
            initial_supply: Some(body.initial_supply),
            kyc_key: body.kyc_key.clone(),
            max_supply: Some(body.max_supply),
            metadata: Some(body.metadata.clone()),
            metadata_key: body.metadata_key.clone(),
            name: Some(body.name.clone()),
            pause_key: body.pause_key.clone(),
            pause_status: Some(pause_status),
            supply_key: body.supply_key.clone(),
            supply_type: Some(body.supply_type),
            symbol: Some(body.symbol.clone()),
            token_type: Some(body.token_type),
            total_supply: Some(body.initial_supply),
            treasury_account_id: (!treasury.is_empty()).then_some(treasury),
            wipe_key: body.wipe_key.clone(),
        })?;

        let fees = parse_custom_fees(&body.custom_fees, token_id, Some(token_id), consensus_timestamp);
        ctx.emit(fees.custom_fee)?;

        // Treasury and in-token fee collectors are associated by the network as part of
        // the create; the record lists any further automatic associations.
        let mut associations = BTreeMap::new();
        associations.insert((treasury, token_id), false);
        for collector in fees.in_token_collectors {
            associations.insert((collector, token_id), false);
        }
        for association in &item.record.automatic_token_associations {
            associations
                .entry((association.account_id, association.token_id))
                .or_insert(true);
        }

        let keys = TokenKeys {
            freeze_key: body.freeze_key.is_some(),
            kyc_key: body.kyc_key.is_some(),
        };
        for ((account_id, associated_token), automatic) in associations {
            if account_id.is_empty() {
                continue;
            }
            ctx.add_entity_id(account_id);
            ctx.emit(new_association(
                account_id,
                associated_token,
                consensus_timestamp,
                Some(keys),
                automatic,
            ))?;
        }
        Ok(())
    }
}

struct TokenUpdateHandler;

impl TransactionHandler for TokenUpdateHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::TokenUpdate
    }

    fn operation(&self) -> EntityOperation {
        EntityOperation::Update
    }

    fn entity_id(&self, _ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        token_entity_id(item)
    }

    fn update_entity(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        mut entity: Entity,
    ) -> Result<()> {
        let TransactionBody::TokenUpdate(body) = &item.body else {
            return ctx.emit(entity);
        };
        let consensus_timestamp = item.consensus_timestamp;
        let token_id = entity.id;

        if let Some(account_id) = resolve_patch(ctx, &body.auto_renew_account) {
            entity.auto_renew_account_id = Some(account_id);
        }
        body.auto_renew_period.apply_to(&mut entity.auto_renew_period);
        body.expiration_time.apply_to(&mut entity.expiration_timestamp);
        body.admin_key.apply_to(&mut entity.key);
        body.memo.apply_to(&mut entity.memo);
        ctx.emit(entity)?;

        if !ctx.persist().tokens {
            return Ok(());
        }

        let unchanged = Token {
            timestamp_range: Some(TimestampRange::open(consensus_timestamp)),
            ..Token::new(token_id)
        };
        let mut token = unchanged.clone();
        body.fee_schedule_key.apply_to(&mut token.fee_schedule_key);
        body.freeze_key.apply_to(&mut token.freeze_key);
        body.kyc_key.apply_to(&mut token.kyc_key);
        body.metadata.apply_to(&mut token.metadata);
        body.metadata_key.apply_to(&mut token.metadata_key);
        body.name.apply_to(&mut token.name);
        body.pause_key.apply_to(&mut token.pause_key);
        body.supply_key.apply_to(&mut token.supply_key);
        body.symbol.apply_to(&mut token.symbol);
        body.wipe_key.apply_to(&mut token.wipe_key);
        token.treasury_account_id = resolve_patch(ctx, &body.treasury);

        if token != unchanged {
            ctx.emit(token)?;
        }
        Ok(())
    }
}

struct TokenDeleteHandler;

impl TransactionHandler for TokenDeleteHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::TokenDelete
    }

    fn operation(&self) -> EntityOperation {
        EntityOperation::Delete
    }

    fn entity_id(&self, _ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        token_entity_id(item)
    }
}

struct TokenFeeScheduleUpdateHandler;

impl TransactionHandler for TokenFeeScheduleUpdateHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::TokenFeeScheduleUpdate
    }

    fn entity_id(&self, _ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        token_entity_id(item)
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        transaction: &mut Transaction,
    ) -> Result<()> {
        let TransactionBody::TokenFeeScheduleUpdate(body) = &item.body else {
            return Ok(());
        };
        for fee in &body.custom_fees {
            if let Some(collector) = fee.collector {
                ctx.add_entity_id(collector);
            }
        }
        let Some(token_id) = transaction.entity_id else {
            return Ok(());
        };
        if !emits_tokens(ctx, item) {
            return Ok(());
        }
        let fees = parse_custom_fees(
            &body.custom_fees,
            token_id,
            Some(token_id),
            item.consensus_timestamp,
        );
        ctx.emit(fees.custom_fee)
    }
}

/// Freeze, unfreeze, grant KYC, revoke KYC.
struct TokenAccountStatusHandler {
    transaction_type: TransactionType,
    freeze_status: Option<TokenFreezeStatus>,
    kyc_status: Option<TokenKycStatus>,
}

impl TransactionHandler for TokenAccountStatusHandler {
    fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    fn entity_id(&self, _ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        token_entity_id(item)
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        transaction: &mut Transaction,
    ) -> Result<()> {
        let (TransactionBody::TokenFreeze(body)
        | TransactionBody::TokenUnfreeze(body)
        | TransactionBody::TokenGrantKyc(body)
        | TransactionBody::TokenRevokeKyc(body)) = &item.body
        else {
            return Ok(());
        };
        let account_id = ctx.resolve_and_track(body.account.as_ref());
        let Some(token_id) = transaction.entity_id else {
            return Ok(());
        };
        if account_id.is_empty() || !emits_tokens(ctx, item) {
            return Ok(());
        }
        ctx.emit(TokenAccount {
            timestamp_range: Some(TimestampRange::open(item.consensus_timestamp)),
            freeze_status: self.freeze_status,
            kyc_status: self.kyc_status,
            ..TokenAccount::new(account_id, token_id)
        })
    }
}

struct TokenPauseHandler {
    transaction_type: TransactionType,
    pause_status: TokenPauseStatus,
}

impl TransactionHandler for TokenPauseHandler {
    fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    fn entity_id(&self, _ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        token_entity_id(item)
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        transaction: &mut Transaction,
    ) -> Result<()> {
        let Some(token_id) = transaction.entity_id else {
            return Ok(());
        };
        if !emits_tokens(ctx, item) {
            return Ok(());
        }
        ctx.emit(Token {
            timestamp_range: Some(TimestampRange::open(item.consensus_timestamp)),
            pause_status: Some(self.pause_status),
            ..Token::new(token_id)
        })
    }
}

/// Associate and dissociate. The main entity is the account; every listed token is
/// touched.
struct TokenAssociationHandler {
    transaction_type: TransactionType,
    associated: bool,
}

impl TransactionHandler for TokenAssociationHandler {
    fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    fn entity_id(&self, ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        match &item.body {
            TransactionBody::TokenAssociate(body) | TransactionBody::TokenDissociate(body) => {
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
        let (TransactionBody::TokenAssociate(body) | TransactionBody::TokenDissociate(body)) =
            &item.body
        else {
            return Ok(());
        };
        for &token_id in &body.tokens {
            ctx.add_entity_id(token_id);
        }
        let Some(account_id) = transaction.entity_id else {
            return Ok(());
        };
        if !emits_tokens(ctx, item) {
            return Ok(());
        }

        let consensus_timestamp = item.consensus_timestamp;
        for &token_id in &body.tokens {
            let token_account = if self.associated {
                let keys = ctx.token_keys(token_id);
                new_association(account_id, token_id, consensus_timestamp, keys, false)
            } else {
                TokenAccount {
                    timestamp_range: Some(TimestampRange::open(consensus_timestamp)),
                    associated: Some(false),
                    ..TokenAccount::new(account_id, token_id)
                }
            };
            ctx.emit(token_account)?;
        }
        Ok(())
    }
}

/// Mint, burn, and wipe: total supply from the receipt plus per-serial NFT rows.
struct SupplyHandler {
    transaction_type: TransactionType,
}

impl TransactionHandler for SupplyHandler {
    fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    fn entity_id(&self, _ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        token_entity_id(item)
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        transaction: &mut Transaction,
    ) -> Result<()> {
        if let TransactionBody::TokenWipe(body) = &item.body {
            ctx.resolve_and_track(body.account.as_ref());
        }
        let Some(token_id) = transaction.entity_id else {
            return Ok(());
        };
        if !emits_tokens(ctx, item) {
            return Ok(());
        }

        let consensus_timestamp = item.consensus_timestamp;
        let range = Some(TimestampRange::open(consensus_timestamp));
        ctx.emit(Token {
            timestamp_range: range,
            total_supply: Some(item.receipt.new_total_supply),
            ..Token::new(token_id)
        })?;

        match &item.body {
            TransactionBody::TokenMint(body) => {
                for (index, &serial_number) in item.receipt.serial_numbers.iter().enumerate() {
                    ctx.emit(Nft {
                        timestamp_range: range,
                        created_timestamp: Some(consensus_timestamp),
                        deleted: Some(false),
                        metadata: Some(body.metadata.get(index).cloned().unwrap_or_default()),
                        ..Nft::new(token_id, serial_number)
                    })?;
                }
            }
            TransactionBody::TokenBurn(body) => {
                burn_serials(ctx, token_id, consensus_timestamp, &body.serial_numbers)?;
            }
            TransactionBody::TokenWipe(body) => {
                burn_serials(ctx, token_id, consensus_timestamp, &body.serial_numbers)?;
            }
            _ => {}
        }
        Ok(())
    }
}

fn burn_serials(
    ctx: &mut HandlerContext<'_>,
    token_id: EntityId,
    consensus_timestamp: i64,
    serial_numbers: &[i64],
) -> Result<()> {
    for &serial_number in serial_numbers {
        ctx.emit(Nft {
            timestamp_range: Some(TimestampRange::open(consensus_timestamp)),
            account_id: Some(EntityId::EMPTY),
            deleted: Some(true),
            ..Nft::new(token_id, serial_number)
        })?;
    }
    Ok(())
}

/// Ownership returns to the treasury through the record's transfer lists; this handler
/// only tracks the parties.
struct TokenRejectHandler;

impl TransactionHandler for TokenRejectHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::TokenReject
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        _transaction: &mut Transaction,
    ) -> Result<()> {
        let TransactionBody::TokenReject(body) = &item.body else {
            return Ok(());
        };
        match body.owner.as_ref() {
            Some(owner) if !owner.is_unset() => {
                ctx.resolve_and_track(Some(owner));
            }
            _ => ctx.add_entity_id(item.payer_account_id),
        }
        for rejection in &body.rejections {
            ctx.add_entity_id(rejection.token_id);
        }
        Ok(())
    }
}

struct TokenUpdateNftsHandler;

impl TransactionHandler for TokenUpdateNftsHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::TokenUpdateNfts
    }

    fn entity_id(&self, _ctx: &HandlerContext<'_>, item: &RecordItem) -> EntityId {
        token_entity_id(item)
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        transaction: &mut Transaction,
    ) -> Result<()> {
        let TransactionBody::TokenUpdateNfts(body) = &item.body else {
            return Ok(());
        };
        let (Some(token_id), Some(metadata)) = (transaction.entity_id, body.metadata.as_ref())
        else {
            return Ok(());
        };
        if !emits_tokens(ctx, item) {
            return Ok(());
        }
        for &serial_number in &body.serial_numbers {
            ctx.emit(Nft {
                timestamp_range: Some(TimestampRange::open(item.consensus_timestamp)),
                metadata: Some(metadata.clone()),
                ..Nft::new(token_id, serial_number)
            })?;
        }
        Ok(())
    }
}

/// Airdrops that could not be delivered directly become pending; the record lists them.
struct TokenAirdropHandler;

impl TransactionHandler for TokenAirdropHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::TokenAirdrop
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        _transaction: &mut Transaction,
    ) -> Result<()> {
        let TransactionBody::TokenAirdrop(body) = &item.body else {
            return Ok(());
        };
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
        if !item.is_successful() || !ctx.persist().token_airdrops {
            return Ok(());
        }

        for pending in &item.record.new_pending_airdrops {
            ctx.add_entity_id(pending.sender_account_id);
            ctx.add_entity_id(pending.receiver_account_id);
            ctx.emit(TokenAirdrop {
                sender_account_id: pending.sender_account_id,
                receiver_account_id: pending.receiver_account_id,
                token_id: pending.token_id,
                serial_number: pending.serial_number.unwrap_or(0),
                timestamp_range: Some(TimestampRange::open(item.consensus_timestamp)),
                amount: pending.serial_number.is_none().then_some(pending.amount),
                state: TokenAirdropState::Pending,
            })?;
        }
        Ok(())
    }
}

/// Cancel and claim close out pending airdrops.
struct PendingAirdropHandler {
    transaction_type: TransactionType,
    state: TokenAirdropState,
}

impl TransactionHandler for PendingAirdropHandler {
    fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        _transaction: &mut Transaction,
    ) -> Result<()> {
        let (TransactionBody::TokenCancelAirdrop(body)
        | TransactionBody::TokenClaimAirdrop(body)) = &item.body
        else {
            return Ok(());
        };
        let emits = item.is_successful() && ctx.persist().token_airdrops;

        for pending in &body.pending_airdrops {
            let sender = ctx.resolve_and_track(pending.sender.as_ref());
            let receiver = ctx.resolve_and_track(pending.receiver.as_ref());
            ctx.add_entity_id(pending.token_id);
            if !emits {
                continue;
            }
            if sender.is_empty() || receiver.is_empty() {
                tracing::warn!(
                    target: "mirror::handler",
                    consensus_timestamp = item.consensus_timestamp,
                    token_id = %pending.token_id,
                    "Skipping pending airdrop with unresolvable sender or receiver"
                );
                continue;
            }
            ctx.emit(TokenAirdrop {
                sender_account_id: sender,
                receiver_account_id: receiver,
                token_id: pending.token_id,
                serial_number: pending.serial_number.unwrap_or(0),
                timestamp_range: Some(TimestampRange::open(item.consensus_timestamp)),
                amount: None,
                state: self.state,
            })?;
        }
        Ok(())
    }
}
