//! End-to-end projection of record streams into the in-memory ledger.

use std::sync::Arc;

use mirror_importer::domain::{
    EntityId, Patch, TimestampRange, TokenFreezeStatus, TokenKycStatus,
};
use mirror_importer::record::{
    AccountAmount, ConsensusCreateTopicBody, ContractCallBody, CryptoAllowanceGrant,
    CryptoApproveAllowanceBody, CryptoCreateBody, CryptoDeleteBody, CryptoTransferBody,
    CryptoUpdateBody, EntityRef, NftAllowanceGrant, ResponseCode, ScheduleRefBody,
    TokenAllowanceGrant, TokenAssociation, TokenAssociationBody, TokenCreateBody,
    TokenFeeScheduleUpdateBody, TokenRefBody, TokenTransferList, TokenWipeBody, TopicRefBody,
    TransactionBody, TransactionReceipt, TransactionRecordExtras,
};
use mirror_importer::sink::ResolverUpdatingListener;
use mirror_importer::{
    ImporterProperties, InMemoryEntityIdResolver, InMemoryLedger, Mutation,
    NoopEntityIdResolver, Projector, RecordItem,
};

const PAYER: EntityId = EntityId::of(1001);
const SPENDER: EntityId = EntityId::of(1002);
const TOKEN: EntityId = EntityId::of(5000);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("mirror=debug")
        .with_test_writer()
        .try_init();
}

fn project_all(items: &mut [RecordItem]) -> InMemoryLedger {
    init_tracing();
    let projector = Projector::new(ImporterProperties::default()).unwrap();
    let mut ledger = InMemoryLedger::new();
    projector
        .process_all(items, &NoopEntityIdResolver, &mut ledger)
        .unwrap();
    ledger.validate().unwrap();
    ledger
}

fn id(num: i64) -> Option<EntityRef> {
    Some(EntityRef::Id(EntityId::of(num)))
}

fn unset_owner() -> Option<EntityRef> {
    Some(EntityRef::Id(EntityId::EMPTY))
}

fn crypto_grant(owner: Option<EntityRef>, amount: i64) -> CryptoAllowanceGrant {
    CryptoAllowanceGrant {
        owner,
        spender: Some(EntityRef::Id(SPENDER)),
        amount,
    }
}

fn approve(consensus_timestamp: i64, body: CryptoApproveAllowanceBody) -> RecordItem {
    RecordItem::new(
        consensus_timestamp,
        PAYER,
        TransactionBody::CryptoApproveAllowance(body),
    )
}

#[test]
fn test_last_allowance_grant_wins_for_implicit_owner() {
    let mut items = [approve(100, CryptoApproveAllowanceBody {
        crypto_allowances: vec![crypto_grant(None, 10), crypto_grant(None, 25)],
        ..CryptoApproveAllowanceBody::default()
    })];
    let ledger = project_all(&mut items);

    let rows: Vec<_> = ledger.mutations_of("crypto_allowance").collect();
    assert_eq!(rows.len(), 1);
    let Mutation::CryptoAllowance(allowance) = rows[0] else {
        panic!("expected a crypto allowance");
    };
    assert_eq!(allowance.owner, PAYER);
    assert_eq!(allowance.spender, SPENDER);
    assert_eq!(allowance.amount, 25);
    assert_eq!(allowance.payer_account_id, PAYER);
}

#[test]
fn test_implicit_and_explicit_owner_share_a_key() {
    let mut items = [approve(100, CryptoApproveAllowanceBody {
        crypto_allowances: vec![
            crypto_grant(Some(EntityRef::Id(PAYER)), 7),
            crypto_grant(unset_owner(), 3),
            crypto_grant(id(1003), 9),
        ],
        ..CryptoApproveAllowanceBody::default()
    })];
    let ledger = project_all(&mut items);

    assert_eq!(ledger.mutations_of("crypto_allowance").count(), 2);
    let own = ledger.crypto_allowances.current(&(PAYER, SPENDER)).unwrap();
    assert_eq!(own.amount, 3);
    let other = ledger
        .crypto_allowances
        .current(&(EntityId::of(1003), SPENDER))
        .unwrap();
    assert_eq!(other.amount, 9);
}

#[test]
fn test_each_allowance_kind_keeps_only_its_last_entry() {
    let nft_grant = |serial_numbers: Vec<i64>, approved_for_all: Patch<bool>| NftAllowanceGrant {
        owner: None,
        spender: Some(EntityRef::Id(SPENDER)),
        token_id: TOKEN,
        approved_for_all,
        delegating_spender: None,
        serial_numbers,
    };
    let token_grant = |amount: i64| TokenAllowanceGrant {
        owner: None,
        spender: Some(EntityRef::Id(SPENDER)),
        token_id: TOKEN,
        amount,
    };
    let mut items = [approve(100, CryptoApproveAllowanceBody {
        crypto_allowances: vec![],
        token_allowances: vec![token_grant(1), token_grant(2), token_grant(3)],
        nft_allowances: vec![
            nft_grant(vec![1, 2], Patch::Set(true)),
            nft_grant(vec![2, 3], Patch::Set(false)),
        ],
    })];
    let ledger = project_all(&mut items);

    let token_rows: Vec<_> = ledger.mutations_of("token_allowance").collect();
    assert_eq!(token_rows.len(), 1);
    assert_eq!(
        ledger
            .token_allowances
            .current(&(PAYER, SPENDER, TOKEN))
            .unwrap()
            .amount,
        3
    );

    assert_eq!(ledger.mutations_of("nft_allowance").count(), 1);
    assert!(
        !ledger
            .nft_allowances
            .current(&(PAYER, SPENDER, TOKEN))
            .unwrap()
            .approved_for_all
    );

    // Serials 1, 2, 3 each approved exactly once.
    assert_eq!(ledger.mutations_of("nft").count(), 3);
    // One approval log per finalized allowance: the token grant, the approve-for-all grant
    // and three serials.
    let logs: Vec<_> = ledger
        .mutations_of("contract_log")
        .map(|mutation| match mutation {
            Mutation::ContractLog(log) => log,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(logs.len(), 5);
    assert!(logs.iter().all(|log| log.synthetic && log.contract_id == TOKEN));
    let indexes: std::collections::BTreeSet<_> = logs.iter().map(|log| log.index).collect();
    assert_eq!(indexes.len(), logs.len());
}

#[test]
fn test_topic_without_fee_exempt_list_stores_empty_list() {
    let mut items = [RecordItem::new(
        100,
        PAYER,
        TransactionBody::ConsensusCreateTopic(ConsensusCreateTopicBody {
            memo: "news".to_string(),
            ..ConsensusCreateTopicBody::default()
        }),
    )
    .with_receipt(TransactionReceipt {
        topic_id: Some(EntityId::of(3000)),
        ..TransactionReceipt::default()
    })];
    let ledger = project_all(&mut items);

    let topic = ledger.topics.current(&EntityId::of(3000)).unwrap();
    assert_eq!(
        topic.fee_exempt_key_list,
        Some(mirror_common::encode_key_list(&[]))
    );
    assert_eq!(topic.admin_key, None);
    assert_eq!(topic.submit_key, None);
    assert_eq!(topic.fee_schedule_key, None);
    assert_eq!(topic.created_timestamp, Some(100));
}

#[test]
fn test_failed_wipe_emits_nothing_but_tracks_token() {
    let mut items = [RecordItem::new(
        100,
        PAYER,
        TransactionBody::TokenWipe(TokenWipeBody {
            token: Some(TOKEN),
            account: id(1600),
            amount: 10,
            serial_numbers: vec![],
        }),
    )
    .with_status(ResponseCode::InsufficientPayerBalance)];
    let ledger = project_all(&mut items);

    assert_eq!(ledger.mutations_of("token").count(), 0);
    assert_eq!(ledger.mutations_of("nft").count(), 0);
    assert_eq!(ledger.transactions().count(), 1);
    assert!(items[0].entity_ids().contains(&TOKEN));
}

#[test]
fn test_failed_crud_transactions_emit_no_entity() {
    let receipt_ids = TransactionReceipt {
        account_id: Some(EntityId::of(2001)),
        topic_id: Some(EntityId::of(2002)),
        token_id: Some(EntityId::of(2003)),
        ..TransactionReceipt::default()
    };
    let bodies = vec![
        TransactionBody::CryptoCreate(CryptoCreateBody::default()),
        TransactionBody::CryptoUpdate(CryptoUpdateBody {
            account: id(2001),
            memo: Patch::Set("renamed".to_string()),
            ..CryptoUpdateBody::default()
        }),
        TransactionBody::CryptoDelete(CryptoDeleteBody {
            account: id(2001),
            transfer_account: id(1001),
        }),
        TransactionBody::ConsensusCreateTopic(ConsensusCreateTopicBody::default()),
        TransactionBody::ConsensusDeleteTopic(TopicRefBody { topic: id(2002) }),
        TransactionBody::TokenCreate(TokenCreateBody {
            treasury: id(1001),
            ..TokenCreateBody::default()
        }),
        TransactionBody::TokenDelete(TokenRefBody {
            token: Some(EntityId::of(2003)),
        }),
        TransactionBody::ScheduleDelete(ScheduleRefBody {
            schedule: Some(EntityId::of(2004)),
        }),
    ];

    let mut items: Vec<_> = bodies
        .into_iter()
        .enumerate()
        .map(|(index, body)| {
            RecordItem::new(100 + index as i64, PAYER, body)
                .with_receipt(receipt_ids.clone())
                .with_status(ResponseCode::InvalidSignature)
        })
        .collect();
    let ledger = project_all(&mut items);

    assert_eq!(ledger.mutations_of("entity").count(), 0);
    assert_eq!(ledger.mutations_of("topic").count(), 0);
    assert_eq!(ledger.mutations_of("token").count(), 0);
    assert_eq!(ledger.transactions().count(), items.len());
    assert!(items.iter().all(|item| item.entity_ids().contains(&PAYER)));
}

#[test]
fn test_create_then_update_equals_create_with_union() {
    let account = EntityId::of(2001);
    let receipt = TransactionReceipt {
        account_id: Some(account),
        ..TransactionReceipt::default()
    };
    let create_body = CryptoCreateBody {
        memo: "alice".to_string(),
        receiver_sig_required: true,
        ..CryptoCreateBody::default()
    };
    let update_body = CryptoUpdateBody {
        account: Some(EntityRef::Id(account)),
        auto_renew_period: Patch::Set(7_776_000),
        key: Patch::Set(vec![0x02; 33]),
        max_automatic_token_associations: Patch::Set(5),
        ..CryptoUpdateBody::default()
    };
    let union_body = CryptoCreateBody {
        auto_renew_period: Some(7_776_000),
        key: Some(vec![0x02; 33]),
        max_automatic_token_associations: Some(5),
        ..create_body.clone()
    };

    let mut sequential = [
        RecordItem::new(100, PAYER, TransactionBody::CryptoCreate(create_body))
            .with_receipt(receipt.clone()),
        RecordItem::new(200, PAYER, TransactionBody::CryptoUpdate(update_body)),
    ];
    let mut direct = [RecordItem::new(100, PAYER, TransactionBody::CryptoCreate(union_body))
        .with_receipt(receipt)];

    let sequential = project_all(&mut sequential);
    let direct = project_all(&mut direct);

    let mut merged = sequential.entities.current(&account).unwrap().clone();
    let created = direct.entities.current(&account).unwrap();
    assert_eq!(sequential.entities.history(&account).len(), 2);
    merged.timestamp_range = created.timestamp_range;
    assert_eq!(&merged, created);
}

#[test]
fn test_empty_fee_schedule_yields_one_marker_per_update() {
    let update = |timestamp: i64| {
        RecordItem::new(
            timestamp,
            PAYER,
            TransactionBody::TokenFeeScheduleUpdate(TokenFeeScheduleUpdateBody {
                token: Some(TOKEN),
                custom_fees: vec![],
            }),
        )
    };
    let mut items = [update(100), update(200)];
    let ledger = project_all(&mut items);

    let rows: Vec<_> = ledger
        .mutations_of("custom_fee")
        .map(|mutation| match mutation {
            Mutation::CustomFee(fee) => fee,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|fee| fee.is_empty() && fee.entity_id == TOKEN));
    assert_eq!(ledger.custom_fees.history(&TOKEN).len(), 2);
}

#[test]
fn test_alias_created_earlier_resolves_later() {
    init_tracing();
    let alias = vec![0x02; 33];
    let account = EntityId::of(2001);
    let mut items = [
        RecordItem::new(
            100,
            PAYER,
            TransactionBody::CryptoCreate(CryptoCreateBody {
                alias: alias.clone(),
                ..CryptoCreateBody::default()
            }),
        )
        .with_receipt(TransactionReceipt {
            account_id: Some(account),
            ..TransactionReceipt::default()
        }),
        approve(200, CryptoApproveAllowanceBody {
            crypto_allowances: vec![CryptoAllowanceGrant {
                owner: None,
                spender: Some(EntityRef::Alias(alias)),
                amount: 50,
            }],
            ..CryptoApproveAllowanceBody::default()
        }),
    ];

    let projector = Projector::new(ImporterProperties::default()).unwrap();
    let resolver = Arc::new(InMemoryEntityIdResolver::new());
    let mut listener = ResolverUpdatingListener::new(resolver.clone(), InMemoryLedger::new());
    projector
        .process_all(&mut items, resolver.as_ref(), &mut listener)
        .unwrap();
    let ledger = listener.into_inner();

    let allowance = ledger.crypto_allowances.current(&(PAYER, account)).unwrap();
    assert_eq!(allowance.amount, 50);
    assert!(items[1].entity_ids().contains(&account));
}

#[test]
fn test_replay_is_deterministic() {
    let build = || {
        vec![
            RecordItem::new(
                100,
                PAYER,
                TransactionBody::TokenCreate(TokenCreateBody {
                    name: "Sample".to_string(),
                    symbol: "SMPL".to_string(),
                    initial_supply: 1_000,
                    treasury: Some(EntityRef::Id(PAYER)),
                    ..TokenCreateBody::default()
                }),
            )
            .with_receipt(TransactionReceipt {
                token_id: Some(TOKEN),
                new_total_supply: 1_000,
                ..TransactionReceipt::default()
            }),
            approve(200, CryptoApproveAllowanceBody {
                crypto_allowances: vec![crypto_grant(None, 1), crypto_grant(id(1003), 2)],
                token_allowances: vec![TokenAllowanceGrant {
                    owner: None,
                    spender: Some(EntityRef::Id(SPENDER)),
                    token_id: TOKEN,
                    amount: 4,
                }],
                ..CryptoApproveAllowanceBody::default()
            }),
        ]
    };

    let mut first = build();
    let mut second = build();
    let first = project_all(&mut first);
    let second = project_all(&mut second);

    assert_eq!(
        serde_json::to_string(first.mutations()).unwrap(),
        serde_json::to_string(second.mutations()).unwrap()
    );
}

fn credit(account: EntityId, amount: i64) -> AccountAmount {
    AccountAmount {
        account_id: account,
        amount,
        is_approval: false,
    }
}

fn transfer(consensus_timestamp: i64, record: TransactionRecordExtras) -> RecordItem {
    RecordItem::new(
        consensus_timestamp,
        EntityId::of(2),
        TransactionBody::CryptoTransfer(CryptoTransferBody::default()),
    )
    .with_record(record)
}

#[test]
fn test_transfers_update_hbar_and_token_balances() {
    let mut items = [
        RecordItem::new(
            100,
            EntityId::of(2),
            TransactionBody::CryptoCreate(CryptoCreateBody::default()),
        )
        .with_receipt(TransactionReceipt {
            account_id: Some(PAYER),
            ..TransactionReceipt::default()
        }),
        transfer(200, TransactionRecordExtras {
            transfer_list: vec![credit(EntityId::of(2), -500), credit(PAYER, 500)],
            token_transfer_lists: vec![TokenTransferList {
                token_id: TOKEN,
                transfers: vec![credit(EntityId::of(2), -40), credit(PAYER, 40)],
                nft_transfers: vec![],
            }],
            ..TransactionRecordExtras::default()
        }),
        transfer(300, TransactionRecordExtras {
            transfer_list: vec![credit(PAYER, -120), credit(SPENDER, 120)],
            ..TransactionRecordExtras::default()
        }),
    ];
    let ledger = project_all(&mut items);

    let account = ledger.entities.current(&PAYER).unwrap();
    assert_eq!(account.balance, Some(380));
    assert_eq!(account.balance_timestamp, Some(300));
    assert_eq!(account.timestamp_range, Some(TimestampRange::open(100)));
    assert_eq!(ledger.entities.history(&PAYER).len(), 1);
    assert_eq!(ledger.entities.current(&SPENDER).unwrap().balance, Some(120));

    let token_account = ledger.token_accounts.current(&(PAYER, TOKEN)).unwrap();
    assert_eq!(token_account.balance, Some(40));
    assert_eq!(token_account.balance_timestamp, Some(200));
}

#[test]
fn test_transfer_records_automatic_association() {
    let account = EntityId::of(4000);
    let token = EntityId::of(1500);
    let mut items = [transfer(100, TransactionRecordExtras {
        automatic_token_associations: vec![TokenAssociation {
            account_id: account,
            token_id: token,
        }],
        token_transfer_lists: vec![TokenTransferList {
            token_id: token,
            transfers: vec![credit(PAYER, -10), credit(account, 10)],
            nft_transfers: vec![],
        }],
        ..TransactionRecordExtras::default()
    })];
    let ledger = project_all(&mut items);

    let association = ledger.token_accounts.current(&(account, token)).unwrap();
    assert_eq!(association.associated, Some(true));
    assert_eq!(association.automatic_association, Some(true));
    assert_eq!(association.created_timestamp, Some(100));
    assert_eq!(association.timestamp_range, Some(TimestampRange::open(100)));
    assert_eq!(association.balance, Some(10));
    // The token was never seen, so its keys are unknown.
    assert_eq!(association.freeze_status, None);
    assert!(items[0].entity_ids().contains(&account));
    assert!(items[0].entity_ids().contains(&token));
}

#[test]
fn test_failed_automatic_association_is_not_recorded() {
    let mut items = [transfer(100, TransactionRecordExtras {
        automatic_token_associations: vec![TokenAssociation {
            account_id: EntityId::of(4000),
            token_id: EntityId::of(1500),
        }],
        ..TransactionRecordExtras::default()
    })
    .with_status(ResponseCode::InvalidSignature)];
    let ledger = project_all(&mut items);

    assert_eq!(ledger.mutations_of("token_account").count(), 0);
}

#[test]
fn test_call_rejected_before_execution_records_result() {
    let contract = EntityId::of(5001);
    let mut items = [RecordItem::new(
        100,
        PAYER,
        TransactionBody::ContractCall(ContractCallBody {
            contract: Some(EntityRef::Id(contract)),
            amount: 7,
            function_parameters: vec![0x12, 0x34],
            gas: 21_000,
        }),
    )
    .with_status(ResponseCode::InsufficientGas)];
    let ledger = project_all(&mut items);

    let results: Vec<_> = ledger.mutations_of("contract_result").collect();
    assert_eq!(results.len(), 1);
    let Mutation::ContractResult(result) = results[0] else {
        panic!("expected a contract result");
    };
    assert_eq!(result.contract_id, contract);
    assert_eq!(result.payer_account_id, PAYER);
    assert_eq!(result.amount, Some(7));
    assert_eq!(result.gas_limit, 21_000);
    assert_eq!(result.function_parameters, vec![0x12, 0x34]);
    assert_eq!(result.transaction_result, ResponseCode::InsufficientGas.code());
}

#[test]
fn test_associate_takes_statuses_from_token_keys() {
    let account = EntityId::of(1700);
    let keyless = EntityId::of(5001);
    let create = |consensus_timestamp, token_id, body| {
        RecordItem::new(consensus_timestamp, PAYER, TransactionBody::TokenCreate(body))
            .with_receipt(TransactionReceipt {
                token_id: Some(token_id),
                ..TransactionReceipt::default()
            })
    };
    let mut items = [
        create(100, TOKEN, TokenCreateBody {
            name: "Keyed".to_string(),
            freeze_key: Some(vec![0x01; 33]),
            kyc_key: Some(vec![0x02; 33]),
            treasury: Some(EntityRef::Id(PAYER)),
            ..TokenCreateBody::default()
        }),
        create(200, keyless, TokenCreateBody {
            name: "Keyless".to_string(),
            treasury: Some(EntityRef::Id(PAYER)),
            ..TokenCreateBody::default()
        }),
        RecordItem::new(
            300,
            PAYER,
            TransactionBody::TokenAssociate(TokenAssociationBody {
                account: Some(EntityRef::Id(account)),
                tokens: vec![TOKEN, keyless],
            }),
        ),
    ];

    init_tracing();
    let projector = Projector::new(ImporterProperties::default()).unwrap();
    let resolver = Arc::new(InMemoryEntityIdResolver::new());
    let mut listener = ResolverUpdatingListener::new(resolver.clone(), InMemoryLedger::new());
    projector
        .process_all(&mut items, resolver.as_ref(), &mut listener)
        .unwrap();
    let ledger = listener.into_inner();
    ledger.validate().unwrap();

    let keyed = ledger.token_accounts.current(&(account, TOKEN)).unwrap();
    assert_eq!(keyed.associated, Some(true));
    assert_eq!(keyed.automatic_association, Some(false));
    assert_eq!(keyed.freeze_status, Some(TokenFreezeStatus::Unfrozen));
    assert_eq!(keyed.kyc_status, Some(TokenKycStatus::Granted));

    let plain = ledger.token_accounts.current(&(account, keyless)).unwrap();
    assert_eq!(plain.freeze_status, Some(TokenFreezeStatus::NotApplicable));
    assert_eq!(plain.kyc_status, Some(TokenKycStatus::NotApplicable));
}
