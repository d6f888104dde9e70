//! Consensus node administration and staking snapshots.

use super::{HandlerContext, TransactionHandler};
use crate::domain::{Node, NodeStake, TimestampRange, Transaction};
use crate::error::Result;
use crate::record::{RecordItem, TransactionBody, TransactionType};

pub(super) fn handlers() -> Vec<Box<dyn TransactionHandler>> {
    vec![
        Box::new(NodeCreateHandler),
        Box::new(NodeUpdateHandler),
        Box::new(NodeDeleteHandler),
        Box::new(NodeStakeUpdateHandler),
    ]
}

fn emits_nodes(ctx: &HandlerContext<'_>, item: &RecordItem) -> bool {
    item.is_successful() && ctx.persist().nodes
}

struct NodeCreateHandler;

impl TransactionHandler for NodeCreateHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::NodeCreate
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        _transaction: &mut Transaction,
    ) -> Result<()> {
        let TransactionBody::NodeCreate(body) = &item.body else {
            return Ok(());
        };
        let account_id = ctx.resolve_and_track(body.account.as_ref());
        if !emits_nodes(ctx, item) {
            return Ok(());
        }
        let Some(node_id) = item.receipt.node_id else {
            tracing::warn!(
                target: "mirror::handler",
                consensus_timestamp = item.consensus_timestamp,
                "Node create receipt carries no node id"
            );
            return Ok(());
        };

        let consensus_timestamp = item.consensus_timestamp;
        ctx.emit(Node {
            node_id,
            timestamp_range: Some(TimestampRange::open(consensus_timestamp)),
            created_timestamp: Some(consensus_timestamp),
            account_id: (!account_id.is_empty()).then_some(account_id),
            admin_key: body.admin_key.clone(),
            decline_reward: Some(body.decline_reward),
            deleted: Some(false),
            description: Some(body.description.clone()),
        })
    }
}

struct NodeUpdateHandler;

impl TransactionHandler for NodeUpdateHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::NodeUpdate
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        _transaction: &mut Transaction,
    ) -> Result<()> {
        let TransactionBody::NodeUpdate(body) = &item.body else {
            return Ok(());
        };
        let account_id = body
            .account
            .as_ref()
            .map(|reference| ctx.resolve_and_track(Some(reference)));
        if !emits_nodes(ctx, item) {
            return Ok(());
        }

        ctx.emit(Node {
            node_id: body.node_id,
            timestamp_range: Some(TimestampRange::open(item.consensus_timestamp)),
            account_id,
            admin_key: body.admin_key.as_ref().cloned(),
            decline_reward: body.decline_reward.as_ref().copied(),
            description: body.description.as_ref().cloned(),
            ..Node::default()
        })
    }
}

struct NodeDeleteHandler;

impl TransactionHandler for NodeDeleteHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::NodeDelete
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        _transaction: &mut Transaction,
    ) -> Result<()> {
        let TransactionBody::NodeDelete(body) = &item.body else {
            return Ok(());
        };
        if !emits_nodes(ctx, item) {
            return Ok(());
        }
        ctx.emit(Node {
            node_id: body.node_id,
            timestamp_range: Some(TimestampRange::open(item.consensus_timestamp)),
            deleted: Some(true),
            ..Node::default()
        })
    }
}

/// End-of-period staking snapshot, one row per node.
struct NodeStakeUpdateHandler;

impl TransactionHandler for NodeStakeUpdateHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::NodeStakeUpdate
    }

    fn update_transaction(
        &self,
        ctx: &mut HandlerContext<'_>,
        item: &RecordItem,
        _transaction: &mut Transaction,
    ) -> Result<()> {
        let TransactionBody::NodeStakeUpdate(body) = &item.body else {
            return Ok(());
        };
        if !emits_nodes(ctx, item) {
            return Ok(());
        }

        let epoch_day = mirror_common::epoch_day(body.end_of_staking_period);
        for stake in &body.node_stakes {
            ctx.emit(NodeStake {
                consensus_timestamp: item.consensus_timestamp,
                epoch_day,
                node_id: stake.node_id,
                max_stake: stake.max_stake,
                min_stake: stake.min_stake,
                reward_rate: stake.reward_rate,
                stake: stake.stake,
                stake_not_rewarded: stake.stake_not_rewarded,
                stake_rewarded: stake.stake_rewarded,
                staking_period: body.staking_period,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::project;
    use crate::domain::{EntityId, Patch};
    use crate::record::{
        EntityRef, NodeCreateBody, NodeStakeEntry, NodeStakeUpdateBody, NodeUpdateBody,
        RecordItem, TransactionBody, TransactionReceipt,
    };

    #[test]
    fn test_node_create_then_update() {
        let create = RecordItem::new(
            10,
            EntityId::of(2),
            TransactionBody::NodeCreate(NodeCreateBody {
                account: Some(EntityRef::Id(EntityId::of(3))),
                description: "node zero".to_string(),
                ..NodeCreateBody::default()
            }),
        )
        .with_receipt(TransactionReceipt {
            node_id: Some(0),
            ..TransactionReceipt::default()
        });
        let update = RecordItem::new(
            20,
            EntityId::of(2),
            TransactionBody::NodeUpdate(NodeUpdateBody {
                node_id: 0,
                decline_reward: Patch::Set(true),
                ..NodeUpdateBody::default()
            }),
        );

        let projector = crate::runtime::Projector::new(Default::default()).unwrap();
        let mut ledger = crate::sink::InMemoryLedger::new();
        projector
            .process_all(&mut [create, update], &crate::resolver::NoopEntityIdResolver, &mut ledger)
            .unwrap();

        let node = ledger.nodes.current(&0).unwrap();
        assert_eq!(node.account_id, Some(EntityId::of(3)));
        assert_eq!(node.description.as_deref(), Some("node zero"));
        assert_eq!(node.decline_reward, Some(true));
        assert_eq!(ledger.nodes.history(&0).len(), 2);
    }

    #[test]
    fn test_stake_update_rows() {
        let day_nanos = 86_400 * 1_000_000_000_i64;
        let item = RecordItem::new(
            day_nanos * 20_000 + 1,
            EntityId::of(2),
            TransactionBody::NodeStakeUpdate(NodeStakeUpdateBody {
                end_of_staking_period: day_nanos * 20_000 - 1,
                node_stakes: vec![
                    NodeStakeEntry {
                        node_id: 0,
                        stake: 10,
                        ..NodeStakeEntry::default()
                    },
                    NodeStakeEntry {
                        node_id: 1,
                        stake: 20,
                        ..NodeStakeEntry::default()
                    },
                ],
                staking_period: 1440,
            }),
        );
        let (_, ledger) = project(item);
        let stakes: Vec<_> = ledger
            .mutations_of("node_stake")
            .filter_map(|mutation| match mutation {
                crate::sink::Mutation::NodeStake(stake) => Some(stake),
                _ => None,
            })
            .collect();
        assert_eq!(stakes.len(), 2);
        assert_eq!(stakes[0].epoch_day, 19_999);
        assert_eq!(stakes[1].stake, 20);
    }
}
