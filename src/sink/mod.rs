//! Mutation emission.
//!
//! The projector calls one typed `on_*` method per logical mutation. Every typed method
//! defaults to wrapping its record in a [`Mutation`] and forwarding it to
//! [`EntityListener::on_mutation`], so a listener can either handle everything generically
//! or override only the record kinds it cares about.

pub mod memory;
pub mod multi;
mod resolving;

use serde::Serialize;

use crate::domain::{
    Contract, ContractLog, ContractResult, ContractStateChange, CryptoAllowance, CustomFee,
    Entity, EthereumTransaction, FileData, Hook, HookStorageChange, LiveHash, Nft, NftAllowance,
    Node, NodeStake, Prng, Schedule, Token, TokenAccount, TokenAirdrop, TokenAllowance, Topic,
    TopicMessage, Transaction, TransactionSignature,
};

pub use memory::{HistoryTable, InMemoryLedger};
pub use multi::CompositeListener;
pub use resolving::ResolverUpdatingListener;

macro_rules! entity_listener {
    ($(($method:ident, $variant:ident, $kind:literal)),+ $(,)?) => {
        /// One emitted record.
        #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
        #[serde(tag = "kind", content = "record", rename_all = "snake_case")]
        pub enum Mutation {
            $($variant($variant),)+
        }

        impl Mutation {
            /// Stable snake_case name of the record kind.
            pub const fn kind(&self) -> &'static str {
                match self {
                    $(Mutation::$variant(_) => $kind,)+
                }
            }

            /// Delivers this mutation through the listener's typed method.
            pub fn emit_to<L: EntityListener + ?Sized>(self, listener: &mut L) -> anyhow::Result<()> {
                match self {
                    $(Mutation::$variant(record) => listener.$method(record),)+
                }
            }
        }

        $(
            impl From<$variant> for Mutation {
                fn from(record: $variant) -> Self {
                    Mutation::$variant(record)
                }
            }
        )+

        /// Receiver of every mutation the projection produces.
        pub trait EntityListener {
            /// Fallback for every record kind not overridden individually.
            fn on_mutation(&mut self, mutation: Mutation) -> anyhow::Result<()> {
                let _ = mutation;
                Ok(())
            }

            $(
                fn $method(&mut self, record: $variant) -> anyhow::Result<()> {
                    self.on_mutation(Mutation::$variant(record))
                }
            )+
        }
    };
}

entity_listener! {
    (on_contract, Contract, "contract"),
    (on_contract_log, ContractLog, "contract_log"),
    (on_contract_result, ContractResult, "contract_result"),
    (on_contract_state_change, ContractStateChange, "contract_state_change"),
    (on_crypto_allowance, CryptoAllowance, "crypto_allowance"),
    (on_custom_fee, CustomFee, "custom_fee"),
    (on_entity, Entity, "entity"),
    (on_ethereum_transaction, EthereumTransaction, "ethereum_transaction"),
    (on_file_data, FileData, "file_data"),
    (on_hook, Hook, "hook"),
    (on_hook_storage_change, HookStorageChange, "hook_storage_change"),
    (on_live_hash, LiveHash, "live_hash"),
    (on_nft, Nft, "nft"),
    (on_nft_allowance, NftAllowance, "nft_allowance"),
    (on_node, Node, "node"),
    (on_node_stake, NodeStake, "node_stake"),
    (on_prng, Prng, "prng"),
    (on_schedule, Schedule, "schedule"),
    (on_token, Token, "token"),
    (on_token_account, TokenAccount, "token_account"),
    (on_token_airdrop, TokenAirdrop, "token_airdrop"),
    (on_token_allowance, TokenAllowance, "token_allowance"),
    (on_topic, Topic, "topic"),
    (on_topic_message, TopicMessage, "topic_message"),
    (on_transaction, Transaction, "transaction"),
    (on_transaction_signature, TransactionSignature, "transaction_signature"),
}

impl<L: EntityListener + ?Sized> EntityListener for Box<L> {
    fn on_mutation(&mut self, mutation: Mutation) -> anyhow::Result<()> {
        mutation.emit_to(&mut **self)
    }
}

impl<L: EntityListener + ?Sized> EntityListener for &mut L {
    fn on_mutation(&mut self, mutation: Mutation) -> anyhow::Result<()> {
        mutation.emit_to(&mut **self)
    }
}

/// Listener that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl EntityListener for NoopListener {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityId;

    #[derive(Default)]
    struct TokenOnly {
        tokens: Vec<Token>,
        others: Vec<&'static str>,
    }

    impl EntityListener for TokenOnly {
        fn on_mutation(&mut self, mutation: Mutation) -> anyhow::Result<()> {
            self.others.push(mutation.kind());
            Ok(())
        }

        fn on_token(&mut self, record: Token) -> anyhow::Result<()> {
            self.tokens.push(record);
            Ok(())
        }
    }

    #[test]
    fn test_typed_override_and_fallback() {
        let mut listener = TokenOnly::default();
        listener.on_token(Token::new(EntityId::of(5))).unwrap();
        listener.on_entity(Entity::new(EntityId::of(6))).unwrap();
        Mutation::from(Token::new(EntityId::of(7)))
            .emit_to(&mut listener)
            .unwrap();

        assert_eq!(listener.tokens.len(), 2);
        assert_eq!(listener.others, vec!["entity"]);
    }

    #[test]
    fn test_boxed_listener_dispatches_typed_methods() {
        let mut boxed: Box<TokenOnly> = Box::default();
        boxed.on_token(Token::new(EntityId::of(5))).unwrap();
        assert_eq!(boxed.tokens.len(), 1);
        assert!(boxed.others.is_empty());
    }
}
