use std::sync::Arc;

use super::{EntityListener, Mutation};
use crate::domain::{Entity, Token};
use crate::resolver::InMemoryEntityIdResolver;

/// Registers the aliases and EVM addresses of emitted entities so later records resolve them,
/// then forwards every mutation to the wrapped listener.
pub struct ResolverUpdatingListener<L> {
    resolver: Arc<InMemoryEntityIdResolver>,
    inner: L,
}

impl<L: EntityListener> ResolverUpdatingListener<L> {
    pub fn new(resolver: Arc<InMemoryEntityIdResolver>, inner: L) -> Self {
        Self { resolver, inner }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    pub fn into_inner(self) -> L {
        self.inner
    }

    fn register(&self, entity: &Entity) {
        if let Some(alias) = entity.alias.as_ref().filter(|alias| !alias.is_empty()) {
            self.resolver.register_alias(alias.clone(), entity.id);
        }
        if let Some(address) = entity.evm_address.as_ref().filter(|a| !a.is_empty()) {
            self.resolver.register_evm_address(address.clone(), entity.id);
        }
    }

    fn register_token(&self, token: &Token) {
        let present = |key: &Option<Vec<u8>>| key.as_ref().map(|key| !key.is_empty());
        self.resolver.register_token_keys(
            token.token_id,
            present(&token.freeze_key),
            present(&token.kyc_key),
        );
    }
}

impl<L: EntityListener> EntityListener for ResolverUpdatingListener<L> {
    fn on_mutation(&mut self, mutation: Mutation) -> anyhow::Result<()> {
        match &mutation {
            Mutation::Entity(entity) => self.register(entity),
            Mutation::Token(token) => self.register_token(token),
            _ => {}
        }
        mutation.emit_to(&mut self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityId;
    use crate::record::EntityRef;
    use crate::resolver::EntityIdResolver;
    use crate::sink::InMemoryLedger;

    #[test]
    fn test_registers_then_forwards() {
        let resolver = Arc::new(InMemoryEntityIdResolver::new());
        let mut listener = ResolverUpdatingListener::new(resolver.clone(), InMemoryLedger::new());

        listener
            .on_entity(Entity {
                alias: Some(vec![0x12; 33]),
                evm_address: Some(vec![0x34; 20]),
                ..Entity::new(EntityId::of(1500))
            })
            .unwrap();

        assert_eq!(
            resolver.lookup(&EntityRef::Alias(vec![0x12; 33])),
            Some(EntityId::of(1500))
        );
        assert_eq!(
            resolver.lookup(&EntityRef::EvmAddress(vec![0x34; 20])),
            Some(EntityId::of(1500))
        );
        assert_eq!(listener.inner().mutations().len(), 1);
    }

    #[test]
    fn test_registers_token_keys() {
        let resolver = Arc::new(InMemoryEntityIdResolver::new());
        let mut listener = ResolverUpdatingListener::new(resolver.clone(), InMemoryLedger::new());
        let token = EntityId::of(1500);

        listener
            .on_token(Token {
                freeze_key: Some(vec![1; 32]),
                kyc_key: Some(vec![]),
                ..Token::new(token)
            })
            .unwrap();

        let keys = resolver.token_keys(token).unwrap();
        assert!(keys.freeze_key);
        assert!(!keys.kyc_key);
    }
}
