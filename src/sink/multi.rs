//! CompositeListener fans every mutation out to several listeners
//!
//! Listeners receive mutations in registration order, each through its own typed method.

use super::{EntityListener, Mutation};

/// CompositeListener delivers each mutation to every registered listener
///
/// Listeners may be borrowed (`&mut L` is itself a listener), so a caller can keep
/// ownership of a sink and inspect it once the composite is dropped.
#[derive(Default)]
pub struct CompositeListener<'a> {
    listeners: Vec<Box<dyn EntityListener + 'a>>,
}

impl<'a> CompositeListener<'a> {
    /// Create a new CompositeListener with a list of listeners
    pub fn new(listeners: Vec<Box<dyn EntityListener + 'a>>) -> Self {
        Self { listeners }
    }

    /// Append a listener; it receives mutations after all previously added ones
    pub fn push(&mut self, listener: Box<dyn EntityListener + 'a>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl EntityListener for CompositeListener<'_> {
    fn on_mutation(&mut self, mutation: Mutation) -> anyhow::Result<()> {
        let kind = mutation.kind();
        let Some((last, rest)) = self.listeners.split_last_mut() else {
            return Ok(());
        };

        // The first failing listener aborts the record; the caller decides whether to retry.
        for listener in rest {
            mutation.clone().emit_to(listener.as_mut()).map_err(|e| {
                tracing::error!(
                    target: "mirror::sink::composite",
                    kind,
                    error = %e,
                    "Listener failed"
                );
                e
            })?;
        }
        mutation.emit_to(last.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::domain::{Entity, EntityId, Token};

    struct Recording {
        name: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl EntityListener for Recording {
        fn on_mutation(&mut self, mutation: Mutation) -> anyhow::Result<()> {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, mutation.kind()));
            Ok(())
        }
    }

    struct Failing;

    impl EntityListener for Failing {
        fn on_entity(&mut self, _record: Entity) -> anyhow::Result<()> {
            anyhow::bail!("entity table unavailable")
        }
    }

    #[test]
    fn test_fan_out_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut composite = CompositeListener::new(vec![
            Box::new(Recording {
                name: "first",
                seen: seen.clone(),
            }),
            Box::new(Recording {
                name: "second",
                seen: seen.clone(),
            }),
        ]);

        composite.on_token(Token::new(EntityId::of(1))).unwrap();
        composite.on_entity(Entity::new(EntityId::of(2))).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:token", "second:token", "first:entity", "second:entity"]
        );
    }

    #[test]
    fn test_failure_stops_fan_out() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut composite = CompositeListener::new(vec![
            Box::new(Failing),
            Box::new(Recording {
                name: "after",
                seen: seen.clone(),
            }),
        ]);

        assert!(composite.on_entity(Entity::new(EntityId::of(2))).is_err());
        assert!(seen.lock().unwrap().is_empty());
        composite.on_token(Token::new(EntityId::of(1))).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["after:token"]);
    }

    #[test]
    fn test_borrowed_listener_outlives_composite() {
        let mut ledger = crate::sink::InMemoryLedger::new();
        {
            let mut composite = CompositeListener::new(vec![Box::new(&mut ledger)]);
            composite.on_entity(Entity::new(EntityId::of(2))).unwrap();
        }
        assert!(ledger.entities.current(&EntityId::of(2)).is_some());
    }

    #[test]
    fn test_empty_composite_accepts_everything() {
        let mut composite = CompositeListener::default();
        assert!(composite.is_empty());
        composite.on_entity(Entity::new(EntityId::of(2))).unwrap();
    }
}
