//! Registry mapping every transaction kind to its handler.

use std::collections::BTreeMap;

use super::{default_handlers, TransactionHandler};
use crate::error::{ImporterError, Result};
use crate::record::TransactionType;

/// Closed mapping from transaction kind to handler, validated once at construction.
pub struct HandlerRegistry {
    handlers: BTreeMap<TransactionType, Box<dyn TransactionHandler>>,
    unknown: Box<dyn TransactionHandler>,
}

impl HandlerRegistry {
    /// Registry of the built-in handlers.
    pub fn new() -> Result<Self> {
        Self::with_handlers(default_handlers())
    }

    /// Builds a registry, rejecting duplicate registrations and declared kinds without a
    /// handler. A handler for [`TransactionType::Unknown`] replaces the no-op fallback.
    pub fn with_handlers(handlers: Vec<Box<dyn TransactionHandler>>) -> Result<Self> {
        let mut registered = BTreeMap::new();
        let mut unknown: Box<dyn TransactionHandler> = Box::new(UnknownHandler);

        for handler in handlers {
            let transaction_type = handler.transaction_type();
            if transaction_type == TransactionType::Unknown {
                unknown = handler;
                continue;
            }
            if registered.contains_key(&transaction_type) {
                return Err(ImporterError::DuplicateHandler(transaction_type));
            }
            tracing::debug!(
                target: "mirror::handler",
                transaction_type = %transaction_type,
                "Registered handler"
            );
            registered.insert(transaction_type, handler);
        }

        let missing: Vec<_> = TransactionType::ALL
            .iter()
            .copied()
            .filter(|kind| !registered.contains_key(kind))
            .collect();
        if !missing.is_empty() {
            return Err(ImporterError::MissingHandlers(missing));
        }

        tracing::info!(
            target: "mirror::handler",
            handlers = registered.len(),
            "Initialized handler registry"
        );

        Ok(Self {
            handlers: registered,
            unknown,
        })
    }

    /// The handler for a kind; unknown kinds get the no-op fallback.
    pub fn get(&self, transaction_type: TransactionType) -> &dyn TransactionHandler {
        self.handlers
            .get(&transaction_type)
            .map_or(self.unknown.as_ref(), |handler| handler.as_ref())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered kinds in code order.
    pub fn transaction_types(&self) -> impl Iterator<Item = TransactionType> + '_ {
        self.handlers.keys().copied()
    }
}

/// Fallback for kinds this build does not know: common id tracking only.
struct UnknownHandler;

impl TransactionHandler for UnknownHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(TransactionType);

    impl TransactionHandler for Fixed {
        fn transaction_type(&self) -> TransactionType {
            self.0
        }
    }

    #[test]
    fn test_default_registry_is_exhaustive() {
        let registry = HandlerRegistry::new().unwrap();
        assert_eq!(registry.len(), TransactionType::ALL.len());
        for &kind in TransactionType::ALL {
            assert_eq!(registry.get(kind).transaction_type(), kind);
        }
        assert_eq!(
            registry.get(TransactionType::Unknown).transaction_type(),
            TransactionType::Unknown
        );
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut handlers = default_handlers();
        handlers.push(Box::new(Fixed(TransactionType::TokenMint)));
        assert!(matches!(
            HandlerRegistry::with_handlers(handlers),
            Err(ImporterError::DuplicateHandler(TransactionType::TokenMint))
        ));
    }

    #[test]
    fn test_missing_registration_fails() {
        let handlers = default_handlers()
            .into_iter()
            .filter(|handler| handler.transaction_type() != TransactionType::UtilPrng)
            .collect();
        let Err(ImporterError::MissingHandlers(missing)) = HandlerRegistry::with_handlers(handlers)
        else {
            panic!("expected missing handler error");
        };
        assert_eq!(missing, vec![TransactionType::UtilPrng]);
    }
}
