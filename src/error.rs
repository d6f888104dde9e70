use thiserror::Error;

use crate::record::TransactionType;

/// Structural failures of the importer.
///
/// Problems local to one sub-item of a transaction (an unresolvable allowance owner, a
/// malformed storage key) are logged and skipped instead.
#[derive(Debug, Error)]
pub enum ImporterError {
    #[error("Duplicate handler registered for transaction type {0}")]
    DuplicateHandler(TransactionType),
    #[error("No handler registered for transaction types {0:?}")]
    MissingHandlers(Vec<TransactionType>),
    #[error("Out of order mutation for {key}: {timestamp} precedes current version at {current}")]
    OutOfOrder {
        key: String,
        timestamp: i64,
        current: i64,
    },
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Sink error: {0}")]
    Sink(#[from] anyhow::Error),
}

pub type Result<T, E = ImporterError> = std::result::Result<T, E>;
