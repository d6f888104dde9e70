//! Mirror importer - deterministic projection of consensus transaction records.
//!
//! Decoded record items go in, partial entity mutations come out. Every mutation carries the
//! consensus timestamp it takes effect at, so a sink can build non-overlapping version
//! histories for each ledger entity. The crate performs no I/O of its own: identity
//! resolution and persistence are injected through [`resolver::EntityIdResolver`] and
//! [`sink::EntityListener`].
//!
//! ```rust,ignore
//! use mirror_importer::{ImporterProperties, InMemoryLedger, NoopEntityIdResolver, Projector};
//!
//! let projector = Projector::new(ImporterProperties::default())?;
//! let mut ledger = InMemoryLedger::new();
//! projector.process_all(&mut items, &NoopEntityIdResolver, &mut ledger)?;
//! ledger.validate()?;
//! ```

pub mod allowance;
pub mod config;
pub mod custom_fee;
pub mod domain;
pub mod error;
pub mod handler;
pub mod hook;
pub mod record;
pub mod resolver;
pub mod runtime;
pub mod sink;

pub use crate::config::ImporterProperties;
pub use error::{ImporterError, Result};
pub use record::{RecordItem, TransactionType};
pub use resolver::{EntityIdResolver, InMemoryEntityIdResolver, NoopEntityIdResolver};
pub use runtime::Projector;
pub use sink::{CompositeListener, EntityListener, InMemoryLedger, Mutation};
