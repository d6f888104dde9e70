//! Per-record handler state.
//!
//! A [`HandlerContext`] lives for exactly one record: it collects touched entity ids, hands
//! out synthetic log indexes, and funnels every emission to the listener. It is created by
//! the projector before dispatch and dropped before the next record starts.

use std::collections::BTreeSet;

use crate::config::{ImporterProperties, PersistProperties};
use crate::domain::EntityId;
use crate::error::{ImporterError, Result};
use crate::record::{EntityRef, RecordItem};
use crate::resolver::{EntityIdResolver, TokenKeys};
use crate::sink::{EntityListener, Mutation};

pub struct HandlerContext<'a> {
    properties: &'a ImporterProperties,
    resolver: &'a dyn EntityIdResolver,
    listener: &'a mut dyn EntityListener,
    entity_ids: BTreeSet<EntityId>,
    next_log_index: i32,
    emitted: usize,
}

impl<'a> HandlerContext<'a> {
    pub fn new(
        properties: &'a ImporterProperties,
        resolver: &'a dyn EntityIdResolver,
        listener: &'a mut dyn EntityListener,
        item: &RecordItem,
    ) -> Self {
        // Synthetic logs are numbered after the EVM logs of the same record.
        let next_log_index = item
            .record
            .contract_function_result
            .as_ref()
            .map_or(0, |result| result.logs.len() as i32);

        Self {
            properties,
            resolver,
            listener,
            entity_ids: BTreeSet::new(),
            next_log_index,
            emitted: 0,
        }
    }

    pub fn properties(&self) -> &ImporterProperties {
        self.properties
    }

    pub fn persist(&self) -> &PersistProperties {
        &self.properties.persist
    }

    /// Tracks an id as touched by the current record. Empty ids are ignored.
    pub fn add_entity_id(&mut self, id: EntityId) {
        if !id.is_empty() {
            self.entity_ids.insert(id);
        }
    }

    pub fn entity_ids(&self) -> &BTreeSet<EntityId> {
        &self.entity_ids
    }

    /// Resolves a raw reference to a canonical id.
    ///
    /// Numeric ids pass through. A long-zero EVM address in the configured shard and realm
    /// decodes locally; any other alias or address goes to the resolver. `None` means
    /// unresolved.
    pub fn resolve(&self, reference: &EntityRef) -> Option<EntityId> {
        let resolved = match reference {
            EntityRef::Id(id) => Some(*id),
            EntityRef::EvmAddress(bytes) | EntityRef::Alias(bytes) => self
                .decode_long_zero(bytes)
                .or_else(|| self.resolver.lookup(reference)),
        };
        let resolved = resolved.filter(|id| !id.is_empty());
        if resolved.is_none() {
            tracing::debug!(target: "mirror::resolver", %reference, "Unresolved entity reference");
        }
        resolved
    }

    /// Resolves an optional reference, mapping absent or unresolved to the empty id.
    pub fn resolve_or_empty(&self, reference: Option<&EntityRef>) -> EntityId {
        reference
            .and_then(|reference| self.resolve(reference))
            .unwrap_or(EntityId::EMPTY)
    }

    /// Resolves an optional reference and tracks the result as touched.
    pub fn resolve_and_track(&mut self, reference: Option<&EntityRef>) -> EntityId {
        let id = self.resolve_or_empty(reference);
        self.add_entity_id(id);
        id
    }

    /// Key presence of a token seen by an earlier record, if known.
    pub fn token_keys(&self, token_id: EntityId) -> Option<TokenKeys> {
        let keys = self.resolver.token_keys(token_id);
        if keys.is_none() {
            tracing::debug!(target: "mirror::resolver", %token_id, "Unknown token keys");
        }
        keys
    }

    fn decode_long_zero(&self, bytes: &[u8]) -> Option<EntityId> {
        let (shard, realm, num) = mirror_common::decode_long_zero_address(bytes)?;
        (shard == self.properties.shard && realm == self.properties.realm)
            .then(|| EntityId::new(shard, realm, num))
    }

    /// Index for the next synthetic contract log of this record.
    pub fn next_log_index(&mut self) -> i32 {
        let index = self.next_log_index;
        self.next_log_index += 1;
        index
    }

    /// Emits one mutation through its typed listener method.
    pub fn emit(&mut self, record: impl Into<Mutation>) -> Result<()> {
        let mutation = record.into();
        metrics::counter!("mirror_importer_mutations_total", "kind" => mutation.kind())
            .increment(1);
        self.emitted += 1;
        mutation
            .emit_to(&mut *self.listener)
            .map_err(ImporterError::Sink)
    }

    /// Number of mutations emitted so far for this record.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn into_entity_ids(self) -> BTreeSet<EntityId> {
        self.entity_ids
    }
}
