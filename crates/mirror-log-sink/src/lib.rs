//! Entity listener that logs every projected mutation.
//!
//! Useful when replaying records by hand: each mutation is logged under the
//! `mirror::sinks::log` target and buffered in a bounded [`LogStore`] that stays readable
//! after the listener itself has been boxed into a composite.

mod store;

use mirror_importer::sink::{EntityListener, Mutation};

pub use store::{LogEntry, LogStore};

pub struct LogListener {
    store: LogStore,
    /// Only mutations of this kind are logged when set.
    kind_filter: Option<String>,
    next_id: u64,
}

impl LogListener {
    /// Creates a listener keeping at most `max_entries` recent entries.
    pub fn new(max_entries: usize) -> Self {
        tracing::info!(
            target: "mirror::sinks::log",
            max_entries,
            "LogListener initialized"
        );
        Self {
            store: LogStore::new(max_entries),
            kind_filter: None,
            next_id: 1,
        }
    }

    pub fn with_kind_filter(mut self, kind: impl Into<String>) -> Self {
        self.kind_filter = Some(kind.into());
        self
    }

    /// Handle on the shared store.
    pub fn store(&self) -> LogStore {
        self.store.clone()
    }
}

impl EntityListener for LogListener {
    fn on_mutation(&mut self, mutation: Mutation) -> anyhow::Result<()> {
        let kind = mutation.kind();
        if self
            .kind_filter
            .as_deref()
            .is_some_and(|filter| filter != kind)
        {
            return Ok(());
        }

        let mut value = serde_json::to_value(&mutation)?;
        let record = value
            .get_mut("record")
            .map(serde_json::Value::take)
            .unwrap_or_default();

        let id = self.next_id;
        self.next_id += 1;
        tracing::info!(
            target: "mirror::sinks::log",
            "Mutation #{}: {} {}",
            id,
            kind,
            record
        );
        self.store.add(LogEntry { id, kind, record });
        Ok(())
    }
}
