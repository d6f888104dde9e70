use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

/// One logged mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub id: u64,
    pub kind: &'static str,
    pub record: serde_json::Value,
}

/// Bounded buffer of the most recent entries plus per-kind totals, shared between the
/// listener and its readers.
#[derive(Debug, Clone)]
pub struct LogStore {
    entries: Arc<RwLock<VecDeque<LogEntry>>>,
    counts: Arc<RwLock<BTreeMap<&'static str, u64>>>,
    max_entries: usize,
}

impl LogStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
            counts: Arc::new(RwLock::new(BTreeMap::new())),
            max_entries,
        }
    }

    pub fn add(&self, entry: LogEntry) {
        *self
            .counts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(entry.kind)
            .or_default() += 1;
        if self.max_entries == 0 {
            return;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.push_back(entry);
        if entries.len() > self.max_entries {
            entries.pop_front();
        }
    }

    /// Up to `limit` most recent entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    /// Total entries seen per mutation kind, including those no longer buffered.
    pub fn counts(&self) -> BTreeMap<&'static str, u64> {
        self.counts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
