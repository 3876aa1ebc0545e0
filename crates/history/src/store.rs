//! In-memory history and its eviction policy.
//!
//! [`HistoryStore`] knows nothing about where it is persisted; it is decoded
//! from and encoded to the bytes of a single storage slot by the
//! [`History`](crate::History).

use std::cmp::Ordering;
use std::collections::HashMap;

use exn::ResultExt;
use serde_json::Value;
use time::UtcDateTime;
use tracing::{debug, warn};

use crate::HistoryEntry;
use crate::error::{ErrorKind, Result};

/// Collection of entries with unique content hashes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    /// Decode a persisted JSON array of entries.
    ///
    /// Elements that aren't valid entries are dropped (with a warning) rather
    /// than discarding everything else. If the same hash appears more than
    /// once, the most recent entry is kept.
    ///
    /// # Errors
    ///
    /// Returns [`CorruptStore`](ErrorKind::CorruptStore) if `bytes` aren't
    /// JSON, or aren't a JSON array.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let values: Vec<Value> = serde_json::from_slice(bytes).or_raise(|| ErrorKind::CorruptStore)?;
        let mut latest: HashMap<String, HistoryEntry> = HashMap::with_capacity(values.len());
        for (index, value) in values.into_iter().enumerate() {
            let entry = match serde_json::from_value::<HistoryEntry>(value) {
                Ok(entry) => entry.normalized(),
                Err(e) => {
                    warn!(index, error = %e, "dropping unreadable history entry");
                    continue;
                },
            };
            match latest.get(&entry.content_hash) {
                Some(existing) if existing.created_at >= entry.created_at => {},
                _ => {
                    latest.insert(entry.content_hash.clone(), entry);
                },
            }
        }
        let mut store = Self { entries: latest.into_values().collect() };
        store.sort();
        Ok(store)
    }

    /// Encode as a JSON array of entries, newest first.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.entries).or_raise(|| ErrorKind::CorruptStore)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of the recorded size of every entry.
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|entry| entry.byte_size).sum()
    }

    pub fn get(&self, content_hash: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.content_hash == content_hash)
    }

    /// Timestamp of the most recently added entry.
    pub fn newest(&self) -> Option<UtcDateTime> {
        self.entries.iter().map(|entry| entry.created_at).max()
    }

    pub fn remove(&mut self, content_hash: &str) -> Option<HistoryEntry> {
        let index = self.entries.iter().position(|entry| entry.content_hash == content_hash)?;
        Some(self.entries.remove(index))
    }

    /// Insert `entry`, replacing any entry with the same hash, then evict the
    /// oldest entries until everything fits in `budget` bytes.
    ///
    /// Eviction order is strictly by `created_at` (oldest first), not by how
    /// recently an entry was read. The new entry itself is never evicted, even
    /// when it alone exceeds the budget, and is placed by its `created_at`.
    /// Returns the evicted entries.
    pub fn insert(&mut self, entry: HistoryEntry, budget: u64) -> Vec<HistoryEntry> {
        let mut total = self.total_size();
        if let Some(existing) = self.remove(&entry.content_hash) {
            debug!(hash = %existing.content_hash, name = %entry.display_name, "refreshing existing history entry");
            total = total.saturating_sub(existing.byte_size);
        }
        total += entry.byte_size;

        let mut evicted = Vec::new();
        while total > budget {
            let Some(oldest) = self.oldest_index() else { break };
            let removed = self.entries.remove(oldest);
            debug!(hash = %removed.content_hash, name = %removed.display_name, "history limit exceeded, evicting oldest entry");
            total = total.saturating_sub(removed.byte_size);
            evicted.push(removed);
        }
        let position = self.entries.partition_point(|existing| newest_first(existing, &entry).is_lt());
        self.entries.insert(position, entry);
        evicted
    }

    /// Entries newest first, ties ordered by hash.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<HistoryEntry> {
        self.entries
    }

    fn sort(&mut self) {
        self.entries.sort_by(newest_first);
    }

    fn oldest_index(&self) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.created_at.cmp(&b.created_at).then_with(|| a.content_hash.cmp(&b.content_hash)))
            .map(|(index, _)| index)
    }
}

fn newest_first(a: &HistoryEntry, b: &HistoryEntry) -> Ordering {
    b.created_at.cmp(&a.created_at).then_with(|| a.content_hash.cmp(&b.content_hash))
}
