//! The persisted history.

use std::sync::Arc;

use exn::ResultExt;
use serde_json::{Map, Value};
use time::{Duration, UtcDateTime};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use wisp_storage::error::ErrorKind as StorageErrorKind;
use wisp_storage::{BackendHandle, validate_slot};

use crate::clock::{Clock, SystemClock, truncate_to_millis};
use crate::error::{ErrorKind, Result};
use crate::hash::identify;
use crate::{HistoryEntry, HistoryStore};

/// Name of the storage slot the history lives in unless configured otherwise.
pub const DEFAULT_SLOT: &str = "comfyuiMermaidHistory";
/// Default content budget across all entries: 10 MiB.
pub const DEFAULT_BUDGET: u64 = 10 * 1024 * 1024;

/// Size-bounded, content-addressed history of workflows, persisted to a single
/// storage slot.
///
/// Every operation reads the slot, works on a [`HistoryStore`] and (for
/// mutations) writes the whole store back. Each of those sequences holds the
/// same lock, so concurrent calls on one `History` are serialized and a write
/// always observes every write that completed before it. Sharing a slot
/// between several `History` instances gives no such guarantee.
///
/// Nothing is cached between calls: if persisting fails, the slot still holds
/// the result of the last successful operation and so does the history.
pub struct History {
    backend: BackendHandle,
    slot: String,
    budget: u64,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

impl History {
    /// History in `slot` of `backend`, with the [default budget](DEFAULT_BUDGET).
    ///
    /// # Errors
    ///
    /// Returns [`Storage`](ErrorKind::Storage) if the slot name is invalid.
    pub fn new(backend: BackendHandle, slot: impl Into<String>) -> Result<Self> {
        let slot = slot.into();
        validate_slot(&slot).map_err(ErrorKind::storage)?;
        Ok(Self { backend, slot, budget: DEFAULT_BUDGET, clock: Arc::new(SystemClock), lock: Mutex::new(()) })
    }

    /// Change the maximum total content size, in bytes.
    pub fn with_budget(mut self, budget: u64) -> Self {
        self.budget = budget;
        self
    }

    /// Change where entry timestamps come from.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    /// Remember `content` under `display_name`.
    ///
    /// If the same content is already in the history, its entry is replaced:
    /// it takes the new name and becomes the most recent entry rather than
    /// being stored twice. Afterwards the oldest entries are evicted until the
    /// total size is back within budget, keeping at least the new entry.
    ///
    /// Returns the entry as stored.
    ///
    /// # Errors
    ///
    /// - [`MissingName`](ErrorKind::MissingName) if `display_name` is blank.
    /// - [`InvalidContent`](ErrorKind::InvalidContent) if `content` is not a
    ///   JSON object.
    /// - [`QuotaExceeded`](ErrorKind::QuotaExceeded) if storage refused the
    ///   write. The previous history is untouched.
    /// - [`Storage`](ErrorKind::Storage) for any other storage failure.
    #[instrument(skip(self, content), fields(slot = %self.slot, size = content.len()))]
    pub async fn insert_or_refresh(&self, display_name: &str, content: &str) -> Result<HistoryEntry> {
        if display_name.trim().is_empty() {
            exn::bail!(ErrorKind::MissingName);
        }
        serde_json::from_str::<Map<String, Value>>(content).or_raise(|| ErrorKind::InvalidContent)?;
        // Hashing can be slow for large documents; don't hold the lock for it.
        let hash = identify(content).await;

        let _guard = self.lock.lock().await;
        let mut store = self.load().await?;
        let created_at = self.next_timestamp(&store);
        let entry = HistoryEntry::new(hash, display_name, created_at, content);
        let evicted = store.insert(entry.clone(), self.budget);
        self.persist(&store).await?;
        debug!(hash = %entry.content_hash, evicted = evicted.len(), total = store.total_size(), "history updated");
        Ok(entry)
    }

    /// Every entry, newest first.
    pub async fn list(&self) -> Result<Vec<HistoryEntry>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.into_entries())
    }

    pub async fn get(&self, content_hash: &str) -> Result<Option<HistoryEntry>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.get(content_hash).cloned())
    }

    /// Forget a single entry. Returns `None` (and writes nothing) if there
    /// was no entry with that hash.
    #[instrument(skip(self), fields(slot = %self.slot))]
    pub async fn remove(&self, content_hash: &str) -> Result<Option<HistoryEntry>> {
        let _guard = self.lock.lock().await;
        let mut store = self.load().await?;
        let Some(removed) = store.remove(content_hash) else {
            return Ok(None);
        };
        self.persist(&store).await?;
        Ok(Some(removed))
    }

    /// Forget everything, deleting the slot entirely.
    #[instrument(skip(self), fields(slot = %self.slot))]
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        match self.backend.delete(&self.slot).await {
            Ok(()) => Ok(()),
            Err(e) if matches!(&*e, StorageErrorKind::NotFound(_)) => Ok(()),
            Err(e) => Err(ErrorKind::storage(e)),
        }
    }

    /// Total recorded size of every entry, in bytes.
    pub async fn total_size(&self) -> Result<u64> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.total_size())
    }

    /// Current time, but always later than the newest entry so that recency
    /// is strict even for entries added within the same millisecond.
    fn next_timestamp(&self, store: &HistoryStore) -> UtcDateTime {
        let now = truncate_to_millis(self.clock.now());
        match store.newest() {
            Some(newest) if newest >= now => newest.checked_add(Duration::MILLISECOND).unwrap_or(now),
            _ => now,
        }
    }

    async fn load(&self) -> Result<HistoryStore> {
        let Some(bytes) = self.backend.read(&self.slot).await.map_err(ErrorKind::storage)? else {
            return Ok(HistoryStore::default());
        };
        match HistoryStore::decode(&bytes) {
            Ok(store) => Ok(store),
            Err(e) => {
                // The slot is left as is; the next successful write replaces it.
                warn!(backend = %self.backend.name(), slot = %self.slot, error = ?e, "history is unreadable, starting empty");
                Ok(HistoryStore::default())
            },
        }
    }

    async fn persist(&self, store: &HistoryStore) -> Result<()> {
        let bytes = store.encode()?;
        self.backend.write(&self.slot, &bytes).await.map_err(ErrorKind::storage)
    }
}
