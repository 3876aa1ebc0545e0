//! In-memory storage backend for testing.

use crate::error::{ErrorKind, Result};
use crate::{StorageBackend, validate_slot};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Slots are stored in a `HashMap` behind a [`RwLock`], so all trait methods
/// can operate on `&self` without external synchronisation. An optional byte
/// quota simulates a storage medium that refuses writes once full.
///
/// # Examples
///
/// ```ignore
/// use wisp_storage::backend::{MockBackend, StorageBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_slots([("history", "[]")]);
/// assert!(backend.exists("history").await.unwrap());
///
/// let tiny = MockBackend::default().with_quota(4);
/// assert!(tiny.write("history", b"too large").await.is_err());
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    quota: Option<usize>,
    writes: AtomicUsize,
    storage: RwLock<HashMap<String, Vec<u8>>>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with slots.
    ///
    /// Panics if any slot name fails validation. If test setup is wrong, then
    /// test should not pass.
    pub fn with_slots(slots: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        for (slot, data) in slots {
            let slot = slot.into();
            if validate_slot(&slot).is_err() {
                // The panic here is DELIBERATE. MockBackend is intended to be
                // used in tests; panics are expected. There is no error result.
                panic!("MockBackend::with_slots: invalid slot {slot:?}");
            }
            map.insert(slot, data.into());
        }
        Self { name: "mock".to_string(), quota: None, writes: AtomicUsize::new(0), storage: RwLock::new(map) }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Refuse any write that would bring the total stored bytes (across all
    /// slots, after replacement) above `bytes`.
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let slots: [(&str, &str); 0] = [];
        Self::with_slots(slots)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, slot: &str) -> Result<bool> {
        let slot = validate_slot(slot)?;
        Ok(self.storage.read().await.contains_key(slot))
    }

    async fn read(&self, slot: &str) -> Result<Option<Vec<u8>>> {
        let slot = validate_slot(slot)?;
        Ok(self.storage.read().await.get(slot).cloned())
    }

    async fn write(&self, slot: &str, data: &[u8]) -> Result<()> {
        let slot = validate_slot(slot)?;
        let mut guard = self.storage.write().await;
        if let Some(quota) = self.quota {
            let others: usize = guard.iter().filter(|(name, _)| name.as_str() != slot).map(|(_, d)| d.len()).sum();
            if others + data.len() > quota {
                exn::bail!(ErrorKind::QuotaExceeded(slot.to_string()));
            }
        }
        guard.insert(slot.to_string(), data.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, slot: &str) -> Result<()> {
        let slot = validate_slot(slot)?;
        self.storage
            .write()
            .await
            .remove(slot)
            .map(|_| ())
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(slot.to_string())))
    }
}
