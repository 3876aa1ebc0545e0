//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, which provides a unified
//! interface for reading and atomically replacing named slots, regardless of
//! where the bytes actually live.

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
use crate::error::Result;
use async_trait::async_trait;

/// Unified interface for slot storage backends.
///
/// All operations are asynchronous; slot names must pass
/// [`validate_slot`](crate::validate_slot), and implementations enforce this.
///
/// # Atomicity
/// [`write()`](Self::write) replaces the whole slot. If it fails, the slot
/// must still hold its previous contents (or still be absent). Partial writes
/// are never observable through [`read()`](Self::read).
///
/// # Examples
///
/// ```
/// use wisp_storage::{backend::StorageBackend, error::Result};
///
/// async fn size_of_slot(backend: &dyn StorageBackend) -> Result<usize> {
///     Ok(backend.read("history").await?.map(|data| data.len()).unwrap_or(0))
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// Check if a slot holds any data.
    async fn exists(&self, slot: &str) -> Result<bool>;

    /// Read the complete contents of a slot.
    ///
    /// A slot that has never been written (or was deleted) is `Ok(None)`,
    /// not an error.
    async fn read(&self, slot: &str) -> Result<Option<Vec<u8>>>;

    /// Atomically replace the contents of a slot.
    ///
    /// Returns [`QuotaExceeded`](crate::error::ErrorKind::QuotaExceeded) if
    /// the medium has no room for the new contents.
    async fn write(&self, slot: &str, data: &[u8]) -> Result<()>;

    /// Delete a slot.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the slot
    /// does not exist.
    async fn delete(&self, slot: &str) -> Result<()>;
}
