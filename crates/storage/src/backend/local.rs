//! Local filesystem storage backend.
//!
//! Each slot is a single file inside the configured root directory. Writes go
//! to a temporary file in the same directory first, which is then renamed over
//! the slot file, so a crash or a full disk mid-write leaves the previous
//! contents intact.

use crate::error::{ErrorKind, Result};
use crate::{StorageBackend, validate_slot};
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::create_dir_all as sync_create_dir;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;

/// Local filesystem storage backend.
///
/// # Examples
///
/// ```no_run
/// use wisp_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("local", "/home/me/.local/share/wisp").unwrap();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    /// Directory holding one file per slot
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend, creating `root` if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists but is not a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidRoot(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidRoot(root));
            }
        } else {
            // Use non-async here; it'll only happen once on startup and it's
            // not worth the hassle of making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, "", &root))?;
        }
        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn slot_path(&self, slot: &str) -> Result<PathBuf> {
        Ok(self.root.join(validate_slot(slot)?))
    }

    fn map_io_error(e: io::Error, slot: &str, path: &Path) -> ErrorKind {
        match e.kind() {
            io::ErrorKind::NotFound => ErrorKind::NotFound(slot.to_string()),
            io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded | io::ErrorKind::FileTooLarge => {
                ErrorKind::QuotaExceeded(slot.to_string())
            },
            _ => ErrorKind::Io(e),
        }
    }

    /// Write-then-rename. Blocking, run it on the blocking thread pool.
    fn write_atomic(root: &Path, path: &Path, slot: &str, data: &[u8]) -> Result<()> {
        // The temporary file must live on the same filesystem as the target
        // for the final rename to be atomic, hence the same directory.
        let mut file = NamedTempFile::new_in(root).map_err(|e| Self::map_io_error(e, slot, root))?;
        file.write_all(data).map_err(|e| Self::map_io_error(e, slot, file.path()))?;
        file.as_file().sync_all().map_err(|e| Self::map_io_error(e, slot, path))?;
        // On failure the temporary file is removed when dropped.
        file.persist(path).map_err(|e| Self::map_io_error(e.error, slot, path))?;
        Self::sync_dir(root, slot)
    }

    /// Flush the directory entry, so the rename itself survives a crash.
    #[cfg(unix)]
    fn sync_dir(root: &Path, slot: &str) -> Result<()> {
        std::fs::File::open(root)
            .and_then(|dir| dir.sync_all())
            .map_err(|e| Self::map_io_error(e, slot, root))?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_dir(_root: &Path, _slot: &str) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, slot: &str) -> Result<bool> {
        let path = self.slot_path(slot)?;
        Ok(fs::try_exists(&path).await.map_err(ErrorKind::Io)?)
    }

    async fn read(&self, slot: &str) -> Result<Option<Vec<u8>>> {
        let path = self.slot_path(slot)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => exn::bail!(Self::map_io_error(e, slot, &path)),
        }
    }

    async fn write(&self, slot: &str, data: &[u8]) -> Result<()> {
        let path = self.slot_path(slot)?;
        let root = self.root.clone();
        let slot_owned = slot.to_string();
        let data = data.to_vec();
        tracing::debug!(backend = %self.name, slot, size = data.len(), "writing slot");
        tokio::task::spawn_blocking(move || Self::write_atomic(&root, &path, &slot_owned, &data))
            .await
            .or_raise(|| ErrorKind::BackendError(format!("write task for slot `{slot}` did not complete")))?
    }

    async fn delete(&self, slot: &str) -> Result<()> {
        let path = self.slot_path(slot)?;
        Ok(fs::remove_file(&path).await.map_err(|e| Self::map_io_error(e, slot, &path))?)
    }
}
