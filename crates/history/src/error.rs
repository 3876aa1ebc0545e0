//! History Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use wisp_storage::error::{Error as StorageError, ErrorKind as StorageErrorKind};

/// A history error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for history operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Content handed to the history is not a JSON object. Nothing was stored.
    #[display("invalid workflow data provided for history")]
    InvalidContent,
    /// An entry needs a display name. Nothing was stored.
    #[display("history entries require a display name")]
    MissingName,
    /// The storage medium refused to persist the history. The previously
    /// persisted history is still intact.
    #[display("could not save history: storage quota exceeded ({_0})")]
    QuotaExceeded(#[error(not(source))] String),
    /// The persisted history could not be understood.
    #[display("persisted history is corrupt")]
    CorruptStore,
    /// Reading or writing the persisted history failed.
    #[display("history storage error")]
    Storage,
}

impl ErrorKind {
    /// Convert a storage error into a history error, preserving the storage
    /// crate's `Exn` frame (error tree) as a child in its own error tree.
    #[track_caller]
    pub fn storage(err: StorageError) -> Error {
        let kind = match &*err {
            StorageErrorKind::QuotaExceeded(slot) => Self::QuotaExceeded(slot.clone()),
            _ => Self::Storage,
        };
        err.raise(kind)
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage)
    }

    /// Returns `true` if the failure should be surfaced as a warning: the
    /// operation didn't happen, but nothing already stored was lost.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_))
    }
}
