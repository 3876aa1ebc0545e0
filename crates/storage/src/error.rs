//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Slot does not exist
    #[display("slot not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Access denied (filesystem permissions)
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// The storage medium refused the write because it is out of space. The
    /// previous contents of the slot are untouched.
    #[display("storage quota exceeded writing slot: {_0}")]
    QuotaExceeded(#[error(not(source))] String),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Slot name is empty, contains separators, or tries to escape the root
    #[display("invalid slot name: {_0:?}")]
    InvalidSlot(#[error(not(source))] String),
    /// Storage root is relative, or is not a directory
    #[display("invalid storage root: {}", _0.display())]
    InvalidRoot(#[error(not(source))] PathBuf),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::BackendError(_))
    }
}
