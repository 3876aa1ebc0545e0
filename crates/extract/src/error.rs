//! Extraction Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// Every way an extraction can fail ends up as exactly one of these; the
/// scanner never panics on hostile input.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input does not start with the PNG signature.
    #[display("invalid PNG file format")]
    InvalidFormat,
    /// The container is readable but holds no record for the keyword.
    #[display("no '{_0}' text chunk found in PNG file")]
    KeywordAbsent(#[error(not(source))] String),
    /// The record exists, but its value is not a well-formed JSON object.
    #[display("found '{_0}' text chunk, but content is not valid JSON")]
    MalformedContent(#[error(not(source))] String),
    /// Chunk offsets are inconsistent with the size of the input.
    #[display("error while parsing PNG chunk structure at offset {offset}: {reason}")]
    ParseError {
        /// Byte offset of the chunk that could not be read.
        offset: u64,
        /// What was expected at that offset.
        reason: &'static str,
    },
    /// Reading from the underlying source failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // The bytes are either a valid container or they're not; reading
        // them again won't change that. Only the reader itself can flake.
        matches!(self, Self::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::InvalidFormat.to_string(), "invalid PNG file format");
        assert_eq!(
            ErrorKind::KeywordAbsent("workflow".to_string()).to_string(),
            "no 'workflow' text chunk found in PNG file"
        );
        assert_eq!(
            ErrorKind::ParseError { offset: 33, reason: "chunk data" }.to_string(),
            "error while parsing PNG chunk structure at offset 33: chunk data"
        );
    }

    #[test]
    fn only_io_is_retryable() {
        assert!(!ErrorKind::InvalidFormat.is_retryable());
        assert!(!ErrorKind::MalformedContent("workflow".to_string()).is_retryable());
        assert!(ErrorKind::Io.is_retryable());
    }
}
