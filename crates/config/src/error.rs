//! Configuration Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An explicitly requested configuration file doesn't exist.
    #[display("configuration file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Configuration files must be TOML, YAML or JSON.
    #[display("unsupported configuration file format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// The merged configuration couldn't be deserialized.
    #[display("could not load configuration")]
    Malformed,
    /// A setting has a value that can't be used.
    #[display("invalid value for `{key}`: {reason}")]
    InvalidValue { key: &'static str, reason: &'static str },
    /// No platform data directory, and none configured.
    #[display("could not determine a data directory; set `history.directory`")]
    NoDataDirectory,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        let kind = ErrorKind::InvalidValue { key: "history.budget", reason: "must be greater than zero" };
        assert_eq!(kind.to_string(), "invalid value for `history.budget`: must be greater than zero");
        let kind = ErrorKind::NotFound(PathBuf::from("/etc/wisp.toml"));
        assert_eq!(kind.to_string(), "configuration file not found: /etc/wisp.toml");
        assert!(!kind.is_retryable());
    }
}
