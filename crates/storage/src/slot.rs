//! Slot name validation.
//!
//! Slot names end up as file names for the local backend, so anything that
//! could be interpreted as a path is rejected outright instead of normalized.

use crate::error::{ErrorKind, Result};

/// Validates a slot name, returning it unchanged if valid.
///
/// A valid slot name is non-empty, is not `.` or `..`, and contains no path
/// separators, null bytes or other control characters.
///
/// # Examples
///
/// ```
/// use wisp_storage::validate_slot;
/// assert!(validate_slot("comfyuiMermaidHistory").is_ok());
/// assert!(validate_slot("history.json").is_ok());
/// assert!(validate_slot("").is_err());
/// assert!(validate_slot("..").is_err());
/// assert!(validate_slot("a/b").is_err());
/// assert!(validate_slot("a\0b").is_err());
/// ```
pub fn validate(slot: &str) -> Result<&str> {
    let invalid = slot.is_empty()
        || slot == "."
        || slot == ".."
        || slot.chars().any(|c| c == '/' || c == '\\' || c.is_control());
    if invalid {
        exn::bail!(ErrorKind::InvalidSlot(slot.to_string()));
    }
    Ok(slot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_names() {
        for slot in ["history", "comfyuiMermaidHistory", "history.v2.json", ".hidden", "with space"] {
            assert_eq!(validate(slot).unwrap(), slot);
        }
    }

    #[test]
    fn rejects_path_like_names() {
        for slot in ["", ".", "..", "../escape", "a/b", "a\\b", "/abs", "tab\there", "nul\0"] {
            let err = validate(slot).unwrap_err();
            assert!(matches!(&*err, ErrorKind::InvalidSlot(s) if s == slot));
        }
    }
}
