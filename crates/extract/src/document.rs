//! Validation of the embedded structured document.

use serde::de::IgnoredAny;

use crate::error::{ErrorKind, Result};

/// Returns `true` if `text` is a well-formed JSON object.
///
/// Workflows are always objects, so arrays, strings and other bare JSON values
/// are rejected even though they parse. The value is only validated, never
/// built in memory.
///
/// # Examples
///
/// ```rust
/// use wisp_extract::is_document;
/// assert!(is_document(r#" {"nodes": [], "links": []} "#));
/// assert!(!is_document(r#"{"nodes": ["#));
/// assert!(!is_document("[1, 2, 3]"));
/// ```
pub fn is_document(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.starts_with('{') && trimmed.ends_with('}') && serde_json::from_str::<IgnoredAny>(trimmed).is_ok()
}

/// Decodes a text chunk value into the document string it carries.
pub(crate) fn decode(value: &[u8], keyword: &str) -> Result<String> {
    let Ok(text) = std::str::from_utf8(value) else {
        tracing::warn!(keyword, "text chunk value is not valid UTF-8");
        exn::bail!(ErrorKind::MalformedContent(keyword.to_string()));
    };
    if !is_document(text) {
        let preview: String = text.chars().take(100).collect();
        tracing::warn!(keyword, %preview, "text chunk value is not a JSON object");
        exn::bail!(ErrorKind::MalformedContent(keyword.to_string()));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{}"#, true)]
    #[case(r#"{"last_node_id": 9, "nodes": [{"id": 1}]}"#, true)]
    #[case("\n\t{\"a\": 1}\n", true)]
    #[case(r#"{"a": 1"#, false)]
    #[case(r#"{"a": 1}}"#, false)]
    #[case(r#"{not json}"#, false)]
    #[case("[]", false)]
    #[case("\"{}\"", false)]
    #[case("", false)]
    fn test_is_document(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(is_document(text), expected);
    }

    #[test]
    fn decode_keeps_text_verbatim() {
        let value = " {\"a\": \"é\"}\n";
        assert_eq!(decode(value.as_bytes(), "workflow").unwrap(), value);
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        let err = decode(b"{\"a\": \"\xff\"}", "workflow").unwrap_err();
        assert_eq!(*err, ErrorKind::MalformedContent("workflow".to_string()));
    }
}
