use serde::{Deserialize, Serialize};
use time::UtcDateTime;

/// Shown in place of an empty display name.
pub const UNTITLED: &str = "Untitled Workflow";

/// A single workflow remembered by the history.
///
/// The `content_hash` is the identity: two entries with the same hash are the
/// same workflow, whatever they were called or whenever they were added.
///
/// Serialized field names are camelCase; the older `{hash, name, timestamp,
/// size, content}` layout is still accepted when reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// BLAKE3 hash of `content` (or a fallback identity, see
    /// [`fallback_identity`](crate::fallback_identity))
    #[serde(alias = "hash")]
    pub content_hash: String,
    #[serde(alias = "name", default)]
    pub display_name: String,
    /// When this content was last added (millisecond precision)
    #[serde(alias = "timestamp", with = "millis")]
    pub created_at: UtcDateTime,
    /// Length of `content` in bytes
    #[serde(alias = "size", default)]
    pub byte_size: u64,
    pub content: String,
}
impl HistoryEntry {
    pub fn new(
        content_hash: impl Into<String>,
        display_name: impl Into<String>,
        created_at: UtcDateTime,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        Self {
            content_hash: content_hash.into(),
            display_name: display_name.into(),
            created_at,
            byte_size: content.len() as u64,
            content,
        }
    }

    /// Display name, or a placeholder if there isn't one.
    pub fn title(&self) -> &str {
        match self.display_name.trim() {
            "" => UNTITLED,
            _ => &self.display_name,
        }
    }

    /// Older layouts didn't always record a size; recover it from the content.
    pub(crate) fn normalized(mut self) -> Self {
        if self.byte_size == 0 {
            self.byte_size = self.content.len() as u64;
        }
        self
    }
}

mod millis {
    use crate::clock::{from_millis, to_millis};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::UtcDateTime;

    pub fn serialize<S: Serializer>(time: &UtcDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(to_millis(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<UtcDateTime, D::Error> {
        let millis = i64::deserialize(deserializer)?;
        from_millis(millis).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::from_millis;
    use serde_json::json;

    #[test]
    fn serializes_camel_case_millis() {
        let entry = HistoryEntry::new("abc", "flow.png", from_millis(1_700_000_000_123).unwrap(), "{}");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!({
                "contentHash": "abc",
                "displayName": "flow.png",
                "createdAt": 1_700_000_000_123i64,
                "byteSize": 2,
                "content": "{}",
            })
        );
        let back: HistoryEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn reads_legacy_layout() {
        let value = json!({
            "hash": "abc",
            "name": "old.png",
            "timestamp": 1_600_000_000_000i64,
            "content": "{\"a\":1}",
        });
        let entry = serde_json::from_value::<HistoryEntry>(value).unwrap().normalized();
        assert_eq!(entry.content_hash, "abc");
        assert_eq!(entry.display_name, "old.png");
        assert_eq!(entry.created_at, from_millis(1_600_000_000_000).unwrap());
        assert_eq!(entry.byte_size, 7);
    }

    #[test]
    fn rejects_entries_without_content() {
        let value = json!({ "hash": "abc", "name": "old.png", "timestamp": 1 });
        assert!(serde_json::from_value::<HistoryEntry>(value).is_err());
    }

    #[test]
    fn title_falls_back() {
        let mut entry = HistoryEntry::new("abc", "  ", UtcDateTime::UNIX_EPOCH, "{}");
        assert_eq!(entry.title(), UNTITLED);
        entry.display_name = "flow.png".to_string();
        assert_eq!(entry.title(), "flow.png");
    }
}
