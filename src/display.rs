//! Human-readable rendering of history entries.

use time::macros::format_description;
use time::{UtcDateTime, UtcOffset};
use wisp_history::HistoryEntry;

const MIB: u64 = 1024 * 1024;
/// Length of abbreviated hashes in listings.
pub const SHORT_HASH: usize = 12;

/// Sizes above 1 MiB in megabytes, everything else in kilobytes, both to one
/// decimal place.
pub fn size(bytes: u64) -> String {
    if bytes > MIB {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}

pub fn date(time: UtcDateTime, offset: UtcOffset) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    time.to_offset(offset).format(format).unwrap_or_else(|_| time.to_string())
}

pub fn short_hash(hash: &str) -> &str {
    hash.get(..SHORT_HASH).unwrap_or(hash)
}

/// One line of `wisp history list`.
pub fn entry_line(entry: &HistoryEntry, offset: UtcOffset) -> String {
    format!(
        "{:<width$}  {}  {:>9}  {}",
        short_hash(&entry.content_hash),
        date(entry.created_at, offset),
        size(entry.byte_size),
        entry.title(),
        width = SHORT_HASH,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::macros::offset;
    use wisp_history::from_millis;

    #[rstest]
    #[case(0, "0.0 KB")]
    #[case(512, "0.5 KB")]
    #[case(1536, "1.5 KB")]
    #[case(1024 * 1024, "1024.0 KB")]
    #[case(1024 * 1024 + 1, "1.0 MB")]
    #[case(10 * 1024 * 1024, "10.0 MB")]
    fn sizes(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(size(bytes), expected);
    }

    #[test]
    fn dates_use_offset() {
        let time = from_millis(1_700_000_000_000).unwrap();
        assert_eq!(date(time, UtcOffset::UTC), "2023-11-14 22:13:20");
        assert_eq!(date(time, offset!(+2)), "2023-11-15 00:13:20");
    }

    #[test]
    fn short_hashes() {
        assert_eq!(short_hash("0123456789abcdef"), "0123456789ab");
        assert_eq!(short_hash("nohash"), "nohash");
    }

    #[test]
    fn entry_lines() {
        let entry = HistoryEntry::new("0123456789abcdef", "", from_millis(1_700_000_000_000).unwrap(), "{}");
        assert_eq!(entry_line(&entry, UtcOffset::UTC), "0123456789ab  2023-11-14 22:13:20     0.0 KB  Untitled Workflow");
    }
}
