//! Content identity.

use std::sync::atomic::{AtomicU64, Ordering};
use time::UtcDateTime;
use tracing::warn;

/// Content below this size is hashed inline; anything larger is hashed on the
/// blocking thread pool so the runtime isn't stalled.
const INLINE_HASH_LIMIT: usize = 64 * 1024;
/// Prefix of identities that are not derived from content.
pub const FALLBACK_PREFIX: &str = "nohash-";

static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// BLAKE3 digest of `content` as 64 lowercase hex characters.
///
/// # Examples
///
/// ```rust
/// let hash = wisp_history::content_hash("{}");
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, wisp_history::content_hash("{}"));
/// ```
pub fn content_hash(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_string()
}

/// An identity that is unique for this process, but says nothing about the
/// content. Entries with a fallback identity are never deduplicated.
pub fn fallback_identity() -> String {
    let counter = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{FALLBACK_PREFIX}{}-{counter}", UtcDateTime::now().unix_timestamp_nanos())
}

/// Whether `hash` was produced by [`fallback_identity`].
pub fn is_fallback(hash: &str) -> bool {
    hash.starts_with(FALLBACK_PREFIX)
}

/// Hash `content`, falling back to a session-unique identity if hashing could
/// not complete rather than failing the whole operation.
pub(crate) async fn identify(content: &str) -> String {
    if content.len() < INLINE_HASH_LIMIT {
        return content_hash(content);
    }
    let owned = content.to_string();
    match tokio::task::spawn_blocking(move || content_hash(&owned)).await {
        Ok(hash) => hash,
        Err(e) => {
            let fallback = fallback_identity();
            warn!(error = %e, %fallback, "failed to hash content, using fallback identity");
            fallback
        },
    }
}
