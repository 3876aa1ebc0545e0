//! Size-bounded, content-addressed history of workflows.
//!
//! Workflows are identified by a BLAKE3 hash of their content, so adding the
//! same workflow twice refreshes the existing entry instead of duplicating it.
//! The total size of everything remembered is capped; once over the cap, the
//! entries that were added longest ago are forgotten first.

mod clock;
mod entry;
pub mod error;
mod hash;
mod history;
mod store;

pub use crate::clock::{Clock, ManualClock, SystemClock, from_millis, to_millis};
pub use crate::entry::{HistoryEntry, UNTITLED};
pub use crate::hash::{FALLBACK_PREFIX, content_hash, fallback_identity, is_fallback};
pub use crate::history::{DEFAULT_BUDGET, DEFAULT_SLOT, History};
pub use crate::store::HistoryStore;
