//! Storage for named slots.
//!
//! A slot is a single opaque blob addressed by name, replaced as a whole on
//! every write. Backends guarantee that a failed write never leaves a slot
//! partially written: readers either see the previous contents or the new
//! ones.

pub mod backend;
pub mod error;
mod slot;

pub use crate::backend::StorageBackend;
pub use crate::slot::validate as validate_slot;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
