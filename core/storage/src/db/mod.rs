// dryrun/core/storage/src/db/mod.rs

// Canonical ledger root store
pub mod memory_store;

pub use memory_store::MemoryStore;

use crate::types::{Hash256, StorageKey};

/// Iterator over `(key bytes, value)` pairs of one contract, ascending by key
pub type SeekIter<'a> = Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a>;

/// Read-only view of the canonical ledger that every session is layered on.
///
/// Implementations are shared across sessions and must never be mutated
/// through this trait.
pub trait RootStore: Send + Sync {
    /// Point lookup of a storage slot
    fn get(&self, key: &StorageKey) -> Option<Vec<u8>>;

    /// Ascending iteration over the slots of `id` whose key starts with `prefix`
    fn seek<'a>(&'a self, id: i32, prefix: &[u8]) -> SeekIter<'a>;

    /// Height of the current chain head
    fn height(&self) -> u32;

    /// Hash of the current chain head
    fn head_hash(&self) -> Hash256;

    /// Timestamp of the current chain head, in milliseconds
    fn head_timestamp(&self) -> u64;
}
