// dryrun/core/storage/src/db/memory_store.rs

use super::{RootStore, SeekIter};
use crate::types::{Hash256, StorageKey};
use std::collections::BTreeMap;
use tracing::debug;

/// In-memory canonical store.
///
/// Populated through `&mut self` while the ledger is being built, then frozen
/// behind an `Arc<dyn RootStore>` where it is only ever read.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<StorageKey, Vec<u8>>,
    height: u32,
    head_hash: Hash256,
    head_timestamp: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: StorageKey, value: Vec<u8>) {
        self.entries.insert(key, value);
    }

    pub fn delete(&mut self, key: &StorageKey) {
        self.entries.remove(key);
    }

    /// Record a new chain head
    pub fn set_head(&mut self, height: u32, hash: Hash256, timestamp: u64) {
        debug!("Root store head set to {} ({})", height, hash);
        self.height = height;
        self.head_hash = hash;
        self.head_timestamp = timestamp;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply a batch of writes and deletes
    pub fn apply<I>(&mut self, changes: I)
    where
        I: IntoIterator<Item = (StorageKey, Option<Vec<u8>>)>,
    {
        for (key, value) in changes {
            match value {
                Some(value) => {
                    self.entries.insert(key, value);
                }
                None => {
                    self.entries.remove(&key);
                }
            }
        }
    }
}

impl RootStore for MemoryStore {
    fn get(&self, key: &StorageKey) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn seek<'a>(&'a self, id: i32, prefix: &[u8]) -> SeekIter<'a> {
        let start = StorageKey::new(id, prefix.to_vec());
        let prefix = prefix.to_vec();
        Box::new(
            self.entries
                .range(start..)
                .take_while(move |(k, _)| k.matches(id, &prefix))
                .map(|(k, v)| (k.key.clone(), v.clone())),
        )
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn head_hash(&self) -> Hash256 {
        self.head_hash
    }

    fn head_timestamp(&self) -> u64 {
        self.head_timestamp
    }
}
