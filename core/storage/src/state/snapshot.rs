// dryrun/core/storage/src/state/snapshot.rs

use super::merge::{FindIter, Source};
use crate::db::RootStore;
use crate::types::{Hash256, StorageKey};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Pending entry of a layer: `Some` is a write, `None` a tombstone
type Entry = Option<Vec<u8>>;

enum Parent<'p> {
    Root(Arc<dyn RootStore>),
    Layer(&'p Snapshot<'p>),
}

/// One copy-on-write layer of ledger state.
///
/// A snapshot records only the writes and deletes made through it. Reads fall
/// through to the parent chain and finally to the canonical root. A child
/// borrows its parent immutably, so nothing written to the child can reach the
/// parent until the child is turned into a [`ChangeSet`] and committed.
pub struct Snapshot<'p> {
    parent: Parent<'p>,
    writes: BTreeMap<StorageKey, Entry>,
    depth: usize,
}

impl Snapshot<'static> {
    /// First layer directly on top of the canonical store
    pub fn new(root: Arc<dyn RootStore>) -> Self {
        Self {
            parent: Parent::Root(root),
            writes: BTreeMap::new(),
            depth: 1,
        }
    }
}

impl<'p> Snapshot<'p> {
    /// Create an empty layer whose parent is `self`
    pub fn create_child(&self) -> Snapshot<'_> {
        Snapshot {
            parent: Parent::Layer(self),
            writes: BTreeMap::new(),
            depth: self.depth + 1,
        }
    }

    /// Number of layers between this snapshot and the root, inclusive of itself
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The canonical store at the bottom of the chain
    pub fn root(&self) -> &Arc<dyn RootStore> {
        let mut layer: &Snapshot<'_> = self;
        loop {
            match &layer.parent {
                Parent::Root(root) => return root,
                Parent::Layer(parent) => layer = *parent,
            }
        }
    }

    /// Height of the canonical chain head
    pub fn root_height(&self) -> u32 {
        self.root().height()
    }

    /// Hash of the canonical chain head
    pub fn root_hash(&self) -> Hash256 {
        self.root().head_hash()
    }

    /// Look up a slot; the nearest layer holding an entry wins, tombstones included
    pub fn get(&self, key: &StorageKey) -> Option<Vec<u8>> {
        let mut layer: &Snapshot<'_> = self;
        loop {
            if let Some(entry) = layer.writes.get(key) {
                return entry.clone();
            }
            match &layer.parent {
                Parent::Root(root) => return root.get(key),
                Parent::Layer(parent) => layer = *parent,
            }
        }
    }

    pub fn contains(&self, key: &StorageKey) -> bool {
        self.get(key).is_some()
    }

    /// Record a write in this layer only
    pub fn put(&mut self, key: StorageKey, value: Vec<u8>) {
        self.writes.insert(key, Some(value));
    }

    /// Record a tombstone in this layer only
    pub fn delete(&mut self, key: StorageKey) {
        self.writes.insert(key, None);
    }

    /// Number of entries recorded in this layer
    pub fn pending(&self) -> usize {
        self.writes.len()
    }

    /// Lazily merge every visible slot of `id` whose key starts with `prefix`.
    ///
    /// Entries of nearer layers shadow farther ones, tombstones are dropped and
    /// keys come out in ascending order. Each call recomputes the view.
    pub fn find_by_prefix<'a>(&'a self, id: i32, prefix: &[u8]) -> FindIter<'a> {
        let mut sources = Vec::with_capacity(self.depth + 1);
        let mut layer: &'a Snapshot<'_> = self;
        loop {
            sources.push(Source::layer(&layer.writes, id, prefix));
            match &layer.parent {
                Parent::Root(root) => {
                    sources.push(Source::root(root.seek(id, prefix)));
                    break;
                }
                Parent::Layer(parent) => layer = *parent,
            }
        }
        FindIter::new(sources)
    }

    /// Consume this layer, yielding the diff it recorded
    pub fn into_changes(self) -> ChangeSet {
        ChangeSet {
            entries: self.writes,
        }
    }

    /// Absorb a child's diff into this layer.
    ///
    /// Writes overwrite, tombstones shadow whatever lies below. Keys the child
    /// never touched are left as they were.
    pub fn commit(&mut self, changes: ChangeSet) {
        debug!(
            "Committing {} entries into layer at depth {}",
            changes.len(),
            self.depth
        );
        self.writes.extend(changes.entries);
    }
}

impl fmt::Debug for Snapshot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("depth", &self.depth)
            .field("pending", &self.writes.len())
            .finish()
    }
}

/// Diff of one layer, detached from the layer's parent borrow
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    entries: BTreeMap<StorageKey, Entry>,
}

impl ChangeSet {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order; `None` marks a delete
    pub fn iter(&self) -> impl Iterator<Item = (&StorageKey, Option<&Vec<u8>>)> {
        self.entries.iter().map(|(k, v)| (k, v.as_ref()))
    }

    pub fn into_entries(self) -> impl Iterator<Item = (StorageKey, Option<Vec<u8>>)> {
        self.entries.into_iter()
    }
}
