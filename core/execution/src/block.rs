// dryrun/core/execution/src/block.rs

// Synthetic block headers for sessions pinned to a timestamp
use dryrun_storage::{Hash160, Hash256, Snapshot};
use serde::{Deserialize, Serialize};

/// Header of the block a pinned session pretends to be persisting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticBlock {
    pub version: u32,
    pub prev_hash: Hash256,
    pub merkle_root: Hash256,
    pub timestamp: u64,
    pub nonce: u64,
    pub index: u32,
    pub primary_index: u8,
    pub next_consensus: Hash160,
}

impl SyntheticBlock {
    pub fn hash(&self) -> Hash256 {
        Hash256::digest(&bincode::serialize(self).unwrap_or_default())
    }
}

/// Header following the canonical head, stamped with `timestamp`
pub fn synthesize(snapshot: &Snapshot<'_>, timestamp: u64) -> SyntheticBlock {
    SyntheticBlock {
        version: 0,
        prev_hash: snapshot.root_hash(),
        merkle_root: Hash256::ZERO,
        timestamp,
        nonce: 0,
        index: snapshot.root_height().saturating_add(1),
        primary_index: 0,
        next_consensus: Hash160::ZERO,
    }
}
