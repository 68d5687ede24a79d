// dryrun/core/storage/src/state/mod.rs

// Copy-on-write state layers
pub mod merge;
pub mod snapshot;

pub use merge::FindIter;
pub use snapshot::{ChangeSet, Snapshot};
