// dryrun/core/storage/src/lib.rs

// Layered ledger state for session sandboxes
pub mod codec;
pub mod db;
pub mod error;
pub mod state;
pub mod types;

pub use codec::{decode_integer, encode_integer};
pub use db::{MemoryStore, RootStore, SeekIter};
pub use error::StorageError;
pub use state::{ChangeSet, FindIter, Snapshot};
pub use types::{Hash160, Hash256, StorageKey};
