// dryrun/core/storage/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Integer too large: {0} bytes")]
    IntegerOverflow(usize),
}
