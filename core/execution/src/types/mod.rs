// dryrun/core/execution/src/types/mod.rs

// Core execution types
pub mod stack_item;
pub mod transaction;

pub use stack_item::{SharedIterator, StackItem};
pub use transaction::{Signer, SigningContext, Transaction, TransactionContext, Witness, WitnessScope};

use dryrun_storage::{Hash160, StorageError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal state of one script execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VmState {
    #[serde(rename = "HALT")]
    Halt,
    #[serde(rename = "FAULT")]
    Fault,
}

impl fmt::Display for VmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmState::Halt => write!(f, "HALT"),
            VmState::Fault => write!(f, "FAULT"),
        }
    }
}

/// Event raised through `System.Runtime.Notify`
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub script_hash: Hash160,
    pub event_name: String,
    pub state: StackItem,
}

/// Message raised through `System.Runtime.Log`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub script_hash: Hash160,
    pub message: String,
}

/// One live frame of the invocation stack, captured when execution stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    pub script_hash: Hash160,
    pub instruction_pointer: usize,
    pub opcode: String,
    pub script_len: usize,
}

/// Execution error
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Contract not found: {0}")]
    ContractNotFound(Hash160),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid NEF file: {0}")]
    InvalidNef(String),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Timestamp {requested} is earlier than current session timestamp {current}")]
    TimestampRegression { current: u64, requested: u64 },

    #[error("A wallet is required for this operation")]
    WalletRequired,

    #[error("Deploy failed: {0}")]
    DeployFailed(String),

    #[error("Total supply overflow")]
    SupplyOverflow,

    #[error("Corrupted record at {0}")]
    CorruptedRecord(String),

    #[error("Stack item cannot be serialized")]
    InvalidOperation,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ExecutionError {
    /// Whether the error names something that does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ExecutionError::SessionNotFound(_) | ExecutionError::ContractNotFound(_)
        )
    }
}
