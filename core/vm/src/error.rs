// dryrun/core/vm/src/error.rs

use dryrun_execution::ExecutionError;
use dryrun_storage::{Hash160, StorageError};
use thiserror::Error;

/// Reasons a script faults. The display text becomes the result's exception.
#[derive(Error, Debug)]
pub enum VmError {
    #[error("Insufficient GAS.")]
    InsufficientGas,

    #[error("ABORT is executed.")]
    Abort,

    #[error("ASSERT is executed with false result.")]
    AssertFailed,

    #[error("Stack underflow")]
    StackUnderflow,

    #[error("Stack overflow")]
    StackOverflow,

    #[error("MaxInvocationStackSize exceeded")]
    InvocationDepth,

    #[error("Invalid type: expected {expected}, found {found}")]
    InvalidType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Invalid jump target {0}")]
    InvalidJump(i64),

    #[error("Index out of range: {0}")]
    IndexOutOfRange(i128),

    #[error("Unknown syscall 0x{0:08x}")]
    UnknownSyscall(u32),

    #[error("Called Contract Does Not Exist: {0}")]
    ContractNotFound(Hash160),

    #[error("Method \"{method}\" with {argc} parameter(s) doesn't exist in the contract {contract}.")]
    MethodNotFound {
        contract: Hash160,
        method: String,
        argc: usize,
    },

    #[error("Contract Already Exists: {0}")]
    ContractExists(Hash160),

    #[error("{0}")]
    InvalidOperation(String),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, VmError>;
