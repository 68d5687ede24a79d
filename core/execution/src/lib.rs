// dryrun/core/execution/src/lib.rs

// Re-export modules
pub mod block;
pub mod config;
pub mod contract;
pub mod deploy;
pub mod diagnostics;
pub mod engine;
pub mod executor;
pub mod metrics;
pub mod native;
pub mod patch;
pub mod result;
pub mod script;
pub mod session;
pub mod types;
pub mod wallet;

pub use block::SyntheticBlock;
pub use config::{ExecutionConfig, GAS_FACTOR};
pub use contract::{ContractAbi, ContractManifest, ContractState, MethodDescriptor, NefFile};
pub use diagnostics::DiagnosticsCollector;
pub use engine::{EngineOutcome, ExecutionEngine, ExecutionRequest, LogSink};
pub use executor::SessionExecutor;
pub use patch::BalancePatch;
pub use result::ExecutionResult;
pub use script::{Instruction, OpCode, ScriptBuilder, Syscall};
pub use session::{Session, SessionHandle, SessionRegistry};
pub use types::{
    CallFrame, ExecutionError, LogEvent, Notification, SharedIterator, Signer, SigningContext,
    StackItem, Transaction, TransactionContext, VmState, Witness, WitnessScope,
};
pub use wallet::{TransactionRequest, Wallet, WalletError};
