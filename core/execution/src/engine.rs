// dryrun/core/execution/src/engine.rs

// Seam between the session layer and the script interpreter
use crate::block::SyntheticBlock;
use crate::types::{CallFrame, LogEvent, Notification, StackItem, TransactionContext, VmState};
use dryrun_storage::{Hash160, Snapshot};

/// Receiver for log events raised while a script runs
pub trait LogSink {
    fn log(&mut self, event: LogEvent);
}

/// Everything the engine needs to run one script
#[derive(Debug, Clone, Copy)]
pub struct ExecutionRequest<'a> {
    pub script: &'a [u8],
    pub container: Option<&'a TransactionContext>,
    pub block: Option<&'a SyntheticBlock>,
    pub gas_limit: i64,
}

/// What the engine reports back once the script halts or faults
#[derive(Debug, Clone)]
pub struct EngineOutcome {
    pub state: VmState,
    pub gas_consumed: i64,
    pub fault: Option<String>,
    pub notifications: Vec<Notification>,
    pub result_stack: Vec<StackItem>,
    pub call_frames: Vec<CallFrame>,
    pub calling_script_hash: Option<Hash160>,
    pub current_script_hash: Option<Hash160>,
    pub entry_script_hash: Option<Hash160>,
}

impl EngineOutcome {
    pub fn halted(&self) -> bool {
        self.state == VmState::Halt
    }
}

/// Script virtual machine.
///
/// `run` must confine every write to `snapshot`; the caller decides whether
/// those writes survive.
pub trait ExecutionEngine: Send + Sync {
    fn run(
        &self,
        request: ExecutionRequest<'_>,
        snapshot: &mut Snapshot<'_>,
        logs: &mut dyn LogSink,
    ) -> EngineOutcome;
}
