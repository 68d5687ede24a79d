// dryrun/core/vm/src/engine.rs

// Reference stack machine behind the session executor
use crate::error::{Result, VmError};
use crate::gas;
use dryrun_execution::{
    CallFrame, EngineOutcome, ExecutionEngine, ExecutionRequest, Instruction, LogSink,
    Notification, OpCode, StackItem, SyntheticBlock, TransactionContext, VmState, WitnessScope,
};
use dryrun_storage::{Hash160, RootStore, Snapshot};
use std::sync::Arc;
use tracing::trace;

/// Deepest allowed chain of contract calls
pub const MAX_INVOCATION_DEPTH: usize = 1024;
/// Largest evaluation stack of a single frame
pub const MAX_STACK_SIZE: usize = 2048;
/// Block time assumed when no synthetic block is pinned
pub const MILLISECONDS_PER_BLOCK: u64 = 15_000;

/// Interpreter for the sandbox script format
#[derive(Debug, Clone, Default)]
pub struct ReferenceEngine;

impl ReferenceEngine {
    pub fn new() -> Self {
        Self
    }
}

impl ExecutionEngine for ReferenceEngine {
    fn run(
        &self,
        request: ExecutionRequest<'_>,
        snapshot: &mut Snapshot<'_>,
        logs: &mut dyn LogSink,
    ) -> EngineOutcome {
        Machine::new(request, snapshot, logs).execute(request.script)
    }
}

/// One entry of the invocation stack
pub(crate) struct Frame {
    pub script: Arc<[u8]>,
    pub script_hash: Hash160,
    /// Storage id of the running contract; `None` for the entry script
    pub contract_id: Option<i32>,
    pub ip: usize,
    pub args: Vec<StackItem>,
    pub stack: Vec<StackItem>,
}

impl Frame {
    pub fn new(script: Arc<[u8]>, script_hash: Hash160, contract_id: Option<i32>, ip: usize, args: Vec<StackItem>) -> Self {
        Self {
            script,
            script_hash,
            contract_id,
            ip,
            args,
            stack: Vec::new(),
        }
    }

    fn snapshot(&self) -> CallFrame {
        let opcode = match Instruction::decode(&self.script, self.ip) {
            Ok(instruction) => format!("{:?}", instruction.opcode),
            Err(_) => "INVALID".to_string(),
        };
        CallFrame {
            script_hash: self.script_hash,
            instruction_pointer: self.ip,
            opcode,
            script_len: self.script.len(),
        }
    }
}

/// How control continues after an instruction
pub(crate) enum Flow {
    Next,
    Jump(usize),
    Return,
    Enter(Frame),
}

pub(crate) struct Machine<'a, 'p> {
    pub snapshot: &'a mut Snapshot<'p>,
    pub logs: &'a mut dyn LogSink,
    pub container: Option<&'a TransactionContext>,
    pub block: Option<&'a SyntheticBlock>,
    pub notifications: Vec<Notification>,
    pub frames: Vec<Frame>,
    gas_limit: i64,
    gas_consumed: i64,
    entry_hash: Hash160,
    result_stack: Vec<StackItem>,
}

impl<'a, 'p> Machine<'a, 'p> {
    fn new(request: ExecutionRequest<'a>, snapshot: &'a mut Snapshot<'p>, logs: &'a mut dyn LogSink) -> Self {
        Self {
            snapshot,
            logs,
            container: request.container,
            block: request.block,
            notifications: Vec::new(),
            frames: Vec::new(),
            gas_limit: request.gas_limit,
            gas_consumed: 0,
            entry_hash: Hash160::digest(request.script),
            result_stack: Vec::new(),
        }
    }

    fn execute(mut self, script: &[u8]) -> EngineOutcome {
        self.frames.push(Frame::new(Arc::from(script), self.entry_hash, None, 0, Vec::new()));

        let fault = loop {
            if self.frames.is_empty() {
                break None;
            }
            if let Err(e) = self.step() {
                break Some(e);
            }
        };

        let state = if fault.is_some() { VmState::Fault } else { VmState::Halt };
        trace!("Script {} stopped in {} after {} gas", self.entry_hash, state, self.gas_consumed);
        let call_frames = self.frames.iter().rev().map(Frame::snapshot).collect();
        let calling_script_hash = self.calling_hash();
        let current_script_hash = self.frames.last().map(|f| f.script_hash);
        EngineOutcome {
            state,
            gas_consumed: self.gas_consumed,
            fault: fault.map(|e| e.to_string()),
            notifications: self.notifications,
            result_stack: self.result_stack,
            call_frames,
            calling_script_hash,
            current_script_hash,
            entry_script_hash: Some(self.entry_hash),
        }
    }

    pub fn charge(&mut self, amount: i64) -> Result<()> {
        self.gas_consumed = self.gas_consumed.saturating_add(amount);
        if self.gas_consumed > self.gas_limit {
            return Err(VmError::InsufficientGas);
        }
        Ok(())
    }

    pub fn current(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    pub fn current_hash(&self) -> Hash160 {
        self.frames.last().map(|f| f.script_hash).unwrap_or(self.entry_hash)
    }

    /// Hash of the frame below the current one
    pub fn calling_hash(&self) -> Option<Hash160> {
        let len = self.frames.len();
        (len >= 2).then(|| self.frames[len - 2].script_hash)
    }

    pub fn push(&mut self, item: StackItem) -> Result<()> {
        let frame = self.current();
        if frame.stack.len() >= MAX_STACK_SIZE {
            return Err(VmError::StackOverflow);
        }
        frame.stack.push(item);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<StackItem> {
        self.current().stack.pop().ok_or(VmError::StackUnderflow)
    }

    pub fn pop_integer(&mut self) -> Result<i128> {
        let item = self.pop()?;
        item.as_integer().ok_or(VmError::InvalidType {
            expected: "Integer",
            found: item.type_name(),
        })
    }

    pub fn pop_bytes(&mut self) -> Result<Vec<u8>> {
        let item = self.pop()?;
        item.as_bytes().ok_or(VmError::InvalidType {
            expected: "ByteString",
            found: item.type_name(),
        })
    }

    pub fn pop_string(&mut self) -> Result<String> {
        let bytes = self.pop_bytes()?;
        String::from_utf8(bytes).map_err(|_| VmError::InvalidOperation("string is not valid UTF-8".to_string()))
    }

    pub fn pop_hash(&mut self) -> Result<Hash160> {
        let bytes = self.pop_bytes()?;
        Hash160::from_slice(&bytes).map_err(|e| VmError::InvalidOperation(e.to_string()))
    }

    pub fn pop_array(&mut self) -> Result<Vec<StackItem>> {
        match self.pop()? {
            StackItem::Array(items) | StackItem::Struct(items) => Ok(items),
            other => Err(VmError::InvalidType {
                expected: "Array",
                found: other.type_name(),
            }),
        }
    }

    /// Block timestamp the script observes
    pub fn time(&self) -> u64 {
        match self.block {
            Some(block) => block.timestamp,
            None => self
                .snapshot
                .root()
                .head_timestamp()
                .saturating_add(MILLISECONDS_PER_BLOCK),
        }
    }

    /// Whether `account` authorized the running code.
    ///
    /// `current` is the code asking and `calling` whoever invoked it.
    pub fn check_witness(&self, account: &Hash160, current: Hash160, calling: Option<Hash160>) -> bool {
        if calling == Some(*account) {
            return true;
        }
        let Some(container) = self.container else {
            return false;
        };
        let Some(signer) = container.signers.iter().find(|s| s.account == *account) else {
            return false;
        };
        if signer.scopes.contains(WitnessScope::GLOBAL) {
            return true;
        }
        if signer.scopes.contains(WitnessScope::CALLED_BY_ENTRY)
            && (current == self.entry_hash || calling.map_or(true, |c| c == self.entry_hash))
        {
            return true;
        }
        signer.scopes.contains(WitnessScope::CUSTOM_CONTRACTS) && signer.allowed_contracts.contains(&current)
    }

    fn step(&mut self) -> Result<()> {
        let (script, ip) = {
            let frame = self.current();
            (frame.script.clone(), frame.ip)
        };
        let instruction = Instruction::decode(&script, ip)?;
        self.charge(gas::opcode_price(instruction.opcode))?;

        match self.dispatch(&instruction, ip)? {
            Flow::Next => self.current().ip = ip + instruction.size,
            Flow::Jump(target) => self.current().ip = target,
            Flow::Return => {
                let frame = self.frames.pop().ok_or(VmError::StackUnderflow)?;
                if self.frames.is_empty() {
                    self.result_stack = frame.stack;
                } else {
                    let value = frame.stack.into_iter().last().unwrap_or(StackItem::Null);
                    self.push(value)?;
                }
            }
            Flow::Enter(callee) => {
                if self.frames.len() >= MAX_INVOCATION_DEPTH {
                    return Err(VmError::InvocationDepth);
                }
                self.current().ip = ip + instruction.size;
                self.frames.push(callee);
            }
        }
        Ok(())
    }

    fn jump_target(&self, ip: usize, operand: &[u8], script_len: usize) -> Result<usize> {
        let offset = operand.first().map(|b| *b as i8).unwrap_or(0) as i64;
        let target = ip as i64 + offset;
        if target < 0 || target as usize > script_len {
            return Err(VmError::InvalidJump(target));
        }
        Ok(target as usize)
    }

    fn dispatch(&mut self, instruction: &Instruction<'_>, ip: usize) -> Result<Flow> {
        let op = instruction.opcode;
        match op {
            OpCode::PUSHINT8 | OpCode::PUSHINT16 | OpCode::PUSHINT32 | OpCode::PUSHINT64 | OpCode::PUSHINT128 => {
                let operand = instruction.operand;
                let negative = operand.last().map_or(false, |b| b & 0x80 != 0);
                let mut buf = if negative { [0xffu8; 16] } else { [0u8; 16] };
                buf[..operand.len()].copy_from_slice(operand);
                self.push(StackItem::Integer(i128::from_le_bytes(buf)))?;
            }
            OpCode::PUSHT => self.push(StackItem::Boolean(true))?,
            OpCode::PUSHF => self.push(StackItem::Boolean(false))?,
            OpCode::PUSHNULL => self.push(StackItem::Null)?,
            OpCode::PUSHDATA1 | OpCode::PUSHDATA2 | OpCode::PUSHDATA4 => {
                self.push(StackItem::ByteString(instruction.operand.to_vec()))?
            }
            OpCode::PUSHM1
            | OpCode::PUSH0
            | OpCode::PUSH1
            | OpCode::PUSH2
            | OpCode::PUSH3
            | OpCode::PUSH4
            | OpCode::PUSH5
            | OpCode::PUSH6
            | OpCode::PUSH7
            | OpCode::PUSH8
            | OpCode::PUSH9
            | OpCode::PUSH10
            | OpCode::PUSH11
            | OpCode::PUSH12
            | OpCode::PUSH13
            | OpCode::PUSH14
            | OpCode::PUSH15
            | OpCode::PUSH16 => {
                let value = op as i128 - OpCode::PUSH0 as i128;
                self.push(StackItem::Integer(value))?;
            }
            OpCode::JMP | OpCode::JMPIF | OpCode::JMPIFNOT => {
                let script_len = self.current().script.len();
                let target = self.jump_target(ip, instruction.operand, script_len)?;
                let taken = match op {
                    OpCode::JMP => true,
                    OpCode::JMPIF => self.pop()?.as_bool(),
                    _ => !self.pop()?.as_bool(),
                };
                if taken {
                    return Ok(Flow::Jump(target));
                }
            }
            OpCode::ABORT => return Err(VmError::Abort),
            OpCode::ASSERT => {
                if !self.pop()?.as_bool() {
                    return Err(VmError::AssertFailed);
                }
            }
            OpCode::RET => return Ok(Flow::Return),
            OpCode::SYSCALL => {
                let mut id = [0u8; 4];
                id.copy_from_slice(instruction.operand);
                return self.syscall(u32::from_le_bytes(id));
            }
            OpCode::DROP => {
                self.pop()?;
            }
            OpCode::DUP => {
                let top = self
                    .current()
                    .stack
                    .last()
                    .cloned()
                    .ok_or(VmError::StackUnderflow)?;
                self.push(top)?;
            }
            OpCode::SWAP => {
                let stack = &mut self.current().stack;
                let len = stack.len();
                if len < 2 {
                    return Err(VmError::StackUnderflow);
                }
                stack.swap(len - 1, len - 2);
            }
            OpCode::LDARG => {
                let index = instruction.operand.first().copied().unwrap_or(0) as usize;
                let arg = self
                    .current()
                    .args
                    .get(index)
                    .cloned()
                    .ok_or(VmError::IndexOutOfRange(index as i128))?;
                self.push(arg)?;
            }
            OpCode::CAT => {
                let right = self.pop_bytes()?;
                let mut left = self.pop_bytes()?;
                left.extend_from_slice(&right);
                self.push(StackItem::ByteString(left))?;
            }
            OpCode::EQUAL => {
                let right = self.pop()?;
                let left = self.pop()?;
                self.push(StackItem::Boolean(left == right))?;
            }
            OpCode::NOT => {
                let value = self.pop()?.as_bool();
                self.push(StackItem::Boolean(!value))?;
            }
            OpCode::ADD | OpCode::SUB => {
                let right = self.pop_integer()?;
                let left = self.pop_integer()?;
                let value = if op == OpCode::ADD {
                    left.checked_add(right)
                } else {
                    left.checked_sub(right)
                };
                self.push(StackItem::Integer(value.ok_or(VmError::Overflow)?))?;
            }
            OpCode::NUMEQUAL | OpCode::LT | OpCode::GE => {
                let right = self.pop_integer()?;
                let left = self.pop_integer()?;
                let value = match op {
                    OpCode::NUMEQUAL => left == right,
                    OpCode::LT => left < right,
                    _ => left >= right,
                };
                self.push(StackItem::Boolean(value))?;
            }
            OpCode::PACK => {
                let count = self.pop_integer()?;
                let len = self.current().stack.len();
                if count < 0 || count as usize > len {
                    return Err(VmError::IndexOutOfRange(count));
                }
                let mut items = self.current().stack.split_off(len - count as usize);
                items.reverse();
                self.push(StackItem::Array(items))?;
            }
            OpCode::PICKITEM => {
                let key = self.pop()?;
                let item = match self.pop()? {
                    StackItem::Array(items) | StackItem::Struct(items) => {
                        let index = key.as_integer().ok_or(VmError::InvalidType {
                            expected: "Integer",
                            found: key.type_name(),
                        })?;
                        usize::try_from(index)
                            .ok()
                            .and_then(|i| items.get(i).cloned())
                            .ok_or(VmError::IndexOutOfRange(index))?
                    }
                    StackItem::Map(entries) => entries
                        .into_iter()
                        .find(|(k, _)| *k == key)
                        .map(|(_, v)| v)
                        .ok_or_else(|| VmError::InvalidOperation("key not found in map".to_string()))?,
                    other => {
                        return Err(VmError::InvalidType {
                            expected: "Array",
                            found: other.type_name(),
                        })
                    }
                };
                self.push(item)?;
            }
        }
        Ok(Flow::Next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dryrun_execution::{DiagnosticsCollector, ScriptBuilder, Syscall};
    use dryrun_storage::{Hash256, MemoryStore};

    fn run(script: &[u8]) -> EngineOutcome {
        run_with_gas(script, 1_000_000)
    }

    fn run_with_gas(script: &[u8], gas_limit: i64) -> EngineOutcome {
        let mut store = MemoryStore::new();
        store.set_head(5, Hash256::ZERO, 1_000);
        let base = Snapshot::new(Arc::new(store));
        let mut child = base.create_child();
        let mut logs = DiagnosticsCollector::new("test");
        let request = ExecutionRequest {
            script,
            container: None,
            block: None,
            gas_limit,
        };
        ReferenceEngine::new().run(request, &mut child, &mut logs)
    }

    #[test]
    fn test_arithmetic_and_pack() {
        let mut sb = ScriptBuilder::new();
        sb.emit_push_int(40).emit_push_int(2).emit(OpCode::ADD);
        sb.emit_push_int(1_000_000_000_000).emit_push_int(1).emit(OpCode::SUB);
        sb.emit_push_int(2).emit(OpCode::PACK);
        let outcome = run(&sb.into_bytes());
        assert_eq!(outcome.state, VmState::Halt);
        assert_eq!(
            outcome.result_stack,
            vec![StackItem::Array(vec![
                StackItem::Integer(999_999_999_999),
                StackItem::Integer(42)
            ])]
        );
        assert!(outcome.gas_consumed > 0);
    }

    #[test]
    fn test_assert_fault_keeps_frame() {
        let mut sb = ScriptBuilder::new();
        sb.emit(OpCode::PUSHF).emit(OpCode::ASSERT);
        let outcome = run(&sb.into_bytes());
        assert_eq!(outcome.state, VmState::Fault);
        assert_eq!(outcome.fault.as_deref(), Some("ASSERT is executed with false result."));
        assert_eq!(outcome.call_frames.len(), 1);
        assert_eq!(outcome.call_frames[0].instruction_pointer, 1);
        assert_eq!(outcome.call_frames[0].opcode, "ASSERT");
        assert!(outcome.result_stack.is_empty());
    }

    #[test]
    fn test_gas_ceiling() {
        let mut sb = ScriptBuilder::new();
        for _ in 0..10 {
            sb.emit_push_int(1);
        }
        let outcome = run_with_gas(&sb.into_bytes(), 5 * gas::EXEC_FEE_FACTOR);
        assert_eq!(outcome.state, VmState::Fault);
        assert_eq!(outcome.fault.as_deref(), Some("Insufficient GAS."));
    }

    #[test]
    fn test_conditional_jump() {
        // PUSHT; JMPIF +4; PUSH1; RET; PUSH2
        let script = vec![
            OpCode::PUSHT as u8,
            OpCode::JMPIF as u8,
            4,
            OpCode::PUSH1 as u8,
            OpCode::RET as u8,
            OpCode::PUSH2 as u8,
        ];
        let outcome = run(&script);
        assert_eq!(outcome.result_stack, vec![StackItem::Integer(2)]);
    }

    #[test]
    fn test_log_and_time_without_block() {
        let mut sb = ScriptBuilder::new();
        sb.emit_push_str("hello").emit_syscall(Syscall::RuntimeLog);
        sb.emit_syscall(Syscall::RuntimeGetTime);
        let outcome = run(&sb.into_bytes());
        assert_eq!(outcome.state, VmState::Halt);
        assert_eq!(
            outcome.result_stack,
            vec![StackItem::Integer(1_000 + MILLISECONDS_PER_BLOCK as i128)]
        );
    }

    #[test]
    fn test_stack_underflow_faults() {
        let outcome = run(&[OpCode::DROP as u8]);
        assert_eq!(outcome.state, VmState::Fault);
        assert_eq!(outcome.fault.as_deref(), Some("Stack underflow"));
    }
}
