// dryrun/core/vm/src/interop.rs

// Interop services behind SYSCALL
use crate::engine::{Flow, Frame, Machine};
use crate::error::{Result, VmError};
use crate::gas;
use dryrun_execution::native;
use dryrun_execution::{LogEvent, Notification, SharedIterator, StackItem, Syscall};
use dryrun_storage::StorageKey;
use std::sync::Arc;
use tracing::trace;

pub const MAX_STORAGE_KEY_SIZE: usize = 64;
pub const MAX_STORAGE_VALUE_SIZE: usize = u16::MAX as usize;
pub const MAX_EVENT_NAME_LENGTH: usize = 32;
pub const MAX_LOG_LENGTH: usize = 1024;

impl<'a, 'p> Machine<'a, 'p> {
    pub(crate) fn syscall(&mut self, id: u32) -> Result<Flow> {
        let syscall = Syscall::from_id(id).ok_or(VmError::UnknownSyscall(id))?;
        self.charge(gas::syscall_price(syscall))?;
        trace!("SYSCALL {}", syscall.name());

        match syscall {
            Syscall::ContractCall => return self.contract_call(),
            Syscall::StorageGet => {
                let key = self.storage_key()?;
                let value = self.snapshot.get(&key).map(StackItem::ByteString).unwrap_or(StackItem::Null);
                self.push(value)?;
            }
            Syscall::StoragePut => {
                let key = self.storage_key()?;
                let value = self.pop_bytes()?;
                if value.len() > MAX_STORAGE_VALUE_SIZE {
                    return Err(VmError::InvalidOperation(format!(
                        "storage value of {} bytes exceeds {}",
                        value.len(),
                        MAX_STORAGE_VALUE_SIZE
                    )));
                }
                self.charge(gas::STORAGE_PRICE * (key.key.len() + value.len()) as i64)?;
                self.snapshot.put(key, value);
            }
            Syscall::StorageDelete => {
                let key = self.storage_key()?;
                self.snapshot.delete(key);
            }
            Syscall::StorageFind => {
                let id = self.storage_id()?;
                let prefix = self.pop_bytes()?;
                let entries: Vec<StackItem> = self
                    .snapshot
                    .find_by_prefix(id, &prefix)
                    .map(|(key, value)| StackItem::Struct(vec![StackItem::ByteString(key), StackItem::ByteString(value)]))
                    .collect();
                self.push(StackItem::Iterator(SharedIterator::new(entries.into_iter())))?;
            }
            Syscall::RuntimeLog => {
                let message = self.pop_string()?;
                if message.len() > MAX_LOG_LENGTH {
                    return Err(VmError::InvalidOperation(format!("log message exceeds {} bytes", MAX_LOG_LENGTH)));
                }
                let script_hash = self.current_hash();
                self.logs.log(LogEvent { script_hash, message });
            }
            Syscall::RuntimeNotify => {
                let event_name = self.pop_string()?;
                if event_name.len() > MAX_EVENT_NAME_LENGTH {
                    return Err(VmError::InvalidOperation(format!(
                        "event name exceeds {} bytes",
                        MAX_EVENT_NAME_LENGTH
                    )));
                }
                let state = self.pop_array()?;
                let script_hash = self.current_hash();
                self.notifications.push(Notification {
                    script_hash,
                    event_name,
                    state: StackItem::Array(state),
                });
            }
            Syscall::RuntimeGetTime => {
                let time = self.time();
                self.push(StackItem::Integer(i128::from(time)))?;
            }
            Syscall::RuntimeCheckWitness => {
                let account = self.pop_hash()?;
                let current = self.current_hash();
                let calling = self.calling_hash();
                let ok = self.check_witness(&account, current, calling);
                self.push(StackItem::Boolean(ok))?;
            }
        }
        Ok(Flow::Next)
    }

    /// Storage id of the running contract
    fn storage_id(&mut self) -> Result<i32> {
        self.current()
            .contract_id
            .ok_or_else(|| VmError::InvalidOperation("storage is only available to deployed contracts".to_string()))
    }

    fn storage_key(&mut self) -> Result<StorageKey> {
        let id = self.storage_id()?;
        let key = self.pop_bytes()?;
        if key.len() > MAX_STORAGE_KEY_SIZE {
            return Err(VmError::InvalidOperation(format!(
                "storage key of {} bytes exceeds {}",
                key.len(),
                MAX_STORAGE_KEY_SIZE
            )));
        }
        Ok(StorageKey::new(id, key))
    }

    /// `System.Contract.Call`: hash, method, flags and the argument array, top first
    fn contract_call(&mut self) -> Result<Flow> {
        let hash = self.pop_hash()?;
        let method = self.pop_string()?;
        let _flags = self.pop_integer()?;
        let args = self.pop_array()?;

        if native::is_native(&hash) {
            let value = self.call_native(&hash, &method, args)?;
            self.push(value)?;
            return Ok(Flow::Next);
        }

        let contract = native::get_contract(&*self.snapshot, &hash).ok_or(VmError::ContractNotFound(hash))?;
        let offset = contract
            .manifest
            .method(&method, args.len())
            .map(|m| m.offset)
            .ok_or_else(|| VmError::MethodNotFound {
                contract: hash,
                method: method.clone(),
                argc: args.len(),
            })?;
        trace!("Calling {}.{} at offset {}", contract.manifest.name, method, offset);
        let script: Arc<[u8]> = Arc::from(contract.nef.script);
        Ok(Flow::Enter(Frame::new(script, hash, Some(contract.id), offset, args)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ReferenceEngine;
    use dryrun_execution::contract::{ContractAbi, ContractManifest, ContractState, MethodDescriptor, NefFile, ParameterDescriptor};
    use dryrun_execution::{
        DiagnosticsCollector, EngineOutcome, ExecutionEngine, ExecutionRequest, OpCode, ScriptBuilder, VmState,
    };
    use dryrun_storage::{Hash160, MemoryStore, Snapshot};

    const CONTRACT: Hash160 = Hash160([0x42; 20]);

    /// Contract with `put(k, v)`, `get(k)` and `find(prefix)` entry points
    fn store_with_contract() -> MemoryStore {
        let mut sb = ScriptBuilder::new();
        // put: value, key -> Storage.Put pops key first
        sb.emit_with_operand(OpCode::LDARG, &[1]);
        sb.emit_with_operand(OpCode::LDARG, &[0]);
        sb.emit_syscall(Syscall::StoragePut);
        sb.emit(OpCode::RET);
        let get_offset = sb.len();
        sb.emit_with_operand(OpCode::LDARG, &[0]);
        sb.emit_syscall(Syscall::StorageGet);
        sb.emit(OpCode::RET);
        let find_offset = sb.len();
        sb.emit_with_operand(OpCode::LDARG, &[0]);
        sb.emit_syscall(Syscall::StorageFind);
        sb.emit(OpCode::RET);

        let param = |name: &str| ParameterDescriptor {
            name: name.to_string(),
            kind: "ByteArray".to_string(),
        };
        let method = |name: &str, params: Vec<ParameterDescriptor>, offset| MethodDescriptor {
            name: name.to_string(),
            parameters: params,
            return_type: "Any".to_string(),
            offset,
            safe: false,
        };
        let abi = ContractAbi {
            methods: vec![
                method("put", vec![param("k"), param("v")], 0),
                method("get", vec![param("k")], get_offset),
                method("find", vec![param("prefix")], find_offset),
            ],
            events: vec![],
        };
        let state = ContractState {
            id: 1,
            update_counter: 0,
            hash: CONTRACT,
            nef: NefFile::new("test", sb.into_bytes()).unwrap(),
            manifest: ContractManifest::new("Box", abi),
        };
        let mut store = MemoryStore::new();
        store.put(native::contract_key(&CONTRACT), state.to_bytes());
        store
    }

    fn run(snapshot: &mut Snapshot<'_>, script: &[u8]) -> EngineOutcome {
        let mut logs = DiagnosticsCollector::new("test");
        let request = ExecutionRequest {
            script,
            container: None,
            block: None,
            gas_limit: 100 * dryrun_execution::GAS_FACTOR,
        };
        ReferenceEngine::new().run(request, snapshot, &mut logs)
    }

    fn call(method: &str, args: &[StackItem]) -> Vec<u8> {
        let mut sb = ScriptBuilder::new();
        sb.emit_dynamic_call(&CONTRACT, method, args).unwrap();
        sb.into_bytes()
    }

    #[test]
    fn test_contract_storage_roundtrip() {
        let base = Snapshot::new(Arc::new(store_with_contract()));
        let mut child = base.create_child();

        let put = call("put", &[StackItem::from_str_utf8("k"), StackItem::from_str_utf8("v")]);
        assert_eq!(run(&mut child, &put).state, VmState::Halt);

        let outcome = run(&mut child, &call("get", &[StackItem::from_str_utf8("k")]));
        assert_eq!(outcome.result_stack, vec![StackItem::from_str_utf8("v")]);
        assert_eq!(child.get(&StorageKey::new(1, b"k".to_vec())), Some(b"v".to_vec()));
    }

    #[test]
    fn test_find_yields_key_value_structs() {
        let base = Snapshot::new(Arc::new(store_with_contract()));
        let mut child = base.create_child();
        for key in ["a1", "a2", "b1"] {
            let put = call("put", &[StackItem::from_str_utf8(key), StackItem::Integer(1)]);
            assert_eq!(run(&mut child, &put).state, VmState::Halt);
        }
        let outcome = run(&mut child, &call("find", &[StackItem::from_str_utf8("a")]));
        let StackItem::Iterator(iter) = &outcome.result_stack[0] else {
            panic!("expected iterator, got {:?}", outcome.result_stack);
        };
        let first = iter.next_item().unwrap();
        assert_eq!(first.as_array().unwrap()[0], StackItem::from_str_utf8("a1"));
        assert!(iter.next_item().is_some());
        assert!(iter.next_item().is_none());
    }

    #[test]
    fn test_unknown_contract_and_method() {
        let base = Snapshot::new(Arc::new(store_with_contract()));
        let mut child = base.create_child();

        let mut sb = ScriptBuilder::new();
        sb.emit_dynamic_call(&Hash160([9; 20]), "x", &[]).unwrap();
        let outcome = run(&mut child, &sb.into_bytes());
        assert_eq!(outcome.state, VmState::Fault);
        assert!(outcome.fault.unwrap().starts_with("Called Contract Does Not Exist"));

        let outcome = run(&mut child, &call("get", &[]));
        assert_eq!(outcome.state, VmState::Fault);
        assert!(outcome.fault.unwrap().contains("\"get\" with 0 parameter(s)"));
    }

    #[test]
    fn test_entry_script_has_no_storage() {
        let base = Snapshot::new(Arc::new(MemoryStore::new()));
        let mut child = base.create_child();
        let mut sb = ScriptBuilder::new();
        sb.emit_push_str("k").emit_syscall(Syscall::StorageGet);
        let outcome = run(&mut child, &sb.into_bytes());
        assert_eq!(outcome.state, VmState::Fault);
    }

    #[test]
    fn test_notify_records_emitter() {
        let base = Snapshot::new(Arc::new(MemoryStore::new()));
        let mut child = base.create_child();
        let mut sb = ScriptBuilder::new();
        sb.emit_push_item(&StackItem::Array(vec![StackItem::Integer(7)])).unwrap();
        sb.emit_push_str("Ping").emit_syscall(Syscall::RuntimeNotify);
        let script = sb.into_bytes();
        let outcome = run(&mut child, &script);
        assert_eq!(outcome.state, VmState::Halt);
        assert_eq!(outcome.notifications.len(), 1);
        assert_eq!(outcome.notifications[0].event_name, "Ping");
        assert_eq!(outcome.notifications[0].script_hash, Hash160::digest(&script));
    }
}
