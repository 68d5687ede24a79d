// dryrun/core/execution/src/result.rs

// Structured result of a session execution
use crate::engine::EngineOutcome;
use crate::types::{LogEvent, Notification, StackItem, VmState};
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use dryrun_storage::Hash160;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

/// Value of `stack` when the result stack cannot be rendered
pub const INVALID_STACK: &str = "error: invalid operation";

fn as_string<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

fn opt_as_string<S: Serializer>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_str(&v.to_string()),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// Executed script, base64
    pub script: String,
    pub state: VmState,
    #[serde(rename = "gasconsumed", serialize_with = "as_string")]
    pub gas_consumed: i64,
    pub exception: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
    pub stack: Value,
    pub notifications: Vec<Value>,
    pub logs: Vec<Value>,
    #[serde(rename = "oraclerequests", skip_serializing_if = "Vec::is_empty")]
    pub oracle_requests: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx: Option<String>,
    #[serde(
        rename = "networkfee",
        skip_serializing_if = "Option::is_none",
        serialize_with = "opt_as_string"
    )]
    pub network_fee: Option<i64>,
    #[serde(rename = "pendingsignature", skip_serializing_if = "Option::is_none")]
    pub pending_signature: Option<Value>,
    /// Whether the execution's writes were merged into the session
    #[serde(skip)]
    pub committed: bool,
}

impl ExecutionResult {
    pub fn halted(&self) -> bool {
        self.state == VmState::Halt
    }
}

/// Render the result stack, draining iterators up to `max_items` each
pub fn render_stack(items: &[StackItem], max_items: usize) -> Value {
    let rendered: Result<Vec<Value>, _> = items.iter().map(|item| render_item(item, max_items)).collect();
    match rendered {
        Ok(values) => Value::Array(values),
        Err(_) => Value::String(INVALID_STACK.to_string()),
    }
}

fn render_item(item: &StackItem, max_items: usize) -> Result<Value, crate::types::ExecutionError> {
    let mut json = item.to_json()?;
    if let StackItem::Iterator(iterator) = item {
        let mut drained = Vec::new();
        let mut remaining = max_items;
        while remaining > 0 {
            match iterator.next_item() {
                Some(next) => drained.push(next.to_json()?),
                None => break,
            }
            remaining -= 1;
        }
        let truncated = if remaining == 0 {
            iterator.next_item().is_some()
        } else {
            false
        };
        json["iterator"] = Value::Array(drained);
        json["truncated"] = Value::Bool(truncated);
    }
    Ok(json)
}

pub fn render_notification(notification: &Notification) -> Value {
    json!({
        "contract": notification.script_hash.to_hex(),
        "eventname": notification.event_name,
        "state": notification
            .state
            .to_json()
            .unwrap_or_else(|_| Value::String(INVALID_STACK.to_string())),
    })
}

pub fn render_log(log: &LogEvent) -> Value {
    json!({
        "contract": log.script_hash.to_hex(),
        "message": log.message,
    })
}

fn hash_or_empty(hash: Option<Hash160>) -> String {
    hash.map(|h| h.to_string()).unwrap_or_default()
}

/// Multi-line report of a faulted execution.
///
/// `contract_name` resolves the manifest name of each log's emitter.
pub fn build_traceback<F>(outcome: &EngineOutcome, logs: &[LogEvent], contract_name: F) -> String
where
    F: Fn(&Hash160) -> String,
{
    let mut lines = vec![
        outcome.fault.clone().unwrap_or_default(),
        format!("CallingScriptHash={}", hash_or_empty(outcome.calling_script_hash)),
        format!("CurrentScriptHash={}", hash_or_empty(outcome.current_script_hash)),
        format!("EntryScriptHash={}", hash_or_empty(outcome.entry_script_hash)),
    ];
    for frame in &outcome.call_frames {
        lines.push(format!(
            "InstructionPointer={}, OpCode {}, Script Length={}",
            frame.instruction_pointer, frame.opcode, frame.script_len
        ));
    }
    if !logs.is_empty() {
        lines.push(format!("-------Logs-------({})", logs.len()));
    }
    for log in logs {
        lines.push(format!(
            "[{}] {}: {}",
            log.script_hash,
            contract_name(&log.script_hash),
            log.message
        ));
    }
    lines.join("\r\n")
}

pub fn encode_script(script: &[u8]) -> String {
    B64.encode(script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CallFrame, SharedIterator};

    fn ints(n: i128) -> StackItem {
        StackItem::Iterator(SharedIterator::new((0..n).map(StackItem::Integer)))
    }

    #[test]
    fn test_iterator_truncated_at_max() {
        let stack = render_stack(&[ints(5)], 3);
        let item = &stack[0];
        assert_eq!(item["type"], "InteropInterface");
        assert_eq!(item["iterator"].as_array().unwrap().len(), 3);
        assert_eq!(item["iterator"][2]["value"], "2");
        assert_eq!(item["truncated"], true);
    }

    #[test]
    fn test_iterator_exactly_max_not_truncated() {
        let stack = render_stack(&[ints(3)], 3);
        assert_eq!(stack[0]["iterator"].as_array().unwrap().len(), 3);
        assert_eq!(stack[0]["truncated"], false);

        let short = render_stack(&[ints(1)], 3);
        assert_eq!(short[0]["truncated"], false);
    }

    #[test]
    fn test_invalid_stack_marker() {
        let mut deep = StackItem::Null;
        for _ in 0..64 {
            deep = StackItem::Array(vec![deep]);
        }
        assert_eq!(render_stack(&[StackItem::Integer(1), deep], 10), json!(INVALID_STACK));
    }

    #[test]
    fn test_traceback_layout() {
        let outcome = EngineOutcome {
            state: VmState::Fault,
            gas_consumed: 10,
            fault: Some("ASSERT is executed with false result.".to_string()),
            notifications: vec![],
            result_stack: vec![],
            call_frames: vec![CallFrame {
                script_hash: Hash160([1; 20]),
                instruction_pointer: 4,
                opcode: "ASSERT".to_string(),
                script_len: 9,
            }],
            calling_script_hash: None,
            current_script_hash: Some(Hash160([1; 20])),
            entry_script_hash: Some(Hash160([1; 20])),
        };
        let logs = vec![LogEvent {
            script_hash: Hash160([2; 20]),
            message: "checking".to_string(),
        }];
        let trace = build_traceback(&outcome, &logs, |_| "Token".to_string());
        let lines: Vec<&str> = trace.split("\r\n").collect();
        assert_eq!(lines[0], "ASSERT is executed with false result.");
        assert_eq!(lines[1], "CallingScriptHash=");
        assert_eq!(lines[4], "InstructionPointer=4, OpCode ASSERT, Script Length=9");
        assert_eq!(lines[5], "-------Logs-------(1)");
        assert_eq!(lines[6], format!("[{}] Token: checking", Hash160([2; 20])));
    }

    #[test]
    fn test_result_json_fields() {
        let result = ExecutionResult {
            script: encode_script(&[0x40]),
            state: VmState::Halt,
            gas_consumed: 1234,
            exception: None,
            traceback: None,
            stack: json!([]),
            notifications: vec![],
            logs: vec![],
            oracle_requests: vec![],
            tx: None,
            network_fee: Some(99),
            pending_signature: None,
            committed: true,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["state"], "HALT");
        assert_eq!(json["gasconsumed"], "1234");
        assert_eq!(json["exception"], Value::Null);
        assert_eq!(json["networkfee"], "99");
        assert!(json.get("traceback").is_none());
        assert!(json.get("oraclerequests").is_none());
        assert!(json.get("committed").is_none());
    }
}
