// dryrun/core/api/src/methods/session.rs

use crate::types::params::{self, ParamList};
use crate::types::ApiError;
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use dryrun_execution::{native, BalancePatch, ScriptBuilder, SessionExecutor, TransactionContext};
use dryrun_storage::Hash160;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Session sandbox operations behind the RPC surface
pub struct SessionApi {
    executor: Arc<SessionExecutor>,
}

fn balance_json(patch: &BalancePatch) -> Value {
    json!({ B64.encode(patch.key.to_bytes()): B64.encode(&patch.value) })
}

fn signers_at(params: &ParamList, index: usize) -> Result<Option<TransactionContext>, ApiError> {
    params.optional(index).map(params::parse_signers).transpose()
}

impl SessionApi {
    pub fn new(executor: Arc<SessionExecutor>) -> Self {
        Self { executor }
    }

    pub fn list_sessions(&self) -> Value {
        json!(self.executor.list_sessions())
    }

    /// Every param is a session id; unknown ids map to `false`
    pub fn delete_sessions(&self, params: &ParamList) -> Result<Value, ApiError> {
        let ids = params
            .values()
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::invalid("session ids must be strings"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let result: Map<String, Value> = self
            .executor
            .delete_sessions(&ids)
            .into_iter()
            .map(|(id, removed)| (id, Value::Bool(removed)))
            .collect();
        Ok(Value::Object(result))
    }

    /// `[session, commit, contract, operation, args?, signers?]`
    pub fn invoke_function(&self, params: &ParamList) -> Result<Value, ApiError> {
        let session = params.string(0, "session")?;
        let commit = params.boolean(1, "commit")?;
        let contract = params.hash(2, "contract")?;
        let operation = params.string(3, "operation")?;
        let args = params::parse_arguments(params.optional(4))?;
        let signers = signers_at(params, 5)?;

        let mut builder = ScriptBuilder::new();
        builder
            .emit_dynamic_call(&contract, operation, &args)
            .map_err(|e| ApiError::invalid(e.to_string()))?;
        self.run(session, &builder.into_bytes(), signers, commit)
    }

    /// `[session, commit, script, signers?]`
    pub fn invoke_script(&self, params: &ParamList) -> Result<Value, ApiError> {
        let session = params.string(0, "session")?;
        let commit = params.boolean(1, "commit")?;
        let script = params.base64(2, "script")?;
        let signers = signers_at(params, 3)?;
        self.run(session, &script, signers, commit)
    }

    fn run(
        &self,
        session: &str,
        script: &[u8],
        signers: Option<TransactionContext>,
        commit: bool,
    ) -> Result<Value, ApiError> {
        let result = self.executor.execute(session, script, signers, commit);
        serde_json::to_value(&result).map_err(|e| ApiError::Internal(e.to_string()))
    }

    /// `[session, nef, manifest]`
    pub fn virtual_deploy(&self, params: &ParamList) -> Result<Value, ApiError> {
        let session = params.string(0, "session")?;
        let nef = params.base64(1, "nef")?;
        let manifest = params.string(2, "manifest")?;
        let hash = self.executor.deploy(session, &nef, manifest).map_err(|e| {
            warn!("Virtual deploy into session {} rejected: {}", session, e);
            ApiError::from(e)
        })?;
        info!("Session {}: contract available at {}", session, hash);
        Ok(json!({ session: hash.to_string() }))
    }

    /// `[session, contract, key, value]`; an empty value deletes the slot
    pub fn put_storage(&self, params: &ParamList) -> Result<Value, ApiError> {
        let session = params.string(0, "session")?;
        let contract = params.hash(1, "contract")?;
        let key_b64 = params.string(2, "key")?;
        let key = params::decode_base64(key_b64)?;
        let value_b64 = params.string(3, "value")?;
        let value = if value_b64.is_empty() {
            Vec::new()
        } else {
            params::decode_base64(value_b64)?
        };
        self.executor.put_storage(session, &contract, &key, &value)?;
        Ok(json!({ key_b64: value_b64 }))
    }

    /// `[session, contract, key]`, base64 value or null
    pub fn get_storage(&self, params: &ParamList) -> Result<Value, ApiError> {
        let session = params.string(0, "session")?;
        let contract = params.hash(1, "contract")?;
        let key = params.base64(2, "key")?;
        let value = self.executor.get_storage(session, &contract, &key)?;
        Ok(value.map(|v| Value::String(B64.encode(v))).unwrap_or(Value::Null))
    }

    /// `[session, contract, prefix]`
    pub fn find_storage(&self, params: &ParamList) -> Result<Value, ApiError> {
        let session = params.string(0, "session")?;
        let contract = params.hash(1, "contract")?;
        let prefix = params.base64(2, "prefix")?;
        let entries: Map<String, Value> = self
            .executor
            .find_storage(session, &contract, &prefix)?
            .into_iter()
            .map(|(key, value)| (B64.encode(key), Value::String(B64.encode(value))))
            .collect();
        Ok(Value::Object(entries))
    }

    /// `[session, account, balance]` against NEO or GAS
    pub fn set_native_balance(&self, params: &ParamList, token: Hash160) -> Result<Value, ApiError> {
        let session = params.string(0, "session")?;
        let account = params.hash(1, "account")?;
        let balance = params.unsigned(2, "balance")?;
        let patch = self
            .executor
            .set_token_balance(session, &token, &account, i128::from(balance), None)?;
        Ok(balance_json(&patch))
    }

    pub fn set_neo_balance(&self, params: &ParamList) -> Result<Value, ApiError> {
        self.set_native_balance(params, native::NEO_HASH)
    }

    pub fn set_gas_balance(&self, params: &ParamList) -> Result<Value, ApiError> {
        self.set_native_balance(params, native::GAS_HASH)
    }

    /// `[session, contract, account, balance, prefix?]`
    pub fn set_nep17_balance(&self, params: &ParamList) -> Result<Value, ApiError> {
        let session = params.string(0, "session")?;
        let contract = params.hash(1, "contract")?;
        let account = params.hash(2, "account")?;
        let balance = params.unsigned(3, "balance")?;
        let prefix = params::parse_prefix(params.optional(4))?;
        let patch = self
            .executor
            .set_token_balance(session, &contract, &account, i128::from(balance), prefix)?;
        Ok(balance_json(&patch))
    }

    /// `[session, timestamp]`
    pub fn set_timestamp(&self, params: &ParamList) -> Result<Value, ApiError> {
        let session = params.string(0, "session")?;
        let requested = params.unsigned(1, "timestamp")?;
        let timestamp = self.executor.set_timestamp(session, requested)?;
        Ok(json!({ session: timestamp }))
    }

    /// Every param is a session id
    pub fn get_timestamps(&self, params: &ParamList) -> Result<Value, ApiError> {
        let mut result = Map::new();
        for index in 0..params.len() {
            let session = params.string(index, "session")?;
            let timestamp = self.executor.get_timestamp(session)?;
            result.insert(session.to_string(), json!(timestamp));
        }
        Ok(Value::Object(result))
    }
}
