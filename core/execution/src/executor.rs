// dryrun/core/execution/src/executor.rs

use crate::block::{self, SyntheticBlock};
use crate::config::ExecutionConfig;
use crate::diagnostics::DiagnosticsCollector;
use crate::engine::{EngineOutcome, ExecutionEngine, ExecutionRequest};
use crate::metrics::{SESSION_EXECUTIONS_TOTAL, SESSION_GAS_USED};
use crate::native;
use crate::result::{self, ExecutionResult};
use crate::session::SessionRegistry;
use crate::types::{ExecutionError, Notification, Signer, SigningContext, TransactionContext};
use crate::wallet::{TransactionRequest, Wallet};
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use dryrun_storage::{RootStore, Snapshot};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Runs scripts and patches state inside named sessions
pub struct SessionExecutor {
    pub(crate) sessions: SessionRegistry,
    pub(crate) engine: Arc<dyn ExecutionEngine>,
    pub(crate) wallet: Option<Arc<dyn Wallet>>,
    pub(crate) config: ExecutionConfig,
}

impl SessionExecutor {
    pub fn new(root: Arc<dyn RootStore>, engine: Arc<dyn ExecutionEngine>, config: ExecutionConfig) -> Self {
        Self {
            sessions: SessionRegistry::new(root),
            engine,
            wallet: None,
            config,
        }
    }

    pub fn with_wallet(mut self, wallet: Arc<dyn Wallet>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn wallet(&self) -> Option<&Arc<dyn Wallet>> {
        self.wallet.as_ref()
    }

    pub fn list_sessions(&self) -> Vec<String> {
        self.sessions.list()
    }

    /// Delete each named session, reporting per id whether it existed
    pub fn delete_sessions(&self, ids: &[String]) -> Vec<(String, bool)> {
        ids.iter()
            .map(|id| (id.clone(), self.sessions.remove(id)))
            .collect()
    }

    /// Pin the synthetic block timestamp of a session, creating it if needed
    pub fn set_timestamp(&self, session_id: &str, timestamp: u64) -> Result<u64, ExecutionError> {
        let handle = self.sessions.get_or_create(session_id);
        let mut session = handle.lock();
        session.set_timestamp(timestamp)?;
        debug!("Session {} pinned to timestamp {}", session_id, timestamp);
        Ok(session.timestamp())
    }

    pub fn get_timestamp(&self, session_id: &str) -> Result<u64, ExecutionError> {
        let handle = self.sessions.get_or_fail(session_id)?;
        let timestamp = handle.lock().timestamp();
        Ok(timestamp)
    }

    /// Run `script` in a child of the session's snapshot.
    ///
    /// The child's writes are merged into the session only when the script
    /// halts and `commit` is set; in every other case they are dropped.
    pub fn execute(
        &self,
        session_id: &str,
        script: &[u8],
        context: Option<TransactionContext>,
        commit: bool,
    ) -> ExecutionResult {
        let handle = self.sessions.get_or_create(session_id);
        let mut session = handle.lock();

        let block = match session.timestamp() {
            0 => None,
            timestamp => Some(block::synthesize(session.snapshot(), timestamp)),
        };
        let mut diagnostics = DiagnosticsCollector::new(session_id);

        let (mut result, changes) = {
            let base = session.snapshot();
            let mut child = base.create_child();
            let request = ExecutionRequest {
                script,
                container: context.as_ref(),
                block: block.as_ref(),
                gas_limit: self.config.max_gas_invoke,
            };
            let outcome = self.engine.run(request, &mut child, &mut diagnostics);

            let oracle_requests = extract_oracle_requests(&child, &outcome.notifications);
            let logs = diagnostics.into_events();
            let traceback = (!outcome.halted()).then(|| {
                result::build_traceback(&outcome, &logs, |hash| native::contract_name(&child, hash))
            });

            let mut result = ExecutionResult {
                script: result::encode_script(script),
                state: outcome.state,
                gas_consumed: outcome.gas_consumed,
                exception: outcome.fault.clone(),
                traceback,
                stack: result::render_stack(&outcome.result_stack, self.config.max_iterator_result_items),
                notifications: outcome.notifications.iter().map(result::render_notification).collect(),
                logs: logs.iter().map(result::render_log).collect(),
                oracle_requests,
                tx: None,
                network_fee: None,
                pending_signature: None,
                committed: false,
            };

            if outcome.halted() {
                if let Some(context) = context.as_ref() {
                    self.attach_transaction(&mut result, base, script, &context.signers, &outcome, block.as_ref());
                }
            }

            let changes = (outcome.halted() && commit).then(|| child.into_changes());
            (result, changes)
        };

        match changes {
            Some(changes) => {
                debug!(
                    "Session {}: committing {} entries",
                    session_id,
                    changes.len()
                );
                session.snapshot_mut().commit(changes);
                result.committed = true;
            }
            None => debug!("Session {}: discarding execution state ({})", session_id, result.state),
        }

        let state = result.state.to_string();
        let committed = if result.committed { "true" } else { "false" };
        SESSION_EXECUTIONS_TOTAL
            .with_label_values(&[state.as_str(), committed])
            .inc();
        SESSION_GAS_USED.observe(result.gas_consumed as f64);
        result
    }

    /// Build and sign a transaction echoing the script.
    ///
    /// Any failure leaves `result` without transaction fields.
    fn attach_transaction(
        &self,
        result: &mut ExecutionResult,
        snapshot: &Snapshot<'_>,
        script: &[u8],
        signers: &[Signer],
        outcome: &EngineOutcome,
        block: Option<&SyntheticBlock>,
    ) {
        let Some(wallet) = self.wallet.as_ref() else {
            return;
        };
        if signers.is_empty() {
            return;
        }

        let request = TransactionRequest {
            script,
            sender: signers.first().map(|s| s.account),
            signers,
            system_fee: outcome.gas_consumed,
            max_gas: self.config.max_gas_invoke,
            block,
        };
        let mut tx = match wallet.make_transaction(snapshot, request) {
            Ok(tx) => tx,
            Err(e) => {
                debug!("Transaction not attached: {}", e);
                return;
            }
        };

        let mut context = SigningContext::new(tx.clone(), wallet.network());
        wallet.sign(&mut context);
        match context.witnesses() {
            Some(witnesses) => {
                tx.witnesses = witnesses;
                result.network_fee = Some(wallet.network_fee(snapshot.root().as_ref(), &tx));
                result.tx = Some(B64.encode(tx.to_bytes()));
            }
            None => result.pending_signature = Some(context.to_json()),
        }
    }
}

/// Reconstruct the requests behind `OracleRequest` notifications.
///
/// Requests get consecutive ids, so the k-th such notification counted from
/// the end belongs to request `counter - 1 - k`.
pub fn extract_oracle_requests(snapshot: &Snapshot<'_>, notifications: &[Notification]) -> Vec<Value> {
    let relevant = notifications
        .iter()
        .rev()
        .filter(|n| n.script_hash == native::ORACLE_HASH && n.event_name == native::ORACLE_REQUEST_EVENT);

    let counter = snapshot
        .get(&native::oracle_counter_key())
        .map(|bytes| dryrun_storage::decode_integer(&bytes));
    let counter = match counter {
        Some(Ok(counter)) => counter,
        Some(Err(e)) => {
            warn!("Unreadable oracle request counter: {}", e);
            return Vec::new();
        }
        None => return Vec::new(),
    };

    let mut requests = Vec::new();
    for (k, _) in relevant.enumerate() {
        let Ok(id) = u64::try_from(counter - 1 - k as i128) else {
            break;
        };
        let key = native::oracle_request_key(id);
        let record = snapshot
            .get(&key)
            .map(|bytes| native::decode_record::<native::OracleRequest>(&key, &bytes));
        match record {
            Some(Ok(request)) => match request.to_stack_item().to_json() {
                Ok(json) => requests.push(json),
                Err(e) => warn!("Oracle request {} not renderable: {}", id, e),
            },
            Some(Err(e)) => warn!("{}", e),
            None => warn!("Oracle request {} missing from storage", id),
        }
    }
    requests
}
