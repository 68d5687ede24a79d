// dryrun/core/execution/src/deploy.rs

// Deploying contracts into a session without a real transaction
use crate::contract::{ContractManifest, NefFile};
use crate::executor::SessionExecutor;
use crate::metrics::VIRTUAL_DEPLOYS_TOTAL;
use crate::native;
use crate::script::ScriptBuilder;
use crate::types::{ExecutionError, Signer, StackItem, TransactionContext};
use dryrun_storage::Hash160;
use tracing::{info, warn};

impl SessionExecutor {
    /// Deploy a contract into the session with the wallet's default account as deployer.
    ///
    /// Deploying the same artifacts twice returns the same hash and writes nothing.
    pub fn deploy(&self, session_id: &str, nef_bytes: &[u8], manifest_json: &str) -> Result<Hash160, ExecutionError> {
        let sender = self
            .wallet
            .as_ref()
            .and_then(|w| w.default_account())
            .ok_or(ExecutionError::WalletRequired)?;
        let nef = NefFile::parse(nef_bytes)?;
        let manifest = ContractManifest::parse(manifest_json)?;
        let hash = native::contract_hash(&sender, nef.checksum, &manifest.name);

        {
            let handle = self.sessions.get_or_create(session_id);
            let session = handle.lock();
            if native::get_contract(session.snapshot(), &hash).is_some() {
                info!("Session {}: contract {} already deployed", session_id, hash);
                VIRTUAL_DEPLOYS_TOTAL.with_label_values(&["existing"]).inc();
                return Ok(hash);
            }
        }

        let mut builder = ScriptBuilder::new();
        builder.emit_dynamic_call(
            &native::CONTRACT_MANAGEMENT_HASH,
            "deploy",
            &[
                StackItem::ByteString(nef_bytes.to_vec()),
                StackItem::from_str_utf8(manifest_json),
            ],
        )?;
        let context = TransactionContext::new(vec![Signer::called_by_entry(sender)], Vec::new());
        let result = self.execute(session_id, &builder.into_bytes(), Some(context), true);

        if result.halted() {
            info!("Session {}: deployed {} as {}", session_id, manifest.name, hash);
            VIRTUAL_DEPLOYS_TOTAL.with_label_values(&["deployed"]).inc();
            return Ok(hash);
        }
        let fault = result.exception.unwrap_or_default();
        if fault.contains(native::CONTRACT_EXISTS_MESSAGE) {
            VIRTUAL_DEPLOYS_TOTAL.with_label_values(&["existing"]).inc();
            return Ok(hash);
        }
        warn!("Session {}: deploy of {} faulted: {}", session_id, manifest.name, fault);
        VIRTUAL_DEPLOYS_TOTAL.with_label_values(&["failed"]).inc();
        Err(ExecutionError::DeployFailed(fault))
    }
}
