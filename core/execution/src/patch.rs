// dryrun/core/execution/src/patch.rs

// Direct state mutation of a session, bypassing script execution
use crate::executor::SessionExecutor;
use crate::metrics::STATE_PATCHES_TOTAL;
use crate::native::{self, AccountState, BalanceRecord, NeoAccountState};
use crate::types::ExecutionError;
use dryrun_storage::{encode_integer, Hash160, Snapshot, StorageKey};
use tracing::{debug, info};

/// Slot written by a balance patch and the encoded balance it now holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalancePatch {
    pub key: StorageKey,
    pub value: Vec<u8>,
}

fn resolve_contract_id(snapshot: &Snapshot<'_>, contract: &Hash160) -> Result<i32, ExecutionError> {
    native::contract_id(snapshot, contract).ok_or(ExecutionError::ContractNotFound(*contract))
}

/// Overwrite a built-in token balance and move the total supply by the same delta.
///
/// Everything is computed before the first write, so an error leaves the
/// snapshot untouched.
fn set_native_balance<R: BalanceRecord>(
    snapshot: &mut Snapshot<'_>,
    token_id: i32,
    account: &Hash160,
    balance: i128,
) -> Result<BalancePatch, ExecutionError> {
    let key = native::account_key(token_id, native::PREFIX_ACCOUNT, account);
    let mut record: R = match snapshot.get(&key) {
        Some(bytes) => native::decode_record(&key, &bytes)?,
        None => R::default(),
    };
    let delta = balance
        .checked_sub(record.balance())
        .ok_or(ExecutionError::SupplyOverflow)?;
    let supply = native::read_total_supply(snapshot, token_id)?
        .checked_add(delta)
        .ok_or(ExecutionError::SupplyOverflow)?;

    record.set_balance(balance);
    snapshot.put(key.clone(), native::encode_record(&record));
    snapshot.put(native::total_supply_key(token_id), encode_integer(supply));
    debug!(
        "Token {} balance of {} set to {} (supply now {})",
        token_id, account, balance, supply
    );
    Ok(BalancePatch {
        key,
        value: encode_integer(balance),
    })
}

impl SessionExecutor {
    /// Write a slot of `contract` in the session head; an empty value deletes it
    pub fn put_storage(
        &self,
        session_id: &str,
        contract: &Hash160,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), ExecutionError> {
        let handle = self.sessions.get_or_fail(session_id)?;
        let mut session = handle.lock();
        let snapshot = session.snapshot_mut();
        let id = resolve_contract_id(snapshot, contract)?;
        let slot = StorageKey::new(id, key.to_vec());
        if value.is_empty() {
            snapshot.delete(slot);
            STATE_PATCHES_TOTAL.with_label_values(&["delete"]).inc();
        } else {
            snapshot.put(slot, value.to_vec());
            STATE_PATCHES_TOTAL.with_label_values(&["put"]).inc();
        }
        Ok(())
    }

    pub fn get_storage(
        &self,
        session_id: &str,
        contract: &Hash160,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>, ExecutionError> {
        let handle = self.sessions.get_or_fail(session_id)?;
        let session = handle.lock();
        let id = resolve_contract_id(session.snapshot(), contract)?;
        Ok(session.snapshot().get(&StorageKey::new(id, key.to_vec())))
    }

    /// Every visible slot of `contract` whose key starts with `prefix`, ascending
    pub fn find_storage(
        &self,
        session_id: &str,
        contract: &Hash160,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, ExecutionError> {
        let handle = self.sessions.get_or_fail(session_id)?;
        let session = handle.lock();
        let id = resolve_contract_id(session.snapshot(), contract)?;
        Ok(session.snapshot().find_by_prefix(id, prefix).collect())
    }

    /// Set a token balance in the session head.
    ///
    /// NEO and GAS keep their total supply in step with the change. Any other
    /// token gets a raw overwrite of `prefix ‖ account` (prefix defaults to 1).
    pub fn set_token_balance(
        &self,
        session_id: &str,
        token: &Hash160,
        account: &Hash160,
        balance: i128,
        prefix: Option<u8>,
    ) -> Result<BalancePatch, ExecutionError> {
        if balance < 0 {
            return Err(ExecutionError::InvalidInput(format!(
                "balance must not be negative, got {}",
                balance
            )));
        }
        let handle = self.sessions.get_or_fail(session_id)?;
        let mut session = handle.lock();
        let snapshot = session.snapshot_mut();

        let patch = if *token == native::NEO_HASH {
            set_native_balance::<NeoAccountState>(snapshot, native::NEO_ID, account, balance)?
        } else if *token == native::GAS_HASH {
            set_native_balance::<AccountState>(snapshot, native::GAS_ID, account, balance)?
        } else {
            let id = resolve_contract_id(snapshot, token)?;
            let key = native::account_key(id, prefix.unwrap_or(native::DEFAULT_TOKEN_PREFIX), account);
            let value = encode_integer(balance);
            snapshot.put(key.clone(), value.clone());
            BalancePatch { key, value }
        };

        info!("Session {}: balance of {} in {} set to {}", session_id, account, token, balance);
        STATE_PATCHES_TOTAL.with_label_values(&["balance"]).inc();
        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionConfig;
    use crate::contract::{ContractAbi, ContractManifest, ContractState, NefFile};
    use crate::engine::{EngineOutcome, ExecutionEngine, ExecutionRequest, LogSink};
    use crate::types::VmState;
    use dryrun_storage::{decode_integer, MemoryStore};
    use std::sync::Arc;

    struct IdleEngine;

    impl ExecutionEngine for IdleEngine {
        fn run(&self, _: ExecutionRequest<'_>, _: &mut Snapshot<'_>, _: &mut dyn LogSink) -> EngineOutcome {
            EngineOutcome {
                state: VmState::Halt,
                gas_consumed: 0,
                fault: None,
                notifications: Vec::new(),
                result_stack: Vec::new(),
                call_frames: Vec::new(),
                calling_script_hash: None,
                current_script_hash: None,
                entry_script_hash: None,
            }
        }
    }

    const TOKEN: Hash160 = Hash160([7; 20]);

    fn executor() -> SessionExecutor {
        let mut store = MemoryStore::new();
        let state = ContractState {
            id: 3,
            update_counter: 0,
            hash: TOKEN,
            nef: NefFile::new("test", vec![0x40]).unwrap(),
            manifest: ContractManifest::new("Token", ContractAbi::default()),
        };
        store.put(native::contract_key(&TOKEN), state.to_bytes());
        store.put(
            native::total_supply_key(native::GAS_ID),
            encode_integer(1_000),
        );
        store.put(
            native::account_key(native::GAS_ID, native::PREFIX_ACCOUNT, &Hash160([1; 20])),
            native::encode_record(&AccountState { balance: 1_000 }),
        );
        let executor = SessionExecutor::new(Arc::new(store), Arc::new(IdleEngine), ExecutionConfig::default());
        executor.execute("s", &[0x40], None, true);
        executor
    }

    fn supply(executor: &SessionExecutor, token_id: i32) -> i128 {
        let handle = executor.sessions().get("s").unwrap();
        let session = handle.lock();
        native::read_total_supply(session.snapshot(), token_id).unwrap()
    }

    #[test]
    fn test_put_get_delete() {
        let executor = executor();
        executor.put_storage("s", &TOKEN, b"k", b"v").unwrap();
        assert_eq!(executor.get_storage("s", &TOKEN, b"k").unwrap(), Some(b"v".to_vec()));
        executor.put_storage("s", &TOKEN, b"k", b"").unwrap();
        assert_eq!(executor.get_storage("s", &TOKEN, b"k").unwrap(), None);
    }

    #[test]
    fn test_unknown_session_or_contract() {
        let executor = executor();
        assert!(matches!(
            executor.put_storage("nope", &TOKEN, b"k", b"v"),
            Err(ExecutionError::SessionNotFound(_))
        ));
        assert!(matches!(
            executor.get_storage("s", &Hash160([9; 20]), b"k"),
            Err(ExecutionError::ContractNotFound(_))
        ));
        assert!(executor.sessions().get("nope").is_none());
    }

    #[test]
    fn test_find_storage_sees_deletes() {
        let executor = executor();
        for key in [&b"a1"[..], &b"a2"[..], &b"a3"[..], &b"b1"[..]] {
            executor.put_storage("s", &TOKEN, key, b"x").unwrap();
        }
        executor.put_storage("s", &TOKEN, b"a2", b"").unwrap();
        let found = executor.find_storage("s", &TOKEN, b"a").unwrap();
        let keys: Vec<_> = found.into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"a1".to_vec(), b"a3".to_vec()]);
    }

    #[test]
    fn test_native_balance_keeps_supply_in_step() {
        let executor = executor();
        let holder = Hash160([1; 20]);
        let newcomer = Hash160([2; 20]);

        executor.set_token_balance("s", &native::GAS_HASH, &holder, 400, None).unwrap();
        assert_eq!(supply(&executor, native::GAS_ID), 400);

        let patch = executor
            .set_token_balance("s", &native::GAS_HASH, &newcomer, 250, Some(99))
            .unwrap();
        assert_eq!(patch.key, native::account_key(native::GAS_ID, native::PREFIX_ACCOUNT, &newcomer));
        assert_eq!(decode_integer(&patch.value).unwrap(), 250);
        assert_eq!(supply(&executor, native::GAS_ID), 650);

        // NEO records are created lazily and start a supply of their own
        executor.set_token_balance("s", &native::NEO_HASH, &newcomer, 5, None).unwrap();
        assert_eq!(supply(&executor, native::NEO_ID), 5);
    }

    #[test]
    fn test_custom_token_raw_overwrite() {
        let executor = executor();
        let account = Hash160([4; 20]);
        let patch = executor.set_token_balance("s", &TOKEN, &account, 77, None).unwrap();
        assert_eq!(patch.key, StorageKey::with_prefix(3, native::DEFAULT_TOKEN_PREFIX, account.as_bytes()));

        let patch = executor.set_token_balance("s", &TOKEN, &account, 78, Some(5)).unwrap();
        assert_eq!(patch.key.key[0], 5);
        assert_eq!(
            executor.get_storage("s", &TOKEN, &patch.key.key).unwrap(),
            Some(encode_integer(78))
        );
    }

    #[test]
    fn test_negative_balance_rejected() {
        let executor = executor();
        assert!(matches!(
            executor.set_token_balance("s", &native::GAS_HASH, &Hash160([1; 20]), -1, None),
            Err(ExecutionError::InvalidInput(_))
        ));
        assert_eq!(supply(&executor, native::GAS_ID), 1_000);
    }
}
