// dryrun/core/vm/src/natives.rs

// Built-in contracts executed in Rust instead of bytecode
use crate::engine::Machine;
use crate::error::{Result, VmError};
use crate::gas;
use dryrun_execution::contract::{ContractManifest, ContractState, NefFile};
use dryrun_execution::native::{self, AccountState, BalanceRecord, NeoAccountState, OracleRequest};
use dryrun_execution::{Notification, StackItem};
use dryrun_storage::{decode_integer, encode_integer, Hash160};
use tracing::debug;

fn argument(args: &[StackItem], index: usize) -> Result<&StackItem> {
    args.get(index).ok_or(VmError::IndexOutOfRange(index as i128))
}

fn hash_arg(args: &[StackItem], index: usize) -> Result<Hash160> {
    let item = argument(args, index)?;
    item.as_hash160().ok_or(VmError::InvalidType {
        expected: "Hash160",
        found: item.type_name(),
    })
}

fn integer_arg(args: &[StackItem], index: usize) -> Result<i128> {
    let item = argument(args, index)?;
    item.as_integer().ok_or(VmError::InvalidType {
        expected: "Integer",
        found: item.type_name(),
    })
}

fn bytes_arg(args: &[StackItem], index: usize) -> Result<Vec<u8>> {
    let item = argument(args, index)?;
    item.as_bytes().ok_or(VmError::InvalidType {
        expected: "ByteString",
        found: item.type_name(),
    })
}

fn string_arg(args: &[StackItem], index: usize) -> Result<String> {
    String::from_utf8(bytes_arg(args, index)?)
        .map_err(|_| VmError::InvalidOperation(format!("argument {} is not valid UTF-8", index)))
}

impl<'a, 'p> Machine<'a, 'p> {
    /// Run a method of a built-in contract; the caller is the current frame
    pub(crate) fn call_native(&mut self, hash: &Hash160, method: &str, args: Vec<StackItem>) -> Result<StackItem> {
        self.charge(gas::native_method_price(method))?;
        let not_found = || VmError::MethodNotFound {
            contract: *hash,
            method: method.to_string(),
            argc: args.len(),
        };
        match *hash {
            native::CONTRACT_MANAGEMENT_HASH => match (method, args.len()) {
                ("deploy", 2) => self.deploy(&args),
                ("getContract", 1) => {
                    let target = hash_arg(&args, 0)?;
                    Ok(native::get_contract(&*self.snapshot, &target)
                        .map(|c| c.to_stack_item())
                        .unwrap_or(StackItem::Null))
                }
                _ => Err(not_found()),
            },
            native::NEO_HASH => self
                .token::<NeoAccountState>(native::NEO_HASH, native::NEO_ID, "NEO", native::NEO_DECIMALS, method, &args)?
                .ok_or_else(not_found),
            native::GAS_HASH => self
                .token::<AccountState>(native::GAS_HASH, native::GAS_ID, "GAS", native::GAS_DECIMALS, method, &args)?
                .ok_or_else(not_found),
            native::ORACLE_HASH => match (method, args.len()) {
                ("request", 5) => self.oracle_request(&args),
                _ => Err(not_found()),
            },
            _ => Err(VmError::ContractNotFound(*hash)),
        }
    }

    fn emit(&mut self, script_hash: Hash160, event_name: &str, state: Vec<StackItem>) {
        self.notifications.push(Notification {
            script_hash,
            event_name: event_name.to_string(),
            state: StackItem::Array(state),
        });
    }

    fn deploy(&mut self, args: &[StackItem]) -> Result<StackItem> {
        let sender = self
            .container
            .and_then(|c| c.sender())
            .ok_or_else(|| VmError::InvalidOperation("deploy requires a transaction sender".to_string()))?;
        self.charge(gas::DEPLOY_FEE)?;

        let nef = NefFile::parse(&bytes_arg(args, 0)?)?;
        let manifest = ContractManifest::parse(&string_arg(args, 1)?)?;
        let hash = native::contract_hash(&sender, nef.checksum, &manifest.name);
        if self.snapshot.contains(&native::contract_key(&hash)) {
            return Err(VmError::ContractExists(hash));
        }

        let id = match self.snapshot.get(&native::next_id_key()) {
            Some(bytes) => decode_integer(&bytes)?,
            None => 1,
        };
        self.snapshot.put(native::next_id_key(), encode_integer(id + 1));

        let state = ContractState {
            id: i32::try_from(id).map_err(|_| VmError::Overflow)?,
            update_counter: 0,
            hash,
            nef,
            manifest,
        };
        self.snapshot.put(native::contract_key(&hash), state.to_bytes());
        debug!("Deployed {} ({}) with id {}", state.manifest.name, hash, id);
        self.emit(native::CONTRACT_MANAGEMENT_HASH, "Deploy", vec![StackItem::from_hash(&hash)]);
        Ok(state.to_stack_item())
    }

    /// NEP-17 surface shared by NEO and GAS; `None` when the method is unknown
    fn token<R: BalanceRecord>(
        &mut self,
        token_hash: Hash160,
        token_id: i32,
        symbol: &str,
        decimals: u8,
        method: &str,
        args: &[StackItem],
    ) -> Result<Option<StackItem>> {
        let value = match (method, args.len()) {
            ("symbol", 0) => StackItem::from_str_utf8(symbol),
            ("decimals", 0) => StackItem::Integer(i128::from(decimals)),
            ("totalSupply", 0) => StackItem::Integer(native::read_total_supply(&*self.snapshot, token_id)?),
            ("balanceOf", 1) => {
                let account = hash_arg(args, 0)?;
                StackItem::Integer(native::read_balance::<R>(&*self.snapshot, token_id, &account)?)
            }
            ("transfer", 4) => {
                let from = hash_arg(args, 0)?;
                let to = hash_arg(args, 1)?;
                let amount = integer_arg(args, 2)?;
                StackItem::Boolean(self.transfer::<R>(token_hash, token_id, from, to, amount)?)
            }
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    fn transfer<R: BalanceRecord>(
        &mut self,
        token_hash: Hash160,
        token_id: i32,
        from: Hash160,
        to: Hash160,
        amount: i128,
    ) -> Result<bool> {
        if amount < 0 {
            return Err(VmError::InvalidOperation("The amount must be a positive number.".to_string()));
        }
        let caller = self.current_hash();
        let calling = Some(caller);
        if !self.check_witness(&from, token_hash, calling) {
            debug!("Transfer of {} from {} rejected: no witness", amount, from);
            return Ok(false);
        }

        let from_key = native::account_key(token_id, native::PREFIX_ACCOUNT, &from);
        let mut from_record: R = match self.snapshot.get(&from_key) {
            Some(bytes) => native::decode_record(&from_key, &bytes)?,
            None => R::default(),
        };
        if from_record.balance() < amount {
            return Ok(false);
        }

        if amount > 0 && from != to {
            let remaining = from_record.balance() - amount;
            if remaining == 0 {
                self.snapshot.delete(from_key);
            } else {
                from_record.set_balance(remaining);
                self.snapshot.put(from_key, native::encode_record(&from_record));
            }

            let to_key = native::account_key(token_id, native::PREFIX_ACCOUNT, &to);
            let mut to_record: R = match self.snapshot.get(&to_key) {
                Some(bytes) => native::decode_record(&to_key, &bytes)?,
                None => R::default(),
            };
            let credited = to_record.balance().checked_add(amount).ok_or(VmError::Overflow)?;
            to_record.set_balance(credited);
            self.snapshot.put(to_key, native::encode_record(&to_record));
        }

        self.emit(
            token_hash,
            "Transfer",
            vec![StackItem::from_hash(&from), StackItem::from_hash(&to), StackItem::Integer(amount)],
        );
        Ok(true)
    }

    /// `request(url, filter, callback, userData, gasForResponse)`
    fn oracle_request(&mut self, args: &[StackItem]) -> Result<StackItem> {
        let container = self
            .container
            .ok_or_else(|| VmError::InvalidOperation("oracle requests need a transaction".to_string()))?;
        let url = string_arg(args, 0)?;
        let filter = match argument(args, 1)? {
            StackItem::Null => None,
            _ => Some(string_arg(args, 1)?),
        };
        let callback_method = string_arg(args, 2)?;
        let user_data = bytes_arg(args, 3)?;
        let gas_for_response = i64::try_from(integer_arg(args, 4)?).map_err(|_| VmError::Overflow)?;
        if gas_for_response < gas::MIN_ORACLE_RESPONSE_GAS {
            return Err(VmError::InvalidOperation(format!(
                "gasForResponse must be at least {}",
                gas::MIN_ORACLE_RESPONSE_GAS
            )));
        }
        if callback_method.starts_with('_') {
            return Err(VmError::InvalidOperation("callback cannot start with an underscore".to_string()));
        }
        self.charge(gas::ORACLE_REQUEST_PRICE)?;
        self.charge(gas_for_response)?;

        let id = match self.snapshot.get(&native::oracle_counter_key()) {
            Some(bytes) => decode_integer(&bytes)?,
            None => 0,
        };
        let id = u64::try_from(id).map_err(|_| VmError::Overflow)?;
        self.snapshot
            .put(native::oracle_counter_key(), encode_integer(i128::from(id) + 1));

        let caller = self.current_hash();
        let request = OracleRequest {
            original_txid: container.hash(),
            gas_for_response,
            url: url.clone(),
            filter: filter.clone(),
            callback_contract: caller,
            callback_method,
            user_data,
        };
        self.snapshot
            .put(native::oracle_request_key(id), native::encode_record(&request));
        debug!("Oracle request {} for {} from {}", id, url, caller);

        self.emit(
            native::ORACLE_HASH,
            native::ORACLE_REQUEST_EVENT,
            vec![
                StackItem::Integer(i128::from(id)),
                StackItem::from_hash(&caller),
                StackItem::from_str_utf8(&url),
                filter.as_deref().map(StackItem::from_str_utf8).unwrap_or(StackItem::Null),
            ],
        );
        Ok(StackItem::Null)
    }
}
