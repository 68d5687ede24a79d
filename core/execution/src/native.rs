// dryrun/core/execution/src/native.rs

// Storage layout of the built-in contracts
use crate::contract::ContractState;
use crate::types::{ExecutionError, StackItem};
use dryrun_storage::{Hash160, Hash256, Snapshot, StorageKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const CONTRACT_MANAGEMENT_ID: i32 = -1;
pub const NEO_ID: i32 = -5;
pub const GAS_ID: i32 = -6;
pub const ORACLE_ID: i32 = -9;

pub const CONTRACT_MANAGEMENT_HASH: Hash160 = Hash160([
    0xff, 0xfd, 0xc9, 0x37, 0x64, 0xdb, 0xad, 0xdd, 0x97, 0xc4, 0x8f, 0x25, 0x2a, 0x53, 0xea, 0x46,
    0x43, 0xfa, 0xa3, 0xfd,
]);
pub const NEO_HASH: Hash160 = Hash160([
    0xef, 0x40, 0x73, 0xa0, 0xf2, 0xb3, 0x05, 0xa3, 0x8e, 0xc4, 0x05, 0x0e, 0x4d, 0x3d, 0x28, 0xbc,
    0x40, 0xea, 0x63, 0xf5,
]);
pub const GAS_HASH: Hash160 = Hash160([
    0xd2, 0xa4, 0xcf, 0xf3, 0x19, 0x13, 0x01, 0x61, 0x55, 0xe3, 0x8e, 0x47, 0x4a, 0x2c, 0x06, 0xd0,
    0x8b, 0xe2, 0x76, 0xcf,
]);
pub const ORACLE_HASH: Hash160 = Hash160([
    0xfe, 0x92, 0x4b, 0x7c, 0xfe, 0x89, 0xdd, 0xd2, 0x71, 0xab, 0xaf, 0x72, 0x10, 0xa8, 0x0a, 0x7e,
    0x11, 0x17, 0x87, 0x58,
]);

// ContractManagement
pub const PREFIX_CONTRACT: u8 = 8;
pub const PREFIX_NEXT_AVAILABLE_ID: u8 = 15;

// Fungible tokens
pub const PREFIX_ACCOUNT: u8 = 20;
pub const PREFIX_TOTAL_SUPPLY: u8 = 11;
pub const DEFAULT_TOKEN_PREFIX: u8 = 1;

// Oracle
pub const PREFIX_REQUEST_ID: u8 = 9;
pub const PREFIX_REQUEST: u8 = 7;

pub const NEO_DECIMALS: u8 = 0;
pub const GAS_DECIMALS: u8 = 8;

/// Name of the notification the oracle emits for each new request
pub const ORACLE_REQUEST_EVENT: &str = "OracleRequest";
/// Fault message of a deploy whose contract hash is already taken
pub const CONTRACT_EXISTS_MESSAGE: &str = "Contract Already Exists";

pub fn is_native(hash: &Hash160) -> bool {
    [CONTRACT_MANAGEMENT_HASH, NEO_HASH, GAS_HASH, ORACLE_HASH].contains(hash)
}

pub fn contract_key(hash: &Hash160) -> StorageKey {
    StorageKey::with_prefix(CONTRACT_MANAGEMENT_ID, PREFIX_CONTRACT, hash.as_bytes())
}

pub fn next_id_key() -> StorageKey {
    StorageKey::with_prefix(CONTRACT_MANAGEMENT_ID, PREFIX_NEXT_AVAILABLE_ID, &[])
}

pub fn account_key(token_id: i32, prefix: u8, account: &Hash160) -> StorageKey {
    StorageKey::with_prefix(token_id, prefix, account.as_bytes())
}

pub fn total_supply_key(token_id: i32) -> StorageKey {
    StorageKey::with_prefix(token_id, PREFIX_TOTAL_SUPPLY, &[])
}

pub fn oracle_counter_key() -> StorageKey {
    StorageKey::with_prefix(ORACLE_ID, PREFIX_REQUEST_ID, &[])
}

pub fn oracle_request_key(id: u64) -> StorageKey {
    StorageKey::with_prefix(ORACLE_ID, PREFIX_REQUEST, &id.to_be_bytes())
}

/// Hash a deployed contract gets: derived from deployer, NEF checksum and name
pub fn contract_hash(sender: &Hash160, nef_checksum: u32, name: &str) -> Hash160 {
    let mut data = Vec::with_capacity(1 + 20 + 4 + name.len());
    data.push(0x38);
    data.extend_from_slice(sender.as_bytes());
    data.extend_from_slice(&nef_checksum.to_le_bytes());
    data.extend_from_slice(name.as_bytes());
    Hash160::digest(&data)
}

/// Contract record visible in `snapshot`, if any
pub fn get_contract(snapshot: &Snapshot<'_>, hash: &Hash160) -> Option<ContractState> {
    let bytes = snapshot.get(&contract_key(hash))?;
    match ContractState::from_bytes(&bytes) {
        Ok(state) => Some(state),
        Err(e) => {
            warn!("Unreadable contract record for {}: {}", hash, e);
            None
        }
    }
}

pub fn contract_id(snapshot: &Snapshot<'_>, hash: &Hash160) -> Option<i32> {
    get_contract(snapshot, hash).map(|c| c.id)
}

/// Manifest name of the contract at `hash`, or `"Unknown"` for plain scripts
pub fn contract_name(snapshot: &Snapshot<'_>, hash: &Hash160) -> String {
    get_contract(snapshot, hash)
        .map(|c| c.manifest.name)
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Balance-carrying account record of a built-in token
pub trait BalanceRecord: Serialize + DeserializeOwned + Default {
    fn balance(&self) -> i128;
    fn set_balance(&mut self, balance: i128);
}

/// GAS account record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub balance: i128,
}

impl BalanceRecord for AccountState {
    fn balance(&self) -> i128 {
        self.balance
    }

    fn set_balance(&mut self, balance: i128) {
        self.balance = balance;
    }
}

/// NEO account record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeoAccountState {
    pub balance: i128,
    pub balance_height: u32,
    pub vote_to: Option<Vec<u8>>,
}

impl BalanceRecord for NeoAccountState {
    fn balance(&self) -> i128 {
        self.balance
    }

    fn set_balance(&mut self, balance: i128) {
        self.balance = balance;
    }
}

pub fn decode_record<T: DeserializeOwned>(key: &StorageKey, bytes: &[u8]) -> Result<T, ExecutionError> {
    bincode::deserialize(bytes)
        .map_err(|e| ExecutionError::CorruptedRecord(format!("{}:{} ({})", key.id, hex::encode(&key.key), e)))
}

pub fn encode_record<T: Serialize>(record: &T) -> Vec<u8> {
    bincode::serialize(record).unwrap_or_default()
}

/// Read a built-in token balance; absent records read as zero
pub fn read_balance<R: BalanceRecord>(
    snapshot: &Snapshot<'_>,
    token_id: i32,
    account: &Hash160,
) -> Result<i128, ExecutionError> {
    let key = account_key(token_id, PREFIX_ACCOUNT, account);
    match snapshot.get(&key) {
        Some(bytes) => Ok(decode_record::<R>(&key, &bytes)?.balance()),
        None => Ok(0),
    }
}

pub fn read_total_supply(snapshot: &Snapshot<'_>, token_id: i32) -> Result<i128, ExecutionError> {
    match snapshot.get(&total_supply_key(token_id)) {
        Some(bytes) => Ok(dryrun_storage::decode_integer(&bytes)?),
        None => Ok(0),
    }
}

/// Pending oracle request as kept by the oracle contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRequest {
    pub original_txid: Hash256,
    pub gas_for_response: i64,
    pub url: String,
    pub filter: Option<String>,
    pub callback_contract: Hash160,
    pub callback_method: String,
    pub user_data: Vec<u8>,
}

impl OracleRequest {
    /// `[txid, gas, url, filter, callback contract, callback method, user data]`
    pub fn to_stack_item(&self) -> StackItem {
        StackItem::Array(vec![
            StackItem::ByteString(self.original_txid.as_bytes().to_vec()),
            StackItem::Integer(i128::from(self.gas_for_response)),
            StackItem::from_str_utf8(&self.url),
            self.filter
                .as_deref()
                .map(StackItem::from_str_utf8)
                .unwrap_or(StackItem::Null),
            StackItem::from_hash(&self.callback_contract),
            StackItem::from_str_utf8(&self.callback_method),
            StackItem::ByteString(self.user_data.clone()),
        ])
    }
}
