// dryrun/core/vm/src/genesis.rs

// Canonical ledger state the sandbox starts from
use dryrun_execution::contract::{
    ContractAbi, ContractManifest, ContractState, EventDescriptor, MethodDescriptor, NefFile, ParameterDescriptor,
};
use dryrun_execution::native::{self, AccountState, NeoAccountState};
use dryrun_execution::{ExecutionError, OpCode, GAS_FACTOR};
use dryrun_storage::{encode_integer, Hash160, Hash256, MemoryStore};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    /// Network magic mixed into signatures and the genesis hash
    pub network: u32,
    /// Head timestamp in milliseconds
    pub timestamp: u64,
    pub neo_holder: Option<Hash160>,
    pub gas_holder: Option<Hash160>,
    pub neo_supply: i128,
    pub gas_supply: i128,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            network: 0x334f_454e,
            timestamp: 1_468_595_301_000,
            neo_holder: None,
            gas_holder: None,
            neo_supply: 100_000_000,
            gas_supply: 52_000_000 * i128::from(GAS_FACTOR),
        }
    }
}

fn param(name: &str, kind: &str) -> ParameterDescriptor {
    ParameterDescriptor {
        name: name.to_string(),
        kind: kind.to_string(),
    }
}

fn method(name: &str, parameters: Vec<ParameterDescriptor>, return_type: &str, safe: bool) -> MethodDescriptor {
    MethodDescriptor {
        name: name.to_string(),
        parameters,
        return_type: return_type.to_string(),
        offset: 0,
        safe,
    }
}

fn token_abi() -> ContractAbi {
    ContractAbi {
        methods: vec![
            method("symbol", vec![], "String", true),
            method("decimals", vec![], "Integer", true),
            method("totalSupply", vec![], "Integer", true),
            method("balanceOf", vec![param("account", "Hash160")], "Integer", true),
            method(
                "transfer",
                vec![
                    param("from", "Hash160"),
                    param("to", "Hash160"),
                    param("amount", "Integer"),
                    param("data", "Any"),
                ],
                "Boolean",
                false,
            ),
        ],
        events: vec![EventDescriptor {
            name: "Transfer".to_string(),
            parameters: vec![param("from", "Hash160"), param("to", "Hash160"), param("amount", "Integer")],
        }],
    }
}

fn native_states() -> Result<Vec<ContractState>, ExecutionError> {
    let management = ContractAbi {
        methods: vec![
            method("deploy", vec![param("nefFile", "ByteArray"), param("manifest", "ByteArray")], "Array", false),
            method("getContract", vec![param("hash", "Hash160")], "Array", true),
        ],
        events: vec![EventDescriptor {
            name: "Deploy".to_string(),
            parameters: vec![param("Hash", "Hash160")],
        }],
    };
    let oracle = ContractAbi {
        methods: vec![method(
            "request",
            vec![
                param("url", "String"),
                param("filter", "String"),
                param("callback", "String"),
                param("userData", "Any"),
                param("gasForResponse", "Integer"),
            ],
            "Void",
            false,
        )],
        events: vec![EventDescriptor {
            name: native::ORACLE_REQUEST_EVENT.to_string(),
            parameters: vec![
                param("Id", "Integer"),
                param("RequestContract", "Hash160"),
                param("Url", "String"),
                param("Filter", "String"),
            ],
        }],
    };

    let natives = [
        (native::CONTRACT_MANAGEMENT_ID, native::CONTRACT_MANAGEMENT_HASH, "ContractManagement", management),
        (native::NEO_ID, native::NEO_HASH, "NeoToken", token_abi()),
        (native::GAS_ID, native::GAS_HASH, "GasToken", token_abi()),
        (native::ORACLE_ID, native::ORACLE_HASH, "OracleContract", oracle),
    ];
    natives
        .into_iter()
        .map(|(id, hash, name, abi)| {
            Ok(ContractState {
                id,
                update_counter: 0,
                hash,
                nef: NefFile::new("native", vec![OpCode::RET as u8])?,
                manifest: ContractManifest::new(name, abi),
            })
        })
        .collect()
}

pub fn genesis_hash(network: u32) -> Hash256 {
    let mut data = b"genesis".to_vec();
    data.extend_from_slice(&network.to_le_bytes());
    Hash256::digest(&data)
}

/// Build the root store: native contracts, initial holders and supplies
pub fn build_genesis(config: &GenesisConfig) -> Result<MemoryStore, ExecutionError> {
    let mut store = MemoryStore::new();
    for state in native_states()? {
        store.put(native::contract_key(&state.hash), state.to_bytes());
    }
    store.put(native::next_id_key(), encode_integer(1));

    let mut neo_supply = 0;
    if let Some(holder) = config.neo_holder {
        let record = NeoAccountState {
            balance: config.neo_supply,
            ..Default::default()
        };
        store.put(
            native::account_key(native::NEO_ID, native::PREFIX_ACCOUNT, &holder),
            native::encode_record(&record),
        );
        neo_supply = config.neo_supply;
    }
    let mut gas_supply = 0;
    if let Some(holder) = config.gas_holder {
        let record = AccountState {
            balance: config.gas_supply,
        };
        store.put(
            native::account_key(native::GAS_ID, native::PREFIX_ACCOUNT, &holder),
            native::encode_record(&record),
        );
        gas_supply = config.gas_supply;
    }
    store.put(native::total_supply_key(native::NEO_ID), encode_integer(neo_supply));
    store.put(native::total_supply_key(native::GAS_ID), encode_integer(gas_supply));

    let hash = genesis_hash(config.network);
    store.set_head(0, hash, config.timestamp);
    info!(
        "Genesis {} built for network {:#x} ({} entries)",
        hash,
        config.network,
        store.len()
    );
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dryrun_storage::{RootStore, Snapshot};
    use std::sync::Arc;

    #[test]
    fn test_natives_registered() {
        let store = build_genesis(&GenesisConfig::default()).unwrap();
        let snapshot = Snapshot::new(Arc::new(store));
        assert_eq!(native::contract_name(&snapshot, &native::NEO_HASH), "NeoToken");
        assert_eq!(native::contract_id(&snapshot, &native::ORACLE_HASH), Some(native::ORACLE_ID));
        assert_eq!(snapshot.root_height(), 0);
    }

    #[test]
    fn test_supply_matches_holder() {
        let holder = Hash160([5; 20]);
        let config = GenesisConfig {
            gas_holder: Some(holder),
            ..Default::default()
        };
        let store = build_genesis(&config).unwrap();
        assert_eq!(store.head_timestamp(), config.timestamp);
        let snapshot = Snapshot::new(Arc::new(store));
        let balance = native::read_balance::<AccountState>(&snapshot, native::GAS_ID, &holder).unwrap();
        assert_eq!(balance, config.gas_supply);
        assert_eq!(native::read_total_supply(&snapshot, native::GAS_ID).unwrap(), balance);
        assert_eq!(native::read_total_supply(&snapshot, native::NEO_ID).unwrap(), 0);
    }
}
