// dryrun/core/api/tests/rpc_tests.rs

// JSON-RPC round trips through the session methods
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use dryrun_api::{RpcConfig, RpcServer};
use dryrun_execution::contract::{ContractAbi, ContractManifest, MethodDescriptor, NefFile, ParameterDescriptor};
use dryrun_execution::{native, ExecutionConfig, OpCode, ScriptBuilder, SessionExecutor, Syscall, Wallet};
use dryrun_storage::Hash160;
use dryrun_vm::{build_genesis, GenesisConfig, KeyWallet, ReferenceEngine};
use serde_json::{json, Value};
use std::sync::Arc;

const BOB: &str = "0xb0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0";

struct Harness {
    rpc: RpcServer,
    owner: Hash160,
    gas_supply: i128,
}

fn harness() -> Harness {
    let wallet = KeyWallet::generate(7);
    let owner = wallet.default_account().unwrap();
    let genesis = GenesisConfig {
        network: 7,
        neo_holder: Some(owner),
        gas_holder: Some(owner),
        ..Default::default()
    };
    let store = build_genesis(&genesis).unwrap();
    let executor = SessionExecutor::new(
        Arc::new(store),
        Arc::new(ReferenceEngine::new()),
        ExecutionConfig::default(),
    )
    .with_wallet(Arc::new(wallet));
    Harness {
        rpc: RpcServer::new(RpcConfig::default(), Arc::new(executor)),
        owner,
        gas_supply: genesis.gas_supply,
    }
}

async fn call(rpc: &RpcServer, method: &str, params: Value) -> Value {
    let req = json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params}).to_string();
    let resp = rpc.io_handler().handle_request(&req).await.unwrap();
    serde_json::from_str(&resp).unwrap()
}

fn error_code(v: &Value) -> i64 {
    v["error"]["code"].as_i64().unwrap_or_else(|| panic!("expected an error, got {}", v))
}

/// Contract storing `put(key, value)` and returning `get(key)`
fn box_contract() -> (String, String) {
    let mut sb = ScriptBuilder::new();
    sb.emit_with_operand(OpCode::LDARG, &[1]);
    sb.emit_with_operand(OpCode::LDARG, &[0]);
    sb.emit_syscall(Syscall::StoragePut);
    sb.emit(OpCode::RET);
    let get_offset = sb.len();
    sb.emit_with_operand(OpCode::LDARG, &[0]);
    sb.emit_syscall(Syscall::StorageGet);
    sb.emit(OpCode::RET);

    let param = |name: &str| ParameterDescriptor {
        name: name.to_string(),
        kind: "ByteArray".to_string(),
    };
    let method = |name: &str, parameters, offset| MethodDescriptor {
        name: name.to_string(),
        parameters,
        return_type: "Any".to_string(),
        offset,
        safe: false,
    };
    let abi = ContractAbi {
        methods: vec![
            method("put", vec![param("key"), param("value")], 0),
            method("get", vec![param("key")], get_offset),
        ],
        events: vec![],
    };
    let nef = NefFile::new("dryrun-tests", sb.into_bytes()).unwrap();
    (B64.encode(nef.to_bytes()), ContractManifest::new("Box", abi).to_json_string())
}

#[tokio::test]
async fn test_invoke_function_reads_genesis_balance() {
    let h = harness();
    let v = call(
        &h.rpc,
        "invokefunctionwithsession",
        json!(["s", false, native::NEO_HASH.to_string(), "balanceOf", [{"type": "Hash160", "value": h.owner.to_string()}]]),
    )
    .await;
    assert!(v.get("error").is_none(), "{}", v);
    assert_eq!(v["result"]["state"], "HALT");
    assert_eq!(v["result"]["stack"][0]["type"], "Integer");
    assert_eq!(v["result"]["stack"][0]["value"], "100000000");

    let sessions = call(&h.rpc, "listsessions", json!([])).await;
    assert_eq!(sessions["result"], json!(["s"]));
}

#[tokio::test]
async fn test_committed_transfer_through_rpc() {
    let h = harness();
    let signers = json!([{"account": h.owner.to_string(), "scopes": "CalledByEntry"}]);
    let args = json!([
        {"type": "Hash160", "value": h.owner.to_string()},
        {"type": "Hash160", "value": BOB},
        {"type": "Integer", "value": "25"},
        {"type": "Any"},
    ]);
    let v = call(
        &h.rpc,
        "invokefunctionwithsession",
        json!(["s", true, native::NEO_HASH.to_string(), "transfer", args, signers]),
    )
    .await;
    assert_eq!(v["result"]["stack"][0]["value"], true, "{}", v);
    assert!(v["result"]["tx"].is_string());

    let balance = call(
        &h.rpc,
        "invokefunctionwithsession",
        json!(["s", false, native::NEO_HASH.to_string(), "balanceOf", [{"type": "Hash160", "value": BOB}]]),
    )
    .await;
    assert_eq!(balance["result"]["stack"][0]["value"], "25");

    // Another session still sees genesis
    let other = call(
        &h.rpc,
        "invokefunctionwithsession",
        json!(["t", false, native::NEO_HASH.to_string(), "balanceOf", [{"type": "Hash160", "value": BOB}]]),
    )
    .await;
    assert_eq!(other["result"]["stack"][0]["value"], "0");
}

#[tokio::test]
async fn test_deploy_and_patch_storage() {
    let h = harness();
    let (nef, manifest) = box_contract();
    let deployed = call(&h.rpc, "virtualdeploy", json!(["s", nef, manifest])).await;
    let hash = deployed["result"]["s"].as_str().unwrap_or_else(|| panic!("{}", deployed)).to_string();

    // Deploying again yields the same hash
    let again = call(&h.rpc, "virtualdeploy", json!(["s", nef, manifest])).await;
    assert_eq!(again["result"]["s"], hash);

    let put = call(&h.rpc, "putstoragewithsession", json!(["s", hash, "YTE=", "djE="])).await;
    assert_eq!(put["result"], json!({"YTE=": "djE="}));
    call(&h.rpc, "putstoragewithsession", json!(["s", hash, "YjE=", "djI="])).await;

    let get = call(&h.rpc, "getstoragewithsession", json!(["s", hash, "YTE="])).await;
    assert_eq!(get["result"], "djE=");

    let found = call(&h.rpc, "findstoragewithsession", json!(["s", hash, "YQ=="])).await;
    assert_eq!(found["result"], json!({"YTE=": "djE="}));

    // The contract sees the patched slot
    let read = call(
        &h.rpc,
        "invokefunctionwithsession",
        json!(["s", false, hash, "get", [{"type": "ByteArray", "value": "YTE="}]]),
    )
    .await;
    assert_eq!(read["result"]["stack"][0]["value"], "djE=");

    // Empty value deletes
    call(&h.rpc, "putstoragewithsession", json!(["s", hash, "YTE=", ""])).await;
    let gone = call(&h.rpc, "getstoragewithsession", json!(["s", hash, "YTE="])).await;
    assert_eq!(gone["result"], Value::Null);
}

#[tokio::test]
async fn test_gas_balance_patch_moves_supply() {
    let h = harness();
    // Patches need an existing session
    let missing = call(&h.rpc, "setgasbalance", json!(["s", BOB, "5"])).await;
    assert_eq!(error_code(&missing), -100);

    call(&h.rpc, "invokescriptwithsession", json!(["s", false, B64.encode([OpCode::RET as u8])])).await;
    let v = call(&h.rpc, "setgasbalance", json!(["s", BOB, "5"])).await;
    let patch = v["result"].as_object().unwrap();
    assert_eq!(patch.len(), 1);
    let (key, value) = patch.iter().next().unwrap();
    let key = B64.decode(key).unwrap();
    assert_eq!(&key[..4], &native::GAS_ID.to_le_bytes());
    assert_eq!(key[4], native::PREFIX_ACCOUNT);
    assert_eq!(B64.decode(value.as_str().unwrap()).unwrap(), vec![5]);

    let supply = call(
        &h.rpc,
        "invokefunctionwithsession",
        json!(["s", false, native::GAS_HASH.to_string(), "totalSupply"]),
    )
    .await;
    assert_eq!(supply["result"]["stack"][0]["value"], (h.gas_supply + 5).to_string());
}

#[tokio::test]
async fn test_session_timestamps() {
    let h = harness();
    let set = call(&h.rpc, "setsessiontimestamp", json!(["s", 1_700_000_000_000u64])).await;
    assert_eq!(set["result"], json!({"s": 1_700_000_000_000u64}));

    let got = call(&h.rpc, "getsessiontimestamp", json!(["s"])).await;
    assert_eq!(got["result"]["s"], 1_700_000_000_000u64);

    let back = call(&h.rpc, "setsessiontimestamp", json!(["s", 1u64])).await;
    assert_eq!(error_code(&back), -32602);

    let unknown = call(&h.rpc, "getsessiontimestamp", json!(["s", "nope"])).await;
    assert_eq!(error_code(&unknown), -100);
}

#[tokio::test]
async fn test_malformed_input_touches_nothing() {
    let h = harness();
    let bad_script = call(&h.rpc, "invokescriptwithsession", json!(["x", false, "%%%"])).await;
    assert_eq!(error_code(&bad_script), -32602);

    let bad_hash = call(&h.rpc, "invokefunctionwithsession", json!(["x", false, "0x12", "symbol"])).await;
    assert_eq!(error_code(&bad_hash), -32602);

    let bad_scope = call(
        &h.rpc,
        "invokescriptwithsession",
        json!(["x", false, "QA==", [{"account": BOB, "scopes": "Sometimes"}]]),
    )
    .await;
    assert_eq!(error_code(&bad_scope), -32602);

    let sessions = call(&h.rpc, "listsessions", json!([])).await;
    assert_eq!(sessions["result"], json!([]));
}

#[tokio::test]
async fn test_delete_sessions() {
    let h = harness();
    call(&h.rpc, "invokescriptwithsession", json!(["a", false, "QA=="])).await;
    let v = call(&h.rpc, "deletesessions", json!(["a", "b"])).await;
    assert_eq!(v["result"], json!({"a": true, "b": false}));
    let sessions = call(&h.rpc, "listsessions", json!([])).await;
    assert_eq!(sessions["result"], json!([]));
}
