// dryrun/core/vm/src/gas.rs

// Gas schedule of the reference interpreter
use dryrun_execution::{OpCode, Syscall, GAS_FACTOR};

/// Multiplier applied to every opcode and syscall base price
pub const EXEC_FEE_FACTOR: i64 = 30;
/// Fee per byte written to storage
pub const STORAGE_PRICE: i64 = 100_000;
/// Flat fee charged by ContractManagement.deploy
pub const DEPLOY_FEE: i64 = 10 * GAS_FACTOR;
/// Flat fee charged by Oracle.request, on top of the response gas
pub const ORACLE_REQUEST_PRICE: i64 = GAS_FACTOR / 2;
/// Smallest gas a requester may attach for the oracle response
pub const MIN_ORACLE_RESPONSE_GAS: i64 = GAS_FACTOR / 10;

pub fn opcode_price(opcode: OpCode) -> i64 {
    let base = match opcode {
        OpCode::PUSHINT8
        | OpCode::PUSHINT16
        | OpCode::PUSHINT32
        | OpCode::PUSHINT64
        | OpCode::PUSHT
        | OpCode::PUSHF
        | OpCode::PUSHNULL
        | OpCode::PUSHM1
        | OpCode::PUSH0
        | OpCode::PUSH1
        | OpCode::PUSH2
        | OpCode::PUSH3
        | OpCode::PUSH4
        | OpCode::PUSH5
        | OpCode::PUSH6
        | OpCode::PUSH7
        | OpCode::PUSH8
        | OpCode::PUSH9
        | OpCode::PUSH10
        | OpCode::PUSH11
        | OpCode::PUSH12
        | OpCode::PUSH13
        | OpCode::PUSH14
        | OpCode::PUSH15
        | OpCode::PUSH16 => 1,
        OpCode::PUSHINT128 => 4,
        OpCode::PUSHDATA1 => 8,
        OpCode::PUSHDATA2 => 512,
        OpCode::PUSHDATA4 => 4096,
        OpCode::JMP | OpCode::JMPIF | OpCode::JMPIFNOT => 2,
        OpCode::ABORT | OpCode::ASSERT => 1,
        OpCode::RET | OpCode::SYSCALL => 0,
        OpCode::DROP | OpCode::DUP | OpCode::SWAP | OpCode::LDARG => 2,
        OpCode::NOT => 4,
        OpCode::ADD | OpCode::SUB | OpCode::NUMEQUAL | OpCode::LT | OpCode::GE => 8,
        OpCode::EQUAL => 32,
        OpCode::PICKITEM => 64,
        OpCode::CAT | OpCode::PACK => 2048,
    };
    base * EXEC_FEE_FACTOR
}

pub fn syscall_price(syscall: Syscall) -> i64 {
    let base = match syscall {
        Syscall::RuntimeGetTime => 1 << 3,
        Syscall::RuntimeCheckWitness => 1 << 10,
        Syscall::ContractCall
        | Syscall::StorageGet
        | Syscall::StoragePut
        | Syscall::StorageDelete
        | Syscall::StorageFind
        | Syscall::RuntimeLog
        | Syscall::RuntimeNotify => 1 << 15,
    };
    base * EXEC_FEE_FACTOR
}

/// Price of a native method, before any method-specific fees
pub fn native_method_price(method: &str) -> i64 {
    let base = match method {
        "symbol" | "decimals" => 0,
        "totalSupply" | "balanceOf" | "getContract" => 1 << 15,
        "transfer" => 1 << 17,
        _ => 0,
    };
    base * EXEC_FEE_FACTOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prices_scale_with_factor() {
        assert_eq!(opcode_price(OpCode::PUSH1), EXEC_FEE_FACTOR);
        assert_eq!(opcode_price(OpCode::RET), 0);
        assert_eq!(syscall_price(Syscall::StorageGet), (1 << 15) * EXEC_FEE_FACTOR);
        assert!(native_method_price("transfer") > native_method_price("balanceOf"));
    }
}
