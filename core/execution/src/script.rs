// dryrun/core/execution/src/script.rs

// Bytecode format shared by script builders and the interpreter
use crate::types::{ExecutionError, StackItem};
use dryrun_storage::Hash160;
use sha2::{Digest, Sha256};

/// Instruction set understood by the interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    PUSHINT8 = 0x00,
    PUSHINT16 = 0x01,
    PUSHINT32 = 0x02,
    PUSHINT64 = 0x03,
    PUSHINT128 = 0x04,
    PUSHT = 0x08,
    PUSHF = 0x09,
    PUSHNULL = 0x0B,
    PUSHDATA1 = 0x0C,
    PUSHDATA2 = 0x0D,
    PUSHDATA4 = 0x0E,
    PUSHM1 = 0x0F,
    PUSH0 = 0x10,
    PUSH1 = 0x11,
    PUSH2 = 0x12,
    PUSH3 = 0x13,
    PUSH4 = 0x14,
    PUSH5 = 0x15,
    PUSH6 = 0x16,
    PUSH7 = 0x17,
    PUSH8 = 0x18,
    PUSH9 = 0x19,
    PUSH10 = 0x1A,
    PUSH11 = 0x1B,
    PUSH12 = 0x1C,
    PUSH13 = 0x1D,
    PUSH14 = 0x1E,
    PUSH15 = 0x1F,
    PUSH16 = 0x20,
    JMP = 0x22,
    JMPIF = 0x24,
    JMPIFNOT = 0x26,
    ABORT = 0x38,
    ASSERT = 0x39,
    RET = 0x40,
    SYSCALL = 0x41,
    DROP = 0x45,
    DUP = 0x4A,
    SWAP = 0x50,
    LDARG = 0x7F,
    CAT = 0x8B,
    EQUAL = 0x97,
    NOT = 0xAA,
    ADD = 0x9E,
    SUB = 0x9F,
    NUMEQUAL = 0xB3,
    LT = 0xB5,
    GE = 0xB8,
    PACK = 0xC0,
    PICKITEM = 0xCE,
}

impl OpCode {
    const ALL: [OpCode; 50] = [
        OpCode::PUSHINT8,
        OpCode::PUSHINT16,
        OpCode::PUSHINT32,
        OpCode::PUSHINT64,
        OpCode::PUSHINT128,
        OpCode::PUSHT,
        OpCode::PUSHF,
        OpCode::PUSHNULL,
        OpCode::PUSHDATA1,
        OpCode::PUSHDATA2,
        OpCode::PUSHDATA4,
        OpCode::PUSHM1,
        OpCode::PUSH0,
        OpCode::PUSH1,
        OpCode::PUSH2,
        OpCode::PUSH3,
        OpCode::PUSH4,
        OpCode::PUSH5,
        OpCode::PUSH6,
        OpCode::PUSH7,
        OpCode::PUSH8,
        OpCode::PUSH9,
        OpCode::PUSH10,
        OpCode::PUSH11,
        OpCode::PUSH12,
        OpCode::PUSH13,
        OpCode::PUSH14,
        OpCode::PUSH15,
        OpCode::PUSH16,
        OpCode::JMP,
        OpCode::JMPIF,
        OpCode::JMPIFNOT,
        OpCode::ABORT,
        OpCode::ASSERT,
        OpCode::RET,
        OpCode::SYSCALL,
        OpCode::DROP,
        OpCode::DUP,
        OpCode::SWAP,
        OpCode::LDARG,
        OpCode::CAT,
        OpCode::EQUAL,
        OpCode::NOT,
        OpCode::ADD,
        OpCode::SUB,
        OpCode::NUMEQUAL,
        OpCode::LT,
        OpCode::GE,
        OpCode::PACK,
        OpCode::PICKITEM,
    ];

    pub fn from_byte(byte: u8) -> Option<OpCode> {
        Self::ALL.iter().copied().find(|op| *op as u8 == byte)
    }

    /// Fixed operand width in bytes; `PUSHDATA*` add a length-prefixed payload on top
    pub fn operand_size(&self) -> usize {
        match self {
            OpCode::PUSHINT8 | OpCode::PUSHDATA1 | OpCode::LDARG => 1,
            OpCode::JMP | OpCode::JMPIF | OpCode::JMPIFNOT => 1,
            OpCode::PUSHINT16 | OpCode::PUSHDATA2 => 2,
            OpCode::PUSHINT32 | OpCode::PUSHDATA4 | OpCode::SYSCALL => 4,
            OpCode::PUSHINT64 => 8,
            OpCode::PUSHINT128 => 16,
            _ => 0,
        }
    }
}

/// Decoded instruction borrowing its operand from the script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction<'a> {
    pub opcode: OpCode,
    pub operand: &'a [u8],
    pub size: usize,
}

impl<'a> Instruction<'a> {
    /// Decode the instruction at `ip`; running off the end reads as `RET`
    pub fn decode(script: &'a [u8], ip: usize) -> Result<Instruction<'a>, ExecutionError> {
        let Some(&byte) = script.get(ip) else {
            return Ok(Instruction {
                opcode: OpCode::RET,
                operand: &[],
                size: 1,
            });
        };
        let opcode = OpCode::from_byte(byte)
            .ok_or_else(|| ExecutionError::InvalidInput(format!("invalid opcode 0x{:02x}", byte)))?;
        let fixed = opcode.operand_size();
        let fixed_end = ip + 1 + fixed;
        let header = script
            .get(ip + 1..fixed_end)
            .ok_or_else(|| ExecutionError::InvalidInput(format!("truncated {:?} at {}", opcode, ip)))?;

        let (operand, size) = match opcode {
            OpCode::PUSHDATA1 | OpCode::PUSHDATA2 | OpCode::PUSHDATA4 => {
                let mut len_bytes = [0u8; 4];
                len_bytes[..fixed].copy_from_slice(header);
                let len = u32::from_le_bytes(len_bytes) as usize;
                let data = script
                    .get(fixed_end..fixed_end + len)
                    .ok_or_else(|| ExecutionError::InvalidInput(format!("truncated push at {}", ip)))?;
                (data, 1 + fixed + len)
            }
            _ => (header, 1 + fixed),
        };
        Ok(Instruction {
            opcode,
            operand,
            size,
        })
    }
}

/// Interop services reachable through `SYSCALL`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Syscall {
    ContractCall,
    StorageGet,
    StoragePut,
    StorageDelete,
    StorageFind,
    RuntimeLog,
    RuntimeNotify,
    RuntimeGetTime,
    RuntimeCheckWitness,
}

impl Syscall {
    pub const ALL: [Syscall; 9] = [
        Syscall::ContractCall,
        Syscall::StorageGet,
        Syscall::StoragePut,
        Syscall::StorageDelete,
        Syscall::StorageFind,
        Syscall::RuntimeLog,
        Syscall::RuntimeNotify,
        Syscall::RuntimeGetTime,
        Syscall::RuntimeCheckWitness,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Syscall::ContractCall => "System.Contract.Call",
            Syscall::StorageGet => "System.Storage.Get",
            Syscall::StoragePut => "System.Storage.Put",
            Syscall::StorageDelete => "System.Storage.Delete",
            Syscall::StorageFind => "System.Storage.Find",
            Syscall::RuntimeLog => "System.Runtime.Log",
            Syscall::RuntimeNotify => "System.Runtime.Notify",
            Syscall::RuntimeGetTime => "System.Runtime.GetTime",
            Syscall::RuntimeCheckWitness => "System.Runtime.CheckWitness",
        }
    }

    /// First four bytes of SHA-256 of the service name, little-endian
    pub fn id(&self) -> u32 {
        let digest = Sha256::digest(self.name().as_bytes());
        u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
    }

    pub fn from_id(id: u32) -> Option<Syscall> {
        Self::ALL.iter().copied().find(|s| s.id() == id)
    }
}

/// Call flags passed to `System.Contract.Call`; the interpreter does not restrict on them
pub const CALL_FLAGS_ALL: i128 = 0x0F;

/// Incremental script assembler
#[derive(Debug, Default, Clone)]
pub struct ScriptBuilder {
    script: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, opcode: OpCode) -> &mut Self {
        self.script.push(opcode as u8);
        self
    }

    pub fn emit_with_operand(&mut self, opcode: OpCode, operand: &[u8]) -> &mut Self {
        self.script.push(opcode as u8);
        self.script.extend_from_slice(operand);
        self
    }

    pub fn emit_push_int(&mut self, value: i128) -> &mut Self {
        if (-1..=16).contains(&value) {
            let op = (OpCode::PUSH0 as i128 + value) as u8;
            self.script.push(op);
            return self;
        }
        let bytes = value.to_le_bytes();
        let (op, width) = if i8::try_from(value).is_ok() {
            (OpCode::PUSHINT8, 1)
        } else if i16::try_from(value).is_ok() {
            (OpCode::PUSHINT16, 2)
        } else if i32::try_from(value).is_ok() {
            (OpCode::PUSHINT32, 4)
        } else if i64::try_from(value).is_ok() {
            (OpCode::PUSHINT64, 8)
        } else {
            (OpCode::PUSHINT128, 16)
        };
        self.emit_with_operand(op, &bytes[..width])
    }

    pub fn emit_push_bool(&mut self, value: bool) -> &mut Self {
        self.emit(if value { OpCode::PUSHT } else { OpCode::PUSHF })
    }

    pub fn emit_push_bytes(&mut self, data: &[u8]) -> &mut Self {
        let len = data.len();
        if len <= u8::MAX as usize {
            self.emit_with_operand(OpCode::PUSHDATA1, &[len as u8]);
        } else if len <= u16::MAX as usize {
            self.emit_with_operand(OpCode::PUSHDATA2, &(len as u16).to_le_bytes());
        } else {
            self.emit_with_operand(OpCode::PUSHDATA4, &(len as u32).to_le_bytes());
        }
        self.script.extend_from_slice(data);
        self
    }

    pub fn emit_push_str(&mut self, value: &str) -> &mut Self {
        self.emit_push_bytes(value.as_bytes())
    }

    /// Push any pushable item; arrays are packed from their elements
    pub fn emit_push_item(&mut self, item: &StackItem) -> Result<&mut Self, ExecutionError> {
        match item {
            StackItem::Null => {
                self.emit(OpCode::PUSHNULL);
            }
            StackItem::Boolean(b) => {
                self.emit_push_bool(*b);
            }
            StackItem::Integer(i) => {
                self.emit_push_int(*i);
            }
            StackItem::ByteString(bytes) => {
                self.emit_push_bytes(bytes);
            }
            StackItem::Array(items) | StackItem::Struct(items) => {
                self.emit_pack(items)?;
            }
            other => {
                return Err(ExecutionError::InvalidInput(format!(
                    "{} cannot be pushed by a script",
                    other.type_name()
                )))
            }
        }
        Ok(self)
    }

    fn emit_pack(&mut self, items: &[StackItem]) -> Result<&mut Self, ExecutionError> {
        for item in items.iter().rev() {
            self.emit_push_item(item)?;
        }
        self.emit_push_int(items.len() as i128);
        Ok(self.emit(OpCode::PACK))
    }

    pub fn emit_syscall(&mut self, syscall: Syscall) -> &mut Self {
        self.emit_with_operand(OpCode::SYSCALL, &syscall.id().to_le_bytes())
    }

    /// `System.Contract.Call(hash, method, flags, args)`
    pub fn emit_dynamic_call(
        &mut self,
        contract: &Hash160,
        method: &str,
        args: &[StackItem],
    ) -> Result<&mut Self, ExecutionError> {
        self.emit_pack(args)?;
        self.emit_push_int(CALL_FLAGS_ALL);
        self.emit_push_str(method);
        self.emit_push_bytes(contract.as_bytes());
        Ok(self.emit_syscall(Syscall::ContractCall))
    }

    pub fn len(&self) -> usize {
        self.script.len()
    }

    pub fn is_empty(&self) -> bool {
        self.script.is_empty()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.script.clone()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.script
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_int_encodings() {
        let mut sb = ScriptBuilder::new();
        sb.emit_push_int(-1).emit_push_int(16).emit_push_int(100).emit_push_int(1_000_000);
        assert_eq!(
            sb.into_bytes(),
            vec![0x0F, 0x20, 0x00, 100, 0x02, 0x40, 0x42, 0x0F, 0x00]
        );
    }

    #[test]
    fn test_decode_walks_script() {
        let mut sb = ScriptBuilder::new();
        sb.emit_push_bytes(b"abc").emit_syscall(Syscall::RuntimeLog).emit(OpCode::RET);
        let script = sb.into_bytes();

        let first = Instruction::decode(&script, 0).unwrap();
        assert_eq!(first.opcode, OpCode::PUSHDATA1);
        assert_eq!(first.operand, b"abc");
        assert_eq!(first.size, 5);

        let second = Instruction::decode(&script, first.size).unwrap();
        assert_eq!(second.opcode, OpCode::SYSCALL);
        let id = u32::from_le_bytes(second.operand.try_into().unwrap());
        assert_eq!(Syscall::from_id(id), Some(Syscall::RuntimeLog));

        // Past the end reads as RET
        let end = Instruction::decode(&script, script.len()).unwrap();
        assert_eq!(end.opcode, OpCode::RET);
    }

    #[test]
    fn test_decode_rejects_truncated_push() {
        assert!(Instruction::decode(&[0x0C, 0x05, 0x01], 0).is_err());
        assert!(Instruction::decode(&[0xFF], 0).is_err());
    }

    #[test]
    fn test_syscall_ids_are_distinct() {
        let mut ids: Vec<u32> = Syscall::ALL.iter().map(Syscall::id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), Syscall::ALL.len());
    }

    #[test]
    fn test_dynamic_call_rejects_iterators() {
        let iter = StackItem::Iterator(crate::types::SharedIterator::new(std::iter::empty()));
        let mut sb = ScriptBuilder::new();
        assert!(sb.emit_dynamic_call(&Hash160::ZERO, "m", &[iter]).is_err());
    }
}
