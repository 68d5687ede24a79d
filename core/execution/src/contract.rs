// dryrun/core/execution/src/contract.rs

// Deployable contract artifacts and the on-chain contract record
use crate::types::{ExecutionError, StackItem};
use dryrun_storage::Hash160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Executable container: compiler tag, script and checksum.
///
/// Layout: `"NEF3"` magic, 64-byte zero padded compiler name, u32 LE script
/// length, script bytes, u32 LE checksum over everything before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NefFile {
    pub compiler: String,
    pub script: Vec<u8>,
    pub checksum: u32,
}

impl NefFile {
    pub const MAGIC: [u8; 4] = *b"NEF3";
    const COMPILER_LEN: usize = 64;
    const HEADER_LEN: usize = 4 + Self::COMPILER_LEN + 4;
    const MAX_SCRIPT_LEN: usize = 512 * 1024;

    pub fn new(compiler: &str, script: Vec<u8>) -> Result<Self, ExecutionError> {
        if compiler.len() > Self::COMPILER_LEN {
            return Err(ExecutionError::InvalidNef("compiler name too long".to_string()));
        }
        let mut nef = Self {
            compiler: compiler.to_string(),
            script,
            checksum: 0,
        };
        nef.checksum = Self::compute_checksum(&nef.body());
        Ok(nef)
    }

    /// First four bytes of the double SHA-256, little-endian
    pub fn compute_checksum(body: &[u8]) -> u32 {
        let hash = Sha256::digest(Sha256::digest(body));
        u32::from_le_bytes([hash[0], hash[1], hash[2], hash[3]])
    }

    fn body(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::HEADER_LEN + self.script.len());
        out.extend_from_slice(&Self::MAGIC);
        let mut compiler = [0u8; Self::COMPILER_LEN];
        compiler[..self.compiler.len()].copy_from_slice(self.compiler.as_bytes());
        out.extend_from_slice(&compiler);
        out.extend_from_slice(&(self.script.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.script);
        out
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.body();
        out.extend_from_slice(&self.checksum.to_le_bytes());
        out
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, ExecutionError> {
        let invalid = |reason: &str| ExecutionError::InvalidNef(reason.to_string());

        if bytes.len() < Self::HEADER_LEN + 4 {
            return Err(invalid("file too short"));
        }
        if bytes[..4] != Self::MAGIC {
            return Err(invalid("bad magic"));
        }
        let compiler_bytes = &bytes[4..4 + Self::COMPILER_LEN];
        let end = compiler_bytes.iter().position(|b| *b == 0).unwrap_or(Self::COMPILER_LEN);
        let compiler = std::str::from_utf8(&compiler_bytes[..end])
            .map_err(|_| invalid("compiler is not UTF-8"))?
            .to_string();

        let len_at = 4 + Self::COMPILER_LEN;
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&bytes[len_at..len_at + 4]);
        let script_len = u32::from_le_bytes(len_bytes) as usize;
        if script_len == 0 || script_len > Self::MAX_SCRIPT_LEN {
            return Err(invalid("script length out of range"));
        }
        if bytes.len() != Self::HEADER_LEN + script_len + 4 {
            return Err(invalid("length mismatch"));
        }
        let script = bytes[Self::HEADER_LEN..Self::HEADER_LEN + script_len].to_vec();

        let body_len = Self::HEADER_LEN + script_len;
        let mut checksum_bytes = [0u8; 4];
        checksum_bytes.copy_from_slice(&bytes[body_len..]);
        let checksum = u32::from_le_bytes(checksum_bytes);
        if checksum != Self::compute_checksum(&bytes[..body_len]) {
            return Err(invalid("checksum mismatch"));
        }

        Ok(Self {
            compiler,
            script,
            checksum,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,
    #[serde(rename = "returntype", default)]
    pub return_type: String,
    pub offset: usize,
    #[serde(default)]
    pub safe: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescriptor {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContractAbi {
    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
    #[serde(default)]
    pub events: Vec<EventDescriptor>,
}

/// Contract manifest; only the fields the sandbox inspects are typed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractManifest {
    pub name: String,
    #[serde(default)]
    pub abi: ContractAbi,
    #[serde(default)]
    pub permissions: Vec<serde_json::Value>,
    #[serde(default)]
    pub extra: Option<serde_json::Value>,
}

impl ContractManifest {
    pub fn new(name: &str, abi: ContractAbi) -> Self {
        Self {
            name: name.to_string(),
            abi,
            permissions: Vec::new(),
            extra: None,
        }
    }

    pub fn parse(json: &str) -> Result<Self, ExecutionError> {
        let manifest: ContractManifest =
            serde_json::from_str(json).map_err(|e| ExecutionError::InvalidManifest(e.to_string()))?;
        if manifest.name.trim().is_empty() {
            return Err(ExecutionError::InvalidManifest("name is empty".to_string()));
        }
        Ok(manifest)
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Method by name and argument count
    pub fn method(&self, name: &str, argc: usize) -> Option<&MethodDescriptor> {
        self.abi
            .methods
            .iter()
            .find(|m| m.name == name && m.parameters.len() == argc)
    }
}

/// Deployed contract as stored by ContractManagement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractState {
    pub id: i32,
    #[serde(rename = "updatecounter")]
    pub update_counter: u16,
    pub hash: Hash160,
    pub nef: NefFile,
    pub manifest: ContractManifest,
}

impl ContractState {
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ExecutionError> {
        serde_json::from_slice(bytes).map_err(|e| ExecutionError::CorruptedRecord(e.to_string()))
    }

    /// `[id, updatecounter, hash, nef, manifest]`
    pub fn to_stack_item(&self) -> StackItem {
        StackItem::Array(vec![
            StackItem::Integer(i128::from(self.id)),
            StackItem::Integer(i128::from(self.update_counter)),
            StackItem::from_hash(&self.hash),
            StackItem::ByteString(self.nef.to_bytes()),
            StackItem::from_str_utf8(&self.manifest.to_json_string()),
        ])
    }
}
