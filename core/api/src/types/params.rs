// dryrun/core/api/src/types/params.rs

// Positional parameter readers for the session methods
use super::error::ApiError;
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use dryrun_execution::{Signer, StackItem, TransactionContext, Witness, WitnessScope};
use dryrun_storage::Hash160;
use jsonrpc_core::{Params, Value};

/// Deepest nesting accepted for `Array` arguments
const MAX_PARAMETER_DEPTH: usize = 16;

/// Positional params of one request
pub struct ParamList(Vec<Value>);

impl ParamList {
    pub fn parse(params: Params) -> Result<Self, ApiError> {
        match params {
            Params::None => Ok(Self(Vec::new())),
            params => params
                .parse::<Vec<Value>>()
                .map(Self)
                .map_err(|e| ApiError::invalid(e.message)),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    fn required(&self, index: usize, name: &str) -> Result<&Value, ApiError> {
        self.0
            .get(index)
            .ok_or_else(|| ApiError::invalid(format!("missing parameter {} ({})", index, name)))
    }

    pub fn optional(&self, index: usize) -> Option<&Value> {
        self.0.get(index).filter(|v| !v.is_null())
    }

    pub fn string(&self, index: usize, name: &str) -> Result<&str, ApiError> {
        self.required(index, name)?
            .as_str()
            .ok_or_else(|| ApiError::invalid(format!("{} must be a string", name)))
    }

    pub fn boolean(&self, index: usize, name: &str) -> Result<bool, ApiError> {
        match self.required(index, name)? {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => parse_bool(s).ok_or_else(|| ApiError::invalid(format!("{} must be a boolean", name))),
            _ => Err(ApiError::invalid(format!("{} must be a boolean", name))),
        }
    }

    pub fn hash(&self, index: usize, name: &str) -> Result<Hash160, ApiError> {
        parse_hash(self.string(index, name)?)
    }

    pub fn base64(&self, index: usize, name: &str) -> Result<Vec<u8>, ApiError> {
        decode_base64(self.string(index, name)?)
    }

    /// Unsigned integer given either as a JSON number or a decimal string
    pub fn unsigned(&self, index: usize, name: &str) -> Result<u64, ApiError> {
        parse_unsigned(self.required(index, name)?, name)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

pub fn parse_hash(s: &str) -> Result<Hash160, ApiError> {
    s.parse::<Hash160>().map_err(|e| ApiError::invalid(e.to_string()))
}

pub fn decode_base64(s: &str) -> Result<Vec<u8>, ApiError> {
    B64.decode(s.trim())
        .map_err(|e| ApiError::invalid(format!("invalid base64 '{}': {}", s, e)))
}

pub fn parse_unsigned(value: &Value, name: &str) -> Result<u64, ApiError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| ApiError::invalid(format!("{} must be a non-negative integer", name))),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| ApiError::invalid(format!("{} must be a non-negative integer, got '{}'", name, s))),
        _ => Err(ApiError::invalid(format!("{} must be an integer", name))),
    }
}

/// Storage prefix of a third-party token balance, `"1"` when absent
pub fn parse_prefix(value: Option<&Value>) -> Result<Option<u8>, ApiError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let prefix = parse_unsigned(value, "prefix")?;
    u8::try_from(prefix)
        .map(Some)
        .map_err(|_| ApiError::invalid(format!("prefix must fit in one byte, got {}", prefix)))
}

/// Convert a `{"type", "value"}` contract parameter into a stack item
pub fn parse_contract_parameter(value: &Value) -> Result<StackItem, ApiError> {
    parameter_at(value, 0)
}

fn parameter_at(value: &Value, depth: usize) -> Result<StackItem, ApiError> {
    if depth > MAX_PARAMETER_DEPTH {
        return Err(ApiError::invalid("contract parameter nested too deeply"));
    }
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::invalid("contract parameter requires a string 'type'"))?;
    let inner = value.get("value").filter(|v| !v.is_null());
    let text = || {
        inner
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::invalid(format!("{} parameter requires a string value", kind)))
    };

    let item = match kind {
        "Any" => StackItem::Null,
        "Boolean" => match inner {
            Some(Value::Bool(b)) => StackItem::Boolean(*b),
            Some(Value::String(s)) => StackItem::Boolean(
                parse_bool(s).ok_or_else(|| ApiError::invalid(format!("invalid Boolean '{}'", s)))?,
            ),
            _ => return Err(ApiError::invalid("Boolean parameter requires a boolean value")),
        },
        "Integer" => match inner {
            Some(Value::Number(n)) => n
                .as_i64()
                .map(|i| StackItem::Integer(i128::from(i)))
                .ok_or_else(|| ApiError::invalid(format!("invalid Integer {}", n)))?,
            Some(Value::String(s)) => StackItem::Integer(
                s.trim()
                    .parse::<i128>()
                    .map_err(|_| ApiError::invalid(format!("invalid Integer '{}'", s)))?,
            ),
            _ => return Err(ApiError::invalid("Integer parameter requires a value")),
        },
        "ByteArray" | "Signature" => StackItem::ByteString(decode_base64(text()?)?),
        "String" => StackItem::from_str_utf8(text()?),
        "Hash160" => StackItem::from_hash(&parse_hash(text()?)?),
        "PublicKey" => {
            let s = text()?;
            let bytes = hex::decode(s.trim().trim_start_matches("0x"))
                .map_err(|_| ApiError::invalid(format!("invalid PublicKey '{}'", s)))?;
            StackItem::ByteString(bytes)
        }
        "Array" => {
            let items = match inner {
                Some(Value::Array(items)) => items,
                None => return Ok(StackItem::Array(Vec::new())),
                _ => return Err(ApiError::invalid("Array parameter requires an array value")),
            };
            let items = items
                .iter()
                .map(|item| parameter_at(item, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            StackItem::Array(items)
        }
        other => return Err(ApiError::invalid(format!("unsupported parameter type '{}'", other))),
    };
    Ok(item)
}

pub fn parse_arguments(value: Option<&Value>) -> Result<Vec<StackItem>, ApiError> {
    match value {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().map(parse_contract_parameter).collect(),
        Some(_) => Err(ApiError::invalid("args must be an array of contract parameters")),
    }
}

fn hash_list(signer: &Value, field: &str) -> Result<Vec<Hash160>, ApiError> {
    match signer.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .ok_or_else(|| ApiError::invalid(format!("{} entries must be strings", field)))
                    .and_then(parse_hash)
            })
            .collect(),
        Some(_) => Err(ApiError::invalid(format!("{} must be an array", field))),
    }
}

fn group_list(signer: &Value) -> Result<Vec<String>, ApiError> {
    match signer.get("allowedgroups") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                let key = v
                    .as_str()
                    .ok_or_else(|| ApiError::invalid("allowedgroups entries must be strings"))?;
                hex::decode(key.trim_start_matches("0x"))
                    .map_err(|_| ApiError::invalid(format!("invalid group key '{}'", key)))?;
                Ok(key.to_string())
            })
            .collect(),
        Some(_) => Err(ApiError::invalid("allowedgroups must be an array")),
    }
}

fn optional_script(signer: &Value, field: &str) -> Result<Option<Vec<u8>>, ApiError> {
    match signer.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => decode_base64(s).map(Some),
        Some(_) => Err(ApiError::invalid(format!("{} must be a base64 string", field))),
    }
}

/// Signers plus the witnesses of those entries carrying an invocation or verification script
pub fn parse_signers(value: &Value) -> Result<TransactionContext, ApiError> {
    let entries = value
        .as_array()
        .ok_or_else(|| ApiError::invalid("signers must be an array"))?;

    let mut signers = Vec::with_capacity(entries.len());
    let mut witnesses = Vec::new();
    for entry in entries {
        let account = entry
            .get("account")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::invalid("signer requires an 'account'"))
            .and_then(parse_hash)?;
        let scopes = entry
            .get("scopes")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::invalid("signer requires 'scopes'"))?
            .parse::<WitnessScope>()?;
        signers.push(Signer {
            account,
            scopes,
            allowed_contracts: hash_list(entry, "allowedcontracts")?,
            allowed_groups: group_list(entry)?,
        });

        let invocation = optional_script(entry, "invocation")?;
        let verification = optional_script(entry, "verification")?;
        if invocation.is_some() || verification.is_some() {
            witnesses.push(Witness {
                invocation: invocation.unwrap_or_default(),
                verification: verification.unwrap_or_default(),
            });
        }
    }
    Ok(TransactionContext::new(signers, witnesses))
}
