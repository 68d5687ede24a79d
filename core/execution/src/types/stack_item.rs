// dryrun/core/execution/src/types/stack_item.rs

use super::ExecutionError;
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use dryrun_storage::Hash160;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

/// Deepest nesting converted to JSON before giving up
pub const MAX_JSON_DEPTH: usize = 32;

type BoxedIter = Box<dyn Iterator<Item = StackItem> + Send>;

/// Iterator handle that can sit on the evaluation stack.
///
/// Clones share the same cursor, so draining one clone advances them all.
#[derive(Clone)]
pub struct SharedIterator(Arc<Mutex<BoxedIter>>);

impl SharedIterator {
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = StackItem> + Send + 'static,
    {
        Self(Arc::new(Mutex::new(Box::new(iter))))
    }

    pub fn next_item(&self) -> Option<StackItem> {
        self.0.lock().next()
    }

    fn ptr_eq(&self, other: &SharedIterator) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for SharedIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedIterator")
    }
}

/// Value on the evaluation stack
#[derive(Debug, Clone)]
pub enum StackItem {
    Null,
    Boolean(bool),
    Integer(i128),
    ByteString(Vec<u8>),
    Array(Vec<StackItem>),
    Struct(Vec<StackItem>),
    Map(Vec<(StackItem, StackItem)>),
    Iterator(SharedIterator),
}

impl StackItem {
    pub fn type_name(&self) -> &'static str {
        match self {
            StackItem::Null => "Any",
            StackItem::Boolean(_) => "Boolean",
            StackItem::Integer(_) => "Integer",
            StackItem::ByteString(_) => "ByteString",
            StackItem::Array(_) => "Array",
            StackItem::Struct(_) => "Struct",
            StackItem::Map(_) => "Map",
            StackItem::Iterator(_) => "InteropInterface",
        }
    }

    pub fn from_str_utf8(s: &str) -> Self {
        StackItem::ByteString(s.as_bytes().to_vec())
    }

    pub fn from_hash(hash: &Hash160) -> Self {
        StackItem::ByteString(hash.as_bytes().to_vec())
    }

    /// Truthiness as the interpreter sees it
    pub fn as_bool(&self) -> bool {
        match self {
            StackItem::Null => false,
            StackItem::Boolean(b) => *b,
            StackItem::Integer(i) => *i != 0,
            StackItem::ByteString(bytes) => bytes.iter().any(|b| *b != 0),
            _ => true,
        }
    }

    pub fn as_integer(&self) -> Option<i128> {
        match self {
            StackItem::Integer(i) => Some(*i),
            StackItem::Boolean(b) => Some(i128::from(*b)),
            StackItem::ByteString(bytes) => dryrun_storage::decode_integer(bytes).ok(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<Vec<u8>> {
        match self {
            StackItem::ByteString(bytes) => Some(bytes.clone()),
            StackItem::Integer(i) => Some(dryrun_storage::encode_integer(*i)),
            StackItem::Boolean(b) => Some(vec![u8::from(*b)]),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        self.as_bytes().and_then(|b| String::from_utf8(b).ok())
    }

    pub fn as_hash160(&self) -> Option<Hash160> {
        match self {
            StackItem::ByteString(bytes) => Hash160::from_slice(bytes).ok(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[StackItem]> {
        match self {
            StackItem::Array(items) | StackItem::Struct(items) => Some(items),
            _ => None,
        }
    }

    /// `{"type", "value"}` form of this item.
    ///
    /// Iterators are rendered as bare `InteropInterface` entries; draining them
    /// is left to the caller. Nesting beyond [`MAX_JSON_DEPTH`] is an error.
    pub fn to_json(&self) -> Result<Value, ExecutionError> {
        self.to_json_at(0)
    }

    fn to_json_at(&self, depth: usize) -> Result<Value, ExecutionError> {
        if depth > MAX_JSON_DEPTH {
            return Err(ExecutionError::InvalidOperation);
        }
        let value = match self {
            StackItem::Null | StackItem::Iterator(_) => return Ok(json!({ "type": self.type_name() })),
            StackItem::Boolean(b) => json!(b),
            StackItem::Integer(i) => json!(i.to_string()),
            StackItem::ByteString(bytes) => json!(B64.encode(bytes)),
            StackItem::Array(items) | StackItem::Struct(items) => {
                let items = items
                    .iter()
                    .map(|item| item.to_json_at(depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                Value::Array(items)
            }
            StackItem::Map(entries) => {
                let entries = entries
                    .iter()
                    .map(|(k, v)| {
                        Ok(json!({
                            "key": k.to_json_at(depth + 1)?,
                            "value": v.to_json_at(depth + 1)?,
                        }))
                    })
                    .collect::<Result<Vec<_>, ExecutionError>>()?;
                Value::Array(entries)
            }
        };
        Ok(json!({ "type": self.type_name(), "value": value }))
    }
}

impl PartialEq for StackItem {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (StackItem::Null, StackItem::Null) => true,
            (StackItem::Boolean(a), StackItem::Boolean(b)) => a == b,
            (StackItem::Integer(a), StackItem::Integer(b)) => a == b,
            (StackItem::ByteString(a), StackItem::ByteString(b)) => a == b,
            (StackItem::Array(a), StackItem::Array(b)) => a == b,
            (StackItem::Struct(a), StackItem::Struct(b)) => a == b,
            (StackItem::Map(a), StackItem::Map(b)) => a == b,
            (StackItem::Iterator(a), StackItem::Iterator(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for StackItem {
    fn from(value: bool) -> Self {
        StackItem::Boolean(value)
    }
}

impl From<i128> for StackItem {
    fn from(value: i128) -> Self {
        StackItem::Integer(value)
    }
}

impl From<i64> for StackItem {
    fn from(value: i64) -> Self {
        StackItem::Integer(i128::from(value))
    }
}

impl From<Vec<u8>> for StackItem {
    fn from(value: Vec<u8>) -> Self {
        StackItem::ByteString(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shapes() {
        assert_eq!(StackItem::Null.to_json().unwrap(), json!({"type": "Any"}));
        assert_eq!(
            StackItem::Integer(-5).to_json().unwrap(),
            json!({"type": "Integer", "value": "-5"})
        );
        assert_eq!(
            StackItem::ByteString(b"hi".to_vec()).to_json().unwrap(),
            json!({"type": "ByteString", "value": "aGk="})
        );
        let map = StackItem::Map(vec![(StackItem::Integer(1), StackItem::Boolean(true))]);
        assert_eq!(
            map.to_json().unwrap(),
            json!({"type": "Map", "value": [{
                "key": {"type": "Integer", "value": "1"},
                "value": {"type": "Boolean", "value": true}
            }]})
        );
    }

    #[test]
    fn test_too_deep_is_invalid_operation() {
        let mut item = StackItem::Null;
        for _ in 0..=MAX_JSON_DEPTH + 1 {
            item = StackItem::Array(vec![item]);
        }
        assert!(matches!(item.to_json(), Err(ExecutionError::InvalidOperation)));
    }

    #[test]
    fn test_shared_iterator_cursor() {
        let iter = SharedIterator::new(vec![StackItem::Integer(1), StackItem::Integer(2)].into_iter());
        let clone = iter.clone();
        assert_eq!(iter.next_item(), Some(StackItem::Integer(1)));
        assert_eq!(clone.next_item(), Some(StackItem::Integer(2)));
        assert_eq!(iter.next_item(), None);
        assert_eq!(StackItem::Iterator(iter.clone()), StackItem::Iterator(clone));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(StackItem::ByteString(vec![0x2a]).as_integer(), Some(42));
        assert_eq!(StackItem::Integer(256).as_bytes(), Some(vec![0x00, 0x01]));
        assert!(!StackItem::ByteString(vec![0, 0]).as_bool());
        assert_eq!(StackItem::from_str_utf8("abc").as_string().as_deref(), Some("abc"));
    }
}
