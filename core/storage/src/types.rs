// dryrun/core/storage/src/types.rs

// Hash and storage key types shared by every layer of the sandbox
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::StorageError;

/// 20-byte script hash identifying a contract or an account
#[derive(Clone, Copy, Default, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Hash160(pub [u8; 20]);

impl Hash160 {
    pub const ZERO: Hash160 = Hash160([0u8; 20]);

    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Build from a slice, rejecting anything that is not exactly 20 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, StorageError> {
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| StorageError::InvalidLength {
                expected: 20,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// Derive a script hash from arbitrary data (last 20 bytes of Keccak256)
    pub fn digest(data: &[u8]) -> Self {
        use sha3::{Digest, Keccak256};
        let mut hasher = Keccak256::default();
        hasher.update(data);
        let hash = hasher.finalize();

        let mut out = [0u8; 20];
        out.copy_from_slice(&hash[12..32]);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Hash160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash160({})", self)
    }
}

impl FromStr for Hash160 {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let trimmed = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes = hex::decode(trimmed).map_err(|_| StorageError::InvalidHash(s.to_string()))?;
        Self::from_slice(&bytes).map_err(|_| StorageError::InvalidHash(s.to_string()))
    }
}

impl Serialize for Hash160 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash160 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 32-byte hash for blocks and transactions
#[derive(Clone, Copy, Default, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub const ZERO: Hash256 = Hash256([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// SHA-256 of the given data
    pub fn digest(data: &[u8]) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self)
    }
}

impl FromStr for Hash256 {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches("0x");
        let bytes = hex::decode(trimmed).map_err(|_| StorageError::InvalidHash(s.to_string()))?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| StorageError::InvalidHash(s.to_string()))?;
        Ok(Self(arr))
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identity of a storage slot: the owning contract's id plus the raw key.
///
/// Ordering is by contract id first and then lexicographic on the key, so a
/// range starting at `(id, prefix)` visits every key with that prefix
/// contiguously.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct StorageKey {
    pub id: i32,
    pub key: Vec<u8>,
}

impl StorageKey {
    pub fn new(id: i32, key: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            key: key.into(),
        }
    }

    /// Key made of a one-byte prefix followed by arbitrary bytes
    pub fn with_prefix(id: i32, prefix: u8, rest: &[u8]) -> Self {
        let mut key = Vec::with_capacity(1 + rest.len());
        key.push(prefix);
        key.extend_from_slice(rest);
        Self { id, key }
    }

    /// Whether this key belongs to `id` and starts with `prefix`
    pub fn matches(&self, id: i32, prefix: &[u8]) -> bool {
        self.id == id && self.key.starts_with(prefix)
    }

    /// Flat form: little-endian contract id followed by the key
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(4 + self.key.len());
        bytes.extend_from_slice(&self.id.to_le_bytes());
        bytes.extend_from_slice(&self.key);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash160_parse_roundtrip() {
        let hash = Hash160([0xab; 20]);
        let parsed: Hash160 = hash.to_string().parse().unwrap();
        assert_eq!(parsed, hash);

        // Prefix is optional
        let bare: Hash160 = hex::encode([0xab; 20]).parse().unwrap();
        assert_eq!(bare, hash);
    }

    #[test]
    fn test_hash160_rejects_bad_input() {
        assert!("0x1234".parse::<Hash160>().is_err());
        assert!("not-hex".parse::<Hash160>().is_err());
        assert!(format!("0x{}", "zz".repeat(20)).parse::<Hash160>().is_err());
    }

    #[test]
    fn test_hash160_json_is_string() {
        let hash = Hash160([1; 20]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "01".repeat(20)));
        let back: Hash160 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }

    #[test]
    fn test_storage_key_ordering_groups_prefix() {
        let a = StorageKey::new(1, b"ab".to_vec());
        let b = StorageKey::new(1, b"b".to_vec());
        let c = StorageKey::new(2, b"a".to_vec());
        assert!(a < b);
        assert!(b < c);
        assert!(a.matches(1, b"a"));
        assert_eq!(StorageKey::new(-5, vec![0x14]).to_bytes(), vec![0xfb, 0xff, 0xff, 0xff, 0x14]);
        assert!(!c.matches(1, b"a"));
    }

    #[test]
    fn test_digest_is_deterministic() {
        assert_eq!(Hash160::digest(b"x"), Hash160::digest(b"x"));
        assert_ne!(Hash160::digest(b"x"), Hash160::digest(b"y"));
        assert_eq!(Hash256::digest(b"abc"), Hash256::digest(b"abc"));
    }
}
