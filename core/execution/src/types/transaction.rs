// dryrun/core/execution/src/types/transaction.rs

use super::ExecutionError;
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use dryrun_storage::{Hash160, Hash256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Scope flags limiting where a signer's witness is honoured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WitnessScope(u8);

impl WitnessScope {
    pub const NONE: WitnessScope = WitnessScope(0x00);
    pub const CALLED_BY_ENTRY: WitnessScope = WitnessScope(0x01);
    pub const CUSTOM_CONTRACTS: WitnessScope = WitnessScope(0x10);
    pub const CUSTOM_GROUPS: WitnessScope = WitnessScope(0x20);
    pub const WITNESS_RULES: WitnessScope = WitnessScope(0x40);
    pub const GLOBAL: WitnessScope = WitnessScope(0x80);

    const NAMES: [(&'static str, WitnessScope); 6] = [
        ("None", WitnessScope::NONE),
        ("CalledByEntry", WitnessScope::CALLED_BY_ENTRY),
        ("CustomContracts", WitnessScope::CUSTOM_CONTRACTS),
        ("CustomGroups", WitnessScope::CUSTOM_GROUPS),
        ("WitnessRules", WitnessScope::WITNESS_RULES),
        ("Global", WitnessScope::GLOBAL),
    ];

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: WitnessScope) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for WitnessScope {
    type Output = WitnessScope;

    fn bitor(self, rhs: Self) -> Self::Output {
        WitnessScope(self.0 | rhs.0)
    }
}

impl fmt::Display for WitnessScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("None");
        }
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
            .collect();
        f.write_str(&names.join(", "))
    }
}

impl FromStr for WitnessScope {
    type Err = ExecutionError;

    /// Accepts a single name or a comma separated list, e.g. `CalledByEntry, CustomContracts`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut scope = WitnessScope::NONE;
        for part in s.split(',').map(str::trim) {
            let flag = Self::NAMES
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(part))
                .map(|(_, flag)| *flag)
                .ok_or_else(|| ExecutionError::InvalidInput(format!("unknown witness scope '{}'", part)))?;
            scope = scope | flag;
        }
        if scope.contains(WitnessScope::GLOBAL) && scope != WitnessScope::GLOBAL {
            return Err(ExecutionError::InvalidInput(
                "Global scope cannot be combined with other scopes".to_string(),
            ));
        }
        Ok(scope)
    }
}

impl Serialize for WitnessScope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for WitnessScope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Account that authorizes a transaction, with the scope of its witness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    pub account: Hash160,
    pub scopes: WitnessScope,
    #[serde(rename = "allowedcontracts", default)]
    pub allowed_contracts: Vec<Hash160>,
    #[serde(rename = "allowedgroups", default)]
    pub allowed_groups: Vec<String>,
}

impl Signer {
    pub fn called_by_entry(account: Hash160) -> Self {
        Self {
            account,
            scopes: WitnessScope::CALLED_BY_ENTRY,
            allowed_contracts: Vec::new(),
            allowed_groups: Vec::new(),
        }
    }
}

/// Invocation and verification scripts proving a signer's consent
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Witness {
    pub invocation: Vec<u8>,
    pub verification: Vec<u8>,
}

impl Witness {
    pub fn to_json(&self) -> Value {
        json!({
            "invocation": B64.encode(&self.invocation),
            "verification": B64.encode(&self.verification),
        })
    }
}

/// Signers and witnesses an execution runs under.
///
/// Stands in for the container of a real transaction: the engine consults it
/// for witness checks and uses its hash as the container hash.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionContext {
    pub signers: Vec<Signer>,
    pub witnesses: Vec<Witness>,
}

impl TransactionContext {
    pub fn new(signers: Vec<Signer>, witnesses: Vec<Witness>) -> Self {
        Self { signers, witnesses }
    }

    /// First signer pays for the transaction
    pub fn sender(&self) -> Option<Hash160> {
        self.signers.first().map(|s| s.account)
    }

    pub fn hash(&self) -> Hash256 {
        Hash256::digest(&bincode::serialize(&self.signers).unwrap_or_default())
    }
}

/// Fully formed transaction produced by a wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u8,
    pub nonce: u32,
    pub system_fee: i64,
    pub network_fee: i64,
    pub valid_until_block: u32,
    pub signers: Vec<Signer>,
    pub script: Vec<u8>,
    pub witnesses: Vec<Witness>,
}

impl Transaction {
    /// Hash over every field except the witnesses
    pub fn hash(&self) -> Hash256 {
        let unsigned = (
            self.version,
            self.nonce,
            self.system_fee,
            self.network_fee,
            self.valid_until_block,
            &self.signers,
            &self.script,
        );
        Hash256::digest(&bincode::serialize(&unsigned).unwrap_or_default())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).unwrap_or_default()
    }

    pub fn size(&self) -> usize {
        self.to_bytes().len()
    }
}

/// A transaction waiting for its signers' witnesses
#[derive(Debug, Clone)]
pub struct SigningContext {
    pub network: u32,
    pub tx: Transaction,
    witnesses: BTreeMap<Hash160, Witness>,
}

impl SigningContext {
    pub fn new(tx: Transaction, network: u32) -> Self {
        Self {
            network,
            tx,
            witnesses: BTreeMap::new(),
        }
    }

    /// Bytes a signer signs: network magic followed by the transaction hash
    pub fn sign_data(&self) -> Vec<u8> {
        let mut data = self.network.to_le_bytes().to_vec();
        data.extend_from_slice(self.tx.hash().as_bytes());
        data
    }

    pub fn add_witness(&mut self, account: Hash160, witness: Witness) -> bool {
        if !self.tx.signers.iter().any(|s| s.account == account) {
            return false;
        }
        self.witnesses.insert(account, witness);
        true
    }

    pub fn completed(&self) -> bool {
        self.tx
            .signers
            .iter()
            .all(|s| self.witnesses.contains_key(&s.account))
    }

    /// Witnesses in signer order; `None` while incomplete
    pub fn witnesses(&self) -> Option<Vec<Witness>> {
        self.tx
            .signers
            .iter()
            .map(|s| self.witnesses.get(&s.account).cloned())
            .collect()
    }

    pub fn to_json(&self) -> Value {
        let items: serde_json::Map<String, Value> = self
            .tx
            .signers
            .iter()
            .map(|s| {
                let signed = self.witnesses.get(&s.account);
                (
                    s.account.to_hex(),
                    json!({
                        "signed": signed.is_some(),
                        "witness": signed.map(Witness::to_json),
                    }),
                )
            })
            .collect();
        json!({
            "type": "Transaction",
            "hash": self.tx.hash().to_hex(),
            "data": B64.encode(self.tx.to_bytes()),
            "network": self.network,
            "items": items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(signers: Vec<Signer>) -> Transaction {
        Transaction {
            version: 0,
            nonce: 7,
            system_fee: 100,
            network_fee: 0,
            valid_until_block: 10,
            signers,
            script: vec![0x40],
            witnesses: Vec::new(),
        }
    }

    #[test]
    fn test_scope_parsing() {
        let scope: WitnessScope = "CalledByEntry, CustomContracts".parse().unwrap();
        assert!(scope.contains(WitnessScope::CALLED_BY_ENTRY));
        assert!(scope.contains(WitnessScope::CUSTOM_CONTRACTS));
        assert!(!scope.contains(WitnessScope::GLOBAL));
        assert_eq!(scope.to_string(), "CalledByEntry, CustomContracts");

        assert_eq!("global".parse::<WitnessScope>().unwrap(), WitnessScope::GLOBAL);
        assert!("Global, CalledByEntry".parse::<WitnessScope>().is_err());
        assert!("Everything".parse::<WitnessScope>().is_err());
    }

    #[test]
    fn test_context_hash_depends_on_signers() {
        let a = TransactionContext::new(vec![Signer::called_by_entry(Hash160([1; 20]))], vec![]);
        let b = TransactionContext::new(vec![Signer::called_by_entry(Hash160([2; 20]))], vec![]);
        assert_eq!(a.hash(), a.clone().hash());
        assert_ne!(a.hash(), b.hash());
        assert_eq!(a.sender(), Some(Hash160([1; 20])));
    }

    #[test]
    fn test_tx_hash_ignores_witnesses() {
        let mut t = tx(vec![Signer::called_by_entry(Hash160([1; 20]))]);
        let before = t.hash();
        t.witnesses.push(Witness::default());
        assert_eq!(t.hash(), before);
    }

    #[test]
    fn test_signing_context_completion() {
        let first = Hash160([1; 20]);
        let second = Hash160([2; 20]);
        let mut ctx = SigningContext::new(
            tx(vec![Signer::called_by_entry(first), Signer::called_by_entry(second)]),
            42,
        );
        assert!(!ctx.completed());
        assert!(ctx.add_witness(first, Witness::default()));
        assert!(!ctx.add_witness(Hash160([9; 20]), Witness::default()));
        assert!(ctx.witnesses().is_none());
        assert_eq!(ctx.to_json()["items"][second.to_hex()]["signed"], json!(false));

        ctx.add_witness(second, Witness::default());
        assert!(ctx.completed());
        assert_eq!(ctx.witnesses().unwrap().len(), 2);
    }
}
