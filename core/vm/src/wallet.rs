// dryrun/core/vm/src/wallet.rs

// In-memory ed25519 wallet
use crate::gas::EXEC_FEE_FACTOR;
use dryrun_execution::native::{self, AccountState};
use dryrun_execution::{Signer, SigningContext, Transaction, TransactionRequest, Wallet, WalletError, Witness};
use dryrun_storage::{Hash160, RootStore, Snapshot};
use ed25519_dalek::{Signer as _, SigningKey};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;

/// Blocks a built transaction stays valid for
pub const MAX_VALID_UNTIL_BLOCK_INCREMENT: u32 = 5760;
/// Network fee per byte of transaction
pub const FEE_PER_BYTE: i64 = 1000;
/// Verification cost of one signature
pub const SIGNATURE_VERIFY_PRICE: i64 = (1 << 15) * EXEC_FEE_FACTOR;

const PUSHDATA1: u8 = 0x0C;

/// Script hash of an ed25519 public key
pub fn account_of(key: &SigningKey) -> Hash160 {
    Hash160::digest(key.verifying_key().as_bytes())
}

#[derive(Debug, Clone)]
pub struct KeyWallet {
    keys: Vec<SigningKey>,
    network: u32,
}

impl KeyWallet {
    pub fn new(network: u32) -> Self {
        Self {
            keys: Vec::new(),
            network,
        }
    }

    /// Wallet holding one freshly generated key
    pub fn generate(network: u32) -> Self {
        let mut wallet = Self::new(network);
        wallet.add_key(generate_key());
        wallet
    }

    pub fn from_secret_hex(network: u32, secrets: &[String]) -> Result<Self, WalletError> {
        let mut wallet = Self::new(network);
        for secret in secrets {
            wallet.add_key(parse_secret(secret)?);
        }
        Ok(wallet)
    }

    pub fn add_key(&mut self, key: SigningKey) -> Hash160 {
        let account = account_of(&key);
        self.keys.push(key);
        account
    }

    pub fn accounts(&self) -> Vec<Hash160> {
        self.keys.iter().map(account_of).collect()
    }

    fn key_for(&self, account: &Hash160) -> Option<&SigningKey> {
        self.keys.iter().find(|k| account_of(k) == *account)
    }
}

pub fn generate_key() -> SigningKey {
    let mut secret = [0u8; 32];
    OsRng.fill_bytes(&mut secret);
    SigningKey::from_bytes(&secret)
}

pub fn parse_secret(secret: &str) -> Result<SigningKey, WalletError> {
    let trimmed = secret.trim().trim_start_matches("0x");
    let bytes = hex::decode(trimmed).map_err(|e| WalletError::InvalidKey(e.to_string()))?;
    let secret: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| WalletError::InvalidKey(format!("expected 32 bytes, got {}", bytes.len())))?;
    Ok(SigningKey::from_bytes(&secret))
}

fn push_data(data: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(2 + data.len());
    script.push(PUSHDATA1);
    script.push(data.len() as u8);
    script.extend_from_slice(data);
    script
}

impl Wallet for KeyWallet {
    fn default_account(&self) -> Option<Hash160> {
        self.keys.first().map(account_of)
    }

    fn make_transaction(
        &self,
        snapshot: &Snapshot<'_>,
        request: TransactionRequest<'_>,
    ) -> Result<Transaction, WalletError> {
        let sender = request
            .sender
            .or_else(|| self.default_account())
            .ok_or(WalletError::NoSender)?;
        if request.system_fee > request.max_gas {
            return Err(WalletError::EstimationFailed(format!(
                "system fee {} exceeds the limit {}",
                request.system_fee, request.max_gas
            )));
        }

        let mut signers = request.signers.to_vec();
        if signers.is_empty() {
            signers.push(Signer::called_by_entry(sender));
        }
        let current = request
            .block
            .map(|b| b.index)
            .unwrap_or_else(|| snapshot.root_height());

        let mut tx = Transaction {
            version: 0,
            nonce: OsRng.next_u32(),
            system_fee: request.system_fee,
            network_fee: 0,
            valid_until_block: current.saturating_add(MAX_VALID_UNTIL_BLOCK_INCREMENT),
            signers,
            script: request.script.to_vec(),
            witnesses: Vec::new(),
        };
        tx.network_fee = self.network_fee(snapshot.root().as_ref(), &tx);

        let need = i128::from(tx.system_fee) + i128::from(tx.network_fee);
        let have = native::read_balance::<AccountState>(snapshot, native::GAS_ID, &sender)
            .map_err(|e| WalletError::EstimationFailed(e.to_string()))?;
        if have < need {
            return Err(WalletError::InsufficientFunds { need, have });
        }
        Ok(tx)
    }

    fn sign(&self, context: &mut SigningContext) -> bool {
        let data = context.sign_data();
        let accounts: Vec<Hash160> = context.tx.signers.iter().map(|s| s.account).collect();
        let mut signed = false;
        for account in accounts {
            let Some(key) = self.key_for(&account) else {
                continue;
            };
            let signature = key.sign(&data);
            let witness = Witness {
                invocation: push_data(&signature.to_bytes()),
                verification: push_data(key.verifying_key().as_bytes()),
            };
            signed |= context.add_witness(account, witness);
        }
        debug!("Signed transaction {}: complete={}", context.tx.hash(), context.completed());
        signed
    }

    fn network_fee(&self, _root: &dyn RootStore, tx: &Transaction) -> i64 {
        let witnesses = tx.signers.len() as i64;
        // Account for the witness bytes a signed transaction carries
        let size = tx.size() as i64 + witnesses * (2 + 64 + 2 + 32);
        size * FEE_PER_BYTE + witnesses * SIGNATURE_VERIFY_PRICE
    }

    fn network(&self) -> u32 {
        self.network
    }
}
