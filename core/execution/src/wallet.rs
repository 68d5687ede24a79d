// dryrun/core/execution/src/wallet.rs

// Transaction construction and signing collaborator
use crate::block::SyntheticBlock;
use crate::types::{Signer, SigningContext, Transaction};
use dryrun_storage::{Hash160, RootStore, Snapshot};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("No account available to pay for the transaction")]
    NoSender,

    #[error("Insufficient GAS: need {need}, have {have}")]
    InsufficientFunds { need: i128, have: i128 },

    #[error("Script faulted during fee estimation: {0}")]
    EstimationFailed(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Inputs for building a transaction around an already executed script
#[derive(Debug, Clone, Copy)]
pub struct TransactionRequest<'a> {
    pub script: &'a [u8],
    pub sender: Option<Hash160>,
    pub signers: &'a [Signer],
    pub system_fee: i64,
    pub max_gas: i64,
    pub block: Option<&'a SyntheticBlock>,
}

pub trait Wallet: Send + Sync {
    /// Account used as deployer and fallback sender
    fn default_account(&self) -> Option<Hash160>;

    fn make_transaction(
        &self,
        snapshot: &Snapshot<'_>,
        request: TransactionRequest<'_>,
    ) -> Result<Transaction, WalletError>;

    /// Add every witness this wallet can produce; returns whether any was added
    fn sign(&self, context: &mut SigningContext) -> bool;

    fn network_fee(&self, root: &dyn RootStore, tx: &Transaction) -> i64;

    fn network(&self) -> u32;
}
