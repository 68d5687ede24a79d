// dryrun/node/src/genesis.rs

use crate::config::{LedgerConfig, WalletConfig};
use dryrun_storage::{Hash160, MemoryStore, RootStore};
use dryrun_vm::{build_genesis, GenesisConfig, KeyWallet};
use tracing::{info, warn};

/// Build the signing wallet, generating a throwaway key when allowed
pub fn load_wallet(network: u32, config: &WalletConfig) -> anyhow::Result<Option<KeyWallet>> {
    if !config.keys.is_empty() {
        let wallet = KeyWallet::from_secret_hex(network, &config.keys)
            .map_err(|e| anyhow::anyhow!("Invalid wallet key: {}", e))?;
        return Ok(Some(wallet));
    }
    if config.ephemeral {
        let wallet = KeyWallet::generate(network);
        warn!("No wallet keys configured, using an ephemeral key");
        return Ok(Some(wallet));
    }
    Ok(None)
}

/// Genesis parameters, with unset holders falling back to `default_holder`
pub fn genesis_config(ledger: &LedgerConfig, default_holder: Option<Hash160>) -> GenesisConfig {
    GenesisConfig {
        network: ledger.network,
        timestamp: ledger.genesis_timestamp,
        neo_holder: ledger.neo_holder.or(default_holder),
        gas_holder: ledger.gas_holder.or(default_holder),
        ..GenesisConfig::default()
    }
}

/// Create the canonical root store every session layers on
pub fn initialize_genesis_state(config: &GenesisConfig) -> anyhow::Result<MemoryStore> {
    let store = build_genesis(config)?;
    info!(
        "Genesis ready: network={:#x}, head={}, height={}",
        config.network,
        store.head_hash(),
        store.height()
    );
    if let Some(holder) = config.neo_holder {
        info!("NEO supply held by {}", holder);
    }
    if let Some(holder) = config.gas_holder {
        info!("GAS supply held by {}", holder);
    }
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dryrun_execution::Wallet;

    #[test]
    fn test_holders_default_to_wallet_account() {
        let wallet = load_wallet(5, &WalletConfig::default()).unwrap().unwrap();
        let account = wallet.default_account();
        let ledger = LedgerConfig {
            gas_holder: Some(Hash160([2; 20])),
            ..LedgerConfig::default()
        };
        let config = genesis_config(&ledger, account);
        assert_eq!(config.neo_holder, account);
        assert_eq!(config.gas_holder, Some(Hash160([2; 20])));
        assert_eq!(config.network, ledger.network);
    }

    #[test]
    fn test_wallet_modes() {
        let none = WalletConfig {
            keys: vec![],
            ephemeral: false,
        };
        assert!(load_wallet(5, &none).unwrap().is_none());

        let keyed = WalletConfig {
            keys: vec!["11".repeat(32)],
            ephemeral: false,
        };
        let wallet = load_wallet(5, &keyed).unwrap().unwrap();
        assert_eq!(wallet.accounts().len(), 1);

        let bad = WalletConfig {
            keys: vec!["zz".to_string()],
            ephemeral: true,
        };
        assert!(load_wallet(5, &bad).is_err());
    }

    #[test]
    fn test_genesis_state_is_deterministic() {
        let config = genesis_config(&LedgerConfig::default(), Some(Hash160([1; 20])));
        let a = initialize_genesis_state(&config).unwrap();
        let b = initialize_genesis_state(&config).unwrap();
        assert_eq!(a.head_hash(), b.head_hash());
        assert_eq!(a.len(), b.len());
    }
}
