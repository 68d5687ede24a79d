// dryrun/node/src/config.rs

use dryrun_api::RpcConfig;
use dryrun_execution::ExecutionConfig;
use dryrun_storage::Hash160;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Node configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// RPC configuration
    pub rpc: RpcSection,

    /// Limits applied to every session execution
    pub execution: ExecutionConfig,

    /// Canonical ledger the sessions start from
    pub ledger: LedgerConfig,

    /// Signing keys for transaction building and virtual deploys
    pub wallet: WalletConfig,

    /// Prometheus endpoint
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcSection {
    /// RPC enabled
    pub enabled: bool,

    #[serde(flatten)]
    pub server: RpcConfig,
}

impl Default for RpcSection {
    fn default() -> Self {
        Self {
            enabled: true,
            server: RpcConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Network magic
    pub network: u32,

    /// Genesis head timestamp in milliseconds
    pub genesis_timestamp: u64,

    /// Initial NEO holder; the first wallet account when unset
    pub neo_holder: Option<Hash160>,

    /// Initial GAS holder; the first wallet account when unset
    pub gas_holder: Option<Hash160>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        let genesis = dryrun_vm::GenesisConfig::default();
        Self {
            network: genesis.network,
            genesis_timestamp: genesis.timestamp,
            neo_holder: None,
            gas_holder: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Hex encoded ed25519 secret keys; the first one deploys contracts
    pub keys: Vec<String>,

    /// Generate a throwaway key when no keys are configured
    pub ephemeral: bool,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            ephemeral: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 9100)),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl NodeConfig {
    /// Load from file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
        let config: NodeConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply `DRYRUN_*` overrides from the process environment
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `DRYRUN_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("DRYRUN_RPC_ADDR") {
            self.rpc.server.listen_addr = addr
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid DRYRUN_RPC_ADDR: {}", e))?;
        }
        if let Some(enabled) = lookup("DRYRUN_RPC") {
            self.rpc.enabled = parse_flag(&enabled);
        }
        if let Some(network) = lookup("DRYRUN_NETWORK") {
            self.ledger.network = network
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid DRYRUN_NETWORK: {}", e))?;
        }
        if let Some(gas) = lookup("DRYRUN_MAX_GAS_INVOKE") {
            self.execution.max_gas_invoke = gas
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid DRYRUN_MAX_GAS_INVOKE: {}", e))?;
        }
        if let Some(keys) = lookup("DRYRUN_WALLET_KEYS") {
            self.wallet.keys = keys
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(enabled) = lookup("DRYRUN_METRICS") {
            self.metrics.enabled = parse_flag(&enabled);
        }
        if let Some(addr) = lookup("DRYRUN_METRICS_ADDR") {
            self.metrics.listen_addr = addr
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid DRYRUN_METRICS_ADDR: {}", e))?;
        }
        Ok(())
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.rpc.server.threads == 0 {
            return Err("rpc.threads must be at least 1".to_string());
        }
        if self.execution.max_gas_invoke <= 0 {
            return Err("execution.max_gas_invoke must be positive".to_string());
        }
        if self.execution.max_iterator_result_items == 0 {
            return Err("execution.max_iterator_result_items must be at least 1".to_string());
        }
        if self.rpc.enabled && self.metrics.enabled && self.rpc.server.listen_addr == self.metrics.listen_addr {
            return Err(format!(
                "rpc and metrics cannot share {}",
                self.metrics.listen_addr
            ));
        }
        for (index, key) in self.wallet.keys.iter().enumerate() {
            dryrun_vm::wallet::parse_secret(key).map_err(|e| format!("wallet.keys[{}]: {}", index, e))?;
        }
        Ok(())
    }
}
