// dryrun/node/src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use dryrun_api::{MetricsServer, RpcServer};
use dryrun_execution::{SessionExecutor, Wallet};
use dryrun_vm::ReferenceEngine;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

mod config;
mod genesis;
pub mod logging;

use config::NodeConfig;

#[derive(Parser)]
#[command(name = "dryrun")]
#[command(about = "Session sandbox for running contract scripts off-chain")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "DRYRUN_CONFIG")]
    config: Option<PathBuf>,

    /// RPC listen address (e.g., 127.0.0.1:10332)
    #[arg(long, value_name = "ADDR")]
    rpc_addr: Option<String>,

    /// Disable RPC server
    #[arg(long)]
    no_rpc: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new ed25519 key for the wallet section
    Keygen,

    /// Print the effective configuration as TOML
    ShowConfig,
}

fn load_config(cli: &Cli) -> Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_file(path)?,
        None => NodeConfig::default(),
    };
    config.apply_env()?;

    // Override with CLI args
    if let Some(rpc_addr) = &cli.rpc_addr {
        config.rpc.server.listen_addr = rpc_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid RPC address: {}", e))?;
    }
    if cli.no_rpc {
        config.rpc.enabled = false;
    }

    config.validate().map_err(|e| anyhow::anyhow!(e))?;
    Ok(config)
}

fn generate_keypair() {
    let signing_key = dryrun_vm::wallet::generate_key();
    let verifying_key = signing_key.verifying_key();

    println!("New keypair generated:");
    println!("Private key: {}", hex::encode(signing_key.to_bytes()));
    println!("Public key:  {}", hex::encode(verifying_key.to_bytes()));
    println!("Account:     {}", dryrun_vm::wallet::account_of(&signing_key));
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Keygen) => {
            generate_keypair();
            return Ok(());
        }
        Some(Commands::ShowConfig) => {
            let config = load_config(&cli)?;
            print!("{}", config.to_toml()?);
            return Ok(());
        }
        None => {}
    }

    // Uses LOG_FORMAT env var (json, pretty, compact) and RUST_LOG for levels
    let log_config = logging::LogConfig::from_env();
    if let Err(e) = logging::init_logging(&log_config) {
        eprintln!("Warning: Failed to initialize structured logging: {}", e);
    }

    let config = load_config(&cli)?;
    start_node(config).await
}

async fn start_node(config: NodeConfig) -> Result<()> {
    let wallet = genesis::load_wallet(config.ledger.network, &config.wallet)?;
    let deployer = wallet.as_ref().and_then(|w| w.default_account());
    if let Some(account) = deployer {
        info!("Wallet loaded, deployer account {}", account);
    } else {
        warn!("No wallet configured: virtual deploys and transaction building are disabled");
    }

    let genesis_config = genesis::genesis_config(&config.ledger, deployer);
    let root = Arc::new(genesis::initialize_genesis_state(&genesis_config)?);

    let mut executor = SessionExecutor::new(root, Arc::new(ReferenceEngine::new()), config.execution.clone());
    if let Some(wallet) = wallet {
        executor = executor.with_wallet(Arc::new(wallet));
    }
    let executor = Arc::new(executor);
    info!(
        "Session executor ready (max_gas_invoke={}, max_iterator_result_items={})",
        config.execution.max_gas_invoke, config.execution.max_iterator_result_items
    );

    if config.metrics.enabled {
        let addr = config.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = MetricsServer::new(addr).start().await {
                warn!("Metrics server failed: {}", e);
            }
        });
        info!("Metrics server enabled at {}", addr);
    }

    let rpc = if config.rpc.enabled {
        let rpc_server = RpcServer::new(config.rpc.server.clone(), executor.clone());
        match rpc_server.spawn() {
            Ok(handles) => Some(handles),
            Err(e) => {
                error!("Failed to start RPC server: {}", e);
                return Err(e);
            }
        }
    } else {
        info!("RPC disabled");
        None
    };

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    if let Some((close_handle, join_handle)) = rpc {
        close_handle.close();
        tokio::task::spawn_blocking(move || {
            let _ = join_handle.join();
        })
        .await
        .ok();
    }
    let dropped = executor.list_sessions().len();
    info!("Discarded {} session(s)", dropped);

    Ok(())
}
