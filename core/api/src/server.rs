// dryrun/core/api/src/server.rs

use crate::session_rpc;
use anyhow::Result;
use dryrun_execution::SessionExecutor;
use jsonrpc_core::IoHandler;
use jsonrpc_http_server::CloseHandle;
use jsonrpc_http_server::{AccessControlAllowOrigin, DomainsValidation, ServerBuilder};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// RPC server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub listen_addr: SocketAddr,
    pub threads: usize,
    pub max_request_body_size: usize,
    pub cors_domains: Vec<String>,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 10332)),
            threads: 4,
            max_request_body_size: 10 * 1024 * 1024,
            cors_domains: vec!["*".to_string()],
        }
    }
}

fn cors_policy(domains: &[String]) -> Option<DomainsValidation<AccessControlAllowOrigin>> {
    if domains.is_empty() {
        return None;
    }
    // "*" maps to Any, everything else to an exact origin
    Some(DomainsValidation::AllowOnly(
        domains.iter().map(|d| AccessControlAllowOrigin::from(d.as_str())).collect(),
    ))
}

/// RPC Server
pub struct RpcServer {
    config: RpcConfig,
    io_handler: IoHandler,
}

impl RpcServer {
    pub fn new(config: RpcConfig, executor: Arc<SessionExecutor>) -> Self {
        let mut io_handler = IoHandler::new();
        session_rpc::register_session_methods(&mut io_handler, executor);
        Self { config, io_handler }
    }

    pub fn io_handler(&self) -> &IoHandler {
        &self.io_handler
    }

    /// Start the HTTP server on its own thread.
    ///
    /// Returns once the listener is bound, or with the bind error.
    pub fn spawn(self) -> Result<(CloseHandle, std::thread::JoinHandle<()>)> {
        let listen_addr = self.config.listen_addr;
        let threads = self.config.threads.max(1);
        let max_body = self.config.max_request_body_size;
        let cors = cors_policy(&self.config.cors_domains);
        let io = self.io_handler;

        // Channel to report startup result (CloseHandle or error string)
        let (result_tx, result_rx) = std::sync::mpsc::sync_channel::<Result<CloseHandle, String>>(1);

        let join_handle = std::thread::spawn(move || {
            let mut builder = ServerBuilder::new(io);
            if let Some(cors) = cors {
                builder = builder.cors(cors);
            }
            match builder
                .max_request_body_size(max_body)
                .threads(threads)
                .start_http(&listen_addr)
            {
                Ok(server) => {
                    info!("RPC server listening on {}", listen_addr);
                    let _ = result_tx.send(Ok(server.close_handle()));
                    server.wait();
                }
                Err(e) => {
                    let _ = result_tx.send(Err(format!(
                        "Failed to start RPC server on {}: {}",
                        listen_addr, e
                    )));
                }
            }
        });

        match result_rx.recv() {
            Ok(Ok(close)) => Ok((close, join_handle)),
            Ok(Err(msg)) => {
                let _ = join_handle.join();
                Err(anyhow::anyhow!(msg))
            }
            Err(e) => {
                let _ = join_handle.join();
                Err(anyhow::anyhow!("RPC server thread exited before startup: {}", e))
            }
        }
    }
}
