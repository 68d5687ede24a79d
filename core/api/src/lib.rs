// dryrun/core/api/src/lib.rs

// JSON-RPC surface of the session sandbox
pub mod methods;
pub mod metrics;
pub mod metrics_server;
pub mod server;
pub mod session_rpc;
pub mod types;

pub use metrics_server::MetricsServer;
pub use server::{RpcConfig, RpcServer};
pub use types::ApiError;
