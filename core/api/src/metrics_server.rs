// dryrun/core/api/src/metrics_server.rs

use axum::{body::Body, http::StatusCode, response::Response, routing::get, Router};
use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;
use tracing::{error, info};

/// Metrics server configuration
pub struct MetricsServer {
    addr: SocketAddr,
}

impl MetricsServer {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    pub fn router() -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
    }

    /// Start the metrics server
    pub async fn start(self) -> anyhow::Result<()> {
        info!("Starting metrics server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, Self::router()).await?;

        Ok(())
    }
}

fn respond(status: StatusCode, content_type: &str, body: Vec<u8>) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    if let Ok(value) = content_type.parse() {
        response.headers_mut().insert(axum::http::header::CONTENT_TYPE, value);
    }
    response
}

/// Handler for /metrics endpoint
async fn metrics_handler() -> Response<Body> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => respond(StatusCode::OK, encoder.format_type(), buffer),
        Err(e) => {
            error!("Error encoding metrics: {}", e);
            respond(
                StatusCode::INTERNAL_SERVER_ERROR,
                "text/plain",
                format!("Error encoding metrics: {}", e).into_bytes(),
            )
        }
    }
}

/// Handler for /health endpoint
async fn health_handler() -> Response<Body> {
    respond(StatusCode::OK, "application/json", b"{\"status\":\"healthy\"}".to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::rpc_request;

    #[tokio::test]
    async fn test_metrics_include_rpc_counter() {
        rpc_request("listsessions");
        let response = metrics_handler().await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("dryrun_rpc_requests_total"));
    }

    #[tokio::test]
    async fn test_health() {
        let response = health_handler().await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
