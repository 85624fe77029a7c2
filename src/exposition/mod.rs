//! Scrape endpoint.
//!
//! `GET /metrics` renders every registered series in the text exposition
//! format. The handler only reads; each series is snapshotted atomically by
//! the collectors themselves.

use std::net::SocketAddr;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::{MetricsError, Result};
use crate::registry::MetricsRegistry;

pub const METRICS_PATH: &str = "/metrics";
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Router serving [`METRICS_PATH`] from `registry`.
pub fn router(registry: MetricsRegistry) -> Router {
    Router::new()
        .route(METRICS_PATH, get(metrics_handler))
        .with_state(registry)
}

async fn metrics_handler(State(registry): State<MetricsRegistry>) -> Response {
    match registry.encode() {
        Ok(body) => {
            debug!(bytes = body.len(), "metrics scraped");
            (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}

/// Where the scrape endpoint listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsServerConfig {
    pub bind_address: String,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0:9090".to_string() }
    }
}

impl MetricsServerConfig {
    pub fn new(bind_address: impl Into<String>) -> Self {
        Self { bind_address: bind_address.into() }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address.parse().map_err(|e| MetricsError::Bind {
            address: self.bind_address.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        })
    }
}

/// Standalone HTTP server for the scrape endpoint.
pub struct MetricsServer {
    config: MetricsServerConfig,
    registry: MetricsRegistry,
}

impl MetricsServer {
    pub fn new(config: MetricsServerConfig, registry: MetricsRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &MetricsServerConfig {
        &self.config
    }

    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.socket_addr()?;
        TcpListener::bind(addr).await.map_err(|e| MetricsError::Bind {
            address: self.config.bind_address.clone(),
            source: e,
        })
    }

    /// Serve on `listener` until `shutdown` is cancelled.
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!(address = %addr, "metrics server listening");
        }
        axum::serve(listener, router(self.registry))
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| MetricsError::Server(e.to_string()))?;
        info!("metrics server stopped");
        Ok(())
    }

    /// Bind the configured address and serve until `shutdown`.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }
}
