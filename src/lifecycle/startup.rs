//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Bind the listener last, only once everything else is ready
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Configuration is validated before this module ever runs, so a bad
//!   environment never opens a port

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ProxyConfig;
use crate::http::HttpServer;
use crate::observability::metrics;

/// Fatal errors before the first request is accepted.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build upstream client: {0}")]
    Client(#[source] rustls::Error),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(String),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Bring up everything that must exist before traffic is accepted.
///
/// Order: metrics exporter, upstream client and router, listener.
pub async fn prepare(config: ProxyConfig) -> Result<(HttpServer, TcpListener), StartupError> {
    tracing::info!(
        upstream = %config.inference_url,
        port = config.port,
        static_root = %config.static_root.display(),
        metrics_address = ?config.metrics_address,
        "Configuration loaded"
    );

    if let Some(address) = config.metrics_address {
        metrics::init_metrics(address)?;
    }

    let server = HttpServer::new(config)?;
    let listener = bind_listener(server.config()).await?;
    Ok((server, listener))
}

/// Bind the front door on all interfaces at the configured port.
pub async fn bind_listener(config: &ProxyConfig) -> Result<TcpListener, StartupError> {
    let address = config.bind_address();
    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    tracing::info!(address = %address, "Listener bound");
    Ok(listener)
}
