//! Fair-use inference proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌───────────────────────────────────────────────┐
//!                     │                FAIR-USE PROXY                 │
//!                     │                                               │
//!   Client Request    │  ┌────────┐   ┌────────────┐   ┌──────────┐   │
//!   ──────────────────┼─▶│  http  │──▶│  director  │──▶│ upstream │───┼──▶ Inference
//!                     │  │ server │   │ Host, auth │   │  client  │   │     API
//!                     │  └───┬────┘   └────────────┘   └──────────┘   │
//!                     │      │ everything else                        │
//!                     │      ▼                                        │
//!                     │  ┌────────┐   config, lifecycle,              │
//!                     │  │ static │   observability                   │
//!                     │  │ assets │                                   │
//!                     │  └────────┘                                   │
//!                     └───────────────────────────────────────────────┘
//! ```
//!
//! Configuration comes from `GITHUB_MODELS_PAT`, `GITHUB_MODELS_URL`,
//! `FAIR_USE_TOKEN` and `PORT`; the process refuses to start without them.

use fair_use_proxy::config::ProxyConfig;
use fair_use_proxy::lifecycle::{signals, startup, Shutdown};
use fair_use_proxy::observability::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    tracing::info!("fair-use-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let config = ProxyConfig::from_env().inspect_err(|e| {
        tracing::error!(variable = e.var(), error = %e, "Invalid configuration");
    })?;

    let (server, listener) = startup::prepare(config).await.inspect_err(|e| {
        tracing::error!(error = %e, "Startup failed");
    })?;

    let shutdown = Shutdown::new();
    let shutdown_requested = shutdown.wait();
    signals::spawn_signal_listener(shutdown);

    server
        .run(listener, shutdown_requested)
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, "Error shutting down server");
        })?;

    tracing::info!("Gracefully shut down server");
    Ok(())
}
