//! Inference proxy subsystem.
//!
//! # Data Flow
//! ```text
//! /inference/** request
//!     → director.rs (upstream URI, Host, fair-use credential swap)
//!     → upstream.rs (single attempt, streamed both ways)
//!     → response relayed unmodified (minus hop-by-hop headers)
//!
//! Transport failure
//!     → error.rs (502 / 504 with JSON body)
//! ```

pub mod director;
pub mod error;
pub mod upstream;

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
};

use crate::config::ProxyConfig;
use crate::http::request::RequestId;
use crate::observability::metrics;

pub use director::{build_director, CredentialOutcome, Director};
pub use error::UpstreamError;
pub use upstream::UpstreamClient;

/// State shared by every proxied request. Read-only.
#[derive(Clone)]
pub struct ProxyState {
    pub director: Director,
    pub upstream: UpstreamClient,
}

impl ProxyState {
    pub fn new(config: &ProxyConfig, upstream: UpstreamClient) -> Self {
        Self {
            director: build_director(config),
            upstream,
        }
    }
}

/// Direct the request, forward it once, relay whatever comes back.
pub async fn proxy_handler(
    State(state): State<ProxyState>,
    mut request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();
    let request_id = request.extensions().get::<RequestId>().cloned();
    let request_id = request_id.as_ref().map(RequestId::as_str);
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let credential = match (state.director)(&mut request) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to direct request");
            metrics::record_request(method.as_str(), e.status_code().as_u16(), "none", start_time);
            return e.to_response(request_id);
        }
    };

    if credential == CredentialOutcome::Substituted {
        tracing::info!("Proxying inference request using fair use token");
    }

    match state.upstream.forward(request, peer).await {
        Ok(response) => {
            metrics::record_request(
                method.as_str(),
                response.status().as_u16(),
                credential.as_str(),
                start_time,
            );
            response
        }
        Err(e) => {
            tracing::warn!(error = %e, "Upstream error");
            metrics::record_request(
                method.as_str(),
                e.status_code().as_u16(),
                credential.as_str(),
                start_time,
            );
            e.to_response(request_id)
        }
    }
}
