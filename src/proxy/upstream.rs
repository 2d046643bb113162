//! Forwarding leg: one attempt against the single upstream.
//!
//! # Responsibilities
//! - Send the directed request over a shared HTTP client
//! - Strip hop-by-hop headers in both directions
//! - Record the caller in `X-Forwarded-For`
//! - Stream bodies through without buffering
//!
//! # Design Decisions
//! - No retries and no failover: a transport failure is reported once
//! - Redirects are relayed to the caller, never followed
//! - Connect timeout only; inference responses may stream for a long time
//! - The client adds no headers of its own beyond the `Host` the director
//!   already set

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, Response, Version};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::proxy::error::UpstreamError;

/// Time allowed to establish the upstream connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Headers that only describe a single transport link.
static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// HTTP client for the upstream link.
#[derive(Clone)]
pub struct UpstreamClient {
    http: Client<HttpsConnector<HttpConnector>, Body>,
}

impl UpstreamClient {
    /// Build the pooled client. Plain `http` and `https` targets are both
    /// accepted; certificates are checked against the webpki roots.
    pub fn new() -> Result<Self, rustls::Error> {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(CONNECT_TIMEOUT));
        connector.enforce_http(false);

        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())?
            .https_or_http()
            .enable_http1()
            .wrap_connector(connector);

        let http = Client::builder(TokioExecutor::new()).build(https);
        Ok(Self { http })
    }

    /// Forward an already-directed request and relay the upstream response.
    pub async fn forward(
        &self,
        request: Request<Body>,
        peer: Option<SocketAddr>,
    ) -> Result<Response<Body>, UpstreamError> {
        let (mut parts, body) = request.into_parts();

        strip_hop_by_hop(&mut parts.headers);
        if let Some(peer) = peer {
            append_forwarded_for(&mut parts.headers, peer);
        }
        // The upstream link is always HTTP/1.1, whatever the caller spoke.
        parts.version = Version::HTTP_11;

        let upstream = self
            .http
            .request(Request::from_parts(parts, body))
            .await
            .map_err(UpstreamError::from_transport)?;

        let (mut parts, body) = upstream.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

/// Append the peer IP to any `X-Forwarded-For` chain the caller sent.
pub fn append_forwarded_for(headers: &mut HeaderMap, peer: SocketAddr) {
    let ip = peer.ip().to_string();
    let prior: Vec<&str> = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    let chain = if prior.is_empty() {
        ip
    } else {
        format!("{}, {}", prior.join(", "), ip)
    };

    if let Ok(value) = HeaderValue::from_str(&chain) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-session-hint"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-session-hint", HeaderValue::from_static("sticky"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        headers.insert(header::PROXY_AUTHORIZATION, HeaderValue::from_static("Basic x"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer kept"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer kept");
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_forwarded_for_starts_chain() {
        let mut headers = HeaderMap::new();
        append_forwarded_for(&mut headers, "10.1.2.3:5555".parse().unwrap());
        assert_eq!(headers.get(X_FORWARDED_FOR).unwrap(), "10.1.2.3");
    }

    #[test]
    fn test_forwarded_for_extends_chain() {
        let mut headers = HeaderMap::new();
        headers.append(X_FORWARDED_FOR, HeaderValue::from_static("203.0.113.7"));
        headers.append(X_FORWARDED_FOR, HeaderValue::from_static("198.51.100.2"));
        append_forwarded_for(&mut headers, "[::1]:5555".parse().unwrap());
        assert_eq!(
            headers.get(X_FORWARDED_FOR).unwrap(),
            "203.0.113.7, 198.51.100.2, ::1"
        );
        assert_eq!(headers.get_all(X_FORWARDED_FOR).iter().count(), 1);
    }
}
