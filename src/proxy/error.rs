//! Per-request upstream failures.
//!
//! None of these escape the request: each maps to a gateway-class status and
//! a small JSON body. The detailed cause is logged, not sent to the caller.

use std::error::Error as StdError;
use std::io;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The directed request could not be turned into a valid upstream URI.
    #[error("invalid upstream target: {0}")]
    InvalidTarget(String),

    /// Connecting to or hearing back from the upstream took too long.
    #[error("upstream timed out: {0}")]
    Timeout(String),

    /// TCP connect or TLS handshake failed.
    #[error("upstream connection failed: {0}")]
    Connect(String),

    /// Any other transport failure while sending the request.
    #[error("upstream request failed: {0}")]
    Request(String),

    /// The upstream answered with something we cannot relay.
    #[error("invalid upstream response: {0}")]
    Response(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: &'static str,
    request_id: Option<&'a str>,
}

impl UpstreamError {
    /// Classify a transport error from the upstream client.
    pub fn from_transport(err: hyper_util::client::legacy::Error) -> Self {
        let detail = describe(&err);
        if timed_out(&err) {
            UpstreamError::Timeout(detail)
        } else if err.is_connect() {
            UpstreamError::Connect(detail)
        } else {
            UpstreamError::Request(detail)
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            UpstreamError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            UpstreamError::InvalidTarget(_) => "INVALID_TARGET",
            UpstreamError::Timeout(_) => "UPSTREAM_TIMEOUT",
            UpstreamError::Connect(_) => "UPSTREAM_UNREACHABLE",
            UpstreamError::Request(_) => "UPSTREAM_ERROR",
            UpstreamError::Response(_) => "UPSTREAM_BAD_RESPONSE",
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            UpstreamError::Timeout(_) => "Upstream did not respond in time",
            _ => "Upstream request failed",
        }
    }

    pub fn to_response(&self, request_id: Option<&str>) -> Response {
        let body = ErrorBody {
            error: self.error_code(),
            message: self.public_message(),
            request_id,
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// True if any error in the chain is an I/O timeout.
fn timed_out(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<io::Error>() {
            if io.kind() == io::ErrorKind::TimedOut {
                return true;
            }
        }
        current = e.source();
    }
    false
}

/// Flatten an error and its causes into one log-friendly line.
fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut current = err.source();
    while let Some(e) = current {
        message.push_str(": ");
        message.push_str(&e.to_string());
        current = e.source();
    }
    message
}

impl IntoResponse for UpstreamError {
    fn into_response(self) -> Response {
        self.to_response(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            UpstreamError::Timeout("slow".into()).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            UpstreamError::Connect("refused".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            UpstreamError::Response("bad".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_timeout_found_anywhere_in_chain() {
        #[derive(Debug, Error)]
        #[error("tcp connect error")]
        struct Wrapper(#[source] io::Error);

        let err = Wrapper(io::Error::new(io::ErrorKind::TimedOut, "connect timeout"));
        assert!(timed_out(&err));
        assert_eq!(describe(&err), "tcp connect error: connect timeout");

        let refused = Wrapper(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(!timed_out(&refused));
    }

    #[test]
    fn test_response_hides_cause() {
        let response = UpstreamError::Connect("dial tcp 10.0.0.1:443: refused".into())
            .to_response(Some("req-1"));
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }
}
