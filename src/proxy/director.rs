//! The request director.
//!
//! # Responsibilities
//! - Point every inbound request at the single configured upstream
//! - Force the `Host` header to the upstream authority
//! - Swap a fair-use caller's credential for the privileged access token
//!
//! # Design Decisions
//! - The director is a closure over the immutable config, built once and
//!   shared via `Arc`; it keeps no state between requests
//! - The fair-use check is a byte suffix match on the first `Authorization`
//!   value. This is a low-friction gate, not a cryptographic check: anyone
//!   who learns the sentinel gets the privileged credential.

use std::sync::Arc;

use axum::body::Body;
use axum::http::uri::PathAndQuery;
use axum::http::{header, HeaderMap, HeaderValue, Request, Uri};

use crate::config::{AccessToken, FairUseToken, ProxyConfig, UpstreamTarget};
use crate::proxy::error::UpstreamError;

/// Which credential treatment a request received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialOutcome {
    /// The caller's credential ended with the fair-use token and was replaced.
    Substituted,
    /// The caller's `Authorization` (or its absence) was left untouched.
    PassedThrough,
}

impl CredentialOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialOutcome::Substituted => "fair_use",
            CredentialOutcome::PassedThrough => "caller",
        }
    }
}

/// Rewrites an inbound request into the request sent upstream.
pub type Director =
    Arc<dyn Fn(&mut Request<Body>) -> Result<CredentialOutcome, UpstreamError> + Send + Sync>;

/// Build the director for the given configuration.
pub fn build_director(config: &ProxyConfig) -> Director {
    let target = config.inference_url.clone();
    let fair_use_token = config.fair_use_token.clone();
    let access_token = config.access_token.clone();

    Arc::new(move |request: &mut Request<Body>| -> Result<CredentialOutcome, UpstreamError> {
        let uri = upstream_uri(&target, request.uri())?;
        *request.uri_mut() = uri;
        request
            .headers_mut()
            .insert(header::HOST, target.host_header().clone());
        Ok(apply_credential(
            request.headers_mut(),
            &fair_use_token,
            &access_token,
        ))
    })
}

/// Replace `Authorization` with the privileged bearer credential iff the
/// caller's value ends with the fair-use token.
pub fn apply_credential(
    headers: &mut HeaderMap,
    fair_use_token: &FairUseToken,
    access_token: &AccessToken,
) -> CredentialOutcome {
    if !presents_fair_use_token(headers.get(header::AUTHORIZATION), fair_use_token) {
        return CredentialOutcome::PassedThrough;
    }

    headers.insert(header::AUTHORIZATION, access_token.bearer_header().clone());
    CredentialOutcome::Substituted
}

fn presents_fair_use_token(value: Option<&HeaderValue>, token: &FairUseToken) -> bool {
    value
        .map(|v| v.as_bytes().ends_with(token.as_bytes()))
        .unwrap_or(false)
}

/// Resolve the upstream URI: target scheme and authority, target path joined
/// with the request path, target query joined with the request query.
pub fn upstream_uri(target: &UpstreamTarget, inbound: &Uri) -> Result<Uri, UpstreamError> {
    let path = join_paths(target.path(), inbound.path());
    let path_and_query = match (target.query(), inbound.query()) {
        (Some(t), Some(r)) if !t.is_empty() && !r.is_empty() => format!("{}?{}&{}", path, t, r),
        (Some(q), _) | (_, Some(q)) if !q.is_empty() => format!("{}?{}", path, q),
        _ => path,
    };

    let path_and_query = path_and_query
        .parse::<PathAndQuery>()
        .map_err(|e| UpstreamError::InvalidTarget(e.to_string()))?;

    Uri::builder()
        .scheme(target.scheme().clone())
        .authority(target.authority().clone())
        .path_and_query(path_and_query)
        .build()
        .map_err(|e| UpstreamError::InvalidTarget(e.to_string()))
}

/// Join two paths with exactly one slash at the seam.
fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}
