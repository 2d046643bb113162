//! Configuration schema definitions.
//!
//! Every value here is validated before it is constructed, so holding a
//! `ProxyConfig` means every field is usable for the life of the process.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use axum::http::uri::{Authority, Scheme};
use axum::http::HeaderValue;
use url::Url;

/// Static asset root used when `STATIC_ROOT` is not set.
pub const DEFAULT_STATIC_ROOT: &str = "/var/www/html/pyla";

/// Root configuration for the proxy.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Privileged upstream credential (`GITHUB_MODELS_PAT`).
    pub access_token: AccessToken,

    /// Upstream base URL (`GITHUB_MODELS_URL`).
    pub inference_url: UpstreamTarget,

    /// Sentinel compared against caller `Authorization` suffixes (`FAIR_USE_TOKEN`).
    pub fair_use_token: FairUseToken,

    /// Local listen port (`PORT`).
    pub port: u16,

    /// Directory served for every non-proxied path.
    pub static_root: PathBuf,

    /// Prometheus exporter address. No exporter when unset.
    pub metrics_address: Option<SocketAddr>,
}

impl ProxyConfig {
    /// Address the front door binds to.
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

/// The privileged bearer credential.
///
/// Holds the ready-made `Bearer <token>` header value, flagged sensitive so
/// hyper and tracing never print it.
#[derive(Clone)]
pub struct AccessToken {
    header: HeaderValue,
}

impl AccessToken {
    /// Build the credential from the raw token. Fails when the token cannot be
    /// carried in an HTTP header.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut header = HeaderValue::from_str(&format!("Bearer {}", raw))
            .map_err(|_| "token contains characters not allowed in an HTTP header".to_string())?;
        header.set_sensitive(true);
        Ok(Self { header })
    }

    /// The `Authorization` value that replaces a fair-use caller's credential.
    pub fn bearer_header(&self) -> &HeaderValue {
        &self.header
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// The shared fair-use sentinel. Never empty.
#[derive(Clone)]
pub struct FairUseToken(String);

impl FairUseToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for FairUseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FairUseToken(<redacted>)")
    }
}

/// The single upstream the proxy forwards to.
///
/// Scheme and authority are pre-split so the director never re-parses the URL
/// on the request path.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    url: Url,
    scheme: Scheme,
    authority: Authority,
    host_header: HeaderValue,
}

impl UpstreamTarget {
    /// Parse an absolute `http`/`https` URL with a host.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let url = Url::parse(raw).map_err(|e| e.to_string())?;

        let scheme = match url.scheme() {
            "http" => Scheme::HTTP,
            "https" => Scheme::HTTPS,
            other => return Err(format!("unsupported scheme '{}', expected http or https", other)),
        };

        let host = url
            .host_str()
            .ok_or_else(|| "URL has no host".to_string())?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let host_header = HeaderValue::from_str(&authority).map_err(|e| e.to_string())?;
        let authority = authority
            .parse::<Authority>()
            .map_err(|e| e.to_string())?;

        Ok(Self {
            url,
            scheme,
            authority,
            host_header,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// `host[:port]` as written in the URL (default ports are omitted).
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub fn host_header(&self) -> &HeaderValue {
        &self.host_header
    }

    /// Path component of the base URL, always starting with `/`.
    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.url.query()
    }
}

impl fmt::Display for UpstreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}
