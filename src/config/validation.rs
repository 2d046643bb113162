//! Per-variable validation rules.
//!
//! Each rule takes the raw value of one setting and either returns the typed
//! value or a human-readable reason. The loader attaches the variable name.

use std::net::SocketAddr;

use crate::config::schema::{AccessToken, FairUseToken, UpstreamTarget};

pub fn access_token(raw: &str) -> Result<AccessToken, String> {
    AccessToken::parse(raw)
}

pub fn inference_url(raw: &str) -> Result<UpstreamTarget, String> {
    UpstreamTarget::parse(raw)
}

pub fn fair_use_token(raw: &str) -> Result<FairUseToken, String> {
    Ok(FairUseToken::new(raw))
}

/// Listen port: a positive integer that fits a TCP port.
pub fn port(raw: &str) -> Result<u16, String> {
    let port: u16 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a port number between 1 and 65535", raw))?;
    if port == 0 {
        return Err("port must be positive".to_string());
    }
    Ok(port)
}

pub fn socket_address(raw: &str) -> Result<SocketAddr, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("'{}' is not an ip:port socket address", raw))
}
