//! Fair-use inference proxy library.
//!
//! A single-hop reverse proxy in front of a remote inference API. Requests
//! under `/inference/` are forwarded to one fixed upstream; callers whose
//! `Authorization` ends with the shared fair-use token have it replaced by the
//! privileged access token. Every other path is served from a static asset
//! directory.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
