//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! process environment
//!     → loader.rs (read variables, missing vs. invalid)
//!     → validation.rs (per-variable rules)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to the director and front door
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - Construction is all-or-nothing: the listener never binds on a bad config
//! - Secrets are newtypes with redacted `Debug`

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::{AccessToken, FairUseToken, ProxyConfig, UpstreamTarget};
