//! Configuration loading from the process environment.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::schema::{ProxyConfig, DEFAULT_STATIC_ROOT};
use crate::config::validation;

pub const ACCESS_TOKEN_VAR: &str = "GITHUB_MODELS_PAT";
pub const INFERENCE_URL_VAR: &str = "GITHUB_MODELS_URL";
pub const FAIR_USE_TOKEN_VAR: &str = "FAIR_USE_TOKEN";
pub const PORT_VAR: &str = "PORT";
pub const STATIC_ROOT_VAR: &str = "STATIC_ROOT";
pub const METRICS_ADDR_VAR: &str = "METRICS_ADDR";

/// Error type for configuration loading.
///
/// `Missing` and `Invalid` are kept apart because they are different operator
/// mistakes: forgetting a variable versus mistyping one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} environment variable not set")]
    Missing { var: &'static str },

    #[error("{var} environment variable is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl ConfigError {
    /// Name of the offending environment variable.
    pub fn var(&self) -> &'static str {
        match self {
            ConfigError::Missing { var } | ConfigError::Invalid { var, .. } => var,
        }
    }
}

impl ProxyConfig {
    /// Load and validate configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load and validate configuration from an arbitrary variable source.
    ///
    /// Every required variable is validated before the value is built; no
    /// partially populated config is ever returned.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_token = validated(&lookup, ACCESS_TOKEN_VAR, validation::access_token)?;
        let inference_url = validated(&lookup, INFERENCE_URL_VAR, validation::inference_url)?;
        let fair_use_token = validated(&lookup, FAIR_USE_TOKEN_VAR, validation::fair_use_token)?;
        let port = validated(&lookup, PORT_VAR, validation::port)?;

        let static_root = optional(&lookup, STATIC_ROOT_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_ROOT));

        let metrics_address = match optional(&lookup, METRICS_ADDR_VAR) {
            Some(raw) => Some(validation::socket_address(&raw).map_err(|reason| {
                ConfigError::Invalid {
                    var: METRICS_ADDR_VAR,
                    reason,
                }
            })?),
            None => None,
        };

        Ok(Self {
            access_token,
            inference_url,
            fair_use_token,
            port,
            static_root,
            metrics_address,
        })
    }
}

/// Unset and empty are both treated as absent.
fn optional<F>(lookup: &F, var: &'static str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var).filter(|value| !value.is_empty())
}

fn validated<F, T>(
    lookup: &F,
    var: &'static str,
    rule: fn(&str) -> Result<T, String>,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = optional(lookup, var).ok_or(ConfigError::Missing { var })?;
    rule(&raw).map_err(|reason| ConfigError::Invalid { var, reason })
}
