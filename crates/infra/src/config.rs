//! Runtime configuration read from the environment.
//!
//! | variable                          | default   |
//! |-----------------------------------|-----------|
//! | `DATABASE_URL`                    | (none)    |
//! | `SHOPSYNC_DB_MAX_CONNECTIONS`     | `10`      |
//! | `SHOPSYNC_DB_ACQUIRE_TIMEOUT_SECS`| `5`       |
//! | `SHOPIFY_API_VERSION`             | `2025-10` |
//! | `SHOPSYNC_MAX_CONCURRENT_STORES`  | `4`       |
//! | `SHOPSYNC_REQUEST_TIMEOUT_SECS`   | `30`      |
//! | `SHOPSYNC_INSTALL_STATE_TTL_SECS` | `600`     |

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use shopsync_stores::DEFAULT_INSTALL_STATE_TTL_SECS;

use crate::external::shopify::DEFAULT_API_VERSION;
use crate::sync::DEFAULT_MAX_CONCURRENT_STORES;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is not set")]
    Missing { name: &'static str },

    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopifyConfig {
    pub api_version: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// `None` when `DATABASE_URL` is unset.
    pub database: Option<DatabaseConfig>,
    pub shopify: ShopifyConfig,
    pub max_concurrent_stores: usize,
    pub install_state_ttl: chrono::Duration,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = match lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_or(&lookup, "SHOPSYNC_DB_MAX_CONNECTIONS", 10u32)?,
                acquire_timeout_secs: parse_or(&lookup, "SHOPSYNC_DB_ACQUIRE_TIMEOUT_SECS", 5u64)?,
            }),
            None => None,
        };

        let api_version = lookup("SHOPIFY_API_VERSION").unwrap_or_else(|| {
            warn!(default = DEFAULT_API_VERSION, "SHOPIFY_API_VERSION not set; using default");
            DEFAULT_API_VERSION.to_string()
        });

        let max_concurrent_stores: usize = parse_or(
            &lookup,
            "SHOPSYNC_MAX_CONCURRENT_STORES",
            DEFAULT_MAX_CONCURRENT_STORES,
        )?;
        if max_concurrent_stores == 0 {
            return Err(ConfigError::Invalid {
                name: "SHOPSYNC_MAX_CONCURRENT_STORES",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let timeout_secs: u64 = parse_or(&lookup, "SHOPSYNC_REQUEST_TIMEOUT_SECS", 30)?;
        let ttl_secs: i64 = parse_or(
            &lookup,
            "SHOPSYNC_INSTALL_STATE_TTL_SECS",
            DEFAULT_INSTALL_STATE_TTL_SECS,
        )?;

        Ok(Self {
            database,
            shopify: ShopifyConfig {
                api_version,
                request_timeout: Duration::from_secs(timeout_secs),
            },
            max_concurrent_stores,
            install_state_ttl: chrono::Duration::seconds(ttl_secs),
        })
    }

    /// The database settings, required by the Postgres backends.
    pub fn require_database(&self) -> Result<&DatabaseConfig, ConfigError> {
        self.database.as_ref().ok_or(ConfigError::Missing {
            name: "DATABASE_URL",
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: core::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
