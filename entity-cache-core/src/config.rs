//! # Cache Configuration
//!
//! Startup settings for the cache. They are read once, before the
//! [`ScopeResolver`](crate::ScopeResolver) is built, and never change afterwards.
//!
//! Three sources are supported:
//!
//! - **Serde**: `CacheConfig` deserializes from any format, so it can be embedded as a
//!   section of an application's own configuration file. Missing fields take defaults.
//! - **Key lookup**: [`CacheConfig::from_lookup`] reads dotted setting names
//!   (`Database.Cache.Enabled`, `Database.Cache.Strategy`,
//!   `Database.Concurrency.Aware.Cache`) from any key/value source.
//! - **Environment**: [`CacheConfig::from_env`] reads `DATABASE_CACHE_ENABLED`,
//!   `DATABASE_CACHE_STRATEGY` and `DATABASE_CONCURRENCY_AWARE_CACHE`.
//!
//! An unrecognized strategy or an unparsable boolean is an error; there is no silent
//! fallback to a default.
//!
//! # Examples
//!
//! ```
//! use entity_cache_core::{CacheConfig, CacheStrategy};
//! use std::collections::HashMap;
//!
//! let settings: HashMap<&str, &str> = [("Database.Cache.Strategy", "PerHttpRequest")].into();
//! let config = CacheConfig::from_lookup(|key| settings.get(key).map(|v| v.to_string())).unwrap();
//!
//! assert!(config.enabled);
//! assert_eq!(config.strategy, CacheStrategy::PerContext);
//! ```

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::{CacheError, Result};

pub const ENABLED_KEY: &str = "Database.Cache.Enabled";
pub const STRATEGY_KEY: &str = "Database.Cache.Strategy";
pub const CONCURRENCY_AWARE_KEY: &str = "Database.Concurrency.Aware.Cache";

const ENABLED_ENV: &str = "DATABASE_CACHE_ENABLED";
const STRATEGY_ENV: &str = "DATABASE_CACHE_STRATEGY";
const CONCURRENCY_AWARE_ENV: &str = "DATABASE_CONCURRENCY_AWARE_CACHE";

/// Which cache instance is "current".
///
/// * `Global` - one process-wide instance shared by every caller
/// * `PerContext` - one instance per request context, created on first access
///
/// Parsing is case-insensitive and also accepts `Universal` for `Global` and
/// `PerRequest`/`PerHttpRequest` for `PerContext`.
///
/// ```
/// use entity_cache_core::CacheStrategy;
///
/// assert_eq!("universal".parse::<CacheStrategy>().unwrap(), CacheStrategy::Global);
/// assert!("sometimes".parse::<CacheStrategy>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum CacheStrategy {
    #[default]
    Global,
    PerContext,
}

impl FromStr for CacheStrategy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" | "universal" => Ok(CacheStrategy::Global),
            "percontext" | "perrequest" | "perhttprequest" => Ok(CacheStrategy::PerContext),
            _ => Err(CacheError::InvalidStrategy(s.to_string())),
        }
    }
}

impl TryFrom<String> for CacheStrategy {
    type Error = CacheError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheStrategy::Global => f.write_str("Global"),
            CacheStrategy::PerContext => f.write_str("PerContext"),
        }
    }
}

/// Cache settings consumed at startup.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Caching default for types without an explicit override
    pub enabled: bool,
    pub strategy: CacheStrategy,
    /// Whether [`EntityCache::query_timestamp`](crate::EntityCache::query_timestamp)
    /// hands out row-version ticks
    pub concurrency_aware: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: CacheStrategy::Global,
            concurrency_aware: true,
        }
    }
}

impl CacheConfig {
    /// Reads settings through `lookup`; absent keys keep their defaults.
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidStrategy`] or [`CacheError::InvalidSetting`] when a present
    /// value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::read(&lookup, ENABLED_KEY, STRATEGY_KEY, CONCURRENCY_AWARE_KEY)
    }

    /// Reads settings from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::read(
            &|key: &str| std::env::var(key).ok(),
            ENABLED_ENV,
            STRATEGY_ENV,
            CONCURRENCY_AWARE_ENV,
        )
    }

    fn read(
        lookup: &dyn Fn(&str) -> Option<String>,
        enabled_key: &str,
        strategy_key: &str,
        concurrency_key: &str,
    ) -> Result<Self> {
        let mut config = CacheConfig::default();

        if let Some(value) = lookup(enabled_key) {
            config.enabled = parse_bool(enabled_key, &value)?;
        }
        if let Some(value) = lookup(strategy_key) {
            config.strategy = value.parse()?;
        }
        if let Some(value) = lookup(concurrency_key) {
            config.concurrency_aware = parse_bool(concurrency_key, &value)?;
        }

        debug!(
            enabled = config.enabled,
            strategy = %config.strategy,
            concurrency_aware = config.concurrency_aware,
            "cache configuration loaded"
        );
        Ok(config)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(CacheError::InvalidSetting {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
