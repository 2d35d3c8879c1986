//! Runtime configuration read from the environment.
//!
//! ## Environment variables
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DATABASE_URL` | `postgres://localhost/newsdesk` |
//! | `DB_MAX_CONNECTIONS` | 10 |
//! | `DB_CONNECT_TIMEOUT_SECS` | 30 |
//! | `CACHE_BACKEND` | `memory` (`memory` or `redis`) |
//! | `CACHE_CAPACITY` | 1000 |
//! | `REDIS_URL` | `redis://localhost:6379` |
//! | `CACHE_TTL_SECS` | 600 |
//! | `CACHE_PREFIX` | `newsdesk:list:` |
//! | `TEXT_SEARCH_CONFIG` | `russian` |
//! | `RUN_MIGRATIONS` | `false` |

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use newsdesk_core::defaults;
use newsdesk_core::{Error, Result};

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/newsdesk";
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// Where listing results are cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// Bounded LRU inside the process.
    Memory,
    /// Shared Redis instance.
    Redis,
}

impl FromStr for CacheBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "" => Ok(CacheBackend::Memory),
            "redis" => Ok(CacheBackend::Redis),
            other => Err(Error::Config(format!("unknown CACHE_BACKEND: {}", other))),
        }
    }
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheBackend::Memory => f.write_str("memory"),
            CacheBackend::Redis => f.write_str("redis"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_connect_timeout: Duration,
    pub cache_backend: CacheBackend,
    pub cache_capacity: usize,
    pub redis_url: String,
    pub cache_ttl_secs: u64,
    pub cache_prefix: String,
    pub text_search_config: String,
    pub run_migrations: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            db_max_connections: defaults::DB_MAX_CONNECTIONS,
            db_connect_timeout: Duration::from_secs(defaults::DB_CONNECT_TIMEOUT_SECS),
            cache_backend: CacheBackend::Memory,
            cache_capacity: defaults::CACHE_CAPACITY,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            cache_ttl_secs: defaults::CACHE_TTL_SECS,
            cache_prefix: defaults::CACHE_PREFIX.to_string(),
            text_search_config: defaults::TEXT_SEARCH_CONFIG.to_string(),
            run_migrations: false,
        }
    }
}

impl Config {
    /// Read configuration from the process environment.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from a fixed set of variables.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base = Self::default();

        let cache_backend = match lookup("CACHE_BACKEND") {
            Some(v) => v.parse()?,
            None => base.cache_backend,
        };

        let cache_capacity: usize = parse_var(&lookup, "CACHE_CAPACITY", base.cache_capacity)?;
        if cache_capacity == 0 {
            return Err(Error::Config("CACHE_CAPACITY must be positive".to_string()));
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(base.database_url),
            db_max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS", base.db_max_connections)?,
            db_connect_timeout: Duration::from_secs(parse_var(
                &lookup,
                "DB_CONNECT_TIMEOUT_SECS",
                base.db_connect_timeout.as_secs(),
            )?),
            cache_backend,
            cache_capacity,
            redis_url: lookup("REDIS_URL").unwrap_or(base.redis_url),
            cache_ttl_secs: parse_var(&lookup, "CACHE_TTL_SECS", base.cache_ttl_secs)?,
            cache_prefix: lookup("CACHE_PREFIX").unwrap_or(base.cache_prefix),
            text_search_config: lookup("TEXT_SEARCH_CONFIG")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(base.text_search_config),
            run_migrations: lookup("RUN_MIGRATIONS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(base.run_migrations),
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{}={:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}
