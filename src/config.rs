use std::env;

use crate::loading::{LoadError, LoaderConfig};

// ============================================================================
// Application Configuration
// ============================================================================
//
// Read once at startup from the environment:
// - DATABASE_URL        Postgres connection string; in-memory store if unset
// - HTTP_BIND           API listen address (default 0.0.0.0:8080)
// - METRICS_PORT        Prometheus endpoint port (default 9090)
// - BATCH_SIZE          ids per batched lookup, 1..=1000 (default 100)
// - DEFAULT_PAGE_LIMIT  limit when a paged request omits it (default 100)
// - DB_MAX_CONNECTIONS  Postgres pool size (default 5)
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error(transparent)]
    Loader(#[from] LoadError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub http_bind: String,
    pub metrics_port: u16,
    pub loader: LoaderConfig,
    pub default_page_limit: i64,
    pub db_max_connections: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            http_bind: "0.0.0.0:8080".to_string(),
            metrics_port: 9090,
            loader: LoaderConfig::default(),
            default_page_limit: 100,
            db_max_connections: 5,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            http_bind: lookup("HTTP_BIND").unwrap_or(defaults.http_bind),
            metrics_port: parse(&lookup, "METRICS_PORT")?.unwrap_or(defaults.metrics_port),
            loader: match parse(&lookup, "BATCH_SIZE")? {
                Some(batch_size) => LoaderConfig::new(batch_size)?,
                None => defaults.loader,
            },
            default_page_limit: parse(&lookup, "DEFAULT_PAGE_LIMIT")?.unwrap_or(defaults.default_page_limit),
            db_max_connections: parse(&lookup, "DB_MAX_CONNECTIONS")?.unwrap_or(defaults.db_max_connections),
        };

        if config.default_page_limit <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "DEFAULT_PAGE_LIMIT",
                value: config.default_page_limit.to_string(),
            });
        }
        Ok(config)
    }
}

fn parse<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(None),
    }
}
