//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; only required with the `postgres` store)
//!
//! ## Optional
//! - `STOREFRONT_STORE` - `postgres` (default) or `memory`
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_ALLOW_BACKORDER` - Sell variants past zero stock (default: false)
//! - `STOREFRONT_CATALOG_CACHE_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `STOREFRONT_REQUEST_LOG_CAPACITY` - Request log ring size (default: 100)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::middleware::request_log::DEFAULT_CAPACITY;
use crate::models::StockPolicy;

const DEFAULT_CATALOG_CACHE_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Which storage backend the server runs against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreBackend {
    #[default]
    Postgres,
    /// In-process store; data is lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected `postgres` or `memory`, got `{other}`")),
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Storage backend
    pub store: StoreBackend,
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Whether variants can be sold below zero stock
    pub allow_backorder: bool,
    /// How long catalog reads stay cached
    pub catalog_cache_ttl: Duration,
    /// Number of API requests kept for the admin log
    pub request_log_capacity: usize,
    /// Sentry error tracking configuration
    pub sentry: SentryConfig,
}

/// Sentry configuration. Sentry stays disabled without a DSN.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads a `.env` file first if one exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required environment variables are missing
    /// or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let store = get_parsed_or_default(&lookup, "STOREFRONT_STORE", StoreBackend::default())?;

        let database_url = match store {
            StoreBackend::Postgres => Some(get_database_url(&lookup, "STOREFRONT_DATABASE_URL")?),
            StoreBackend::Memory => get_database_url(&lookup, "STOREFRONT_DATABASE_URL").ok(),
        };

        let request_log_capacity = get_parsed_or_default(
            &lookup,
            "STOREFRONT_REQUEST_LOG_CAPACITY",
            DEFAULT_CAPACITY,
        )?;
        if request_log_capacity == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_REQUEST_LOG_CAPACITY".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            store,
            database_url,
            host: get_parsed_or_default(&lookup, "STOREFRONT_HOST", IpAddr::from([127, 0, 0, 1]))?,
            port: get_parsed_or_default(&lookup, "STOREFRONT_PORT", 3000)?,
            allow_backorder: get_bool(&lookup, "STOREFRONT_ALLOW_BACKORDER")?,
            catalog_cache_ttl: Duration::from_secs(get_parsed_or_default(
                &lookup,
                "STOREFRONT_CATALOG_CACHE_TTL_SECS",
                DEFAULT_CATALOG_CACHE_TTL_SECS,
            )?),
            request_log_capacity,
            sentry: SentryConfig {
                dsn: get_optional_env(&lookup, "SENTRY_DSN"),
                environment: get_optional_env(&lookup, "SENTRY_ENVIRONMENT"),
                sample_rate: get_parsed_or_default(&lookup, "SENTRY_SAMPLE_RATE", 1.0)?,
                traces_sample_rate: get_parsed_or_default(
                    &lookup,
                    "SENTRY_TRACES_SAMPLE_RATE",
                    0.1,
                )?,
            },
        })
    }

    /// Get the socket address to bind to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// The stock policy checkout and cart checks run under.
    #[must_use]
    pub const fn stock_policy(&self) -> StockPolicy {
        StockPolicy::from_allow_backorder(self.allow_backorder)
    }
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(
    lookup: &impl Fn(&str) -> Option<String>,
    primary_key: &str,
) -> Result<SecretString, ConfigError> {
    lookup(primary_key)
        .or_else(|| lookup("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, falling back to `default` when unset.
fn get_parsed_or_default<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(lookup, key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

fn get_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<bool, ConfigError> {
    match get_optional_env(lookup, key).as_deref().map(str::trim) {
        None => Ok(false),
        Some("1" | "true" | "TRUE" | "yes") => Ok(true),
        Some("0" | "false" | "FALSE" | "no") => Ok(false),
        Some(other) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got `{other}`"),
        )),
    }
}
