//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use memory_wall_core::backdrop::DEFAULT_INTERVAL;
use memory_wall_core::board::DEFAULT_NARROW_BREAKPOINT;
use memory_wall_core::gate::DEFAULT_EMAIL_PATTERN;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Absent in development; the service then keeps everything in memory.
    pub database_url: Option<String>,
    pub log_level: Level,
    pub email_pattern: String,
    pub narrow_breakpoint_px: u32,
    pub backdrop_interval: Duration,
    pub submit_redirect_delay: Duration,
    pub public_base_url: String,
    pub cors_origin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: None,
            log_level: Level::INFO,
            email_pattern: DEFAULT_EMAIL_PATTERN.to_string(),
            narrow_breakpoint_px: DEFAULT_NARROW_BREAKPOINT,
            backdrop_interval: DEFAULT_INTERVAL,
            submit_redirect_delay: Duration::from_millis(1000),
            public_base_url: "http://localhost:3000".to_string(),
            cors_origin: "http://localhost:3000".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        // --- Server and Storage ---
        let bind_address = parse_or(&lookup, "BIND_ADDRESS", defaults.bind_address)?;
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Access Policy ---
        let email_pattern =
            lookup("INSTITUTION_EMAIL_PATTERN").unwrap_or(defaults.email_pattern);

        // --- Board and Introduction Pages ---
        let narrow_breakpoint_px =
            parse_or(&lookup, "NARROW_BREAKPOINT_PX", defaults.narrow_breakpoint_px)?;
        let backdrop_secs: u64 = parse_or(
            &lookup,
            "BACKDROP_INTERVAL_SECS",
            defaults.backdrop_interval.as_secs(),
        )?;
        if backdrop_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "BACKDROP_INTERVAL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let redirect_ms: u64 = parse_or(&lookup, "SUBMIT_REDIRECT_DELAY_MS", 1000)?;

        // --- Links and CORS ---
        let public_base_url = lookup("PUBLIC_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.public_base_url);
        let cors_origin = lookup("CORS_ORIGIN").unwrap_or(defaults.cors_origin);

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            email_pattern,
            narrow_breakpoint_px,
            backdrop_interval: Duration::from_secs(backdrop_secs),
            submit_redirect_delay: Duration::from_millis(redirect_ms),
            public_base_url,
            cors_origin,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert!(config.database_url.is_none());
        assert_eq!(config.narrow_breakpoint_px, 768);
        assert_eq!(config.backdrop_interval, Duration::from_secs(5));
        assert_eq!(config.submit_redirect_delay, Duration::from_millis(1000));
        assert_eq!(config.email_pattern, DEFAULT_EMAIL_PATTERN);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("BIND_ADDRESS", "127.0.0.1:8080"),
            ("DATABASE_URL", "postgres://localhost/wall"),
            ("RUST_LOG", "debug"),
            ("NARROW_BREAKPOINT_PX", "640"),
            ("PUBLIC_BASE_URL", "https://wall.example/"),
        ])
        .unwrap();
        assert_eq!(config.bind_address.port(), 8080);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/wall"));
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.narrow_breakpoint_px, 640);
        assert_eq!(config.public_base_url, "https://wall.example");
    }

    #[test]
    fn invalid_values_are_reported_by_name() {
        let err = config_from(&[("NARROW_BREAKPOINT_PX", "wide")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key, _) if key == "NARROW_BREAKPOINT_PX"));

        let err = config_from(&[("BACKDROP_INTERVAL_SECS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key, _) if key == "BACKDROP_INTERVAL_SECS"));
    }
}
