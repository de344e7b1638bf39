//! Configuration for the bakery producer.
//!
//! Loaded from environment variables, which `main` seeds from an optional
//! `.env` file:
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `PORT` | `8080` | Listening port (any integer, never bound) |
//! | `K_SINK` | required | CloudEvents HTTP target URL |
//! | `BAKE_INTERVAL_SECS` | `15` | Seconds between batches |
//! | `SINK_TIMEOUT_SECS` | `30` | Per-request timeout for the sink |
//! | `SHUTDOWN_TIMEOUT_SECS` | `30` | Grace period for the in-flight batch on shutdown |
//! | `CE_MODE` | `binary` | `binary` or `structured` content mode |

use octomuffin_http::ContentMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default `PORT`
pub const DEFAULT_PORT: i64 = 8080;
/// Default `BAKE_INTERVAL_SECS`
pub const DEFAULT_BAKE_INTERVAL_SECS: u64 = 15;
/// Default `SINK_TIMEOUT_SECS`
pub const DEFAULT_SINK_TIMEOUT_SECS: u64 = 30;
/// Default `SHUTDOWN_TIMEOUT_SECS`
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Errors raised while reading configuration. All of them are fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or empty
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set to something unusable
    #[error("Invalid value '{value}' for {key}: {reason}")]
    Invalid {
        /// The offending variable
        key: &'static str,
        /// Its raw value
        value: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Process configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Port the platform expects us to listen on. Read for compatibility only.
    pub port: i64,
    /// CloudEvents HTTP target
    pub sink: String,
    /// Seconds between batches
    pub bake_interval_secs: u64,
    /// Per-request sink timeout in seconds
    pub sink_timeout_secs: u64,
    /// Shutdown grace period in seconds
    pub shutdown_timeout_secs: u64,
    /// How events are laid out on the wire
    pub mode: ContentMode,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Call `dotenvy::dotenv()` beforehand to pick up a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `K_SINK` is missing or any variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `K_SINK` is missing or any variable fails to parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;

        let sink = lookup("K_SINK")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("K_SINK"))?;

        let bake_interval_secs = parse_or(&lookup, "BAKE_INTERVAL_SECS", DEFAULT_BAKE_INTERVAL_SECS)?;
        if bake_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "BAKE_INTERVAL_SECS",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let sink_timeout_secs = parse_or(&lookup, "SINK_TIMEOUT_SECS", DEFAULT_SINK_TIMEOUT_SECS)?;
        let shutdown_timeout_secs =
            parse_or(&lookup, "SHUTDOWN_TIMEOUT_SECS", DEFAULT_SHUTDOWN_TIMEOUT_SECS)?;
        let mode = parse_or(&lookup, "CE_MODE", ContentMode::default())?;

        Ok(Self {
            port,
            sink,
            bake_interval_secs,
            sink_timeout_secs,
            shutdown_timeout_secs,
            mode,
        })
    }

    /// Period between batches
    #[must_use]
    pub const fn bake_interval(&self) -> Duration {
        Duration::from_secs(self.bake_interval_secs)
    }

    /// Per-request sink timeout
    #[must_use]
    pub const fn sink_timeout(&self) -> Duration {
        Duration::from_secs(self.sink_timeout_secs)
    }

    /// Shutdown grace period
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Parse `key` if set and non-empty, otherwise fall back to `default`.
fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => {
            value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            })
        },
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Tests can unwrap

    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_sink_is_set() {
        let config = Config::from_lookup(lookup(&[("K_SINK", "http://localhost:8080")])).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.sink, "http://localhost:8080");
        assert_eq!(config.bake_interval(), Duration::from_secs(15));
        assert_eq!(config.sink_timeout(), Duration::from_secs(30));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
        assert_eq!(config.mode, ContentMode::Binary);
    }

    #[test]
    fn missing_sink_is_fatal() {
        let result = Config::from_lookup(lookup(&[("PORT", "9000")]));
        assert_eq!(result, Err(ConfigError::Missing("K_SINK")));

        let result = Config::from_lookup(lookup(&[("K_SINK", "  ")]));
        assert_eq!(result, Err(ConfigError::Missing("K_SINK")));
    }

    #[test]
    fn overrides_are_read() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "9090"),
            ("K_SINK", "https://broker.example/default"),
            ("BAKE_INTERVAL_SECS", "1"),
            ("SINK_TIMEOUT_SECS", "5"),
            ("SHUTDOWN_TIMEOUT_SECS", "2"),
            ("CE_MODE", "structured"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.bake_interval(), Duration::from_secs(1));
        assert_eq!(config.sink_timeout(), Duration::from_secs(5));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(2));
        assert_eq!(config.mode, ContentMode::Structured);
    }

    #[test]
    fn non_numeric_port_is_rejected() {
        let result = Config::from_lookup(lookup(&[("PORT", "eighty"), ("K_SINK", "http://sink")]));
        assert!(matches!(result, Err(ConfigError::Invalid { key: "PORT", .. })));
    }

    #[test]
    fn any_integer_port_is_accepted() {
        // Never bound, so values outside the TCP range still start
        for (raw, port) in [("70000", 70_000), ("0", 0), ("-1", -1)] {
            let config = Config::from_lookup(lookup(&[("PORT", raw), ("K_SINK", "http://sink")])).unwrap();
            assert_eq!(config.port, port);
        }
    }

    #[test]
    fn zero_interval_is_rejected() {
        let result = Config::from_lookup(lookup(&[("K_SINK", "http://sink"), ("BAKE_INTERVAL_SECS", "0")]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                key: "BAKE_INTERVAL_SECS",
                ..
            })
        ));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let result = Config::from_lookup(lookup(&[("K_SINK", "http://sink"), ("CE_MODE", "batched")]));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("CE_MODE"));
    }

    #[test]
    fn config_serializes_to_json() {
        let config = Config::from_lookup(lookup(&[("K_SINK", "http://sink")])).unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["sink"], "http://sink");
        assert_eq!(json["mode"], "binary");
    }
}
