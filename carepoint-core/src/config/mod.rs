//! Configuration for the portal core
//!
//! Values come from built-in defaults, an optional TOML file and
//! `CAREPOINT_<SECTION>_<KEY>` environment overrides, in that order.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::logging::LogLevel;

mod error;

pub use error::ConfigError;

/// Smallest password length the portal will ever accept.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub auth: AuthConfig,
    pub provider: ProviderConfig,
    pub notifications: NotificationConfig,
    pub logging: LoggingConfig,
}

/// Client-side credential rules and session store behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Minimum accepted password length, checked before any provider call
    pub min_password_len: usize,

    /// How long an auth call waits for the subscription to apply its change
    #[serde(with = "humantime_serde")]
    pub settle_timeout: Duration,
}

/// Settings for the in-process identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Lifetime of issued access tokens
    #[serde(with = "humantime_serde")]
    pub token_ttl: Duration,

    /// Capacity of the session-change broadcast channel
    pub event_buffer: usize,
}

/// Registration notification side-channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,

    /// Upper bound for a single delivery attempt
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    pub json_format: bool,
    pub with_timestamp: bool,
    pub with_target: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            min_password_len: MIN_PASSWORD_LEN,
            settle_timeout: Duration::from_secs(2),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            token_ttl: Duration::from_secs(3600),
            event_buffer: 64,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: Duration::from_secs(10),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    value
        .parse()
        .map_err(|e| ConfigError::invalid_value(key, e))
}

fn parse_duration(key: &str, value: &str) -> Result<Duration, ConfigError> {
    humantime_serde::re::humantime::parse_duration(value)
        .map_err(|e| ConfigError::invalid_value(key, e))
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: CAREPOINT_<SECTION>_<KEY>
    /// Example: CAREPOINT_AUTH_SETTLE_TIMEOUT=500ms
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CAREPOINT_AUTH_MIN_PASSWORD_LEN") {
            self.auth.min_password_len = v
                .parse()
                .map_err(|e| ConfigError::invalid_value("CAREPOINT_AUTH_MIN_PASSWORD_LEN", e))?;
        }
        if let Some(v) = lookup("CAREPOINT_AUTH_SETTLE_TIMEOUT") {
            self.auth.settle_timeout = parse_duration("CAREPOINT_AUTH_SETTLE_TIMEOUT", &v)?;
        }

        if let Some(v) = lookup("CAREPOINT_PROVIDER_TOKEN_TTL") {
            self.provider.token_ttl = parse_duration("CAREPOINT_PROVIDER_TOKEN_TTL", &v)?;
        }
        if let Some(v) = lookup("CAREPOINT_PROVIDER_EVENT_BUFFER") {
            self.provider.event_buffer = v
                .parse()
                .map_err(|e| ConfigError::invalid_value("CAREPOINT_PROVIDER_EVENT_BUFFER", e))?;
        }

        if let Some(v) = lookup("CAREPOINT_NOTIFICATIONS_ENABLED") {
            self.notifications.enabled = parse_flag("CAREPOINT_NOTIFICATIONS_ENABLED", &v)?;
        }
        if let Some(v) = lookup("CAREPOINT_NOTIFICATIONS_TIMEOUT") {
            self.notifications.timeout = parse_duration("CAREPOINT_NOTIFICATIONS_TIMEOUT", &v)?;
        }

        if let Some(v) = lookup("CAREPOINT_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("CAREPOINT_LOG_JSON") {
            self.logging.json_format = parse_flag("CAREPOINT_LOG_JSON", &v)?;
        }

        Ok(())
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.min_password_len < MIN_PASSWORD_LEN {
            return Err(ConfigError::Rejected(format!(
                "min_password_len must be at least {}",
                MIN_PASSWORD_LEN
            )));
        }

        if self.auth.settle_timeout.is_zero() {
            return Err(ConfigError::Rejected(
                "settle_timeout must be greater than 0".to_string(),
            ));
        }

        if self.provider.event_buffer == 0 {
            return Err(ConfigError::Rejected(
                "event_buffer must be greater than 0".to_string(),
            ));
        }

        if self.notifications.timeout.is_zero() {
            return Err(ConfigError::Rejected(
                "notification timeout must be greater than 0".to_string(),
            ));
        }

        if LogLevel::parse(&self.logging.level).is_none() {
            return Err(ConfigError::Rejected(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;

        let path = path.as_ref();
        std::fs::write(path, contents).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.auth.min_password_len, 6);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.auth.min_password_len = 5;
        assert!(config.validate().is_err());

        config = Config::default();
        config.provider.event_buffer = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CAREPOINT_AUTH_SETTLE_TIMEOUT", "250ms"),
            ("CAREPOINT_NOTIFICATIONS_ENABLED", "false"),
            ("CAREPOINT_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.auth.settle_timeout, Duration::from_millis(250));
        assert!(!config.notifications.enabled);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_override_rejects_garbage() {
        let mut config = Config::default();
        let result = config.apply_overrides(|key| {
            (key == "CAREPOINT_NOTIFICATIONS_TIMEOUT").then(|| "soon".to_string())
        });
        match result {
            Err(ConfigError::InvalidValue { key, .. }) => {
                assert_eq!(key, "CAREPOINT_NOTIFICATIONS_TIMEOUT")
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("carepoint.toml");

        let mut config = Config::default();
        config.auth.min_password_len = 10;
        config.notifications.timeout = Duration::from_secs(3);
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.auth.min_password_len, 10);
        assert_eq!(loaded.notifications.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[auth]\nsettle_timeout = \"1s\"\n").unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.auth.settle_timeout, Duration::from_secs(1));
        assert_eq!(loaded.auth.min_password_len, MIN_PASSWORD_LEN);
        assert!(loaded.notifications.enabled);
    }
}
