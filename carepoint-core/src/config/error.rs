//! Errors raised while loading, overriding or checking portal settings.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("cannot write {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },

    #[error("settings file is not valid TOML: {0}")]
    Parse(String),

    #[error("settings cannot be rendered as TOML: {0}")]
    Serialize(String),

    /// An environment override that does not parse
    #[error("{key} has an unusable value: {reason}")]
    InvalidValue { key: String, reason: String },

    /// Parsed fine, but breaks a constraint such as the password floor
    #[error("settings rejected: {0}")]
    Rejected(String),
}

impl ConfigError {
    pub(super) fn invalid_value(key: &str, reason: impl ToString) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}
