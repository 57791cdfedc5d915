//! Client-side credential checks.
//!
//! These run before anything is sent to the identity provider, so a
//! rejected form never produces a provider call.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
    })
}

/// A syntactically valid email address, trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> Result<Self, CredentialError> {
        let trimmed = raw.trim();
        if email_pattern().is_match(trimmed) {
            Ok(Email(trimmed.to_string()))
        } else {
            Err(CredentialError::InvalidEmail)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Password that has passed the minimum length rule. Never printed.
pub struct Password(SecretString);

impl Password {
    /// Length is counted in characters, not bytes.
    pub fn parse(raw: &str, min_len: usize) -> Result<Self, CredentialError> {
        if raw.chars().count() < min_len {
            return Err(CredentialError::PasswordTooShort { min: min_len });
        }
        Ok(Password(SecretString::new(raw.to_string())))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Email/password pair ready to hand to a provider.
#[derive(Debug)]
pub struct Credentials {
    pub email: Email,
    pub password: Password,
}

impl Credentials {
    pub fn parse(email: &str, password: &str, min_password_len: usize) -> Result<Self, CredentialError> {
        Ok(Self {
            email: Email::parse(email)?,
            password: Password::parse(password, min_password_len)?,
        })
    }
}
