//! Errors surfaced by session store operations.
//!
//! Every variant is recoverable: the caller shows [`AuthError::user_message`]
//! and the user may retry.

use thiserror::Error;

use crate::identity::CredentialError;
use crate::provider::ProviderError;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Rejected client-side; no provider call was made
    #[error("{0}")]
    Validation(#[from] CredentialError),

    /// The provider refused the credentials or the registration
    #[error("{0}")]
    Credentials(String),

    /// The provider could not be reached or failed internally
    #[error("{0}")]
    Provider(String),

    #[error("You must be signed in to do that")]
    NotSignedIn,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

impl AuthError {
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AuthError::Validation(_))
    }
}

impl From<ProviderError> for AuthError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidCredentials
            | ProviderError::UserAlreadyRegistered
            | ProviderError::Rejected(_) => AuthError::Credentials(err.to_string()),
            ProviderError::NotAuthenticated => AuthError::NotSignedIn,
            ProviderError::Forbidden(msg) => AuthError::PermissionDenied(msg),
            ProviderError::UserNotFound(_) | ProviderError::Unavailable(_) => {
                AuthError::Provider(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_errors_map_to_user_messages() {
        let err = AuthError::from(ProviderError::InvalidCredentials);
        assert!(matches!(err, AuthError::Credentials(_)));
        assert_eq!(err.user_message(), "Invalid login credentials");

        let err = AuthError::from(ProviderError::Unavailable("connection reset".into()));
        assert!(matches!(err, AuthError::Provider(_)));
        assert!(err.user_message().contains("connection reset"));
    }

    #[test]
    fn test_validation_passes_message_through() {
        let err = AuthError::from(CredentialError::PasswordTooShort { min: 6 });
        assert!(err.is_validation());
        assert_eq!(err.user_message(), "Password must be at least 6 characters");
    }
}
