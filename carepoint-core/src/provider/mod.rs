//! Identity provider boundary.
//!
//! The hosted auth platform is reached only through [`IdentityProvider`].
//! Session changes are published on a broadcast channel; a receiver only
//! sees events sent after it subscribed, so consumers must subscribe
//! before they read the current session.
//!
//! ```text
//! SessionStore
//!       |
//!       v
//! IdentityProvider (trait)
//!       |
//!       +---> hosted platform client
//!       |
//!       +---> InMemoryIdentityProvider (tests, CLI demo)
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::identity::{Credentials, Identity, Metadata, Session, UserId};

mod memory;

pub use memory::{InMemoryIdentityProvider, ProviderOp};

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("User already registered")]
    UserAlreadyRegistered,

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Auth session missing")]
    NotAuthenticated,

    #[error("Not allowed: {0}")]
    Forbidden(String),

    #[error("{0}")]
    Rejected(String),

    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    UserUpdated,
    TokenRefreshed,
}

/// Session change notification. `session` is the full replacement value.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<Session>,
}

impl AuthEvent {
    pub fn signed_in(session: Session) -> Self {
        Self {
            kind: AuthEventKind::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            kind: AuthEventKind::SignedOut,
            session: None,
        }
    }

    pub fn user_updated(session: Session) -> Self {
        Self {
            kind: AuthEventKind::UserUpdated,
            session: Some(session),
        }
    }
}

/// Result of a registration. `session` is `None` when the provider still
/// requires the email address to be confirmed.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub identity: Identity,
    pub session: Option<Session>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, credentials: &Credentials) -> ProviderResult<Session>;

    async fn sign_up(&self, credentials: &Credentials, metadata: Metadata) -> ProviderResult<SignUp>;

    async fn sign_out(&self) -> ProviderResult<()>;

    async fn get_session(&self) -> ProviderResult<Option<Session>>;

    /// Receive every session change published after this call returns.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

    /// Shallow-merge `patch` into the signed-in user's metadata.
    async fn update_user(&self, patch: &Metadata) -> ProviderResult<Identity>;

    // Service-role calls below.

    async fn get_user(&self, id: &UserId) -> ProviderResult<Identity>;

    async fn list_users(&self) -> ProviderResult<Vec<Identity>>;

    async fn admin_update_metadata(&self, id: &UserId, patch: &Metadata) -> ProviderResult<Identity>;
}
