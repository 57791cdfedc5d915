//! Session and access-control core of the CarePoint clinic portal.
//!
//! Authentication is delegated to a hosted identity provider behind
//! [`provider::IdentityProvider`]. This crate keeps the client-side view of
//! that provider consistent ([`session::SessionStore`]), derives roles from
//! provider-issued metadata ([`authz`]) and turns both into navigation
//! ([`navigation`]).

pub mod authz;
pub mod config;
pub mod error;
pub mod feedback;
pub mod identity;
pub mod logging;
pub mod metrics;
pub mod navigation;
pub mod notification;
pub mod provider;
pub mod session;

#[cfg(test)]
mod test_utils;

pub use authz::{is_admin, Role};
pub use config::Config;
pub use error::{AuthError, AuthResult};
pub use identity::{Identity, Metadata, Session, UserId};
pub use logging::{init_logging, LogLevel};
pub use navigation::{compose, NavAction, Route};
pub use session::{SessionState, SessionStore};
