//! Test fixtures shared by unit tests across the crate.

use chrono::{Duration, Utc};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use crate::authz::ADMIN_FLAG_KEY;
use crate::config::Config;
use crate::identity::{Identity, Metadata, Session, UserId};
use crate::provider::InMemoryIdentityProvider;
use crate::session::{SessionState, SessionStore};

pub const PASSWORD: &str = "secret1";

pub fn identity(email: &str, metadata: Metadata) -> Identity {
    Identity {
        id: UserId::generate(),
        email: email.to_string(),
        metadata,
        created_at: Utc::now(),
    }
}

pub fn session_for(identity: Identity) -> Session {
    Session {
        access_token: uuid::Uuid::new_v4().to_string(),
        identity,
        expires_at: Utc::now() + Duration::hours(1),
    }
}

pub fn member_state() -> SessionState {
    SessionState::SignedIn(session_for(identity("member@clinic.org", Metadata::new())))
}

pub fn admin_state() -> SessionState {
    SessionState::SignedIn(session_for(identity(
        "admin@clinic.org",
        Metadata::new().with(ADMIN_FLAG_KEY, true),
    )))
}

/// Config with a short settle timeout so failing waits surface quickly.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.settle_timeout = StdDuration::from_millis(500);
    config
}

pub struct Harness {
    pub provider: Arc<InMemoryIdentityProvider>,
    pub store: SessionStore,
}

impl Harness {
    /// Store over a fresh in-memory provider, not yet initialized.
    pub fn new() -> Self {
        let config = test_config();
        let provider = Arc::new(InMemoryIdentityProvider::new(&config.provider));
        let store = SessionStore::new(provider.clone(), &config);
        Self { provider, store }
    }

    pub fn seed(&self, email: &str, metadata: Metadata) -> Identity {
        self.provider
            .seed_account(email, PASSWORD, metadata)
            .expect("seed account")
    }

    pub fn seed_admin(&self, email: &str) -> Identity {
        self.seed(email, Metadata::new().with(ADMIN_FLAG_KEY, true))
    }
}
