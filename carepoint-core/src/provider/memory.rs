//! In-process identity provider
//!
//! Behaves like a single client of the hosted platform: one current session,
//! accounts keyed by case-insensitive email, argon2 password hashes and a
//! broadcast channel of session changes. Latency and failures can be
//! injected per operation so callers can exercise their error paths.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::{AuthEvent, IdentityProvider, ProviderError, ProviderResult, SignUp};
use crate::config::ProviderConfig;
use crate::identity::{Credentials, Identity, Metadata, Session, UserId};

/// Operations that accept injected latency or failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOp {
    SignIn,
    SignUp,
    SignOut,
    GetSession,
    UpdateUser,
    GetUser,
    ListUsers,
    AdminUpdate,
}

struct Account {
    identity: Identity,
    password_hash: String,
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<UserId, Account>,
    current: Option<Session>,
    failures: HashMap<ProviderOp, ProviderError>,
    delays: HashMap<ProviderOp, Duration>,
    calls: HashMap<ProviderOp, usize>,
}

impl Inner {
    fn find_by_email(&self, email: &str) -> Option<&Account> {
        self.accounts
            .values()
            .find(|a| a.identity.email.eq_ignore_ascii_case(email))
    }
}

pub struct InMemoryIdentityProvider {
    inner: Mutex<Inner>,
    events: broadcast::Sender<AuthEvent>,
    token_ttl: chrono::Duration,
    auto_confirm: bool,
}

impl InMemoryIdentityProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        let token_ttl = chrono::Duration::from_std(config.token_ttl)
            .unwrap_or_else(|_| chrono::Duration::hours(1));

        Self {
            inner: Mutex::new(Inner::default()),
            events,
            token_ttl,
            auto_confirm: true,
        }
    }

    /// When disabled, sign-up creates the account but no session, as a
    /// platform with email confirmation turned on would.
    pub fn with_auto_confirm(mut self, enabled: bool) -> Self {
        self.auto_confirm = enabled;
        self
    }

    /// Create an account directly, without signing in or emitting events.
    pub fn seed_account(
        &self,
        email: &str,
        password: &str,
        metadata: Metadata,
    ) -> ProviderResult<Identity> {
        let password_hash = hash_password(password)?;
        let mut inner = self.lock();
        if inner.find_by_email(email).is_some() {
            return Err(ProviderError::UserAlreadyRegistered);
        }
        let identity = Identity {
            id: UserId::generate(),
            email: email.to_string(),
            metadata,
            created_at: Utc::now(),
        };
        inner.accounts.insert(
            identity.id.clone(),
            Account {
                identity: identity.clone(),
                password_hash,
            },
        );
        Ok(identity)
    }

    /// Make the next call of `op` fail with `err`.
    pub fn fail_next(&self, op: ProviderOp, err: ProviderError) {
        self.lock().failures.insert(op, err);
    }

    /// Delay every call of `op` by `delay`.
    pub fn set_delay(&self, op: ProviderOp, delay: Duration) {
        self.lock().delays.insert(op, delay);
    }

    pub fn call_count(&self, op: ProviderOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Publish an event as if it came from another tab or a token refresh.
    pub fn emit(&self, event: AuthEvent) {
        {
            let mut inner = self.lock();
            inner.current = event.session.clone();
        }
        self.publish(event);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, event: AuthEvent) {
        debug!(kind = ?event.kind, "publishing auth event");
        // No subscribers is not an error for a provider.
        let _ = self.events.send(event);
    }

    /// Count the call, apply injected latency, then any injected failure.
    async fn enter(&self, op: ProviderOp) -> ProviderResult<()> {
        let delay = {
            let mut inner = self.lock();
            *inner.calls.entry(op).or_insert(0) += 1;
            inner.delays.get(&op).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.lock().failures.remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn issue_session(&self, identity: Identity) -> Session {
        Session {
            access_token: uuid::Uuid::new_v4().to_string(),
            identity,
            expires_at: Utc::now() + self.token_ttl,
        }
    }
}

fn hasher() -> ProviderResult<Argon2<'static>> {
    // Light parameters: this provider never stores real credentials.
    let params = Params::new(4096, 1, 1, None)
        .map_err(|e| ProviderError::Unavailable(format!("argon2 params: {}", e)))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

fn hash_password(password: &str) -> ProviderResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ProviderError::Unavailable(format!("Password hashing failed: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> ProviderResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ProviderError::Unavailable(format!("Invalid password hash: {}", e)))?;
    Ok(hasher()?.verify_password(password.as_bytes(), &parsed).is_ok())
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn sign_in(&self, credentials: &Credentials) -> ProviderResult<Session> {
        self.enter(ProviderOp::SignIn).await?;

        let (identity, hash) = {
            let inner = self.lock();
            let account = inner
                .find_by_email(credentials.email.as_str())
                .ok_or(ProviderError::InvalidCredentials)?;
            (account.identity.clone(), account.password_hash.clone())
        };
        if !verify_password(credentials.password.expose(), &hash)? {
            return Err(ProviderError::InvalidCredentials);
        }

        let session = self.issue_session(identity);
        self.lock().current = Some(session.clone());
        info!(user_id = %session.user_id(), "user signed in");
        self.publish(AuthEvent::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, credentials: &Credentials, metadata: Metadata) -> ProviderResult<SignUp> {
        self.enter(ProviderOp::SignUp).await?;

        let identity = self.seed_account(
            credentials.email.as_str(),
            credentials.password.expose(),
            metadata,
        )?;
        info!(user_id = %identity.id, "account created");

        let session = if self.auto_confirm {
            let session = self.issue_session(identity.clone());
            self.lock().current = Some(session.clone());
            self.publish(AuthEvent::signed_in(session.clone()));
            Some(session)
        } else {
            None
        };

        Ok(SignUp { identity, session })
    }

    async fn sign_out(&self) -> ProviderResult<()> {
        self.enter(ProviderOp::SignOut).await?;

        let previous = self.lock().current.take();
        if let Some(session) = previous {
            info!(user_id = %session.user_id(), "user signed out");
        }
        self.publish(AuthEvent::signed_out());
        Ok(())
    }

    async fn get_session(&self) -> ProviderResult<Option<Session>> {
        // Snapshot before the simulated latency, like a response already in flight.
        let snapshot = self.lock().current.clone();
        self.enter(ProviderOp::GetSession).await?;
        Ok(snapshot.filter(|s| !s.is_expired_at(Utc::now())))
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn update_user(&self, patch: &Metadata) -> ProviderResult<Identity> {
        self.enter(ProviderOp::UpdateUser).await?;

        let session = {
            let mut inner = self.lock();
            let user_id = inner
                .current
                .as_ref()
                .map(|s| s.user_id().clone())
                .ok_or(ProviderError::NotAuthenticated)?;
            let account = inner
                .accounts
                .get_mut(&user_id)
                .ok_or_else(|| ProviderError::UserNotFound(user_id.clone()))?;
            account.identity.metadata.merge(patch);
            let identity = account.identity.clone();

            let current = inner.current.as_mut().ok_or(ProviderError::NotAuthenticated)?;
            current.identity = identity;
            current.clone()
        };

        let identity = session.identity.clone();
        self.publish(AuthEvent::user_updated(session));
        Ok(identity)
    }

    async fn get_user(&self, id: &UserId) -> ProviderResult<Identity> {
        self.enter(ProviderOp::GetUser).await?;
        self.lock()
            .accounts
            .get(id)
            .map(|a| a.identity.clone())
            .ok_or_else(|| ProviderError::UserNotFound(id.clone()))
    }

    async fn list_users(&self) -> ProviderResult<Vec<Identity>> {
        self.enter(ProviderOp::ListUsers).await?;
        let mut users: Vec<Identity> = self
            .lock()
            .accounts
            .values()
            .map(|a| a.identity.clone())
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn admin_update_metadata(&self, id: &UserId, patch: &Metadata) -> ProviderResult<Identity> {
        self.enter(ProviderOp::AdminUpdate).await?;

        let (identity, refreshed) = {
            let mut inner = self.lock();
            let account = inner
                .accounts
                .get_mut(id)
                .ok_or_else(|| ProviderError::UserNotFound(id.clone()))?;
            account.identity.metadata.merge(patch);
            let identity = account.identity.clone();

            let refreshed = match inner.current.as_mut() {
                Some(current) if current.user_id() == id => {
                    current.identity = identity.clone();
                    Some(current.clone())
                }
                _ => None,
            };
            (identity, refreshed)
        };

        if let Some(session) = refreshed {
            self.publish(AuthEvent::user_updated(session));
        }
        Ok(identity)
    }
}
