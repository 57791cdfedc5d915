//! Session store
//!
//! Single source of truth for who, if anyone, is signed in. The current
//! [`SessionState`] lives in a `watch` channel: every write swaps the whole
//! value, so readers never see half an identity.
//!
//! Writers:
//! - the listener task spawned by [`SessionStore::initialize`], applying
//!   provider events (the authoritative path for every auth call)
//! - the initial session fetch, only while the store is still `Loading`
//! - [`SessionStore::sign_out`], which clears locally when the provider
//!   fails so the UI never keeps a session the user asked to drop

use metrics::counter;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast::error::RecvError, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::authz::{self, Role};
use crate::config::{AuthConfig, Config, NotificationConfig};
use crate::error::{AuthError, AuthResult};
use crate::feedback::{Toast, Toaster};
use crate::identity::{Credentials, Identity, Metadata, Session};
use crate::notification::{self, RegistrationNotifier};
use crate::provider::{AuthEvent, IdentityProvider};

mod admin;
mod state;

pub use admin::UserSummary;
pub use state::SessionState;

pub struct SessionStore {
    provider: Arc<dyn IdentityProvider>,
    notifier: Option<Arc<dyn RegistrationNotifier>>,
    auth: AuthConfig,
    notifications: NotificationConfig,
    toaster: Toaster,
    state: Arc<watch::Sender<SessionState>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionStore {
    pub fn new(provider: Arc<dyn IdentityProvider>, config: &Config) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self {
            provider,
            notifier: None,
            auth: config.auth.clone(),
            notifications: config.notifications.clone(),
            toaster: Toaster::default(),
            state: Arc::new(state),
            listener: Mutex::new(None),
        }
    }

    /// Side-channel invoked after every successful sign-up.
    pub fn with_notifier(mut self, notifier: Arc<dyn RegistrationNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_toaster(mut self, toaster: Toaster) -> Self {
        self.toaster = toaster;
        self
    }

    /// Subscribe to provider events, then fetch the current session once.
    ///
    /// The subscription is registered before the fetch starts, so no event
    /// can fall between the two. Calling this twice is a no-op.
    pub async fn initialize(&self) {
        {
            let mut listener = self.listener_slot();
            if listener.is_some() {
                warn!("session store already initialized");
                return;
            }
            let events = self.provider.subscribe();
            *listener = Some(tokio::spawn(listen(
                events,
                self.state.clone(),
                self.provider.clone(),
            )));
        }

        let initial = match self.provider.get_session().await {
            Ok(session) => session,
            Err(e) => {
                warn!("Initial session fetch failed: {}", e);
                None
            }
        };
        let applied = self.state.send_if_modified(|state| {
            if state.is_loading() {
                *state = SessionState::from(initial);
                true
            } else {
                false
            }
        });
        if !applied {
            debug!("initial session superseded by a newer event");
        }
    }

    /// Stop listening for provider events. The last state is kept.
    pub fn shutdown(&self) {
        if let Some(handle) = self.listener_slot().take() {
            handle.abort();
            debug!("session listener stopped");
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Change feed for views; the receiver starts at the current state.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn current_session(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    pub fn is_admin(&self) -> bool {
        authz::is_admin(self.state.borrow().identity())
    }

    pub fn role(&self) -> Role {
        self.state.borrow().role()
    }

    pub fn toaster(&self) -> &Toaster {
        &self.toaster
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Identity> {
        counter!("auth.sign_in.total").increment(1);

        let result = self.try_sign_in(email, password).await;
        match &result {
            Ok(_) => self.toaster.publish(Toast::success("Signed in successfully", "Welcome back!")),
            Err(e) => {
                counter!("auth.sign_in.failed").increment(1);
                warn!("Sign in failed: {}", e);
                self.toaster.publish(Toast::failure("Sign in failed", e.user_message()));
            }
        }
        result
    }

    async fn try_sign_in(&self, email: &str, password: &str) -> AuthResult<Identity> {
        self.ensure_listening()?;
        let credentials = Credentials::parse(email, password, self.auth.min_password_len)?;
        let session = self.provider.sign_in(&credentials).await?;

        let token = session.access_token.clone();
        self.settle("sign in", |state| {
            state.session().is_some_and(|s| s.access_token == token)
        })
        .await;

        Ok(session.identity)
    }

    /// Register a new account with `profile` as its initial metadata.
    ///
    /// The registration notification is spawned and never awaited; its
    /// outcome cannot change the result of this call.
    pub async fn sign_up(&self, email: &str, password: &str, profile: Metadata) -> AuthResult<Identity> {
        counter!("auth.sign_up.total").increment(1);

        let result = self.try_sign_up(email, password, profile).await;
        match &result {
            Ok(_) => self.toaster.publish(Toast::success(
                "Account created successfully",
                "Your account has been created. You can now sign in.",
            )),
            Err(e) => {
                counter!("auth.sign_up.failed").increment(1);
                warn!("Sign up failed: {}", e);
                self.toaster.publish(Toast::failure("Sign up failed", e.user_message()));
            }
        }
        result
    }

    async fn try_sign_up(&self, email: &str, password: &str, profile: Metadata) -> AuthResult<Identity> {
        self.ensure_listening()?;
        let credentials = Credentials::parse(email, password, self.auth.min_password_len)?;
        let outcome = self.provider.sign_up(&credentials, profile).await?;
        info!(user_id = %outcome.identity.id, "registration accepted");

        match &self.notifier {
            Some(notifier) if self.notifications.enabled => {
                notification::dispatch_registration(
                    notifier.clone(),
                    outcome.identity.id.clone(),
                    self.notifications.timeout,
                );
            }
            _ => debug!("registration notification disabled"),
        }

        if let Some(session) = &outcome.session {
            let token = session.access_token.clone();
            self.settle("sign up", |state| {
                state.session().is_some_and(|s| s.access_token == token)
            })
            .await;
        }

        Ok(outcome.identity)
    }

    /// Sign out. The local session is cleared even when the provider fails;
    /// the error is still returned so the UI can mention it.
    pub async fn sign_out(&self) -> AuthResult<()> {
        counter!("auth.sign_out.total").increment(1);

        match self.provider.sign_out().await {
            Ok(()) => {
                if !self.settle("sign out", |state| !state.is_signed_in()).await {
                    self.clear_local();
                }
                Ok(())
            }
            Err(e) => {
                let err = AuthError::from(e);
                counter!("auth.sign_out.failed").increment(1);
                warn!("Sign out failed, clearing local session: {}", err);
                self.toaster.publish(Toast::failure("Sign out failed", err.user_message()));
                self.clear_local();
                Err(err)
            }
        }
    }

    /// Merge `patch` into the signed-in user's metadata.
    pub async fn update_profile(&self, patch: Metadata) -> AuthResult<Identity> {
        counter!("auth.profile_update.total").increment(1);

        let result = self.try_update_profile(&patch).await;
        match &result {
            Ok(_) => self.toaster.publish(Toast::success(
                "Profile updated",
                "Your profile has been updated successfully",
            )),
            Err(e) => {
                counter!("auth.profile_update.failed").increment(1);
                warn!("Profile update failed: {}", e);
                self.toaster.publish(Toast::failure("Profile update failed", e.user_message()));
            }
        }
        result
    }

    async fn try_update_profile(&self, patch: &Metadata) -> AuthResult<Identity> {
        self.ensure_listening()?;
        if !self.state.borrow().is_signed_in() {
            return Err(AuthError::NotSignedIn);
        }
        let identity = self.provider.update_user(patch).await?;

        let user_id = identity.id.clone();
        self.settle("profile update", |state| {
            state
                .identity()
                .is_some_and(|i| i.id == user_id && i.metadata.contains_all(patch))
        })
        .await;

        Ok(identity)
    }

    /// Success is only reported once the listener has applied it, so calls
    /// that change the session are refused while no listener is running.
    fn ensure_listening(&self) -> AuthResult<()> {
        if self.listener_slot().is_none() {
            return Err(AuthError::Provider("Session store is not initialized".to_string()));
        }
        Ok(())
    }

    fn clear_local(&self) {
        self.state.send_if_modified(|state| {
            if state.is_signed_in() {
                *state = SessionState::SignedOut;
                true
            } else {
                false
            }
        });
    }

    /// Wait until the listener has applied a change matching `done`.
    ///
    /// Returns false on timeout or when no listener is running.
    async fn settle<F>(&self, operation: &str, done: F) -> bool
    where
        F: Fn(&SessionState) -> bool,
    {
        if self.listener_slot().is_none() {
            warn!(operation, "session store not initialized; state will not follow provider");
            return false;
        }

        let mut rx = self.state.subscribe();
        let reached = tokio::time::timeout(self.auth.settle_timeout, rx.wait_for(|s| done(s))).await;
        match reached {
            Ok(Ok(_)) => true,
            Ok(Err(_)) => false,
            Err(_) => {
                warn!(
                    operation,
                    timeout = ?self.auth.settle_timeout,
                    "provider event not applied in time"
                );
                false
            }
        }
    }

    fn listener_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.listener.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn listen(
    mut events: tokio::sync::broadcast::Receiver<AuthEvent>,
    state: Arc<watch::Sender<SessionState>>,
    provider: Arc<dyn IdentityProvider>,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                debug!(kind = ?event.kind, "applying auth event");
                state.send_replace(SessionState::from(event.session));
            }
            Err(RecvError::Lagged(missed)) => {
                warn!(missed, "auth events dropped, resynchronising session");
                match provider.get_session().await {
                    Ok(session) => {
                        state.send_replace(SessionState::from(session));
                    }
                    Err(e) => warn!("Session resync failed: {}", e),
                }
            }
            Err(RecvError::Closed) => {
                debug!("auth event channel closed");
                break;
            }
        }
    }
}
