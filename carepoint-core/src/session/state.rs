use crate::authz::{self, Role};
use crate::identity::{Identity, Session};

/// What the store currently knows about the signed-in user
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    /// Neither the initial fetch nor a provider event has landed yet
    #[default]
    Loading,
    SignedOut,
    SignedIn(Session),
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self, SessionState::SignedIn(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::SignedIn(session) => Some(session),
            _ => None,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.session().map(|s| &s.identity)
    }

    pub fn is_admin(&self) -> bool {
        authz::is_admin(self.identity())
    }

    pub fn role(&self) -> Role {
        Role::of(self.identity())
    }
}

impl From<Option<Session>> for SessionState {
    fn from(session: Option<Session>) -> Self {
        match session {
            Some(session) => SessionState::SignedIn(session),
            None => SessionState::SignedOut,
        }
    }
}
