//! Identities and sessions as issued by the identity provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

mod credentials;
mod metadata;

pub use credentials::{CredentialError, Credentials, Email, Password};
pub use metadata::Metadata;

/// Opaque provider-issued user identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn generate() -> Self {
        UserId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

/// Authenticated user record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub email: String,
    #[serde(default, rename = "user_metadata")]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

/// Access token bound to an identity for one client run
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(rename = "user")]
    pub identity: Identity,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn user_id(&self) -> &UserId {
        &self.identity.id
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("identity", &self.identity)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_tolerates_missing_metadata() {
        let identity: Identity = serde_json::from_value(json!({
            "id": "u-1",
            "email": "a@b.com",
            "created_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert!(identity.metadata.is_empty());

        let identity: Identity = serde_json::from_value(json!({
            "id": "u-2",
            "email": "c@d.com",
            "user_metadata": "not-an-object",
            "created_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert!(identity.metadata.is_empty());
    }

    #[test]
    fn test_session_debug_hides_token() {
        let session = Session {
            access_token: "tok-secret".to_string(),
            identity: Identity {
                id: UserId::from("u-1"),
                email: "a@b.com".to_string(),
                metadata: Metadata::new(),
                created_at: Utc::now(),
            },
            expires_at: Utc::now(),
        };
        let printed = format!("{:?}", session);
        assert!(!printed.contains("tok-secret"));
        assert!(session.is_expired_at(session.expires_at));
    }
}
