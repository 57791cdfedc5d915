//! Back-office user management. Every call is gated on the administrator
//! flag derived from the current session, never on caller-supplied state.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::SessionStore;
use crate::authz::{self, ADMIN_FLAG_KEY};
use crate::error::{AuthError, AuthResult};
use crate::feedback::Toast;
use crate::identity::{Identity, Metadata, UserId};

/// One row of the admin user table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    pub is_admin: bool,
}

impl From<&Identity> for UserSummary {
    fn from(identity: &Identity) -> Self {
        let first = identity.metadata.get_str("firstName").unwrap_or("");
        let last = identity.metadata.get_str("lastName").unwrap_or("");
        let full_name = format!("{} {}", first, last).trim().to_string();

        Self {
            id: identity.id.clone(),
            email: identity.email.clone(),
            full_name: if full_name.is_empty() {
                "No name provided".to_string()
            } else {
                full_name
            },
            is_admin: authz::is_admin(Some(identity)),
        }
    }
}

impl SessionStore {
    fn require_admin(&self, action: &str) -> AuthResult<()> {
        let state = self.state.borrow();
        if !state.is_signed_in() {
            return Err(AuthError::NotSignedIn);
        }
        if !state.is_admin() {
            return Err(AuthError::PermissionDenied(format!(
                "administrator role required to {}",
                action
            )));
        }
        Ok(())
    }

    pub async fn list_users(&self) -> AuthResult<Vec<UserSummary>> {
        self.require_admin("list users")?;
        let result = self.provider.list_users().await;
        match result {
            Ok(users) => Ok(users.iter().map(UserSummary::from).collect()),
            Err(e) => {
                let err = AuthError::from(e);
                self.toaster
                    .publish(Toast::failure("Failed to load users", err.user_message()));
                Err(err)
            }
        }
    }

    /// Grant or revoke the administrator flag on another account.
    pub async fn set_admin_status(&self, user_id: &UserId, is_admin: bool) -> AuthResult<UserSummary> {
        let result = self.try_set_admin_status(user_id, is_admin).await;
        match &result {
            Ok(_) => {
                let description = if is_admin {
                    "User is now an admin"
                } else {
                    "User is no longer an admin"
                };
                self.toaster.publish(Toast::success("Admin status updated", description));
            }
            Err(e) => {
                warn!(user_id = %user_id, "Admin status update failed: {}", e);
                self.toaster
                    .publish(Toast::failure("Admin status update failed", e.user_message()));
            }
        }
        result
    }

    async fn try_set_admin_status(&self, user_id: &UserId, is_admin: bool) -> AuthResult<UserSummary> {
        self.require_admin("change admin status")?;

        let patch = Metadata::new().with(ADMIN_FLAG_KEY, is_admin);
        let identity = self.provider.admin_update_metadata(user_id, &patch).await?;
        info!(user_id = %user_id, is_admin, "admin status changed");

        let own_account = self
            .state
            .borrow()
            .identity()
            .is_some_and(|current| &current.id == user_id);
        if own_account {
            self.settle("admin status update", |state| {
                state
                    .identity()
                    .is_some_and(|i| &i.id == user_id && i.metadata.contains_all(&patch))
            })
            .await;
        }

        Ok(UserSummary::from(&identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_summary_names() {
        let mut identity = Identity {
            id: UserId::from("u-1"),
            email: "a@b.com".to_string(),
            metadata: Metadata::new().with("firstName", "Grace"),
            created_at: Utc::now(),
        };
        assert_eq!(UserSummary::from(&identity).full_name, "Grace");

        identity.metadata = Metadata::new();
        let summary = UserSummary::from(&identity);
        assert_eq!(summary.full_name, "No name provided");
        assert!(!summary.is_admin);
    }
}
