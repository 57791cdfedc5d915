//! Admin notification inbox
//!
//! Server-side half of the side-channel: validates a registration request,
//! resolves the user through the identity provider's service-role API and
//! stores a record the back-office can list and acknowledge.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::{NotificationError, NotificationReceipt, RegistrationNotifier};
use crate::identity::UserId;
use crate::provider::IdentityProvider;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    UserRegistration,
    NewSignup,
    NewAppointment,
    Other(String),
}

impl NotificationKind {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationKind::UserRegistration => "user_registration",
            NotificationKind::NewSignup => "new_signup",
            NotificationKind::NewAppointment => "new_appointment",
            NotificationKind::Other(kind) => kind,
        }
    }

    /// Registration-style notifications share one icon in the admin inbox.
    pub fn is_signup(&self) -> bool {
        matches!(self, NotificationKind::UserRegistration | NotificationKind::NewSignup)
    }
}

impl From<String> for NotificationKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "user_registration" => NotificationKind::UserRegistration,
            "new_signup" => NotificationKind::NewSignup,
            "new_appointment" => NotificationKind::NewAppointment,
            _ => NotificationKind::Other(kind),
        }
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Absent for notices not tied to an account
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Raw request body, as posted by a client after registration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub user_id: String,
}

impl NotificationRequest {
    pub fn registration(user_id: &UserId) -> Self {
        Self {
            kind: NotificationKind::UserRegistration.to_string(),
            user_id: user_id.to_string(),
        }
    }
}

pub struct NotificationInbox {
    provider: Arc<dyn IdentityProvider>,
    records: RwLock<Vec<NotificationRecord>>,
}

impl NotificationInbox {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            records: RwLock::new(Vec::new()),
        }
    }

    pub async fn handle(&self, request: NotificationRequest) -> Result<NotificationReceipt, NotificationError> {
        if request.kind.trim().is_empty() || request.user_id.trim().is_empty() {
            return Err(NotificationError::MissingParameters);
        }

        let user_id = UserId(request.user_id);
        let user = self
            .provider
            .get_user(&user_id)
            .await
            .map_err(|e| NotificationError::UserLookup(e.to_string()))?;

        let kind = NotificationKind::from(request.kind);
        let message = format!("New user registered: {}", user.email);
        Ok(self.record(kind, Some(user_id), message).await)
    }

    /// Store a notification directly. `user_id` is `None` for notices that
    /// concern no account, such as a booking made at the front desk.
    pub async fn record(
        &self,
        kind: NotificationKind,
        user_id: Option<UserId>,
        message: impl Into<String>,
    ) -> NotificationReceipt {
        let record = NotificationRecord {
            id: Uuid::new_v4(),
            kind,
            user_id,
            message: message.into(),
            is_read: false,
            created_at: Utc::now(),
        };
        let receipt = NotificationReceipt {
            notification_id: record.id,
            message: record.message.clone(),
        };

        info!(
            kind = %record.kind,
            user_id = ?record.user_id.as_ref().map(UserId::as_str),
            "notification recorded"
        );
        self.records.write().await.push(record);

        receipt
    }

    /// All notifications, newest first.
    pub async fn list(&self) -> Vec<NotificationRecord> {
        let mut records: Vec<NotificationRecord> =
            self.records.read().await.iter().rev().cloned().collect();
        // Stable sort keeps insertion order (reversed) for equal timestamps.
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    pub async fn unread_count(&self) -> usize {
        self.records.read().await.iter().filter(|r| !r.is_read).count()
    }

    pub async fn mark_read(&self, id: Uuid) -> Result<(), NotificationError> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(NotificationError::NotFound(id))?;
        record.is_read = true;
        Ok(())
    }

    /// Returns how many notifications changed state.
    pub async fn mark_all_read(&self) -> usize {
        let mut records = self.records.write().await;
        let mut changed = 0;
        for record in records.iter_mut().filter(|r| !r.is_read) {
            record.is_read = true;
            changed += 1;
        }
        changed
    }
}

#[async_trait]
impl RegistrationNotifier for NotificationInbox {
    async fn notify_registration(&self, user_id: &UserId) -> Result<NotificationReceipt, NotificationError> {
        self.handle(NotificationRequest::registration(user_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::identity::Metadata;
    use crate::provider::InMemoryIdentityProvider;

    fn inbox_with_user() -> (NotificationInbox, UserId) {
        let provider = InMemoryIdentityProvider::new(&ProviderConfig::default());
        let user = provider
            .seed_account("pat@example.com", "secret1", Metadata::new())
            .unwrap();
        (NotificationInbox::new(Arc::new(provider)), user.id)
    }

    #[tokio::test]
    async fn test_registration_creates_unread_record() {
        let (inbox, user_id) = inbox_with_user();

        let receipt = inbox.notify_registration(&user_id).await.unwrap();

        assert_eq!(receipt.message, "New user registered: pat@example.com");
        let records = inbox.list().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, NotificationKind::UserRegistration);
        assert_eq!(records[0].user_id.as_ref(), Some(&user_id));
        assert!(!records[0].is_read);
    }

    #[tokio::test]
    async fn test_missing_parameters_rejected() {
        let (inbox, user_id) = inbox_with_user();

        let err = inbox
            .handle(NotificationRequest {
                kind: String::new(),
                user_id: user_id.to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, NotificationError::MissingParameters);
        assert_eq!(inbox.unread_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_user_is_lookup_error() {
        let (inbox, _) = inbox_with_user();
        let err = inbox.notify_registration(&UserId::from("ghost")).await.unwrap_err();
        assert!(matches!(err, NotificationError::UserLookup(_)));
    }

    #[tokio::test]
    async fn test_mark_read_and_mark_all() {
        let (inbox, user_id) = inbox_with_user();
        let first = inbox.notify_registration(&user_id).await.unwrap();
        inbox.notify_registration(&user_id).await.unwrap();
        inbox.notify_registration(&user_id).await.unwrap();

        inbox.mark_read(first.notification_id).await.unwrap();
        assert_eq!(inbox.unread_count().await, 2);

        assert_eq!(inbox.mark_all_read().await, 2);
        assert_eq!(inbox.unread_count().await, 0);

        let missing = Uuid::new_v4();
        assert_eq!(
            inbox.mark_read(missing).await.unwrap_err(),
            NotificationError::NotFound(missing)
        );
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let (inbox, user_id) = inbox_with_user();
        let first = inbox.notify_registration(&user_id).await.unwrap();
        let second = inbox.notify_registration(&user_id).await.unwrap();

        let ids: Vec<Uuid> = inbox.list().await.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.notification_id, first.notification_id]);
    }

    #[tokio::test]
    async fn test_record_without_user() {
        let (inbox, user_id) = inbox_with_user();
        inbox.notify_registration(&user_id).await.unwrap();

        let receipt = inbox
            .record(NotificationKind::NewAppointment, None, "Walk-in booked for 14:30")
            .await;

        let records = inbox.list().await;
        assert_eq!(records.len(), 2);
        let walk_in = records
            .iter()
            .find(|r| r.id == receipt.notification_id)
            .unwrap();
        assert_eq!(walk_in.user_id, None);
        assert!(!walk_in.kind.is_signup());
        assert_eq!(inbox.unread_count().await, 2);

        let json = serde_json::to_value(walk_in).unwrap();
        assert_eq!(json["type"], "new_appointment");
        assert!(json["user_id"].is_null());
    }

    #[test]
    fn test_request_body_shape() {
        let request: NotificationRequest =
            serde_json::from_str(r#"{"type":"user_registration","userId":"u-9"}"#).unwrap();
        assert_eq!(request.kind, "user_registration");
        assert_eq!(request.user_id, "u-9");

        let kind: NotificationKind = serde_json::from_str(r#""staff_rota""#).unwrap();
        assert_eq!(kind, NotificationKind::Other("staff_rota".to_string()));
        assert!(!kind.is_signup());
    }
}
