//! Registration notification side-channel
//!
//! After a successful sign-up the session store hands the new user's id to
//! a [`RegistrationNotifier`] on a spawned task. Delivery is attempted at
//! most once; failures and timeouts are logged and go no further.

use async_trait::async_trait;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::identity::UserId;

mod inbox;

pub use inbox::{NotificationInbox, NotificationKind, NotificationRecord, NotificationRequest};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("Missing required parameters")]
    MissingParameters,

    #[error("User lookup failed: {0}")]
    UserLookup(String),

    #[error("Notification not found: {0}")]
    NotFound(Uuid),

    #[error("Notification delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("Notification service unavailable: {0}")]
    Unavailable(String),
}

/// Acknowledgement returned by a successful delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationReceipt {
    pub notification_id: Uuid,
    pub message: String,
}

#[async_trait]
pub trait RegistrationNotifier: Send + Sync {
    async fn notify_registration(&self, user_id: &UserId) -> Result<NotificationReceipt, NotificationError>;
}

/// Fire one delivery attempt in the background.
///
/// The returned handle is only useful to tests; callers on the sign-up
/// path drop it.
pub fn dispatch_registration(
    notifier: Arc<dyn RegistrationNotifier>,
    user_id: UserId,
    timeout: Duration,
) -> JoinHandle<()> {
    counter!("notifications.dispatched").increment(1);

    tokio::spawn(async move {
        let outcome = tokio::time::timeout(timeout, notifier.notify_registration(&user_id))
            .await
            .unwrap_or(Err(NotificationError::Timeout(timeout)));

        match outcome {
            Ok(receipt) => {
                counter!("notifications.delivered").increment(1);
                info!(
                    user_id = %user_id,
                    notification_id = %receipt.notification_id,
                    "Admin notification sent"
                );
            }
            Err(e) => {
                counter!("notifications.failed").increment(1);
                error!(user_id = %user_id, "Error sending admin notification: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Flaky {
        calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl RegistrationNotifier for Flaky {
        async fn notify_registration(&self, _user_id: &UserId) -> Result<NotificationReceipt, NotificationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Err(NotificationError::Unavailable("edge function down".into()))
        }
    }

    #[tokio::test]
    async fn test_failure_is_attempted_once_and_swallowed() {
        let notifier = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        });

        dispatch_registration(notifier.clone(), UserId::from("u-1"), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_delivery_times_out_without_retry() {
        let notifier = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
            delay: Duration::from_secs(60),
        });

        dispatch_registration(notifier.clone(), UserId::from("u-1"), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
    }
}
