//! User-visible toasts emitted by the session store.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastVariant {
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
}

impl Toast {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Default,
        }
    }

    pub fn failure(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Destructive,
        }
    }
}

/// Fan-out of toasts to whatever UI is listening. Publishing with no
/// listeners is fine; the toast is simply dropped.
#[derive(Debug, Clone)]
pub struct Toaster {
    tx: broadcast::Sender<Toast>,
}

impl Toaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.tx.subscribe()
    }

    pub fn publish(&self, toast: Toast) {
        trace!(title = %toast.title, "toast");
        let _ = self.tx.send(toast);
    }
}

impl Default for Toaster {
    fn default() -> Self {
        Self::new(32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let toaster = Toaster::default();
        let mut rx = toaster.subscribe();

        toaster.publish(Toast::failure("Sign in failed", "Invalid login credentials"));

        let toast = rx.recv().await.unwrap();
        assert_eq!(toast.variant, ToastVariant::Destructive);
        assert_eq!(toast.title, "Sign in failed");
    }

    #[test]
    fn test_publish_without_listeners_is_silent() {
        Toaster::new(1).publish(Toast::success("Profile updated", ""));
    }
}
