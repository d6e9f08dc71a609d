//! Inbox notifications for artifact changes

use std::sync::Arc;

use crate::pod::{is_success, PodClient};
use crate::realtime::RealtimeManager;
use crate::types::Notification;

use super::registry::SubscriptionRegistry;

/// What happened to one change event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// No subscriber registered
    Skipped,
    /// Inbox accepted the notification; `pinged` listeners were told
    Delivered { pinged: usize },
    /// Inbox answered with a non-2xx status
    Rejected { status: u16 },
    /// Request never got an answer
    Failed { error: String },
}

/// Posts an `Update` to the subscriber's inbox and pings realtime listeners
///
/// Each call is one attempt. Failures are logged and dropped; the next
/// change produces a fresh notification.
pub struct Notifier {
    pod: Arc<dyn PodClient>,
    registry: Arc<SubscriptionRegistry>,
    realtime: RealtimeManager,
    /// Remote URL of the watched artifact, sent as the notification object
    object_url: String,
    summary: String,
}

impl Notifier {
    pub fn new(
        pod: Arc<dyn PodClient>,
        registry: Arc<SubscriptionRegistry>,
        realtime: RealtimeManager,
        object_url: impl Into<String>,
        artifact_name: &str,
    ) -> Self {
        Self {
            pod,
            registry,
            realtime,
            object_url: object_url.into(),
            summary: format!("{} was updated", artifact_name),
        }
    }

    /// Notification for a change happening now
    pub fn build_notification(&self) -> Notification {
        Notification::update(self.pod.web_id(), &self.object_url, self.summary.clone())
    }

    /// Notify the current subscriber about one change
    pub async fn notify(&self) -> NotifyOutcome {
        let Some(inbox) = self.registry.current() else {
            tracing::warn!("No client inbox registered; skipping notification");
            return NotifyOutcome::Skipped;
        };

        let notification = self.build_notification();
        let body = match serde_json::to_value(&notification) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Error encoding notification: {}", e);
                return NotifyOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        match self.pod.post_json_ld(&inbox, &body).await {
            Ok(status) if is_success(status) => {
                tracing::info!("Notification sent to inbox {}", inbox);
                let pinged = self.realtime.broadcast_ping();
                NotifyOutcome::Delivered { pinged }
            }
            Ok(status) => {
                tracing::error!("Failed to POST notification to {}: {}", inbox, status);
                NotifyOutcome::Rejected { status }
            }
            Err(e) => {
                tracing::error!("Error sending notification to {}: {}", inbox, e);
                NotifyOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pod::MemoryPod;
    use crate::realtime::RealtimeEvent;

    const SERVER: &str = "https://server.example/profile#me";
    const INBOX: &str = "https://client.example/inbox/";
    const OBJECT: &str = "https://server.example/files/weights.bin";

    fn setup() -> (MemoryPod, Arc<SubscriptionRegistry>, RealtimeManager, Notifier) {
        let pod = MemoryPod::new(SERVER);
        pod.add_container(INBOX);
        let registry = Arc::new(SubscriptionRegistry::new(SERVER));
        let realtime = RealtimeManager::new();
        let notifier = Notifier::new(
            Arc::new(pod.clone()),
            Arc::clone(&registry),
            realtime.clone(),
            OBJECT,
            "weights.bin",
        );
        (pod, registry, realtime, notifier)
    }

    #[tokio::test]
    async fn test_no_subscriber_skips_without_request() {
        let (pod, _registry, _realtime, notifier) = setup();
        assert_eq!(notifier.notify().await, NotifyOutcome::Skipped);
        assert!(pod.state().posts.is_empty());
    }

    #[tokio::test]
    async fn test_delivery_posts_update_and_pings() {
        let (pod, registry, realtime, notifier) = setup();
        registry.register(Some(INBOX)).unwrap();
        let mut listener = realtime.subscribe();

        assert_eq!(
            notifier.notify().await,
            NotifyOutcome::Delivered { pinged: 1 }
        );
        assert_eq!(listener.recv().await.unwrap(), RealtimeEvent::Ping);

        let posts = pod.posts_to(INBOX);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0]["type"], "Update");
        assert_eq!(posts[0]["actor"], SERVER);
        assert_eq!(posts[0]["object"], OBJECT);
        assert_eq!(posts[0]["summary"], "weights.bin was updated");
    }

    #[tokio::test]
    async fn test_rejected_delivery_does_not_ping() {
        let (pod, registry, realtime, notifier) = setup();
        registry.register(Some(INBOX)).unwrap();
        pod.state().post_status = 403;
        let mut listener = realtime.subscribe();

        assert_eq!(
            notifier.notify().await,
            NotifyOutcome::Rejected { status: 403 }
        );
        assert!(listener.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unreachable_inbox_is_logged_not_raised() {
        let (pod, registry, _realtime, notifier) = setup();
        registry.register(Some(INBOX)).unwrap();
        pod.state().unreachable = true;

        assert!(matches!(
            notifier.notify().await,
            NotifyOutcome::Failed { .. }
        ));
    }

    #[tokio::test]
    async fn test_only_latest_subscriber_is_notified() {
        let (pod, registry, _realtime, notifier) = setup();
        let other = "https://other.example/inbox/";
        pod.add_container(other);

        registry.register(Some(other)).unwrap();
        registry.register(Some(INBOX)).unwrap();
        notifier.notify().await;

        assert!(pod.posts_to(other).is_empty());
        assert_eq!(pod.posts_to(INBOX).len(), 1);
    }
}
