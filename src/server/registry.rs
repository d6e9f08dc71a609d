//! Subscriber registration

use parking_lot::RwLock;

use crate::error::{PodNotifyError, Result};

/// Holds the one inbox that receives notifications
///
/// A new registration replaces the previous one. Sends already in flight keep
/// the inbox they read.
#[derive(Debug)]
pub struct SubscriptionRegistry {
    server_id: String,
    inbox: RwLock<Option<String>>,
}

impl SubscriptionRegistry {
    /// Empty registry for a server known as `server_id`
    pub fn new(server_id: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            inbox: RwLock::new(None),
        }
    }

    /// WebID handed back to subscribers
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// Store `inbox` as the subscriber, returning the server's WebID
    ///
    /// A missing or blank inbox is rejected and leaves the current
    /// subscriber in place.
    pub fn register(&self, inbox: Option<&str>) -> Result<String> {
        let inbox = inbox
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PodNotifyError::InvalidInput("Missing inbox URL".to_string()))?;

        *self.inbox.write() = Some(inbox.to_string());
        Ok(self.server_id.clone())
    }

    /// Currently registered inbox
    pub fn current(&self) -> Option<String> {
        self.inbox.read().clone()
    }

    /// Forget the subscriber
    pub fn clear(&self) {
        *self.inbox.write() = None;
    }
}
