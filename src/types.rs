//! Core types for podnotify

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ActivityStreams context used on every notification
pub const ACTIVITY_STREAMS_CONTEXT: &str = "https://www.w3.org/ns/activitystreams";

/// Default OIDC issuer shared by client and server
pub const DEFAULT_OIDC_ISSUER: &str = "https://solidcommunity.net";

/// Content type for notifications posted to an inbox
pub const LD_JSON: &str = "application/ld+json";

/// Content type used when overwriting the remote artifact
pub const OCTET_STREAM: &str = "application/octet-stream";

/// An ActivityStreams `Update` announcing that a resource changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    #[serde(rename = "type")]
    pub kind: String,
    /// WebID of the notifying agent
    pub actor: String,
    /// URL of the changed resource
    pub object: String,
    pub summary: String,
    pub published: DateTime<Utc>,
}

impl Notification {
    /// Build an `Update` notification stamped with the current time
    pub fn update(actor: &str, object: &str, summary: impl Into<String>) -> Self {
        Self::update_at(actor, object, summary, Utc::now())
    }

    /// Build an `Update` notification with an explicit timestamp
    pub fn update_at(
        actor: &str,
        object: &str,
        summary: impl Into<String>,
        published: DateTime<Utc>,
    ) -> Self {
        Self {
            context: vec![ACTIVITY_STREAMS_CONTEXT.to_string()],
            kind: "Update".to_string(),
            actor: actor.to_string(),
            object: object.to_string(),
            summary: summary.into(),
            published,
        }
    }
}

/// Body of `POST /subscribe`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub inbox: Option<String>,
}

/// Capability tuple of a WAC authorization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessModes {
    pub read: bool,
    pub append: bool,
    pub write: bool,
    pub control: bool,
}

impl AccessModes {
    /// Read and append only; what a notifier needs on someone else's inbox
    pub const READ_APPEND: AccessModes = AccessModes {
        read: true,
        append: true,
        write: false,
        control: false,
    };

    /// Everything, used for the owner of a freshly created ACL
    pub const FULL: AccessModes = AccessModes {
        read: true,
        append: true,
        write: true,
        control: true,
    };

    /// True when no capability is granted
    pub fn is_empty(&self) -> bool {
        !(self.read || self.append || self.write || self.control)
    }
}

/// Which kind of grant the ACL routine ended up applying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantScope {
    /// Direct access plus default access inherited by children
    Inherited,
    /// Direct access to the container only
    ResourceOnly,
}

/// Client-credentials pair for the pod identity provider
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub oidc_issuer: String,
}

impl Credentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        oidc_issuer: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            oidc_issuer: oidc_issuer.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("oidc_issuer", &self.oidc_issuer)
            .finish()
    }
}

/// Server process configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for HTTP routes and the `/ws` endpoint
    pub port: u16,
    /// Root container on the server's pod, ending in `/`
    pub pod_root: String,
    /// Local artifact that is watched and mirrored to the pod
    pub artifact_path: PathBuf,
}

impl ServerConfig {
    /// File name of the artifact, used for the remote path and summaries
    pub fn artifact_name(&self) -> String {
        self.artifact_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "weights.bin".to_string())
    }

    /// Remote URL the artifact is mirrored to
    pub fn remote_artifact_url(&self) -> String {
        let root = if self.pod_root.ends_with('/') {
            self.pod_root.clone()
        } else {
            format!("{}/", self.pod_root)
        };
        format!("{}{}", root, self.artifact_name())
    }
}

/// Reconnect behavior of the client's realtime listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Log the disconnect and stay in poll-only mode
    Manual,
    /// Reconnect after a fixed delay, forever
    FixedBackoff(Duration),
}

impl ReconnectPolicy {
    /// `0` means manual restart
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            ReconnectPolicy::Manual
        } else {
            ReconnectPolicy::FixedBackoff(Duration::from_millis(ms))
        }
    }
}

/// Client process configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the notifying server
    pub server_url: String,
    /// Inbox container on the client's pod
    pub inbox_url: String,
    /// Timer loop period
    pub poll_interval: Duration,
    pub reconnect: ReconnectPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_notification_shape() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let n = Notification::update_at(
            "https://server.example/profile#me",
            "https://server.example/files/weights.bin",
            "weights.bin was updated",
            at,
        );
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(
            json["@context"],
            serde_json::json!(["https://www.w3.org/ns/activitystreams"])
        );
        assert_eq!(json["type"], "Update");
        assert_eq!(json["actor"], "https://server.example/profile#me");
        assert_eq!(json["object"], "https://server.example/files/weights.bin");
        assert_eq!(json["published"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn test_remote_artifact_url() {
        let config = ServerConfig {
            port: 4000,
            pod_root: "https://server.example/files".into(),
            artifact_path: PathBuf::from("/tmp/weights.bin"),
        };
        assert_eq!(
            config.remote_artifact_url(),
            "https://server.example/files/weights.bin"
        );
    }

    #[test]
    fn test_subscribe_request_missing_inbox() {
        let req: SubscribeRequest = serde_json::from_str("{}").unwrap();
        assert!(req.inbox.is_none());
    }

    #[test]
    fn test_reconnect_policy_from_millis() {
        assert_eq!(ReconnectPolicy::from_millis(0), ReconnectPolicy::Manual);
        assert_eq!(
            ReconnectPolicy::from_millis(500),
            ReconnectPolicy::FixedBackoff(Duration::from_millis(500))
        );
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials::new("id", "s3cret", DEFAULT_OIDC_ISSUER);
        assert!(!format!("{:?}", creds).contains("s3cret"));
    }
}
