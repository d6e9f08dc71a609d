//! Access to Solid-style pods
//!
//! Everything the client and server need from a pod goes through the
//! [`PodClient`] trait, so the notification and ACL logic can be driven
//! against an in-memory pod in tests (`test-util` feature).
//! [`SolidSession`] is the HTTP implementation authenticated with client
//! credentials.

pub mod acl;
mod container;
mod jsonld;
#[cfg(any(test, feature = "test-util"))]
mod memory;
mod session;

use async_trait::async_trait;
use serde_json::Value;

pub use acl::{is_safe_iri, AclDocument, AclRelation, AclTerm, Authorization};
pub use container::contained_resources;
#[cfg(any(test, feature = "test-util"))]
pub use memory::{MemoryPod, MemoryPodState};
pub use session::{decode_web_id, parse_link_header, SolidSession};

use crate::error::Result;

/// Operations the notifier and inbox watcher perform against a pod
#[async_trait]
pub trait PodClient: Send + Sync {
    /// WebID of the authenticated agent
    fn web_id(&self) -> &str;

    /// URLs of the resources contained in a container
    async fn fetch_container_listing(&self, container_url: &str) -> Result<Vec<String>>;

    /// ACL of a resource; a fresh document when the resource has none of its own
    async fn fetch_acl(&self, resource_url: &str) -> Result<AclDocument>;

    /// Persist an ACL document
    async fn save_acl(&self, acl: &AclDocument) -> Result<()>;

    /// Replace a resource's content
    async fn overwrite_file(&self, url: &str, content: Vec<u8>, content_type: &str)
        -> Result<()>;

    /// POST a JSON-LD document; returns the response status
    async fn post_json_ld(&self, url: &str, body: &Value) -> Result<u16>;

    /// POST plain JSON; returns the response status and body text
    async fn post_json(&self, url: &str, body: &Value) -> Result<(u16, String)>;
}

/// Check for a 2xx status
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}
