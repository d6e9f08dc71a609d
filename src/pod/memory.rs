//! In-memory pod
//!
//! Behaves like a tiny pod: containers hold resources, POSTs to a container
//! create a new member, ACLs are stored per resource. Every request is
//! recorded so callers can inspect what was sent. Several handles with
//! different identities can share one pod via [`MemoryPod::as_agent`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;
use uuid::Uuid;

use super::acl::{AclDocument, AclRelation};
use super::{is_success, PodClient};
use crate::error::{PodNotifyError, Result};

/// Shared contents and request log of a [`MemoryPod`]
#[derive(Debug)]
pub struct MemoryPodState {
    pub containers: HashMap<String, BTreeSet<String>>,
    pub acls: HashMap<String, AclDocument>,
    pub files: HashMap<String, (Vec<u8>, String)>,
    /// Every JSON-LD and JSON POST as `(url, body)`
    pub posts: Vec<(String, Value)>,
    /// Every ACL save attempt, including rejected ones
    pub acl_saves: Vec<AclDocument>,
    pub acl_fetches: usize,
    pub listing_fetches: usize,
    /// Status answered to JSON-LD POSTs
    pub post_status: u16,
    /// Fail JSON-LD POSTs at the transport level
    pub unreachable: bool,
    /// Reject ACL saves granting inherited (`acl:default`) access to another agent
    pub reject_default_acl: bool,
    /// Reject every ACL save
    pub reject_all_acl: bool,
    /// Canned `(status, body)` for plain JSON POSTs, by URL
    pub json_responses: HashMap<String, (u16, String)>,
}

impl Default for MemoryPodState {
    fn default() -> Self {
        Self {
            containers: HashMap::new(),
            acls: HashMap::new(),
            files: HashMap::new(),
            posts: Vec::new(),
            acl_saves: Vec::new(),
            acl_fetches: 0,
            listing_fetches: 0,
            post_status: 201,
            unreachable: false,
            reject_default_acl: false,
            reject_all_acl: false,
            json_responses: HashMap::new(),
        }
    }
}

/// A [`PodClient`] backed by process memory
#[derive(Debug, Clone)]
pub struct MemoryPod {
    web_id: String,
    state: Arc<Mutex<MemoryPodState>>,
}

impl MemoryPod {
    /// Empty pod, acting as `web_id`
    pub fn new(web_id: impl Into<String>) -> Self {
        Self {
            web_id: web_id.into(),
            state: Arc::new(Mutex::new(MemoryPodState::default())),
        }
    }

    /// Another handle on the same pod acting as a different agent
    pub fn as_agent(&self, web_id: impl Into<String>) -> Self {
        Self {
            web_id: web_id.into(),
            state: Arc::clone(&self.state),
        }
    }

    /// Lock the pod for inspection or setup
    pub fn state(&self) -> MutexGuard<'_, MemoryPodState> {
        self.state.lock()
    }

    /// Create an empty container
    pub fn add_container(&self, url: &str) {
        self.state.lock().containers.entry(url.to_string()).or_default();
    }

    /// Put a resource into a container
    pub fn add_resource(&self, container: &str, url: &str) {
        self.state
            .lock()
            .containers
            .entry(container.to_string())
            .or_default()
            .insert(url.to_string());
    }

    /// Remove a resource from a container
    pub fn remove_resource(&self, container: &str, url: &str) {
        if let Some(members) = self.state.lock().containers.get_mut(container) {
            members.remove(url);
        }
    }

    /// JSON-LD and JSON POSTs sent to `url`
    pub fn posts_to(&self, url: &str) -> Vec<Value> {
        self.state
            .lock()
            .posts
            .iter()
            .filter(|(target, _)| target == url)
            .map(|(_, body)| body.clone())
            .collect()
    }
}

fn acl_url_for(resource_url: &str) -> String {
    format!("{}.acl", resource_url)
}

#[async_trait]
impl PodClient for MemoryPod {
    fn web_id(&self) -> &str {
        &self.web_id
    }

    async fn fetch_container_listing(&self, container_url: &str) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        state.listing_fetches += 1;
        state
            .containers
            .get(container_url)
            .map(|members| members.iter().cloned().collect())
            .ok_or_else(|| PodNotifyError::Pod {
                status: 404,
                url: container_url.to_string(),
            })
    }

    async fn fetch_acl(&self, resource_url: &str) -> Result<AclDocument> {
        let mut state = self.state.lock();
        state.acl_fetches += 1;
        Ok(state.acls.get(resource_url).cloned().unwrap_or_else(|| {
            AclDocument::for_owner(acl_url_for(resource_url), resource_url, &self.web_id)
        }))
    }

    async fn save_acl(&self, acl: &AclDocument) -> Result<()> {
        let mut state = self.state.lock();
        state.acl_saves.push(acl.clone());
        // A real pod receives Turtle, so refuse whatever cannot be written
        acl.to_turtle()?;

        // Only defaults handed to other agents count; the owner's are always kept
        let grants_foreign_default = acl.authorizations.iter().any(|auth| {
            auth.agents.iter().any(|agent| {
                agent != &self.web_id && !acl.agent_access(agent, AclRelation::Default).is_empty()
            })
        });
        if state.reject_all_acl || (state.reject_default_acl && grants_foreign_default) {
            return Err(PodNotifyError::Pod {
                status: 400,
                url: acl.acl_url.clone(),
            });
        }

        state.acls.insert(acl.resource_url.clone(), acl.clone());
        Ok(())
    }

    async fn overwrite_file(
        &self,
        url: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        self.state
            .lock()
            .files
            .insert(url.to_string(), (content, content_type.to_string()));
        Ok(())
    }

    async fn post_json_ld(&self, url: &str, body: &Value) -> Result<u16> {
        let mut state = self.state.lock();
        if state.unreachable {
            return Err(PodNotifyError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("{} unreachable", url),
            )));
        }
        state.posts.push((url.to_string(), body.clone()));

        let status = state.post_status;
        if is_success(status) {
            if let Some(members) = state.containers.get_mut(url) {
                members.insert(format!("{}{}", url, Uuid::new_v4()));
            }
        }
        Ok(status)
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<(u16, String)> {
        let mut state = self.state.lock();
        state.posts.push((url.to_string(), body.clone()));
        Ok(state
            .json_responses
            .get(url)
            .cloned()
            .unwrap_or((404, "Not Found".to_string())))
    }
}
