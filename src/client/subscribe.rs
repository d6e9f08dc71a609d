//! Subscribing to a notifying server

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::acl::grant_inbox_access;
use crate::error::{PodNotifyError, Result};
use crate::pod::{is_safe_iri, is_success, PodClient};
use crate::types::GrantScope;

/// Result of a completed subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// WebID the server will post notifications as
    pub server_id: String,
    /// How far the ACL grant reached
    pub grant: GrantScope,
}

/// The server's answer must be an absolute http(s) IRI that can go into an ACL as is
fn parse_web_id(body: &str) -> Result<String> {
    if body.is_empty() {
        return Err(PodNotifyError::InvalidInput(
            "server answered without a WebID".to_string(),
        ));
    }
    let invalid = || {
        PodNotifyError::InvalidInput(format!("server WebID {:?} is not an http(s) IRI", body))
    };
    if !is_safe_iri(body) {
        return Err(invalid());
    }
    let url = Url::parse(body).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }
    Ok(body.to_string())
}

/// Register `inbox_url` with the server and let it write there
///
/// A non-2xx answer from the server and a failed fallback grant are both
/// returned as errors; an inheriting grant that fails on its own is not.
pub async fn subscribe(
    pod: &dyn PodClient,
    server_url: &str,
    inbox_url: &str,
) -> Result<Subscription> {
    let url = format!("{}/subscribe", server_url.trim_end_matches('/'));
    let (status, body) = pod.post_json(&url, &json!({ "inbox": inbox_url })).await?;
    if !is_success(status) {
        return Err(PodNotifyError::Subscription(status));
    }

    let server_id = parse_web_id(body.trim())?;
    tracing::info!("Subscribed OK, server WebID: {}", server_id);

    let grant = grant_inbox_access(pod, inbox_url, &server_id).await?;
    Ok(Subscription { server_id, grant })
}
