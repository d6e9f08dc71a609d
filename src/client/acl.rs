//! Granting the notifier access to the inbox

use crate::error::{PodNotifyError, Result};
use crate::pod::{AclRelation, PodClient};
use crate::types::{AccessModes, GrantScope};

/// Give `agent` read+append on `container_url`
///
/// Tries a grant that children inherit first. Some pods refuse `acl:default`
/// entries for certain containers; any failure there is logged and a
/// resource-only grant is attempted once on a freshly fetched ACL. Only a
/// failure of that second attempt is returned.
pub async fn grant_inbox_access(
    pod: &dyn PodClient,
    container_url: &str,
    agent: &str,
) -> Result<GrantScope> {
    match grant(pod, container_url, agent, true).await {
        Ok(()) => {
            tracing::info!("Granted inherited access for {}", agent);
            Ok(GrantScope::Inherited)
        }
        Err(e) => {
            tracing::warn!("ACL inheritance failed, falling back: {}", e);
            grant(pod, container_url, agent, false)
                .await
                .map_err(|e| {
                    PodNotifyError::Acl(format!(
                        "could not grant {} access to {}: {}",
                        agent, container_url, e
                    ))
                })?;
            tracing::info!("Granted resource-only access for {}", agent);
            Ok(GrantScope::ResourceOnly)
        }
    }
}

async fn grant(
    pod: &dyn PodClient,
    container_url: &str,
    agent: &str,
    inherit: bool,
) -> Result<()> {
    let mut acl = pod.fetch_acl(container_url).await?;
    acl.set_agent_access(agent, AccessModes::READ_APPEND, AclRelation::Resource);
    if inherit {
        acl.set_agent_access(agent, AccessModes::READ_APPEND, AclRelation::Default);
    }
    pod.save_acl(&acl).await
}
