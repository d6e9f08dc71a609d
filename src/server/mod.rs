//! Notifying server
//!
//! Owns a local artifact, watches it, and on every change posts an
//! ActivityStreams `Update` to the single registered subscriber inbox.
//! Successful deliveries are followed by a `ping` to every realtime
//! listener, whether or not it belongs to the subscriber.

mod artifact;
mod notifier;
mod registry;
mod routes;
mod watcher;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

pub use artifact::Artifact;
pub use notifier::{Notifier, NotifyOutcome};
pub use registry::SubscriptionRegistry;
pub use routes::{router, AppState};
pub use watcher::{classify, spawn_watch, ArtifactChange, ArtifactWatcher, COALESCE_WINDOW};

use crate::error::Result;
use crate::pod::PodClient;
use crate::realtime::RealtimeManager;
use crate::types::ServerConfig;

/// Server wiring: routes, realtime endpoint and artifact watcher
pub struct NotifyServer {
    config: ServerConfig,
    state: AppState,
    notifier: Arc<Notifier>,
}

impl NotifyServer {
    /// Wire a server around an authenticated pod client
    pub fn new(config: ServerConfig, pod: Arc<dyn PodClient>) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new(pod.web_id()));
        let realtime = RealtimeManager::new();
        let remote_url = config.remote_artifact_url();

        let notifier = Arc::new(Notifier::new(
            Arc::clone(&pod),
            Arc::clone(&registry),
            realtime.clone(),
            remote_url.clone(),
            &config.artifact_name(),
        ));
        let state = AppState {
            registry,
            pod,
            artifact: Arc::new(Artifact::new(config.artifact_path.clone(), remote_url)),
            realtime,
        };

        Self {
            config,
            state,
            notifier,
        }
    }

    /// Route state, shared with the notifier
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve until `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let watch_task = spawn_watch(&self.config.artifact_path, Arc::clone(&self.notifier))?;

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on port {}", self.config.port);

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await?;

        watch_task.abort();
        Ok(())
    }
}
