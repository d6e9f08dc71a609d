//! Artifact change detection
//!
//! Watches the artifact's parent directory (non-recursively) so the file is
//! picked up even if it does not exist yet, and forwards add/modify events
//! for the artifact itself into a tokio channel. Pre-existing state never
//! produces an event. One write usually raises several raw events (create,
//! then data), so bursts are folded into a single change.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::notifier::Notifier;
use crate::error::{PodNotifyError, Result};

/// Quiet period that ends a burst of raw events
pub const COALESCE_WINDOW: Duration = Duration::from_millis(100);

/// A change to the watched artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactChange {
    /// File appeared (created or renamed into place)
    Added,
    /// File content changed
    Modified,
}

/// Map a notify event kind onto an artifact change, if it is one
pub fn classify(kind: &EventKind) -> Option<ArtifactChange> {
    match kind {
        EventKind::Create(_) => Some(ArtifactChange::Added),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(ArtifactChange::Added),
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            Some(ArtifactChange::Modified)
        }
        _ => None,
    }
}

/// Watches one file and yields its changes
pub struct ArtifactWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<ArtifactChange>,
}

impl std::fmt::Debug for ArtifactWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactWatcher").finish_non_exhaustive()
    }
}

impl ArtifactWatcher {
    /// Start watching `path`
    pub fn start(path: &Path) -> Result<Self> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        let file_name: OsString = path
            .file_name()
            .ok_or_else(|| {
                PodNotifyError::Config(format!("{} does not name a file", path.display()))
            })?
            .to_os_string();
        let dir: PathBuf = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    let Some(change) = classify(&event.kind) else {
                        return;
                    };
                    if event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == Some(file_name.as_os_str()))
                    {
                        let _ = tx.send(change);
                    }
                }
                Err(e) => tracing::error!("Watcher error: {}", e),
            }
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!("Watching {} for changes", path.display());
        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Next raw change, or `None` once the watcher is gone
    pub async fn next(&mut self) -> Option<ArtifactChange> {
        self.rx.recv().await
    }

    /// Next change, folding in every event that follows within `quiet`
    ///
    /// `Added` wins over `Modified` when both occur in one burst.
    pub async fn next_coalesced(&mut self, quiet: Duration) -> Option<ArtifactChange> {
        let mut change = self.rx.recv().await?;
        while let Ok(Some(more)) = tokio::time::timeout(quiet, self.rx.recv()).await {
            if more == ArtifactChange::Added {
                change = more;
            }
        }
        Some(change)
    }
}

/// Notify once per change burst until the watcher stops
///
/// Each notification runs as its own task, so a stalled inbox never delays
/// the handling of later changes.
pub async fn run(mut watcher: ArtifactWatcher, notifier: Arc<Notifier>) {
    while let Some(change) = watcher.next_coalesced(COALESCE_WINDOW).await {
        tracing::info!("Artifact {:?}", change);
        let notifier = Arc::clone(&notifier);
        tokio::spawn(async move {
            notifier.notify().await;
        });
    }
    tracing::info!("Artifact watcher stopped");
}

/// Start watching `path` and notify through `notifier` in the background
///
/// The watch is in place when this returns, so changes made right after are
/// not missed.
pub fn spawn_watch(path: &Path, notifier: Arc<Notifier>) -> Result<JoinHandle<()>> {
    let watcher = ArtifactWatcher::start(path)?;
    Ok(tokio::spawn(run(watcher, notifier)))
}
