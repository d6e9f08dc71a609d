//! The local artifact mirrored to the server's pod

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::pod::PodClient;
use crate::types::OCTET_STREAM;

/// Local file plus the pod location it is mirrored to
#[derive(Debug, Clone)]
pub struct Artifact {
    path: PathBuf,
    remote_url: String,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, remote_url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            remote_url: remote_url.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remote_url(&self) -> &str {
        &self.remote_url
    }

    /// Touch the artifact and push its full contents to the pod
    ///
    /// Appends an `# updated at <timestamp>` line (creating the file if
    /// needed), which the watcher sees as a change, then overwrites the
    /// remote copy as `application/octet-stream`.
    pub async fn simulate_update(&self, pod: &dyn PodClient) -> Result<()> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("\n# updated at {}", now).as_bytes())
            .await?;
        file.flush().await?;
        drop(file);
        tracing::info!("{} touched at {}", self.path.display(), now);

        let content = tokio::fs::read(&self.path).await?;
        pod.overwrite_file(&self.remote_url, content, OCTET_STREAM)
            .await?;
        tracing::info!("Updated {} on server pod", self.remote_url);
        Ok(())
    }
}
