//! Error types for podnotify

use thiserror::Error;

/// Result type alias for podnotify operations
pub type Result<T> = std::result::Result<T, PodNotifyError>;

/// Main error type for podnotify
#[derive(Error, Debug)]
pub enum PodNotifyError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File watcher error: {0}")]
    Watcher(#[from] notify::Error),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Pod request to {url} failed with status {status}")]
    Pod { status: u16, url: String },

    #[error("ACL error: {0}")]
    Acl(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Subscription failed ({0})")]
    Subscription(u16),

    #[error("Realtime channel error: {0}")]
    Realtime(String),
}

impl PodNotifyError {
    /// Check if error came from the network rather than from local state
    pub fn is_transport(&self) -> bool {
        matches!(self, PodNotifyError::Http(_) | PodNotifyError::Realtime(_))
    }

    /// HTTP status to report for this error on the server's own routes
    pub fn status_code(&self) -> u16 {
        match self {
            PodNotifyError::InvalidInput(_) => 400,
            PodNotifyError::Auth(_) => 401,
            _ => 500,
        }
    }
}
