//! podnotify - pod inbox notifications
//!
//! A notifying server watches a local artifact and posts ActivityStreams
//! updates to a subscriber's pod inbox; a client grants the server access to
//! that inbox and watches it by polling plus WebSocket pings.

pub mod client;
pub mod error;
pub mod pod;
pub mod realtime;
pub mod server;
pub mod types;

pub use error::{PodNotifyError, Result};
pub use pod::{PodClient, SolidSession};

#[cfg(any(test, feature = "test-util"))]
pub use pod::MemoryPod;
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
