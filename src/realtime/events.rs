//! Real-time signal types

/// Text payload telling listeners to re-read their inbox
pub const PING: &str = "ping";

/// A frame pushed from the server to realtime listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeEvent {
    /// Something was delivered; re-poll now
    Ping,
}

impl RealtimeEvent {
    /// Wire text of the event
    pub fn as_text(&self) -> &'static str {
        match self {
            RealtimeEvent::Ping => PING,
        }
    }
}

/// A text frame as seen by a listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerSignal {
    Ping,
    /// Anything else; logged but not acted on
    Other(String),
}

impl ServerSignal {
    /// Classify an incoming text frame
    pub fn parse(text: &str) -> Self {
        if text == PING {
            ServerSignal::Ping
        } else {
            ServerSignal::Other(text.to_string())
        }
    }
}
