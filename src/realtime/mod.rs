//! Real-time pings via WebSocket
//!
//! The server pushes a `ping` frame to every open connection after each
//! delivered notification; listeners treat it as a hint to re-poll.

mod events;
mod server;

pub use events::{RealtimeEvent, ServerSignal, PING};
pub use server::{ws_handler, ConnectionId, RealtimeManager};
