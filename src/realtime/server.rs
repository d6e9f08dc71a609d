//! WebSocket endpoint and connection tracking

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::events::RealtimeEvent;

/// Connection ID
pub type ConnectionId = String;

/// Tracks open WebSocket connections and fans events out to them
#[derive(Clone)]
pub struct RealtimeManager {
    /// Broadcast channel for events
    tx: broadcast::Sender<RealtimeEvent>,
    /// Connected clients and when they connected
    clients: Arc<RwLock<HashMap<ConnectionId, DateTime<Utc>>>>,
}

impl RealtimeManager {
    /// Create a new realtime manager
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            tx,
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Send `ping` to every open connection
    ///
    /// Returns how many connections it reached. Nobody listening is not an
    /// error; the ping is simply dropped.
    pub fn broadcast_ping(&self) -> usize {
        let reached = self.tx.send(RealtimeEvent::Ping).unwrap_or(0);
        tracing::debug!("Ping broadcast to {} connection(s)", reached);
        reached
    }

    /// Get number of connected clients
    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.tx.subscribe()
    }

    /// Register a new client
    pub fn register_client(&self, id: ConnectionId) {
        self.clients.write().insert(id, Utc::now());
    }

    /// Unregister a client
    pub fn unregister_client(&self, id: &str) {
        self.clients.write().remove(id);
    }
}

impl Default for RealtimeManager {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket upgrade handler for `/ws`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(manager): State<RealtimeManager>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, manager))
}

/// Handle an individual WebSocket connection
async fn handle_socket(socket: WebSocket, manager: RealtimeManager) {
    let connection_id = Uuid::new_v4().to_string();

    // Subscribe before registering so no ping slips between the two
    let mut rx = manager.subscribe();
    manager.register_client(connection_id.clone());
    tracing::info!("WS client connected: {}", connection_id);

    let (mut sender, mut receiver) = socket.split();

    // Task to forward events to client
    let send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if sender
                        .send(Message::Text(event.as_text().to_string()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("WS client lagged, {} ping(s) coalesced", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Task to drain incoming messages from client
    let conn_id = connection_id.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    tracing::debug!("WS client {} sent {:?}", conn_id, text);
                }
                Message::Close(_) => {
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = send_task => {}
        _ = recv_task => {}
    }

    manager.unregister_client(&connection_id);
    tracing::info!("WS client disconnected: {}", connection_id);
}
