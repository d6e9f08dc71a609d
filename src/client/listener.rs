//! Realtime listener
//!
//! Connects to the server's `/ws` endpoint and refreshes the inbox as soon as
//! a `ping` arrives. The timer loop keeps working without it, so every
//! failure here is a warning and leaves the client in poll-only mode.

use std::sync::Arc;

use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message;

use super::poller::InboxPoller;
use crate::realtime::ServerSignal;
use crate::types::ReconnectPolicy;

/// Convert an HTTP(S) URL to WS(S) scheme.
///
/// Passes `ws://` and `wss://` through unchanged.
pub fn http_to_ws_scheme(url: &str) -> String {
    if url.starts_with("wss://") || url.starts_with("ws://") {
        url.to_string()
    } else if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        url.to_string()
    }
}

/// Realtime endpoint of a server
pub fn realtime_url(server_url: &str) -> String {
    format!("{}/ws", http_to_ws_scheme(server_url.trim_end_matches('/')))
}

/// How one connection ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Could not connect at all
    Unavailable(String),
    /// Was connected, then closed or errored
    Disconnected,
}

/// Listen for pings until the connection ends, then apply `policy`
///
/// Returns only under [`ReconnectPolicy::Manual`].
pub async fn listen(url: String, poller: Arc<InboxPoller>, policy: ReconnectPolicy) -> SessionEnd {
    loop {
        let end = listen_once(&url, &poller).await;
        match policy {
            ReconnectPolicy::Manual => return end,
            ReconnectPolicy::FixedBackoff(delay) => {
                tracing::info!("Reconnecting to {} in {:?}", url, delay);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// One connection attempt and its message loop
pub async fn listen_once(url: &str, poller: &InboxPoller) -> SessionEnd {
    let mut stream = match tokio_tungstenite::connect_async(url).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            tracing::warn!(
                "Realtime channel unavailable ({}); using polling only",
                e
            );
            return SessionEnd::Unavailable(e.to_string());
        }
    };
    tracing::info!("WS connected to {}", url);

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match ServerSignal::parse(&text) {
                ServerSignal::Ping => {
                    tracing::info!("Received ping");
                    if let Err(e) = poller.refresh().await {
                        tracing::warn!("Refresh after ping failed: {}", e);
                    }
                }
                ServerSignal::Other(other) => tracing::info!("WS message: {}", other),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("WS error: {}", e);
                break;
            }
        }
    }

    tracing::info!("WS disconnected");
    SessionEnd::Disconnected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pod::MemoryPod;

    #[test]
    fn test_http_to_ws_scheme() {
        assert_eq!(http_to_ws_scheme("https://example.com"), "wss://example.com");
        assert_eq!(
            http_to_ws_scheme("http://localhost:4000"),
            "ws://localhost:4000"
        );
        assert_eq!(http_to_ws_scheme("ws://already"), "ws://already");
    }

    #[test]
    fn test_realtime_url() {
        assert_eq!(realtime_url("http://localhost:4000/"), "ws://localhost:4000/ws");
        assert_eq!(
            realtime_url("https://server.example"),
            "wss://server.example/ws"
        );
    }

    #[tokio::test]
    async fn test_unavailable_endpoint_is_not_fatal() {
        let pod = MemoryPod::new("https://client.example/profile#me");
        let poller = Arc::new(InboxPoller::new(
            Arc::new(pod),
            "https://client.example/inbox/",
        ));

        let end = listen(
            "ws://127.0.0.1:1/ws".to_string(),
            poller,
            ReconnectPolicy::Manual,
        )
        .await;
        assert!(matches!(end, SessionEnd::Unavailable(_)));
    }
}
