//! HTTP routes of the notifying server

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

use super::artifact::Artifact;
use super::registry::SubscriptionRegistry;
use crate::pod::PodClient;
use crate::realtime::{ws_handler, RealtimeManager};
use crate::types::SubscribeRequest;

/// Shared state of the server routes
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SubscriptionRegistry>,
    pub pod: Arc<dyn PodClient>,
    pub artifact: Arc<Artifact>,
    pub realtime: RealtimeManager,
}

impl FromRef<AppState> for RealtimeManager {
    fn from_ref(state: &AppState) -> Self {
        state.realtime.clone()
    }
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/subscribe", post(subscribe_handler))
        .route("/simulate-update", post(simulate_update_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Register the caller's inbox; answers with the server's WebID
async fn subscribe_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SubscribeRequest>, JsonRejection>,
) -> Response {
    let inbox = payload.ok().and_then(|Json(req)| req.inbox);

    match state.registry.register(inbox.as_deref()) {
        Ok(server_id) => {
            tracing::info!("Client subscribed: {}", inbox.unwrap_or_default().trim());
            (StatusCode::CREATED, server_id).into_response()
        }
        Err(e) => {
            tracing::warn!("Rejected subscription: {}", e);
            (StatusCode::BAD_REQUEST, "Missing inbox URL").into_response()
        }
    }
}

/// Touch the artifact and mirror it to the pod
async fn simulate_update_handler(State(state): State<AppState>) -> Response {
    match state.artifact.simulate_update(state.pod.as_ref()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::error!("simulate-update error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Health check endpoint
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "subscriber": state.registry.current(),
        "clients": state.realtime.client_count(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pod::MemoryPod;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    const SERVER: &str = "https://server.example/profile#me";

    fn state(artifact: Artifact) -> (MemoryPod, AppState) {
        let pod = MemoryPod::new(SERVER);
        let state = AppState {
            registry: Arc::new(SubscriptionRegistry::new(SERVER)),
            pod: Arc::new(pod.clone()),
            artifact: Arc::new(artifact),
            realtime: RealtimeManager::new(),
        };
        (pod, state)
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_subscribe_returns_identity() {
        let (_pod, state) = state(Artifact::new("weights.bin", "https://x/weights.bin"));
        let registry = Arc::clone(&state.registry);

        let response = router(state)
            .oneshot(post("/subscribe", r#"{"inbox":"https://client.example/inbox/"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_text(response).await, SERVER);
        assert_eq!(
            registry.current().as_deref(),
            Some("https://client.example/inbox/")
        );
    }

    #[tokio::test]
    async fn test_subscribe_without_inbox_is_bad_request() {
        let (_pod, state) = state(Artifact::new("weights.bin", "https://x/weights.bin"));
        state
            .registry
            .register(Some("https://keep.example/inbox/"))
            .unwrap();
        let registry = Arc::clone(&state.registry);
        let app = router(state);

        for body in ["{}", r#"{"inbox":""}"#, "not json"] {
            let response = app.clone().oneshot(post("/subscribe", body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_text(response).await, "Missing inbox URL");
        }
        assert_eq!(
            registry.current().as_deref(),
            Some("https://keep.example/inbox/")
        );
    }

    #[tokio::test]
    async fn test_simulate_update_no_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.bin");
        let (pod, state) = state(Artifact::new(&path, "https://server.example/files/weights.bin"));

        let response = router(state)
            .oneshot(post("/simulate-update", ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(pod
            .state()
            .files
            .contains_key("https://server.example/files/weights.bin"));
    }

    #[tokio::test]
    async fn test_simulate_update_failure_is_500_with_message() {
        let (_pod, state) = state(Artifact::new(
            "/nonexistent/dir/abc123/weights.bin",
            "https://server.example/files/weights.bin",
        ));

        let response = router(state)
            .oneshot(post("/simulate-update", ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.starts_with("IO error"));
    }

    #[tokio::test]
    async fn test_health() {
        let (_pod, state) = state(Artifact::new("weights.bin", "https://x/weights.bin"));
        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["clients"], 0);
        assert!(json["subscriber"].is_null());
    }
}
