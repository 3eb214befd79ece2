use axum::{extract::State, response::Json, routing::get, Router};
use livefeed_services::{Fanout, HubMetricsSnapshot};
use serde::Serialize;

use crate::websocket::ws_handler;

#[derive(Clone)]
pub struct AppState {
    pub fanout: Fanout,
    /// Frame queue depth for each new subscriber.
    pub subscriber_buffer: usize,
}

impl AppState {
    pub fn new(fanout: Fanout, subscriber_buffer: usize) -> Self {
        Self {
            fanout,
            subscriber_buffer,
        }
    }
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub subscribers: usize,
    pub metrics: HubMetricsSnapshot,
}

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_check))
        .route("/api/v1/status", get(get_status))
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn get_status(State(state): State<AppState>) -> Json<ApiResponse<StatusResponse>> {
    let subscribers = state.fanout.registry().len();

    Json(ApiResponse {
        success: true,
        data: Some(StatusResponse {
            subscribers,
            metrics: state.fanout.metrics().snapshot(),
        }),
        message: Some(format!("{subscribers} subscribers connected")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use livefeed_services::{HubMetrics, Subscriber, SubscriberRegistry};
    use serde_json::Value;
    use tower::ServiceExt;

    fn state() -> AppState {
        let fanout = Fanout::new(
            Arc::new(SubscriberRegistry::new()),
            Arc::new(HubMetrics::new()),
            Duration::from_millis(50),
        );
        AppState::new(fanout, 8)
    }

    async fn get_json(state: AppState, uri: &str) -> (StatusCode, Value) {
        let response = create_routes()
            .with_state(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (status, body) = get_json(state(), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].is_string());
        assert!(body["version"].is_string());
    }

    #[tokio::test]
    async fn test_status_reports_subscribers_and_metrics() {
        let state = state();
        state.fanout.register(Subscriber::channel(None, 4).0);
        state.fanout.register(Subscriber::channel(None, 4).0);

        let (status, body) = get_json(state, "/api/v1/status").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["subscribers"], 2);
        assert_eq!(body["data"]["metrics"]["subscribers_registered"], 2);
        assert_eq!(body["data"]["metrics"]["polls_failed"], 0);
    }

    #[tokio::test]
    async fn test_ws_route_requires_upgrade() {
        let response = create_routes()
            .with_state(state())
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }
}
