// Shared helpers for integration tests
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, routing::get, Router};
use livefeed_services::{Fanout, HubMetrics, SubscriberRegistry};
use tokio::net::TcpListener;

/// Serves `body` with `status` at `/live` on a loopback port and returns the URL.
pub async fn serve_upstream(status: StatusCode, body: impl Into<String>) -> String {
    let body = body.into();
    let app = Router::new().route(
        "/live",
        get(move || {
            let body = body.clone();
            async move { (status, body) }
        }),
    );
    format!("http://{}/live", serve(app).await)
}

/// Upstream that answers only after `delay`.
pub async fn serve_slow_upstream(delay: Duration) -> String {
    let app = Router::new().route(
        "/live",
        get(move || async move {
            tokio::time::sleep(delay).await;
            r#"{"success":1,"results":[[]]}"#
        }),
    );
    format!("http://{}/live", serve(app).await)
}

pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });
    addr
}

/// HTTP client that ignores proxy settings from the environment.
pub fn loopback_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder().no_proxy().timeout(timeout).build().unwrap()
}

pub fn test_fanout() -> Fanout {
    Fanout::new(
        Arc::new(SubscriberRegistry::new()),
        Arc::new(HubMetrics::new()),
        Duration::from_millis(100),
    )
}

/// Polls `condition` every 10ms for up to 3s.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..300 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
