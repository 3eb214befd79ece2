mod config;

use std::net::SocketAddr;

use anyhow::Result;
use crate::config::AppConfig;
use livefeed_api::{create_routes, AppState};
use livefeed_services::LiveFeedHub;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    let dotenv = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "livefeed_rs=info,livefeed_services=info,livefeed_api=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if dotenv.is_err() {
        warn!("⚠️ .env not found, using process environment");
    }

    info!("🚀 Starting live feed hub");

    let config = match AppConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("❌ Invalid configuration: {}", e);
            return Err(e.into());
        }
    };
    info!("✅ Configuration loaded successfully");
    info!("🌐 Server will bind to: {}", config.server_addr());

    let hub = LiveFeedHub::new(config.hub_config())?;
    let handle = hub.spawn();

    let state = AppState::new(hub.fanout().clone(), hub.config().subscriber_buffer);
    let app = create_routes().with_state(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.server_addr()).await?;
    info!("🎧 Listening on {}", listener.local_addr()?);

    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("❌ Failed to listen for ctrl-c: {}", e);
            }
            info!("👋 Shutting down gracefully");
            let closed = handle.shutdown().await;
            info!("🔌 Closed {} subscriber channels", closed);
        });

    if let Err(e) = server.await {
        error!("❌ HTTP server error: {}", e);
    }

    hub.fanout().metrics().log_summary();

    Ok(())
}
