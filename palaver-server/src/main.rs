use anyhow::Context;
use axum::{Router, routing::get};
use palaver_server::{
    RoomBroadcaster, ServerConfig, SessionRegistry, SignalingRouter, ws_handler,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;

    let registry = Arc::new(SessionRegistry::new());
    let broadcaster = Arc::new(RoomBroadcaster::new(registry.clone()));
    let router = SignalingRouter::new(registry, broadcaster);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(cors)
        .with_state(router);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid listen address")?;

    info!("signaling server listening on http://{addr}");
    info!("serving static content from {}", config.static_dir.display());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind listen address")?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
