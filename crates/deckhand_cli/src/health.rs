//! Liveness endpoint for the hosting platform.

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

pub const ALIVE: &str = "Bot is alive!";

pub fn router() -> Router {
    Router::new()
        .route("/", get(alive))
        .route("/healthz", get(alive))
}

async fn alive() -> &'static str {
    ALIVE
}

/// Bind `0.0.0.0:port` and serve until the task is dropped.
pub async fn serve(port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    serve_on(listener).await
}

pub async fn serve_on(listener: TcpListener) -> anyhow::Result<()> {
    info!("Health endpoint listening on {}", listener.local_addr()?);
    axum::serve(listener, router()).await?;
    Ok(())
}
