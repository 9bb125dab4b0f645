//! Pull exporter: an HTTP endpoint serving the serialized registry.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::registry::Registry;
use crate::wire;

/// Build the exposition router. Every GET path answers 200 with the current
/// registry; no other verbs or paths are defined. Safe for arbitrarily many
/// concurrent requests since each one works off its own snapshot.
pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .fallback(get(render))
        .with_state(registry)
}

async fn render(State(registry): State<Arc<Registry>>) -> impl IntoResponse {
    let body = wire::serialize(&registry.snapshot());
    ([(header::CONTENT_TYPE, wire::CONTENT_TYPE)], body)
}

/// Bind `addr` and serve the exposition endpoint until the task is dropped.
pub async fn serve(registry: Arc<Registry>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics exposition listening");
    axum::serve(listener, router(registry)).await
}
