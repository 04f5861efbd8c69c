//! HTTP listener
//!
//! A single POST route on a loopback address. The handler defers everything
//! to [`Bridge::handle`].

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Response,
    routing::post,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::handlers::Bridge;

/// Start the bridge and serve until the process ends
pub async fn serve(config: &Config) -> Result<()> {
    let bridge = Arc::new(Bridge::new(config)?);

    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, config.server.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Termux bridge running on http://{}", addr);
    tracing::info!("Token file: {}", bridge.token_store().path().display());
    if let Err(e) = bridge.token_store().load() {
        tracing::warn!("{}; every request will fail until it is created", e);
    }

    axum::serve(listener, create_router(bridge)).await?;
    Ok(())
}

/// Create the router with the command route
pub fn create_router(bridge: Arc<Bridge>) -> Router {
    Router::new()
        .route("/", post(execute))
        .layer(TraceLayer::new_for_http())
        .with_state(bridge)
}

async fn execute(State(bridge): State<Arc<Bridge>>, headers: HeaderMap, body: Bytes) -> Response {
    bridge.handle(&headers, &body).await
}
