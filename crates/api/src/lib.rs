//! HTTP server for the ragdemo walkthrough.
//!
//! # Endpoints
//!
//! - `GET /` - Landing page listing the demos
//! - `GET /health` - Health check
//! - `GET /{n}` - Run demo `n` (1 to 9) and return its view as JSON
//!
//! Demos 1-3 talk to the chat model, 4-6 exercise the embedding store
//! directly, 7 ingests an HTML report, 8 answers from that report with
//! retrieval-augmented generation, and 9 empties the store.

pub mod config;
pub mod routes;
pub mod scenarios;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::AppConfig;
pub use scenarios::{DemoView, Scenario};
pub use state::AppState;

/// Create the API router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/{n}", get(routes::scenario))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the API server on the given address.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let router = create_router(state);

    info!(%addr, "Starting ragdemo server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
