//! HTTP server setup and routing

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::library::MediaLibrary;
use crate::player::PlayerEngine;
use crate::state::SharedState;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
    pub engine: Arc<PlayerEngine>,
    pub library: Arc<RwLock<MediaLibrary>>,
}

/// Build the control API router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Health check
        .route("/health", get(super::handlers::health))
        // Playback status (consistent snapshot)
        .route("/status", get(super::handlers::status))
        // The user-visible skip command
        .route("/skip", post(super::handlers::skip))
        // Media library
        .route("/library", get(super::handlers::library))
        .route("/library/rescan", post(super::handlers::rescan_library))
        // SSE event stream
        .route("/events", get(super::sse::event_stream))
        .with_state(ctx)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
