//! HTTP request handlers

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::api::server::AppContext;
use crate::events::RadioEvent;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    connected: bool,
    playing: bool,
    track: Option<String>,
    library_tracks: usize,
}

/// Command response: a single synchronous text plus the ephemeral flag
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    message: String,
    ephemeral: bool,
}

#[derive(Debug, Serialize)]
pub struct LibraryResponse {
    root: String,
    tracks: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RescanResponse {
    tracks: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "radiobot".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /status - Playback status from one consistent snapshot
pub async fn status(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    let snapshot = ctx.state.snapshot().await;
    let library_tracks = ctx.library.read().await.len();

    Json(StatusResponse {
        connected: snapshot.connected(),
        playing: snapshot.busy,
        track: snapshot.current.map(|t| t.title),
        library_tracks,
    })
}

/// POST /skip - Skip the current track
///
/// Responds `"Skipped: <track>"` or `"No song is currently playing"`.
pub async fn skip(State(ctx): State<AppContext>) -> Json<CommandResponse> {
    let outcome = ctx.engine.skip().await;
    Json(CommandResponse {
        message: outcome.message(),
        ephemeral: true,
    })
}

/// GET /library - List the current media pool
pub async fn library(State(ctx): State<AppContext>) -> Json<LibraryResponse> {
    let library = ctx.library.read().await;
    Json(LibraryResponse {
        root: library.root().display().to_string(),
        tracks: library.tracks().iter().map(|t| t.title.clone()).collect(),
    })
}

/// POST /library/rescan - Re-scan the media folder
///
/// The only pool refresh path besides a restart. Nudges the scheduler so an
/// idle daemon starts playing as soon as the scan finds something.
pub async fn rescan_library(State(ctx): State<AppContext>) -> Json<RescanResponse> {
    let tracks = ctx.library.write().await.rescan();
    info!("Library rescan requested: {} tracks", tracks);

    ctx.state.broadcast_event(RadioEvent::LibraryReloaded {
        tracks,
        timestamp: Utc::now(),
    });
    ctx.engine.nudge();

    Json(RescanResponse { tracks })
}
