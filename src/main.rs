//! radiobot - Main entry point
//!
//! Wires the media library, the gateway sidecar clients, the player engine,
//! the status broadcaster, and the HTTP control API together, then serves
//! until a shutdown signal arrives.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use radiobot::api;
use radiobot::config::{self, Settings};
use radiobot::gateway::http::{HttpGateway, HttpStreamer};
use radiobot::gateway::{ChannelTarget, Gateway};
use radiobot::library::MediaLibrary;
use radiobot::player::{PlayerEngine, PlayerSettings};
use radiobot::state::SharedState;
use radiobot::status::StatusBroadcaster;

/// Command-line arguments for radiobot
#[derive(Parser, Debug)]
#[command(name = "radiobot")]
#[command(about = "Voice-channel radio daemon")]
#[command(version)]
struct Args {
    /// Authentication token for the voice gateway
    #[arg(long, env = "RADIOBOT_TOKEN")]
    token: String,

    /// Server to join
    #[arg(long, env = "RADIOBOT_SERVER_ID", default_value_t = 1386989554682171392)]
    server_id: u64,

    /// Voice channel to stream into
    #[arg(long, env = "RADIOBOT_CHANNEL_ID", default_value_t = 1450026402815676446)]
    channel_id: u64,

    /// Folder containing the media files
    #[arg(short, long, env = "RADIOBOT_MEDIA_DIR")]
    media_dir: Option<PathBuf>,

    /// Base URL of the voice gateway sidecar
    #[arg(long, env = "RADIOBOT_GATEWAY_URL", default_value = "http://127.0.0.1:5741")]
    gateway_url: String,

    /// Port for the control API
    #[arg(short, long, env = "RADIOBOT_PORT", default_value_t = 5745)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "radiobot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments; a missing token aborts here with a
    // clear diagnostic
    let args = Args::parse();
    let settings = Settings {
        token: args.token,
        server_id: args.server_id,
        channel_id: args.channel_id,
        media_dir: config::resolve_media_dir(args.media_dir.as_deref()),
        gateway_url: args.gateway_url,
        port: args.port,
    };

    info!("Starting radiobot, channel {}", settings.channel_id);
    info!("Media folder: {}", settings.media_dir.display());

    // Load the media pool once at startup
    let library = Arc::new(RwLock::new(MediaLibrary::scan(&settings.media_dir)));
    let state = Arc::new(SharedState::new());

    // Collaborator clients for the voice gateway sidecar
    let gateway: Arc<dyn Gateway> =
        HttpGateway::new(settings.gateway_url.clone(), settings.token.clone());
    let streamer = HttpStreamer::new(settings.gateway_url.clone(), settings.token.clone());

    let player_settings = PlayerSettings::default();
    let status_interval = player_settings.status_interval;

    let engine = Arc::new(PlayerEngine::new(
        Arc::clone(&state),
        Arc::clone(&library),
        Arc::clone(&gateway),
        streamer,
        ChannelTarget {
            server_id: settings.server_id,
            channel_id: settings.channel_id,
        },
        player_settings,
    ));
    engine
        .start()
        .await
        .context("Failed to start player engine")?;

    StatusBroadcaster::new(Arc::clone(&state), gateway, status_interval).start();

    // Control API
    let app = api::create_router(api::AppContext {
        state,
        engine,
        library,
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
