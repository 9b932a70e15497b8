//! Collaborator boundary for the remote voice platform
//!
//! The coordinator never speaks a wire protocol itself. It sees the platform
//! through two traits: [`Gateway`] for the voice session (join, health,
//! presence, disconnect notifications) and [`AudioStreamer`] for turning a
//! track into a live stream. The reference implementation over the gateway
//! sidecar lives in [`http`]; tests substitute scripted mocks.

pub mod http;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::error::Result;
use crate::library::Track;

/// Opaque handle to a live voice session
///
/// Holders look it up from the shared snapshot on each use rather than
/// assuming it stays valid across a suspension point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionHandle {
    pub session_id: Uuid,
}

/// Opaque handle to one in-flight audio stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHandle {
    pub stream_id: Uuid,
}

/// The server and voice channel the daemon streams into
#[derive(Debug, Clone, Copy)]
pub struct ChannelTarget {
    pub server_id: u64,
    pub channel_id: u64,
}

/// Out-of-band notifications pushed by the gateway
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    /// The session ended without us asking (kicked, moved, transport loss)
    Disconnected { reason: String },
}

/// Completion report for one playback attempt
#[derive(Debug)]
pub struct TrackEnd {
    /// Attempt the report belongs to; stale reports are dropped by the engine
    pub attempt: Uuid,
    /// Error payload when the stream did not end naturally
    pub error: Option<String>,
}

/// Exactly-once completion hand-off from the streaming subsystem
///
/// The streamer may invoke [`CompletionSender::notify`] from any thread; the
/// report is marshaled onto the engine's completion pump through an unbounded
/// channel, so the call never blocks and never touches shared state from the
/// foreign context. `notify` consumes the sender, so a second report for the
/// same attempt cannot be produced.
#[derive(Debug)]
pub struct CompletionSender {
    attempt: Uuid,
    tx: mpsc::UnboundedSender<TrackEnd>,
}

impl CompletionSender {
    pub fn new(attempt: Uuid, tx: mpsc::UnboundedSender<TrackEnd>) -> Self {
        Self { attempt, tx }
    }

    pub fn attempt(&self) -> Uuid {
        self.attempt
    }

    /// Report that the stream ended, with an optional error payload
    pub fn notify(self, error: Option<String>) {
        // The engine owning the receiver may already be gone during shutdown
        let _ = self.tx.send(TrackEnd {
            attempt: self.attempt,
            error,
        });
    }
}

/// Voice session lifecycle as exposed by the platform
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Establish a session to the target channel
    async fn connect(&self, target: &ChannelTarget) -> Result<ConnectionHandle>;

    /// Whether the given session is still live and healthy
    async fn is_connected(&self, handle: &ConnectionHandle) -> bool;

    /// Push the externally visible presence text
    async fn set_presence(&self, text: &str) -> Result<()>;

    /// Subscribe to pushed gateway notifications
    fn subscribe(&self) -> broadcast::Receiver<GatewayEvent>;
}

/// Streaming subsystem as exposed by the platform
#[async_trait]
pub trait AudioStreamer: Send + Sync {
    /// Start streaming `track` into the current session
    ///
    /// May fail synchronously. On success the returned handle identifies the
    /// stream until `done` fires; `done` fires exactly once per successful
    /// begin, whether the stream ends naturally, with an error, or through
    /// [`AudioStreamer::stop`].
    async fn begin(&self, track: &Track, done: CompletionSender) -> Result<StreamHandle>;

    /// Force early completion of a stream
    ///
    /// The completion callback for the stream still fires.
    async fn stop(&self, stream: &StreamHandle) -> Result<()>;
}
