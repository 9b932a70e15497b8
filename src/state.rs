//! Shared playback state
//!
//! Thread-safe shared state for playback coordination between components.
//! The whole record lives behind one lock so every reader gets a consistent
//! snapshot and every mutation is a single critical section. No I/O happens
//! while the lock is held.

use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::events::RadioEvent;
use crate::gateway::{ConnectionHandle, StreamHandle};
use crate::library::Track;

/// Coordinator-visible playback record
///
/// Invariants, enforced by the [`SharedState`] accessors:
/// - `busy == true` implies `current` and `attempt` are set
/// - a claim never succeeds while `connection` is absent
/// - `attempt` tags one playback attempt from claim to completion, so a
///   completion report is applied at most once
#[derive(Debug, Clone, Default)]
pub struct PlayerSnapshot {
    /// Live voice session, if any
    pub connection: Option<ConnectionHandle>,
    /// A playback attempt is claimed or in flight
    pub busy: bool,
    /// Track the busy claim belongs to
    pub current: Option<Track>,
    /// Identity of the in-flight attempt
    pub attempt: Option<Uuid>,
    /// Stream handle, present once the subsystem has accepted the attempt
    pub stream: Option<StreamHandle>,
}

impl PlayerSnapshot {
    pub fn connected(&self) -> bool {
        self.connection.is_some()
    }
}

/// Shared state accessible by all components
pub struct SharedState {
    player: RwLock<PlayerSnapshot>,

    /// Event broadcaster for SSE and component notifications
    event_tx: broadcast::Sender<RadioEvent>,
}

impl SharedState {
    /// Create new shared state with default values
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100); // Buffer up to 100 events
        Self {
            player: RwLock::new(PlayerSnapshot::default()),
            event_tx,
        }
    }

    /// Broadcast an event to all listeners
    pub fn broadcast_event(&self, event: RadioEvent) {
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to the event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<RadioEvent> {
        self.event_tx.subscribe()
    }

    /// Read one consistent snapshot of the playback record
    pub async fn snapshot(&self) -> PlayerSnapshot {
        self.player.read().await.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.player.read().await.connection.is_some()
    }

    /// Record or clear the voice session handle
    ///
    /// Clearing the session leaves a busy claim in place; the streaming
    /// subsystem reports the death of its stream through the completion
    /// path, which is the single place the claim is released.
    pub async fn set_connection(&self, connection: Option<ConnectionHandle>) {
        self.player.write().await.connection = connection;
    }

    /// Atomically claim the busy flag for one playback attempt
    ///
    /// Checks "connected and idle" and records the claim in the same
    /// critical section, so two racing ticks can never both pass the idle
    /// check. Returns false when the claim is refused.
    pub async fn try_begin(&self, track: Track, attempt: Uuid) -> bool {
        let mut player = self.player.write().await;
        if player.connection.is_none() || player.busy {
            return false;
        }
        player.busy = true;
        player.current = Some(track);
        player.attempt = Some(attempt);
        player.stream = None;
        true
    }

    /// Record the stream handle once the subsystem accepted the attempt
    ///
    /// Returns false when the attempt is no longer current (completed or
    /// aborted before the handle came back).
    pub async fn attach_stream(&self, attempt: Uuid, stream: StreamHandle) -> bool {
        let mut player = self.player.write().await;
        if player.attempt != Some(attempt) {
            return false;
        }
        player.stream = Some(stream);
        true
    }

    /// Release a claim whose start was rejected synchronously
    ///
    /// Leaves the record fully idle so the next tick's precondition check is
    /// sufficient to retry.
    pub async fn abort_begin(&self, attempt: Uuid) {
        let mut player = self.player.write().await;
        if player.attempt == Some(attempt) {
            player.busy = false;
            player.current = None;
            player.attempt = None;
            player.stream = None;
        }
    }

    /// Apply a completion report
    ///
    /// Clears the claim and returns the finished track when `attempt`
    /// matches the in-flight one; stale or duplicate reports return None and
    /// change nothing.
    pub async fn finish(&self, attempt: Uuid) -> Option<Track> {
        let mut player = self.player.write().await;
        if player.attempt != Some(attempt) {
            return None;
        }
        let finished = player.current.take();
        player.busy = false;
        player.attempt = None;
        player.stream = None;
        finished
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
