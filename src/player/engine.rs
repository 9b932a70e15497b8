//! Player engine orchestration
//!
//! Coordinates the voice session, track selection, and stream lifecycle
//! across independently-timed tasks. Every touch of the playback record goes
//! through [`SharedState`]; the busy claim is taken atomically there, and it
//! is released in exactly one place, the completion pump.
//!
//! A stream that never reports completion holds the busy claim until the
//! streaming subsystem speaks up. There is deliberately no watchdog timeout
//! on individual attempts.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, Mutex, Notify, RwLock};
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::events::RadioEvent;
use crate::gateway::{
    AudioStreamer, ChannelTarget, CompletionSender, Gateway, GatewayEvent, TrackEnd,
};
use crate::library::MediaLibrary;
use crate::player::PlayerSettings;
use crate::state::SharedState;

/// Result of a skip command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipOutcome {
    /// The named track was playing and its stream was asked to stop
    Skipped { title: String },
    /// Nothing was playing (or a stop for the current track is already
    /// pending); no mutation happened
    NotPlaying,
}

impl SkipOutcome {
    /// User-visible command response text
    pub fn message(&self) -> String {
        match self {
            SkipOutcome::Skipped { title } => format!("Skipped: {title}"),
            SkipOutcome::NotPlaying => "No song is currently playing".to_string(),
        }
    }
}

/// Player engine - coordinates all playback components
pub struct PlayerEngine {
    state: Arc<SharedState>,
    library: Arc<RwLock<MediaLibrary>>,
    gateway: Arc<dyn Gateway>,
    streamer: Arc<dyn AudioStreamer>,
    target: ChannelTarget,
    settings: PlayerSettings,

    /// Out-of-band wakeup for the scheduler
    advance: Arc<Notify>,

    /// Attempt for which a stop has already been requested; makes rapid
    /// repeated skips idempotent without a second release path
    stopping: Arc<Mutex<Option<Uuid>>>,

    /// Completion reports marshaled from the streaming subsystem
    done_tx: mpsc::UnboundedSender<TrackEnd>,
    done_rx: Mutex<Option<mpsc::UnboundedReceiver<TrackEnd>>>,
}

impl PlayerEngine {
    /// Create new player engine
    pub fn new(
        state: Arc<SharedState>,
        library: Arc<RwLock<MediaLibrary>>,
        gateway: Arc<dyn Gateway>,
        streamer: Arc<dyn AudioStreamer>,
        target: ChannelTarget,
        settings: PlayerSettings,
    ) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            state,
            library,
            gateway,
            streamer,
            target,
            settings,
            advance: Arc::new(Notify::new()),
            stopping: Arc::new(Mutex::new(None)),
            done_tx,
            done_rx: Mutex::new(Some(done_rx)),
        }
    }

    /// Start the engine background tasks
    pub async fn start(&self) -> Result<()> {
        let rx = self
            .done_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| Error::InvalidState("player engine already started".to_string()))?;

        let handles = self.clone_handles();
        tokio::spawn(async move {
            handles.completion_pump(rx).await;
        });

        let handles = self.clone_handles();
        tokio::spawn(async move {
            handles.supervise_loop().await;
        });

        let handles = self.clone_handles();
        tokio::spawn(async move {
            handles.advance_loop().await;
        });

        info!("Player engine started");
        Ok(())
    }

    /// Ask the scheduler to re-evaluate now instead of on its next tick
    pub fn nudge(&self) {
        self.advance.notify_one();
    }

    /// Skip the current track
    ///
    /// The title is captured from the same snapshot the stop decision is
    /// made on, so the response names the track that was playing at the
    /// moment of the call even when completion lands concurrently. The state
    /// clear itself is left to the completion pump.
    pub async fn skip(&self) -> SkipOutcome {
        let snapshot = self.state.snapshot().await;
        let (track, stream, attempt) = match (
            snapshot.busy,
            snapshot.current,
            snapshot.stream,
            snapshot.attempt,
        ) {
            (true, Some(track), Some(stream), Some(attempt)) => (track, stream, attempt),
            _ => return SkipOutcome::NotPlaying,
        };

        {
            let mut stopping = self.stopping.lock().await;
            if *stopping == Some(attempt) {
                // Stop already requested for this attempt; the pending
                // completion will clear it
                return SkipOutcome::NotPlaying;
            }
            *stopping = Some(attempt);
        }

        if let Err(e) = self.streamer.stop(&stream).await {
            warn!("Failed to stop stream for {}: {}", track.title, e);
        }

        self.state.broadcast_event(RadioEvent::TrackSkipped {
            title: track.title.clone(),
            timestamp: Utc::now(),
        });
        self.advance.notify_one();

        info!("Skipping: {}", track.title);
        SkipOutcome::Skipped { title: track.title }
    }

    /// Connection supervisor loop
    ///
    /// Polls session health on a fixed interval and reacts immediately to
    /// pushed disconnect notifications instead of waiting for the next tick.
    async fn supervise_loop(self) {
        let mut tick = interval(self.settings.connect_interval);
        let mut gateway_events = self.gateway.subscribe();

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                event = gateway_events.recv() => match event {
                    Ok(GatewayEvent::Disconnected { reason }) => {
                        warn!("Gateway dropped the session: {}", reason);
                        self.state.set_connection(None).await;
                        self.state.broadcast_event(RadioEvent::ChannelLost {
                            reason,
                            timestamp: Utc::now(),
                        });
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("Missed {} gateway notifications", missed);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // Notification stream gone; fall back to pure polling
                        tick.tick().await;
                    }
                }
            }

            self.ensure_connected().await;
        }
    }

    /// Establish the voice session if it is missing or unhealthy
    ///
    /// Idempotent when already connected. Failures are logged and retried on
    /// the next tick, never fatal.
    async fn ensure_connected(&self) {
        let snapshot = self.state.snapshot().await;
        if let Some(connection) = &snapshot.connection {
            if self.gateway.is_connected(connection).await {
                return;
            }
            info!("Voice session no longer healthy, reconnecting");
            self.state.set_connection(None).await;
            self.state.broadcast_event(RadioEvent::ChannelLost {
                reason: "connection lost".to_string(),
                timestamp: Utc::now(),
            });
        }

        match self.gateway.connect(&self.target).await {
            Ok(connection) => {
                info!("Joined voice channel {}", self.target.channel_id);
                self.state.set_connection(Some(connection)).await;
                self.state.broadcast_event(RadioEvent::ChannelJoined {
                    channel_id: self.target.channel_id,
                    timestamp: Utc::now(),
                });
                if !self.library.read().await.is_empty() {
                    self.advance.notify_one();
                }
            }
            Err(e) => {
                warn!("Failed to join voice channel: {}, retrying on next tick", e);
            }
        }
    }

    /// Playback scheduler loop
    async fn advance_loop(self) {
        let mut tick = interval(self.settings.advance_interval);

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = self.advance.notified() => {}
            }

            self.try_advance().await;
        }
    }

    /// Start the next track when connected, idle, and the pool has tracks
    ///
    /// An empty pool is not an error: the loop idles and re-checks on every
    /// tick, so tracks that appear later are picked up without a restart.
    async fn try_advance(&self) {
        let snapshot = self.state.snapshot().await;
        if snapshot.busy || !snapshot.connected() {
            return;
        }

        let Some(track) = self.library.read().await.pick_random() else {
            return;
        };

        let attempt = Uuid::new_v4();
        if !self.state.try_begin(track.clone(), attempt).await {
            // Another tick won the claim between the snapshot and here
            return;
        }

        // The claim is held; the actual I/O happens outside the state lock
        let done = CompletionSender::new(attempt, self.done_tx.clone());
        match self.streamer.begin(&track, done).await {
            Ok(stream) => {
                if !self.state.attach_stream(attempt, stream).await {
                    debug!("Stream for {} ended before begin returned", track.title);
                    return;
                }
                info!("Now playing: {}", track.title);
                self.state.broadcast_event(RadioEvent::TrackStarted {
                    title: track.title.clone(),
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                warn!("Failed to play {}: {}", track.title, e);
                // Recoverable: release the claim so the next tick can retry
                self.state.abort_begin(attempt).await;
            }
        }
    }

    /// Completion pump
    ///
    /// Sole consumer of completion reports and the only place the busy claim
    /// is released. Stale reports (aborted or already-finished attempts) are
    /// dropped by the attempt check inside [`SharedState::finish`].
    async fn completion_pump(self, mut rx: mpsc::UnboundedReceiver<TrackEnd>) {
        while let Some(end) = rx.recv().await {
            match self.state.finish(end.attempt).await {
                Some(track) => {
                    match &end.error {
                        Some(e) => warn!("{} ended with error: {}", track.title, e),
                        None => debug!("{} finished", track.title),
                    }
                    self.state.broadcast_event(RadioEvent::TrackFinished {
                        title: track.title,
                        error: end.error,
                        timestamp: Utc::now(),
                    });
                    self.advance.notify_one();
                }
                None => {
                    debug!("Ignoring completion for stale attempt {}", end.attempt);
                }
            }
        }
        debug!("Completion channel closed, pump exiting");
    }

    /// Clone handles for spawned tasks
    fn clone_handles(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            library: Arc::clone(&self.library),
            gateway: Arc::clone(&self.gateway),
            streamer: Arc::clone(&self.streamer),
            target: self.target,
            settings: self.settings.clone(),
            advance: Arc::clone(&self.advance),
            stopping: Arc::clone(&self.stopping),
            done_tx: self.done_tx.clone(),
            done_rx: Mutex::new(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_outcome_messages() {
        let skipped = SkipOutcome::Skipped {
            title: "sunset".to_string(),
        };
        assert_eq!(skipped.message(), "Skipped: sunset");
        assert_eq!(
            SkipOutcome::NotPlaying.message(),
            "No song is currently playing"
        );
    }
}
