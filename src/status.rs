//! Presence broadcaster
//!
//! Keeps the externally visible "now playing" signal in sync with playback:
//! a push on a long fixed interval, plus an immediate push after every track
//! change. Push failures are logged and swallowed; they never reach the
//! playback path.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::events::RadioEvent;
use crate::gateway::Gateway;
use crate::state::SharedState;

/// Presence text shown when nothing is playing
const IDLE_PRESENCE: &str = "idle";

pub struct StatusBroadcaster {
    state: Arc<SharedState>,
    gateway: Arc<dyn Gateway>,
    push_interval: Duration,
}

impl StatusBroadcaster {
    pub fn new(state: Arc<SharedState>, gateway: Arc<dyn Gateway>, push_interval: Duration) -> Self {
        Self {
            state,
            gateway,
            push_interval,
        }
    }

    /// Spawn the broadcast task
    pub fn start(self) {
        tokio::spawn(async move {
            self.run().await;
        });
        info!("Status broadcaster started");
    }

    async fn run(self) {
        let mut tick = interval(self.push_interval);
        let mut events = self.state.subscribe_events();

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                event = events.recv() => match event {
                    Ok(RadioEvent::TrackStarted { .. }
                        | RadioEvent::TrackFinished { .. }
                        | RadioEvent::TrackSkipped { .. }) => {}
                    Ok(_) => continue,
                    // Missed events are fine, the push reads a fresh snapshot
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            self.push().await;
        }
    }

    /// Push the presence text derived from one consistent snapshot
    async fn push(&self) {
        let snapshot = self.state.snapshot().await;
        let text = match &snapshot.current {
            Some(track) => format!("Now playing: {}", track.title),
            None => IDLE_PRESENCE.to_string(),
        };

        match self.gateway.set_presence(&text).await {
            Ok(()) => debug!("Presence set to {:?}", text),
            Err(e) => warn!("Presence update failed: {}", e),
        }
    }
}
