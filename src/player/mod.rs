//! Session-and-playback coordinator
//!
//! Owns the three control loops that keep the daemon streaming: the
//! connection supervisor, the playback scheduler, and the completion pump.

mod engine;

pub use engine::{PlayerEngine, SkipOutcome};

use std::time::Duration;

/// Cadence settings for the coordinator's periodic tasks
///
/// Tests shrink these to run the real loops at millisecond scale.
#[derive(Debug, Clone)]
pub struct PlayerSettings {
    /// Connection supervisor tick
    pub connect_interval: Duration,
    /// Playback scheduler tick
    pub advance_interval: Duration,
    /// Presence broadcaster tick
    pub status_interval: Duration,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            connect_interval: Duration::from_secs(5),
            advance_interval: Duration::from_secs(1),
            status_interval: Duration::from_secs(600),
        }
    }
}
