//! Event types for the radiobot event system
//!
//! Events are broadcast through [`crate::state::SharedState`] and can be
//! serialized for SSE transmission to control-API clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Radiobot event types
///
/// All components publish through this central enum for type safety and
/// exhaustive matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RadioEvent {
    /// Voice session established to the target channel
    ///
    /// Triggers:
    /// - Scheduler: re-arm playback if the library has tracks
    ChannelJoined {
        /// Channel that was joined
        channel_id: u64,
        /// When the session was established
        timestamp: DateTime<Utc>,
    },

    /// Voice session lost (detected by polling or pushed by the gateway)
    ChannelLost {
        /// Why the session ended, as reported by the gateway
        reason: String,
        /// When the loss was observed
        timestamp: DateTime<Utc>,
    },

    /// A track started streaming
    ///
    /// Triggers:
    /// - StatusBroadcaster: immediate presence update
    TrackStarted {
        /// Display title of the track
        title: String,
        /// When streaming started
        timestamp: DateTime<Utc>,
    },

    /// A track stopped streaming (natural end, error, or skip)
    ///
    /// Triggers:
    /// - Scheduler: advance to the next selection
    /// - StatusBroadcaster: immediate presence update
    TrackFinished {
        /// Display title of the track
        title: String,
        /// Error payload reported by the streaming subsystem, if any
        error: Option<String>,
        /// When the completion was observed
        timestamp: DateTime<Utc>,
    },

    /// A skip command was accepted for the current track
    TrackSkipped {
        /// Display title of the skipped track
        title: String,
        /// When the skip was requested
        timestamp: DateTime<Utc>,
    },

    /// The media library was re-scanned
    LibraryReloaded {
        /// Number of playable tracks after the scan
        tracks: usize,
        /// When the scan finished
        timestamp: DateTime<Utc>,
    },
}
