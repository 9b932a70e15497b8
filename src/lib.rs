//! # radiobot
//!
//! Long-running daemon that keeps one persistent audio stream into a remote
//! voice channel: it joins the configured channel, continuously plays random
//! tracks from a local media folder, keeps the presence signal in sync, and
//! survives transient disconnects.
//!
//! **Architecture:** independently-timed tokio tasks (connection supervisor,
//! playback scheduler, completion pump, status broadcaster) coordinating
//! through one shared playback record, plus an axum control API that carries
//! the user-visible skip command.

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod library;
pub mod player;
pub mod state;
pub mod status;

pub use error::{Error, Result};
pub use state::SharedState;
