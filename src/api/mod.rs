//! HTTP control surface
//!
//! Exposes the user-visible skip command plus health, status, library
//! rescan, and an SSE event stream.

pub mod handlers;
pub mod sse;

mod server;

pub use server::{create_router, AppContext};
