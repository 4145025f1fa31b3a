//! DAGPulse Web - JSON API and live push server
//!
//! Read-only JSON endpoints over the shared store plus a WebSocket channel
//! that streams stats, samples and new blocks as the simulation produces
//! them.

pub mod error;
pub mod handlers;
pub mod server;

// Re-export main types
pub use error::{ApiError, ServerError};
pub use server::{AppState, RunningServer, build_router, run_server, serve, spawn_server};
