//! DAGPulse Client - Live-update subscriber
//!
//! Connects to a DAGPulse push endpoint, folds the stream into a local
//! [`ViewState`], turns notable transitions into [`Notification`]s and
//! reconnects with capped exponential [`Backoff`] when the stream drops.

pub mod backoff;
pub mod notifications;
pub mod subscriber;
pub mod view;

pub use backoff::Backoff;
pub use notifications::{Notification, NotificationKind, NotificationLog};
pub use subscriber::{SessionEnd, Subscriber};
pub use view::{ViewSignal, ViewState};

/// Subscriber-side failures.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Failed to decode frame: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
    },
}
