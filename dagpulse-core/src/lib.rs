//! DAGPulse Core - Domain model and live-update plumbing
//!
//! This crate provides the building blocks shared by the simulation loop,
//! the API server and the push-channel client: the in-memory state store,
//! the broadcast envelope and subscriber registry, the least-squares
//! forecaster, risk scoring, and configuration management.

pub mod broadcast;
pub mod clock;
pub mod config;
pub mod forecast;
pub mod query;
pub mod risk;
pub mod store;
pub mod tracing_setup;
pub mod types;

// Re-export main types for convenient access
pub use broadcast::{BroadcastEnvelope, BroadcastError, BroadcastHub, PublishReport, Subscription};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::DagPulseConfig;
pub use forecast::{Forecast, ForecastError, Forecaster, Trend};
pub use query::QueryError;
pub use risk::{RiskAssessment, RiskLevel};
pub use store::{NetworkStore, StoreError, TimeSeriesBuffer};
pub use types::{
    BlockRecord, NetworkSummary, NewBlock, Participant, ParticipantSort, SearchResult,
    StatsSnapshot, StatsUpdate, SubUnit, SubUnitStatus, TimeSeriesPoint,
};

/// Core errors that can bubble up from any DAGPulse subsystem.
#[derive(Debug, thiserror::Error)]
pub enum DagPulseError {
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Forecast error: {0}")]
    Forecast(#[from] ForecastError),

    #[error("Broadcast error: {0}")]
    Broadcast(#[from] BroadcastError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DagPulseError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            DagPulseError::Query(e) => e.to_string(),
            DagPulseError::Forecast(ForecastError::InsufficientData { .. }) => {
                "Insufficient data for forecast".to_string()
            }
            DagPulseError::Broadcast(_) => "Live update delivery failed".to_string(),
            DagPulseError::Store(_) => "Storage error occurred".to_string(),
            DagPulseError::Configuration { .. } => "Configuration error occurred".to_string(),
            DagPulseError::Io(_) => "I/O error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            DagPulseError::Query(_) | DagPulseError::Configuration { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DagPulseError>;
