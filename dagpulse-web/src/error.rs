//! HTTP error mapping and server failures.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dagpulse_core::forecast::ForecastError;
use dagpulse_core::query::QueryError;
use dagpulse_sim::SimulationError;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by API handlers.
///
/// Rendered as `{"error": "<message>"}` with a status matching the failure:
/// invalid input is 400, missing entities 404, and an unfittable forecast 422.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    InvalidInput(#[from] QueryError),

    #[error("{resource} not found")]
    NotFound { resource: &'static str },

    #[error(transparent)]
    Forecast(#[from] ForecastError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Forecast(ForecastError::InsufficientData { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::debug!(%status, error = %self, "Request rejected");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Failures starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start simulation: {0}")]
    Simulation(#[from] SimulationError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
