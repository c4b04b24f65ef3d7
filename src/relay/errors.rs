//! Relay Error Handling
//!
//! Missing request fields answer 400; every other failure answers 500. Both
//! carry a `{ "error": message }` body.

use super::models::ErrorResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Required request fields absent
    #[error("{0}")]
    MissingField(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Chain settings absent or unusable
    #[error("Relay not configured: {0}")]
    NotConfigured(String),

    /// Submission or receipt failure on chain
    #[error("Forwarding failed: {0}")]
    Forwarder(String),

    /// Client could not reach the relay
    #[error("Relay unreachable: {0}")]
    Transport(String),

    /// Relay answered with an error status
    #[error("Relay rejected the bet ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingField(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        RelayError::Transport(e.to_string())
    }
}

/// Malformed or mistyped bodies are relay failures, not axum's 4xx
impl From<axum::extract::rejection::JsonRejection> for RelayError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        RelayError::InvalidRequest(rejection.body_text())
    }
}

impl From<prometheus::Error> for RelayError {
    fn from(e: prometheus::Error) -> Self {
        RelayError::Metrics(e.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
