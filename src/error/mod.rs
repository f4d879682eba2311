// Error types for the swcache controller and proxy
// Author: kelexine (https://github.com/kelexine)

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Cache storage error: {0}")]
    Storage(String),

    #[error("Install failed for {url}: {reason}")]
    InstallFailed { url: String, reason: String },

    #[error("Invalid worker state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkerError {
    /// True for failures of the transport rather than of the cache layer.
    pub fn is_network(&self) -> bool {
        matches!(self, WorkerError::Network(_) | WorkerError::Http(_))
    }
}

// Convert WorkerError to HTTP responses for Axum
impl IntoResponse for WorkerError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            WorkerError::Network(_) | WorkerError::Http(_) => {
                (StatusCode::BAD_GATEWAY, "network_error")
            }
            WorkerError::InstallFailed { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "install_error")
            }
            WorkerError::InvalidRequest(_) | WorkerError::Url(_) => {
                (StatusCode::BAD_REQUEST, "invalid_request_error")
            }
            WorkerError::Config(_) | WorkerError::ConfigParsing(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
            }
            WorkerError::Storage(_) | WorkerError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
            }
            WorkerError::InvalidState { .. } => (StatusCode::CONFLICT, "state_error"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = json!({
            "type": "error",
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, WorkerError>;
