//! Service error types and their HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use krushi_ai_core::{format_error, ErrorPayload, PipelineError, ValidationError};
use thiserror::Error;
use tracing::warn;

/// Startup and configuration errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Configuration file {0} not found (specified via --config)")]
    MissingConfigFile(String),

    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),
}

/// An error rendered as `{"error": ...}` with a status code
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn service_unavailable<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = match &err {
            PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
            PipelineError::Inference(inner) => {
                warn!(error = %inner, "inference failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            // Resolved into a warning by the pipeline; reaching here is a bug
            PipelineError::UnknownClass(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::ModelNotLoaded(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let ErrorPayload { error } = format_error(&err);
        ApiError::new(status, error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = Json(ErrorPayload {
            error: self.message,
        });
        (self.status, payload).into_response()
    }
}
