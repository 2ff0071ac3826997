//! Error types for rhyme-analyzer
//!
//! Every failure leaves the service as an [`ErrorEnvelope`] with the status
//! code of its [`ErrorKind`].

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rhyme_common::api::{ErrorEnvelope, ErrorKind};
use thiserror::Error;

use crate::models::UnknownScheme;
use crate::services::{InferenceError, PipelineError};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad, missing or oversized input (400)
    #[error("{0}")]
    MalformedInput(String),

    /// A window call to the inference service failed (503)
    #[error("{0}")]
    UpstreamUnavailable(String),

    /// Internal server error (500)
    #[error("{0}")]
    Internal(String),

    /// Inbound quota exhausted (429)
    #[error("{0}")]
    RateLimited(String),

    /// Missing or rejected credentials (403)
    #[error("{0}")]
    Forbidden(String),

    /// Unknown route (404)
    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::MalformedInput(_) => ErrorKind::MalformedInput,
            ApiError::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            ApiError::Internal(_) => ErrorKind::Internal,
            ApiError::RateLimited(_) => ErrorKind::RateLimited,
            ApiError::Forbidden(_) => ErrorKind::Forbidden,
            ApiError::NotFound(_) => ErrorKind::NotFound,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            ApiError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidInput(msg) => ApiError::MalformedInput(msg),
            PipelineError::Upstream {
                window,
                windows,
                source: InferenceError::AuthFailure(detail),
            } => {
                // Credential problems are an operator concern; callers get no detail
                tracing::error!(
                    window,
                    windows,
                    "Inference service rejected credentials: {}",
                    detail
                );
                ApiError::Internal("The analysis service is misconfigured".to_string())
            }
            PipelineError::Upstream {
                window,
                windows,
                source,
            } => {
                // Upstream bodies stay in the log
                tracing::warn!(window, windows, "Analysis aborted: {}", source);
                ApiError::UpstreamUnavailable(format!(
                    "The inference service could not complete the analysis (window {} of {})",
                    window, windows
                ))
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedInput(rejection.body_text())
    }
}

impl From<UnknownScheme> for ApiError {
    fn from(err: UnknownScheme) -> Self {
        ApiError::MalformedInput(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorEnvelope::new(self.kind(), self.to_string()));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
