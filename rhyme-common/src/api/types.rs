//! Shared API request/response types

use serde::{Deserialize, Serialize};

/// Machine-readable error categories reported to API callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad, missing or oversized input; rejected before any analysis
    MalformedInput,
    /// The external inference service could not be reached or refused a call
    UpstreamUnavailable,
    /// Unexpected failure or server misconfiguration
    Internal,
    /// Inbound request quota exhausted
    RateLimited,
    /// Missing or rejected credentials
    Forbidden,
    /// Unknown route
    NotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedInput => "malformed_input",
            ErrorKind::UpstreamUnavailable => "upstream_unavailable",
            ErrorKind::Internal => "internal",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
        }
    }
}

/// Error response body
///
/// # Examples
///
/// ```
/// use rhyme_common::api::types::{ErrorEnvelope, ErrorKind};
///
/// let body = ErrorEnvelope::new(ErrorKind::MalformedInput, "text must not be empty");
/// let json = serde_json::to_value(&body).unwrap();
/// assert_eq!(json["error"], "malformed_input");
/// assert_eq!(json["message"], "text must not be empty");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorKind,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(error: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            error,
            message: message.into(),
        }
    }
}
