//! Prometheus exposition endpoint
//!
//! GET /metrics requires `Authorization: Bearer <admin token>`; the token is
//! checked by the configured [`IdentityVerifier`](rhyme_common::api::IdentityVerifier).

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use rhyme_common::api::{extract_bearer_token, ApiAuthError};
use tracing::{debug, warn};

use crate::services::AnalysisMetrics;
use crate::{ApiError, ApiResult, AppState};

pub const METRICS_PATH: &str = "/metrics";

/// GET /metrics
pub async fn metrics(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let identity = match extract_bearer_token(auth_header) {
        Ok(token) => state.verifier.verify(token).await,
        Err(err) => Err(err),
    };

    let identity = identity.map_err(|err| {
        if let ApiAuthError::Provider(detail) = &err {
            warn!("Identity provider failed: {}", detail);
        }
        ApiError::Forbidden(err.to_string())
    })?;
    debug!(admin = %identity.label, "Serving metrics");

    let body = state
        .metrics
        .render()
        .map_err(|e| ApiError::Internal(format!("Failed to encode metrics: {}", e)))?;

    Ok(([(header::CONTENT_TYPE, AnalysisMetrics::content_type())], body).into_response())
}

/// Build metrics routes
pub fn metrics_routes() -> Router<AppState> {
    Router::new().route(METRICS_PATH, get(metrics))
}
