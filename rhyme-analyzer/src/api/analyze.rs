//! Analysis endpoint
//!
//! POST /api/analyze with `{"text": "...", "scheme": "default"}`. The scheme
//! is optional and may also be sent as `rhyme_scheme`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::time::Instant;
use tracing::debug;

use crate::models::AnalysisScheme;
use crate::services::AnalysisOutcome;
use crate::{ApiError, ApiResult, AppState};

pub const ANALYZE_PATH: &str = "/api/analyze";

/// Number of windows skipped because their payload was unusable
pub const WARNINGS_HEADER: HeaderName = HeaderName::from_static("x-analysis-warnings");
/// `hit` or `miss`
pub const CACHE_HEADER: HeaderName = HeaderName::from_static("x-cache");

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
    #[serde(default, alias = "rhyme_scheme")]
    pub scheme: Option<String>,
}

/// POST /api/analyze
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();

    let response = match run_analysis(&state, payload, started).await {
        Ok(outcome) => outcome_response(&outcome),
        Err(err) => {
            if !matches!(err, ApiError::MalformedInput(_)) {
                // Kind only; messages can carry upstream detail
                *state.last_error.write().await = Some(err.kind().as_str().to_string());
            }
            err.into_response()
        }
    };

    state.metrics.record_request(
        ANALYZE_PATH,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

async fn run_analysis(
    state: &AppState,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
    started: Instant,
) -> ApiResult<AnalysisOutcome> {
    let Json(request) = payload?;

    let scheme = request
        .scheme
        .as_deref()
        .map(str::parse::<AnalysisScheme>)
        .transpose()?
        .unwrap_or_default();

    let outcome = state.pipeline.analyze(&request.text, scheme).await?;

    if outcome.cache_hit {
        state.metrics.record_cache_hit();
    } else {
        debug!(
            scheme = %scheme,
            windows = outcome.windows_processed,
            dropped_records = outcome.dropped_records,
            corrected_texts = outcome.corrected_texts,
            "Analysis details"
        );
        state.metrics.record_analysis(
            scheme.id(),
            request.text.trim().chars().count(),
            &outcome.result,
            outcome.warnings.len(),
            started.elapsed().as_secs_f64() * 1000.0,
        );
    }

    Ok(outcome)
}

fn outcome_response(outcome: &AnalysisOutcome) -> Response {
    let cache = if outcome.cache_hit { "hit" } else { "miss" };
    (
        [
            (WARNINGS_HEADER, HeaderValue::from(outcome.warnings.len())),
            (CACHE_HEADER, HeaderValue::from_static(cache)),
        ],
        Json(outcome.result.as_ref()),
    )
        .into_response()
}

/// Build analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new().route(ANALYZE_PATH, post(analyze))
}
