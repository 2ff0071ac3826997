//! HTTP API handlers for rhyme-analyzer

pub mod analyze;
pub mod health;
pub mod metrics;
pub mod rate_limit;

pub use analyze::analyze_routes;
pub use health::health_routes;
pub use metrics::metrics_routes;

use axum::http::Uri;

use crate::ApiError;

/// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
