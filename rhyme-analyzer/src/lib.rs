//! rhyme-analyzer library interface
//!
//! Exposes the pipeline, services and router for the binary and for
//! integration tests.

pub mod api;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use rhyme_common::api::IdentityVerifier;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::{AnalysisMetrics, AnalysisPipeline};

/// Per-client inbound limiter, keyed by client address
pub type ClientRateLimiter = DefaultKeyedRateLimiter<String>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AnalysisPipeline>,
    pub metrics: Arc<AnalysisMetrics>,
    /// Decides who may read `/metrics`
    pub verifier: Arc<dyn IdentityVerifier>,
    /// `None` when inbound limiting is disabled
    pub rate_limiter: Option<Arc<ClientRateLimiter>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Error kind of the last failed analysis, for `/health`
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        pipeline: Arc<AnalysisPipeline>,
        metrics: Arc<AnalysisMetrics>,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Self {
        Self {
            pipeline,
            metrics,
            verifier,
            rate_limiter: None,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Allow each client `per_minute` analyze requests (0 disables limiting)
    pub fn with_analyze_quota(mut self, per_minute: u32) -> Self {
        self.rate_limiter = NonZeroU32::new(per_minute)
            .map(|n| Arc::new(RateLimiter::keyed(Quota::per_minute(n))));
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;

    let analyze = api::analyze_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        api::rate_limit::limit_by_client,
    ));

    Router::new()
        .merge(analyze)
        .merge(api::health_routes())
        .merge(api::metrics_routes())
        .fallback(api::not_found)
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
