//! Per-client inbound rate limiting
//!
//! Clients are keyed by peer IP. The address comes from axum's
//! `ConnectInfo`, so the server must be started with
//! `into_make_service_with_connect_info::<SocketAddr>()`. Requests without
//! connection info (in-process tests) share the `unknown` bucket.
//!
//! The limiter keeps one entry per client seen; [`spawn_pruning`] drops
//! entries whose quota has fully replenished.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{ApiError, AppState, ClientRateLimiter};

const UNKNOWN_CLIENT: &str = "unknown";

/// How often idle client entries are dropped
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Drop clients whose state is indistinguishable from a fresh one
///
/// Returns the number of clients still tracked.
pub fn prune(limiter: &ClientRateLimiter) -> usize {
    let before = limiter.len();
    limiter.retain_recent();
    limiter.shrink_to_fit();
    let after = limiter.len();
    if after < before {
        debug!(removed = before - after, remaining = after, "Pruned rate limiter clients");
    }
    after
}

/// Prune `limiter` every `every` until the runtime shuts down
pub fn spawn_pruning(limiter: Arc<ClientRateLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            prune(&limiter);
        }
    })
}

fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Reject requests over the client's quota with 429
pub async fn limit_by_client(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(limiter) = &state.rate_limiter {
        let client = client_key(&request);
        if limiter.check_key(&client).is_err() {
            warn!(client = %client, path = %request.uri().path(), "Rate limit exceeded");
            state
                .metrics
                .record_request(request.uri().path(), 429, 0.0);
            return Err(ApiError::RateLimited(
                "Too many analysis requests; try again later".to_string(),
            ));
        }
    }

    Ok(next.run(request).await)
}
