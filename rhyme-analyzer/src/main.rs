//! rhyme-analyzer - Rhyme and sound-pattern analysis service
//!
//! **Module Identity:**
//! - Name: rhyme-analyzer
//! - Default bind: 127.0.0.1:8080
//!
//! Splits submitted text into overlapping windows, asks an external inference
//! service to annotate each one, and merges the annotations into a single
//! result per `(text, scheme)`.

use anyhow::Result;
use clap::Parser;
use rhyme_common::api::StaticTokenVerifier;
use rhyme_common::config::load_config;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rhyme_analyzer::services::{AnalysisMetrics, AnalysisPipeline, AnthropicClient, ResultCache};
use rhyme_analyzer::api::rate_limit;
use rhyme_analyzer::{build_router, logging, AppState};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "rhyme-analyzer", version, about = "Rhyme and sound-pattern analysis service")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "RHYME_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (filter, log_level) = logging::startup_filter(EnvFilter::try_from_default_env().ok());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(args.config.as_deref())?;
    log_level.apply_configured(&config.logging.level)?;

    info!(
        "Starting rhyme-analyzer v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    for warning in config.warnings() {
        warn!("Config: {}", warning);
    }

    let client = match AnthropicClient::from_config(&config.inference) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to initialize inference client: {}", e);
            return Err(e.into());
        }
    };
    info!(
        "Inference endpoint: {} (model {})",
        client.endpoint(),
        config.inference.model
    );

    let cache = Arc::new(ResultCache::new(config.cache.capacity));
    let pipeline = Arc::new(AnalysisPipeline::new(
        Arc::new(client),
        cache,
        config.chunking,
    ));
    let metrics = Arc::new(AnalysisMetrics::new()?);
    let verifier = Arc::new(StaticTokenVerifier::new(&config.metrics.admin_tokens));

    let state = AppState::new(pipeline, metrics, verifier)
        .with_analyze_quota(config.rate_limit.analyze_per_minute);
    if let Some(limiter) = &state.rate_limiter {
        rate_limit::spawn_pruning(Arc::clone(limiter), rate_limit::PRUNE_INTERVAL);
        info!(
            "Analyze quota: {} requests/minute per client",
            config.rate_limit.analyze_per_minute
        );
    }
    let app = build_router(state);

    let host = args.host.unwrap_or(config.server.host);
    let port = args.port.unwrap_or(config.server.port);
    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    let addr = listener.local_addr()?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
