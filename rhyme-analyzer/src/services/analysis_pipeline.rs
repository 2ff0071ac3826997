//! Chunk-dispatch-and-merge pipeline for one analysis request
//!
//! **Failure policy:**
//! - Bad input is rejected before any window is dispatched
//! - A failed inference call aborts the request; results merged from earlier
//!   windows are discarded and nothing is cached
//! - A malformed payload only skips its window and records a warning
//! - A result left empty by malformed payloads is returned but not cached
//!
//! Windows are processed strictly one after another, in document order.

use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use rhyme_common::config::ChunkingConfig;
use rhyme_common::fingerprint;

use crate::models::{AnalysisResult, AnalysisScheme};
use crate::services::chunk_planner;
use crate::services::inference_client::{InferenceClient, InferenceError};
use crate::services::response_validator::{self, ValidationOutcome, ValidationWarning};
use crate::services::result_aggregator::ResultAggregator;
use crate::services::result_cache::ResultCache;

/// Maximum accepted input length, in characters
pub const MAX_TEXT_CHARS: usize = 10_000;

/// Errors that abort a request
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input rejected before any window was processed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An inference call failed; the whole request is abandoned
    #[error("Window {window} of {windows}: {source}")]
    Upstream {
        window: usize,
        windows: usize,
        #[source]
        source: InferenceError,
    },
}

/// Successful analysis with processing details
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub result: Arc<AnalysisResult>,
    /// One per window whose payload was unusable
    pub warnings: Vec<ValidationWarning>,
    pub windows_processed: usize,
    pub dropped_records: usize,
    pub corrected_texts: usize,
    pub cache_hit: bool,
}

/// Trim and bounds-check request text
///
/// Returns the trimmed text, which is what gets analyzed and fingerprinted.
pub fn validate_text_input(text: &str) -> Result<&str, PipelineError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::InvalidInput(
            "text must be a non-empty string".to_string(),
        ));
    }

    let chars = trimmed.chars().count();
    if chars > MAX_TEXT_CHARS {
        return Err(PipelineError::InvalidInput(format!(
            "text is {} characters; the maximum is {}",
            chars, MAX_TEXT_CHARS
        )));
    }

    Ok(trimmed)
}

/// Analysis pipeline shared by all requests
pub struct AnalysisPipeline {
    client: Arc<dyn InferenceClient>,
    cache: Arc<ResultCache>,
    chunking: ChunkingConfig,
}

impl AnalysisPipeline {
    pub fn new(client: Arc<dyn InferenceClient>, cache: Arc<ResultCache>, chunking: ChunkingConfig) -> Self {
        Self {
            client,
            cache,
            chunking,
        }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Analyze `text` under `scheme`
    ///
    /// **Steps:**
    /// 1. Validate input
    /// 2. Return the cached result if this `(text, scheme)` was analyzed before
    /// 3. Plan windows and, for each in order: call, validate, merge
    /// 4. Cache (unless rejected windows left it empty) and return the merged result
    pub async fn analyze(
        &self,
        text: &str,
        scheme: AnalysisScheme,
    ) -> Result<AnalysisOutcome, PipelineError> {
        let text = validate_text_input(text)?;
        let key = fingerprint(text, scheme.id());

        if let Some(result) = self.cache.get(&key) {
            debug!(scheme = %scheme, "Analysis served from cache");
            return Ok(AnalysisOutcome {
                result,
                warnings: Vec::new(),
                windows_processed: 0,
                dropped_records: 0,
                corrected_texts: 0,
                cache_hit: true,
            });
        }

        let started = Instant::now();
        let windows = chunk_planner::plan(
            text,
            self.chunking.max_window_chars,
            self.chunking.overlap_chars,
        );
        let total = windows.len();

        let mut aggregator = ResultAggregator::new(scheme);
        let mut warnings = Vec::new();
        let mut dropped_records = 0;
        let mut corrected_texts = 0;

        for window in &windows {
            let raw = self
                .client
                .call(window.text, scheme, scheme.instructions())
                .await
                .map_err(|source| PipelineError::Upstream {
                    window: window.index,
                    windows: total,
                    source,
                })?;

            match response_validator::validate(&raw, window, scheme) {
                ValidationOutcome::Accepted(batch) => {
                    dropped_records += batch.dropped_records;
                    corrected_texts += batch.corrected_texts;
                    aggregator.merge(batch.annotations);
                }
                ValidationOutcome::Rejected(warning) => {
                    warn!(
                        scheme = %scheme,
                        window = window.index,
                        windows = total,
                        "Skipping window: {}",
                        warning
                    );
                    warnings.push(warning);
                }
            }
        }

        let result = Arc::new(aggregator.finish());

        // An empty result produced by unusable payloads is not an answer
        if result.is_empty() && !warnings.is_empty() {
            warn!(
                scheme = %scheme,
                windows = total,
                warnings = warnings.len(),
                "Not caching empty result from rejected windows"
            );
        } else {
            self.cache.set(key, Arc::clone(&result));
        }

        info!(
            scheme = %scheme,
            windows = total,
            groups = result.group_count(),
            warnings = warnings.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis complete"
        );

        Ok(AnalysisOutcome {
            result,
            warnings,
            windows_processed: total,
            dropped_records,
            corrected_texts,
            cache_hit: false,
        })
    }
}
