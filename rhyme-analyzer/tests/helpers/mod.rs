//! Shared fixtures for rhyme-analyzer integration tests
//!
//! [`ScriptedInferenceClient`] replays a fixed list of responses, one per
//! window call, and records what it was asked.

#![allow(dead_code)]

pub mod log_capture;

use async_trait::async_trait;
use rhyme_analyzer::models::AnalysisScheme;
use rhyme_analyzer::services::{
    AnalysisMetrics, AnalysisPipeline, InferenceClient, InferenceError, ResultCache,
};
use rhyme_analyzer::AppState;
use rhyme_common::api::StaticTokenVerifier;
use rhyme_common::config::ChunkingConfig;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Inference client that replays scripted responses in order
pub struct ScriptedInferenceClient {
    responses: Mutex<VecDeque<Result<String, InferenceError>>>,
    calls: AtomicUsize,
    windows: Mutex<Vec<String>>,
}

impl ScriptedInferenceClient {
    pub fn new(responses: Vec<Result<String, InferenceError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
            windows: Mutex::new(Vec::new()),
        })
    }

    /// Number of calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Window texts received, in call order
    pub fn windows(&self) -> Vec<String> {
        self.windows.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceClient for ScriptedInferenceClient {
    async fn call(
        &self,
        window_text: &str,
        _scheme: AnalysisScheme,
        _instructions: &str,
    ) -> Result<String, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.windows.lock().unwrap().push(window_text.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(InferenceError::Unknown("script exhausted".to_string())))
    }
}

/// Chunking small enough to split short test strings
pub fn small_chunks(max_window_chars: usize, overlap_chars: usize) -> ChunkingConfig {
    ChunkingConfig {
        max_window_chars,
        overlap_chars,
    }
}

pub fn test_pipeline(
    client: Arc<ScriptedInferenceClient>,
    chunking: ChunkingConfig,
    cache_capacity: usize,
) -> AnalysisPipeline {
    AnalysisPipeline::new(client, Arc::new(ResultCache::new(cache_capacity)), chunking)
}

/// App state with default chunking, an admin token and no inbound limit
pub fn test_state(client: Arc<ScriptedInferenceClient>) -> AppState {
    let pipeline = test_pipeline(client, ChunkingConfig::default(), 100);
    AppState::new(
        Arc::new(pipeline),
        Arc::new(AnalysisMetrics::new().unwrap()),
        Arc::new(StaticTokenVerifier::new([ADMIN_TOKEN])),
    )
}

/// Segment-style payload; each segment is `(text, parent_word, start, end)`
/// with window-relative offsets
pub fn segment_payload(groups: Vec<(&str, &str, Vec<(&str, &str, i64, i64)>)>) -> String {
    let groups: Vec<_> = groups
        .iter()
        .map(|(id, description, segments)| {
            let segments: Vec<_> = segments
                .iter()
                .map(|(text, parent, start, end)| {
                    json!({
                        "text": text,
                        "parent_word": parent,
                        "global_start": start,
                        "global_end": end,
                        "start_in_parent": 0,
                        "end_in_parent": end - start,
                    })
                })
                .collect();
            json!({"id": id, "description": description, "segments": segments})
        })
        .collect();

    json!({ "phonetic_segment_groups": groups }).to_string()
}

/// Word-list payload wrapped the way chat models tend to answer
pub fn word_list_reply(groups: Vec<(Vec<&str>, &str)>) -> String {
    let groups: Vec<_> = groups
        .iter()
        .map(|(words, description)| json!({"words": words, "description": description}))
        .collect();

    format!(
        "Here is the analysis:\n```json\n{}\n```",
        json!({ "rhyme_groups": groups })
    )
}
