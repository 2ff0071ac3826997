//! Service modules for the analysis pipeline
//!
//! Request flow: plan windows → call inference per window → validate payload
//! → merge into the running result → cache.

pub mod analysis_pipeline;
pub mod chunk_planner;
pub mod inference_client;
pub mod metrics;
pub mod response_validator;
pub mod result_aggregator;
pub mod result_cache;

pub use analysis_pipeline::{AnalysisOutcome, AnalysisPipeline, PipelineError, MAX_TEXT_CHARS};
pub use chunk_planner::ChunkWindow;
pub use inference_client::{AnthropicClient, InferenceClient, InferenceError};
pub use metrics::AnalysisMetrics;
pub use response_validator::{Annotations, ValidationOutcome, ValidationWarning, WarningKind};
pub use result_aggregator::ResultAggregator;
pub use result_cache::ResultCache;
