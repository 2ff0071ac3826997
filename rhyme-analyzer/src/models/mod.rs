//! Data models for analysis requests and results

pub mod analysis;
pub mod scheme;

pub use analysis::{AnalysisResult, PatternGroup, ValidatedSegment, WordGroupRecord, WordGroupResult};
pub use scheme::{AnalysisScheme, SchemeStyle, UnknownScheme};
