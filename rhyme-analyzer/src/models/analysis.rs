//! Analysis result types
//!
//! Segment indices are character offsets into the full analyzed text
//! (after input trimming), end exclusive.

use serde::{Deserialize, Serialize};

/// One segment that survived validation, in document coordinates
///
/// Invariant: `global_start < global_end <= document length`, and `text` is
/// exactly the document substring `[global_start, global_end)`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ValidatedSegment {
    pub text: String,
    pub parent_word: String,
    pub global_start: usize,
    pub global_end: usize,
    /// Offsets within `parent_word` as reported by the inference service
    pub start_in_parent: i64,
    pub end_in_parent: i64,
}

impl ValidatedSegment {
    /// Identity used for de-duplication across windows
    pub fn dedup_key(&self) -> (usize, usize, &str) {
        (self.global_start, self.global_end, self.parent_word.as_str())
    }
}

/// Segments sharing one service-assigned group identifier
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PatternGroup {
    pub id: String,
    pub description: String,
    pub segments: Vec<ValidatedSegment>,
}

/// A word-list group (word-list schemes)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct WordGroupRecord {
    pub words: Vec<String>,
    pub description: String,
}

/// Word-list result, tagged with the scheme that produced it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WordGroupResult {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Vec<WordGroupRecord>,
}

/// Final merged result for one analyzed text
///
/// Serializes as a bare array of groups (segment-style) or as
/// `{"type": ..., "data": [...]}` (word-list style).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AnalysisResult {
    Segments(Vec<PatternGroup>),
    WordGroups(WordGroupResult),
}

impl AnalysisResult {
    /// Number of groups (pattern groups or word-list records)
    pub fn group_count(&self) -> usize {
        match self {
            AnalysisResult::Segments(groups) => groups.len(),
            AnalysisResult::WordGroups(result) => result.data.len(),
        }
    }

    /// Number of segments (segment-style) or words (word-list style)
    pub fn item_count(&self) -> usize {
        match self {
            AnalysisResult::Segments(groups) => groups.iter().map(|g| g.segments.len()).sum(),
            AnalysisResult::WordGroups(result) => result.data.iter().map(|r| r.words.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.group_count() == 0
    }
}
