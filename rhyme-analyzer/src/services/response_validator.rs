//! Validation of untrusted inference responses
//!
//! Turns one window's raw response into annotations in document coordinates.
//! Malformed input never produces an error: a payload that cannot be used at
//! all becomes [`ValidationOutcome::Rejected`] with one warning, and individual
//! bad records inside a usable payload are dropped and counted.
//!
//! **Steps:**
//! 1. Locate one JSON object (whole response, fenced block, or first balanced
//!    `{...}` span)
//! 2. Require the scheme's top-level key
//! 3. Check each record's shape, dropping records that fail
//! 4. Clamp segment indices to the window and drop empty spans
//! 5. Recompute segment text from the window and translate to global offsets

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

use crate::models::{AnalysisScheme, PatternGroup, SchemeStyle, ValidatedSegment, WordGroupRecord};
use crate::services::chunk_planner::ChunkWindow;

/// Top-level key for segment-style payloads
pub const SEGMENT_GROUPS_KEY: &str = "phonetic_segment_groups";

/// Top-level key for word-list payloads
pub const RHYME_GROUPS_KEY: &str = "rhyme_groups";

/// Why a window's payload was unusable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// No JSON object could be located in the response
    NoJsonObject,
    /// The object lacks the scheme's top-level array
    MissingKey(&'static str),
}

/// Non-fatal problem with one window's response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationWarning {
    pub window: usize,
    pub kind: WarningKind,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WarningKind::NoJsonObject => {
                write!(f, "window {}: no JSON object found in response", self.window)
            }
            WarningKind::MissingKey(key) => write!(
                f,
                "window {}: response object has no '{}' array",
                self.window, key
            ),
        }
    }
}

/// Validated annotations for one window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotations {
    Segments(Vec<PatternGroup>),
    WordGroups(Vec<WordGroupRecord>),
}

impl Annotations {
    pub fn len(&self) -> usize {
        match self {
            Annotations::Segments(groups) => groups.len(),
            Annotations::WordGroups(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Usable payload for one window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedBatch {
    pub window: usize,
    pub annotations: Annotations,
    /// Group, segment or word records discarded for shape or range problems
    pub dropped_records: usize,
    /// Segments whose reported text differed from the window substring
    pub corrected_texts: usize,
}

/// Result of validating one window's response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted(ValidatedBatch),
    Rejected(ValidationWarning),
}

/// Validate `raw` as the response for `window` under `scheme`
pub fn validate(raw: &str, window: &ChunkWindow<'_>, scheme: AnalysisScheme) -> ValidationOutcome {
    let Some(payload) = extract_json_object(raw) else {
        return ValidationOutcome::Rejected(ValidationWarning {
            window: window.index,
            kind: WarningKind::NoJsonObject,
        });
    };

    let key = match scheme.style() {
        SchemeStyle::Segments => SEGMENT_GROUPS_KEY,
        SchemeStyle::WordList => RHYME_GROUPS_KEY,
    };

    let Some(records) = payload.get(key).and_then(Value::as_array) else {
        return ValidationOutcome::Rejected(ValidationWarning {
            window: window.index,
            kind: WarningKind::MissingKey(key),
        });
    };

    let batch = match scheme.style() {
        SchemeStyle::Segments => validate_segment_groups(records, window),
        SchemeStyle::WordList => validate_word_groups(records, window.index),
    };

    if batch.dropped_records > 0 || batch.corrected_texts > 0 {
        debug!(
            window = window.index,
            accepted = batch.annotations.len(),
            dropped = batch.dropped_records,
            corrected = batch.corrected_texts,
            "Validated window payload"
        );
    }

    ValidationOutcome::Accepted(batch)
}

// ============================================================================
// JSON Location
// ============================================================================

/// Locate a single JSON object in an LLM response
///
/// Tries, in order:
/// 1. The whole trimmed response
/// 2. Fenced code blocks (```` ```json ```` or bare ```` ``` ````)
/// 3. Balanced `{...}` spans, left to right
pub fn extract_json_object(raw: &str) -> Option<Map<String, Value>> {
    let trimmed = raw.trim();

    if let Some(object) = parse_object(trimmed) {
        return Some(object);
    }

    for block in fenced_blocks(trimmed) {
        if let Some(object) = parse_object(block.trim()) {
            return Some(object);
        }
    }

    let mut search_from = 0;
    while let Some(offset) = trimmed[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = balanced_object_end(trimmed, start) {
            if let Some(object) = parse_object(&trimmed[start..=end]) {
                return Some(object);
            }
        }
        search_from = start + 1;
    }

    None
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// Contents of each ```` ``` ```` fenced block, skipping the info string
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("```") {
        let after_fence = &rest[open + 3..];
        // Info string (e.g. "json") runs to the end of the line
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        match body.find("```") {
            Some(close) => {
                blocks.push(&body[..close]);
                rest = &body[close + 3..];
            }
            None => break,
        }
    }

    blocks
}

/// Byte index of the `}` closing the object opened at `start`
///
/// String literals and escapes are honored, so braces inside strings do not
/// count.
fn balanced_object_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, byte) in text.bytes().enumerate().skip(start) {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

// ============================================================================
// Segment-Style Payloads
// ============================================================================

fn validate_segment_groups(records: &[Value], window: &ChunkWindow<'_>) -> ValidatedBatch {
    let boundaries = window.char_boundaries();
    let mut groups = Vec::new();
    let mut dropped_records = 0;
    let mut corrected_texts = 0;

    for record in records {
        let Some((id, description, raw_segments)) = group_fields(record) else {
            dropped_records += 1;
            continue;
        };

        let mut segments = Vec::with_capacity(raw_segments.len());
        for raw_segment in raw_segments {
            match clamp_segment(raw_segment, window, &boundaries) {
                Some((segment, corrected)) => {
                    if corrected {
                        corrected_texts += 1;
                    }
                    segments.push(segment);
                }
                None => dropped_records += 1,
            }
        }

        // A group whose segments all failed contributes nothing
        if !segments.is_empty() {
            groups.push(PatternGroup {
                id,
                description,
                segments,
            });
        }
    }

    ValidatedBatch {
        window: window.index,
        annotations: Annotations::Segments(groups),
        dropped_records,
        corrected_texts,
    }
}

/// `(id, description, segments)` of a group record with the required shape
fn group_fields(record: &Value) -> Option<(String, String, &Vec<Value>)> {
    let object = record.as_object()?;

    let id = match object.get("id")? {
        Value::String(id) if !id.trim().is_empty() => id.clone(),
        Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
        _ => return None,
    };
    let description = object.get("description")?.as_str()?.to_string();
    let segments = object.get("segments")?.as_array()?;

    if segments.is_empty() {
        return None;
    }

    Some((id, description, segments))
}

/// Check, clamp and translate one segment record
///
/// Returns the segment and whether its text had to be corrected, or `None`
/// when the record is malformed or clamps to an empty span.
fn clamp_segment(
    record: &Value,
    window: &ChunkWindow<'_>,
    boundaries: &[usize],
) -> Option<(ValidatedSegment, bool)> {
    let object = record.as_object()?;

    let reported_text = object.get("text")?.as_str()?;
    let parent_word = object.get("parent_word")?.as_str()?;
    let raw_start = object.get("global_start")?.as_i64()?;
    let raw_end = object.get("global_end")?.as_i64()?;
    let start_in_parent = object.get("start_in_parent")?.as_i64()?;
    let end_in_parent = object.get("end_in_parent")?.as_i64()?;

    let window_len = window.char_len() as i64;
    let start = raw_start.clamp(0, window_len - 1) as usize;
    let end = raw_end.clamp(0, window_len) as usize;
    if start >= end {
        return None;
    }

    let text = &window.text[boundaries[start]..boundaries[end]];
    let corrected = text != reported_text;
    if corrected {
        debug!(
            window = window.index,
            reported = reported_text,
            actual = text,
            "Segment text does not match its span; using span text"
        );
    }

    Some((
        ValidatedSegment {
            text: text.to_string(),
            parent_word: parent_word.to_string(),
            global_start: window.start + start,
            global_end: window.start + end,
            start_in_parent,
            end_in_parent,
        },
        corrected,
    ))
}

// ============================================================================
// Word-List Payloads
// ============================================================================

fn validate_word_groups(records: &[Value], window: usize) -> ValidatedBatch {
    let mut accepted = Vec::new();
    let mut dropped_records = 0;

    for record in records {
        match word_group(record) {
            Some(group) => accepted.push(group),
            None => dropped_records += 1,
        }
    }

    ValidatedBatch {
        window,
        annotations: Annotations::WordGroups(accepted),
        dropped_records,
        corrected_texts: 0,
    }
}

fn word_group(record: &Value) -> Option<WordGroupRecord> {
    let object = record.as_object()?;
    let words = object
        .get("words")?
        .as_array()?
        .iter()
        .map(|w| w.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()?;
    let description = object.get("description")?.as_str()?.to_string();

    if words.is_empty() {
        return None;
    }

    Some(WordGroupRecord { words, description })
}
