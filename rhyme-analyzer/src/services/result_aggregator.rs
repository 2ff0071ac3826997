//! Cross-window merging of validated annotations
//!
//! Windows are merged in increasing offset order. Segment groups are keyed by
//! the inference service's own group identifier; no sound-similarity
//! reasoning happens here, so two windows that describe the same pattern
//! under different identifiers stay separate groups.

use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::models::{
    AnalysisResult, AnalysisScheme, PatternGroup, SchemeStyle, ValidatedSegment, WordGroupRecord,
    WordGroupResult,
};
use crate::services::response_validator::Annotations;

type SegmentKey = (usize, usize, String);

fn segment_key(segment: &ValidatedSegment) -> SegmentKey {
    let (start, end, parent) = segment.dedup_key();
    (start, end, parent.to_string())
}

/// Accumulates one request's merged result
#[derive(Debug)]
pub struct ResultAggregator {
    scheme: AnalysisScheme,
    groups: Vec<PatternGroup>,
    /// Group id → position in `groups`
    group_index: HashMap<String, usize>,
    /// Per-group set of `(global_start, global_end, parent_word)`
    seen_segments: Vec<HashSet<SegmentKey>>,
    word_groups: Vec<WordGroupRecord>,
    seen_word_groups: HashSet<WordGroupRecord>,
}

impl ResultAggregator {
    pub fn new(scheme: AnalysisScheme) -> Self {
        Self {
            scheme,
            groups: Vec::new(),
            group_index: HashMap::new(),
            seen_segments: Vec::new(),
            word_groups: Vec::new(),
            seen_word_groups: HashSet::new(),
        }
    }

    /// Merge one window's annotations
    ///
    /// Segment groups: a new identifier creates a group; a known identifier
    /// appends segments not already present, keeping the first-seen
    /// description. Word-list records: appended unless an identical record
    /// exists.
    pub fn merge(&mut self, annotations: Annotations) {
        match (self.scheme.style(), annotations) {
            (SchemeStyle::Segments, Annotations::Segments(groups)) => {
                for group in groups {
                    self.merge_group(group);
                }
            }
            (SchemeStyle::WordList, Annotations::WordGroups(records)) => {
                for record in records {
                    self.merge_word_group(record);
                }
            }
            (style, annotations) => {
                warn!(
                    scheme = %self.scheme,
                    ?style,
                    records = annotations.len(),
                    "Ignoring annotations that do not match the scheme style"
                );
            }
        }
    }

    fn merge_group(&mut self, incoming: PatternGroup) {
        let position = match self.group_index.get(&incoming.id) {
            Some(&position) => position,
            None => {
                let position = self.groups.len();
                self.group_index.insert(incoming.id.clone(), position);
                self.groups.push(PatternGroup {
                    id: incoming.id,
                    description: incoming.description,
                    segments: Vec::with_capacity(incoming.segments.len()),
                });
                self.seen_segments.push(HashSet::new());
                position
            }
        };

        let group = &mut self.groups[position];
        let seen = &mut self.seen_segments[position];
        for segment in incoming.segments {
            if seen.insert(segment_key(&segment)) {
                group.segments.push(segment);
            }
        }
    }

    fn merge_word_group(&mut self, record: WordGroupRecord) {
        if self.seen_word_groups.insert(record.clone()) {
            self.word_groups.push(record);
        }
    }

    /// Groups merged so far (segment-style)
    pub fn groups(&self) -> &[PatternGroup] {
        &self.groups
    }

    /// Records merged so far (word-list style)
    pub fn word_groups(&self) -> &[WordGroupRecord] {
        &self.word_groups
    }

    /// Finish aggregation in first-encounter order
    pub fn finish(self) -> AnalysisResult {
        match self.scheme.style() {
            SchemeStyle::Segments => AnalysisResult::Segments(self.groups),
            SchemeStyle::WordList => AnalysisResult::WordGroups(WordGroupResult {
                kind: self.scheme.id().to_string(),
                data: self.word_groups,
            }),
        }
    }
}
