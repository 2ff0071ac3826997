//! Supported analysis schemes
//!
//! A scheme selects what the inference service is asked to find and which
//! payload shape comes back: one segment-style scheme (character-indexed
//! phonetic segments) and several word-list schemes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Payload shape produced by a scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeStyle {
    /// `phonetic_segment_groups` with per-segment indices
    Segments,
    /// `rhyme_groups` with plain word lists
    WordList,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisScheme {
    /// Phonetic segments shared across words (segment-style)
    #[default]
    #[serde(rename = "default")]
    Phonetic,
    Perfect,
    Slant,
    Internal,
    Multisyllabic,
}

const SEGMENT_INSTRUCTIONS: &str = r#"You analyze text for shared sound patterns (rhymes, assonance, consonance).
Find groups of word segments that share a sound pattern. Indices are character offsets into the text you were given, starting at 0, end exclusive.
Respond with a single JSON object and nothing else:
{"phonetic_segment_groups": [{"id": "<short group id>", "description": "<the shared sound>", "segments": [{"text": "<exact substring>", "parent_word": "<word containing it>", "global_start": 0, "global_end": 0, "start_in_parent": 0, "end_in_parent": 0}]}]}"#;

const PERFECT_INSTRUCTIONS: &str = r#"You analyze text for perfect rhymes: words whose final stressed vowel and all following sounds are identical.
Respond with a single JSON object and nothing else:
{"rhyme_groups": [{"words": ["<word>", "<word>"], "description": "<the shared rhyme sound>"}]}"#;

const SLANT_INSTRUCTIONS: &str = r#"You analyze text for slant (near) rhymes: words sharing either the final vowel sound or the final consonant sound, but not both.
Respond with a single JSON object and nothing else:
{"rhyme_groups": [{"words": ["<word>", "<word>"], "description": "<what the words share>"}]}"#;

const INTERNAL_INSTRUCTIONS: &str = r#"You analyze text for internal rhymes: rhyming words that occur within the same line, or mid-line against a line ending.
Respond with a single JSON object and nothing else:
{"rhyme_groups": [{"words": ["<word>", "<word>"], "description": "<the shared rhyme sound>"}]}"#;

const MULTISYLLABIC_INSTRUCTIONS: &str = r#"You analyze text for multisyllabic rhymes: runs of two or more syllables that rhyme across words or phrases.
Respond with a single JSON object and nothing else:
{"rhyme_groups": [{"words": ["<word or phrase>", "<word or phrase>"], "description": "<the shared syllable pattern>"}]}"#;

impl AnalysisScheme {
    pub const ALL: [AnalysisScheme; 5] = [
        AnalysisScheme::Phonetic,
        AnalysisScheme::Perfect,
        AnalysisScheme::Slant,
        AnalysisScheme::Internal,
        AnalysisScheme::Multisyllabic,
    ];

    /// Wire identifier, also mixed into the cache fingerprint
    pub fn id(&self) -> &'static str {
        match self {
            AnalysisScheme::Phonetic => "default",
            AnalysisScheme::Perfect => "perfect",
            AnalysisScheme::Slant => "slant",
            AnalysisScheme::Internal => "internal",
            AnalysisScheme::Multisyllabic => "multisyllabic",
        }
    }

    pub fn style(&self) -> SchemeStyle {
        match self {
            AnalysisScheme::Phonetic => SchemeStyle::Segments,
            _ => SchemeStyle::WordList,
        }
    }

    /// System instructions sent with every window of this scheme
    pub fn instructions(&self) -> &'static str {
        match self {
            AnalysisScheme::Phonetic => SEGMENT_INSTRUCTIONS,
            AnalysisScheme::Perfect => PERFECT_INSTRUCTIONS,
            AnalysisScheme::Slant => SLANT_INSTRUCTIONS,
            AnalysisScheme::Internal => INTERNAL_INSTRUCTIONS,
            AnalysisScheme::Multisyllabic => MULTISYLLABIC_INSTRUCTIONS,
        }
    }
}

impl fmt::Display for AnalysisScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Unknown scheme identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown scheme '{0}'. Supported: default, perfect, slant, internal, multisyllabic")]
pub struct UnknownScheme(pub String);

impl FromStr for AnalysisScheme {
    type Err = UnknownScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        AnalysisScheme::ALL
            .into_iter()
            .find(|scheme| scheme.id().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownScheme(s.to_string()))
    }
}
