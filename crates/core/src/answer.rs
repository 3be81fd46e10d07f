//! Canonical data model for parsed answers.
//!
//! Every answer coming back from the inference endpoint is reduced to a
//! [`ParsedAnswer`] with all four sections present. Missing sections resolve
//! to fixed fallback phrases (string sections) or empty lists, never to an
//! absent field; downstream scoring and rendering rely on that totality.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Fallback phrase used when the strategic lens section is missing.
pub const LENS_FALLBACK: &str = "No strategic thinking lens available";

/// Fallback phrase used when the narrative section is missing.
pub const NARRATIVE_FALLBACK: &str = "No story available";

/// A term/definition pair proposed as relevant to a query.
///
/// Candidates arrive in several shapes (`"Term: Definition"` strings, bare
/// terms, term→definition maps) and are normalized here before filtering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptCandidate {
    pub term: String,
    pub definition: String,
}

impl ConceptCandidate {
    pub fn new(term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self { term: term.into(), definition: definition.into() }
    }

    /// Normalizes a raw candidate string. `"Term: Definition"` splits on the
    /// first colon; a bare term gets an empty definition. A leading colon is
    /// not a term boundary.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.find(':') {
            Some(index) if index > 0 => Self {
                term: trimmed[..index].trim().to_string(),
                definition: trimmed[index + 1..].trim().to_string(),
            },
            _ => Self { term: trimmed.to_string(), definition: String::new() },
        }
    }

    /// Key used for case-insensitive deduplication: the term when present,
    /// otherwise the whole serialized candidate.
    pub fn dedup_key(&self) -> String {
        if self.term.is_empty() {
            format!("{}:{}", self.term, self.definition).to_lowercase()
        } else {
            self.term.trim().to_lowercase()
        }
    }
}

impl fmt::Display for ConceptCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.definition.is_empty() {
            write!(f, "{}", self.term)
        } else {
            write!(f, "{}: {}", self.term, self.definition)
        }
    }
}

/// The four canonical sections of an answer, plus any inline tooltip
/// annotations found in the text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAnswer {
    pub strategic_lens: String,
    pub narrative: String,
    pub follow_up_prompts: Vec<String>,
    pub concepts: Vec<ConceptCandidate>,
    /// Term → definition pairs lifted from embedded annotation spans.
    #[serde(default)]
    pub tooltips: BTreeMap<String, String>,
}

impl ParsedAnswer {
    /// The all-sentinel answer returned for null or unparseable input.
    pub fn sentinel() -> Self {
        Self {
            strategic_lens: LENS_FALLBACK.to_string(),
            narrative: NARRATIVE_FALLBACK.to_string(),
            follow_up_prompts: Vec::new(),
            concepts: Vec::new(),
            tooltips: BTreeMap::new(),
        }
    }

    /// Whether the lens section carries real content rather than the
    /// fallback phrase.
    pub fn has_lens(&self) -> bool {
        !self.strategic_lens.is_empty() && self.strategic_lens != LENS_FALLBACK
    }

    pub fn has_narrative(&self) -> bool {
        !self.narrative.is_empty() && self.narrative != NARRATIVE_FALLBACK
    }
}

impl Default for ParsedAnswer {
    fn default() -> Self {
        Self::sentinel()
    }
}

#[cfg(test)]
mod tests {
    use super::{ConceptCandidate, ParsedAnswer, LENS_FALLBACK};

    #[test]
    fn raw_candidate_splits_on_first_colon() {
        let candidate = ConceptCandidate::from_raw("BATNA: best alternative: explained");
        assert_eq!(candidate.term, "BATNA");
        assert_eq!(candidate.definition, "best alternative: explained");
    }

    #[test]
    fn bare_term_gets_empty_definition() {
        let candidate = ConceptCandidate::from_raw("Scenario Planning");
        assert_eq!(candidate.term, "Scenario Planning");
        assert!(candidate.definition.is_empty());
    }

    #[test]
    fn leading_colon_is_not_a_term_boundary() {
        let candidate = ConceptCandidate::from_raw(": odd fragment");
        assert_eq!(candidate.term, ": odd fragment");
    }

    #[test]
    fn sentinel_answer_has_all_fields() {
        let parsed = ParsedAnswer::sentinel();
        assert_eq!(parsed.strategic_lens, LENS_FALLBACK);
        assert!(!parsed.has_lens());
        assert!(parsed.follow_up_prompts.is_empty());
        assert!(parsed.concepts.is_empty());
    }

    #[test]
    fn dedup_key_is_case_insensitive_on_term() {
        let a = ConceptCandidate::from_raw("SWOT Analysis: one");
        let b = ConceptCandidate::from_raw("swot analysis: two");
        assert_eq!(a.dedup_key(), b.dedup_key());
    }
}
