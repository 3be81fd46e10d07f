//! Heuristic quality scoring for parsed answers.
//!
//! The score favors content shape over raw length: each section is judged
//! on whether it is well-formed and non-trivial (lens word count in a
//! target band, enough actionable prompts, enough surviving concepts),
//! because length alone proved an unreliable proxy for usefully structured
//! answers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::answer::{ConceptCandidate, ParsedAnswer};

/// Prompts shorter than this are counted as filler rather than actionable.
pub const ACTIONABLE_PROMPT_MIN_CHARS: usize = 20;

const FULL_CREDIT: f64 = 100.0;
const PARTIAL_CREDIT: f64 = 60.0;
const MINIMAL_CREDIT: f64 = 20.0;

const LENS_WEIGHT: f64 = 0.4;
const PROMPT_WEIGHT: f64 = 0.3;
const CONCEPT_WEIGHT: f64 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityStatus {
    Low,
    Consistent,
    High,
}

impl QualityStatus {
    /// Coarse score equivalent, used when averaging cached statuses to
    /// estimate whether the endpoint has cooled down.
    pub fn approximate_score(self) -> u8 {
        match self {
            Self::High => 90,
            Self::Consistent => 80,
            Self::Low => 40,
        }
    }
}

impl fmt::Display for QualityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "low",
            Self::Consistent => "consistent",
            Self::High => "high",
        };
        write!(f, "{label}")
    }
}

/// A 0–100 score and coarse status, derived deterministically from a parsed
/// answer and its filtered concepts. Never stored apart from the answer it
/// describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub score: u8,
    pub status: QualityStatus,
}

/// Scores a parsed answer. Pure function, no I/O.
pub fn score(parsed: &ParsedAnswer, concepts: &[ConceptCandidate]) -> QualityAssessment {
    let lens_words = if parsed.has_lens() {
        parsed.strategic_lens.split_whitespace().count()
    } else {
        0
    };
    let actionable_prompts = parsed
        .follow_up_prompts
        .iter()
        .filter(|prompt| prompt.len() > ACTIONABLE_PROMPT_MIN_CHARS)
        .count();
    let concept_count = concepts.len();

    let weighted = LENS_WEIGHT * lens_sub_score(lens_words)
        + PROMPT_WEIGHT * count_sub_score(actionable_prompts)
        + CONCEPT_WEIGHT * count_sub_score(concept_count);
    let score = weighted.round().clamp(0.0, 100.0) as u8;

    let status = derive_status(parsed, lens_words, actionable_prompts, concept_count);
    QualityAssessment { score, status }
}

/// Full credit for 100–150 words, partial down to 50 or up to 300, minimal
/// outside that band.
fn lens_sub_score(words: usize) -> f64 {
    match words {
        100..=150 => FULL_CREDIT,
        50..=99 | 151..=300 => PARTIAL_CREDIT,
        _ => MINIMAL_CREDIT,
    }
}

/// Shared banding for prompt and concept counts: full credit at >= 4,
/// graded down to >= 2, minimal below, zero for nothing at all.
fn count_sub_score(count: usize) -> f64 {
    match count {
        0 => 0.0,
        1 => MINIMAL_CREDIT,
        2 | 3 => PARTIAL_CREDIT,
        _ => FULL_CREDIT,
    }
}

/// Structural completeness first: any missing section forces `low`
/// regardless of score. With all sections present, prompts and concepts
/// must both clear their minimum counts to escape `low`; the lens word
/// band then separates `high` from `consistent`.
fn derive_status(
    parsed: &ParsedAnswer,
    lens_words: usize,
    actionable_prompts: usize,
    concept_count: usize,
) -> QualityStatus {
    let structurally_complete = parsed.has_lens()
        && parsed.has_narrative()
        && !parsed.follow_up_prompts.is_empty()
        && !parsed.concepts.is_empty();
    if !structurally_complete {
        return QualityStatus::Low;
    }
    if actionable_prompts < 2 || concept_count < 2 {
        return QualityStatus::Low;
    }
    if (80..=200).contains(&lens_words) {
        QualityStatus::High
    } else {
        QualityStatus::Consistent
    }
}

#[cfg(test)]
mod tests {
    use super::{score, QualityStatus};
    use crate::answer::{ConceptCandidate, ParsedAnswer};

    fn answer_with(lens_words: usize, prompts: usize, concepts: usize) -> (ParsedAnswer, Vec<ConceptCandidate>) {
        let mut parsed = ParsedAnswer::sentinel();
        parsed.strategic_lens = vec!["word"; lens_words].join(" ");
        parsed.narrative = "A team worked through the framework together.".to_string();
        parsed.follow_up_prompts = (0..prompts)
            .map(|index| format!("What would change if constraint {index} were removed?"))
            .collect();
        let candidates: Vec<ConceptCandidate> = (0..concepts)
            .map(|index| ConceptCandidate::new(format!("Concept {index}"), "definition"))
            .collect();
        parsed.concepts = candidates.clone();
        (parsed, candidates)
    }

    #[test]
    fn rich_answer_outscores_thin_answer() {
        let (rich, rich_concepts) = answer_with(120, 4, 4);
        let (thin, thin_concepts) = answer_with(10, 1, 1);
        let rich_assessment = score(&rich, &rich_concepts);
        let thin_assessment = score(&thin, &thin_concepts);
        assert!(rich_assessment.score > thin_assessment.score);
    }

    #[test]
    fn full_band_answer_scores_one_hundred_and_high() {
        let (parsed, concepts) = answer_with(120, 4, 4);
        let assessment = score(&parsed, &concepts);
        assert_eq!(assessment.score, 100);
        assert_eq!(assessment.status, QualityStatus::High);
    }

    #[test]
    fn missing_section_forces_low_status() {
        let (mut parsed, concepts) = answer_with(120, 4, 4);
        parsed.narrative = crate::answer::NARRATIVE_FALLBACK.to_string();
        let assessment = score(&parsed, &concepts);
        assert_eq!(assessment.status, QualityStatus::Low);
    }

    #[test]
    fn long_lens_with_good_lists_is_consistent() {
        let (parsed, concepts) = answer_with(250, 3, 3);
        let assessment = score(&parsed, &concepts);
        assert_eq!(assessment.status, QualityStatus::Consistent);
    }

    #[test]
    fn too_few_actionable_prompts_force_low() {
        let (mut parsed, concepts) = answer_with(120, 4, 4);
        parsed.follow_up_prompts = vec!["Why?".to_string(), "How?".to_string()];
        let assessment = score(&parsed, &concepts);
        assert_eq!(assessment.status, QualityStatus::Low);
    }

    #[test]
    fn scoring_is_deterministic() {
        let (parsed, concepts) = answer_with(90, 3, 2);
        assert_eq!(score(&parsed, &concepts), score(&parsed, &concepts));
    }

    #[test]
    fn short_prompts_do_not_count_as_actionable() {
        let (mut parsed, concepts) = answer_with(120, 0, 4);
        parsed.follow_up_prompts =
            vec!["Short".to_string(), "Also short".to_string(), "Tiny".to_string()];
        let assessment = score(&parsed, &concepts);
        assert_eq!(assessment.status, QualityStatus::Low);
    }
}
