//! Concept extraction and strict relevance filtering.
//!
//! Backend responses have carried the concept list under several field
//! names over time, in several shapes (arrays, delimited strings, term
//! maps). Extraction picks the first populated field in a fixed priority
//! order, normalizes everything to [`ConceptCandidate`], then filters the
//! list down to concepts actually discussed in the answer text.
//!
//! The relevance filter is deliberately strict: a concept is kept only on a
//! whole-word match of its term or a known alias, and a handful of concepts
//! whose names are common English words additionally require a nearby
//! context term ("decision tree" must appear near words like "map" or
//! "options", otherwise any unrelated use of "decision" would drag it in).

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::answer::ConceptCandidate;

/// Maximum number of concepts surfaced per answer.
pub const MAX_CONCEPTS: usize = 5;

/// Default relevance-score threshold applied when the backend supplies a
/// parallel score array.
pub const DEFAULT_THRESHOLD: f64 = 0.3;

/// Legacy field names, in priority order. The first field holding usable
/// data wins; later fields are never consulted.
const FIELD_PRIORITY: [&str; 4] = ["conceptsToolsPractice", "concepts", "tools", "practice"];

/// Synonyms and indirect mentions per concept. Terms are precise on purpose
/// to keep false positives out.
const ALIASES: &[(&str, &[&str])] = &[
    (
        "decision tree",
        &[
            "decision tree",
            "branching decision",
            "decision branches",
            "tree diagram",
            "branching paths",
            "decision tree analysis",
        ],
    ),
    (
        "strategic framing",
        &[
            "strategic frame",
            "reframe",
            "structure decision",
            "define options",
            "clarify goals",
            "frame your decision",
        ],
    ),
    (
        "risk assessment",
        &["risk assessment", "assess risk", "risk evaluation", "risk analysis", "assess the risks"],
    ),
    (
        "stakeholder alignment",
        &["stakeholder alignment", "align stakeholders", "stakeholder engagement"],
    ),
    (
        "risk tolerance assessment",
        &["risk tolerance", "tolerance assessment", "risk profile assessment"],
    ),
    ("swot analysis", &["swot analysis", "strengths weaknesses opportunities threats"]),
    (
        "cost-benefit analysis",
        &["cost-benefit analysis", "cost benefit analysis", "financial impact analysis"],
    ),
    ("batna", &["batna", "best alternative to negotiated agreement", "best alternative"]),
    ("zopa", &["zopa", "zone of possible agreement", "negotiation zone"]),
    (
        "market research",
        &["market research", "market analysis", "customer research", "research the market"],
    ),
    (
        "competitive analysis",
        &["competitive analysis", "competitor analysis", "competitive assessment"],
    ),
    ("financial modeling", &["financial modeling", "financial model", "financial projection"]),
    ("scenario planning", &["scenario planning", "scenario analysis", "what-if analysis"]),
    (
        "stakeholder analysis",
        &["stakeholder analysis", "stakeholder mapping", "key players analysis"],
    ),
];

/// Concepts whose names collide with everyday language. A term match alone
/// is not enough; one of the context words must also appear in the text.
const CONTEXT_TERMS: &[(&str, &[&str])] = &[(
    "decision tree",
    &[
        "map", "options", "scenario", "outcomes", "analyze", "framework", "branches", "visual",
        "path", "choice", "alternative",
    ],
)];

static LEADING_BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-*\d.]+\s*").expect("bullet pattern"));

/// Extracts the filtered, deduplicated, capped concept list from a raw
/// response payload.
///
/// `threshold` prunes candidates against a parallel `conceptScores` array
/// when one is present; `answer_text` enables the strict relevance filter.
pub fn extract_concepts(
    data: &Value,
    threshold: f64,
    answer_text: Option<&str>,
) -> Vec<ConceptCandidate> {
    let raw_list = select_candidate_field(data);

    let mut filtered = raw_list;
    if threshold > 0.0 {
        if let Some(scores) = data.get("conceptScores").and_then(Value::as_array) {
            filtered = filtered
                .into_iter()
                .enumerate()
                .filter(|(index, _)| {
                    scores.get(*index).and_then(Value::as_f64).unwrap_or(0.0) >= threshold
                })
                .map(|(_, candidate)| candidate)
                .collect();
        }
    }

    if let Some(text) = answer_text {
        filtered.retain(|candidate| is_relevant(candidate, text));
    }

    dedup_and_cap(filtered)
}

/// Applies the strict filter and dedup/cap steps to an already-normalized
/// candidate list, for callers that parsed candidates themselves.
pub fn filter_candidates(
    candidates: Vec<ConceptCandidate>,
    answer_text: Option<&str>,
) -> Vec<ConceptCandidate> {
    let mut filtered = candidates;
    if let Some(text) = answer_text {
        filtered.retain(|candidate| is_relevant(candidate, text));
    }
    dedup_and_cap(filtered)
}

fn select_candidate_field(data: &Value) -> Vec<ConceptCandidate> {
    for field in FIELD_PRIORITY {
        let Some(value) = data.get(field) else {
            continue;
        };
        match value {
            Value::Array(entries) if !entries.is_empty() => {
                return entries.iter().filter_map(candidate_from_value).collect();
            }
            Value::String(text) if !text.trim().is_empty() => {
                return split_delimited(text);
            }
            Value::Object(map) if !map.is_empty() => {
                let extracted: Vec<ConceptCandidate> = map
                    .values()
                    .filter_map(Value::as_str)
                    .filter(|entry| !entry.trim().is_empty())
                    .map(normalize_entry)
                    .collect();
                if !extracted.is_empty() {
                    return extracted;
                }
            }
            _ => {}
        }
    }
    Vec::new()
}

fn candidate_from_value(value: &Value) -> Option<ConceptCandidate> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(normalize_entry(text)),
        Value::Object(map) => {
            let term = map.get("term").and_then(Value::as_str);
            let definition = map.get("definition").and_then(Value::as_str);
            match (term, definition) {
                (Some(term), definition) => {
                    Some(ConceptCandidate::new(term.trim(), definition.unwrap_or("").trim()))
                }
                (None, Some(definition)) => Some(ConceptCandidate::new(definition.trim(), "")),
                (None, None) => None,
            }
        }
        _ => None,
    }
}

/// Splits a delimited string field on newlines (including literal `\n`
/// escape sequences) and commas.
fn split_delimited(text: &str) -> Vec<ConceptCandidate> {
    text.replace("\\n", "\n")
        .split(['\n', ','])
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(normalize_entry)
        .collect()
}

fn normalize_entry(raw: &str) -> ConceptCandidate {
    let stripped = LEADING_BULLET.replace(raw.trim(), "");
    ConceptCandidate::from_raw(&stripped)
}

fn dedup_and_cap(candidates: Vec<ConceptCandidate>) -> Vec<ConceptCandidate> {
    let mut seen = Vec::new();
    let mut deduped = Vec::new();
    for candidate in candidates {
        let key = candidate.dedup_key();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        deduped.push(candidate);
        if deduped.len() == MAX_CONCEPTS {
            break;
        }
    }
    deduped
}

/// Whole-word presence check, matching the term as a unit so that
/// substrings inside longer words ("analyze" vs "analysis") do not count.
fn contains_whole_word(text_lower: &str, needle_lower: &str) -> bool {
    if needle_lower.is_empty() {
        return false;
    }
    let pattern = format!(r"\b{}\b", regex::escape(needle_lower));
    match Regex::new(&pattern) {
        Ok(matcher) => matcher.is_match(text_lower),
        Err(_) => false,
    }
}

fn aliases_for(term_lower: &str) -> Option<&'static [&'static str]> {
    ALIASES
        .iter()
        .find(|(concept, _)| *concept == term_lower)
        .map(|(_, aliases)| *aliases)
}

fn context_terms_for(term_lower: &str) -> Option<&'static [&'static str]> {
    CONTEXT_TERMS
        .iter()
        .find(|(concept, _)| *concept == term_lower)
        .map(|(_, terms)| *terms)
}

/// The strict relevance filter: whole-word term/alias match, plus the
/// contextual co-occurrence gate for ambiguous concept names.
fn is_relevant(candidate: &ConceptCandidate, answer_text: &str) -> bool {
    let term_lower = candidate.term.trim().to_lowercase();
    if term_lower.is_empty() {
        return false;
    }
    let text_lower = answer_text.to_lowercase();

    let mut matches = contains_whole_word(&text_lower, &term_lower);

    if !matches {
        if let Some(aliases) = aliases_for(&term_lower) {
            matches = aliases.iter().any(|alias| contains_whole_word(&text_lower, alias));
        }
    }

    // The candidate may phrase a known concept indirectly; when its text
    // contains an alias of a cataloged concept, check that concept's whole
    // table against the answer.
    if !matches {
        for (concept, aliases) in ALIASES {
            if aliases.iter().any(|alias| term_lower.contains(alias)) {
                matches = contains_whole_word(&text_lower, concept)
                    || aliases.iter().any(|alias| contains_whole_word(&text_lower, alias));
                if matches {
                    break;
                }
            }
        }
    }

    if matches {
        if let Some(context) = context_terms_for(&term_lower) {
            return context.iter().any(|word| contains_whole_word(&text_lower, word));
        }
    }

    matches
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{extract_concepts, filter_candidates, MAX_CONCEPTS};
    use crate::answer::ConceptCandidate;

    #[test]
    fn never_returns_more_than_five_concepts() {
        let data = json!({
            "conceptsToolsPractice": (0..20)
                .map(|index| format!("Concept {index}: definition"))
                .collect::<Vec<_>>(),
        });
        let concepts = extract_concepts(&data, 0.3, None);
        assert_eq!(concepts.len(), MAX_CONCEPTS);
    }

    #[test]
    fn field_priority_stops_at_first_populated_field() {
        let data = json!({
            "conceptsToolsPractice": ["BATNA: walk-away option"],
            "concepts": ["ZOPA: should be ignored"],
        });
        let concepts = extract_concepts(&data, 0.3, None);
        assert_eq!(concepts.len(), 1);
        assert_eq!(concepts[0].term, "BATNA");
    }

    #[test]
    fn delimited_string_field_is_split() {
        let data = json!({
            "concepts": "BATNA: one\\nZOPA: two, Market Research: three",
        });
        let concepts = extract_concepts(&data, 0.3, None);
        let terms: Vec<&str> = concepts.iter().map(|c| c.term.as_str()).collect();
        assert_eq!(terms, vec!["BATNA", "ZOPA", "Market Research"]);
    }

    #[test]
    fn map_shaped_field_uses_values() {
        let data = json!({
            "tools": { "first": "SWOT Analysis: strengths and weaknesses", "second": "" },
        });
        let concepts = extract_concepts(&data, 0.3, None);
        assert_eq!(concepts.len(), 1);
        assert_eq!(concepts[0].term, "SWOT Analysis");
    }

    #[test]
    fn threshold_drops_low_scoring_candidates() {
        let data = json!({
            "concepts": ["Keep: high score", "Drop: low score"],
            "conceptScores": [0.9, 0.1],
        });
        let concepts = extract_concepts(&data, 0.3, None);
        assert_eq!(concepts.len(), 1);
        assert_eq!(concepts[0].term, "Keep");
    }

    #[test]
    fn missing_score_counts_as_zero() {
        let data = json!({
            "concepts": ["Scored: fine", "Unscored: dropped"],
            "conceptScores": [0.5],
        });
        let concepts = extract_concepts(&data, 0.3, None);
        assert_eq!(concepts.len(), 1);
    }

    #[test]
    fn word_boundary_excludes_substring_matches() {
        let candidates = vec![ConceptCandidate::from_raw("SWOT Analysis: framework")];
        let excluded = filter_candidates(candidates.clone(), Some("You must analyze trends"));
        assert!(excluded.is_empty());

        let included = filter_candidates(candidates, Some("Conduct a SWOT Analysis now"));
        assert_eq!(included.len(), 1);
    }

    #[test]
    fn context_gate_disambiguates_decision_tree() {
        let candidates = vec![ConceptCandidate::from_raw("Decision Tree: branching model")];
        let excluded =
            filter_candidates(candidates.clone(), Some("It was a hard decision to make"));
        assert!(excluded.is_empty());

        let included =
            filter_candidates(candidates, Some("Map a decision tree of your options"));
        assert_eq!(included.len(), 1);
    }

    #[test]
    fn alias_match_retains_concept() {
        let candidates = vec![ConceptCandidate::from_raw("BATNA: fallback position")];
        let kept = filter_candidates(
            candidates,
            Some("Work out your best alternative before the meeting"),
        );
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn dedup_is_case_insensitive_and_strips_bullets() {
        let data = json!({
            "concepts": ["- BATNA: first", "batna: second", "BATNA: third"],
        });
        let concepts = extract_concepts(&data, 0.3, None);
        assert_eq!(concepts.len(), 1);
        assert_eq!(concepts[0].definition, "first");
    }

    #[test]
    fn object_candidates_are_normalized() {
        let data = json!({
            "conceptsToolsPractice": [
                { "term": "ZOPA", "definition": "zone of agreement" },
                { "definition": "orphan definition" },
            ],
        });
        let concepts = extract_concepts(&data, 0.3, None);
        assert_eq!(concepts[0], ConceptCandidate::new("ZOPA", "zone of agreement"));
        assert_eq!(concepts[1].term, "orphan definition");
    }

    #[test]
    fn empty_payload_yields_empty_list() {
        let concepts = extract_concepts(&json!({}), 0.3, Some("any text"));
        assert!(concepts.is_empty());
    }
}
