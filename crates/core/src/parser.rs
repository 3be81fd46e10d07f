//! Section parser for semi-structured answer text.
//!
//! The generator emits answers as free text with bold-marked section headers
//! (`**Strategic Thinking Lens**`, `**Follow-up Prompts**`, ...). Parsing is
//! a two-pass tokenizer: first scan the text for header tokens at line
//! starts, then assign each non-header span to the preceding recognized
//! header. Spans following an unrecognized header are dropped rather than
//! misattributed to the previous section.
//!
//! `parse` is total: any input, including the empty string, yields a
//! [`ParsedAnswer`] with every field present.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::answer::{ConceptCandidate, ParsedAnswer};

static HEADER_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*\*\*([^*\n]+?)\*\*:?").expect("header token pattern"));

static TRAILING_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\s*[-\u{2013}\u{2014}=_]+\s*)+$").expect("separator pattern"));

static BULLET_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-*\d.]+\s*").expect("bullet marker pattern"));

// Greedy term-boundary detector for run-on concept blocks of the shape
// `X: ... Y: ... Z: ...`. A boundary is a capitalized phrase ending in a
// colon followed by whitespace.
static TERM_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][A-Za-z0-9()/'\- ]{1,60}?:\s").expect("term boundary pattern"));

static TOOLTIP_SPAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<span class="tooltip" data-tooltip="([^"]+)">([^<]+)</span>"#)
        .expect("tooltip span pattern")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    Lens,
    Narrative,
    Prompts,
    Concepts,
}

fn recognize_header(title: &str) -> Option<Section> {
    let normalized = title.trim().trim_end_matches(':').trim().to_lowercase();
    match normalized.as_str() {
        "strategic thinking lens" => Some(Section::Lens),
        "story in action" => Some(Section::Narrative),
        "follow-up prompts" | "reflection prompts" => Some(Section::Prompts),
        "concepts/tools" | "concepts/tools/practice reference" | "concepts" | "tools"
        | "practice" => Some(Section::Concepts),
        _ => None,
    }
}

/// Parses a raw answer into its four canonical sections.
///
/// Header matching is case-insensitive and tolerates the `**Header:**`
/// colon variant. Content for a recognized header runs to the next header
/// token of any kind, or end of input. Unrecognized headers and their
/// spans are skipped.
pub fn parse(raw: &str) -> ParsedAnswer {
    if raw.trim().is_empty() {
        return ParsedAnswer::sentinel();
    }

    struct HeaderToken {
        section: Option<Section>,
        content_start: usize,
        token_start: usize,
    }

    let tokens: Vec<HeaderToken> = HEADER_TOKEN
        .captures_iter(raw)
        .map(|captures| {
            let whole = captures.get(0).expect("match has group 0");
            let title = captures.get(1).expect("header has title group");
            HeaderToken {
                section: recognize_header(title.as_str()),
                content_start: whole.end(),
                token_start: whole.start(),
            }
        })
        .collect();

    let mut parsed = ParsedAnswer::sentinel();
    parsed.tooltips = extract_tooltips(raw);

    for (index, token) in tokens.iter().enumerate() {
        let Some(section) = token.section else {
            continue;
        };
        let content_end =
            tokens.get(index + 1).map(|next| next.token_start).unwrap_or(raw.len());
        let content = clean_content(&raw[token.content_start..content_end]);
        if content.is_empty() {
            continue;
        }
        match section {
            Section::Lens => parsed.strategic_lens = content,
            Section::Narrative => parsed.narrative = content,
            Section::Prompts => parsed.follow_up_prompts = split_list_lines(&content),
            Section::Concepts => parsed.concepts = parse_concept_block(&content),
        }
    }

    parsed
}

/// Strips trailing runs of `-`/`=`/`_` separator artifacts and trims
/// whitespace.
fn clean_content(content: &str) -> String {
    TRAILING_SEPARATORS.replace(content, "").trim().to_string()
}

/// Splits a list-shaped section on newlines, stripping leading bullet or
/// number markers and discarding empty lines.
fn split_list_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| BULLET_MARKER.replace(line.trim(), "").to_string())
        .map(|line| clean_content(&line))
        .filter(|line| !line.is_empty())
        .collect()
}

/// Tokenizes the concept block into candidates.
///
/// The generator is not guaranteed to emit one concept per line, so two
/// paths exist with a fixed precedence: the newline path first, then for
/// run-on single-line blocks a greedy `Term:`-boundary split, then a comma
/// fallback when fewer than two boundaries are present.
fn parse_concept_block(content: &str) -> Vec<ConceptCandidate> {
    if content.contains('\n') {
        return split_list_lines(content)
            .iter()
            .map(|line| ConceptCandidate::from_raw(line))
            .collect();
    }

    let boundaries: Vec<usize> =
        TERM_BOUNDARY.find_iter(content).map(|found| found.start()).collect();
    if boundaries.len() >= 2 {
        let mut candidates = Vec::with_capacity(boundaries.len());
        for (index, start) in boundaries.iter().enumerate() {
            let end = boundaries.get(index + 1).copied().unwrap_or(content.len());
            let segment = clean_content(&content[*start..end]);
            if !segment.is_empty() {
                candidates.push(ConceptCandidate::from_raw(&segment));
            }
        }
        return candidates;
    }

    content
        .split(',')
        .map(|segment| clean_content(segment))
        .filter(|segment| !segment.is_empty())
        .map(|segment| ConceptCandidate::from_raw(&segment))
        .collect()
}

/// Collects embedded `<span class="tooltip" ...>` annotations anywhere in
/// the answer text, keyed by term.
fn extract_tooltips(raw: &str) -> BTreeMap<String, String> {
    TOOLTIP_SPAN
        .captures_iter(raw)
        .map(|captures| {
            let definition = captures.get(1).expect("tooltip definition").as_str();
            let term = captures.get(2).expect("tooltip term").as_str();
            (term.to_string(), definition.to_string())
        })
        .collect()
}
