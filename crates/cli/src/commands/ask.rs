use anyhow::Result;
use serde::Serialize;

use tutorkit_client::{CacheEntry, QueryError};
use tutorkit_core::PipelineConfig;

use super::build_orchestrator;

#[derive(Serialize)]
struct AskOutput<'a> {
    query: &'a str,
    course: &'a str,
    score: u8,
    status: String,
    strategic_lens: &'a str,
    narrative: &'a str,
    follow_up_prompts: &'a [String],
    concepts: Vec<String>,
}

pub async fn run(config: PipelineConfig, query: &str, course: &str, json: bool) -> Result<String> {
    let orchestrator = build_orchestrator(config)?;

    let entry = match orchestrator.query(query, course).await {
        Ok(entry) => entry,
        Err(QueryError::Rejected { message }) => {
            return Ok(format!("query rejected: {message}"));
        }
        Err(error) => return Err(error.into()),
    };

    if json {
        return Ok(serde_json::to_string_pretty(&AskOutput {
            query,
            course,
            score: entry.quality.score,
            status: entry.quality.status.to_string(),
            strategic_lens: &entry.parsed.strategic_lens,
            narrative: &entry.parsed.narrative,
            follow_up_prompts: &entry.parsed.follow_up_prompts,
            concepts: entry.parsed.concepts.iter().map(ToString::to_string).collect(),
        })?);
    }

    Ok(render_text(query, &entry, orchestrator.should_suggest_retry(query, course).await))
}

fn render_text(query: &str, entry: &CacheEntry, suggest_retry: bool) -> String {
    let mut lines = vec![
        format!("# {query}"),
        String::new(),
        "## Strategic Thinking Lens".to_string(),
        entry.parsed.strategic_lens.clone(),
        String::new(),
        "## Story in Action".to_string(),
        entry.parsed.narrative.clone(),
    ];

    if !entry.parsed.follow_up_prompts.is_empty() {
        lines.push(String::new());
        lines.push("## Follow-up Prompts".to_string());
        for prompt in &entry.parsed.follow_up_prompts {
            lines.push(format!("- {prompt}"));
        }
    }

    if !entry.parsed.concepts.is_empty() {
        lines.push(String::new());
        lines.push("## Concepts/Tools".to_string());
        for concept in &entry.parsed.concepts {
            lines.push(format!("- {concept}"));
        }
    }

    lines.push(String::new());
    lines.push(format!("quality: {} ({})", entry.quality.score, entry.quality.status));
    if suggest_retry {
        lines.push("this answer looked thin; asking again may produce a better one".to_string());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use tutorkit_client::CacheEntry;
    use tutorkit_core::quality::{QualityAssessment, QualityStatus};
    use tutorkit_core::ParsedAnswer;

    use super::render_text;

    #[test]
    fn text_rendering_includes_sections_and_quality() {
        let mut parsed = ParsedAnswer::sentinel();
        parsed.strategic_lens = "Think in alternatives.".to_string();
        parsed.narrative = "A buyer priced a second source.".to_string();
        parsed.follow_up_prompts = vec!["What is your walk-away option here?".to_string()];
        let entry = CacheEntry {
            raw_answer: String::new(),
            parsed,
            quality: QualityAssessment { score: 84, status: QualityStatus::Consistent },
            inserted_at: Utc::now(),
        };

        let text = render_text("What is BATNA?", &entry, false);
        assert!(text.contains("## Strategic Thinking Lens"));
        assert!(text.contains("Think in alternatives."));
        assert!(text.contains("- What is your walk-away option here?"));
        assert!(text.contains("quality: 84 (consistent)"));
        assert!(!text.contains("asking again"));
    }

    #[test]
    fn low_quality_suggests_a_retry() {
        let entry = CacheEntry {
            raw_answer: String::new(),
            parsed: ParsedAnswer::sentinel(),
            quality: QualityAssessment { score: 8, status: QualityStatus::Low },
            inserted_at: Utc::now(),
        };
        let text = render_text("What is BATNA?", &entry, true);
        assert!(text.contains("asking again"));
    }
}
