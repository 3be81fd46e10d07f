use std::env;
use std::path::{Path, PathBuf};

use anyhow::Result;
use toml::Value;

use tutorkit_core::PipelineConfig;

/// Renders the effective configuration with source attribution, so an
/// operator can see which layer a surprising value came from.
pub fn run(config: &PipelineConfig) -> Result<String> {
    let config_path = detect_config_path();
    let file_doc = config_path.as_deref().and_then(load_file_doc);

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];

    let fields = [
        ("endpoint.base_url", config.endpoint.base_url.clone(), Some("TUTORKIT_BASE_URL")),
        ("endpoint.user_id", config.endpoint.user_id.clone(), Some("TUTORKIT_USER_ID")),
        (
            "endpoint.timeout_secs",
            config.endpoint.timeout_secs.to_string(),
            Some("TUTORKIT_TIMEOUT_SECS"),
        ),
        (
            "quality.min_quality_score",
            config.quality.min_quality_score.to_string(),
            Some("TUTORKIT_MIN_QUALITY_SCORE"),
        ),
        (
            "quality.concept_threshold",
            config.quality.concept_threshold.to_string(),
            Some("TUTORKIT_CONCEPT_THRESHOLD"),
        ),
        (
            "cache.max_entries",
            config.cache.max_entries.to_string(),
            Some("TUTORKIT_CACHE_MAX_ENTRIES"),
        ),
        ("cache.evict_to_percent", config.cache.evict_to_percent.to_string(), None),
        ("health.auto_clear_failures", config.health.auto_clear_failures.to_string(), None),
        ("health.cold_reset_failures", config.health.cold_reset_failures.to_string(), None),
        ("warmup.query", config.warmup.query.clone(), Some("TUTORKIT_WARMUP_QUERY")),
        ("warmup.course_id", config.warmup.course_id.clone(), Some("TUTORKIT_WARMUP_COURSE")),
    ];

    for (field, value, env_var) in fields {
        let source = field_source(field, env_var, file_doc.as_ref(), config_path.as_deref());
        lines.push(format!("  {field} = {value}  ({source})"));
    }

    Ok(lines.join("\n"))
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("tutorkit.toml"), PathBuf::from("config/tutorkit.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_file_doc(path: &Path) -> Option<Value> {
    std::fs::read_to_string(path).ok()?.parse::<Value>().ok()
}

fn field_source(
    field: &str,
    env_var: Option<&str>,
    file_doc: Option<&Value>,
    file_path: Option<&Path>,
) -> String {
    if let Some(var) = env_var {
        if env::var(var).map(|value| !value.trim().is_empty()).unwrap_or(false) {
            return format!("env {var}");
        }
    }
    if let (Some(doc), Some(path)) = (file_doc, file_path) {
        if file_has_field(doc, field) {
            return format!("file {}", path.display());
        }
    }
    "default".to_string()
}

fn file_has_field(doc: &Value, field: &str) -> bool {
    let mut current = doc;
    for part in field.split('.') {
        match current.get(part) {
            Some(next) => current = next,
            None => return false,
        }
    }
    true
}
