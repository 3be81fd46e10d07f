//! Pipeline configuration.
//!
//! Defaults first, then an optional `tutorkit.toml` patch, then
//! `TUTORKIT_*` environment overrides, then validation. Orchestrator
//! thresholds (quality gate, cache cap, health limits) are configuration
//! rather than constants; the eviction and cool-down heuristics in
//! particular are tunable numbers, not load-bearing invariants.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub endpoint: EndpointConfig,
    pub quality: QualityConfig,
    pub cache: CacheConfig,
    pub health: HealthConfig,
    pub warmup: WarmupConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Base URL of the remote inference endpoint.
    pub base_url: String,
    /// User identifier attached to every exchange request.
    pub user_id: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct QualityConfig {
    /// Scores below this trigger the one-shot quality retry.
    pub min_quality_score: u8,
    /// Relevance-score threshold for concept candidates.
    pub concept_threshold: f64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// Hard cap on cached entries.
    pub max_entries: usize,
    /// Percentage of the cap to evict down to when the cap is exceeded.
    pub evict_to_percent: u8,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HealthConfig {
    /// Consecutive failures that clear the cache.
    pub auto_clear_failures: u32,
    /// Consecutive failures that additionally drop the warm state back to
    /// cold. Must be at least `auto_clear_failures`; smaller runs clear
    /// the cache but stay warm.
    pub cold_reset_failures: u32,
    /// Minimum observed queries before the failure-rate check applies.
    pub min_samples: u32,
    /// Failure rate over the observed window that clears the cache.
    pub failure_rate_limit: f64,
    /// Failures inside the recent window that clear the cache.
    pub recent_failure_limit: u32,
    pub recent_failure_window_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WarmupConfig {
    /// Canonical query used for the priming exchange.
    pub query: String,
    pub course_id: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig {
                base_url: String::new(),
                user_id: "default".to_string(),
                timeout_secs: 30,
            },
            quality: QualityConfig { min_quality_score: 70, concept_threshold: 0.3 },
            cache: CacheConfig { max_entries: 100, evict_to_percent: 80 },
            health: HealthConfig {
                auto_clear_failures: 3,
                cold_reset_failures: 6,
                min_samples: 6,
                failure_rate_limit: 0.5,
                recent_failure_limit: 3,
                recent_failure_window_secs: 60,
            },
            warmup: WarmupConfig {
                query: "What is strategic planning?".to_string(),
                course_id: "decision".to_string(),
            },
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("config file not found at {0}")]
    MissingConfigFile(PathBuf),
    #[error("invalid value in env var {var}: {message}")]
    InvalidEnvValue { var: String, message: String },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    endpoint: Option<EndpointPatch>,
    quality: Option<QualityPatch>,
    cache: Option<CachePatch>,
    health: Option<HealthPatch>,
    warmup: Option<WarmupPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct EndpointPatch {
    base_url: Option<String>,
    user_id: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct QualityPatch {
    min_quality_score: Option<u8>,
    concept_threshold: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct CachePatch {
    max_entries: Option<usize>,
    evict_to_percent: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
struct HealthPatch {
    auto_clear_failures: Option<u32>,
    cold_reset_failures: Option<u32>,
    min_samples: Option<u32>,
    failure_rate_limit: Option<f64>,
    recent_failure_limit: Option<u32>,
    recent_failure_window_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct WarmupPatch {
    query: Option<String>,
    course_id: Option<String>,
}

impl PipelineConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("tutorkit.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(endpoint) = patch.endpoint {
            if let Some(base_url) = endpoint.base_url {
                self.endpoint.base_url = base_url;
            }
            if let Some(user_id) = endpoint.user_id {
                self.endpoint.user_id = user_id;
            }
            if let Some(timeout_secs) = endpoint.timeout_secs {
                self.endpoint.timeout_secs = timeout_secs;
            }
        }

        if let Some(quality) = patch.quality {
            if let Some(min_quality_score) = quality.min_quality_score {
                self.quality.min_quality_score = min_quality_score;
            }
            if let Some(concept_threshold) = quality.concept_threshold {
                self.quality.concept_threshold = concept_threshold;
            }
        }

        if let Some(cache) = patch.cache {
            if let Some(max_entries) = cache.max_entries {
                self.cache.max_entries = max_entries;
            }
            if let Some(evict_to_percent) = cache.evict_to_percent {
                self.cache.evict_to_percent = evict_to_percent;
            }
        }

        if let Some(health) = patch.health {
            if let Some(auto_clear_failures) = health.auto_clear_failures {
                self.health.auto_clear_failures = auto_clear_failures;
            }
            if let Some(cold_reset_failures) = health.cold_reset_failures {
                self.health.cold_reset_failures = cold_reset_failures;
            }
            if let Some(min_samples) = health.min_samples {
                self.health.min_samples = min_samples;
            }
            if let Some(failure_rate_limit) = health.failure_rate_limit {
                self.health.failure_rate_limit = failure_rate_limit;
            }
            if let Some(recent_failure_limit) = health.recent_failure_limit {
                self.health.recent_failure_limit = recent_failure_limit;
            }
            if let Some(recent_failure_window_secs) = health.recent_failure_window_secs {
                self.health.recent_failure_window_secs = recent_failure_window_secs;
            }
        }

        if let Some(warmup) = patch.warmup {
            if let Some(query) = warmup.query {
                self.warmup.query = query;
            }
            if let Some(course_id) = warmup.course_id {
                self.warmup.course_id = course_id;
            }
        }
    }

    /// Overlays `TUTORKIT_*` environment variables. The lookup is injected
    /// so tests can run without touching process state.
    fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = non_empty(lookup("TUTORKIT_BASE_URL")) {
            self.endpoint.base_url = value;
        }
        if let Some(value) = non_empty(lookup("TUTORKIT_USER_ID")) {
            self.endpoint.user_id = value;
        }
        if let Some(value) = non_empty(lookup("TUTORKIT_TIMEOUT_SECS")) {
            self.endpoint.timeout_secs = parse_env("TUTORKIT_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = non_empty(lookup("TUTORKIT_MIN_QUALITY_SCORE")) {
            self.quality.min_quality_score = parse_env("TUTORKIT_MIN_QUALITY_SCORE", &value)?;
        }
        if let Some(value) = non_empty(lookup("TUTORKIT_CONCEPT_THRESHOLD")) {
            self.quality.concept_threshold = parse_env("TUTORKIT_CONCEPT_THRESHOLD", &value)?;
        }
        if let Some(value) = non_empty(lookup("TUTORKIT_CACHE_MAX_ENTRIES")) {
            self.cache.max_entries = parse_env("TUTORKIT_CACHE_MAX_ENTRIES", &value)?;
        }
        if let Some(value) = non_empty(lookup("TUTORKIT_WARMUP_QUERY")) {
            self.warmup.query = value;
        }
        if let Some(value) = non_empty(lookup("TUTORKIT_WARMUP_COURSE")) {
            self.warmup.course_id = value;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "endpoint.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.quality.min_quality_score > 100 {
            return Err(ConfigError::Validation(
                "quality.min_quality_score must be at most 100".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.quality.concept_threshold) {
            return Err(ConfigError::Validation(
                "quality.concept_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(ConfigError::Validation(
                "cache.max_entries must be greater than zero".to_string(),
            ));
        }
        if self.cache.evict_to_percent == 0 || self.cache.evict_to_percent >= 100 {
            return Err(ConfigError::Validation(
                "cache.evict_to_percent must be between 1 and 99".to_string(),
            ));
        }
        if self.health.auto_clear_failures == 0 {
            return Err(ConfigError::Validation(
                "health.auto_clear_failures must be greater than zero".to_string(),
            ));
        }
        if self.health.cold_reset_failures < self.health.auto_clear_failures {
            return Err(ConfigError::Validation(
                "health.cold_reset_failures must be at least health.auto_clear_failures"
                    .to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.health.failure_rate_limit) {
            return Err(ConfigError::Validation(
                "health.failure_rate_limit must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.warmup.query.trim().is_empty() {
            return Err(ConfigError::Validation(
                "warmup.query must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("tutorkit.toml"), PathBuf::from("config/tutorkit.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str::<ConfigPatch>(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|error: T::Err| ConfigError::InvalidEnvValue {
        var: var.to_string(),
        message: error.to_string(),
    })
}
