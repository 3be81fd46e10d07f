//! Query orchestration: cache, warm-up state machine, quality-gated retry.
//!
//! All outbound exchanges go through [`QueryOrchestrator::query`]. The
//! orchestrator owns the response cache and the endpoint health counters;
//! callers hold it behind an `Arc` and share it freely.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use tutorkit_core::quality::QualityStatus;
use tutorkit_core::{concepts, parser, quality, ParsedAnswer, PipelineConfig};

use crate::cache::{CacheEntry, CacheKey, CacheStats, ResponseCache};
use crate::error::QueryError;
use crate::health::{EndpointHealth, HealthSnapshot, HealthVerdict};
use crate::transport::{ExchangeReply, ExchangeRequest, ExchangeTransport};

/// Endpoint priming state. `Warming` is only ever observed by the task
/// holding the warm-up gate; other callers wait on the gate instead of
/// polling the state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WarmState {
    Cold,
    Warming,
    Warm,
}

/// Combined view of cache and health counters for diagnostics.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct OrchestratorStats {
    pub cache: CacheStats,
    pub health: HealthSnapshot,
    pub is_warm: bool,
}

struct State {
    cache: ResponseCache,
    health: EndpointHealth,
    warm: WarmState,
}

pub struct QueryOrchestrator<T: ExchangeTransport> {
    transport: T,
    config: PipelineConfig,
    state: Mutex<State>,
    /// Serializes the warm-up critical section so concurrent cold callers
    /// share one priming exchange. Kept separate from `state`, which is
    /// never held across an exchange await.
    warmup_gate: Arc<Mutex<()>>,
}

impl<T: ExchangeTransport> QueryOrchestrator<T> {
    pub fn new(transport: T, config: PipelineConfig) -> Self {
        let state = State {
            cache: ResponseCache::new(config.cache.max_entries, config.cache.evict_to_percent),
            health: EndpointHealth::new(config.health.clone()),
            warm: WarmState::Cold,
        };
        Self { transport, config, state: Mutex::new(state), warmup_gate: Arc::new(Mutex::new(())) }
    }

    /// Resolves a query to a processed, scored answer.
    ///
    /// Cache hits return immediately and count as health successes. On a
    /// miss the endpoint is warmed if needed, the exchange runs, and the
    /// reply is parsed, filtered and scored; a score below the configured
    /// gate triggers exactly one retry whose result is adopted
    /// unconditionally. Identical-key queries racing between the cache
    /// check and the store may each perform an exchange; the exchange is
    /// idempotent and the last writer wins.
    pub async fn query(
        &self,
        text: &str,
        course_id: &str,
    ) -> Result<CacheEntry, QueryError> {
        let key = CacheKey::new(text.trim(), course_id);

        {
            let mut state = self.state.lock().await;
            if let Some(entry) = state.cache.get(&key) {
                let entry = entry.clone();
                debug!(query = %key.query, course = %key.course_id, "cache hit");
                state.health.record_success();
                return Ok(entry);
            }
        }

        self.ensure_warm().await;

        let outcome = self.exchange_and_process(&key).await;
        self.settle(key, outcome).await
    }

    /// Runs the exchange and, when the first result scores below the gate,
    /// one retry. Never recursive.
    async fn exchange_and_process(&self, key: &CacheKey) -> Result<CacheEntry, QueryError> {
        let entry = self.single_exchange(key).await?;
        if entry.quality.score >= self.config.quality.min_quality_score {
            return Ok(entry);
        }

        info!(
            query = %key.query,
            score = entry.quality.score,
            gate = self.config.quality.min_quality_score,
            "quality below gate, retrying once"
        );
        self.single_exchange(key).await
    }

    async fn single_exchange(&self, key: &CacheKey) -> Result<CacheEntry, QueryError> {
        let request = ExchangeRequest {
            query: key.query.clone(),
            course_id: key.course_id.clone(),
            user_id: self.config.endpoint.user_id.clone(),
        };

        match self.transport.exchange(&request).await? {
            ExchangeReply::Success { data } => Ok(self.process_payload(&data)),
            ExchangeReply::Rejected { message } => Err(QueryError::Rejected { message }),
            ExchangeReply::Malformed => {
                warn!(query = %key.query, "reply had unexpected shape, scoring as sentinel");
                Ok(self.process_raw(""))
            }
        }
    }

    /// Parses, filters and scores a success payload. Structured payload
    /// fields win over their parsed-section counterparts; the parsed
    /// sections are the fallback when those fields are absent or filter to
    /// nothing.
    fn process_payload(&self, data: &serde_json::Value) -> CacheEntry {
        let raw_answer = data
            .get("answer")
            .and_then(|value| value.as_str())
            .unwrap_or_default()
            .to_string();
        let mut parsed = parser::parse(&raw_answer);

        if let Some(lens) = data.get("strategicThinkingLens").and_then(|value| value.as_str()) {
            if !lens.trim().is_empty() {
                parsed.strategic_lens = lens.trim().to_string();
            }
        }
        if let Some(prompts) = data.get("followUpPrompts").and_then(|value| value.as_array()) {
            let prompts: Vec<String> = prompts
                .iter()
                .filter_map(|value| value.as_str())
                .map(str::trim)
                .filter(|prompt| !prompt.is_empty())
                .map(String::from)
                .collect();
            if !prompts.is_empty() {
                parsed.follow_up_prompts = prompts;
            }
        }

        let mut filtered = concepts::extract_concepts(
            data,
            self.config.quality.concept_threshold,
            Some(&raw_answer),
        );
        if filtered.is_empty() {
            filtered = concepts::filter_candidates(
                std::mem::take(&mut parsed.concepts),
                Some(&raw_answer),
            );
        }
        parsed.concepts = filtered;

        self.assemble(raw_answer, parsed)
    }

    fn process_raw(&self, raw_answer: &str) -> CacheEntry {
        let mut parsed = parser::parse(raw_answer);
        parsed.concepts =
            concepts::filter_candidates(std::mem::take(&mut parsed.concepts), Some(raw_answer));
        self.assemble(raw_answer.to_string(), parsed)
    }

    fn assemble(&self, raw_answer: String, parsed: ParsedAnswer) -> CacheEntry {
        let assessment = quality::score(&parsed, &parsed.concepts);
        CacheEntry { raw_answer, parsed, quality: assessment, inserted_at: Utc::now() }
    }

    /// Records the outcome in health counters, stores successes, and runs
    /// cache management. Rejections count as successes: the endpoint did
    /// its job and declared the input out of scope.
    async fn settle(
        &self,
        key: CacheKey,
        outcome: Result<CacheEntry, QueryError>,
    ) -> Result<CacheEntry, QueryError> {
        let now = Utc::now();
        let mut state = self.state.lock().await;

        match &outcome {
            Ok(entry) => {
                state.health.record_success();
                state.cache.insert(key, entry.clone());
            }
            Err(error) if error.is_rejection() => {
                state.health.record_success();
            }
            Err(_) => {
                state.health.record_failure(now);
            }
        }

        match state.health.verdict(now) {
            HealthVerdict::Healthy => {}
            HealthVerdict::ClearCache => {
                warn!("endpoint degraded, clearing response cache");
                state.cache.clear();
                state.health.reset();
            }
            HealthVerdict::ClearCacheAndCool => {
                warn!("endpoint failing hard, clearing cache and dropping warm state");
                state.cache.clear();
                state.health.reset();
                state.warm = WarmState::Cold;
            }
        }

        outcome
    }

    /// Primes the endpoint if cold. Concurrent callers share a single
    /// in-flight warm-up through the gate; callers arriving after the first
    /// re-check the state and return without a second exchange.
    async fn ensure_warm(&self) {
        if self.state.lock().await.warm == WarmState::Warm {
            return;
        }

        let gate = Arc::clone(&self.warmup_gate);
        let _held = gate.lock().await;

        {
            let mut state = self.state.lock().await;
            if state.warm == WarmState::Warm {
                return;
            }
            state.warm = WarmState::Warming;
        }

        info!(query = %self.config.warmup.query, "warming endpoint");
        let key = CacheKey::new(
            self.config.warmup.query.clone(),
            self.config.warmup.course_id.clone(),
        );
        let outcome = self.single_exchange(&key).await;

        let now = Utc::now();
        let mut state = self.state.lock().await;
        match outcome {
            Ok(entry) => {
                state.health.record_success();
                state.cache.insert(key, entry);
            }
            Err(error) => {
                // A failed warm-up still marks the endpoint warm: blocking
                // every user query behind a flaky priming call is worse
                // than skipping the priming benefit.
                warn!(error = %error, "warm-up exchange failed");
                if !error.is_rejection() {
                    state.health.record_failure(now);
                }
            }
        }
        state.warm = WarmState::Warm;
    }

    /// Explicit warm-up trigger for startup paths.
    pub async fn pre_warm(&self) {
        self.ensure_warm().await;
    }

    pub async fn warm_state(&self) -> WarmState {
        self.state.lock().await.warm
    }

    /// Manual full reset: cache, health counters, and warm state.
    pub async fn clear_cache(&self) {
        let mut state = self.state.lock().await;
        state.cache.clear();
        state.health.reset();
        state.warm = WarmState::Cold;
    }

    pub async fn cache_stats(&self) -> OrchestratorStats {
        let state = self.state.lock().await;
        OrchestratorStats {
            cache: state.cache.stats(),
            health: state.health.snapshot(),
            is_warm: state.warm == WarmState::Warm,
        }
    }

    pub async fn quality_for(
        &self,
        text: &str,
        course_id: &str,
    ) -> Option<tutorkit_core::quality::QualityAssessment> {
        let key = CacheKey::new(text.trim(), course_id);
        self.state.lock().await.cache.quality_for(&key)
    }

    /// Whether a cached answer looked weak enough that the caller should
    /// offer the user a manual retry.
    pub async fn should_suggest_retry(&self, text: &str, course_id: &str) -> bool {
        matches!(
            self.quality_for(text, course_id).await,
            Some(assessment) if assessment.status == QualityStatus::Low
        )
    }

    /// Coarse latency hint for UI display, driven by warm state and recent
    /// cached quality.
    pub async fn estimated_processing_hint(&self) -> &'static str {
        let state = self.state.lock().await;
        if state.warm != WarmState::Warm || self.cooled_down(&state.cache) {
            "15-20 seconds"
        } else {
            "10-15 seconds"
        }
    }

    /// Whether recent answers suggest the endpoint has cooled down: the
    /// average approximate score of the last five cached entries falls
    /// below the quality gate.
    pub async fn has_cooled_down(&self) -> bool {
        let state = self.state.lock().await;
        self.cooled_down(&state.cache)
    }

    fn cooled_down(&self, cache: &ResponseCache) -> bool {
        let statuses = cache.recent_statuses(5);
        if statuses.is_empty() {
            return false;
        }
        let total: u32 =
            statuses.iter().map(|status| u32::from(status.approximate_score())).sum();
        let average = total as f64 / statuses.len() as f64;
        average < f64::from(self.config.quality.min_quality_score)
    }
}
