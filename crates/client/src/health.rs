//! Endpoint health tracking.
//!
//! Tracks consecutive and recent failures of the exchange so the
//! orchestrator can shed stale cache contents when the endpoint degrades.
//! Timestamps are passed in by the caller, which keeps the verdict logic
//! deterministic under test.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use tutorkit_core::HealthConfig;

/// What the orchestrator should do after the latest observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealthVerdict {
    Healthy,
    /// Drop cached answers; they may reflect a degraded endpoint.
    ClearCache,
    /// Drop cached answers and fall back to cold; the next query must
    /// re-prime the endpoint.
    ClearCacheAndCool,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HealthSnapshot {
    pub consecutive_failures: u32,
    pub total_queries: u64,
    pub successful_queries: u64,
    pub failure_rate: f64,
}

#[derive(Debug)]
pub struct EndpointHealth {
    config: HealthConfig,
    consecutive_failures: u32,
    total_queries: u64,
    successful_queries: u64,
    recent_failures: VecDeque<DateTime<Utc>>,
}

impl EndpointHealth {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            config,
            consecutive_failures: 0,
            total_queries: 0,
            successful_queries: 0,
            recent_failures: VecDeque::new(),
        }
    }

    /// Records a completed exchange. Cache hits and rejected inputs both
    /// count here: the endpoint did its job.
    pub fn record_success(&mut self) {
        self.total_queries += 1;
        self.successful_queries += 1;
        self.consecutive_failures = 0;
    }

    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        self.total_queries += 1;
        self.consecutive_failures += 1;
        self.recent_failures.push_back(now);
        self.trim_window(now);
    }

    /// Judges the current state. Consecutive-failure runs dominate; the
    /// failure-rate and recent-window checks catch intermittent degradation
    /// that never strings enough failures together.
    pub fn verdict(&mut self, now: DateTime<Utc>) -> HealthVerdict {
        if self.consecutive_failures >= self.config.cold_reset_failures {
            return HealthVerdict::ClearCacheAndCool;
        }
        if self.consecutive_failures >= self.config.auto_clear_failures {
            return HealthVerdict::ClearCache;
        }

        self.trim_window(now);
        if self.recent_failures.len() as u32 >= self.config.recent_failure_limit {
            return HealthVerdict::ClearCache;
        }

        if self.total_queries >= u64::from(self.config.min_samples)
            && self.failure_rate() > self.config.failure_rate_limit
        {
            return HealthVerdict::ClearCache;
        }

        HealthVerdict::Healthy
    }

    pub fn failure_rate(&self) -> f64 {
        if self.total_queries == 0 {
            return 0.0;
        }
        let failures = self.total_queries - self.successful_queries;
        failures as f64 / self.total_queries as f64
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            consecutive_failures: self.consecutive_failures,
            total_queries: self.total_queries,
            successful_queries: self.successful_queries,
            failure_rate: self.failure_rate(),
        }
    }

    /// Resets all counters, used after the orchestrator acts on a verdict.
    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.total_queries = 0;
        self.successful_queries = 0;
        self.recent_failures.clear();
    }

    fn trim_window(&mut self, now: DateTime<Utc>) {
        let window = Duration::seconds(self.config.recent_failure_window_secs as i64);
        while let Some(oldest) = self.recent_failures.front() {
            if now.signed_duration_since(*oldest) > window {
                self.recent_failures.pop_front();
            } else {
                break;
            }
        }
    }
}
