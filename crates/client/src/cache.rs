//! In-memory response cache with bounded, oldest-first eviction.
//!
//! Entries are keyed by query text plus course identifier. When the entry
//! count exceeds the configured cap, the oldest entries are dropped until
//! the cache is back at the configured percentage of the cap, so a burst of
//! inserts trims in one pass instead of evicting on every insert.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use tutorkit_core::quality::{QualityAssessment, QualityStatus};
use tutorkit_core::ParsedAnswer;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub query: String,
    pub course_id: String,
}

impl CacheKey {
    pub fn new(query: impl Into<String>, course_id: impl Into<String>) -> Self {
        Self { query: query.into(), course_id: course_id.into() }
    }
}

/// A cached, fully processed answer. The quality assessment is stored with
/// the entry so cache hits never rescore.
#[derive(Clone, Debug, Serialize)]
pub struct CacheEntry {
    pub raw_answer: String,
    pub parsed: ParsedAnswer,
    pub quality: QualityAssessment,
    pub inserted_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    /// Monotonic insertion order, used for oldest-first eviction. Wall-clock
    /// timestamps can collide within a burst; this cannot.
    seq: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub max_entries: usize,
    pub evictions: u64,
}

/// Bounded response cache. Not internally synchronized; the orchestrator
/// guards it with its state lock.
#[derive(Debug)]
pub struct ResponseCache {
    slots: HashMap<CacheKey, Slot>,
    max_entries: usize,
    evict_to: usize,
    next_seq: u64,
    evictions: u64,
}

impl ResponseCache {
    pub fn new(max_entries: usize, evict_to_percent: u8) -> Self {
        let evict_to = (max_entries * usize::from(evict_to_percent) / 100).max(1);
        Self { slots: HashMap::new(), max_entries, evict_to, next_seq: 0, evictions: 0 }
    }

    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.slots.get(key).map(|slot| &slot.entry)
    }

    /// Inserts an entry, evicting oldest-first if the cap is exceeded.
    /// Re-inserting an existing key replaces the entry and refreshes its age.
    pub fn insert(&mut self, key: CacheKey, entry: CacheEntry) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots.insert(key, Slot { entry, seq });

        if self.slots.len() > self.max_entries {
            self.evict_down();
        }
    }

    fn evict_down(&mut self) {
        let excess = self.slots.len().saturating_sub(self.evict_to);
        let mut by_age: Vec<(CacheKey, u64)> =
            self.slots.iter().map(|(key, slot)| (key.clone(), slot.seq)).collect();
        by_age.sort_by_key(|(_, seq)| *seq);
        for (key, _) in by_age.into_iter().take(excess) {
            self.slots.remove(&key);
            self.evictions += 1;
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.slots.len(),
            max_entries: self.max_entries,
            evictions: self.evictions,
        }
    }

    pub fn quality_for(&self, key: &CacheKey) -> Option<QualityAssessment> {
        self.get(key).map(|entry| entry.quality)
    }

    /// Statuses of the most recently inserted entries, newest first, capped
    /// at `limit`. Used by the cool-down estimate.
    pub fn recent_statuses(&self, limit: usize) -> Vec<QualityStatus> {
        let mut slots: Vec<&Slot> = self.slots.values().collect();
        slots.sort_by_key(|slot| std::cmp::Reverse(slot.seq));
        slots.into_iter().take(limit).map(|slot| slot.entry.quality.status).collect()
    }
}
