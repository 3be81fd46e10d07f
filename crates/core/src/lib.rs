//! Pure answer-processing logic for the tutorkit pipeline.
//!
//! This crate holds everything that can be computed without I/O:
//! - `parser` — section tokenizer turning raw answer text into a
//!   [`ParsedAnswer`]
//! - `concepts` — candidate extraction and the strict relevance filter
//! - `quality` — the heuristic 0–100 quality score and coarse status
//! - `config` — pipeline configuration with file and env overrides
//!
//! Network exchange and the caching/warm-up orchestration live in
//! `tutorkit-client`; that crate is the only caller that performs I/O.

pub mod answer;
pub mod concepts;
pub mod config;
pub mod parser;
pub mod quality;

pub use answer::{ConceptCandidate, ParsedAnswer, LENS_FALLBACK, NARRATIVE_FALLBACK};
pub use concepts::{extract_concepts, filter_candidates, DEFAULT_THRESHOLD, MAX_CONCEPTS};
pub use config::{
    CacheConfig, ConfigError, EndpointConfig, HealthConfig, LoadOptions, PipelineConfig,
    QualityConfig, WarmupConfig,
};
pub use parser::parse;
pub use quality::{score, QualityAssessment, QualityStatus, ACTIONABLE_PROMPT_MIN_CHARS};
