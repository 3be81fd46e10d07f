//! Async client for the tutorkit answer pipeline.
//!
//! Wraps the pure logic in `tutorkit-core` with everything that touches the
//! network or holds state across queries:
//! - `transport` — the exchange seam and its HTTP implementation
//! - `cache` — bounded response cache with oldest-first eviction
//! - `health` — endpoint failure tracking
//! - `orchestrator` — the single entry point tying the above together

pub mod cache;
pub mod error;
pub mod health;
pub mod orchestrator;
pub mod transport;

pub use cache::{CacheEntry, CacheKey, CacheStats};
pub use error::{QueryError, TransportError};
pub use health::{EndpointHealth, HealthSnapshot, HealthVerdict};
pub use orchestrator::{OrchestratorStats, QueryOrchestrator, WarmState};
pub use transport::{ExchangeReply, ExchangeRequest, ExchangeTransport, HttpTransport};
