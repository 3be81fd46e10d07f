pub mod ask;
pub mod config;
pub mod stats;
pub mod warm;

use anyhow::Result;

use tutorkit_client::{HttpTransport, QueryOrchestrator};
use tutorkit_core::PipelineConfig;

/// Builds the production orchestrator over HTTP from loaded config.
pub fn build_orchestrator(config: PipelineConfig) -> Result<QueryOrchestrator<HttpTransport>> {
    let transport = HttpTransport::new(&config.endpoint)?;
    Ok(QueryOrchestrator::new(transport, config))
}
