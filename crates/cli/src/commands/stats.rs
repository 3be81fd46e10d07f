use anyhow::Result;
use serde::Serialize;

use tutorkit_client::OrchestratorStats;
use tutorkit_core::PipelineConfig;

use super::build_orchestrator;

#[derive(Serialize)]
struct StatsOutput {
    #[serde(flatten)]
    stats: OrchestratorStats,
    estimated_processing: &'static str,
    cooled_down: bool,
}

pub async fn run(config: PipelineConfig) -> Result<String> {
    let orchestrator = build_orchestrator(config)?;
    orchestrator.pre_warm().await;

    let output = StatsOutput {
        stats: orchestrator.cache_stats().await,
        estimated_processing: orchestrator.estimated_processing_hint().await,
        cooled_down: orchestrator.has_cooled_down().await,
    };
    Ok(serde_json::to_string_pretty(&output)?)
}
