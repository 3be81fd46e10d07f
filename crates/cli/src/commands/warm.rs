use anyhow::Result;

use tutorkit_core::PipelineConfig;

use super::build_orchestrator;

pub async fn run(config: PipelineConfig) -> Result<String> {
    let orchestrator = build_orchestrator(config)?;
    orchestrator.pre_warm().await;

    let stats = orchestrator.cache_stats().await;
    if stats.is_warm && stats.health.consecutive_failures == 0 {
        Ok("endpoint warmed; the canonical answer is cached".to_string())
    } else {
        Ok("warm-up exchange failed; queries will still be attempted".to_string())
    }
}
