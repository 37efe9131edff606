//! Wires the execution client, stores, run pipeline and stats aggregator into
//! one HTTP service.

pub mod config;

use code_exec::{EntitlementGate, ExecutionOrchestrator, PistonClient};
use code_exec_server::{AppState, RunPipeline};
use exec_store::InMemoryStore;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use usage_stats::StatsAggregator;

pub use config::AppConfig;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Exec(#[from] code_exec::Error),
}

/// Build the shared application state backed by the in-memory store
pub fn build_state(config: &AppConfig) -> Result<AppState, Error> {
    let store = Arc::new(InMemoryStore::new(EntitlementGate::new(
        config.free_tier_language,
    )));
    build_state_with_store(config, store)
}

pub fn build_state_with_store(
    config: &AppConfig,
    store: Arc<InMemoryStore>,
) -> Result<AppState, Error> {
    let gate = EntitlementGate::new(config.free_tier_language);
    let client = Arc::new(PistonClient::new(config.runtime_url.clone())?);
    let languages = config.language_table()?;
    let orchestrator =
        ExecutionOrchestrator::new(client, languages).with_timeout(config.run_timeout());

    info!(
        runtime_url = %config.runtime_url,
        timeout_secs = config.run_timeout_secs,
        free_tier = %gate.free_tier(),
        "Execution pipeline configured"
    );

    let pipeline = RunPipeline::new(gate, orchestrator, store.clone(), store.clone());
    let stats = StatsAggregator::new(store.clone(), store.clone(), store.clone());
    Ok(AppState::new(pipeline, store.clone(), store, stats))
}
