use std::sync::Arc;

use clap::Parser;
use conductor_core::capability::SimulatedCapabilityExecutor;
use conductor_core::orchestration::OrchestrationEngine;
use conductor_core::store::InMemoryTaskStore;
use conductor_server::{ServerConfig, init_tracing, serve};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_tracing(&config.log_level);

    let engine = OrchestrationEngine::with_config(
        Arc::new(InMemoryTaskStore::new()),
        Arc::new(SimulatedCapabilityExecutor::new(config.simulated_latency())),
        config.engine_config(),
    );

    serve(config, engine).await
}
