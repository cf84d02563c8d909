use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum::http::{HeaderValue, Method};
use conductor_core::orchestration::OrchestrationEngine;
use tokio::net::TcpListener;
use tokio::time::{Instant, sleep};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::routes::{AppState, router};

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Installs the global fmt subscriber. `RUST_LOG` wins over `default_level`.
/// Safe to call more than once.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub fn app(config: &ServerConfig, state: Arc<AppState>) -> anyhow::Result<Router> {
    Ok(router(state).layer(cors_layer(&config.allowed_origins)?))
}

fn cors_layer(allowed_origins: &[String]) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if allowed_origins.is_empty() {
        return Ok(layer.allow_origin(Any));
    }

    let origins = allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("invalid allowed origin '{origin}'"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(layer.allow_origin(origins))
}

/// Serves the API until ctrl-c or SIGTERM, then interrupts in-flight
/// workflows and waits up to the configured grace period for them to settle.
pub async fn serve(config: ServerConfig, engine: OrchestrationEngine) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(engine.clone(), config.default_owner()));
    let app = app(&config, state)?;

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(
        addr = %listener.local_addr()?,
        max_concurrent = config.max_concurrent_executions,
        "conductor listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;

    engine.shutdown();
    drain(&engine, config.shutdown_grace()).await;
    Ok(())
}

async fn drain(engine: &OrchestrationEngine, grace: Duration) {
    let deadline = Instant::now() + grace;
    while engine.in_flight_count() > 0 {
        if Instant::now() >= deadline {
            tracing::warn!(
                remaining = engine.in_flight_count(),
                "shutdown grace period elapsed with workflows still in flight"
            );
            return;
        }
        sleep(DRAIN_POLL_INTERVAL).await;
    }
    tracing::info!("all workflows settled");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
