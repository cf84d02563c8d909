use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use conductor_core::models::OwnerId;
use conductor_core::orchestration::{DEFAULT_MAX_CONCURRENT_EXECUTIONS, EngineConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "conductord", version, about = "Conductor workflow orchestration server")]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[arg(long, env = "CONDUCTOR_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Default log filter; `RUST_LOG` takes precedence when set.
    #[arg(long, env = "CONDUCTOR_LOG", default_value = "info")]
    pub log_level: String,

    /// Capability calls allowed to run at once. `0` removes the limit.
    #[arg(
        long,
        env = "CONDUCTOR_MAX_CONCURRENT",
        default_value_t = DEFAULT_MAX_CONCURRENT_EXECUTIONS
    )]
    pub max_concurrent_executions: usize,

    /// Processing delay of the built-in simulated capability executor.
    #[arg(long, env = "CONDUCTOR_SIMULATED_LATENCY_MS", default_value_t = 2000)]
    pub simulated_latency_ms: u64,

    /// Owner assumed for requests that carry no `X-User-Id` header.
    #[arg(long, env = "CONDUCTOR_DEFAULT_OWNER")]
    pub default_owner: Option<i64>,

    /// Origin allowed by CORS; repeat for several. Any origin when omitted.
    #[arg(long = "allowed-origin")]
    pub allowed_origins: Vec<String>,

    /// How long to wait for interrupted workflows to settle on shutdown.
    #[arg(long, default_value_t = 5000)]
    pub shutdown_grace_ms: u64,
}

impl ServerConfig {
    pub fn engine_config(&self) -> EngineConfig {
        if self.max_concurrent_executions == 0 {
            EngineConfig::unbounded()
        } else {
            EngineConfig::bounded(self.max_concurrent_executions)
        }
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn default_owner(&self) -> Option<OwnerId> {
        self.default_owner.map(OwnerId)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use conductor_core::models::OwnerId;
    use conductor_core::orchestration::EngineConfig;

    use super::ServerConfig;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServerConfig::try_parse_from(["conductord"]).unwrap();
        assert_eq!(config.bind.to_string(), "127.0.0.1:8080");
        assert_eq!(config.engine_config(), EngineConfig::bounded(64));
        assert_eq!(config.simulated_latency().as_millis(), 2000);
        assert_eq!(config.default_owner(), None);
        assert!(config.allowed_origins.is_empty());
    }

    #[test]
    fn zero_concurrency_limit_means_unbounded() {
        let config = ServerConfig::try_parse_from([
            "conductord",
            "--max-concurrent-executions",
            "0",
            "--default-owner",
            "1",
            "--allowed-origin",
            "http://localhost:5173",
            "--allowed-origin",
            "http://localhost:3000",
        ])
        .unwrap();

        assert_eq!(config.engine_config(), EngineConfig::unbounded());
        assert_eq!(config.default_owner(), Some(OwnerId(1)));
        assert_eq!(config.allowed_origins.len(), 2);
    }
}
