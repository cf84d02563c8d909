//! HTTP transport for the Conductor orchestration engine.
//!
//! Maps the `/api/v1/workflows` surface onto [`OrchestrationEngine`] calls,
//! resolves the caller's identity from request headers and renders engine
//! errors as JSON with a matching status code.
//!
//! [`OrchestrationEngine`]: conductor_core::orchestration::OrchestrationEngine

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;
pub mod server;

pub use config::ServerConfig;
pub use routes::{AppState, router};
pub use server::{app, init_tracing, serve};
