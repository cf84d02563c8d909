pub mod engine;
mod execution;

pub use engine::{EngineConfig, OrchestrationEngine};

use crate::models::CoreError;

pub type OrchestrationResult<T> = Result<T, CoreError>;

/// Error recorded on a workflow cancelled through the API.
pub const CANCELLED_BY_USER: &str = "cancelled by user";

/// Error recorded on a workflow interrupted by engine shutdown.
pub const SHUTDOWN_MESSAGE: &str = "workflow cancelled: engine shutting down";

pub const DEFAULT_MAX_CONCURRENT_EXECUTIONS: usize = 64;
