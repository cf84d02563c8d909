pub mod simulated;

pub use simulated::SimulatedCapabilityExecutor;

use std::future::Future;
use std::pin::Pin;

use crate::models::{CoreError, Payload, TaskId, TaskRecord};

pub type ExecutionResult<T> = Result<T, CoreError>;

pub type CapabilityFuture = Pin<Box<dyn Future<Output = ExecutionResult<Payload>> + Send>>;

#[derive(Clone, Debug, PartialEq)]
pub struct CapabilityInvocation {
    pub task_id: TaskId,
    pub agent_ref: String,
    pub target_ref: String,
    pub capability_ref: String,
    pub input: Payload,
}

impl CapabilityInvocation {
    pub fn from_record(record: &TaskRecord) -> Self {
        Self {
            task_id: record.id,
            agent_ref: record.agent_ref.clone(),
            target_ref: record.target_ref.clone(),
            capability_ref: record.capability_ref.clone(),
            input: record.input.clone(),
        }
    }
}

/// Performs the work a workflow asks for.
///
/// `run` has no timeout of its own and may never resolve; the engine races the
/// returned future against the workflow's cancellation token and stops
/// polling it once cancellation wins.
pub trait CapabilityExecutor: Send + Sync {
    /// Checks the input fields this executor needs. Called after the workflow
    /// has entered `running` and before `run`; an error fails the workflow
    /// without invoking the capability.
    fn check_input(&self, _input: &Payload) -> ExecutionResult<()> {
        Ok(())
    }

    fn run(&self, invocation: CapabilityInvocation) -> CapabilityFuture;
}
