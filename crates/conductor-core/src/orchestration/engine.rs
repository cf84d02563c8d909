use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Notify, Semaphore};
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;

use crate::analytics::{CapabilityUsage, WorkflowSummary, summarize, top_capabilities};
use crate::capability::CapabilityExecutor;
use crate::models::{
    CoreError, CoreErrorKind, OwnerId, TaskId, TaskRecord, WorkflowRequest,
};
use crate::orchestration::execution::run_workflow;
use crate::orchestration::{
    CANCELLED_BY_USER, DEFAULT_MAX_CONCURRENT_EXECUTIONS, OrchestrationResult,
};
use crate::store::TaskStore;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EngineConfig {
    /// Upper bound on execution units running a capability at once. `None`
    /// lets every submitted workflow run immediately.
    pub max_concurrent_executions: Option<usize>,
}

impl EngineConfig {
    pub fn bounded(max_concurrent_executions: usize) -> Self {
        Self {
            max_concurrent_executions: Some(max_concurrent_executions),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            max_concurrent_executions: None,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::bounded(DEFAULT_MAX_CONCURRENT_EXECUTIONS)
    }
}

/// Owns the workflow registry and drives every submitted workflow through
/// `pending -> running -> terminal` on its own tokio task.
///
/// Cloning is cheap; clones share the same registry and execution state.
#[derive(Clone)]
pub struct OrchestrationEngine {
    shared: Arc<EngineShared>,
}

pub(crate) struct EngineShared {
    pub(crate) store: Arc<dyn TaskStore>,
    pub(crate) executor: Arc<dyn CapabilityExecutor>,
    pub(crate) permits: Option<Arc<Semaphore>>,
    pub(crate) shutdown: CancellationToken,
    in_flight: Mutex<HashMap<TaskId, InFlight>>,
}

#[derive(Clone)]
struct InFlight {
    token: CancellationToken,
    completion: Arc<Notify>,
}

impl OrchestrationEngine {
    pub fn new(store: Arc<dyn TaskStore>, executor: Arc<dyn CapabilityExecutor>) -> Self {
        Self::with_config(store, executor, EngineConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn TaskStore>,
        executor: Arc<dyn CapabilityExecutor>,
        config: EngineConfig,
    ) -> Self {
        let permits = config
            .max_concurrent_executions
            .filter(|limit| *limit > 0)
            .map(|limit| Arc::new(Semaphore::new(limit)));

        Self {
            shared: Arc::new(EngineShared {
                store,
                executor,
                permits,
                shutdown: CancellationToken::new(),
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn store(&self) -> Arc<dyn TaskStore> {
        self.shared.store.clone()
    }

    /// Registers a pending workflow and hands it to a new execution unit.
    /// Returns without waiting for the capability; must be called from
    /// within a tokio runtime.
    pub fn submit(
        &self,
        request: WorkflowRequest,
        owner: OwnerId,
    ) -> OrchestrationResult<TaskRecord> {
        request.validate()?;

        if self.shared.shutdown.is_cancelled() {
            return Err(CoreError::internal("engine is shutting down"));
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|error| {
            CoreError::internal(format!("workflow submission requires a tokio runtime: {error}"))
        })?;

        let record = TaskRecord::pending(TaskId::new(), owner, request);
        let token = self.shared.shutdown.child_token();
        self.shared.register(record.id, token.clone())?;

        if let Err(error) = self.shared.store.insert(record.clone()) {
            self.shared.release(record.id);
            return Err(error);
        }

        tracing::info!(
            task_id = %record.id,
            owner = record.owner.0,
            agent = %record.agent_ref,
            target = %record.target_ref,
            capability = %record.capability_ref,
            "workflow submitted"
        );

        runtime.spawn(run_workflow(self.shared.clone(), record.clone(), token));
        Ok(record)
    }

    pub fn get(&self, task_id: TaskId, caller: OwnerId) -> OrchestrationResult<TaskRecord> {
        let record = self.shared.store.get(task_id)?;
        if !record.is_owned_by(caller) {
            return Err(CoreError::access_denied(task_id));
        }
        Ok(record)
    }

    pub fn list(&self, caller: OwnerId) -> OrchestrationResult<Vec<TaskRecord>> {
        self.shared.store.list(caller)
    }

    /// Cancels a pending or running workflow. The cancelled status is the
    /// final word: any outcome the execution unit produces afterwards is
    /// discarded. The capability call itself is not guaranteed to stop.
    pub fn cancel(&self, task_id: TaskId, caller: OwnerId) -> OrchestrationResult<TaskRecord> {
        let record = self.shared.store.mutate(
            task_id,
            Box::new(move |record: &mut TaskRecord| {
                if !record.is_owned_by(caller) {
                    return Err(CoreError::access_denied(task_id));
                }
                record.cancel(CANCELLED_BY_USER)
            }),
        )?;

        tracing::info!(task_id = %task_id, owner = caller.0, "workflow cancelled");
        self.shared.finish(task_id);
        Ok(record)
    }

    /// Resolves once the workflow is terminal, or fails with
    /// `CoreErrorKind::Timeout` when `timeout` elapses first.
    pub async fn wait_for_terminal(
        &self,
        task_id: TaskId,
        caller: OwnerId,
        timeout: Option<Duration>,
    ) -> OrchestrationResult<TaskRecord> {
        let deadline = timeout.map(|duration| Instant::now() + duration);

        loop {
            let Some(completion) = self.shared.completion_for(task_id)? else {
                return self.get(task_id, caller);
            };

            let notified = completion.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let record = self.get(task_id, caller)?;
            if record.is_terminal() {
                return Ok(record);
            }

            match deadline {
                Some(deadline) => timeout_at(deadline, notified).await.map_err(|_| {
                    CoreError::new(
                        CoreErrorKind::Timeout,
                        format!("timed out waiting for workflow '{task_id}' to finish"),
                    )
                    .for_task(task_id)
                })?,
                None => notified.await,
            }
        }
    }

    pub fn summary(&self, caller: OwnerId) -> OrchestrationResult<WorkflowSummary> {
        let records = self.list(caller)?;
        Ok(summarize(&records, Utc::now()))
    }

    pub fn top_capabilities(
        &self,
        caller: OwnerId,
        limit: usize,
    ) -> OrchestrationResult<Vec<CapabilityUsage>> {
        let records = self.list(caller)?;
        Ok(top_capabilities(&records, limit))
    }

    /// Interrupts every in-flight execution unit and refuses new submissions.
    pub fn shutdown(&self) {
        if !self.shared.shutdown.is_cancelled() {
            tracing::info!(
                in_flight = self.in_flight_count(),
                "orchestration engine shutting down"
            );
        }
        self.shared.shutdown.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    /// Number of workflows that have not yet been settled by their execution
    /// unit or by a cancel.
    pub fn in_flight_count(&self) -> usize {
        self.shared
            .in_flight
            .lock()
            .map(|in_flight| in_flight.len())
            .unwrap_or_default()
    }
}

impl EngineShared {
    fn register(&self, task_id: TaskId, token: CancellationToken) -> OrchestrationResult<()> {
        let mut in_flight = self.lock_in_flight()?;
        match in_flight.entry(task_id) {
            Entry::Occupied(_) => Err(CoreError::duplicate_id(task_id)),
            Entry::Vacant(slot) => {
                slot.insert(InFlight {
                    token,
                    completion: Arc::new(Notify::new()),
                });
                Ok(())
            }
        }
    }

    fn release(&self, task_id: TaskId) -> Option<InFlight> {
        self.in_flight
            .lock()
            .ok()
            .and_then(|mut in_flight| in_flight.remove(&task_id))
    }

    /// Stops tracking a workflow whose record is terminal: fires its token so
    /// the execution unit stops waiting on the capability, and wakes waiters.
    pub(crate) fn finish(&self, task_id: TaskId) {
        if let Some(entry) = self.release(task_id) {
            entry.token.cancel();
            entry.completion.notify_waiters();
        }
    }

    fn completion_for(&self, task_id: TaskId) -> OrchestrationResult<Option<Arc<Notify>>> {
        Ok(self
            .lock_in_flight()?
            .get(&task_id)
            .map(|entry| entry.completion.clone()))
    }

    fn lock_in_flight(
        &self,
    ) -> OrchestrationResult<std::sync::MutexGuard<'_, HashMap<TaskId, InFlight>>> {
        self.in_flight
            .lock()
            .map_err(|_| CoreError::internal("in-flight workflow registry mutex poisoned"))
    }
}
