use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::capability::CapabilityInvocation;
use crate::models::{CoreErrorKind, Payload, TaskId, TaskRecord, TaskStatus};
use crate::orchestration::SHUTDOWN_MESSAGE;
use crate::orchestration::engine::EngineShared;

enum Outcome {
    Completed(Payload),
    Failed(String),
    Interrupted,
}

/// Execution unit for a single workflow. Always releases the workflow from
/// the in-flight registry on exit, whatever state the record ended in.
pub(crate) async fn run_workflow(
    shared: Arc<EngineShared>,
    record: TaskRecord,
    token: CancellationToken,
) {
    let _release = ReleaseOnExit {
        shared: shared.clone(),
        task_id: record.id,
    };
    execute(&shared, &record, &token).await;
}

/// Drops the workflow from the in-flight registry even if the execution unit
/// unwinds.
struct ReleaseOnExit {
    shared: Arc<EngineShared>,
    task_id: TaskId,
}

impl Drop for ReleaseOnExit {
    fn drop(&mut self) {
        self.shared.finish(self.task_id);
    }
}

async fn execute(shared: &EngineShared, record: &TaskRecord, token: &CancellationToken) {
    let task_id = record.id;

    let Some(_permit) = acquire_permit(shared.permits.clone(), token).await else {
        settle(shared, task_id, Outcome::Interrupted);
        return;
    };

    match shared
        .store
        .mutate(task_id, Box::new(|record: &mut TaskRecord| record.start()))
    {
        Ok(_) => tracing::debug!(task_id = %task_id, "workflow running"),
        Err(error) if error.is_kind(CoreErrorKind::InvalidStateTransition) => {
            tracing::debug!(
                task_id = %task_id,
                message = %error.message,
                "workflow left pending before execution started"
            );
            return;
        }
        Err(error) => {
            tracing::error!(
                task_id = %task_id,
                kind = ?error.kind,
                message = %error.message,
                "failed to mark workflow running"
            );
            return;
        }
    }

    // Executor code, input checks included, only runs on the spawned task.
    let executor = shared.executor.clone();
    let invocation = CapabilityInvocation::from_record(record);
    let mut capability = tokio::spawn(async move {
        executor.check_input(&invocation.input)?;
        executor.run(invocation).await
    });

    let outcome = tokio::select! {
        biased;
        () = token.cancelled() => {
            capability.abort();
            Outcome::Interrupted
        }
        joined = &mut capability => match joined {
            Ok(Ok(output)) => Outcome::Completed(output),
            Ok(Err(error)) => Outcome::Failed(error.message),
            Err(join_error) => {
                tracing::error!(
                    task_id = %task_id,
                    error = %join_error,
                    "capability execution task did not complete"
                );
                Outcome::Failed(format!("capability execution aborted: {join_error}"))
            }
        }
    };

    settle(shared, task_id, outcome);
}

/// Waits for an execution slot. `None` means the workflow was cancelled
/// while waiting.
async fn acquire_permit(
    permits: Option<Arc<Semaphore>>,
    token: &CancellationToken,
) -> Option<Option<OwnedSemaphorePermit>> {
    let Some(semaphore) = permits else {
        return Some(None);
    };

    tokio::select! {
        biased;
        () = token.cancelled() => None,
        permit = semaphore.acquire_owned() => permit.ok().map(Some),
    }
}

fn settle(shared: &EngineShared, task_id: TaskId, outcome: Outcome) {
    let interruption = if shared.shutdown.is_cancelled() {
        SHUTDOWN_MESSAGE
    } else {
        "workflow cancelled"
    };

    let result = match outcome {
        Outcome::Completed(output) => shared.store.mutate(
            task_id,
            Box::new(move |record: &mut TaskRecord| record.complete(output)),
        ),
        Outcome::Failed(message) => shared.store.mutate(
            task_id,
            Box::new(move |record: &mut TaskRecord| record.fail(message)),
        ),
        Outcome::Interrupted => shared.store.mutate(
            task_id,
            Box::new(move |record: &mut TaskRecord| {
                if record.status == TaskStatus::Pending {
                    record.cancel(interruption)
                } else {
                    record.fail(interruption)
                }
            }),
        ),
    };

    match result {
        Ok(record) => match record.status {
            TaskStatus::Completed => {
                tracing::info!(task_id = %task_id, "workflow completed");
            }
            status => tracing::warn!(
                task_id = %task_id,
                status = %status,
                error = record.error.as_deref().unwrap_or_default(),
                "workflow did not complete"
            ),
        },
        Err(error) if error.is_kind(CoreErrorKind::InvalidStateTransition) => {
            tracing::debug!(
                task_id = %task_id,
                message = %error.message,
                "discarding workflow outcome; record already terminal"
            );
        }
        Err(error) => tracing::error!(
            task_id = %task_id,
            kind = ?error.kind,
            message = %error.message,
            "failed to record workflow outcome"
        ),
    }
}
