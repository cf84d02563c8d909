use serde::Serialize;
use thiserror::Error;

use crate::models::{TaskId, TaskStatus};

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoreErrorKind {
    Validation,
    NotFound,
    AccessDenied,
    InvalidStateTransition,
    DuplicateId,
    Execution,
    Cancelled,
    Timeout,
    Internal,
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{kind:?}: {message}")]
pub struct CoreError {
    pub task: Option<TaskId>,
    pub kind: CoreErrorKind,
    pub message: String,
}

impl CoreError {
    pub fn new(kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            task: None,
            kind,
            message: message.into(),
        }
    }

    pub fn for_task(mut self, task_id: TaskId) -> Self {
        self.task = Some(task_id);
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Validation, message)
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Execution, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Internal, message)
    }

    pub fn not_found(task_id: TaskId) -> Self {
        Self::new(
            CoreErrorKind::NotFound,
            format!("workflow not found: {task_id}"),
        )
        .for_task(task_id)
    }

    pub fn access_denied(task_id: TaskId) -> Self {
        Self::new(
            CoreErrorKind::AccessDenied,
            "access denied: workflow belongs to another user",
        )
        .for_task(task_id)
    }

    pub fn duplicate_id(task_id: TaskId) -> Self {
        Self::new(
            CoreErrorKind::DuplicateId,
            format!("workflow id already registered: {task_id}"),
        )
        .for_task(task_id)
    }

    pub fn invalid_transition(task_id: TaskId, current: TaskStatus, desired: TaskStatus) -> Self {
        Self::new(
            CoreErrorKind::InvalidStateTransition,
            format!("workflow '{task_id}' cannot transition from '{current}' to '{desired}'"),
        )
        .for_task(task_id)
    }

    pub fn is_kind(&self, kind: CoreErrorKind) -> bool {
        self.kind == kind
    }
}
