use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{CoreError, CoreResult, Payload, WorkflowRequest};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> CoreResult<Self> {
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|error| CoreError::validation(format!("invalid workflow id '{raw}': {error}")))
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub i64);

impl Display for OwnerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Edges of the workflow state graph. `Pending` may only be left for
    /// `Running` or `Cancelled`; only a running task produces an outcome.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Running)
                | (TaskStatus::Pending, TaskStatus::Cancelled)
                | (TaskStatus::Running, TaskStatus::Cancelled)
                | (TaskStatus::Running, TaskStatus::Completed)
                | (TaskStatus::Running, TaskStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub status: TaskStatus,
    #[serde(rename = "start_time")]
    pub started_at: DateTime<Utc>,
    #[serde(rename = "end_time", default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(rename = "agent_id")]
    pub agent_ref: String,
    #[serde(rename = "target_id")]
    pub target_ref: String,
    #[serde(rename = "capability_id")]
    pub capability_ref: String,
    pub input: Payload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "owner_id")]
    pub owner: OwnerId,
}

impl TaskRecord {
    pub fn pending(id: TaskId, owner: OwnerId, request: WorkflowRequest) -> Self {
        Self {
            id,
            status: TaskStatus::Pending,
            started_at: Utc::now(),
            ended_at: None,
            agent_ref: request.agent_id,
            target_ref: request.target_id,
            capability_ref: request.capability_id,
            input: request.input,
            output: None,
            error: None,
            owner,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_owned_by(&self, owner: OwnerId) -> bool {
        self.owner == owner
    }

    pub fn start(&mut self) -> CoreResult<()> {
        self.advance(TaskStatus::Running)
    }

    pub fn complete(&mut self, output: Payload) -> CoreResult<()> {
        self.advance(TaskStatus::Completed)?;
        self.output = Some(output);
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> CoreResult<()> {
        self.advance(TaskStatus::Failed)?;
        self.error = Some(message.into());
        Ok(())
    }

    pub fn cancel(&mut self, message: impl Into<String>) -> CoreResult<()> {
        self.advance(TaskStatus::Cancelled)?;
        self.error = Some(message.into());
        Ok(())
    }

    /// Checks that `next` is a legal successor of `self`: identity, owner and
    /// inputs are untouched, status follows the state graph (or is unchanged),
    /// and the terminal bookkeeping is consistent.
    pub fn check_successor(&self, next: &TaskRecord) -> CoreResult<()> {
        if next.id != self.id
            || next.owner != self.owner
            || next.input != self.input
            || next.started_at != self.started_at
            || next.agent_ref != self.agent_ref
            || next.target_ref != self.target_ref
            || next.capability_ref != self.capability_ref
        {
            return Err(CoreError::internal(format!(
                "workflow '{}' update attempted to modify immutable fields",
                self.id
            ))
            .for_task(self.id));
        }

        if next.status != self.status && !self.status.can_transition_to(next.status) {
            return Err(CoreError::invalid_transition(
                self.id,
                self.status,
                next.status,
            ));
        }

        if next.ended_at.is_some() != next.status.is_terminal() {
            return Err(CoreError::internal(format!(
                "workflow '{}' end time must be set exactly when terminal",
                self.id
            ))
            .for_task(self.id));
        }

        let output_ok = next.output.is_some() == (next.status == TaskStatus::Completed);
        let error_ok = next.error.is_some()
            == matches!(next.status, TaskStatus::Failed | TaskStatus::Cancelled);
        if !output_ok || !error_ok {
            return Err(CoreError::internal(format!(
                "workflow '{}' output/error do not match status '{}'",
                self.id, next.status
            ))
            .for_task(self.id));
        }

        Ok(())
    }

    fn advance(&mut self, next: TaskStatus) -> CoreResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::invalid_transition(self.id, self.status, next));
        }

        self.status = next;
        if next.is_terminal() {
            self.ended_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{OwnerId, TaskId, TaskRecord, TaskStatus};
    use crate::models::{CoreErrorKind, Payload, WorkflowRequest};

    fn record() -> TaskRecord {
        TaskRecord::pending(
            TaskId::new(),
            OwnerId(7),
            WorkflowRequest::new("a1", "t1", "c1", Payload::new()),
        )
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        let all = [
            TaskStatus::Pending,
            TaskStatus::Running,
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Cancelled,
        ];
        for from in all.into_iter().filter(|status| status.is_terminal()) {
            for to in all {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn pending_cannot_complete_without_running() {
        let mut record = record();
        let error = record.complete(Payload::new()).unwrap_err();
        assert_eq!(error.kind, CoreErrorKind::InvalidStateTransition);
        assert_eq!(record.status, TaskStatus::Pending);
        assert!(record.output.is_none());
        assert!(record.ended_at.is_none());
    }

    #[test]
    fn failed_transition_leaves_record_untouched() {
        let mut record = record();
        record.start().unwrap();
        record.fail("boom").unwrap();
        let before = record.clone();

        assert!(record.cancel("cancelled by user").is_err());
        assert_eq!(record, before);
    }

    #[test]
    fn successor_check_rejects_owner_change() {
        let record = record();
        let mut next = record.clone();
        next.owner = OwnerId(8);
        assert_eq!(
            record.check_successor(&next).unwrap_err().kind,
            CoreErrorKind::Internal
        );
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let mut record = record();
        record.start().unwrap();
        let mut output = Payload::new();
        output.insert("text".to_string(), json!("done"));
        record.complete(output).unwrap();

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["agent_id"], "a1");
        assert_eq!(value["owner_id"], 7);
        assert_eq!(value["output"]["text"], "done");
        assert!(value.get("end_time").is_some());
        assert!(value.get("error").is_none());
    }
}
