use serde::{Deserialize, Serialize};

use crate::models::{CoreError, CoreResult, Payload};

/// Body of a workflow submission. References are passed through to the
/// capability executor without being resolved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub agent_id: String,
    pub target_id: String,
    pub capability_id: String,
    pub input: Payload,
}

impl WorkflowRequest {
    pub fn new(
        agent_id: impl Into<String>,
        target_id: impl Into<String>,
        capability_id: impl Into<String>,
        input: Payload,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            target_id: target_id.into(),
            capability_id: capability_id.into(),
            input,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        for (field, value) in [
            ("agent_id", &self.agent_id),
            ("target_id", &self.target_id),
            ("capability_id", &self.capability_id),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::validation(format!("{field} must not be empty")));
            }
        }

        Ok(())
    }
}
