use std::time::Duration;

use crate::capability::{CapabilityExecutor, CapabilityFuture, CapabilityInvocation, ExecutionResult};
use crate::models::{Payload, required_text, text_payload};

pub const PROMPT_FIELD: &str = "prompt";
pub const OUTPUT_TEXT_FIELD: &str = "text";
pub const DEFAULT_SIMULATED_LATENCY: Duration = Duration::from_secs(2);

/// Stand-in for a real inference backend: echoes the prompt back after a
/// fixed processing delay.
#[derive(Clone, Debug)]
pub struct SimulatedCapabilityExecutor {
    latency: Duration,
}

impl SimulatedCapabilityExecutor {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for SimulatedCapabilityExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_SIMULATED_LATENCY)
    }
}

impl CapabilityExecutor for SimulatedCapabilityExecutor {
    fn check_input(&self, input: &Payload) -> ExecutionResult<()> {
        required_text(input, PROMPT_FIELD).map(|_| ())
    }

    fn run(&self, invocation: CapabilityInvocation) -> CapabilityFuture {
        let latency = self.latency;
        Box::pin(async move {
            let prompt = required_text(&invocation.input, PROMPT_FIELD)?.to_string();
            tracing::debug!(
                task_id = %invocation.task_id,
                capability = %invocation.capability_ref,
                "running simulated capability"
            );

            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            Ok(text_payload(
                OUTPUT_TEXT_FIELD,
                format!(
                    "Response from agent {} using capability {} on target {}: Processed '{}'",
                    invocation.agent_ref, invocation.capability_ref, invocation.target_ref, prompt
                ),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{OUTPUT_TEXT_FIELD, SimulatedCapabilityExecutor};
    use crate::capability::{CapabilityExecutor, CapabilityInvocation};
    use crate::models::{CoreErrorKind, Payload, TaskId, text_payload};

    fn invocation(input: Payload) -> CapabilityInvocation {
        CapabilityInvocation {
            task_id: TaskId::new(),
            agent_ref: "a1".to_string(),
            target_ref: "t1".to_string(),
            capability_ref: "c1".to_string(),
            input,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn echoes_prompt_after_latency() {
        let executor = SimulatedCapabilityExecutor::new(Duration::from_secs(2));
        let output = executor
            .run(invocation(text_payload("prompt", "hello")))
            .await
            .unwrap();

        assert_eq!(
            output[OUTPUT_TEXT_FIELD],
            "Response from agent a1 using capability c1 on target t1: Processed 'hello'"
        );
    }

    #[test]
    fn missing_prompt_fails_input_check() {
        let executor = SimulatedCapabilityExecutor::default();
        let error = executor.check_input(&Payload::new()).unwrap_err();
        assert_eq!(error.kind, CoreErrorKind::Execution);
        assert_eq!(error.message, "Missing or invalid prompt in input");
    }
}
