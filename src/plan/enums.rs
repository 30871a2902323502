//! Enumerations used in the plan document.

use serde::{Deserialize, Serialize};

/// Why a candidate was chosen for a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    HighestScore,
    NextBest,
}

/// Status a plan ends with when a step does not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Failure,
    Timeout,
}

/// What the orchestrator does after a step outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Transition {
    /// Plan completes successfully.
    Complete,
    /// Continue with another step.
    Goto { step: String },
    /// Plan ends with the given status.
    Terminate { status: TerminalStatus },
    /// No completion flag; orchestrator logic decides.
    Defer,
}

/// Kind of work a step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    ToolCall,
}

/// Policy outcome recorded on the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyEffect {
    #[default]
    Allow,
    Deny,
}

/// Backoff shape for orchestrator retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    Exponential,
}

/// How the orchestrator authenticates tool calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Credentials are resolved by the orchestrator per tenant.
    #[default]
    Delegated,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transition_wire_format() {
        assert_eq!(serde_json::to_value(Transition::Complete).unwrap(), json!({"action": "complete"}));
        assert_eq!(
            serde_json::to_value(Transition::Goto { step: "step-2".into() }).unwrap(),
            json!({"action": "goto", "step": "step-2"})
        );
        assert_eq!(
            serde_json::to_value(Transition::Terminate { status: TerminalStatus::Timeout }).unwrap(),
            json!({"action": "terminate", "status": "timeout"})
        );
    }

    #[test]
    fn test_reason_wire_format() {
        assert_eq!(serde_json::to_value(SelectionReason::NextBest).unwrap(), json!("next_best"));
    }
}
