//! Request validation utilities.
//!
//! Boundary checks applied before telemetry or tasks reach the core.

use crate::metrics::{FeedbackSignal, ToolExecutionEvent};
use crate::plan::RoutingTask;
use crate::types::{Error, Result};

/// Validate that a string is not empty.
pub fn validate_non_empty(s: &str, field: &str) -> Result<()> {
    if s.trim().is_empty() {
        return Err(Error::validation(format!("{} cannot be empty", field)));
    }
    Ok(())
}

/// Validate a routing task.
pub fn validate_task(task: &RoutingTask) -> Result<()> {
    validate_non_empty(task.tenant_id.as_str(), "tenantId")?;
    validate_non_empty(&task.capability, "capability")?;
    if let Some(constraints) = &task.constraints {
        if !constraints.is_object() && !constraints.is_null() {
            return Err(Error::validation("constraints must be an object"));
        }
    }
    Ok(())
}

/// Validate an execution event.
pub fn validate_execution_event(event: &ToolExecutionEvent) -> Result<()> {
    validate_non_empty(event.plan_id.as_str(), "planId")?;
    validate_non_empty(&event.step_id, "stepId")?;
    validate_non_empty(event.tenant_id.as_str(), "tenantId")?;
    validate_non_empty(event.tool_id.as_str(), "toolId")?;
    validate_non_empty(&event.capability, "capability")?;
    Ok(())
}

/// Validate a feedback signal and clamp its reward into [-1, 1].
pub fn sanitize_feedback(signal: &FeedbackSignal) -> Result<FeedbackSignal> {
    validate_non_empty(signal.tenant_id.as_str(), "tenantId")?;
    validate_non_empty(signal.tool_id.as_str(), "toolId")?;
    validate_non_empty(&signal.capability, "capability")?;
    if !signal.reward.is_finite() {
        return Err(Error::validation("reward must be a finite number"));
    }
    let mut clean = signal.clone();
    clean.reward = signal.reward.clamp(-1.0, 1.0);
    Ok(clean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TenantId, ToolId};
    use chrono::Utc;
    use serde_json::json;

    fn signal(reward: f64) -> FeedbackSignal {
        FeedbackSignal {
            tenant_id: TenantId::from("acme"),
            tool_id: ToolId::from("a"),
            capability: "cap".into(),
            reward,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_validate_non_empty() {
        assert!(validate_non_empty("x", "field").is_ok());
        let err = validate_non_empty("  ", "field").unwrap_err();
        assert_eq!(err.to_string(), "validation error: field cannot be empty");
    }

    #[test]
    fn test_task_requires_tenant_and_capability() {
        let ok = RoutingTask::new(TenantId::from("acme"), "cap", json!({}));
        assert!(validate_task(&ok).is_ok());
        assert!(validate_task(&RoutingTask::new(TenantId::from(""), "cap", json!({}))).is_err());
        assert!(validate_task(&RoutingTask::new(TenantId::from("acme"), "", json!({}))).is_err());
        assert!(validate_task(&ok.clone().with_constraints(json!([1, 2]))).is_err());
    }

    #[test]
    fn test_reward_is_clamped() {
        assert_eq!(sanitize_feedback(&signal(3.0)).unwrap().reward, 1.0);
        assert_eq!(sanitize_feedback(&signal(-3.0)).unwrap().reward, -1.0);
        assert_eq!(sanitize_feedback(&signal(0.25)).unwrap().reward, 0.25);
        assert!(sanitize_feedback(&signal(f64::NAN)).is_err());
    }
}
