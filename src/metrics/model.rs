//! Metrics rows and the telemetry inputs that update them.

use crate::types::{PlanId, TenantId, ToolId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Key
// =============================================================================

/// Composite key of a metrics row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsKey {
    pub tenant_id: TenantId,
    pub tool_id: ToolId,
    pub capability: String,
}

impl MetricsKey {
    pub fn new(tenant_id: TenantId, tool_id: ToolId, capability: impl Into<String>) -> Self {
        Self {
            tenant_id,
            tool_id,
            capability: capability.into(),
        }
    }
}

// =============================================================================
// Row
// =============================================================================

/// Aggregate telemetry for one (tenant, tool, capability).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolMetrics {
    pub tenant_id: TenantId,
    pub tool_id: ToolId,
    pub capability: String,
    pub success_count: u64,
    pub failure_count: u64,
    pub total_latency_ms: u64,
    /// Always within [-1, 1].
    pub avg_reward: f64,
    pub last_updated: DateTime<Utc>,
}

impl ToolMetrics {
    /// Zero counters and neutral reward.
    pub fn empty(key: &MetricsKey, now: DateTime<Utc>) -> Self {
        Self {
            tenant_id: key.tenant_id.clone(),
            tool_id: key.tool_id.clone(),
            capability: key.capability.clone(),
            success_count: 0,
            failure_count: 0,
            total_latency_ms: 0,
            avg_reward: 0.0,
            last_updated: now,
        }
    }

    pub fn key(&self) -> MetricsKey {
        MetricsKey::new(
            self.tenant_id.clone(),
            self.tool_id.clone(),
            self.capability.clone(),
        )
    }

    pub fn executions(&self) -> u64 {
        self.success_count.saturating_add(self.failure_count)
    }

    /// Success ratio, `None` before the first run.
    pub fn success_rate(&self) -> Option<f64> {
        match self.executions() {
            0 => None,
            n => Some(self.success_count as f64 / n as f64),
        }
    }

    /// Mean latency, `None` before the first run.
    pub fn avg_latency_ms(&self) -> Option<f64> {
        match self.executions() {
            0 => None,
            n => Some(self.total_latency_ms as f64 / n as f64),
        }
    }
}

// =============================================================================
// Telemetry inputs
// =============================================================================

/// Outcome of one tool invocation reported by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolExecutionEvent {
    pub plan_id: PlanId,
    pub step_id: String,
    pub tenant_id: TenantId,
    pub tool_id: ToolId,
    pub capability: String,
    pub latency_ms: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ToolExecutionEvent {
    pub fn key(&self) -> MetricsKey {
        MetricsKey::new(
            self.tenant_id.clone(),
            self.tool_id.clone(),
            self.capability.clone(),
        )
    }
}

/// Reward signal for a tool on a capability, in [-1, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSignal {
    pub tenant_id: TenantId,
    pub tool_id: ToolId,
    pub capability: String,
    pub reward: f64,
    pub timestamp: DateTime<Utc>,
}

impl FeedbackSignal {
    pub fn key(&self) -> MetricsKey {
        MetricsKey::new(
            self.tenant_id.clone(),
            self.tool_id.clone(),
            self.capability.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_absent_before_first_run() {
        let key = MetricsKey::new("acme".into(), "a".into(), "cap");
        let row = ToolMetrics::empty(&key, Utc::now());
        assert_eq!(row.success_rate(), None);
        assert_eq!(row.avg_latency_ms(), None);
        assert_eq!(row.key(), key);
    }

    #[test]
    fn test_rates_from_counters() {
        let key = MetricsKey::new("acme".into(), "a".into(), "cap");
        let mut row = ToolMetrics::empty(&key, Utc::now());
        row.success_count = 3;
        row.failure_count = 1;
        row.total_latency_ms = 1000;
        assert!((row.success_rate().unwrap() - 0.75).abs() < f64::EPSILON);
        assert!((row.avg_latency_ms().unwrap() - 250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_event_wire_format_is_camel_case() {
        let event: ToolExecutionEvent = serde_json::from_value(serde_json::json!({
            "planId": "trp_1",
            "stepId": "step-1",
            "tenantId": "acme",
            "toolId": "a",
            "capability": "cap",
            "latencyMs": 120,
            "success": false,
            "errorCode": "UPSTREAM_500",
            "timestamp": "2026-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(event.error_code.as_deref(), Some("UPSTREAM_500"));
        assert_eq!(event.key().tool_id.as_str(), "a");
    }
}
