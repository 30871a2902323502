//! Task Routing Plan (TRP) — the document a plan build produces.
//!
//! A plan is immutable once built. It echoes the task, records every scored
//! candidate with its explanation, names the primary and fallback tools and
//! lays out a small step state machine for the orchestrator:
//!
//! ```text
//!   step-1 (primary) ──failure──▶ step-2 (fallback) ──success──▶ complete
//!        │ success: complete / defer          │ failure ──▶ terminate(failure)
//!        │ timeout ──▶ terminate(timeout)     │ timeout ──▶ terminate(timeout)
//! ```

pub mod builder;
pub mod enums;

pub use builder::PlanBuilder;
pub use enums::{
    AuthMode, BackoffStrategy, PolicyEffect, SelectionReason, StepKind, TerminalStatus,
    Transition,
};

use crate::scoring::CandidateScore;
use crate::tools::HttpEndpoint;
use crate::types::{PlanId, TenantId, ToolId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Plan document schema version.
pub const PLAN_SCHEMA_VERSION: &str = "trp/1";

// =============================================================================
// Input
// =============================================================================

/// A request to route one capability invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingTask {
    pub tenant_id: TenantId,
    pub capability: String,
    #[serde(default)]
    pub goal_input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl RoutingTask {
    pub fn new(tenant_id: TenantId, capability: impl Into<String>, goal_input: Value) -> Self {
        Self {
            tenant_id,
            capability: capability.into(),
            goal_input,
            constraints: None,
            request_id: None,
        }
    }

    pub fn with_constraints(mut self, constraints: Value) -> Self {
        self.constraints = Some(constraints);
        self
    }
}

// =============================================================================
// Document
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinator {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanContext {
    pub tenant_id: TenantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub capability: String,
    pub input: Value,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDecision {
    pub effect: PolicyEffect,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

/// A chosen candidate and its 1-based rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub tool_id: ToolId,
    pub rank: usize,
    pub score: f64,
    pub reason: SelectionReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backoff {
    pub strategy: BackoffStrategy,
    pub initial_ms: u64,
    pub multiplier: f64,
    pub jitter: bool,
}

/// Retry policy for the orchestrator's tool invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySettings {
    pub emit_execution_events: bool,
    pub emit_feedback: bool,
    pub correlation_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityContext {
    pub auth: AuthMode,
    pub tenant_scoped: bool,
}

/// Outcome routing for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTransitions {
    pub success: Transition,
    pub failure: Transition,
    pub timeout: Transition,
}

/// One node of the plan state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    pub id: String,
    pub kind: StepKind,
    pub tool_id: ToolId,
    pub tool_version: String,
    pub capability: String,
    /// Absent when the tool declares no usable endpoint; resolved downstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<HttpEndpoint>,
    pub on: StepTransitions,
}

/// The routing plan document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRoutingPlan {
    pub plan_id: PlanId,
    pub schema_version: String,
    pub created_at: DateTime<Utc>,
    pub coordinator: Coordinator,
    pub context: PlanContext,
    pub goal: Goal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Value>,
    pub policy: PolicyDecision,
    pub candidates: Vec<CandidateScore>,
    pub selected: Selection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Selection>,
    pub retry: RetryPolicy,
    pub telemetry: TelemetrySettings,
    pub security: SecurityContext,
    pub steps: Vec<PlanStep>,
}

impl TaskRoutingPlan {
    /// Step by id.
    pub fn step(&self, id: &str) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Tool invoked by the first step.
    pub fn primary_tool(&self) -> &ToolId {
        &self.selected.tool_id
    }

    pub fn fallback_tool(&self) -> Option<&ToolId> {
        self.fallback.as_ref().map(|s| &s.tool_id)
    }
}
