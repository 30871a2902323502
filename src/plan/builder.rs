//! Plan building — one transaction from task to persisted plan.
//!
//! Steps:
//!   1. fetch candidate tools for (tenant, capability); none is an error
//!   2. fetch each candidate's metrics concurrently
//!   3. rank candidates
//!   4. pick primary (best matching candidate) and fallback (best with a different id)
//!   5. lay out the step state machine
//!   6. assemble and persist the document
//!
//! Collaborator errors propagate unchanged and are not retried here; the
//! retry policy inside the plan is for the orchestrator's tool calls.

use super::{
    Backoff, BackoffStrategy, Coordinator, Goal, PlanContext, PlanStep, PolicyDecision,
    RetryPolicy, RoutingTask, SecurityContext, Selection, SelectionReason, StepKind,
    StepTransitions, TaskRoutingPlan, TelemetrySettings, TerminalStatus, Transition,
    PLAN_SCHEMA_VERSION,
};
use crate::clock::{Clock, PlanIdGenerator};
use crate::metrics::{MetricsKey, ToolMetrics};
use crate::scoring::{score_candidates, CandidateScore};
use crate::store::{MetricsStore, PlanStore, ToolLookup};
use crate::tools::Tool;
use crate::types::{Error, PlanConfig, Result, ScoringConfig, ToolId};
use futures::future::try_join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const PRIMARY_STEP_ID: &str = "step-1";
pub const FALLBACK_STEP_ID: &str = "step-2";

/// Builds and persists routing plans.
#[derive(Clone)]
pub struct PlanBuilder {
    tools: Arc<dyn ToolLookup>,
    metrics: Arc<dyn MetricsStore>,
    plans: Arc<dyn PlanStore>,
    ids: Arc<dyn PlanIdGenerator>,
    clock: Arc<dyn Clock>,
    scoring: ScoringConfig,
    config: PlanConfig,
}

impl std::fmt::Debug for PlanBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanBuilder")
            .field("ids", &self.ids)
            .field("clock", &self.clock)
            .field("scoring", &self.scoring)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PlanBuilder {
    pub fn new(
        tools: Arc<dyn ToolLookup>,
        metrics: Arc<dyn MetricsStore>,
        plans: Arc<dyn PlanStore>,
        ids: Arc<dyn PlanIdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tools,
            metrics,
            plans,
            ids,
            clock,
            scoring: ScoringConfig::default(),
            config: PlanConfig::default(),
        }
    }

    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_config(mut self, config: PlanConfig) -> Self {
        self.config = config;
        self
    }

    /// Build, persist and return a plan for the task.
    pub async fn build(&self, task: &RoutingTask) -> Result<TaskRoutingPlan> {
        let tools = self
            .tools
            .get_tools_for_capability(&task.tenant_id, &task.capability)
            .await?;
        if tools.is_empty() {
            tracing::warn!(
                tenant_id = %task.tenant_id,
                capability = %task.capability,
                "No candidate tools"
            );
            return Err(Error::no_candidates(
                task.tenant_id.as_str(),
                task.capability.as_str(),
            ));
        }

        let tools = dedupe_by_id(tools);
        let metrics = self.fetch_metrics(task, &tools).await?;
        let ranked = score_candidates(&tools, &metrics, &task.capability, &self.scoring);
        let plan = self.assemble(task, &tools, ranked)?;

        self.plans.save_plan(&plan.plan_id, &plan).await?;

        tracing::info!(
            plan_id = %plan.plan_id,
            tenant_id = %task.tenant_id,
            capability = %task.capability,
            candidates = plan.candidates.len(),
            primary = %plan.selected.tool_id,
            fallback = plan.fallback.as_ref().map(|f| f.tool_id.as_str()).unwrap_or("-"),
            "Plan built"
        );
        Ok(plan)
    }

    /// One independent read per candidate, issued together.
    async fn fetch_metrics(
        &self,
        task: &RoutingTask,
        tools: &[Tool],
    ) -> Result<HashMap<ToolId, ToolMetrics>> {
        let reads = tools.iter().map(|tool| {
            let key = MetricsKey::new(task.tenant_id.clone(), tool.id.clone(), task.capability.clone());
            let store = self.metrics.clone();
            async move { store.get_metrics(&key).await }
        });
        let rows = try_join_all(reads).await?;
        Ok(tools
            .iter()
            .zip(rows)
            .filter_map(|(tool, row)| row.map(|r| (tool.id.clone(), r)))
            .collect())
    }

    fn assemble(
        &self,
        task: &RoutingTask,
        tools: &[Tool],
        ranked: Vec<CandidateScore>,
    ) -> Result<TaskRoutingPlan> {
        let (primary, fallback) = select(&ranked)?;

        let by_id: HashMap<&ToolId, &Tool> = tools.iter().map(|t| (&t.id, t)).collect();

        let has_fallback = fallback.is_some();
        let mut steps = vec![make_step(
            PRIMARY_STEP_ID,
            tool_for(&by_id, &primary)?,
            &task.capability,
            StepTransitions {
                success: if has_fallback {
                    Transition::Defer
                } else {
                    Transition::Complete
                },
                failure: if has_fallback {
                    Transition::Goto {
                        step: FALLBACK_STEP_ID.to_string(),
                    }
                } else {
                    Transition::Terminate {
                        status: TerminalStatus::Failure,
                    }
                },
                timeout: Transition::Terminate {
                    status: TerminalStatus::Timeout,
                },
            },
        )];
        if let Some(fallback) = &fallback {
            steps.push(make_step(
                FALLBACK_STEP_ID,
                tool_for(&by_id, fallback)?,
                &task.capability,
                StepTransitions {
                    success: Transition::Complete,
                    failure: Transition::Terminate {
                        status: TerminalStatus::Failure,
                    },
                    timeout: Transition::Terminate {
                        status: TerminalStatus::Timeout,
                    },
                },
            ));
        }

        let plan_id = self.ids.next_id();
        let retry = &self.config.retry;
        Ok(TaskRoutingPlan {
            schema_version: PLAN_SCHEMA_VERSION.to_string(),
            created_at: self.clock.now(),
            coordinator: Coordinator {
                name: self.config.coordinator.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            context: PlanContext {
                tenant_id: task.tenant_id.clone(),
                request_id: task.request_id.clone(),
            },
            goal: Goal {
                capability: task.capability.clone(),
                input: task.goal_input.clone(),
            },
            constraints: task.constraints.clone(),
            policy: PolicyDecision::default(),
            candidates: ranked,
            selected: primary,
            fallback,
            retry: RetryPolicy {
                max_attempts: retry.max_attempts,
                backoff: Backoff {
                    strategy: BackoffStrategy::Exponential,
                    initial_ms: u64::try_from(retry.initial_backoff.as_millis()).unwrap_or(u64::MAX),
                    multiplier: retry.multiplier,
                    jitter: retry.jitter,
                },
            },
            telemetry: TelemetrySettings {
                emit_execution_events: true,
                emit_feedback: true,
                correlation_id: plan_id.to_string(),
            },
            security: SecurityContext {
                auth: Default::default(),
                tenant_scoped: true,
            },
            steps,
            plan_id,
        })
    }
}

/// Keep the first registry entry per tool id so every candidate, score and
/// step refers to one tool.
fn dedupe_by_id(tools: Vec<Tool>) -> Vec<Tool> {
    let listed = tools.len();
    let mut seen = HashSet::new();
    let unique: Vec<Tool> = tools
        .into_iter()
        .filter(|tool| seen.insert(tool.id.clone()))
        .collect();
    if unique.len() < listed {
        tracing::debug!(dropped = listed - unique.len(), "Ignoring duplicate tool ids");
    }
    unique
}

/// Primary and optional fallback from a ranked list.
///
/// The primary is the best capability-matching candidate, which is rank 1
/// unless custom weights let a non-matching tool reach the same score.
fn select(ranked: &[CandidateScore]) -> Result<(Selection, Option<Selection>)> {
    let primary_idx = ranked
        .iter()
        .position(|c| c.explain.capability_fit >= 1.0)
        .unwrap_or(0);
    let primary = ranked
        .get(primary_idx)
        .ok_or_else(|| Error::internal("cannot select from an empty ranking"))?;

    let fallback = ranked
        .iter()
        .enumerate()
        .find(|(_, c)| c.tool_id != primary.tool_id)
        .map(|(idx, c)| Selection {
            tool_id: c.tool_id.clone(),
            rank: idx + 1,
            score: c.score,
            reason: SelectionReason::NextBest,
        });

    Ok((
        Selection {
            tool_id: primary.tool_id.clone(),
            rank: primary_idx + 1,
            score: primary.score,
            reason: SelectionReason::HighestScore,
        },
        fallback,
    ))
}

fn tool_for<'t>(by_id: &HashMap<&ToolId, &'t Tool>, selection: &Selection) -> Result<&'t Tool> {
    by_id.get(&selection.tool_id).copied().ok_or_else(|| {
        Error::internal(format!(
            "ranked tool {} missing from candidates",
            selection.tool_id
        ))
    })
}

fn make_step(id: &str, tool: &Tool, capability: &str, on: StepTransitions) -> PlanStep {
    PlanStep {
        id: id.to_string(),
        kind: StepKind::ToolCall,
        tool_id: tool.id.clone(),
        tool_version: tool.version.clone(),
        capability: capability.to_string(),
        endpoint: tool.http_endpoint(),
        on,
    }
}

// =============================================================================
// Tests
// =============================================================================
