//! Router facade — what the transport layer calls.
//!
//! Wires one [`PlanBuilder`] and one [`MetricsAggregator`] over the same
//! metrics store so feedback recorded here changes the next plan.

use crate::clock::{Clock, PlanIdGenerator, RandomPlanIds, SystemClock};
use crate::metrics::{FeedbackSignal, MetricsAggregator, ToolExecutionEvent, ToolMetrics};
use crate::plan::{PlanBuilder, RoutingTask, TaskRoutingPlan};
use crate::store::{
    ExecutionLog, InMemoryExecutionLog, InMemoryMetricsStore, InMemoryPlanStore,
    InMemoryToolRegistry, MetricsStore, PlanStore, ToolLookup,
};
use crate::tools::ToolCatalog;
use crate::types::{Config, Error, PlanId, Result};
use crate::validation::{sanitize_feedback, validate_execution_event, validate_task};
use std::sync::Arc;

/// Collaborator handles injected into the router.
#[derive(Clone)]
pub struct Collaborators {
    pub tools: Arc<dyn ToolLookup>,
    pub metrics: Arc<dyn MetricsStore>,
    pub plans: Arc<dyn PlanStore>,
    pub execution_log: Option<Arc<dyn ExecutionLog>>,
    pub clock: Arc<dyn Clock>,
    /// Defaults to random ids with the configured prefix.
    pub plan_ids: Option<Arc<dyn PlanIdGenerator>>,
}

impl Collaborators {
    pub fn new(
        tools: Arc<dyn ToolLookup>,
        metrics: Arc<dyn MetricsStore>,
        plans: Arc<dyn PlanStore>,
    ) -> Self {
        Self {
            tools,
            metrics,
            plans,
            execution_log: None,
            clock: Arc::new(SystemClock),
            plan_ids: None,
        }
    }

    /// In-memory adapters around a catalog.
    pub fn in_memory(catalog: ToolCatalog) -> Self {
        let mut collaborators = Self::new(
            Arc::new(InMemoryToolRegistry::new(catalog)),
            Arc::new(InMemoryMetricsStore::new()),
            Arc::new(InMemoryPlanStore::new()),
        );
        collaborators.execution_log = Some(Arc::new(InMemoryExecutionLog::new()));
        collaborators
    }

    pub fn with_execution_log(mut self, log: Arc<dyn ExecutionLog>) -> Self {
        self.execution_log = Some(log);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_plan_ids(mut self, ids: Arc<dyn PlanIdGenerator>) -> Self {
        self.plan_ids = Some(ids);
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("execution_log", &self.execution_log.is_some())
            .field("clock", &self.clock)
            .field("plan_ids", &self.plan_ids)
            .finish_non_exhaustive()
    }
}

/// Plan building and telemetry intake.
#[derive(Clone)]
pub struct ToolRouter {
    builder: PlanBuilder,
    aggregator: MetricsAggregator,
    plans: Arc<dyn PlanStore>,
    execution_log: Option<Arc<dyn ExecutionLog>>,
}

impl std::fmt::Debug for ToolRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRouter")
            .field("builder", &self.builder)
            .field("aggregator", &self.aggregator)
            .field("execution_log", &self.execution_log.is_some())
            .finish_non_exhaustive()
    }
}

impl ToolRouter {
    pub fn new(config: &Config, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let ids: Arc<dyn PlanIdGenerator> = match collaborators.plan_ids {
            Some(ids) => ids,
            None => Arc::new(RandomPlanIds::new(config.plan.plan_id_prefix.clone())),
        };
        let builder = PlanBuilder::new(
            collaborators.tools,
            collaborators.metrics.clone(),
            collaborators.plans.clone(),
            ids,
            collaborators.clock.clone(),
        )
        .with_scoring(config.scoring.clone())
        .with_config(config.plan.clone());
        let aggregator = MetricsAggregator::new(
            collaborators.metrics,
            collaborators.clock,
            &config.metrics,
        )?;
        Ok(Self {
            builder,
            aggregator,
            plans: collaborators.plans,
            execution_log: collaborators.execution_log,
        })
    }

    /// Build and persist a plan. Fails with `NoCandidates` when no tool
    /// supports the capability for the tenant.
    pub async fn build_plan(&self, task: &RoutingTask) -> Result<TaskRoutingPlan> {
        validate_task(task)?;
        self.builder.build(task).await
    }

    /// Append the raw event to the audit log, then fold it into metrics.
    pub async fn record_execution_telemetry(
        &self,
        event: &ToolExecutionEvent,
    ) -> Result<ToolMetrics> {
        validate_execution_event(event)?;
        if let Some(log) = &self.execution_log {
            log.append_execution(event).await?;
        }
        self.aggregator.record_execution(event).await
    }

    /// Blend a feedback reward into the tool's running average.
    pub async fn record_feedback_telemetry(&self, signal: &FeedbackSignal) -> Result<ToolMetrics> {
        let signal = sanitize_feedback(signal)?;
        self.aggregator.record_feedback(&signal).await
    }

    /// Read back a stored plan.
    pub async fn get_plan(&self, plan_id: &PlanId) -> Result<TaskRoutingPlan> {
        self.plans
            .get_plan(plan_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("plan {}", plan_id)))
    }
}
