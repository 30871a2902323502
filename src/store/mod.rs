//! Collaborator interfaces — tool registry, metrics store, plan store and
//! execution audit log.
//!
//! The router only talks to these traits. Each has an in-memory adapter
//! (`memory`) used by tests and embedders, and a JSON-file adapter (`file`)
//! used by the CLI. Handles are passed in explicitly; there is no
//! process-wide client.

pub mod file;
pub mod memory;

use crate::metrics::{MetricsKey, ToolExecutionEvent, ToolMetrics};
use crate::plan::TaskRoutingPlan;
use crate::tools::Tool;
use crate::types::{PlanId, TenantId};
use async_trait::async_trait;
use thiserror::Error;

pub use file::{FileExecutionLog, FileMetricsStore, FilePlanStore, FileToolRegistry};
pub use memory::{InMemoryExecutionLog, InMemoryMetricsStore, InMemoryPlanStore, InMemoryToolRegistry};

// =============================================================================
// Errors
// =============================================================================

/// Collaborator failure.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend unreachable or refusing requests.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be interpreted.
    #[error("store data corrupt: {0}")]
    Corrupt(String),

    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Read-modify-write step applied by [`MetricsStore::update_metrics`].
pub type MetricsUpdate<'a> = &'a (dyn Fn(Option<&ToolMetrics>) -> ToolMetrics + Send + Sync);

// =============================================================================
// Traits
// =============================================================================

/// Tool registry lookup.
#[async_trait]
pub trait ToolLookup: Send + Sync {
    /// Tools enabled for the tenant that support the capability; empty if none.
    async fn get_tools_for_capability(
        &self,
        tenant_id: &TenantId,
        capability: &str,
    ) -> StoreResult<Vec<Tool>>;
}

/// Metrics rows keyed by (tenant, tool, capability).
#[async_trait]
pub trait MetricsStore: Send + Sync {
    async fn get_metrics(&self, key: &MetricsKey) -> StoreResult<Option<ToolMetrics>>;

    /// Upsert by composite key.
    async fn save_metrics(&self, metrics: &ToolMetrics) -> StoreResult<()>;

    /// Read the current row, compute the next one and write it back.
    ///
    /// Adapters that can serialise writers per key must override this so the
    /// three phases run under one lock; the default is only safe without
    /// concurrent writers for the same key.
    async fn update_metrics(
        &self,
        key: &MetricsKey,
        update: MetricsUpdate<'_>,
    ) -> StoreResult<ToolMetrics> {
        let current = self.get_metrics(key).await?;
        let next = update(current.as_ref());
        self.save_metrics(&next).await?;
        Ok(next)
    }
}

/// Plan persistence.
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn save_plan(&self, plan_id: &PlanId, plan: &TaskRoutingPlan) -> StoreResult<()>;

    async fn get_plan(&self, plan_id: &PlanId) -> StoreResult<Option<TaskRoutingPlan>>;
}

/// Append-only audit trail of raw execution events.
#[async_trait]
pub trait ExecutionLog: Send + Sync {
    async fn append_execution(&self, event: &ToolExecutionEvent) -> StoreResult<()>;
}
