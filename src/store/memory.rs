//! In-memory collaborator adapters.

use super::{
    ExecutionLog, MetricsStore, MetricsUpdate, PlanStore, StoreResult, ToolLookup,
};
use crate::metrics::{MetricsKey, ToolExecutionEvent, ToolMetrics};
use crate::plan::TaskRoutingPlan;
use crate::tools::{Tool, ToolCatalog};
use crate::types::{PlanId, TenantId};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{Mutex, RwLock};

// =============================================================================
// Tool registry
// =============================================================================

/// Registry backed by a [`ToolCatalog`].
#[derive(Debug, Default)]
pub struct InMemoryToolRegistry {
    catalog: RwLock<ToolCatalog>,
}

impl InMemoryToolRegistry {
    pub fn new(catalog: ToolCatalog) -> Self {
        Self {
            catalog: RwLock::new(catalog),
        }
    }

    /// Mutate the catalog (register tools, change enablement).
    pub async fn with_catalog<R>(&self, f: impl FnOnce(&mut ToolCatalog) -> R) -> R {
        let mut catalog = self.catalog.write().await;
        f(&mut catalog)
    }
}

#[async_trait]
impl ToolLookup for InMemoryToolRegistry {
    async fn get_tools_for_capability(
        &self,
        tenant_id: &TenantId,
        capability: &str,
    ) -> StoreResult<Vec<Tool>> {
        Ok(self
            .catalog
            .read()
            .await
            .tools_for_capability(tenant_id, capability))
    }
}

// =============================================================================
// Metrics store
// =============================================================================

/// Metrics rows in a map; `update_metrics` holds the map lock across the
/// read-modify-write.
#[derive(Debug, Default)]
pub struct InMemoryMetricsStore {
    rows: Mutex<HashMap<MetricsKey, ToolMetrics>>,
}

impl InMemoryMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

#[async_trait]
impl MetricsStore for InMemoryMetricsStore {
    async fn get_metrics(&self, key: &MetricsKey) -> StoreResult<Option<ToolMetrics>> {
        Ok(self.rows.lock().await.get(key).cloned())
    }

    async fn save_metrics(&self, metrics: &ToolMetrics) -> StoreResult<()> {
        self.rows.lock().await.insert(metrics.key(), metrics.clone());
        Ok(())
    }

    async fn update_metrics(
        &self,
        key: &MetricsKey,
        update: MetricsUpdate<'_>,
    ) -> StoreResult<ToolMetrics> {
        let mut rows = self.rows.lock().await;
        let next = update(rows.get(key));
        rows.insert(key.clone(), next.clone());
        Ok(next)
    }
}

// =============================================================================
// Plan store
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryPlanStore {
    plans: RwLock<HashMap<PlanId, TaskRoutingPlan>>,
}

impl InMemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.plans.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.plans.read().await.is_empty()
    }
}

#[async_trait]
impl PlanStore for InMemoryPlanStore {
    async fn save_plan(&self, plan_id: &PlanId, plan: &TaskRoutingPlan) -> StoreResult<()> {
        self.plans
            .write()
            .await
            .insert(plan_id.clone(), plan.clone());
        Ok(())
    }

    async fn get_plan(&self, plan_id: &PlanId) -> StoreResult<Option<TaskRoutingPlan>> {
        Ok(self.plans.read().await.get(plan_id).cloned())
    }
}

// =============================================================================
// Execution log
// =============================================================================

#[derive(Debug, Default)]
pub struct InMemoryExecutionLog {
    events: Mutex<Vec<ToolExecutionEvent>>,
}

impl InMemoryExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far.
    pub async fn events(&self) -> Vec<ToolExecutionEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl ExecutionLog for InMemoryExecutionLog {
    async fn append_execution(&self, event: &ToolExecutionEvent) -> StoreResult<()> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolId;
    use chrono::Utc;
    use std::sync::Arc;

    fn key() -> MetricsKey {
        MetricsKey::new(TenantId::from("acme"), ToolId::from("a"), "cap")
    }

    #[tokio::test]
    async fn test_metrics_upsert_and_get() {
        let store = InMemoryMetricsStore::new();
        assert!(store.get_metrics(&key()).await.unwrap().is_none());

        let mut row = ToolMetrics::empty(&key(), Utc::now());
        row.success_count = 2;
        store.save_metrics(&row).await.unwrap();
        row.success_count = 3;
        store.save_metrics(&row).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get_metrics(&key()).await.unwrap().unwrap().success_count, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_are_not_lost() {
        let store = Arc::new(InMemoryMetricsStore::new());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let k = key();
                let bump = |prev: Option<&ToolMetrics>| {
                    let mut next = prev.cloned().unwrap_or_else(|| ToolMetrics::empty(&key(), Utc::now()));
                    next.success_count += 1;
                    next
                };
                store.update_metrics(&k, &bump).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.get_metrics(&key()).await.unwrap().unwrap().success_count, 50);
    }

    #[tokio::test]
    async fn test_registry_reads_catalog() {
        let registry = InMemoryToolRegistry::default();
        let acme = TenantId::from("acme");
        registry
            .with_catalog(|c| {
                c.register(Tool::new("a", "A", "1").with_capability("cap"))?;
                c.enable_for_tenant(&acme, &ToolId::from("a"))
            })
            .await
            .unwrap();
        let tools = registry.get_tools_for_capability(&acme, "cap").await.unwrap();
        assert_eq!(tools.len(), 1);
        assert!(registry
            .get_tools_for_capability(&acme, "other")
            .await
            .unwrap()
            .is_empty());
    }
}
