//! JSON-file collaborator adapters.
//!
//! Loosely-typed values coming from disk (numeric strings, nulls) are
//! coerced here so the rest of the crate only sees strict numerics.

use super::{
    ExecutionLog, MetricsStore, MetricsUpdate, PlanStore, StoreError, StoreResult, ToolLookup,
};
use crate::metrics::{MetricsKey, ToolExecutionEvent, ToolMetrics};
use crate::plan::TaskRoutingPlan;
use crate::tools::{CatalogDocument, Tool, ToolCatalog};
use crate::types::{PlanId, TenantId};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use fs2::FileExt;
use std::io::Write;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Run blocking filesystem work off the async workers.
async fn blocking<T, F>(work: F) -> StoreResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
        .map_err(StoreError::from)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Write `bytes` to `path` through a uniquely named sibling temp file and
/// rename, so concurrent writers never share a temp path.
async fn write_atomic(path: &Path, bytes: Vec<u8>) -> StoreResult<()> {
    let path = path.to_path_buf();
    blocking(move || {
        let dir = parent_dir(&path);
        std::fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path)?;
        Ok(())
    })
    .await
}

/// Exclusive advisory lock on `<file>.lock`, held across processes until drop.
#[derive(Debug)]
struct FileLock {
    _file: std::fs::File,
}

impl FileLock {
    async fn acquire(target: &Path) -> StoreResult<Self> {
        let mut name = target.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".lock");
        let lock_path = target.with_file_name(name);
        blocking(move || {
            std::fs::create_dir_all(parent_dir(&lock_path))?;
            let file = std::fs::OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&lock_path)?;
            file.lock_exclusive()?;
            Ok(FileLock { _file: file })
        })
        .await
    }
}

/// Read a file, `None` if it does not exist.
async fn read_optional(path: &Path) -> StoreResult<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Tool registry
// =============================================================================

/// Registry read from a catalog document on every lookup.
#[derive(Debug, Clone)]
pub struct FileToolRegistry {
    path: PathBuf,
}

impl FileToolRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> StoreResult<ToolCatalog> {
        let bytes = read_optional(&self.path).await?.ok_or_else(|| {
            StoreError::unavailable(format!("tool registry {} not found", self.path.display()))
        })?;
        let mut raw: Value = serde_json::from_slice(&bytes)?;
        coerce_catalog(&mut raw);
        let doc: CatalogDocument = serde_json::from_value(raw)?;
        ToolCatalog::from_document(doc).map_err(|e| StoreError::corrupt(e.to_string()))
    }
}

#[async_trait]
impl ToolLookup for FileToolRegistry {
    async fn get_tools_for_capability(
        &self,
        tenant_id: &TenantId,
        capability: &str,
    ) -> StoreResult<Vec<Tool>> {
        Ok(self.load().await?.tools_for_capability(tenant_id, capability))
    }
}

/// Normalise `baseCost` on every tool: numbers stay, numeric strings parse,
/// anything else is dropped.
fn coerce_catalog(raw: &mut Value) {
    let Some(tools) = raw.get_mut("tools").and_then(Value::as_array_mut) else {
        return;
    };
    for tool in tools.iter_mut().filter_map(Value::as_object_mut) {
        let coerced = tool.get("baseCost").and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        });
        match coerced.filter(|c| c.is_finite()) {
            Some(cost) => {
                tool.insert("baseCost".to_string(), Value::from(cost));
            }
            None => {
                tool.remove("baseCost");
            }
        }
    }
}

// =============================================================================
// Metrics store
// =============================================================================

/// All metrics rows in one JSON document, rewritten on each update.
#[derive(Debug)]
pub struct FileMetricsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileMetricsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> StoreResult<BTreeMap<MetricsKey, ToolMetrics>> {
        let Some(bytes) = read_optional(&self.path).await? else {
            return Ok(BTreeMap::new());
        };
        let rows: Vec<ToolMetrics> = serde_json::from_slice(&bytes)?;
        Ok(rows
            .into_iter()
            .map(|mut row| {
                row.avg_reward = sanitize_reward(row.avg_reward);
                (row.key(), row)
            })
            .collect())
    }

    async fn flush(&self, rows: &BTreeMap<MetricsKey, ToolMetrics>) -> StoreResult<()> {
        let rows: Vec<&ToolMetrics> = rows.values().collect();
        let bytes = serde_json::to_vec_pretty(&rows)?;
        write_atomic(&self.path, bytes).await
    }
}

fn sanitize_reward(reward: f64) -> f64 {
    if reward.is_finite() {
        reward.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

#[async_trait]
impl MetricsStore for FileMetricsStore {
    async fn get_metrics(&self, key: &MetricsKey) -> StoreResult<Option<ToolMetrics>> {
        Ok(self.load().await?.remove(key))
    }

    async fn save_metrics(&self, metrics: &ToolMetrics) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let _file_lock = FileLock::acquire(&self.path).await?;
        let mut rows = self.load().await?;
        rows.insert(metrics.key(), metrics.clone());
        self.flush(&rows).await
    }

    async fn update_metrics(
        &self,
        key: &MetricsKey,
        update: MetricsUpdate<'_>,
    ) -> StoreResult<ToolMetrics> {
        let _guard = self.lock.lock().await;
        let _file_lock = FileLock::acquire(&self.path).await?;
        let mut rows = self.load().await?;
        let next = update(rows.get(key));
        rows.insert(key.clone(), next.clone());
        self.flush(&rows).await?;
        Ok(next)
    }
}

// =============================================================================
// Plan store
// =============================================================================

/// One `<plan_id>.json` per plan under a directory.
#[derive(Debug, Clone)]
pub struct FilePlanStore {
    dir: PathBuf,
}

impl FilePlanStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn plan_path(&self, plan_id: &PlanId) -> StoreResult<PathBuf> {
        let safe = !plan_id.is_empty()
            && plan_id
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !safe {
            return Err(StoreError::corrupt(format!("invalid plan id: {}", plan_id)));
        }
        Ok(self.dir.join(format!("{}.json", plan_id)))
    }
}

#[async_trait]
impl PlanStore for FilePlanStore {
    async fn save_plan(&self, plan_id: &PlanId, plan: &TaskRoutingPlan) -> StoreResult<()> {
        let path = self.plan_path(plan_id)?;
        let bytes = serde_json::to_vec_pretty(plan)?;
        write_atomic(&path, bytes).await
    }

    async fn get_plan(&self, plan_id: &PlanId) -> StoreResult<Option<TaskRoutingPlan>> {
        let path = self.plan_path(plan_id)?;
        match read_optional(&path).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

// =============================================================================
// Execution log
// =============================================================================

/// JSON-lines audit file, one event per line.
#[derive(Debug)]
pub struct FileExecutionLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileExecutionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl ExecutionLog for FileExecutionLog {
    async fn append_execution(&self, event: &ToolExecutionEvent) -> StoreResult<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolId;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_coerce_catalog_costs() {
        let mut raw = json!({
            "tools": [
                {"id": "a", "baseCost": "0.25"},
                {"id": "b", "baseCost": "cheap"},
                {"id": "c", "baseCost": null},
                {"id": "d", "baseCost": 0.5}
            ]
        });
        coerce_catalog(&mut raw);
        assert_eq!(raw["tools"][0]["baseCost"], json!(0.25));
        assert!(raw["tools"][1].get("baseCost").is_none());
        assert!(raw["tools"][2].get("baseCost").is_none());
        assert_eq!(raw["tools"][3]["baseCost"], json!(0.5));
    }

    #[tokio::test]
    async fn test_missing_registry_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FileToolRegistry::new(dir.path().join("tools.json"));
        let err = registry
            .get_tools_for_capability(&TenantId::from("acme"), "cap")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_metrics_file_persists_between_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        let key = MetricsKey::new(TenantId::from("acme"), ToolId::from("a"), "cap");

        let store = FileMetricsStore::new(&path);
        let bump = |prev: Option<&ToolMetrics>| {
            let mut next = prev
                .cloned()
                .unwrap_or_else(|| ToolMetrics::empty(&MetricsKey::new("acme".into(), "a".into(), "cap"), Utc::now()));
            next.failure_count += 1;
            next
        };
        store.update_metrics(&key, &bump).await.unwrap();
        store.update_metrics(&key, &bump).await.unwrap();

        let reopened = FileMetricsStore::new(&path);
        let row = reopened.get_metrics(&key).await.unwrap().unwrap();
        assert_eq!(row.failure_count, 2);
    }

    #[tokio::test]
    async fn test_plan_id_with_separator_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePlanStore::new(dir.path());
        let err = store.get_plan(&PlanId::from("../etc/passwd")).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
        assert!(store.get_plan(&PlanId::from("trp_missing")).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_updates_through_separate_instances_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        let key = MetricsKey::new(TenantId::from("acme"), ToolId::from("a"), "cap");

        let mut handles = Vec::new();
        for _ in 0..40 {
            let store = FileMetricsStore::new(&path);
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                let bump = |prev: Option<&ToolMetrics>| {
                    let mut next = prev.cloned().unwrap_or_else(|| {
                        ToolMetrics::empty(&MetricsKey::new("acme".into(), "a".into(), "cap"), Utc::now())
                    });
                    next.success_count += 1;
                    next
                };
                store.update_metrics(&key, &bump).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let row = FileMetricsStore::new(&path).get_metrics(&key).await.unwrap().unwrap();
        assert_eq!(row.success_count, 40);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name != "metrics.json" && name != "metrics.json.lock")
            .collect();
        assert!(leftovers.is_empty(), "stray files: {:?}", leftovers);
    }
}
