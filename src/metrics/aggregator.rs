//! Metrics aggregation — folds execution and feedback telemetry into the
//! durable per-(tenant, tool, capability) rows that scoring reads.
//!
//! The fold steps are pure (`apply_execution`, `apply_feedback`); the
//! aggregator runs them inside the store's read-modify-write so concurrent
//! telemetry for one key is not lost. Every call counts: replaying an event
//! double-counts it.

use super::model::{FeedbackSignal, ToolExecutionEvent, ToolMetrics};
use crate::clock::Clock;
use crate::store::MetricsStore;
use crate::types::{Error, MetricsConfig, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

// =============================================================================
// Pure fold steps
// =============================================================================

/// Next row after one execution: bump the matching counter, add latency.
pub fn apply_execution(
    prev: Option<&ToolMetrics>,
    event: &ToolExecutionEvent,
    now: DateTime<Utc>,
) -> ToolMetrics {
    let mut next = prev
        .cloned()
        .unwrap_or_else(|| ToolMetrics::empty(&event.key(), now));
    if event.success {
        next.success_count = next.success_count.saturating_add(1);
    } else {
        next.failure_count = next.failure_count.saturating_add(1);
    }
    next.total_latency_ms = next.total_latency_ms.saturating_add(event.latency_ms);
    next.last_updated = now;
    next
}

/// Next row after one feedback signal: EWMA of the reward, clamped to [-1, 1].
///
/// The first signal for a key sets the average to the reward itself.
pub fn apply_feedback(
    prev: Option<&ToolMetrics>,
    signal: &FeedbackSignal,
    alpha: f64,
    now: DateTime<Utc>,
) -> ToolMetrics {
    let reward = signal.reward.clamp(-1.0, 1.0);
    let mut next = match prev {
        Some(row) => {
            let mut row = row.clone();
            row.avg_reward = ((1.0 - alpha) * row.avg_reward + alpha * reward).clamp(-1.0, 1.0);
            row
        }
        None => {
            let mut row = ToolMetrics::empty(&signal.key(), now);
            row.avg_reward = reward;
            row
        }
    };
    next.last_updated = now;
    next
}

// =============================================================================
// Aggregator
// =============================================================================

/// Applies telemetry to a [`MetricsStore`].
#[derive(Clone)]
pub struct MetricsAggregator {
    store: Arc<dyn MetricsStore>,
    clock: Arc<dyn Clock>,
    alpha: f64,
}

impl std::fmt::Debug for MetricsAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsAggregator")
            .field("clock", &self.clock)
            .field("alpha", &self.alpha)
            .finish_non_exhaustive()
    }
}

impl MetricsAggregator {
    pub fn new(
        store: Arc<dyn MetricsStore>,
        clock: Arc<dyn Clock>,
        config: &MetricsConfig,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&config.reward_alpha) {
            return Err(Error::config(format!(
                "reward_alpha must be within [0, 1], got {}",
                config.reward_alpha
            )));
        }
        Ok(Self {
            store,
            clock,
            alpha: config.reward_alpha,
        })
    }

    /// Record one tool execution.
    pub async fn record_execution(&self, event: &ToolExecutionEvent) -> Result<ToolMetrics> {
        let now = self.clock.now();
        let step = |prev: Option<&ToolMetrics>| apply_execution(prev, event, now);
        let row = self.store.update_metrics(&event.key(), &step).await?;
        tracing::debug!(
            tenant_id = %row.tenant_id,
            tool_id = %row.tool_id,
            capability = %row.capability,
            success = event.success,
            latency_ms = event.latency_ms,
            success_count = row.success_count,
            failure_count = row.failure_count,
            "Recorded tool execution"
        );
        Ok(row)
    }

    /// Blend one feedback reward into the running average.
    pub async fn record_feedback(&self, signal: &FeedbackSignal) -> Result<ToolMetrics> {
        let now = self.clock.now();
        let alpha = self.alpha;
        let step = |prev: Option<&ToolMetrics>| apply_feedback(prev, signal, alpha, now);
        let row = self.store.update_metrics(&signal.key(), &step).await?;
        tracing::debug!(
            tenant_id = %row.tenant_id,
            tool_id = %row.tool_id,
            capability = %row.capability,
            reward = signal.reward,
            avg_reward = row.avg_reward,
            "Recorded feedback"
        );
        Ok(row)
    }
}

// =============================================================================
// Tests
// =============================================================================
