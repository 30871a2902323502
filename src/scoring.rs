//! Candidate scoring — explainable four-factor ranking of tools.
//!
//! Pure and synchronous: the same tools, metrics and config always produce
//! the same ranking, so plans can be regenerated and compared.
//!
//! ```text
//! score = clamp01( w_fit    * capabilityFit
//!                + w_sla    * slaLikelihood
//!                + w_reward * pastReward
//!                + w_cost   * (1 - normalizedCost) )
//! ```

use crate::metrics::ToolMetrics;
use crate::tools::Tool;
use crate::types::{CostNormalization, ScoreWeights, ScoringConfig, SlaConfig, ToolId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Cost assigned when cost cannot or should not discriminate.
pub const NEUTRAL_COST: f64 = 0.5;

// =============================================================================
// Output types
// =============================================================================

/// Per-factor breakdown of a score. Every factor is in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreExplain {
    pub capability_fit: f64,
    pub sla_likelihood: f64,
    pub past_reward: f64,
    pub normalized_cost: f64,
    pub weights: ScoreWeights,
}

/// A scored candidate tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateScore {
    pub tool_id: ToolId,
    pub score: f64,
    pub explain: ScoreExplain,
}

// =============================================================================
// Factors
// =============================================================================

fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// 1 iff the tool declares the capability.
pub fn capability_fit(tool: &Tool, capability: &str) -> f64 {
    if tool.supports(capability) {
        1.0
    } else {
        0.0
    }
}

/// Weighted blend of success rate and latency headroom.
pub fn sla_likelihood(metrics: Option<&ToolMetrics>, sla: &SlaConfig) -> f64 {
    let success_rate = metrics
        .and_then(ToolMetrics::success_rate)
        .unwrap_or(sla.default_success_rate);
    let avg_latency_ms = metrics
        .and_then(ToolMetrics::avg_latency_ms)
        .unwrap_or(sla.default_latency_ms);
    let latency_score = clamp01(1.0 - avg_latency_ms / sla.max_reasonable_latency_ms);
    clamp01(sla.success_weight * success_rate + sla.latency_weight * latency_score)
}

/// Stored reward mapped from [-1, 1] to [0, 1].
pub fn past_reward(metrics: Option<&ToolMetrics>, default_reward: f64) -> f64 {
    match metrics {
        Some(m) => clamp01(0.5 + m.avg_reward / 2.0),
        None => clamp01(default_reward),
    }
}

/// Cost bounds of a batch, for min-max normalisation.
#[derive(Debug, Clone, Copy)]
struct CostRange {
    min: f64,
    max: f64,
}

impl CostRange {
    fn of(tools: &[Tool]) -> Option<Self> {
        tools
            .iter()
            .filter_map(|t| t.base_cost)
            .filter(|c| c.is_finite())
            .fold(None, |range, c| match range {
                None => Some(CostRange { min: c, max: c }),
                Some(r) => Some(CostRange {
                    min: r.min.min(c),
                    max: r.max.max(c),
                }),
            })
    }
}

fn normalized_cost(
    tool: &Tool,
    batch_size: usize,
    policy: CostNormalization,
    range: Option<CostRange>,
) -> f64 {
    if batch_size == 1 {
        return NEUTRAL_COST;
    }
    let Some(cost) = tool.base_cost.filter(|c| c.is_finite()) else {
        return NEUTRAL_COST;
    };
    match policy {
        CostNormalization::PreNormalized => clamp01(cost),
        CostNormalization::MinMax => match range {
            Some(r) if r.max > r.min => clamp01((cost - r.min) / (r.max - r.min)),
            _ => NEUTRAL_COST,
        },
    }
}

// =============================================================================
// Ranking
// =============================================================================

/// Descending score, then ascending tool id.
pub fn rank_order(a: &CandidateScore, b: &CandidateScore) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.tool_id.cmp(&b.tool_id))
}

/// Score every tool and return them ranked best-first.
///
/// `metrics` holds rows for the requested capability keyed by tool id; a
/// missing entry means the tool has no history (cold start).
pub fn score_candidates(
    tools: &[Tool],
    metrics: &HashMap<ToolId, ToolMetrics>,
    capability: &str,
    config: &ScoringConfig,
) -> Vec<CandidateScore> {
    let range = match config.cost_normalization {
        CostNormalization::MinMax => CostRange::of(tools),
        CostNormalization::PreNormalized => None,
    };
    let w = config.weights;

    let mut scored: Vec<CandidateScore> = tools
        .iter()
        .map(|tool| {
            let row = metrics.get(&tool.id);
            let explain = ScoreExplain {
                capability_fit: capability_fit(tool, capability),
                sla_likelihood: sla_likelihood(row, &config.sla),
                past_reward: past_reward(row, config.default_reward),
                normalized_cost: normalized_cost(
                    tool,
                    tools.len(),
                    config.cost_normalization,
                    range,
                ),
                weights: w,
            };
            let score = clamp01(
                w.fit * explain.capability_fit
                    + w.sla * explain.sla_likelihood
                    + w.reward * explain.past_reward
                    + w.cost * (1.0 - explain.normalized_cost),
            );
            tracing::trace!(
                tool_id = %tool.id,
                score,
                fit = explain.capability_fit,
                sla = explain.sla_likelihood,
                reward = explain.past_reward,
                cost = explain.normalized_cost,
                "Scored candidate"
            );
            CandidateScore {
                tool_id: tool.id.clone(),
                score,
                explain,
            }
        })
        .collect();

    scored.sort_by(rank_order);
    scored
}

// =============================================================================
// Tests
// =============================================================================
