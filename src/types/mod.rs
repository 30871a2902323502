//! Core types for the tool router.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Strongly-typed identifiers (TenantId, ToolId, PlanId)
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for scoring, metrics and plans

mod config;
mod errors;
mod ids;

pub use config::{
    Config, CostNormalization, MetricsConfig, ObservabilityConfig, PlanConfig, RetryDefaults,
    ScoreWeights, ScoringConfig, SlaConfig, ENV_COST_NORMALIZATION, ENV_LOG_LEVEL,
    ENV_REWARD_ALPHA,
};
pub use errors::{Error, Result};
pub use ids::{PlanId, TenantId, ToolId};
