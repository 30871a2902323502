//! Configuration structures.
//!
//! Configuration is loaded from a JSON file, then overridden from environment
//! variables. Every section defaults, so partial files are accepted.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::errors::{self, Error};

/// Environment variable overriding `metrics.reward_alpha`.
pub const ENV_REWARD_ALPHA: &str = "TOOL_ROUTER_REWARD_ALPHA";
/// Environment variable overriding `scoring.cost_normalization`.
pub const ENV_COST_NORMALIZATION: &str = "TOOL_ROUTER_COST_NORMALIZATION";
/// Environment variable overriding `observability.log_level`.
pub const ENV_LOG_LEVEL: &str = "TOOL_ROUTER_LOG_LEVEL";

/// Global router configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, JsonSchema)]
pub struct Config {
    /// Candidate scoring parameters.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Telemetry aggregation parameters.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Plan document defaults.
    #[serde(default)]
    pub plan: PlanConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> errors::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Apply `TOOL_ROUTER_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> errors::Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> errors::Result<()> {
        if let Some(raw) = lookup(ENV_REWARD_ALPHA) {
            self.metrics.reward_alpha = raw
                .trim()
                .parse()
                .map_err(|_| Error::config(format!("{} is not a number: {}", ENV_REWARD_ALPHA, raw)))?;
        }
        if let Some(raw) = lookup(ENV_COST_NORMALIZATION) {
            self.scoring.cost_normalization = match raw.trim().to_ascii_lowercase().as_str() {
                "pre_normalized" => CostNormalization::PreNormalized,
                "min_max" => CostNormalization::MinMax,
                other => {
                    return Err(Error::config(format!(
                        "{} must be pre_normalized or min_max, got {}",
                        ENV_COST_NORMALIZATION, other
                    )))
                }
            };
        }
        if let Some(raw) = lookup(ENV_LOG_LEVEL) {
            self.observability.log_level = raw;
        }
        Ok(())
    }

    /// Check ranges that serde cannot express.
    pub fn validate(&self) -> errors::Result<()> {
        let w = &self.scoring.weights;
        for (name, value) in [
            ("scoring.weights.fit", w.fit),
            ("scoring.weights.sla", w.sla),
            ("scoring.weights.reward", w.reward),
            ("scoring.weights.cost", w.cost),
            ("scoring.sla.success_weight", self.scoring.sla.success_weight),
            ("scoring.sla.latency_weight", self.scoring.sla.latency_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::config(format!("{} must be a finite non-negative number", name)));
            }
        }
        for (name, value) in [
            ("scoring.sla.default_success_rate", self.scoring.sla.default_success_rate),
            ("scoring.default_reward", self.scoring.default_reward),
            ("metrics.reward_alpha", self.metrics.reward_alpha),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::config(format!("{} must be within [0, 1]", name)));
            }
        }
        if !(self.scoring.sla.max_reasonable_latency_ms > 0.0) {
            return Err(Error::config("scoring.sla.max_reasonable_latency_ms must be positive"));
        }
        if !self.scoring.sla.default_latency_ms.is_finite() || self.scoring.sla.default_latency_ms < 0.0 {
            return Err(Error::config("scoring.sla.default_latency_ms must be non-negative"));
        }
        if self.plan.retry.max_attempts == 0 {
            return Err(Error::config("plan.retry.max_attempts must be at least 1"));
        }
        if !self.plan.retry.multiplier.is_finite() || self.plan.retry.multiplier < 1.0 {
            return Err(Error::config("plan.retry.multiplier must be >= 1"));
        }
        Ok(())
    }

    /// JSON schema describing the configuration file.
    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(Config)).unwrap_or_default()
    }
}

/// Weights of the four scoring factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ScoreWeights {
    pub fit: f64,
    pub sla: f64,
    pub reward: f64,
    pub cost: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            fit: 0.5,
            sla: 0.25,
            reward: 0.15,
            cost: 0.1,
        }
    }
}

/// SLA likelihood parameters and cold-start defaults.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SlaConfig {
    /// Weight of the observed success rate (default: 0.7).
    pub success_weight: f64,
    /// Weight of the latency score (default: 0.3).
    pub latency_weight: f64,
    /// Success rate assumed with no runs (default: 0.8).
    pub default_success_rate: f64,
    /// Average latency assumed with no runs (default: 800).
    pub default_latency_ms: f64,
    /// Latency at which the latency score reaches zero (default: 2000).
    pub max_reasonable_latency_ms: f64,
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            success_weight: 0.7,
            latency_weight: 0.3,
            default_success_rate: 0.8,
            default_latency_ms: 800.0,
            max_reasonable_latency_ms: 2000.0,
        }
    }
}

/// How `baseCost` is turned into `normalizedCost`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CostNormalization {
    /// `baseCost` is already in [0, 1]; clamp it.
    #[default]
    PreNormalized,
    /// Min-max normalise `baseCost` across the candidate batch.
    MinMax,
}

/// Scoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoreWeights,
    pub sla: SlaConfig,
    /// Past reward used for tools without metrics (default: 0.5).
    pub default_reward: f64,
    pub cost_normalization: CostNormalization,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            sla: SlaConfig::default(),
            default_reward: 0.5,
            cost_normalization: CostNormalization::PreNormalized,
        }
    }
}

/// Telemetry aggregation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MetricsConfig {
    /// EWMA smoothing constant for feedback rewards (default: 0.2).
    pub reward_alpha: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { reward_alpha: 0.2 }
    }
}

/// Retry policy embedded in every plan.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RetryDefaults {
    pub max_attempts: u32,
    /// First backoff delay (default: 100ms).
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub initial_backoff: Duration,
    pub multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryDefaults {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(100),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Plan document configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PlanConfig {
    /// Coordinator name stamped on every plan.
    pub coordinator: String,
    /// Prefix of generated plan ids.
    pub plan_id_prefix: String,
    pub retry: RetryDefaults,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            coordinator: "tool-router".to_string(),
            plan_id_prefix: "trp_".to_string(),
            retry: RetryDefaults::default(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.scoring.weights, ScoreWeights::default());
        assert_eq!(config.plan.retry.initial_backoff, Duration::from_millis(100));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"metrics": {"reward_alpha": 0.5}, "plan": {"retry": {"initial_backoff": "250ms"}}}"#,
        )
        .unwrap();
        assert!((config.metrics.reward_alpha - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.plan.retry.initial_backoff, Duration::from_millis(250));
        assert_eq!(config.plan.retry.max_attempts, 1);
        assert!((config.scoring.weights.fit - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_REWARD_ALPHA, "0.35"),
            (ENV_COST_NORMALIZATION, "min_max"),
            (ENV_LOG_LEVEL, "debug"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert!((config.metrics.reward_alpha - 0.35).abs() < f64::EPSILON);
        assert_eq!(config.scoring.cost_normalization, CostNormalization::MinMax);
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_bad_env_override_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|k| (k == ENV_REWARD_ALPHA).then(|| "fast".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_alpha_out_of_range_rejected() {
        let mut config = Config::default();
        config.metrics.reward_alpha = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = Config::default();
        config.scoring.weights.cost = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_schema_lists_sections() {
        let schema = Config::json_schema();
        let props = schema["properties"].as_object().unwrap();
        assert!(props.contains_key("scoring"));
        assert!(props.contains_key("metrics"));
    }

    #[test]
    fn test_backoff_is_humantime_in_file_and_schema() {
        let retry = serde_json::to_value(RetryDefaults::default()).unwrap();
        assert_eq!(retry["initial_backoff"], "100ms");

        let schema = Config::json_schema();
        let backoff = &schema["definitions"]["RetryDefaults"]["properties"]["initial_backoff"];
        assert_eq!(backoff["type"], "string");
    }
}
