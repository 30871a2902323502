//! Tool metrics — rolling counters and reward estimate per
//! (tenant, tool, capability), and the telemetry that feeds them.

pub mod aggregator;
pub mod model;

pub use aggregator::{apply_execution, apply_feedback, MetricsAggregator};
pub use model::{FeedbackSignal, MetricsKey, ToolExecutionEvent, ToolMetrics};
