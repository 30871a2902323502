//! # Tool Router - explainable tool selection and fallback plans
//!
//! Picks, among the tools able to serve a requested capability, the best one
//! to invoke and emits a Task Routing Plan with a primary and a fallback
//! step. Execution and feedback telemetry flow back into per-tool metrics,
//! so later plans adapt:
//! - Four-factor scoring (capability fit, SLA likelihood, past reward, cost)
//! - Deterministic ranking with per-factor explanations
//! - Two-step plan state machine (primary → fallback)
//! - EWMA reward blending and rolling execution counters
//!
//! ## Architecture
//!
//! ```text
//!   task ──▶ ┌──────────────── ToolRouter ────────────────┐
//!            │  PlanBuilder ──▶ scoring::score_candidates │ ──▶ plan
//!            │      │ reads                               │
//!            │      ▼                                     │
//!   telemetry ─▶ MetricsAggregator ──▶ MetricsStore       │
//!            └────────────────────────────────────────────┘
//!        ToolLookup / MetricsStore / PlanStore / ExecutionLog are injected
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod clock;
pub mod metrics;
pub mod plan;
pub mod router;
pub mod scoring;
pub mod store;
pub mod tools;
pub mod types;
pub mod validation;

// Internal utilities
pub mod observability;

pub use router::{Collaborators, ToolRouter};
pub use types::{Config, Error, Result};
