//! Candidate scoring throughput benchmark.
//!
//! Measures score_candidates over growing candidate batches, cold and with
//! history, using Criterion.

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::HashMap;
use tool_router::metrics::{MetricsKey, ToolMetrics};
use tool_router::scoring::score_candidates;
use tool_router::tools::Tool;
use tool_router::types::{CostNormalization, ScoringConfig, TenantId, ToolId};

const CAP: &str = "patient.search";

fn tools(n: usize) -> Vec<Tool> {
    (0..n)
        .map(|i| {
            Tool::new(format!("tool-{i:04}"), "bench", "1.0.0")
                .with_capability(if i % 4 == 0 { "other.cap" } else { CAP })
                .with_base_cost((i % 10) as f64 / 10.0)
        })
        .collect()
}

fn history(tools: &[Tool]) -> HashMap<ToolId, ToolMetrics> {
    let tenant = TenantId::from("acme");
    tools
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let key = MetricsKey::new(tenant.clone(), t.id.clone(), CAP);
            let mut row = ToolMetrics::empty(&key, Utc::now());
            row.success_count = 10 + i as u64 % 7;
            row.failure_count = i as u64 % 3;
            row.total_latency_ms = 150 * (row.success_count + row.failure_count);
            row.avg_reward = ((i % 5) as f64 - 2.0) / 2.0;
            (t.id.clone(), row)
        })
        .collect()
}

fn bench_cold_start(c: &mut Criterion) {
    let config = ScoringConfig::default();
    let empty = HashMap::new();

    let mut group = c.benchmark_group("score_cold");
    for &size in &[2usize, 16, 128, 1024] {
        let batch = tools(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            b.iter(|| score_candidates(black_box(batch), &empty, CAP, &config));
        });
    }
    group.finish();
}

fn bench_with_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_history");
    for policy in [CostNormalization::PreNormalized, CostNormalization::MinMax] {
        let config = ScoringConfig {
            cost_normalization: policy,
            ..Default::default()
        };
        let batch = tools(128);
        let metrics = history(&batch);
        group.bench_function(format!("{policy:?}"), |b| {
            b.iter(|| score_candidates(black_box(&batch), &metrics, CAP, &config));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_cold_start, bench_with_history);
criterion_main!(benches);
