use std::collections::BTreeMap;
use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use tailfirst_apm::{ApmConfig, EventRecord, FixedDraw, RiskScorer, TailFirstController};

fn busy_metrics() -> BTreeMap<String, f64> {
    [
        ("queue_pressure", 0.72),
        ("dbConnPoolPct", 64.0),
        ("lockWaitRatio", 0.08),
        ("retryPct", 2.5),
        ("gc_ratio", 0.04),
        ("cpuPct", 81.0),
        ("durationMs", 412.0),
        ("requestCount", 1.0),
        ("errorCount", 0.0),
        ("apdex", 0.92),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn risk_benchmarks(c: &mut Criterion) {
    let scorer = RiskScorer::new();
    let metrics = busy_metrics();
    let depth_only: BTreeMap<String, f64> = [("queueLen".to_string(), 180.0)].into_iter().collect();

    c.bench_function("risk_score_all_signals", |b| {
        b.iter(|| scorer.score(black_box(&metrics)))
    });

    c.bench_function("risk_score_depth_fallback", |b| {
        b.iter(|| scorer.score(black_box(&depth_only)))
    });

    let controller = TailFirstController::with_source(&ApmConfig::default(), Arc::new(FixedDraw(0.5)));

    c.bench_function("controller_apply_reduce", |b| {
        b.iter(|| {
            let mut record = EventRecord::with_start("bench", "bench", 0);
            for (key, value) in &metrics {
                record.add_metric(key.as_str(), *value);
            }
            record.add_trace_step("db.query", 12.0);
            controller.apply(black_box(&mut record))
        })
    });
}

criterion_group!(benches, risk_benchmarks);
criterion_main!(benches);
