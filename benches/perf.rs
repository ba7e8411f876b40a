use std::collections::HashSet;

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use minutes_lab::dataset::PartitionData;
use minutes_lab::evaluator::{BaselineEvaluator, Evaluator};
use minutes_lab::grid::{JobSpec, build_grid, plan_jobs};
use minutes_lab::job::JobResult;
use minutes_lab::metrics::evaluate_errors;
use minutes_lab::store::ResultStore;
use minutes_lab::synthetic::{self, SyntheticSpec};

fn sample_partition(id: &str) -> PartitionData {
    let spec = SyntheticSpec {
        partitions: vec![id.to_string()],
        players_per_partition: 60,
        ..SyntheticSpec::default()
    };
    let (mut train, mut validation) = synthetic::generate(&spec);
    PartitionData {
        partition_id: id.to_string(),
        train: train.remove(id).unwrap_or_default(),
        validation: validation.remove(id).unwrap_or_default(),
    }
}

fn bench_error_metrics(c: &mut Criterion) {
    let actuals: Vec<f64> = (0..10_000).map(|i| f64::from(i % 91)).collect();
    let predictions: Vec<f64> = actuals.iter().map(|a| (a * 0.8 + 7.0).min(90.0)).collect();

    c.bench_function("error_metrics_10k", |b| {
        b.iter(|| {
            let metrics = evaluate_errors(black_box(&predictions), black_box(&actuals)).unwrap();
            black_box(metrics.rmse);
        })
    });
}

fn bench_grid_plan(c: &mut Criterion) {
    let models: Vec<String> = (0..40).map(|i| format!("model_{i}")).collect();
    let partitions: Vec<String> = (0..25).map(|i| format!("part_{i}")).collect();
    let grid = build_grid(&models, &partitions);
    let completed: HashSet<JobSpec> = grid.iter().step_by(3).cloned().collect();

    c.bench_function("grid_build_and_plan", |b| {
        b.iter(|| {
            let grid = build_grid(black_box(&models), black_box(&partitions));
            let planned = plan_jobs(&grid, black_box(&completed));
            black_box(planned.len());
        })
    });
}

fn bench_baselines(c: &mut Criterion) {
    let data = sample_partition("MID");
    for variant in ["rolling_mean", "rolling_median:3", "lag_regression"] {
        c.bench_function(&format!("baseline_{variant}"), |b| {
            b.iter(|| {
                let out = BaselineEvaluator
                    .evaluate(black_box(&data), black_box(variant))
                    .unwrap();
                black_box(out.predictions.len());
            })
        });
    }
}

fn bench_store_append(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let grid = build_grid(&["last_value", "rolling_mean"], &["GK", "DEF", "MID", "FWD"]);

    c.bench_function("store_append_and_flush_8", |b| {
        b.iter(|| {
            let mut store = ResultStore::load(dir.path().join("results.csv")).unwrap();
            for job in &grid {
                store
                    .append_and_flush(JobResult::failed(job, "bench"))
                    .unwrap();
            }
            black_box(store.len());
        })
    });
}

criterion_group!(
    perf,
    bench_error_metrics,
    bench_grid_plan,
    bench_baselines,
    bench_store_append
);
criterion_main!(perf);
