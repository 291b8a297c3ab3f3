//! Criterion benchmarks for ARL hot paths.
//!
//! Benchmarks:
//! 1. Tick loop (train and test passes without the optimizer)
//! 2. Weight update (single online gradient step)
//! 3. Cost function replay over a price window
//! 4. Meta-parameter search, parallel vs sequential

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use arl_core::engine::{Engine, EngineConfig};
use arl_core::optimizer::{cost_function, MetaOptimizer, Objective, ReplayContext, SearchConfig};
use arl_core::parameters::Parameters;
use arl_core::returns::ReturnKind;
use arl_core::risk::DrawdownStop;
use arl_core::weights::Weights;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_prices(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 1.1 + (i as f64 * 0.1).sin() * 0.01 + (i as f64 * 0.013).cos() * 0.005)
        .collect()
}

fn make_returns(n: usize) -> Vec<f64> {
    let prices = make_prices(n + 1);
    prices.windows(2).map(|p| p[1] - p[0]).collect()
}

fn make_weights(window_size: usize) -> Weights {
    Weights::from_coefficients((0..window_size).map(|i| 0.1 - i as f64 * 0.01).collect())
}

// ── 1. Tick loop ─────────────────────────────────────────────────────

fn bench_tick_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_loop");

    for &ticks in &[500, 2000, 10_000] {
        let prices = make_prices(ticks + 1);

        group.bench_with_input(BenchmarkId::new("train", ticks), &ticks, |b, _| {
            b.iter(|| {
                let mut engine = Engine::new(EngineConfig::new(13)).unwrap();
                engine.train(black_box(&prices), 0, None).unwrap()
            });
        });

        group.bench_with_input(BenchmarkId::new("test", ticks), &ticks, |b, _| {
            b.iter(|| {
                let mut engine = Engine::new(EngineConfig::new(13)).unwrap();
                engine.test(black_box(&prices), None).unwrap()
            });
        });
    }

    group.finish();
}

// ── 2. Weight update ─────────────────────────────────────────────────

fn bench_weight_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("weight_update");
    let params = Parameters::default();

    for &window_size in &[5, 13, 50] {
        let weights = make_weights(window_size);
        let history = make_returns(window_size * 2);

        group.bench_with_input(
            BenchmarkId::new("single_step", window_size),
            &window_size,
            |b, _| {
                b.iter(|| {
                    weights.update(
                        black_box(0.001),
                        black_box(1.0),
                        black_box(-1.0),
                        &params,
                        &history,
                    )
                });
            },
        );
    }

    group.finish();
}

// ── 3. Cost function ─────────────────────────────────────────────────

fn bench_cost_function(c: &mut Criterion) {
    let mut group = c.benchmark_group("cost_function");
    let params = Parameters::default();
    let weights = make_weights(13);
    let ctx = ReplayContext {
        window_size: 13,
        return_kind: ReturnKind::Difference,
        policy: &DrawdownStop,
        objective: Objective::default(),
    };

    for &len in &[50, 200, 1000] {
        let prices = make_prices(len + 1);
        group.bench_with_input(BenchmarkId::new("replay", len), &len, |b, _| {
            b.iter(|| cost_function(&params, &weights, black_box(&prices), &ctx));
        });
    }

    group.finish();
}

// ── 4. Search ────────────────────────────────────────────────────────

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("meta_search");
    group.sample_size(20);

    let basis = Parameters::default();
    let weights = make_weights(13);
    let prices = make_prices(201);

    for parallel in [true, false] {
        let optimizer = MetaOptimizer::new(SearchConfig {
            parallel,
            ..SearchConfig::default()
        });
        let label = if parallel { "parallel" } else { "sequential" };
        group.bench_function(label, |b| {
            b.iter(|| {
                optimizer.search(
                    &basis,
                    &weights,
                    black_box(&prices),
                    13,
                    ReturnKind::Difference,
                    &DrawdownStop,
                    0,
                )
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_tick_loop,
    bench_weight_update,
    bench_cost_function,
    bench_search,
);
criterion_main!(benches);
