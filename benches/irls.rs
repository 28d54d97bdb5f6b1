// ========================================================================================
//
//                      SYSTOLE IRLS FIT PERFORMANCE BENCHMARK
//
// ========================================================================================
//
// Measures how the cost of a full IRLS logistic regression fit scales with cohort
// size at the fixed 13-attribute design width used by the pipeline. Each fit runs
// to convergence, so the numbers reflect the whole Newton-Raphson solve and not a
// single iteration.
//
// ========================================================================================

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use ndarray::{Array1, Array2};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use systole::data::FEATURE_COLUMNS;
use systole::fit::fit_logistic;
use systole::model::FitConfig;

/// The cohort sizes to fit at each step of the sweep.
const COHORT_SIZES: [usize; 3] = [100, 300, 1000];

/// Builds a well-conditioned design with a planted three-attribute signal and
/// labels drawn from the implied Bernoulli model, so every fit converges.
fn synthetic_design(n_records: usize, seed: u64) -> (Array2<f64>, Array1<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut features: Array2<f64> = Array2::zeros((n_records, FEATURE_COLUMNS.len()));
    for i in 0..n_records {
        for j in 0..FEATURE_COLUMNS.len() {
            features[[i, j]] = rng.gen_range(-1.0..1.0);
        }
    }
    let labels = (0..n_records)
        .map(|i| {
            let eta = 1.4 * features[[i, 0]] - 1.1 * features[[i, 7]] + 0.8 * features[[i, 9]];
            let p = 1.0 / (1.0 + (-eta).exp());
            if rng.gen_bool(p) { 1.0 } else { 0.0 }
        })
        .collect();
    (features, Array1::from_vec(labels))
}

fn benchmark_irls_fit(c: &mut Criterion) {
    let config = FitConfig::default();

    let mut group = c.benchmark_group("IRLS logistic fit");
    for &n_records in COHORT_SIZES.iter() {
        let (features, labels) = synthetic_design(n_records, 42);
        group.throughput(Throughput::Elements(n_records as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n_records), &n_records, |b, _| {
            b.iter(|| {
                fit_logistic(
                    black_box(features.view()),
                    black_box(labels.view()),
                    &FEATURE_COLUMNS,
                    &config,
                )
                .unwrap()
            });
        });
    }
    group.finish();
}

// Boilerplate to register the benchmark group with the Criterion runner.
criterion_group!(benches, benchmark_irls_fit);
criterion_main!(benches);
