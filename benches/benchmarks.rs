use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use incremental_pca::{EigenSolverKind, IncrementalPCA, IncrementalPcaConfig};
use ndarray::{s, Array, Array2, Axis};
use ndarray_rand::rand_distr::Normal;
use ndarray_rand::RandomExt;

// Function to generate random data for the streaming benchmarks
fn generate_data(n_samples: usize, n_features: usize) -> Array2<f64> {
    Array::random((n_samples, n_features), Normal::new(0., 3.).unwrap())
}

// Benchmark for IncrementalPCA::initialize
fn bench_initialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("IncrementalPCA_initialize");

    for &(n_samples, n_features) in [(100, 8), (500, 32), (1000, 64)].iter() {
        let data = generate_data(n_samples, n_features);
        let n_components = (n_features / 4).max(1);
        group.throughput(Throughput::Elements((n_samples * n_features) as u64));
        group.bench_with_input(
            BenchmarkId::new("initialize", format!("{}x{}", n_samples, n_features)),
            &data,
            |b, data_matrix| {
                b.iter_with_setup(
                    || IncrementalPCA::new(n_features, n_components).unwrap(),
                    |mut ipca| ipca.initialize(data_matrix.view()).unwrap(),
                );
            },
        );
    }
    group.finish();
}

// Benchmark for a single IncrementalPCA::update, dominated by the d x d eigendecomposition
fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("IncrementalPCA_update");

    for &n_features in [4usize, 16, 64].iter() {
        for solver in [EigenSolverKind::Symmetric, EigenSolverKind::General] {
            let data = generate_data(2 * n_features + 1, n_features);
            let split = 2 * n_features;
            let mut seeded = IncrementalPCA::with_config(IncrementalPcaConfig {
                input_dim: n_features,
                output_dim: (n_features / 4).max(1),
                solver,
            })
            .unwrap();
            seeded.initialize(data.slice(s![..split, ..])).unwrap();
            let sample = data.index_axis(Axis(0), split).to_owned();

            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", solver), n_features),
                &sample,
                |b, x| {
                    b.iter_with_setup(|| seeded.clone(), |mut ipca| ipca.update(x.view()).unwrap());
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_initialize, bench_update);
criterion_main!(benches);
