// In benches/metrics_bench.rs

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mgard_verify::kernels::metrics::{l2_error, l2_norm, linf_error, linf_norm};

/// A smooth field with a small high-frequency perturbation.
fn generate_field(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| {
            let x = i as f64 * 1e-3;
            x.sin() * 100.0 + (i % 13) as f64 * 1e-2
        })
        .collect()
}

const BENCH_ELEMENTS: usize = 1 << 20;

fn bench_metric_kernels(c: &mut Criterion) {
    let original = generate_field(BENCH_ELEMENTS);
    let reconstructed: Vec<f64> = original.iter().map(|x| x + 1e-4).collect();
    let single: Vec<f32> = original.iter().map(|&x| x as f32).collect();

    let mut group = c.benchmark_group("Norm and Error Kernels");
    group.throughput(criterion::Throughput::Bytes(
        (BENCH_ELEMENTS * std::mem::size_of::<f64>()) as u64,
    ));

    group.bench_function("L2 norm (f64)", |b| {
        b.iter(|| black_box(l2_norm(black_box(&original))))
    });
    group.bench_function("L2 norm (f32)", |b| {
        b.iter(|| black_box(l2_norm(black_box(&single))))
    });
    group.bench_function("L-inf norm (f64)", |b| {
        b.iter(|| black_box(linf_norm(black_box(&original))))
    });
    group.bench_function("L2 error (f64)", |b| {
        b.iter(|| black_box(l2_error(black_box(&original), black_box(&reconstructed))))
    });
    group.bench_function("L-inf error (f64)", |b| {
        b.iter(|| black_box(linf_error(black_box(&original), black_box(&reconstructed))))
    });

    group.finish();
}

criterion_group!(benches, bench_metric_kernels);
criterion_main!(benches);
