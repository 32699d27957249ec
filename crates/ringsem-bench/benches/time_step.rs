//! Criterion benchmarks for one Newmark step of a prepared worker.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ringsem_bench::{heterogeneous_profile, prepared, reference_profile};

fn bench_step_elastic(c: &mut Criterion) {
    let mut newmark = prepared(&reference_profile(8, 9)).newmark;

    // Warm up: the first step touches every workspace once.
    newmark.advance().unwrap();

    c.bench_function("step_elastic_8x7", |b| {
        b.iter(|| {
            let more = newmark.advance().unwrap();
            black_box(more);
        });
    });
}

fn bench_step_heterogeneous(c: &mut Criterion) {
    let mut newmark = prepared(&heterogeneous_profile(8, 9)).newmark;
    newmark.advance().unwrap();

    c.bench_function("step_3d_attenuating_8x7", |b| {
        b.iter(|| {
            let more = newmark.advance().unwrap();
            black_box(more);
        });
    });
}

fn bench_step_wide_rings(c: &mut Criterion) {
    let mut newmark = prepared(&reference_profile(8, 33)).newmark;
    newmark.advance().unwrap();

    c.bench_function("step_elastic_nr33", |b| {
        b.iter(|| {
            let more = newmark.advance().unwrap();
            black_box(more);
        });
    });
}

criterion_group!(
    benches,
    bench_step_elastic,
    bench_step_heterogeneous,
    bench_step_wide_rings
);
criterion_main!(benches);
