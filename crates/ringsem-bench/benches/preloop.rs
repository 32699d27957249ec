//! Criterion benchmarks for the preloop pipeline.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ringsem_bench::{heterogeneous_profile, prepared, reference_profile};

fn bench_preloop_elastic(c: &mut Criterion) {
    let profile = reference_profile(8, 9);
    c.bench_function("preloop_elastic_8x7", |b| {
        b.iter(|| black_box(prepared(&profile)));
    });
}

fn bench_preloop_heterogeneous(c: &mut Criterion) {
    let profile = heterogeneous_profile(8, 9);
    c.bench_function("preloop_3d_attenuating_8x7", |b| {
        b.iter(|| black_box(prepared(&profile)));
    });
}

criterion_group!(benches, bench_preloop_elastic, bench_preloop_heterogeneous);
criterion_main!(benches);
