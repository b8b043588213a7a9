//! Check-flag catalog operations.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rtcheck_core::CheckFlags;

fn bench_enabled_under(c: &mut Criterion) {
    let masks = [
        ("none", CheckFlags::NONE),
        ("memory", CheckFlags::MEMORY),
        ("all", CheckFlags::ALL),
    ];
    let mut group = c.benchmark_group("is_enabled_under");
    for (label, mask) in masks {
        group.bench_with_input(BenchmarkId::from_parameter(label), &mask, |b, &mask| {
            b.iter(|| black_box(CheckFlags::FREE).is_enabled_under(black_box(mask)));
        });
    }
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.bench_function("leaf", |b| {
        b.iter(|| black_box("pthread_mutex_lock").parse::<CheckFlags>());
    });
    group.bench_function("list", |b| {
        b.iter(|| black_box("memory|sleeping,fcntl").parse::<CheckFlags>());
    });
    group.finish();
}

criterion_group!(benches, bench_enabled_under, bench_parse);
criterion_main!(benches);
