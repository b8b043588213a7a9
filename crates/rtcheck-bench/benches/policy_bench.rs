//! Cost of the decision every intercepted call makes before forwarding.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use rtcheck_core::CheckFlags;
use rtcheck_membrane::{RealtimeContext, config, should_report, thread_state};

fn bench_should_report(c: &mut Criterion) {
    config::mark_initialized();
    let mut group = c.benchmark_group("should_report");

    group.bench_function("outside_realtime", |b| {
        b.iter(|| should_report(black_box(CheckFlags::MALLOC)));
    });

    group.bench_function("realtime_enabled", |b| {
        let _rt = RealtimeContext::new();
        b.iter(|| should_report(black_box(CheckFlags::MALLOC)));
    });

    group.bench_function("realtime_disabled", |b| {
        let _rt = RealtimeContext::new();
        thread_state::disable_checks(CheckFlags::MEMORY);
        b.iter(|| should_report(black_box(CheckFlags::MALLOC)));
        thread_state::disable_checks(CheckFlags::NONE);
    });

    group.finish();
}

fn bench_guards(c: &mut Criterion) {
    let mut group = c.benchmark_group("guards");

    group.bench_function("realtime_enter_exit", |b| {
        b.iter(|| {
            let rt = RealtimeContext::new();
            black_box(&rt);
        });
    });

    group.bench_function("nested_non_realtime", |b| {
        let _rt = RealtimeContext::new();
        b.iter(|| {
            let carve_out = rtcheck_membrane::NonRealtimeContext::new();
            black_box(&carve_out);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_should_report, bench_guards);
criterion_main!(benches);
