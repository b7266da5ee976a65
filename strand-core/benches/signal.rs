//! Benchmarks for the hot signal paths: reads, writes and the notification
//! pass with listeners attached.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use strand_core::signal::{UsageTracker, ValueSignal};

fn bench_reads(c: &mut Criterion) {
    let signal = ValueSignal::new(42u64);

    c.bench_function("peek", |b| b.iter(|| black_box(signal.peek().unwrap())));

    c.bench_function("get_untracked", |b| {
        b.iter(|| black_box(signal.get().unwrap()))
    });

    c.bench_function("get_tracked", |b| {
        b.iter(|| {
            let (value, usage) = UsageTracker::track(|| signal.get().unwrap());
            black_box(usage.has_changes());
            black_box(value)
        })
    });
}

fn bench_writes(c: &mut Criterion) {
    let signal = ValueSignal::new(0u64);

    c.bench_function("set", |b| {
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            black_box(signal.set(black_box(n)).unwrap())
        })
    });

    c.bench_function("update", |b| {
        b.iter(|| black_box(signal.update(|n| n + 1).unwrap()))
    });

    c.bench_function("set_with_renewing_listener", |b| {
        let signal = ValueSignal::new(0u64);
        let ((), usage) = UsageTracker::track(|| {
            signal.get().unwrap();
        });
        usage.on_next_change(Box::new(|_| true));

        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            black_box(signal.set(black_box(n)).unwrap())
        })
    });
}

criterion_group!(benches, bench_reads, bench_writes);
criterion_main!(benches);
