//! Benchmarks for spark-signal-utils
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spark_signal_utils::timer::ManualTimer;
use spark_signal_utils::{batch, effect, PendingFlag, ReactiveMap, ReactiveSet};
use std::rc::Rc;
use std::time::Duration;

// =============================================================================
// MAP BENCHMARKS
// =============================================================================

fn bench_map_set_unchanged(c: &mut Criterion) {
    let map: ReactiveMap<u32, u32> = ReactiveMap::new();
    map.set(1, 1);
    c.bench_function("map_set_unchanged", |b| b.iter(|| black_box(map.set(1, 1))));
}

fn bench_map_set_with_effect(c: &mut Criterion) {
    let map: ReactiveMap<u32, u32> = ReactiveMap::new();
    let _dispose = effect({
        let map = map.clone();
        move || {
            black_box(map.len());
        }
    });

    let mut n = 0u32;
    c.bench_function("map_set_with_effect", |b| {
        b.iter(|| {
            n = n.wrapping_add(1);
            map.set(0, n)
        })
    });
}

fn bench_map_batch_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_batch_fill");

    for size in [10u32, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let map: ReactiveMap<u32, u32> = ReactiveMap::new();
                let _dispose = effect({
                    let map = map.clone();
                    move || {
                        black_box(map.len());
                    }
                });
                batch(|| {
                    for i in 0..size {
                        map.set(i, i);
                    }
                });
            })
        });
    }

    group.finish();
}

fn bench_map_get(c: &mut Criterion) {
    let map: ReactiveMap<u32, u32> = (0..1000).map(|i| (i, i)).collect();
    c.bench_function("map_get", |b| b.iter(|| black_box(map.get(&500))));
}

// =============================================================================
// SET BENCHMARKS
// =============================================================================

fn bench_set_add_delete(c: &mut Criterion) {
    let set: ReactiveSet<u32> = ReactiveSet::new();
    c.bench_function("set_add_delete", |b| {
        b.iter(|| {
            set.add(black_box(7));
            set.delete(&7)
        })
    });
}

// =============================================================================
// PENDING FLAG BENCHMARKS
// =============================================================================

fn bench_pending_activate_expire(c: &mut Criterion) {
    let timer = Rc::new(ManualTimer::new());
    let flag = PendingFlag::with_timer(timer.clone());
    c.bench_function("pending_activate_expire", |b| {
        b.iter(|| {
            flag.activate(Duration::from_millis(1));
            timer.advance(Duration::from_millis(1));
            black_box(flag.peek())
        })
    });
}

criterion_group!(
    benches,
    bench_map_set_unchanged,
    bench_map_set_with_effect,
    bench_map_batch_fill,
    bench_map_get,
    bench_set_add_delete,
    bench_pending_activate_expire,
);
criterion_main!(benches);
