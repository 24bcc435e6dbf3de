//! Thread-local slot benchmarks.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use kcrt_core::ThreadLocal;

fn bench_get(c: &mut Criterion) {
    let slot = ThreadLocal::new(7_u64);
    let mut group = c.benchmark_group("tls_get");

    group.bench_function("bound", |b| {
        b.iter(|| criterion::black_box(slot.get()));
    });
    group.bench_function("deref", |b| {
        b.iter(|| criterion::black_box(*slot));
    });
    group.finish();
}

fn bench_create_destroy(c: &mut Criterion) {
    let mut group = c.benchmark_group("tls_lifecycle");
    for &threads in &[1_usize, 4] {
        group.bench_with_input(
            BenchmarkId::new("new_bind_drop", threads),
            &threads,
            |b, &n| {
                b.iter(|| {
                    let slot = ThreadLocal::new(0_u64);
                    std::thread::scope(|s| {
                        for i in 1..n {
                            let slot = &slot;
                            s.spawn(move || {
                                slot.get_or(|| i as u64);
                            });
                        }
                    });
                    criterion::black_box(slot.bound_count());
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_get, bench_create_destroy);
criterion_main!(benches);
