//! Queue push/drain benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use spillq_bench::{generate_records, temp_queue};
use spillq_core::QueueConfig;

/// Push then drain with the heap large enough that nothing spills.
fn bench_in_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("in_memory");

    for count in [1_000usize, 10_000] {
        let records = generate_records(count, 64);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("push_drain", count), &records, |b, records| {
            let (_dir, queue) = temp_queue(
                QueueConfig::new("bench")
                    .capacity(count * 2)
                    .heap_capacity(count * 2)
                    .page_size(count / 10),
            );
            let mut out = Vec::with_capacity(count);
            b.iter(|| {
                for record in records {
                    queue.push(record.clone()).unwrap();
                }
                out.clear();
                queue.drain_into(&mut out, count).unwrap();
                black_box(out.len());
            });
        });
    }

    group.finish();
}

/// Push then drain with a small heap so most segments go through disk.
fn bench_spilling(c: &mut Criterion) {
    let mut group = c.benchmark_group("spilling");
    group.sample_size(20);

    for payload_size in [64usize, 1024] {
        let count = 10_000;
        let records = generate_records(count, payload_size);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(
            BenchmarkId::new("push_drain", payload_size),
            &records,
            |b, records| {
                let (_dir, queue) = temp_queue(
                    QueueConfig::new("bench")
                        .capacity(count)
                        .heap_capacity(1_500)
                        .page_size(500),
                );
                let mut out = Vec::with_capacity(count);
                b.iter(|| {
                    for record in records {
                        queue.push(record.clone()).unwrap();
                    }
                    out.clear();
                    queue.drain_into(&mut out, count).unwrap();
                    black_box(out.len());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_in_memory, bench_spilling);
criterion_main!(benches);
