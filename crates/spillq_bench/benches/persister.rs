//! Spill file encoding benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use spillq_bench::{generate_records, Record};
use spillq_storage::{BatchPersister, CborFilePersister, JsonFilePersister};
use tempfile::TempDir;

fn bench_codec<P: BatchPersister<Record>>(c: &mut Criterion, name: &str, persister: P) {
    let mut group = c.benchmark_group(name);
    let dir = TempDir::new().unwrap();

    for batch_size in [100usize, 1_000] {
        let batch = generate_records(batch_size, 256);
        let path = dir.path().join(format!("{batch_size}.dat"));
        group.throughput(Throughput::Elements(batch_size as u64));

        group.bench_with_input(BenchmarkId::new("write", batch_size), &batch, |b, batch| {
            b.iter(|| black_box(persister.write(&path, batch).unwrap()));
        });

        persister.write(&path, &batch).unwrap();
        group.bench_function(BenchmarkId::new("read", batch_size), |b| {
            b.iter(|| {
                let batch: Vec<Record> = persister.read(&path).unwrap();
                black_box(batch.len())
            });
        });
    }

    group.finish();
}

fn bench_json(c: &mut Criterion) {
    bench_codec(c, "json", JsonFilePersister::new());
}

fn bench_cbor(c: &mut Criterion) {
    bench_codec(c, "cbor", CborFilePersister::new());
}

criterion_group!(benches, bench_json, bench_cbor);
criterion_main!(benches);
