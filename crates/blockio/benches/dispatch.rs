//! Dispatch overhead benchmarks.
//!
//! Compares calling the posix device directly with going through the
//! trampoline's snapshot-and-forward path.

use std::hint::black_box;

use blockio::{
    Buffer, Device, DeviceLoader, DeviceSettings, ElementType, ModuleResolver, Trampoline,
    builtin_registry,
};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

fn settings() -> DeviceSettings {
    DeviceSettings {
        block_size: 64 * 1024,
        queue_depth: 32,
        thread_count: 2,
        ..DeviceSettings::default()
    }
}

fn trampoline() -> Trampoline {
    let loader = DeviceLoader::new(ModuleResolver::new("plugins"), builtin_registry(), settings());
    let trampoline = Trampoline::new(loader);
    trampoline.load_device("posix").unwrap();
    trampoline
}

// ============================================================================
// Query Benchmarks
// ============================================================================

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_block_size");
    let direct = blockio_posix::create(&settings()).unwrap();
    let trampoline = trampoline();

    group.bench_function("direct", |b| {
        b.iter(|| black_box(direct.block_size().unwrap()));
    });
    group.bench_function("trampoline", |b| {
        b.iter(|| black_box(trampoline.get_block_size().unwrap()));
    });

    group.finish();
}

// ============================================================================
// Memcpy Benchmarks
// ============================================================================

fn bench_memcpy(c: &mut Criterion) {
    let mut group = c.benchmark_group("memcpy");
    let direct = blockio_posix::create(&settings()).unwrap();
    let trampoline = trampoline();

    for size in [4096, 65_536, 1_048_576] {
        group.throughput(Throughput::Bytes(size as u64));
        let src = Buffer::zeroed(ElementType::U8, size);
        let dest = Buffer::zeroed(ElementType::U8, size);

        group.bench_with_input(BenchmarkId::new("direct", size), &size, |b, _| {
            b.iter(|| black_box(direct.memcpy(&dest, &src).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("trampoline", size), &size, |b, _| {
            b.iter(|| black_box(trampoline.memcpy(&dest, &src).unwrap()));
        });
    }

    group.finish();
}

// ============================================================================
// Write Benchmarks
// ============================================================================

fn bench_sync_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync_pwrite");
    let temp_dir = tempfile::tempdir().unwrap();
    let trampoline = trampoline();

    for size in [65_536, 1_048_576] {
        group.throughput(Throughput::Bytes(size as u64));
        let src = Buffer::zeroed(ElementType::U8, size);
        let path = temp_dir.path().join(format!("bench-{size}.bin"));

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(trampoline.sync_pwrite(&src, &path).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_query, bench_memcpy, bench_sync_write);
criterion_main!(benches);
