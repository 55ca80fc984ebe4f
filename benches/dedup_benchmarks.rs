use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use dupelink::dedup::{DedupEngine, EngineConfig};
use dupelink::report::MemorySink;
use dupelink::scanner::{files_identical, Algorithm, Hasher, Walker, WalkerConfig};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// Tree of `dirs` directories with `files_per_dir` files; every content
// appears twice so half the files are duplicates.
fn setup_tree(dirs: usize, files_per_dir: usize) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for d in 0..dirs {
        let dir = temp_dir.path().join(format!("dir_{d}"));
        fs::create_dir(&dir).unwrap();
        for f in 0..files_per_dir {
            let content = format!("content {} {}", d / 2, f).repeat(64);
            fs::write(dir.join(format!("file_{f}.txt")), content).unwrap();
        }
    }
    temp_dir
}

fn write_blob(dir: &Path, name: &str, size: usize) -> std::path::PathBuf {
    let path = dir.join(name);
    let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    fs::write(&path, data).unwrap();
    path
}

fn bench_walker(c: &mut Criterion) {
    let temp_dir = setup_tree(8, 20);

    c.bench_function("walker_160_files", |b| {
        b.iter(|| {
            let walker = Walker::new(temp_dir.path(), WalkerConfig::default());
            let entries: Vec<_> = walker.walk().collect();
            black_box(entries);
        })
    });
}

fn bench_fingerprint(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let path = write_blob(temp_dir.path(), "blob.bin", 4 * 1024 * 1024);

    let mut group = c.benchmark_group("fingerprint_4mib");
    for algorithm in [Algorithm::Blake3, Algorithm::Legacy] {
        let hasher = Hasher::new().with_algorithm(algorithm);
        group.bench_function(algorithm.to_string(), |b| {
            b.iter(|| black_box(hasher.full_hash(&path).unwrap()))
        });
    }
    group.finish();
}

fn bench_compare(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let a = write_blob(temp_dir.path(), "a.bin", 4 * 1024 * 1024);
    let b = write_blob(temp_dir.path(), "b.bin", 4 * 1024 * 1024);

    c.bench_function("files_identical_4mib", |bench| {
        bench.iter(|| black_box(files_identical(&a, &b).unwrap()))
    });
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");
    group.sample_size(10);

    group.bench_function("dedup_160_files", |b| {
        b.iter_batched(
            || setup_tree(8, 20),
            |temp_dir| {
                let mut sink = MemorySink::new();
                let summary = DedupEngine::new(EngineConfig::default())
                    .run(temp_dir.path(), &mut sink)
                    .unwrap();
                black_box(summary);
            },
            BatchSize::PerIteration,
        )
    });

    group.bench_function("dry_run_160_files", |b| {
        let temp_dir = setup_tree(8, 20);
        b.iter(|| {
            let mut sink = MemorySink::new();
            let summary = DedupEngine::new(EngineConfig::default().with_dry_run(true))
                .run(temp_dir.path(), &mut sink)
                .unwrap();
            black_box(summary);
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_walker,
    bench_fingerprint,
    bench_compare,
    bench_engine
);
criterion_main!(benches);
