//! Benchmark suite for premerge hot paths.
//!
//! - Porcelain status parsing (change detection on large working trees)
//! - Copyright header detection
//! - Full-tree walk for `format --full`
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench
//! cargo bench -- --save-baseline main
//! cargo bench -- --baseline main
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use premerge::changes::parse_status_output;
use premerge::quality::has_copyright;
use premerge::{walk_files, ChangeQuery};
use std::fs;
use tempfile::TempDir;

// ============================================================================
// Status Parsing Benchmarks
// ============================================================================

fn status_lines(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match i % 4 {
            0 => format!(" M src/module_{}.cpp", i),
            1 => format!("?? scripts/tool_{}.py", i),
            2 => format!("R  old_{}.h -> include/new_{}.h", i, i),
            _ => format!("A  lib/part_{}.cc", i),
        })
        .collect()
}

fn bench_status_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("status_parsing");

    for size in [100, 1_000, 10_000] {
        let lines = status_lines(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("porcelain", size), &lines, |b, lines| {
            b.iter(|| parse_status_output(black_box(lines)));
        });
    }

    group.finish();
}

// ============================================================================
// Header Detection Benchmarks
// ============================================================================

fn bench_header_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("header_detection");

    let body = "int value = 0;\n".repeat(5_000);
    let stamped = format!("/** Copyright (c) 2026, Acme **/\n{}", body);

    group.bench_function("present", |b| {
        b.iter(|| has_copyright(black_box(&stamped)));
    });
    group.bench_function("absent", |b| {
        b.iter(|| has_copyright(black_box(&body)));
    });

    group.finish();
}

// ============================================================================
// Tree Walk Benchmarks
// ============================================================================

fn create_tree(files: usize) -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp dir");
    for i in 0..files {
        let dir = temp.path().join(format!("pkg_{}", i % 10));
        fs::create_dir_all(&dir).expect("Failed to create dir");
        let ext = if i % 2 == 0 { "cpp" } else { "py" };
        fs::write(dir.join(format!("file_{}.{}", i, ext)), "x\n").expect("Failed to write file");
    }
    fs::create_dir_all(temp.path().join("build")).expect("Failed to create build dir");
    fs::write(temp.path().join("build/gen.cpp"), "x\n").expect("Failed to write file");
    temp
}

fn bench_tree_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_walk");
    let query = ChangeQuery::new([".h", ".cpp", ".hpp", ".cc", ".py"]);
    let excluded = vec!["build".to_string(), ".git".to_string()];

    for size in [50, 500] {
        let temp = create_tree(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("walk", size), &temp, |b, temp| {
            b.iter(|| walk_files(black_box(temp.path()), &query, &excluded));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_status_parsing,
    bench_header_detection,
    bench_tree_walk
);
criterion_main!(benches);
