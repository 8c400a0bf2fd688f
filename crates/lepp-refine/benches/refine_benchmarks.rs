//! Benchmarks for refinement phases.
//!
//! Run with: cargo bench -p lepp-refine
//!
//! To compare against baseline:
//! 1. First run: cargo bench -p lepp-refine -- --save-baseline main
//! 2. After changes: cargo bench -p lepp-refine -- --baseline main

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use lepp_refine::{
    DataParallelEngine, RefineParams, RefinementEngine, SequentialEngine, Topology, Vertex,
};

// =============================================================================
// Test Mesh Generation
// =============================================================================

/// Grid of `n` by `n` cells stretched along x, with a deterministic wobble so
/// edge lengths are not all equal.
fn create_grid(n: u32, stretch: f64) -> Topology {
    let mut vertices = Vec::new();
    for j in 0..=n {
        for i in 0..=n {
            let wobble = ((i * 7 + j * 13) % 11) as f64 / 11.0 * 0.3 - 0.15;
            vertices.push(Vertex::from_coords(
                (i as f64 + wobble) * stretch,
                j as f64 - wobble,
                0.0,
            ));
        }
    }
    let idx = |i: u32, j: u32| j * (n + 1) + i;
    let mut faces = Vec::with_capacity((2 * n * n) as usize);
    for j in 0..n {
        for i in 0..n {
            let (a, b, c, d) = (idx(i, j), idx(i + 1, j), idx(i + 1, j + 1), idx(i, j + 1));
            faces.push([a, b, c]);
            faces.push([a, c, d]);
        }
    }
    Topology::from_indexed(vertices, &faces).expect("grid is a valid triangulation")
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_detect_bad(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_bad");
    for n in [32u32, 128] {
        let topo = create_grid(n, 4.0);
        group.throughput(Throughput::Elements(topo.triangle_count() as u64));

        group.bench_with_input(BenchmarkId::new("sequential", n), &topo, |b, topo| {
            let mut topo = topo.clone();
            let mut engine = SequentialEngine::new();
            b.iter(|| engine.detect_bad(black_box(30.0), &mut topo).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("rayon", n), &topo, |b, topo| {
            let mut topo = topo.clone();
            let mut engine = DataParallelEngine::rayon();
            b.iter(|| engine.detect_bad(black_box(30.0), &mut topo).unwrap())
        });
    }
    group.finish();
}

fn bench_detect_terminal(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_terminal");
    for n in [32u32, 128] {
        let mut topo = create_grid(n, 4.0);
        SequentialEngine::new().detect_bad(30.0, &mut topo).unwrap();
        group.throughput(Throughput::Elements(topo.bad_count() as u64));

        group.bench_with_input(BenchmarkId::new("sequential", n), &topo, |b, topo| {
            let mut topo = topo.clone();
            let mut engine = SequentialEngine::new();
            b.iter(|| engine.detect_terminal(&mut topo).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("rayon", n), &topo, |b, topo| {
            let mut topo = topo.clone();
            let mut engine = DataParallelEngine::rayon();
            b.iter(|| engine.detect_terminal(&mut topo).unwrap())
        });
    }
    group.finish();
}

fn bench_improve(c: &mut Criterion) {
    let mut group = c.benchmark_group("improve");
    group.sample_size(20);
    let params = RefineParams::with_angle(25.0).with_max_iterations(16);

    for n in [16u32, 48] {
        let topo = create_grid(n, 6.0);
        group.bench_with_input(BenchmarkId::new("sequential", n), &topo, |b, topo| {
            b.iter(|| {
                let mut topo = topo.clone();
                let mut engine = SequentialEngine::new();
                engine.detect_bad(25.0, &mut topo).unwrap();
                black_box(engine.improve(&mut topo, &params).unwrap())
            })
        });
        group.bench_with_input(BenchmarkId::new("rayon", n), &topo, |b, topo| {
            b.iter(|| {
                let mut topo = topo.clone();
                let mut engine = DataParallelEngine::rayon();
                engine.detect_bad(25.0, &mut topo).unwrap();
                black_box(engine.improve(&mut topo, &params).unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_detect_bad, bench_detect_terminal, bench_improve);
criterion_main!(benches);
