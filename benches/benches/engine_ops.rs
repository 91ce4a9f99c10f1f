// Copyright 2025 the Voxelpart Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use voxelpart_engine::{Engine, EngineConfig, Point3};

fn grid_engine(n: u32, cell: u32) -> Engine {
    let span = (n * cell).next_power_of_two();
    let mut engine = Engine::new(EngineConfig::new(span, span, span, "AIR")).unwrap();
    for gx in 0..n {
        for gy in 0..n {
            for gz in 0..n {
                engine
                    .split(
                        Point3::new(gx * cell, gy * cell, gz * cell),
                        Point3::new(gx * cell + cell, gy * cell + cell, gz * cell + cell),
                        "STONE",
                    )
                    .unwrap();
            }
        }
    }
    engine
}

fn bench_point_carve(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_point_carve");
    for &n in &[8u32, 16] {
        group.bench_function(format!("grid_{n}x{n}x{n}"), |b| {
            b.iter_batched(
                || grid_engine(n, 8),
                |mut engine| {
                    black_box(engine.split(Point3::new(1, 1, 1), Point3::new(2, 2, 2), "AIR").unwrap());
                    engine
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_search");
    for &n in &[8u32, 16] {
        let engine = grid_engine(n, 8);
        let span = (n * 8).next_power_of_two();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let queries: Vec<Point3> = (0..1024)
            .map(|_| {
                Point3::new(
                    rng.gen_range(0..span),
                    rng.gen_range(0..span),
                    rng.gen_range(0..span),
                )
            })
            .collect();
        group.bench_function(format!("grid_{n}x{n}x{n}"), |b| {
            b.iter(|| {
                for p in &queries {
                    black_box(engine.search(*p).ok());
                }
            });
        });
    }
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_merge");
    for &n in &[8u32, 16] {
        group.bench_function(format!("grid_{n}x{n}x{n}"), |b| {
            b.iter_batched(
                || grid_engine(n, 8),
                |mut engine| black_box(engine.merge(None).unwrap()),
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_point_carve, bench_search, bench_merge);
criterion_main!(benches);
