// Copyright 2025 the Voxelpart Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use voxelpart_bvh::{Aabb, Bvh};
use voxelpart_materials::MaterialIndex;

const MATERIAL: MaterialIndex = MaterialIndex::from_raw(0);

fn grid_leaves(n: u32, cell: u32) -> Vec<Aabb> {
    let mut out = Vec::with_capacity((n * n) as usize);
    for gx in 0..n {
        for gy in 0..n {
            let x0 = gx * cell;
            let y0 = gy * cell;
            out.push(Aabb::new((x0, y0, 0), (x0 + cell, y0 + cell, cell)));
        }
    }
    out
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("bvh_insert");
    for &n in &[32u32, 64, 128] {
        let leaves = grid_leaves(n, 8);
        group.throughput(Throughput::Elements(leaves.len() as u64));
        group.bench_function(format!("grid_{n}x{n}"), |b| {
            b.iter_batched(
                Bvh::new,
                |mut bvh| {
                    for (i, aabb) in leaves.iter().enumerate() {
                        bvh.insert(black_box(*aabb), MATERIAL, i as u32);
                    }
                    bvh
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_point_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("bvh_point_query");
    for &n in &[32u32, 64, 128] {
        let leaves = grid_leaves(n, 8);
        let mut bvh = Bvh::new();
        for (i, aabb) in leaves.iter().enumerate() {
            bvh.insert(*aabb, MATERIAL, i as u32);
        }
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let span = n * 8;
        let queries: Vec<(u32, u32, u32)> = (0..1024)
            .map(|_| (rng.gen_range(0..span), rng.gen_range(0..span), rng.gen_range(0..8)))
            .collect();
        group.throughput(Throughput::Elements(queries.len() as u64));
        group.bench_function(format!("grid_{n}x{n}"), |b| {
            b.iter(|| {
                for p in &queries {
                    black_box(bvh.point_query(*p));
                }
            });
        });
    }
    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("bvh_remove");
    for &n in &[32u32, 64, 128] {
        let leaves = grid_leaves(n, 8);
        group.bench_function(format!("grid_{n}x{n}"), |b| {
            b.iter_batched(
                || {
                    let mut bvh = Bvh::new();
                    for (i, aabb) in leaves.iter().enumerate() {
                        bvh.insert(*aabb, MATERIAL, i as u32);
                    }
                    bvh
                },
                |mut bvh| {
                    for i in (0..leaves.len() as u32).rev() {
                        black_box(bvh.remove(MATERIAL, i).unwrap());
                    }
                    bvh
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_point_query, bench_remove);
criterion_main!(benches);
