// Copyright 2025 the Voxelpart Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use voxelpart_fhx::{Axis, Fhx};
use voxelpart_materials::{Catalog, Material, MaterialIndex};
use voxelpart_row::{Point3, Row, RowId, World};

const MATERIAL: MaterialIndex = MaterialIndex::from_raw(0);

fn grid_rows(n: u32, cell: u32) -> Vec<Row> {
    let catalog = Catalog::builtin();
    let material: Material = catalog.material(MATERIAL).expect("builtin material 0");
    let world = World::new(1 << 20, 1 << 20, 1 << 16);
    let mut out = Vec::with_capacity((n * n) as usize);
    let mut slot = 0u32;
    for gx in 0..n {
        for gy in 0..n {
            let p0 = Point3::new(gx * cell, gy * cell, 0);
            let p1 = Point3::new(gx * cell + cell, gy * cell + cell, cell);
            let row = Row::new(p0, p1, material, RowId::new(slot, 0), slot, world)
                .expect("non-empty grid cell");
            out.push(row);
            slot += 1;
        }
    }
    out
}

fn bench_register(c: &mut Criterion) {
    let mut group = c.benchmark_group("fhx_register");
    for &n in &[32u32, 64, 128] {
        let rows = grid_rows(n, 8);
        group.throughput(Throughput::Elements(rows.len() as u64));
        group.bench_function(format!("grid_{n}x{n}"), |b| {
            b.iter_batched(
                Fhx::new,
                |mut fhx| {
                    for (i, row) in rows.iter().enumerate() {
                        fhx.register(black_box((MATERIAL, i as u32)), row);
                    }
                    fhx
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_neighbor(c: &mut Criterion) {
    let mut group = c.benchmark_group("fhx_neighbor");
    for &n in &[32u32, 64, 128] {
        let rows = grid_rows(n, 8);
        let mut fhx = Fhx::new();
        for (i, row) in rows.iter().enumerate() {
            fhx.register((MATERIAL, i as u32), row);
        }
        group.throughput(Throughput::Elements(rows.len() as u64));
        group.bench_function(format!("grid_{n}x{n}"), |b| {
            b.iter(|| {
                for (i, row) in rows.iter().enumerate() {
                    black_box(fhx.neighbor((MATERIAL, i as u32), row, Axis::X));
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_register, bench_neighbor);
criterion_main!(benches);
