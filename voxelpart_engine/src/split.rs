// Copyright 2025 the Voxelpart Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `split`: carving a sub-box to a new material.
//!
//! A carve touches at most one row per "cell" of work: the owning row under
//! `p_lo` is cut into a 3x3x3 lattice around the carved box's intersection
//! with it, then the remainder of the carved box — the part that falls
//! outside that one row — is processed by further work items. The recursion
//! shape described in the design is expressed here as an explicit LIFO work
//! stack rather than literal function recursion, so a carve spanning
//! thousands of rows cannot blow the call stack; popping the stack in `+x`,
//! `+y`, `+z` order reproduces the same axis-priority decomposition.

use smallvec::SmallVec;

use crate::{Engine, EngineError, Material, Point3, Row};

impl Engine {
    /// Carves `[p_lo, p_hi)` out of the current partition and reassigns
    /// every point in it to `material`, returning the rows present after
    /// the merge pass that immediately follows the carve.
    ///
    /// `p_lo`/`p_hi` are sorted componentwise and clipped to the world
    /// before carving; an empty box (after clipping) returns an empty
    /// batch rather than an error, mirroring the degenerate single-point
    /// carve `split(p, p+1, m)`.
    ///
    /// # Errors
    /// [`EngineError::UnknownMaterial`] if `material` is not in the
    /// catalog. Internal inconsistency between the store and the BVH/FHX
    /// indices is reported as [`EngineError::PartitionViolated`] rather than
    /// silently producing a wrong partition.
    pub fn split(
        &mut self,
        p_lo: Point3,
        p_hi: Point3,
        material: &str,
    ) -> Result<Vec<Row>, EngineError> {
        let material = self.resolve_material(material)?;
        let lo = Point3::new(p_lo.x.min(p_hi.x), p_lo.y.min(p_hi.y), p_lo.z.min(p_hi.z));
        let hi = Point3::new(p_lo.x.max(p_hi.x), p_lo.y.max(p_hi.y), p_lo.z.max(p_hi.z));
        let world = self.world();
        let (lo, hi) = world.clip(lo, hi);
        if lo.x >= hi.x || lo.y >= hi.y || lo.z >= hi.z {
            log::debug!("engine: split of empty box is a no-op");
            return Ok(Vec::new());
        }
        log::debug!("engine: split {lo:?}..{hi:?} material={:?}", material.index);
        let created = self.carve_region(lo, hi, material)?;
        self.merge(Some(&created))
    }

    fn carve_region(
        &mut self,
        p_lo: Point3,
        p_hi: Point3,
        material: Material,
    ) -> Result<Vec<Row>, EngineError> {
        let mut created = Vec::new();
        let mut stack: Vec<(Point3, Point3)> = vec![(p_lo, p_hi)];
        while let Some((lo, hi)) = stack.pop() {
            if lo.x >= hi.x || lo.y >= hi.y || lo.z >= hi.z {
                continue;
            }
            let loc = self.bvh_point_query(lo).ok_or_else(|| {
                EngineError::partition_violated("split: point query missed an in-world point")
            })?;
            let row = *self.store().get(loc.0, loc.1).ok_or_else(|| {
                EngineError::partition_violated("split: bvh leaf without a store row")
            })?;
            let q_hi = Point3::new(
                hi.x.min(row.p1.x),
                hi.y.min(row.p1.y),
                hi.z.min(row.p1.z),
            );
            created.extend(self.carve_single_row(row, lo, q_hi, material)?);

            // Axis-priority remainder decomposition: pushed z, y, x so the
            // stack (LIFO) pops x first, then y, then z.
            if hi.z > q_hi.z {
                stack.push((
                    Point3::new(lo.x, lo.y, q_hi.z),
                    Point3::new(q_hi.x, q_hi.y, hi.z),
                ));
            }
            if hi.y > q_hi.y {
                stack.push((
                    Point3::new(lo.x, q_hi.y, lo.z),
                    Point3::new(q_hi.x, hi.y, hi.z),
                ));
            }
            if hi.x > q_hi.x {
                stack.push((Point3::new(q_hi.x, lo.y, lo.z), hi));
            }
        }
        Ok(created)
    }

    /// Replaces `row` with up to 27 sub-boxes formed by a 3-way cut on each
    /// axis at `q_lo`/`q_hi` (clamped to lie within `row`'s own extent):
    /// the cell that matches `[q_lo, q_hi)` on every axis becomes
    /// `material`, every other non-empty cell keeps `row`'s original
    /// material.
    fn carve_single_row(
        &mut self,
        row: Row,
        q_lo: Point3,
        q_hi: Point3,
        material: Material,
    ) -> Result<Vec<Row>, EngineError> {
        let original =
            self.catalog_ref().material(row.material).ok_or_else(|| {
                EngineError::partition_violated("split: row material not in catalog")
            })?;
        let xs = axis_segments(row.p0.x, row.p1.x, q_lo.x, q_hi.x);
        let ys = axis_segments(row.p0.y, row.p1.y, q_lo.y, q_hi.y);
        let zs = axis_segments(row.p0.z, row.p1.z, q_lo.z, q_hi.z);

        self.remove_internal(row.material, row.row_index)?;

        let mut created = Vec::with_capacity(xs.len() * ys.len() * zs.len());
        for &(x0, x1, x_center) in &xs {
            for &(y0, y1, y_center) in &ys {
                for &(z0, z1, z_center) in &zs {
                    let cell_material =
                        if x_center && y_center && z_center { material } else { original };
                    let cell = self.insert_internal(
                        Point3::new(x0, y0, z0),
                        Point3::new(x1, y1, z1),
                        cell_material,
                    )?;
                    created.push(cell);
                }
            }
        }
        Ok(created)
    }

    fn bvh_point_query(&self, p: Point3) -> Option<(crate::MaterialIndex, u32)> {
        self.bvh.point_query((p.x, p.y, p.z))
    }
}

/// The up-to-three segments a `[lo,hi)` interval splits into when cut at
/// `qlo`/`qhi` (already clamped so `lo <= qlo < qhi <= hi`): the bool marks
/// whether a segment is the "center" cell (`[qlo,qhi)` itself).
fn axis_segments(lo: u32, hi: u32, qlo: u32, qhi: u32) -> SmallVec<[(u32, u32, bool); 3]> {
    let mut segments = SmallVec::new();
    if lo < qlo {
        segments.push((lo, qlo, false));
    }
    segments.push((qlo, qhi, true));
    if qhi < hi {
        segments.push((qhi, hi, false));
    }
    segments
}

#[cfg(test)]
mod tests {
    use crate::{Engine, EngineConfig, Point3};

    #[test]
    fn point_carve_preserves_total_volume() {
        let mut engine = Engine::new(EngineConfig::new(1024, 1024, 1024, "STONE")).unwrap();
        engine.split(Point3::new(10, 10, 10), Point3::new(11, 11, 11), "AIR").unwrap();
        assert_eq!(engine.volume(None).unwrap(), 1024u128.pow(3));
        assert_eq!(engine.volume(Some("AIR")).unwrap(), 1);
        assert_eq!(engine.search(Point3::new(10, 10, 10)).unwrap().0, "AIR");
        assert_eq!(engine.search(Point3::new(9, 10, 10)).unwrap().0, "STONE");
    }

    #[test]
    fn box_carve_fully_inside_matches_expected_volume() {
        let mut engine =
            Engine::new(EngineConfig::new(1 << 20, 1 << 20, 1 << 16, "STONE")).unwrap();
        engine
            .split(Point3::new(100, 100, 100), Point3::new(200, 150, 130), "AIR")
            .unwrap();
        assert_eq!(engine.volume(Some("AIR")).unwrap(), 100 * 50 * 30);
        assert_eq!(engine.volume(None).unwrap(), engine.world().volume());
        assert_eq!(engine.nrows("AIR").unwrap(), 1);
    }

    #[test]
    fn spanning_carve_across_a_grid_matches_expected_volume() {
        let mut engine =
            Engine::new(EngineConfig::new(1 << 16, 1 << 16, 1 << 16, "AIR")).unwrap();
        for gx in 0..20u32 {
            for gy in 0..20u32 {
                for gz in 0..8u32 {
                    engine
                        .split(
                            Point3::new(gx * 64, gy * 64, gz * 64),
                            Point3::new(gx * 64 + 64, gy * 64 + 64, gz * 64 + 64),
                            "STONE",
                        )
                        .unwrap();
                }
            }
        }
        engine.merge(None).unwrap();
        engine
            .split(Point3::new(13, 13, 13), Point3::new(200, 140, 70), "AIR")
            .unwrap();
        let expected = u128::from(200u32 - 13) * u128::from(140u32 - 13) * u128::from(70u32 - 13);
        assert_eq!(engine.volume(Some("AIR")).unwrap(), expected);
        for x in (13..200).step_by(17) {
            for y in (13..140).step_by(23) {
                for z in (13..70).step_by(11) {
                    let (name, _, _) = engine.search(Point3::new(x, y, z)).unwrap();
                    assert_eq!(name, "AIR");
                }
            }
        }
    }

    #[test]
    fn split_idempotent_on_same_material_leaves_volume_unchanged() {
        let mut engine = Engine::new(EngineConfig::new(1024, 1024, 1024, "STONE")).unwrap();
        let before = engine.stats();
        engine.split(Point3::new(100, 100, 100), Point3::new(200, 200, 200), "STONE").unwrap();
        let after = engine.stats();
        assert_eq!(before.total_volume, after.total_volume);
        assert_eq!(before.total_rows, after.total_rows);
    }
}
