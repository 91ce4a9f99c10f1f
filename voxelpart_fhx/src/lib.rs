// Copyright 2025 the Voxelpart Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The face-hash merge index (FHX): per-axis, per-side hash maps keyed by
//! "face descriptors" that let the merge algorithm find a fusible
//! same-material neighbor in O(1), without scanning the row store.
//!
//! A row contributes six face descriptors, two per axis: its low-side face
//! (keyed by its `p0` coordinate on that axis) goes into the axis's `neg`
//! map, its high-side face (keyed by `p1`) goes into the `pos` map. Looking
//! for a neighbor adjacent on the `+axis` side of a row means computing
//! *that row's own* high-side key and probing the axis's `neg` map — a hit
//! there is, by construction, a row whose low-side face sits exactly at the
//! query row's high-side plane with identical orthogonal spans, the full
//! correctness condition for fusion (see [`voxelpart_row::Row::fusible`]).

#![forbid(unsafe_code)]

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;
use voxelpart_materials::MaterialIndex;
use voxelpart_row::Row;

/// One of the three principal axes a face can lie perpendicular to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// The X axis.
    X,
    /// The Y axis.
    Y,
    /// The Z axis.
    Z,
}

impl Axis {
    /// All three axes, in the fixed order merge passes iterate them.
    pub const ALL: [Self; 3] = [Self::X, Self::Y, Self::Z];

    const fn slot(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// A row's identity as known to this index: its material and current store
/// position. Mirrors the `(m,i)` pairs used throughout the row store and
/// BVH.
pub type RowLoc = (MaterialIndex, u32);

/// `(material, orthogonal-span-1-lo, -hi, orthogonal-span-2-lo, -hi,
/// plane-coordinate)` — see the GLOSSARY entry "Face descriptor".
pub type FaceKey = (MaterialIndex, u32, u32, u32, u32, u32);

/// Errors a [`Fhx`] operation can fail with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FhxError {
    /// No face entries are registered for this row identity.
    #[error("no fhx entries registered for this row identity")]
    UnknownRow,
}

fn faces_for(row: &Row, axis: Axis) -> (FaceKey, FaceKey) {
    let m = row.material;
    match axis {
        Axis::X => (
            (m, row.p0.y, row.p1.y, row.p0.z, row.p1.z, row.p0.x),
            (m, row.p0.y, row.p1.y, row.p0.z, row.p1.z, row.p1.x),
        ),
        Axis::Y => (
            (m, row.p0.x, row.p1.x, row.p0.z, row.p1.z, row.p0.y),
            (m, row.p0.x, row.p1.x, row.p0.z, row.p1.z, row.p1.y),
        ),
        Axis::Z => (
            (m, row.p0.x, row.p1.x, row.p0.y, row.p1.y, row.p0.z),
            (m, row.p0.x, row.p1.x, row.p0.y, row.p1.y, row.p1.z),
        ),
    }
}

/// The registered six-tuple of face keys for one row, in `[neg_x, pos_x,
/// neg_y, pos_y, neg_z, pos_z]` order — a side table entry kept so
/// unregistration never needs a live `Row` to recompute keys from.
type SixFaces = [FaceKey; 6];

/// The face-hash merge index.
#[derive(Debug, Default)]
pub struct Fhx {
    neg: [HashMap<FaceKey, HashSet<RowLoc>>; 3],
    pos: [HashMap<FaceKey, HashSet<RowLoc>>; 3],
    registered: HashMap<RowLoc, SixFaces>,
}

impl Fhx {
    /// Builds an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registered.len()
    }

    /// Whether no rows are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    /// Registers `row`'s six face descriptors under its current
    /// `(material, row_index)` identity. Overwrites any previous
    /// registration for that identity (callers should `unregister` a
    /// vacated identity before a later row reuses it, but this keeps the
    /// index itself total rather than silently leaking stale entries).
    pub fn register(&mut self, loc: RowLoc, row: &Row) {
        let mut faces = [(loc.0, 0, 0, 0, 0, 0); 6];
        for axis in Axis::ALL {
            let (neg_key, pos_key) = faces_for(row, axis);
            self.neg[axis.slot()].entry(neg_key).or_default().insert(loc);
            self.pos[axis.slot()].entry(pos_key).or_default().insert(loc);
            faces[axis.slot() * 2] = neg_key;
            faces[axis.slot() * 2 + 1] = pos_key;
        }
        self.registered.insert(loc, faces);
        log::trace!("fhx: registered {loc:?}");
    }

    /// Removes all six of `loc`'s face entries, dropping any bucket that
    /// becomes empty so the maps stay compact.
    pub fn unregister(&mut self, loc: RowLoc) -> Result<(), FhxError> {
        let faces = self.registered.remove(&loc).ok_or(FhxError::UnknownRow)?;
        for axis in Axis::ALL {
            let neg_key = faces[axis.slot() * 2];
            let pos_key = faces[axis.slot() * 2 + 1];
            remove_and_compact(&mut self.neg[axis.slot()], &neg_key, loc);
            remove_and_compact(&mut self.pos[axis.slot()], &pos_key, loc);
        }
        log::trace!("fhx: unregistered {loc:?}");
        Ok(())
    }

    /// Looks for a same-material, fusible neighbor of `row` (whose identity
    /// is `loc`) along `axis`. Probes the `+axis` side first (this row's
    /// high face against the `neg` map), then the `-axis` side.
    #[must_use]
    pub fn neighbor(&self, loc: RowLoc, row: &Row, axis: Axis) -> Option<RowLoc> {
        let (neg_key, pos_key) = faces_for(row, axis);
        if let Some(found) = first_other(self.neg[axis.slot()].get(&pos_key), loc) {
            return Some(found);
        }
        first_other(self.pos[axis.slot()].get(&neg_key), loc)
    }
}

fn remove_and_compact(map: &mut HashMap<FaceKey, HashSet<RowLoc>>, key: &FaceKey, loc: RowLoc) {
    if let Some(set) = map.get_mut(key) {
        set.remove(&loc);
        if set.is_empty() {
            map.remove(key);
        }
    }
}

fn first_other(set: Option<&HashSet<RowLoc>>, exclude: RowLoc) -> Option<RowLoc> {
    set?.iter().find(|&&loc| loc != exclude).copied()
}

/// Collects every neighbor candidate across all three axes, most useful for
/// diagnostics and tests; the merge algorithm itself only ever needs one
/// axis at a time via [`Fhx::neighbor`].
#[must_use]
pub fn neighbors_all_axes(fhx: &Fhx, loc: RowLoc, row: &Row) -> SmallVec<[(Axis, RowLoc); 3]> {
    let mut out = SmallVec::new();
    for axis in Axis::ALL {
        if let Some(n) = fhx.neighbor(loc, row, axis) {
            out.push((axis, n));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxelpart_materials::Catalog;
    use voxelpart_row::{Point3, RowId, World};

    fn row(p0: (u32, u32, u32), p1: (u32, u32, u32), row_index: u32) -> Row {
        let catalog = Catalog::builtin();
        let stone = catalog.material_by_name("STONE").unwrap();
        let world = World::new(1 << 20, 1 << 20, 1 << 16);
        Row::new(
            Point3::new(p0.0, p0.1, p0.2),
            Point3::new(p1.0, p1.1, p1.2),
            stone,
            RowId::new(row_index, 0),
            row_index,
            world,
        )
        .unwrap()
    }

    #[test]
    fn adjacent_rows_find_each_other_on_shared_axis() {
        let mut fhx = Fhx::new();
        let a = row((0, 0, 0), (10, 10, 10), 0);
        let b = row((10, 0, 0), (20, 10, 10), 1);
        fhx.register((a.material, 0), &a);
        fhx.register((b.material, 1), &b);

        assert_eq!(fhx.neighbor((a.material, 0), &a, Axis::X), Some((b.material, 1)));
        assert_eq!(fhx.neighbor((b.material, 1), &b, Axis::X), Some((a.material, 0)));
        assert_eq!(fhx.neighbor((a.material, 0), &a, Axis::Y), None);
    }

    #[test]
    fn mismatched_cross_section_does_not_register_as_neighbor() {
        let mut fhx = Fhx::new();
        let a = row((0, 0, 0), (10, 10, 10), 0);
        let b = row((10, 0, 0), (20, 5, 10), 1);
        fhx.register((a.material, 0), &a);
        fhx.register((b.material, 1), &b);
        assert_eq!(fhx.neighbor((a.material, 0), &a, Axis::X), None);
    }

    #[test]
    fn unregister_drops_empty_buckets() {
        let mut fhx = Fhx::new();
        let a = row((0, 0, 0), (10, 10, 10), 0);
        fhx.register((a.material, 0), &a);
        assert!(!fhx.neg[Axis::X.slot()].is_empty());
        fhx.unregister((a.material, 0)).unwrap();
        assert!(fhx.neg[Axis::X.slot()].is_empty());
        assert!(fhx.pos[Axis::X.slot()].is_empty());
        assert!(fhx.is_empty());
    }

    #[test]
    fn unregister_unknown_row_errors() {
        let mut fhx = Fhx::new();
        assert!(matches!(
            fhx.unregister((MaterialIndex::from_raw(0), 0)),
            Err(FhxError::UnknownRow)
        ));
    }

    #[test]
    fn three_rows_sharing_a_plane_all_see_each_other_except_self() {
        let mut fhx = Fhx::new();
        let a = row((0, 0, 0), (10, 5, 5), 0);
        let b = row((10, 0, 0), (20, 5, 5), 1);
        fhx.register((a.material, 0), &a);
        fhx.register((b.material, 1), &b);
        let found = fhx.neighbor((a.material, 0), &a, Axis::X).unwrap();
        assert_ne!(found, (a.material, 0));
        assert_eq!(found, (b.material, 1));
    }
}
