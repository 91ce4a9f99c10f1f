// Copyright 2025 the Voxelpart Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`Row`] value type: a half-open integer box labeled with a material,
//! plus the geometry predicates (`touches`/`fusible`) the merge index and
//! merge algorithm are built on.
//!
//! A `Row` is pure data. All mutation of a *live* row (registering it with
//! the spatial/merge indices, moving it during a swap-remove) happens in
//! `voxelpart_store`; this crate only knows how to construct, clip, and
//! compare boxes.

#![forbid(unsafe_code)]

use voxelpart_materials::MaterialIndex;

/// An integer point in world space. `x`/`y` fit 20 bits, `z` fits 16, per
/// the `[0, 2^20) x [0, 2^20) x [0, 2^16)` world box this crate targets, but
/// nothing here enforces that width beyond [`World::clamp`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point3 {
    /// X coordinate.
    pub x: u32,
    /// Y coordinate.
    pub y: u32,
    /// Z coordinate.
    pub z: u32,
}

impl Point3 {
    /// Builds a point from components.
    #[must_use]
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    fn componentwise_min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    fn componentwise_max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }
}

/// The fixed outer extent rows may not exceed: `[0,xmax) x [0,ymax) x [0,zmax)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct World {
    /// Exclusive upper bound on X, a power of two, `<= 2^20`.
    pub xmax: u32,
    /// Exclusive upper bound on Y, a power of two, `<= 2^20`.
    pub ymax: u32,
    /// Exclusive upper bound on Z, a power of two, `<= 2^16`.
    pub zmax: u32,
}

impl World {
    /// Builds a world extent. Does not itself validate the power-of-two or
    /// bit-width constraints; `voxelpart_engine` validates those at
    /// construction, since only it knows whether they matter for a given
    /// deployment.
    #[must_use]
    pub const fn new(xmax: u32, ymax: u32, zmax: u32) -> Self {
        Self { xmax, ymax, zmax }
    }

    /// The whole-world box, `[0,0,0)` to `(xmax,ymax,zmax)`.
    #[must_use]
    pub const fn whole(self) -> (Point3, Point3) {
        (Point3::new(0, 0, 0), Point3::new(self.xmax, self.ymax, self.zmax))
    }

    /// Whether `p` lies within `[0,xmax) x [0,ymax) x [0,zmax)`.
    #[must_use]
    pub const fn contains_point(self, p: Point3) -> bool {
        p.x < self.xmax && p.y < self.ymax && p.z < self.zmax
    }

    /// Clamps `p0..p1` into the world box componentwise.
    #[must_use]
    pub fn clip(self, p0: Point3, p1: Point3) -> (Point3, Point3) {
        let lo = Point3::new(p0.x.min(self.xmax), p0.y.min(self.ymax), p0.z.min(self.zmax));
        let hi = Point3::new(p1.x.min(self.xmax), p1.y.min(self.ymax), p1.z.min(self.zmax));
        (lo, hi)
    }

    /// Total world volume as a widened accumulator, safe even at the
    /// `2^20 x 2^20 x 2^16` ceiling (`2^56`, well short of `u64::MAX`, but
    /// widened here for the same reason row and batch volumes are: so a
    /// caller adding several such totals never has to reason about the
    /// intermediate width).
    #[must_use]
    pub fn volume(self) -> u128 {
        u128::from(self.xmax) * u128::from(self.ymax) * u128::from(self.zmax)
    }
}

bitflags::bitflags! {
    /// Per-row flag bits. `solid`/`destructible`/`visible` are derived from
    /// the row's material at construction time (mirroring the originating
    /// prototype's `ENCODE`, which folds `Material` predicates into the
    /// stored word); `dirty`/`alive` are store-managed lifecycle bits.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct RowFlags: u8 {
        /// Set by the store when a row's content has changed since last read
        /// by an external observer that tracks dirtiness; cleared by that
        /// observer. The partition engine itself never reads this bit.
        const DIRTY        = 0b0000_0001;
        /// Set for as long as the row is live in the store. Cleared only as
        /// part of removal, between unregistering from the indices and the
        /// swap-remove completing; never observable as false on a row
        /// reachable through the public API.
        const ALIVE        = 0b0000_0010;
        /// Derived from the material: blocks movement.
        const SOLID        = 0b0000_0100;
        /// Derived from the material: can be carved away by ordinary splits.
        const DESTRUCTIBLE = 0b0000_1000;
        /// Derived from the material: participates in rendering.
        const VISIBLE      = 0b0001_0000;
    }
}

/// A stable, generational identity for a row, independent of its mutable
/// `(material_index, row_index)` store position. A `(material_index,
/// row_index)` pair is only valid until the next store mutation that might
/// swap-remove through it; a `RowId` stays valid (and distinguishable from a
/// later row reusing the same slot) for as long as the store lives,
/// following the generational `Key`/`NodeId` pattern used elsewhere in this
/// workspace for exactly this problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RowId {
    slot: u32,
    generation: u32,
}

impl RowId {
    /// Builds a row id from a slot and generation. Constructed by
    /// `voxelpart_store`; callers should treat the fields as opaque.
    #[must_use]
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// The slot component, for use as a dense array index by the store that
    /// minted this id.
    #[must_use]
    pub const fn slot(self) -> usize {
        self.slot as usize
    }

    /// The generation component.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// One box in the partition: a half-open extent, a material, a stable id,
/// and the current `(material_index, row_index)` store position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Row {
    /// Inclusive lower corner.
    pub p0: Point3,
    /// Exclusive upper corner.
    pub p1: Point3,
    /// Stable generational identity, independent of store position.
    pub id: RowId,
    /// Material this row is made of.
    pub material: MaterialIndex,
    /// Current position within its material's store array. Mutated by the
    /// store on swap-remove; never mutated by anything else.
    pub row_index: u32,
    /// Flag bits (see [`RowFlags`]).
    pub flags: RowFlags,
}

impl Row {
    /// Builds a new row, sorting and clipping `p0`/`p1` into `world` and
    /// deriving `SOLID`/`DESTRUCTIBLE`/`VISIBLE` from `material`'s kind.
    /// Returns `None` if the resulting extent is empty on any axis (mirrors
    /// the originating prototype's `ROW.new`, which rejects non-positive
    /// sizes after clipping).
    #[must_use]
    pub fn new(
        p0: Point3,
        p1: Point3,
        material: voxelpart_materials::Material,
        id: RowId,
        row_index: u32,
        world: World,
    ) -> Option<Self> {
        let lo = p0.componentwise_min(p1);
        let hi = p0.componentwise_max(p1);
        let (lo, hi) = world.clip(lo, hi);
        if lo.x >= hi.x || lo.y >= hi.y || lo.z >= hi.z {
            return None;
        }
        let mut flags = RowFlags::ALIVE;
        if material.is_solid() {
            flags |= RowFlags::SOLID;
        }
        if material.is_destructible() {
            flags |= RowFlags::DESTRUCTIBLE;
        }
        if !material.is_invisible() {
            flags |= RowFlags::VISIBLE;
        }
        Some(Self { p0: lo, p1: hi, id, material: material.index, row_index, flags })
    }

    /// Width along X.
    #[must_use]
    pub const fn dx(&self) -> u32 {
        self.p1.x - self.p0.x
    }

    /// Width along Y.
    #[must_use]
    pub const fn dy(&self) -> u32 {
        self.p1.y - self.p0.y
    }

    /// Width along Z.
    #[must_use]
    pub const fn dz(&self) -> u32 {
        self.p1.z - self.p0.z
    }

    /// Volume, widened to `u64` so the product of three sub-`2^20` deltas
    /// never wraps before a caller gets to sum several rows together.
    #[must_use]
    pub fn volume(&self) -> u64 {
        u64::from(self.dx()) * u64::from(self.dy()) * u64::from(self.dz())
    }

    /// Half-open containment test.
    #[must_use]
    pub const fn contains_point(&self, p: Point3) -> bool {
        p.x >= self.p0.x
            && p.x < self.p1.x
            && p.y >= self.p0.y
            && p.y < self.p1.y
            && p.z >= self.p0.z
            && p.z < self.p1.z
    }

    /// Whether `self` and `other` overlap (non-empty intersection) as axis-
    /// aligned boxes, ignoring material.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.p0.x < other.p1.x
            && other.p0.x < self.p1.x
            && self.p0.y < other.p1.y
            && other.p0.y < self.p1.y
            && self.p0.z < other.p1.z
            && other.p0.z < self.p1.z
    }

    /// The axis-aligned union, the smallest box containing both `self` and
    /// `other`. Only meaningful to treat as a *row* when the two are
    /// [`fusible`][Self::fusible].
    #[must_use]
    pub fn union_box(&self, other: &Self) -> (Point3, Point3) {
        (self.p0.componentwise_min(other.p0), self.p1.componentwise_max(other.p1))
    }

    /// Whether `self` and `other` can fuse into a single valid box: same
    /// material, exactly one axis where they touch at a shared plane, and
    /// the other two axes with *identical* extents.
    ///
    /// This is stricter than "bounding boxes touch": if the orthogonal
    /// extents merely overlap without being equal, the union is not itself
    /// an axis-aligned box, so fusing would either lose volume or create an
    /// overlap. The six-way face-descriptor keys in `voxelpart_fhx` encode
    /// this exact condition (orthogonal spans are part of the key), so any
    /// hit surfaced by that index already satisfies it up to the material
    /// check repeated here.
    #[must_use]
    pub fn fusible(&self, other: &Self) -> bool {
        if self.material != other.material {
            return false;
        }
        let x = classify_axis((self.p0.x, self.p1.x), (other.p0.x, other.p1.x));
        let y = classify_axis((self.p0.y, self.p1.y), (other.p0.y, other.p1.y));
        let z = classify_axis((self.p0.z, self.p1.z), (other.p0.z, other.p1.z));
        let touches = [x, y, z].iter().filter(|r| **r == AxisRelation::Touch).count();
        let equal = [x, y, z].iter().filter(|r| **r == AxisRelation::Equal).count();
        touches == 1 && equal == 2
    }
}

/// The relation between two 1D intervals along one axis, as used by
/// [`Row::fusible`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AxisRelation {
    /// The intervals are identical.
    Equal,
    /// The intervals are disjoint but share exactly one boundary plane
    /// (`a.1 == b.0` or `b.1 == a.0`).
    Touch,
    /// Neither equal nor touching: separated, or overlapping without being
    /// equal.
    Other,
}

/// Classifies two half-open 1D intervals `(lo,hi)` for [`Row::fusible`].
#[must_use]
pub fn classify_axis(a: (u32, u32), b: (u32, u32)) -> AxisRelation {
    if a == b {
        AxisRelation::Equal
    } else if a.1 == b.0 || b.1 == a.0 {
        AxisRelation::Touch
    } else {
        AxisRelation::Other
    }
}
