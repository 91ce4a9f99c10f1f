// Copyright 2025 the Voxelpart Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The authoritative row store: one contiguous array per material, insert by
//! append, remove by swap-with-last. This crate owns the only copy of every
//! [`Row`]'s data; the BVH and FHX indices hold nothing but derived geometry
//! and `(material_index, row_index)` identities that this store is
//! responsible for keeping valid.
//!
//! The store does not itself talk to the BVH or FHX index — that
//! choreography (unregister before move, re-register after) lives in
//! `voxelpart_engine`, which reads a row's pre-move identity via
//! [`RowStore::get`]/[`RowStore::last_index`] before calling
//! [`RowStore::remove_at`].

#![forbid(unsafe_code)]

use voxelpart_materials::{Catalog, Material, MaterialIndex};
use voxelpart_row::{Point3, Row, RowId, World};

/// Errors a [`RowStore`] operation can fail with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// `p0` is not strictly less than `p1` on some axis, or the box is
    /// empty after clipping to the world extent.
    #[error("invalid box: p0 must be strictly less than p1 on every axis")]
    InvalidBox,
    /// `(material, row_index)` does not currently hold a live row.
    #[error("no live row at material index {material:?}, row index {row_index}")]
    UnknownRow {
        /// The material index queried.
        material: MaterialIndex,
        /// The row index queried.
        row_index: u32,
    },
    /// A `RowId` handle is stale: either never issued, or its generation no
    /// longer matches (the slot has been reused by a later insert).
    #[error("row id is stale or unknown")]
    UnknownRowId,
}

/// What happened as a result of [`RowStore::remove_at`]: the row that was
/// removed, and — if the removed row was not already the last in its
/// material's array — the row that got swapped into its place, now carrying
/// the vacated `row_index`.
#[derive(Clone, Copy, Debug)]
pub struct RemoveOutcome {
    /// The row that was removed, as it was immediately before removal.
    pub removed: Row,
    /// The row moved into the removed row's slot, with its `row_index`
    /// already updated to the new position. `None` if no row needed to
    /// move (the removed row was the last one).
    pub moved: Option<Row>,
}

#[derive(Clone, Copy, Debug)]
struct SlotMeta {
    generation: u32,
    location: Option<(MaterialIndex, u32)>,
}

/// The per-material structure-of-arrays row store.
#[derive(Debug)]
pub struct RowStore {
    world: World,
    arrays: Vec<Vec<Row>>,
    capacity_hint: usize,
    slots: Vec<SlotMeta>,
    free_slots: Vec<u32>,
}

impl RowStore {
    /// Builds an empty store for `catalog.len()` materials, each array
    /// pre-reserved to `capacity_hint`.
    #[must_use]
    pub fn new(catalog: &Catalog, world: World, capacity_hint: usize) -> Self {
        let arrays = (0..catalog.len()).map(|_| Vec::with_capacity(capacity_hint)).collect();
        Self { world, arrays, capacity_hint, slots: Vec::new(), free_slots: Vec::new() }
    }

    /// Reserves additional capacity in one material's array ahead of a
    /// known-large insert batch.
    pub fn reserve(&mut self, material: MaterialIndex, additional: usize) {
        if let Some(array) = self.arrays.get_mut(material.as_usize()) {
            array.reserve(additional);
        }
    }

    /// The capacity hint this store was constructed with.
    #[must_use]
    pub const fn capacity_hint(&self) -> usize {
        self.capacity_hint
    }

    fn alloc_slot(&mut self, location: (MaterialIndex, u32)) -> RowId {
        if let Some(slot) = self.free_slots.pop() {
            let meta = &mut self.slots[slot as usize];
            meta.location = Some(location);
            RowId::new(slot, meta.generation)
        } else {
            let slot = u32::try_from(self.slots.len()).expect("row store exceeded u32 slots");
            self.slots.push(SlotMeta { generation: 0, location: Some(location) });
            RowId::new(slot, 0)
        }
    }

    fn free_slot(&mut self, id: RowId) {
        let meta = &mut self.slots[id.slot()];
        meta.location = None;
        meta.generation = meta.generation.wrapping_add(1);
        self.free_slots.push(u32::try_from(id.slot()).expect("slot index fits u32"));
    }

    /// Appends a new row of `material` spanning `[p0,p1)`, clipped and
    /// sorted into the world box. Fails with [`StoreError::InvalidBox`] if
    /// the resulting extent is empty.
    pub fn insert(
        &mut self,
        p0: Point3,
        p1: Point3,
        material: Material,
    ) -> Result<Row, StoreError> {
        let array = self
            .arrays
            .get_mut(material.index.as_usize())
            .ok_or(StoreError::InvalidBox)?;
        let row_index = u32::try_from(array.len()).expect("material row count exceeded u32");
        // A placeholder id; replaced by the real generational id once the
        // slot table has a location to point it at.
        let placeholder = RowId::new(0, 0);
        let row = Row::new(p0, p1, material, placeholder, row_index, self.world)
            .ok_or(StoreError::InvalidBox)?;
        let id = self.alloc_slot((material.index, row_index));
        let row = Row { id, ..row };
        self.arrays[material.index.as_usize()].push(row);
        log::trace!(
            "store: inserted row {:?} material={:?} index={row_index}",
            id,
            material.index
        );
        Ok(row)
    }

    /// The index of the last row of `material`, if any are live.
    #[must_use]
    pub fn last_index(&self, material: MaterialIndex) -> Option<u32> {
        let n = self.arrays.get(material.as_usize())?.len();
        if n == 0 {
            None
        } else {
            Some(u32::try_from(n - 1).expect("material row count exceeded u32"))
        }
    }

    /// Number of live rows for `material`.
    #[must_use]
    pub fn nrows(&self, material: MaterialIndex) -> u32 {
        self.arrays
            .get(material.as_usize())
            .map_or(0, |a| u32::try_from(a.len()).expect("material row count exceeded u32"))
    }

    /// Direct lookup by current store position.
    #[must_use]
    pub fn get(&self, material: MaterialIndex, row_index: u32) -> Option<&Row> {
        self.arrays.get(material.as_usize())?.get(row_index as usize)
    }

    /// Overwrites the flag bits of the row at `(material, row_index)`,
    /// leaving its extent, material, and identity untouched. Used by
    /// `voxelpart_engine::Engine::insert` to apply a caller-supplied flag
    /// override after the row has already been appended and given its
    /// material-derived defaults.
    pub fn set_flags(
        &mut self,
        material: MaterialIndex,
        row_index: u32,
        flags: voxelpart_row::RowFlags,
    ) -> Result<(), StoreError> {
        let row = self
            .arrays
            .get_mut(material.as_usize())
            .and_then(|a| a.get_mut(row_index as usize))
            .ok_or(StoreError::UnknownRow { material, row_index })?;
        row.flags = flags;
        Ok(())
    }

    /// Lookup by stable generational id. Returns `None` if the id is stale
    /// (its slot has since been reused) or was never issued.
    #[must_use]
    pub fn get_by_id(&self, id: RowId) -> Option<&Row> {
        let meta = self.slots.get(id.slot())?;
        if meta.generation != id.generation() {
            return None;
        }
        let (material, row_index) = meta.location?;
        self.get(material, row_index)
    }

    /// Removes the row at `(material, row_index)`, swapping the last row of
    /// that material into its place if it was not already last.
    ///
    /// This performs only the store-local mechanics: array truncation,
    /// slot-table bookkeeping, and generation bump on the removed id. It
    /// does not touch any spatial or merge index; the caller is expected to
    /// have already captured the pre-move identities of both `removed` and
    /// (if present) `moved` before calling this, and to re-register `moved`
    /// under its new `row_index` afterward.
    pub fn remove_at(
        &mut self,
        material: MaterialIndex,
        row_index: u32,
    ) -> Result<RemoveOutcome, StoreError> {
        let array = self
            .arrays
            .get_mut(material.as_usize())
            .ok_or(StoreError::UnknownRow { material, row_index })?;
        let idx = row_index as usize;
        if idx >= array.len() {
            return Err(StoreError::UnknownRow { material, row_index });
        }
        let removed = array[idx];
        let last = array.len() - 1;
        let moved = if idx != last {
            let mut last_row = array[last];
            last_row.row_index = row_index;
            array[idx] = last_row;
            if let Some(meta) = self.slots.get_mut(last_row.id.slot()) {
                meta.location = Some((material, row_index));
            }
            Some(last_row)
        } else {
            None
        };
        array.truncate(last);
        self.free_slot(removed.id);
        log::trace!(
            "store: removed row {:?} material={:?} index={row_index} moved={:?}",
            removed.id,
            material,
            moved.map(|r| r.id)
        );
        Ok(RemoveOutcome { removed, moved })
    }

    /// Removes by stable id, resolving its current position first.
    pub fn remove_by_id(&mut self, id: RowId) -> Result<RemoveOutcome, StoreError> {
        let meta = self.slots.get(id.slot()).ok_or(StoreError::UnknownRowId)?;
        if meta.generation != id.generation() {
            return Err(StoreError::UnknownRowId);
        }
        let (material, row_index) = meta.location.ok_or(StoreError::UnknownRowId)?;
        self.remove_at(material, row_index)
    }

    /// Total volume across all materials, or just `material` if given.
    #[must_use]
    pub fn volume(&self, material: Option<MaterialIndex>) -> u128 {
        match material {
            Some(m) => self
                .arrays
                .get(m.as_usize())
                .map_or(0, |a| a.iter().map(|r| u128::from(r.volume())).sum()),
            None => self
                .arrays
                .iter()
                .flatten()
                .map(|r| u128::from(r.volume()))
                .sum(),
        }
    }

    /// Iterates the live rows of one material in store order. Double-ended
    /// so callers (e.g. `voxelpart_engine`'s merge pass, which seeds its
    /// work queue in reverse index order) can `.rev()` it without
    /// collecting first.
    pub fn rows(&self, material: MaterialIndex) -> impl DoubleEndedIterator<Item = &Row> {
        self.arrays.get(material.as_usize()).into_iter().flatten()
    }

    /// Iterates every live row across every material.
    pub fn all_rows(&self) -> impl Iterator<Item = &Row> {
        self.arrays.iter().flatten()
    }

    /// Total live row count across every material.
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.arrays.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (RowStore, Catalog) {
        let catalog = Catalog::builtin();
        let world = World::new(1024, 1024, 1024);
        (RowStore::new(&catalog, world, 16), catalog)
    }

    #[test]
    fn insert_appends_and_assigns_index() {
        let (mut store, catalog) = store();
        let stone = catalog.material_by_name("STONE").unwrap();
        let r0 = store.insert(Point3::new(0, 0, 0), Point3::new(1, 1, 1), stone).unwrap();
        let r1 = store.insert(Point3::new(1, 0, 0), Point3::new(2, 1, 1), stone).unwrap();
        assert_eq!(r0.row_index, 0);
        assert_eq!(r1.row_index, 1);
        assert_eq!(store.nrows(stone.index), 2);
    }

    #[test]
    fn remove_swaps_last_into_hole_and_patches_index() {
        let (mut store, catalog) = store();
        let stone = catalog.material_by_name("STONE").unwrap();
        let r0 = store.insert(Point3::new(0, 0, 0), Point3::new(1, 1, 1), stone).unwrap();
        let r1 = store.insert(Point3::new(1, 0, 0), Point3::new(2, 1, 1), stone).unwrap();
        let r2 = store.insert(Point3::new(2, 0, 0), Point3::new(3, 1, 1), stone).unwrap();

        let outcome = store.remove_at(stone.index, r0.row_index).unwrap();
        assert_eq!(outcome.removed.id, r0.id);
        let moved = outcome.moved.expect("last row should have moved into the hole");
        assert_eq!(moved.id, r2.id);
        assert_eq!(moved.row_index, 0);
        assert_eq!(store.nrows(stone.index), 2);
        assert_eq!(store.get(stone.index, 0).unwrap().id, r2.id);
        assert_eq!(store.get(stone.index, 1).unwrap().id, r1.id);
    }

    #[test]
    fn remove_last_row_has_no_moved_entry() {
        let (mut store, catalog) = store();
        let stone = catalog.material_by_name("STONE").unwrap();
        let r0 = store.insert(Point3::new(0, 0, 0), Point3::new(1, 1, 1), stone).unwrap();
        let outcome = store.remove_at(stone.index, r0.row_index).unwrap();
        assert!(outcome.moved.is_none());
        assert_eq!(store.nrows(stone.index), 0);
    }

    #[test]
    fn stale_row_id_after_removal_is_rejected() {
        let (mut store, catalog) = store();
        let stone = catalog.material_by_name("STONE").unwrap();
        let r0 = store.insert(Point3::new(0, 0, 0), Point3::new(1, 1, 1), stone).unwrap();
        store.remove_by_id(r0.id).unwrap();
        assert!(store.get_by_id(r0.id).is_none());
        assert!(matches!(store.remove_by_id(r0.id), Err(StoreError::UnknownRowId)));
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let (mut store, catalog) = store();
        let stone = catalog.material_by_name("STONE").unwrap();
        let r0 = store.insert(Point3::new(0, 0, 0), Point3::new(1, 1, 1), stone).unwrap();
        store.remove_by_id(r0.id).unwrap();
        let r1 = store.insert(Point3::new(5, 0, 0), Point3::new(6, 1, 1), stone).unwrap();
        assert_eq!(r1.id.slot(), r0.id.slot());
        assert_ne!(r1.id.generation(), r0.id.generation());
        assert!(store.get_by_id(r0.id).is_none());
        assert!(store.get_by_id(r1.id).is_some());
    }

    #[test]
    fn volume_sums_per_material_and_total() {
        let (mut store, catalog) = store();
        let stone = catalog.material_by_name("STONE").unwrap();
        let air = catalog.material_by_name("AIR").unwrap();
        store.insert(Point3::new(0, 0, 0), Point3::new(10, 10, 10), stone).unwrap();
        store.insert(Point3::new(0, 0, 0), Point3::new(2, 2, 2), air).unwrap();
        assert_eq!(store.volume(Some(stone.index)), 1000);
        assert_eq!(store.volume(Some(air.index)), 8);
        assert_eq!(store.volume(None), 1008);
    }
}
