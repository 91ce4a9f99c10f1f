// Copyright 2025 the Voxelpart Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `merge`: consolidating adjacent same-material rows.
//!
//! A restricted merge (`merge(Some(batch))`, as `split` uses internally to
//! collapse what it just carved) tracks the lineage of the rows named in
//! `batch` through every fusion that consumes them, so the rows returned are
//! exactly the batch's descendants rather than every row of every material
//! the batch happened to touch. An unrestricted merge (`merge(None)`) has no
//! such lineage to track and simply returns every row left standing.

use std::collections::VecDeque;

use hashbrown::HashSet;

use crate::{Axis, Engine, EngineError, MaterialIndex, Row, RowId};

impl Engine {
    /// Fuses same-material, axis-touching, orthogonal-matching neighbors
    /// until no such pair remains.
    ///
    /// With `batch` given, only the materials present in `batch` are
    /// considered, and the returned rows are `batch`'s survivors: each row
    /// in `batch` that is still live, or — for any row consumed by a fusion
    /// — the row it became, transitively. Without a `batch`, every material
    /// is considered and every row left standing is returned.
    ///
    /// # Errors
    /// Internal inconsistency between the store and the BVH/FHX indices is
    /// reported as [`EngineError::PartitionViolated`].
    pub fn merge(&mut self, batch: Option<&[Row]>) -> Result<Vec<Row>, EngineError> {
        let materials = materials_in(batch, self.catalog_ref().len());
        let mut tracked: Option<HashSet<RowId>> =
            batch.map(|rows| rows.iter().map(|r| r.id).collect());

        for material in materials {
            let mut any_progress = false;
            loop {
                let mut progress = false;
                for axis in Axis::ALL {
                    progress |= self.merge_axis(material, axis, tracked.as_mut())?;
                }
                any_progress |= progress;
                if !progress {
                    break;
                }
            }
            if batch.is_some() && !any_progress {
                log::warn!("engine: merge pass made no progress on material {material:?}");
            }
        }

        let mut result: Vec<Row> = match tracked {
            Some(ids) => {
                ids.iter().filter_map(|id| self.store().get_by_id(*id).copied()).collect()
            }
            None => self.store().all_rows().copied().collect(),
        };
        result.sort_unstable_by_key(|r| (r.material, r.row_index));
        log::debug!("engine: merge pass produced {} surviving rows", result.len());
        Ok(result)
    }

    /// Drains a work queue of every current row of `material`, in reverse
    /// index order, probing `axis` for a fusible neighbor and fusing when
    /// one is found. Returns whether any fusion happened this pass, so the
    /// caller can repeat the three-axis cycle to a fixed point.
    fn merge_axis(
        &mut self,
        material: MaterialIndex,
        axis: Axis,
        mut tracked: Option<&mut HashSet<RowId>>,
    ) -> Result<bool, EngineError> {
        let mut queue: VecDeque<RowId> = self.store().rows(material).rev().map(|r| r.id).collect();
        let mut progress = false;
        while let Some(id) = queue.pop_front() {
            let Some(row) = self.store().get_by_id(id).copied() else {
                continue;
            };
            let loc = (row.material, row.row_index);
            let Some(neighbor_loc) = self.fhx.neighbor(loc, &row, axis) else {
                continue;
            };
            let Some(neighbor_row) = self.store().get(neighbor_loc.0, neighbor_loc.1).copied()
            else {
                return Err(EngineError::partition_violated("fhx neighbor missing from store"));
            };
            if !row.fusible(&neighbor_row) {
                continue;
            }

            let merged = self.merge_pair(row, neighbor_row)?;
            if let Some(set) = tracked.as_deref_mut() {
                let had_first = set.remove(&row.id);
                let had_second = set.remove(&neighbor_row.id);
                if had_first || had_second {
                    set.insert(merged.id);
                }
            }
            queue.push_back(merged.id);
            progress = true;
        }
        Ok(progress)
    }

    /// Fuses two same-material, fusible rows into their union, removing the
    /// higher-indexed source row first and re-resolving the second by its
    /// stable [`RowId`] afterward, since a swap-remove may have repositioned
    /// it without destroying it.
    fn merge_pair(&mut self, r0: Row, r1: Row) -> Result<Row, EngineError> {
        if r0.material != r1.material {
            return Err(EngineError::partition_violated("merge_pair: materials differ"));
        }
        let (first, second) = if r0.row_index >= r1.row_index { (r0, r1) } else { (r1, r0) };
        self.remove_internal(first.material, first.row_index)?;
        let second_now = *self.store().get_by_id(second.id).ok_or_else(|| {
            EngineError::partition_violated("merge_pair: second row vanished before removal")
        })?;
        self.remove_internal(second_now.material, second_now.row_index)?;

        let material = self
            .catalog_ref()
            .material(r0.material)
            .ok_or_else(|| EngineError::partition_violated("merge_pair: material not in catalog"))?;
        let (lo, hi) = r0.union_box(&r1);
        self.insert_internal(lo, hi, material)
    }
}

fn materials_in(batch: Option<&[Row]>, catalog_len: usize) -> Vec<MaterialIndex> {
    match batch {
        Some(rows) => {
            let mut materials: Vec<MaterialIndex> = rows.iter().map(|r| r.material).collect();
            materials.sort_unstable();
            materials.dedup();
            materials
        }
        None => (0..catalog_len)
            .map(|i| MaterialIndex::from_raw(u16::try_from(i).expect("catalog fits u16")))
            .collect(),
    }
}
