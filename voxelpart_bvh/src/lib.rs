// Copyright 2025 the Voxelpart Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A dynamic binary AABB tree mapping integer points to the unique row that
//! owns them. Nodes live in parallel arrays (structure of arrays) rather
//! than as a graph of boxed nodes, so insertion, removal, and refit never
//! allocate per node.
//!
//! Leaves reference a row by `(material_index, row_index)`; internal nodes
//! hold only the union AABB of their two children. A side table
//! (`hashbrown::HashMap`) maps a row's current `(material_index, row_index)`
//! to its leaf so that [`Bvh::remove`] does not need to search.
//!
//! This crate knows nothing about materials beyond the
//! [`voxelpart_materials::MaterialIndex`] it stores per leaf, and nothing
//! about merge eligibility — that is `voxelpart_fhx`'s job. It answers
//! exactly one question: "which leaf's box contains this point?"

#![forbid(unsafe_code)]

use hashbrown::HashMap;
use voxelpart_materials::MaterialIndex;

/// Marks "no node" in the `left`/`right`/`parent` arrays, and "this is an
/// internal node" in a conceptual leaf-material slot.
const SENTINEL: u32 = u32::MAX;

/// An axis-aligned integer box, half-open like [`voxelpart_row::Row`]'s
/// extent, used for both leaf and internal node bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Aabb {
    /// Inclusive lower corner.
    pub min: (u32, u32, u32),
    /// Exclusive upper corner.
    pub max: (u32, u32, u32),
}

impl Aabb {
    /// Builds an AABB from corners.
    #[must_use]
    pub const fn new(min: (u32, u32, u32), max: (u32, u32, u32)) -> Self {
        Self { min, max }
    }

    /// The smallest AABB containing both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: (
                self.min.0.min(other.min.0),
                self.min.1.min(other.min.1),
                self.min.2.min(other.min.2),
            ),
            max: (
                self.max.0.max(other.max.0),
                self.max.1.max(other.max.1),
                self.max.2.max(other.max.2),
            ),
        }
    }

    /// Volume, widened to `u128` so a union of several near-ceiling boxes
    /// never wraps while the tree is comparing insertion costs.
    #[must_use]
    pub fn volume(&self) -> u128 {
        let dx = u128::from(self.max.0 - self.min.0);
        let dy = u128::from(self.max.1 - self.min.1);
        let dz = u128::from(self.max.2 - self.min.2);
        dx * dy * dz
    }

    /// Half-open containment test.
    #[must_use]
    pub const fn contains_point(&self, p: (u32, u32, u32)) -> bool {
        p.0 >= self.min.0
            && p.0 < self.max.0
            && p.1 >= self.min.1
            && p.1 < self.max.1
            && p.2 >= self.min.2
            && p.2 < self.max.2
    }
}

/// Errors a [`Bvh`] operation can fail with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BvhError {
    /// No leaf is registered for this `(material, row_index)` identity.
    #[error("no bvh leaf registered for this row identity")]
    UnknownRow,
}

/// The dynamic AABB tree.
#[derive(Debug, Default)]
pub struct Bvh {
    xmin: Vec<u32>,
    ymin: Vec<u32>,
    zmin: Vec<u32>,
    xmax: Vec<u32>,
    ymax: Vec<u32>,
    zmax: Vec<u32>,
    left: Vec<u32>,
    right: Vec<u32>,
    parent: Vec<u32>,
    /// `None` for internal nodes; `Some(material)` for leaves.
    leaf_material: Vec<Option<MaterialIndex>>,
    leaf_row: Vec<u32>,
    free: Vec<u32>,
    root: u32,
    lookup: HashMap<(MaterialIndex, u32), u32>,
}

impl Bvh {
    /// Builds an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self { root: SENTINEL, ..Self::default() }
    }

    /// Number of live leaves (rows indexed).
    #[must_use]
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    /// Whether the tree has no leaves.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    fn bbox(&self, node: u32) -> Aabb {
        let n = node as usize;
        Aabb::new(
            (self.xmin[n], self.ymin[n], self.zmin[n]),
            (self.xmax[n], self.ymax[n], self.zmax[n]),
        )
    }

    fn set_bbox(&mut self, node: u32, aabb: Aabb) {
        let n = node as usize;
        self.xmin[n] = aabb.min.0;
        self.ymin[n] = aabb.min.1;
        self.zmin[n] = aabb.min.2;
        self.xmax[n] = aabb.max.0;
        self.ymax[n] = aabb.max.1;
        self.zmax[n] = aabb.max.2;
    }

    fn is_leaf(&self, node: u32) -> bool {
        self.leaf_material[node as usize].is_some()
    }

    fn alloc_node(
        &mut self,
        aabb: Aabb,
        left: u32,
        right: u32,
        parent: u32,
        leaf: Option<(MaterialIndex, u32)>,
    ) -> u32 {
        let idx = self.free.pop().unwrap_or_else(|| {
            let idx = u32::try_from(self.xmin.len()).expect("bvh exceeded u32 node count");
            self.xmin.push(0);
            self.ymin.push(0);
            self.zmin.push(0);
            self.xmax.push(0);
            self.ymax.push(0);
            self.zmax.push(0);
            self.left.push(0);
            self.right.push(0);
            self.parent.push(0);
            self.leaf_material.push(None);
            self.leaf_row.push(0);
            idx
        });
        self.set_bbox(idx, aabb);
        self.left[idx as usize] = left;
        self.right[idx as usize] = right;
        self.parent[idx as usize] = parent;
        match leaf {
            Some((material, row)) => {
                self.leaf_material[idx as usize] = Some(material);
                self.leaf_row[idx as usize] = row;
            }
            None => {
                self.leaf_material[idx as usize] = None;
            }
        }
        idx
    }

    fn free_node(&mut self, node: u32) {
        self.leaf_material[node as usize] = None;
        self.free.push(node);
    }

    fn refit_upward(&mut self, mut node: u32) {
        while node != SENTINEL {
            let left = self.left[node as usize];
            let right = self.right[node as usize];
            let merged = self.bbox(left).union(&self.bbox(right));
            self.set_bbox(node, merged);
            node = self.parent[node as usize];
        }
    }

    /// Descends from `root` to the leaf whose bounding box, unioned with
    /// `aabb`, yields the smallest resulting volume at each step. Ties are
    /// broken in favor of the left child.
    fn best_sibling(&self, aabb: &Aabb) -> u32 {
        let mut node = self.root;
        while !self.is_leaf(node) {
            let left = self.left[node as usize];
            let right = self.right[node as usize];
            let left_cost = self.bbox(left).union(aabb).volume();
            let right_cost = self.bbox(right).union(aabb).volume();
            node = if left_cost <= right_cost { left } else { right };
        }
        node
    }

    /// Inserts a leaf for `(material, row_index)` with bounding box `aabb`.
    /// Overwrites any existing leaf already registered for that identity
    /// without returning an error — callers are expected to `remove` a
    /// stale identity before reinserting under it, but this keeps the
    /// index itself total.
    pub fn insert(&mut self, aabb: Aabb, material: MaterialIndex, row_index: u32) {
        let key = (material, row_index);
        if self.root == SENTINEL {
            let leaf = self.alloc_node(aabb, SENTINEL, SENTINEL, SENTINEL, Some(key));
            self.root = leaf;
            self.lookup.insert(key, leaf);
            return;
        }
        let sibling = self.best_sibling(&aabb);
        let old_parent = self.parent[sibling as usize];
        let new_leaf = self.alloc_node(aabb, SENTINEL, SENTINEL, SENTINEL, Some(key));
        let merged = self.bbox(sibling).union(&aabb);
        let new_parent = self.alloc_node(merged, sibling, new_leaf, old_parent, None);
        self.parent[sibling as usize] = new_parent;
        self.parent[new_leaf as usize] = new_parent;

        if old_parent == SENTINEL {
            self.root = new_parent;
        } else if self.left[old_parent as usize] == sibling {
            self.left[old_parent as usize] = new_parent;
        } else {
            self.right[old_parent as usize] = new_parent;
        }
        self.refit_upward(old_parent);
        self.lookup.insert(key, new_leaf);
        log::trace!("bvh: inserted leaf for {key:?} at node {new_leaf}");
    }

    /// Removes the leaf registered for `(material, row_index)`.
    pub fn remove(&mut self, material: MaterialIndex, row_index: u32) -> Result<(), BvhError> {
        let leaf = self.lookup.remove(&(material, row_index)).ok_or(BvhError::UnknownRow)?;
        let parent = self.parent[leaf as usize];
        if parent == SENTINEL {
            self.root = SENTINEL;
            self.free_node(leaf);
            return Ok(());
        }
        let sibling = if self.left[parent as usize] == leaf {
            self.right[parent as usize]
        } else {
            self.left[parent as usize]
        };
        let grandparent = self.parent[parent as usize];
        if grandparent == SENTINEL {
            self.root = sibling;
            self.parent[sibling as usize] = SENTINEL;
        } else {
            if self.left[grandparent as usize] == parent {
                self.left[grandparent as usize] = sibling;
            } else {
                self.right[grandparent as usize] = sibling;
            }
            self.parent[sibling as usize] = grandparent;
            self.refit_upward(grandparent);
        }
        self.free_node(parent);
        self.free_node(leaf);
        log::trace!("bvh: removed leaf for ({material:?}, {row_index})");
        Ok(())
    }

    /// Iterative stack-based point query. Returns the `(material,
    /// row_index)` of the leaf whose box contains `p`, or `None` if no leaf
    /// does (which, under an intact partition invariant, only happens for
    /// a point outside the indexed region entirely).
    ///
    /// Children are pushed right-then-left so the left child is always
    /// popped and visited first, making traversal order deterministic.
    #[must_use]
    pub fn point_query(&self, p: (u32, u32, u32)) -> Option<(MaterialIndex, u32)> {
        if self.root == SENTINEL {
            return None;
        }
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            if !self.bbox(node).contains_point(p) {
                continue;
            }
            if self.is_leaf(node) {
                let material = self.leaf_material[node as usize].expect("leaf has material");
                return Some((material, self.leaf_row[node as usize]));
            }
            stack.push(self.right[node as usize]);
            stack.push(self.left[node as usize]);
        }
        None
    }
}
