// Copyright 2025 the Voxelpart Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A static material catalog: a bijection between material names, stable
//! catalog ids, and dense array indices, plus the type flags a row's geometry
//! and flag bits are derived from.
//!
//! The catalog is data, not a service: [`Catalog::builtin`] returns the
//! default seven-material set used throughout this workspace's tests and
//! examples, and [`Catalog::new`] builds a catalog from any caller-supplied
//! material list. There is no global or lazily-initialized catalog; an
//! engine is handed a `Catalog` at construction and that is the only
//! catalog it ever consults.
//!
//! ```
//! use voxelpart_materials::{Catalog, MaterialKind};
//!
//! let catalog = Catalog::builtin();
//! let stone = catalog.index_of_name("STONE").unwrap();
//! assert_eq!(catalog.kind_of(stone), MaterialKind::Solid);
//! assert!(catalog.is_solid(stone));
//! assert!(!catalog.is_invisible(stone));
//! ```

#![forbid(unsafe_code)]

use hashbrown::HashMap;

/// The coarse type of a material, used to derive default row flags
/// (visible/solid/destructible) without repeating that logic per material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    /// Not rendered and not solid (e.g. air).
    Invisible,
    /// Rendered but non-solid and passable (e.g. water, glass).
    Transparent,
    /// Rendered, solid, and destructible (e.g. stone).
    Solid,
    /// Rendered, solid, and indestructible (e.g. bedrock).
    Indestructible,
}

/// One entry in a material catalog: its name, stable id, and type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialDef {
    /// Canonical, uppercase name (`"STONE"`, `"AIR"`, ...).
    pub name: &'static str,
    /// Stable, opaque id. Never reused across a process lifetime.
    pub id: u64,
    /// Coarse type used to derive row flags.
    pub kind: MaterialKind,
}

/// The builtin seven-material catalog: AIR, WATER, LAVA, GLASS, STONE,
/// OBSIDIAN, BEDROCK. Ids follow the originating prototype's ranges
/// (invisible materials start at `16384`, transparent at `32768`, solid at
/// `65536`, indestructible at `4294967296`) purely so that a caller porting
/// content from that prototype sees familiar numbers; nothing in this crate
/// depends on the specific values.
pub const BUILTIN: &[MaterialDef] = &[
    MaterialDef { name: "AIR", id: 16384, kind: MaterialKind::Invisible },
    MaterialDef { name: "WATER", id: 32768, kind: MaterialKind::Transparent },
    MaterialDef { name: "LAVA", id: 32769, kind: MaterialKind::Transparent },
    MaterialDef { name: "GLASS", id: 32770, kind: MaterialKind::Transparent },
    MaterialDef { name: "STONE", id: 65536, kind: MaterialKind::Solid },
    MaterialDef { name: "OBSIDIAN", id: 65537, kind: MaterialKind::Solid },
    MaterialDef { name: "BEDROCK", id: 4294967296, kind: MaterialKind::Indestructible },
];

/// A dense index into a [`Catalog`]'s material list. Used everywhere a row
/// store or spatial index needs to route by material without string
/// comparisons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialIndex(u16);

impl MaterialIndex {
    /// Wraps a raw dense index. Callers should normally obtain a
    /// `MaterialIndex` from a [`Catalog`] lookup rather than constructing
    /// one directly.
    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the raw dense index as `usize`, for array routing.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// A resolved material: its definition plus the dense index it was resolved
/// at, with the predicate methods callers actually reach for (mirroring the
/// originating prototype's `Material.issolid()`/`isrocks()`/etc., which is
/// where these exact five predicates come from).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Material {
    /// Dense index within its catalog.
    pub index: MaterialIndex,
    /// Definition (name, id, kind).
    pub def: MaterialDef,
}

impl Material {
    /// Whether this material is rendered at all.
    #[must_use]
    pub const fn is_invisible(&self) -> bool {
        matches!(self.def.kind, MaterialKind::Invisible)
    }

    /// Whether this material is rendered but non-solid.
    #[must_use]
    pub const fn is_transparent(&self) -> bool {
        matches!(self.def.kind, MaterialKind::Transparent)
    }

    /// Whether this material is solid (blocks movement).
    #[must_use]
    pub const fn is_solid(&self) -> bool {
        matches!(self.def.kind, MaterialKind::Solid | MaterialKind::Indestructible)
    }

    /// Whether this material can be removed by ordinary carving.
    #[must_use]
    pub const fn is_destructible(&self) -> bool {
        !matches!(self.def.kind, MaterialKind::Indestructible)
    }

    /// Whether this material is indestructible (e.g. bedrock).
    #[must_use]
    pub const fn is_indestructible(&self) -> bool {
        matches!(self.def.kind, MaterialKind::Indestructible)
    }
}

/// A material catalog: the name ↔ id ↔ index bijection used throughout the
/// row store, BVH, and FHX for routing and for deriving default row flags.
///
/// `Catalog` is plain data built once at construction; it has no interior
/// mutability and no global instance. Clone it freely, it is cheap relative
/// to the engine it configures.
#[derive(Clone, Debug)]
pub struct Catalog {
    defs: Vec<MaterialDef>,
    name_to_index: HashMap<&'static str, MaterialIndex>,
    id_to_index: HashMap<u64, MaterialIndex>,
}

impl Catalog {
    /// Builds a catalog from an explicit material list. Panics if two
    /// entries share a name or id, since that would make the bijection
    /// ill-defined; this is a construction-time programmer error, not a
    /// runtime condition callers need a `Result` for.
    #[must_use]
    pub fn new(defs: &[MaterialDef]) -> Self {
        let mut name_to_index = HashMap::with_capacity(defs.len());
        let mut id_to_index = HashMap::with_capacity(defs.len());
        for (i, def) in defs.iter().enumerate() {
            let index = MaterialIndex::from_raw(
                u16::try_from(i).expect("material catalog larger than u16::MAX entries"),
            );
            assert!(
                name_to_index.insert(def.name, index).is_none(),
                "duplicate material name in catalog: {}",
                def.name
            );
            assert!(
                id_to_index.insert(def.id, index).is_none(),
                "duplicate material id in catalog: {}",
                def.id
            );
        }
        Self { defs: defs.to_vec(), name_to_index, id_to_index }
    }

    /// The builtin seven-material catalog ([`BUILTIN`]).
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(BUILTIN)
    }

    /// Number of materials in this catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Whether this catalog has no materials.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Resolves a material by name.
    #[must_use]
    pub fn index_of_name(&self, name: &str) -> Option<MaterialIndex> {
        self.name_to_index.get(name).copied()
    }

    /// Resolves a material by stable id.
    #[must_use]
    pub fn index_of_id(&self, id: u64) -> Option<MaterialIndex> {
        self.id_to_index.get(&id).copied()
    }

    /// Returns the definition at a dense index.
    #[must_use]
    pub fn def(&self, index: MaterialIndex) -> Option<&MaterialDef> {
        self.defs.get(index.as_usize())
    }

    /// Resolves a full [`Material`] (index + definition) by name.
    #[must_use]
    pub fn material_by_name(&self, name: &str) -> Option<Material> {
        let index = self.index_of_name(name)?;
        self.def(index).map(|&def| Material { index, def })
    }

    /// Resolves a full [`Material`] (index + definition) by dense index.
    #[must_use]
    pub fn material(&self, index: MaterialIndex) -> Option<Material> {
        self.def(index).map(|&def| Material { index, def })
    }

    /// Iterates every material in dense-index order.
    pub fn iter(&self) -> impl Iterator<Item = Material> + '_ {
        self.defs.iter().enumerate().map(|(i, &def)| Material {
            index: MaterialIndex::from_raw(i as u16),
            def,
        })
    }

    /// Shorthand: whether the material at `index` is solid.
    #[must_use]
    pub fn is_solid(&self, index: MaterialIndex) -> bool {
        self.material(index).is_some_and(|m| m.is_solid())
    }

    /// Shorthand: whether the material at `index` is invisible.
    #[must_use]
    pub fn is_invisible(&self, index: MaterialIndex) -> bool {
        self.material(index).is_some_and(|m| m.is_invisible())
    }

    /// Shorthand: the [`MaterialKind`] of the material at `index`.
    #[must_use]
    pub fn kind_of(&self, index: MaterialIndex) -> MaterialKind {
        self.def(index).map_or(MaterialKind::Invisible, |def| def.kind)
    }

    /// The name of the material at `index`, if any.
    #[must_use]
    pub fn name_of(&self, index: MaterialIndex) -> Option<&'static str> {
        self.def(index).map(|def| def.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_round_trips_name_id_index() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.len(), BUILTIN.len());
        for material in catalog.iter() {
            let by_name = catalog.index_of_name(material.def.name).unwrap();
            let by_id = catalog.index_of_id(material.def.id).unwrap();
            assert_eq!(by_name, material.index);
            assert_eq!(by_id, material.index);
        }
    }

    #[test]
    fn kinds_match_prototype_predicates() {
        let catalog = Catalog::builtin();
        let air = catalog.material_by_name("AIR").unwrap();
        assert!(air.is_invisible());
        assert!(!air.is_solid());

        let stone = catalog.material_by_name("STONE").unwrap();
        assert!(stone.is_solid());
        assert!(stone.is_destructible());
        assert!(!stone.is_indestructible());

        let bedrock = catalog.material_by_name("BEDROCK").unwrap();
        assert!(bedrock.is_solid());
        assert!(bedrock.is_indestructible());
        assert!(!bedrock.is_destructible());

        let water = catalog.material_by_name("WATER").unwrap();
        assert!(water.is_transparent());
        assert!(!water.is_solid());
    }

    #[test]
    fn unknown_name_is_none_not_panic() {
        let catalog = Catalog::builtin();
        assert!(catalog.index_of_name("UNOBTANIUM").is_none());
    }

    #[test]
    #[should_panic(expected = "duplicate material name")]
    fn duplicate_names_panic_at_construction() {
        let defs = [
            MaterialDef { name: "DUP", id: 1, kind: MaterialKind::Solid },
            MaterialDef { name: "DUP", id: 2, kind: MaterialKind::Solid },
        ];
        let _ = Catalog::new(&defs);
    }
}
