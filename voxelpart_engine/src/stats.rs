// Copyright 2025 the Voxelpart Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A read-only snapshot of row counts and volume, per material and
//! globally. Diagnostic only: [`Engine::stats`](crate::Engine::stats) never
//! fails and never mutates, unlike every other public operation on
//! [`Engine`](crate::Engine).

use std::fmt;

use crate::Engine;

/// Row count and volume for one material, as reported by
/// [`Engine::stats`](crate::Engine::stats).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaterialStats {
    /// The material's canonical catalog name.
    pub name: &'static str,
    /// Number of live rows of this material.
    pub nrows: u32,
    /// Total volume of this material's rows.
    pub volume: u128,
}

/// The full snapshot returned by [`Engine::stats`](crate::Engine::stats):
/// one [`MaterialStats`] per catalog entry (in catalog order, including
/// materials with zero live rows), plus the global totals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineStats {
    /// Per-material row count and volume, in catalog order.
    pub materials: Vec<MaterialStats>,
    /// Total live row count across every material.
    pub total_rows: usize,
    /// Total volume across every material; always equal to the world
    /// volume while the partition invariant holds.
    pub total_volume: u128,
}

impl fmt::Display for EngineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "voxelpart: {} rows, {} volume", self.total_rows, self.total_volume)?;
        for m in &self.materials {
            if m.nrows > 0 {
                writeln!(f, "  {:<12} {:>8} rows  {:>16} volume", m.name, m.nrows, m.volume)?;
            }
        }
        Ok(())
    }
}

pub(crate) fn build(engine: &Engine) -> EngineStats {
    let catalog = engine.catalog();
    let materials: Vec<MaterialStats> = catalog
        .iter()
        .map(|material| MaterialStats {
            name: material.def.name,
            nrows: engine.nrows(material.def.name).unwrap_or(0),
            volume: engine.volume(Some(material.def.name)).unwrap_or(0),
        })
        .collect();
    let total_rows = materials.iter().map(|m| m.nrows as usize).sum();
    let total_volume = materials.iter().map(|m| m.volume).sum();
    EngineStats { materials, total_rows, total_volume }
}
