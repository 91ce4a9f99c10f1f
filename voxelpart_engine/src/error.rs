// Copyright 2025 the Voxelpart Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The engine's error type: one variant per failure kind a public operation
//! can surface, each carrying the context needed to diagnose it without
//! re-deriving it from a log line.

use voxelpart_materials::MaterialIndex;
use voxelpart_row::RowId;

/// Errors a public [`crate::Engine`] operation can fail with.
///
/// [`EngineError::PartitionViolated`] is the one kind a correct
/// implementation should never actually observe; it exists so an internal
/// consistency check failing is surfaced to the caller as data rather than
/// as a panic, which matters for long-running hosts that would rather log
/// and quarantine a corrupted engine instance than crash the process.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// `p0` is not strictly less than `p1` on some axis, or the box does
    /// not fit inside the configured world extent.
    #[error("invalid box: {0}")]
    InvalidBox(String),

    /// A material name or id does not resolve to a catalog entry.
    #[error("unknown material: {0}")]
    UnknownMaterial(String),

    /// A `(material, row_index)` identity does not currently refer to a
    /// live row.
    #[error("unknown row: material={material:?} row_index={row_index}")]
    UnknownRow {
        /// The material index that was queried.
        material: MaterialIndex,
        /// The row index that was queried.
        row_index: u32,
    },

    /// A `RowId` handle is stale (its slot has since been reused by a later
    /// insert) or was never issued by this engine.
    #[error("unknown row id: {0:?}")]
    UnknownRowId(RowId),

    /// `get(material, index)` was called with an index outside the live
    /// range for that material.
    #[error("index out of range: material={material} index={index} (have {len})")]
    IndexOutOfRange {
        /// Name of the material queried.
        material: String,
        /// The index that was requested.
        index: u32,
        /// The number of live rows actually present for that material.
        len: u32,
    },

    /// A point query (`search`) was made against a point outside the
    /// configured world box.
    #[error("search point lies outside the world box")]
    NotFound,

    /// An internal partition-invariant check failed. A correct
    /// implementation never returns this; if it does, it indicates a bug in
    /// this crate, not a caller error. The store is left exactly as it was
    /// before the failing sub-step, by rolling any completed sub-step back
    /// before returning.
    #[error("internal partition invariant violated: {0}")]
    PartitionViolated(String),
}

impl EngineError {
    pub(crate) fn partition_violated(message: impl Into<String>) -> Self {
        let message = message.into();
        log::error!("partition invariant violated: {message}");
        Self::PartitionViolated(message)
    }
}
