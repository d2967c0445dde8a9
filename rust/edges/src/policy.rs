// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vertex welding policies.
//!
//! Textured or hard-edged meshes duplicate vertices along UV and normal seams,
//! so building adjacency from raw indices would leave those seams open.
//! Welding treats coincident positions as one *common vertex*. How far that
//! identity reaches (across vertex buffers, across index buffers) is the
//! policy; [`WeldingPolicy::CASCADE`] lists them strongest first.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default absolute tolerance for treating two positions as coincident.
pub const DEFAULT_WELD_TOLERANCE: f32 = 1e-4;

/// Scope of vertex welding for one connectivity build attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeldingPolicy {
    /// Coincident positions always weld.
    Everything,
    /// Weld across index sets, but only within one vertex set.
    AcrossIndexSets,
    /// Weld across vertex sets, but only within one index set.
    AcrossVertexSets,
    /// Weld only within the same vertex set and the same index set.
    WithinSets,
    /// Every original vertex is its own common vertex.
    Never,
}

impl WeldingPolicy {
    /// All policies, strongest welding first. The builder tries them in order.
    pub const CASCADE: [WeldingPolicy; 5] = [
        WeldingPolicy::Everything,
        WeldingPolicy::AcrossIndexSets,
        WeldingPolicy::AcrossVertexSets,
        WeldingPolicy::WithinSets,
        WeldingPolicy::Never,
    ];

    /// Whether vertices from different vertex sets may share a common vertex.
    pub fn welds_across_vertex_sets(self) -> bool {
        matches!(
            self,
            WeldingPolicy::Everything | WeldingPolicy::AcrossVertexSets
        )
    }

    /// Whether vertices first referenced by different index sets may share a
    /// common vertex.
    pub fn welds_across_index_sets(self) -> bool {
        matches!(
            self,
            WeldingPolicy::Everything | WeldingPolicy::AcrossIndexSets
        )
    }

    /// Whether distinct original indices may share a common vertex at all.
    pub fn welds(self) -> bool {
        self != WeldingPolicy::Never
    }

    /// Decides whether a candidate vertex may join an existing common vertex.
    ///
    /// Position equality is checked separately; this only covers scope.
    #[inline]
    pub fn admits(self, existing: &VertexOrigin, candidate: &VertexOrigin) -> bool {
        (self.welds_across_vertex_sets() || existing.vertex_set == candidate.vertex_set)
            && (self.welds_across_index_sets() || existing.index_set == candidate.index_set)
            && (self.welds() || existing.original_index == candidate.original_index)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WeldingPolicy::Everything => "weld-everything",
            WeldingPolicy::AcrossIndexSets => "weld-across-index-sets",
            WeldingPolicy::AcrossVertexSets => "weld-across-vertex-sets",
            WeldingPolicy::WithinSets => "weld-within-sets",
            WeldingPolicy::Never => "no-weld",
        }
    }
}

impl fmt::Display for WeldingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an original vertex reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexOrigin {
    pub vertex_set: usize,
    pub index_set: usize,
    pub original_index: u32,
}

/// Absolute per-axis tolerance used when welding positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeldTolerance(f32);

impl WeldTolerance {
    /// Creates a tolerance. Negative or non-finite values fall back to the default.
    pub fn new(tolerance: f32) -> Self {
        if tolerance.is_finite() && tolerance >= 0.0 {
            Self(tolerance)
        } else {
            Self::default()
        }
    }

    pub fn get(self) -> f32 {
        self.0
    }

    /// Per-component comparison; no axis may differ by more than the tolerance.
    #[inline]
    pub fn positions_equal(self, a: &[f32; 3], b: &[f32; 3]) -> bool {
        (a[0] - b[0]).abs() <= self.0
            && (a[1] - b[1]).abs() <= self.0
            && (a[2] - b[2]).abs() <= self.0
    }
}

impl Default for WeldTolerance {
    fn default() -> Self {
        Self(DEFAULT_WELD_TOLERANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(vertex_set: usize, index_set: usize, original_index: u32) -> VertexOrigin {
        VertexOrigin {
            vertex_set,
            index_set,
            original_index,
        }
    }

    #[test]
    fn cascade_order_weakens() {
        assert_eq!(WeldingPolicy::CASCADE[0], WeldingPolicy::Everything);
        assert_eq!(WeldingPolicy::CASCADE[4], WeldingPolicy::Never);
    }

    #[test]
    fn everything_ignores_sets() {
        let p = WeldingPolicy::Everything;
        assert!(p.admits(&origin(0, 0, 1), &origin(1, 1, 7)));
    }

    #[test]
    fn across_index_sets_requires_vertex_set() {
        let p = WeldingPolicy::AcrossIndexSets;
        assert!(p.admits(&origin(0, 0, 1), &origin(0, 1, 7)));
        assert!(!p.admits(&origin(0, 0, 1), &origin(1, 0, 7)));
    }

    #[test]
    fn across_vertex_sets_requires_index_set() {
        let p = WeldingPolicy::AcrossVertexSets;
        assert!(p.admits(&origin(0, 2, 1), &origin(1, 2, 7)));
        assert!(!p.admits(&origin(0, 2, 1), &origin(0, 3, 7)));
    }

    #[test]
    fn within_sets_requires_both() {
        let p = WeldingPolicy::WithinSets;
        assert!(p.admits(&origin(0, 0, 1), &origin(0, 0, 7)));
        assert!(!p.admits(&origin(0, 0, 1), &origin(0, 1, 7)));
        assert!(!p.admits(&origin(0, 0, 1), &origin(1, 0, 7)));
    }

    #[test]
    fn never_only_matches_same_reference() {
        let p = WeldingPolicy::Never;
        assert!(p.admits(&origin(0, 0, 3), &origin(0, 0, 3)));
        assert!(!p.admits(&origin(0, 0, 3), &origin(0, 0, 4)));
    }

    #[test]
    fn tolerance_is_per_component() {
        let tol = WeldTolerance::default();
        assert!(tol.positions_equal(&[0.0, 0.0, 0.0], &[5e-5, -5e-5, 0.0]));
        assert!(!tol.positions_equal(&[0.0, 0.0, 0.0], &[0.0, 0.0, 2e-4]));
    }

    #[test]
    fn invalid_tolerance_falls_back() {
        assert_eq!(WeldTolerance::new(-1.0), WeldTolerance::default());
        assert_eq!(WeldTolerance::new(f32::NAN), WeldTolerance::default());
        assert_eq!(WeldTolerance::new(0.5).get(), 0.5);
    }
}
