// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial hash for assigning common vertex identities.
//!
//! Space is divided into cubic cells whose side equals the weld tolerance, so
//! two positions within tolerance on every axis are at most one cell apart.
//! Lookups check the 3x3x3 neighbourhood and pick the *lowest-numbered*
//! admissible common vertex, which gives the same answer as scanning the
//! common vertex list front to back.

use rustc_hash::FxHashMap;

use crate::buffer::Position;
use crate::policy::{VertexOrigin, WeldTolerance, WeldingPolicy};

/// A welded vertex identity.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonVertex {
    /// Position of the first original vertex that created this identity.
    pub position: Position,
    /// Vertex set, index set and index of that first reference.
    pub origin: VertexOrigin,
    /// Sequential id, equal to this vertex's position in [`WeldIndex::vertices`].
    pub common_index: usize,
}

/// Grid of common vertices used during one connectivity build.
#[derive(Debug)]
pub struct WeldIndex {
    tolerance: WeldTolerance,
    cell_size: f32,
    vertices: Vec<CommonVertex>,
    grid: FxHashMap<(i64, i64, i64), Vec<usize>>,
}

impl WeldIndex {
    /// Creates an empty index for the given tolerance.
    pub fn new(tolerance: WeldTolerance) -> Self {
        Self {
            tolerance,
            cell_size: tolerance.get().max(f32::EPSILON),
            vertices: Vec::new(),
            grid: FxHashMap::default(),
        }
    }

    /// Drops all common vertices, keeping allocations for the next attempt.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.grid.clear();
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertices(&self) -> &[CommonVertex] {
        &self.vertices
    }

    /// Returns the common vertex for `position`, creating one if no existing
    /// identity is within tolerance and admitted by `policy`.
    pub fn find_or_insert(
        &mut self,
        position: Position,
        origin: VertexOrigin,
        policy: WeldingPolicy,
    ) -> usize {
        if let Some(existing) = self.find(&position, &origin, policy) {
            return existing;
        }

        let common_index = self.vertices.len();
        self.vertices.push(CommonVertex {
            position,
            origin,
            common_index,
        });
        let cell = self.cell_coords(&position);
        self.grid.entry(cell).or_default().push(common_index);
        common_index
    }

    fn find(
        &self,
        position: &Position,
        origin: &VertexOrigin,
        policy: WeldingPolicy,
    ) -> Option<usize> {
        let (cx, cy, cz) = self.cell_coords(position);
        let mut best: Option<usize> = None;

        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(candidates) = self.grid.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &ci in candidates {
                        if best.is_some_and(|b| b < ci) {
                            break; // buckets are ascending
                        }
                        let cv = &self.vertices[ci];
                        if self.tolerance.positions_equal(&cv.position, position)
                            && policy.admits(&cv.origin, origin)
                        {
                            best = Some(ci);
                            break;
                        }
                    }
                }
            }
        }

        best
    }

    fn cell_coords(&self, p: &Position) -> (i64, i64, i64) {
        (
            (p[0] / self.cell_size).floor() as i64,
            (p[1] / self.cell_size).floor() as i64,
            (p[2] / self.cell_size).floor() as i64,
        )
    }
}
