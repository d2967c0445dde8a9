// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Triangle and edge adjacency produced by the connectivity builder.
//!
//! [`EdgeData`] is the aggregate root. Triangle indices stored in [`Edge`] and
//! [`EdgeGroup`] are positions into [`EdgeData::triangles`]. Edges are grouped
//! by the vertex set their original indices refer to, because a shadow volume
//! index buffer can only address a single vertex buffer.

use nalgebra::{Vector3, Vector4};

/// A triangle of the source geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    /// Index set the triangle was read from.
    pub index_set: usize,
    /// Vertex set its original indices refer to.
    pub vertex_set: usize,
    /// Original vertex indices, counter-clockwise.
    pub vert_index: [u32; 3],
    /// Welded common vertex ids, same order as `vert_index`.
    pub shared_vert_index: [usize; 3],
    /// Unit face normal in `xyz`, plane distance in `w`.
    pub normal: Vector4<f32>,
    /// Set by light classification.
    pub light_facing: bool,
}

impl Triangle {
    /// Common vertex pair of edge `i` (corner `i` to corner `i + 1`).
    #[inline]
    pub fn shared_edge(&self, i: usize) -> (usize, usize) {
        (self.shared_vert_index[i], self.shared_vert_index[(i + 1) % 3])
    }

    /// Original index pair of edge `i`.
    #[inline]
    pub fn original_edge(&self, i: usize) -> (u32, u32) {
        (self.vert_index[i], self.vert_index[(i + 1) % 3])
    }

    /// Returns `true` if all three common vertices are distinct.
    pub fn has_distinct_vertices(&self) -> bool {
        let [a, b, c] = self.shared_vert_index;
        a != b && b != c && c != a
    }
}

/// An edge between one or two triangles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Triangle that created the edge. The edge runs counter-clockwise around it.
    pub first_triangle: usize,
    /// Triangle on the other side, `None` for an open boundary edge.
    pub second_triangle: Option<usize>,
    /// Original vertex indices, in the first triangle's winding.
    pub vert_index: [u32; 2],
    /// Welded common vertex ids, same order as `vert_index`.
    pub shared_vert_index: [usize; 2],
}

impl Edge {
    /// An edge with only one triangle (an open mesh boundary).
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.second_triangle.is_none()
    }

    /// Which side of the edge faces the light, if the edge is on the silhouette.
    ///
    /// A degenerate edge is a silhouette whenever its only triangle is lit.
    #[inline]
    pub fn silhouette(&self, triangles: &[Triangle]) -> Option<SilhouetteSide> {
        let first_lit = triangles[self.first_triangle].light_facing;
        match self.second_triangle {
            None if first_lit => Some(SilhouetteSide::First),
            None => None,
            Some(second) => {
                let second_lit = triangles[second].light_facing;
                match (first_lit, second_lit) {
                    (true, false) => Some(SilhouetteSide::First),
                    (false, true) => Some(SilhouetteSide::Second),
                    _ => None,
                }
            }
        }
    }
}

/// Which triangle of a silhouette edge is the lit one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SilhouetteSide {
    First,
    Second,
}

/// Edges and triangles that belong to one vertex set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeGroup {
    pub vertex_set: usize,
    /// Vertex count of the source buffer at build time.
    pub vertex_count: usize,
    pub edges: Vec<Edge>,
    /// Indices into [`EdgeData::triangles`] whose vertex set is this group's.
    pub triangles: Vec<usize>,
}

impl EdgeGroup {
    pub fn new(vertex_set: usize, vertex_count: usize) -> Self {
        Self {
            vertex_set,
            vertex_count,
            edges: Vec::new(),
            triangles: Vec::new(),
        }
    }
}

/// Adjacency of a mesh built from one or more vertex/index buffers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeData {
    pub triangles: Vec<Triangle>,
    /// One group per vertex set, indexed by vertex set id.
    pub edge_groups: Vec<EdgeGroup>,
    /// `true` when no edge is degenerate (every edge has two triangles).
    pub is_closed: bool,
}

impl EdgeData {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Total number of edges across all groups.
    pub fn edge_count(&self) -> usize {
        self.edge_groups.iter().map(|g| g.edges.len()).sum()
    }

    /// Iterates over every edge together with its group's vertex set.
    pub fn edges(&self) -> impl Iterator<Item = (usize, &Edge)> + '_ {
        self.edge_groups
            .iter()
            .flat_map(|g| g.edges.iter().map(move |e| (g.vertex_set, e)))
    }

    /// Iterates over the edges separating a lit from an unlit triangle, and
    /// lit boundary edges. Only meaningful after light classification.
    pub fn silhouette_edges(&self) -> impl Iterator<Item = (usize, &Edge)> + '_ {
        self.edges()
            .filter(|(_, e)| e.silhouette(&self.triangles).is_some())
    }

    /// Recomputes [`EdgeData::is_closed`] from the edge list.
    pub fn refresh_closed(&mut self) {
        let closed = self.edges().all(|(_, e)| !e.is_degenerate());
        self.is_closed = closed;
    }
}

/// Unit face normal of a counter-clockwise triangle, with the plane distance
/// `-n · v0` in `w`. A zero-area triangle yields a zero normal.
pub fn face_normal(v0: &Vector3<f32>, v1: &Vector3<f32>, v2: &Vector3<f32>) -> Vector4<f32> {
    let n = (v1 - v0)
        .cross(&(v2 - v0))
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(Vector3::zeros);
    Vector4::new(n.x, n.y, n.z, -n.dot(v0))
}
