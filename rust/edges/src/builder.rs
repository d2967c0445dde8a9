// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connectivity builder: triangle/edge adjacency from index buffers.
//!
//! A build runs in two stages under a single [`WeldingPolicy`]:
//!
//! 1. Every index source is expanded into triangles. Each corner is welded to
//!    a common vertex, and each triangle edge whose common ids ascend
//!    (`a < b`) creates a half-edge keyed by `(a, b)`.
//! 2. Every triangle edge whose common ids descend looks up `(b, a)` and
//!    becomes the second triangle of that edge.
//!
//! Which triangle owns an edge therefore depends only on common vertex
//! ordering, never on the order the index sets were processed in. An edge
//! claimed by a third triangle means the weld was too aggressive;
//! [`ConnectivityBuilder::build`] then retries under the next policy in
//! [`WeldingPolicy::CASCADE`].

use nalgebra::Vector3;
use rustc_hash::FxHashMap;

use crate::buffer::{IndexReadLock, IndexSource, VertexReadLock, VertexSource};
use crate::collector::{GeometrySourceCollector, IndexSourceEntry, PrimitiveTopology};
use crate::edge_data::{face_normal, Edge, EdgeData, EdgeGroup, Triangle};
use crate::error::{BuildConflict, Error, Result};
use crate::policy::{VertexOrigin, WeldTolerance, WeldingPolicy};
use crate::spatial::WeldIndex;

/// Outcome of one build attempt under a single welding policy.
pub type Attempt = std::result::Result<EdgeData, BuildConflict>;

/// Location of an edge: (edge group, position in the group).
type EdgeSlot = (usize, usize);

/// Builds [`EdgeData`] from the sources in a [`GeometrySourceCollector`].
///
/// Not reentrant: the weld table is cleared and reused by every attempt.
pub struct ConnectivityBuilder<'a> {
    sources: GeometrySourceCollector<'a>,
    weld: WeldIndex,
}

impl<'a> ConnectivityBuilder<'a> {
    /// Creates a builder with the default weld tolerance.
    pub fn new() -> Self {
        Self::with_sources(GeometrySourceCollector::new())
    }

    /// Creates a builder over an already populated collector.
    pub fn with_sources(sources: GeometrySourceCollector<'a>) -> Self {
        Self {
            sources,
            weld: WeldIndex::new(WeldTolerance::default()),
        }
    }

    /// Replaces the weld tolerance used by subsequent builds.
    pub fn with_tolerance(mut self, tolerance: WeldTolerance) -> Self {
        self.weld = WeldIndex::new(tolerance);
        self
    }

    /// Registers a position buffer; see [`GeometrySourceCollector::add_vertex_source`].
    pub fn add_vertex_source(&mut self, source: &'a dyn VertexSource) -> usize {
        self.sources.add_vertex_source(source)
    }

    /// Registers an index buffer; see [`GeometrySourceCollector::add_index_source`].
    pub fn add_index_source(
        &mut self,
        source: &'a dyn IndexSource,
        vertex_set: usize,
        topology: PrimitiveTopology,
    ) -> usize {
        self.sources.add_index_source(source, vertex_set, topology)
    }

    pub fn sources(&self) -> &GeometrySourceCollector<'a> {
        &self.sources
    }

    /// Number of common vertices produced by the most recent attempt.
    pub fn common_vertex_count(&self) -> usize {
        self.weld.len()
    }

    /// Builds the edge list, trying each welding policy from strongest to
    /// weakest and returning the first manifold result.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] when no vertex or index source was added,
    /// [`Error::NonManifoldGeometry`] when every policy leaves an edge with
    /// three or more triangles, and buffer errors for out-of-range indices.
    pub fn build(&mut self) -> Result<EdgeData> {
        self.sources.validate()?;

        for (attempt, &policy) in WeldingPolicy::CASCADE.iter().enumerate() {
            match self.try_build(policy)? {
                Ok(data) => {
                    tracing::debug!(
                        %policy,
                        attempt,
                        triangles = data.triangle_count(),
                        edges = data.edge_count(),
                        closed = data.is_closed,
                        "Built edge list"
                    );
                    return Ok(data);
                }
                Err(conflict) => {
                    tracing::info!(
                        %conflict,
                        "Welding policy produced a non-manifold edge, retrying with weaker welding"
                    );
                }
            }
        }

        tracing::warn!(
            attempts = WeldingPolicy::CASCADE.len(),
            "No welding policy produced a manifold edge list"
        );
        Err(Error::NonManifoldGeometry {
            attempts: WeldingPolicy::CASCADE.len(),
        })
    }

    /// Runs a single build attempt under `policy`.
    ///
    /// The outer `Result` carries configuration and buffer errors; the inner
    /// one reports a third triangle claiming an edge.
    pub fn try_build(&mut self, policy: WeldingPolicy) -> Result<Attempt> {
        self.sources.validate()?;
        self.weld.clear();

        let mut data = EdgeData {
            triangles: Vec::new(),
            edge_groups: self
                .sources
                .vertex_sources()
                .iter()
                .enumerate()
                .map(|(vertex_set, source)| EdgeGroup::new(vertex_set, source.vertex_count()))
                .collect(),
            is_closed: false,
        };
        let mut created: FxHashMap<(usize, usize), EdgeSlot> = FxHashMap::default();
        let mut skipped = 0usize;

        let entries: Vec<IndexSourceEntry<'a>> = self.sources.index_sources().to_vec();
        for (index_set, entry) in entries.iter().enumerate() {
            match self.build_triangles_edges(index_set, entry, policy, &mut data, &mut created)? {
                Ok(degenerate) => skipped += degenerate,
                Err(conflict) => return Ok(Err(conflict)),
            }
        }

        if let Err(conflict) = connect_edges(policy, &mut data, &created) {
            return Ok(Err(conflict));
        }
        data.refresh_closed();

        tracing::debug!(
            %policy,
            triangles = data.triangle_count(),
            edges = data.edge_count(),
            common_vertices = self.weld.len(),
            skipped_degenerate = skipped,
            "Connectivity attempt complete"
        );
        Ok(Ok(data))
    }

    /// Stage 1 for one index set. Returns the number of collapsed triangles
    /// that were skipped.
    fn build_triangles_edges(
        &mut self,
        index_set: usize,
        entry: &IndexSourceEntry<'a>,
        policy: WeldingPolicy,
        data: &mut EdgeData,
        created: &mut FxHashMap<(usize, usize), EdgeSlot>,
    ) -> Result<std::result::Result<usize, BuildConflict>> {
        let vertex_set = entry.vertex_set;
        let positions = VertexReadLock::acquire(self.sources.vertex_source(vertex_set)?)?;
        let indices = IndexReadLock::acquire(entry.source)?;

        let iterations = entry.topology.triangle_count(indices.len());
        data.triangles.reserve(iterations);
        let mut skipped = 0;

        for t in 0..iterations {
            let corners = entry.topology.corners(t);
            let mut vert_index = [0u32; 3];
            let mut shared_vert_index = [0usize; 3];
            let mut v = [Vector3::zeros(); 3];

            for i in 0..3 {
                vert_index[i] = indices.index(corners[i])?;
                v[i] = positions.position(vert_index[i])?;
                shared_vert_index[i] = self.weld.find_or_insert(
                    [v[i].x, v[i].y, v[i].z],
                    VertexOrigin {
                        vertex_set,
                        index_set,
                        original_index: vert_index[i],
                    },
                    policy,
                );
            }

            let tri = Triangle {
                index_set,
                vertex_set,
                vert_index,
                shared_vert_index,
                normal: face_normal(&v[0], &v[1], &v[2]),
                light_facing: false,
            };

            // Collapsed under this weld; it has no area and no usable edges.
            if !tri.has_distinct_vertices() {
                skipped += 1;
                continue;
            }

            let tri_index = data.triangles.len();
            let group = &mut data.edge_groups[vertex_set];
            group.triangles.push(tri_index);

            for i in 0..3 {
                let (a, b) = tri.shared_edge(i);
                if a >= b {
                    continue;
                }
                if created.contains_key(&(a, b)) {
                    return Ok(Err(BuildConflict {
                        policy,
                        shared_vertices: (a, b),
                        triangle: tri_index,
                    }));
                }
                let (v0, v1) = tri.original_edge(i);
                created.insert((a, b), (vertex_set, group.edges.len()));
                group.edges.push(Edge {
                    first_triangle: tri_index,
                    second_triangle: None,
                    vert_index: [v0, v1],
                    shared_vert_index: [a, b],
                });
            }

            data.triangles.push(tri);
        }

        Ok(Ok(skipped))
    }
}

impl Default for ConnectivityBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Stage 2: attach each descending triangle edge to the ascending half-edge
/// created for the same pair in stage 1.
///
/// A descending edge with no partner is an open boundary owned by this
/// triangle; it is added as a degenerate edge so lit boundaries still cast
/// silhouettes.
fn connect_edges(
    policy: WeldingPolicy,
    data: &mut EdgeData,
    created: &FxHashMap<(usize, usize), EdgeSlot>,
) -> std::result::Result<(), BuildConflict> {
    let EdgeData {
        triangles,
        edge_groups,
        ..
    } = data;
    let mut open: FxHashMap<(usize, usize), EdgeSlot> = FxHashMap::default();

    for (tri_index, tri) in triangles.iter().enumerate() {
        for i in 0..3 {
            let (a, b) = tri.shared_edge(i);
            if a <= b {
                continue;
            }
            let conflict = BuildConflict {
                policy,
                shared_vertices: (b, a),
                triangle: tri_index,
            };

            if let Some(&(group, slot)) = created.get(&(b, a)) {
                let edge = &mut edge_groups[group].edges[slot];
                if edge.second_triangle.is_some() {
                    return Err(conflict);
                }
                edge.second_triangle = Some(tri_index);
                continue;
            }

            if open.contains_key(&(a, b)) {
                return Err(conflict);
            }
            let group = &mut edge_groups[tri.vertex_set];
            let (v0, v1) = tri.original_edge(i);
            open.insert((a, b), (tri.vertex_set, group.edges.len()));
            group.edges.push(Edge {
                first_triangle: tri_index,
                second_triangle: None,
                vert_index: [v0, v1],
                shared_vert_index: [a, b],
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{IndexBuffer, PositionBuffer};

    fn quad() -> (PositionBuffer, IndexBuffer) {
        let positions = PositionBuffer::from_flat(&[
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            1.0, 1.0, 0.0, //
            0.0, 1.0, 0.0,
        ]);
        let indices = IndexBuffer::from_u16(vec![0, 1, 2, 0, 2, 3]);
        (positions, indices)
    }

    #[test]
    fn quad_has_one_shared_edge_and_four_boundaries() {
        let (positions, indices) = quad();
        let mut builder = ConnectivityBuilder::new();
        builder.add_vertex_source(&positions);
        builder.add_index_source(&indices, 0, PrimitiveTopology::TriangleList);

        let data = builder.build().unwrap();
        assert_eq!(data.triangle_count(), 2);
        assert_eq!(data.edge_count(), 5);
        let shared: Vec<_> = data.edges().filter(|(_, e)| !e.is_degenerate()).collect();
        assert_eq!(shared.len(), 1);
        assert!(!data.is_closed);
    }

    #[test]
    fn locks_are_released_after_build() {
        let (positions, indices) = quad();
        let mut builder = ConnectivityBuilder::new();
        builder.add_vertex_source(&positions);
        builder.add_index_source(&indices, 0, PrimitiveTopology::TriangleList);
        builder.build().unwrap();
        assert!(!positions.is_locked());
        assert!(!indices.is_locked());
    }

    #[test]
    fn locks_are_released_after_bad_index() {
        let positions = PositionBuffer::zeroed(3);
        let indices = IndexBuffer::from_u16(vec![0, 1, 9]);
        let mut builder = ConnectivityBuilder::new();
        builder.add_vertex_source(&positions);
        builder.add_index_source(&indices, 0, PrimitiveTopology::TriangleList);
        assert!(matches!(
            builder.build(),
            Err(Error::IndexOutOfRange { index: 9, len: 3 })
        ));
        assert!(!positions.is_locked());
        assert!(!indices.is_locked());
    }

    #[test]
    fn empty_builder_is_a_configuration_error() {
        let mut builder = ConnectivityBuilder::new();
        assert!(matches!(builder.build(), Err(Error::Configuration(_))));
    }

    #[test]
    fn collapsed_triangles_are_skipped() {
        let positions = PositionBuffer::from_flat(&[
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            1.0, 0.0, 0.0,
        ]);
        // Second triangle collapses once vertices 1 and 3 weld.
        let indices = IndexBuffer::from_u32(vec![0, 1, 2, 0, 1, 3]);
        let mut builder = ConnectivityBuilder::new();
        builder.add_vertex_source(&positions);
        builder.add_index_source(&indices, 0, PrimitiveTopology::TriangleList);

        let data = builder.build().unwrap();
        assert_eq!(data.triangle_count(), 1);
        assert_eq!(data.edge_count(), 3);
    }

    #[test]
    fn strip_builds_consistent_adjacency() {
        let (positions, _) = quad();
        // 0-1-3-2 strip covers the quad with two triangles.
        let indices = IndexBuffer::from_u16(vec![0, 1, 3, 2]);
        let mut builder = ConnectivityBuilder::new();
        builder.add_vertex_source(&positions);
        builder.add_index_source(&indices, 0, PrimitiveTopology::TriangleStrip);

        let data = builder.build().unwrap();
        assert_eq!(data.triangle_count(), 2);
        assert_eq!(data.edge_count(), 5);
        for tri in &data.triangles {
            assert!(tri.normal.z > 0.99);
        }
    }

    #[test]
    fn fan_builds_consistent_adjacency() {
        let (positions, _) = quad();
        let indices = IndexBuffer::from_u16(vec![0, 1, 2, 3]);
        let mut builder = ConnectivityBuilder::new();
        builder.add_vertex_source(&positions);
        builder.add_index_source(&indices, 0, PrimitiveTopology::TriangleFan);

        let data = builder.build().unwrap();
        assert_eq!(data.triangle_count(), 2);
        assert_eq!(data.edges().filter(|(_, e)| !e.is_degenerate()).count(), 1);
    }

    #[test]
    fn third_triangle_on_edge_is_a_conflict() {
        // Three triangles fanning around the edge 0-1.
        let positions = PositionBuffer::from_flat(&[
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.5, 1.0, 0.0, //
            0.5, -1.0, 0.0, //
            0.5, 0.0, 1.0,
        ]);
        let indices = IndexBuffer::from_u16(vec![0, 1, 2, 1, 0, 3, 1, 0, 4]);
        let mut builder = ConnectivityBuilder::new();
        builder.add_vertex_source(&positions);
        builder.add_index_source(&indices, 0, PrimitiveTopology::TriangleList);

        let attempt = builder.try_build(WeldingPolicy::Everything).unwrap();
        let conflict = attempt.unwrap_err();
        assert_eq!(conflict.shared_vertices, (0, 1));
        assert!(matches!(
            builder.build(),
            Err(Error::NonManifoldGeometry { attempts: 5 })
        ));
    }
}
