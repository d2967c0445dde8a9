// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bookkeeping for the buffers that feed a connectivity build.

use serde::{Deserialize, Serialize};

use crate::buffer::{IndexSource, VertexSource};
use crate::error::{Error, Result};

/// How an index buffer is assembled into triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PrimitiveTopology {
    /// Three indices per triangle.
    #[default]
    TriangleList,
    /// Each index after the first two adds a triangle with the previous two.
    TriangleStrip,
    /// Each index after the first two adds a triangle with the first and previous index.
    TriangleFan,
}

impl PrimitiveTopology {
    /// Number of triangles encoded by `index_count` indices.
    pub fn triangle_count(self, index_count: usize) -> usize {
        match self {
            PrimitiveTopology::TriangleList => index_count / 3,
            PrimitiveTopology::TriangleStrip | PrimitiveTopology::TriangleFan => {
                index_count.saturating_sub(2)
            }
        }
    }

    /// Positions in the index buffer of the three corners of triangle `t`,
    /// in counter-clockwise order.
    ///
    /// Odd strip triangles swap their first two corners so the whole strip
    /// keeps the winding of its first triangle.
    #[inline]
    pub fn corners(self, t: usize) -> [usize; 3] {
        match self {
            PrimitiveTopology::TriangleList => [3 * t, 3 * t + 1, 3 * t + 2],
            PrimitiveTopology::TriangleStrip if t % 2 == 1 => [t + 1, t, t + 2],
            PrimitiveTopology::TriangleStrip => [t, t + 1, t + 2],
            PrimitiveTopology::TriangleFan => [0, t + 1, t + 2],
        }
    }
}

/// An index buffer registered with the collector.
#[derive(Clone, Copy)]
pub struct IndexSourceEntry<'a> {
    pub source: &'a dyn IndexSource,
    /// Vertex set the indices refer to.
    pub vertex_set: usize,
    pub topology: PrimitiveTopology,
}

/// Accumulates vertex and index sources prior to a build.
///
/// Vertex set ids and index set ids are insertion positions. The collector
/// holds borrowed references; the buffers stay owned by the caller.
#[derive(Default)]
pub struct GeometrySourceCollector<'a> {
    vertex_sources: Vec<&'a dyn VertexSource>,
    index_sources: Vec<IndexSourceEntry<'a>>,
}

impl<'a> GeometrySourceCollector<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a position buffer and returns its vertex set id.
    pub fn add_vertex_source(&mut self, source: &'a dyn VertexSource) -> usize {
        self.vertex_sources.push(source);
        self.vertex_sources.len() - 1
    }

    /// Registers an index buffer that indexes into `vertex_set` and returns
    /// its index set id.
    pub fn add_index_source(
        &mut self,
        source: &'a dyn IndexSource,
        vertex_set: usize,
        topology: PrimitiveTopology,
    ) -> usize {
        self.index_sources.push(IndexSourceEntry {
            source,
            vertex_set,
            topology,
        });
        self.index_sources.len() - 1
    }

    /// Registers a triangle list indexing into vertex set 0.
    pub fn add_triangle_list(&mut self, source: &'a dyn IndexSource) -> usize {
        self.add_index_source(source, 0, PrimitiveTopology::TriangleList)
    }

    pub fn vertex_sources(&self) -> &[&'a dyn VertexSource] {
        &self.vertex_sources
    }

    pub fn index_sources(&self) -> &[IndexSourceEntry<'a>] {
        &self.index_sources
    }

    /// Looks up a vertex source by vertex set id.
    pub fn vertex_source(&self, vertex_set: usize) -> Result<&'a dyn VertexSource> {
        self.vertex_sources
            .get(vertex_set)
            .copied()
            .ok_or(Error::VertexSetOutOfRange {
                vertex_set,
                available: self.vertex_sources.len(),
            })
    }

    /// Checks that a build can be attempted.
    pub fn validate(&self) -> Result<()> {
        if self.vertex_sources.is_empty() {
            return Err(Error::Configuration(
                "at least one vertex source is required".to_string(),
            ));
        }
        if self.index_sources.is_empty() {
            return Err(Error::Configuration(
                "at least one index source is required".to_string(),
            ));
        }
        for entry in &self.index_sources {
            self.vertex_source(entry.vertex_set)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{IndexBuffer, PositionBuffer};

    #[test]
    fn ids_are_insertion_positions() {
        let v0 = PositionBuffer::zeroed(3);
        let v1 = PositionBuffer::zeroed(3);
        let i0 = IndexBuffer::from_u16(vec![0, 1, 2]);
        let i1 = IndexBuffer::from_u16(vec![0, 1, 2]);

        let mut collector = GeometrySourceCollector::new();
        assert_eq!(collector.add_vertex_source(&v0), 0);
        assert_eq!(collector.add_vertex_source(&v1), 1);
        assert_eq!(collector.add_triangle_list(&i0), 0);
        assert_eq!(
            collector.add_index_source(&i1, 1, PrimitiveTopology::TriangleStrip),
            1
        );
        assert_eq!(collector.index_sources()[1].vertex_set, 1);
        assert!(collector.validate().is_ok());
    }

    #[test]
    fn empty_collector_is_a_configuration_error() {
        let collector = GeometrySourceCollector::new();
        assert!(matches!(collector.validate(), Err(Error::Configuration(_))));

        let v0 = PositionBuffer::zeroed(3);
        let mut collector = GeometrySourceCollector::new();
        collector.add_vertex_source(&v0);
        assert!(matches!(collector.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn unknown_vertex_set_is_rejected() {
        let v0 = PositionBuffer::zeroed(3);
        let i0 = IndexBuffer::from_u16(vec![0, 1, 2]);
        let mut collector = GeometrySourceCollector::new();
        collector.add_vertex_source(&v0);
        collector.add_index_source(&i0, 3, PrimitiveTopology::TriangleList);
        assert!(matches!(
            collector.validate(),
            Err(Error::VertexSetOutOfRange {
                vertex_set: 3,
                available: 1,
            })
        ));
    }

    #[test]
    fn default_topology_is_list() {
        assert_eq!(
            PrimitiveTopology::default(),
            PrimitiveTopology::TriangleList
        );
    }

    #[test]
    fn triangle_counts() {
        assert_eq!(PrimitiveTopology::TriangleList.triangle_count(7), 2);
        assert_eq!(PrimitiveTopology::TriangleStrip.triangle_count(5), 3);
        assert_eq!(PrimitiveTopology::TriangleFan.triangle_count(2), 0);
    }

    #[test]
    fn strip_keeps_winding() {
        let strip = PrimitiveTopology::TriangleStrip;
        assert_eq!(strip.corners(0), [0, 1, 2]);
        assert_eq!(strip.corners(1), [2, 1, 3]);
        assert_eq!(strip.corners(2), [2, 3, 4]);
    }

    #[test]
    fn fan_anchors_first_index() {
        let fan = PrimitiveTopology::TriangleFan;
        assert_eq!(fan.corners(0), [0, 1, 2]);
        assert_eq!(fan.corners(3), [0, 4, 5]);
    }
}
