// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Diagnostic dumps of edge data.
//!
//! [`EdgeData`] implements `Display` for a human-readable adjacency listing,
//! and round-trips through JSON via [`EdgeDataSnapshot`] for offline
//! inspection of meshes that fail to build or extrude correctly.

use std::fmt;

use nalgebra::Vector4;
use serde::{Deserialize, Serialize};

use crate::edge_data::{Edge, EdgeData, EdgeGroup, Triangle};
use crate::error::{Error, Result};

/// Serializable representation of [`EdgeData`].
#[derive(Debug, Serialize, Deserialize)]
pub struct EdgeDataSnapshot {
    pub triangles: Vec<TriangleSnapshot>,
    pub edge_groups: Vec<EdgeGroupSnapshot>,
    pub is_closed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TriangleSnapshot {
    pub index_set: usize,
    pub vertex_set: usize,
    pub vert_index: [u32; 3],
    pub shared_vert_index: [usize; 3],
    pub normal: [f32; 4],
    pub light_facing: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EdgeGroupSnapshot {
    pub vertex_set: usize,
    pub vertex_count: usize,
    pub edges: Vec<EdgeSnapshot>,
    pub triangles: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub tri_index: [Option<usize>; 2],
    pub vert_index: [u32; 2],
    pub shared_vert_index: [usize; 2],
    pub degenerate: bool,
}

impl EdgeData {
    /// Serializes the edge data to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_snapshot())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserializes edge data from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: EdgeDataSnapshot =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        Self::from_snapshot(snapshot)
    }

    pub fn to_snapshot(&self) -> EdgeDataSnapshot {
        EdgeDataSnapshot {
            triangles: self
                .triangles
                .iter()
                .map(|t| TriangleSnapshot {
                    index_set: t.index_set,
                    vertex_set: t.vertex_set,
                    vert_index: t.vert_index,
                    shared_vert_index: t.shared_vert_index,
                    normal: [t.normal.x, t.normal.y, t.normal.z, t.normal.w],
                    light_facing: t.light_facing,
                })
                .collect(),
            edge_groups: self
                .edge_groups
                .iter()
                .map(|g| EdgeGroupSnapshot {
                    vertex_set: g.vertex_set,
                    vertex_count: g.vertex_count,
                    edges: g
                        .edges
                        .iter()
                        .map(|e| EdgeSnapshot {
                            tri_index: [Some(e.first_triangle), e.second_triangle],
                            vert_index: e.vert_index,
                            shared_vert_index: e.shared_vert_index,
                            degenerate: e.is_degenerate(),
                        })
                        .collect(),
                    triangles: g.triangles.clone(),
                })
                .collect(),
            is_closed: self.is_closed,
        }
    }

    /// Rebuilds edge data from a snapshot, validating triangle references.
    pub fn from_snapshot(snap: EdgeDataSnapshot) -> Result<Self> {
        let triangle_count = snap.triangles.len();
        let check = |index: usize| -> Result<usize> {
            if index < triangle_count {
                Ok(index)
            } else {
                Err(Error::Serialization(format!(
                    "triangle {index} referenced but only {triangle_count} triangles present"
                )))
            }
        };

        let triangles = snap
            .triangles
            .into_iter()
            .map(|t| Triangle {
                index_set: t.index_set,
                vertex_set: t.vertex_set,
                vert_index: t.vert_index,
                shared_vert_index: t.shared_vert_index,
                normal: Vector4::from(t.normal),
                light_facing: t.light_facing,
            })
            .collect();

        let mut edge_groups = Vec::with_capacity(snap.edge_groups.len());
        for g in snap.edge_groups {
            let mut edges = Vec::with_capacity(g.edges.len());
            for e in g.edges {
                let first = e.tri_index[0].ok_or_else(|| {
                    Error::Serialization("edge without a first triangle".to_string())
                })?;
                edges.push(Edge {
                    first_triangle: check(first)?,
                    second_triangle: e.tri_index[1].map(check).transpose()?,
                    vert_index: e.vert_index,
                    shared_vert_index: e.shared_vert_index,
                });
            }
            let group_triangles = g
                .triangles
                .into_iter()
                .map(check)
                .collect::<Result<Vec<_>>>()?;
            edge_groups.push(EdgeGroup {
                vertex_set: g.vertex_set,
                vertex_count: g.vertex_count,
                edges,
                triangles: group_triangles,
            });
        }

        let mut data = EdgeData {
            triangles,
            edge_groups,
            is_closed: snap.is_closed,
        };
        data.refresh_closed();
        Ok(data)
    }
}

impl fmt::Display for EdgeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Edge Data")?;
        writeln!(f, "---------")?;
        writeln!(
            f,
            "Triangles: {}  Edge groups: {}  Closed: {}",
            self.triangles.len(),
            self.edge_groups.len(),
            self.is_closed
        )?;

        for (i, t) in self.triangles.iter().enumerate() {
            writeln!(
                f,
                "Triangle {i} = [indexSet={}, vertexSet={}, v0={}, v1={}, v2={}, shared=({}, {}, {}), normal=({:.4}, {:.4}, {:.4}, {:.4}), lightFacing={}]",
                t.index_set,
                t.vertex_set,
                t.vert_index[0],
                t.vert_index[1],
                t.vert_index[2],
                t.shared_vert_index[0],
                t.shared_vert_index[1],
                t.shared_vert_index[2],
                t.normal.x,
                t.normal.y,
                t.normal.z,
                t.normal.w,
                t.light_facing
            )?;
        }

        for g in &self.edge_groups {
            writeln!(
                f,
                "Edge Group vertexSet={} ({} vertices, {} edges, {} triangles)",
                g.vertex_set,
                g.vertex_count,
                g.edges.len(),
                g.triangles.len()
            )?;
            for (i, e) in g.edges.iter().enumerate() {
                let second = e
                    .second_triangle
                    .map_or_else(|| "-".to_string(), |t| t.to_string());
                writeln!(
                    f,
                    "  Edge {i} = [tri0={}, tri1={second}, v0={}, v1={}, shared=({}, {}), degenerate={}]",
                    e.first_triangle,
                    e.vert_index[0],
                    e.vert_index[1],
                    e.shared_vert_index[0],
                    e.shared_vert_index[1],
                    e.is_degenerate()
                )?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{IndexBuffer, PositionBuffer};
    use crate::builder::ConnectivityBuilder;
    use crate::collector::PrimitiveTopology;

    fn quad_edges() -> EdgeData {
        let positions = PositionBuffer::from_flat(&[
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            1.0, 1.0, 0.0, //
            0.0, 1.0, 0.0,
        ]);
        let indices = IndexBuffer::from_u16(vec![0, 1, 2, 0, 2, 3]);
        let mut builder = ConnectivityBuilder::new();
        builder.add_vertex_source(&positions);
        builder.add_index_source(&indices, 0, PrimitiveTopology::TriangleList);
        builder.build().unwrap()
    }

    #[test]
    fn json_round_trip() {
        let data = quad_edges();
        let json = data.to_json().unwrap();
        let restored = EdgeData::from_json(&json).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn dangling_triangle_reference_is_rejected() {
        let mut snapshot = quad_edges().to_snapshot();
        snapshot.edge_groups[0].edges[0].tri_index[1] = Some(99);
        assert!(matches!(
            EdgeData::from_snapshot(snapshot),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn invalid_json_is_a_serialization_error() {
        assert!(matches!(
            EdgeData::from_json("{not json"),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn text_dump_lists_every_edge() {
        let data = quad_edges();
        let dump = data.to_string();
        assert!(dump.contains("Triangles: 2"));
        let edge_lines = dump.lines().filter(|l| l.starts_with("  Edge ")).count();
        assert_eq!(edge_lines, data.edge_count());
        assert!(dump.contains("degenerate=false"));
    }
}
