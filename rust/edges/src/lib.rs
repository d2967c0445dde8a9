// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Shadow-Lite Edges
//!
//! Triangle/edge adjacency for silhouette detection.
//!
//! Geometry arrives as one or more vertex-position buffers plus index buffers
//! tagged with the vertex set they address and their primitive topology. The
//! [`ConnectivityBuilder`] welds coincident vertices into common identities,
//! links every edge to the (at most two) triangles sharing it, and falls back
//! to progressively weaker welding whenever an edge ends up with three
//! triangles. The resulting [`EdgeData`] is classified against a light with
//! [`EdgeData::classify_triangles`] and consumed by the shadow volume
//! extruder.
//!
//! ```
//! use shadow_lite_edges::{ConnectivityBuilder, IndexBuffer, PositionBuffer, PrimitiveTopology};
//!
//! let positions = PositionBuffer::from_flat(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
//! let indices = IndexBuffer::from_u16(vec![0, 1, 2]);
//!
//! let mut builder = ConnectivityBuilder::new();
//! let vertex_set = builder.add_vertex_source(&positions);
//! builder.add_index_source(&indices, vertex_set, PrimitiveTopology::TriangleList);
//!
//! let edges = builder.build().unwrap();
//! assert_eq!(edges.triangle_count(), 1);
//! assert_eq!(edges.edge_count(), 3);
//! ```

pub mod buffer;
pub mod builder;
pub mod classify;
pub mod collector;
pub mod edge_data;
pub mod error;
pub mod policy;
pub mod serialization;
pub mod spatial;

pub use buffer::{
    IndexBuffer, IndexReadLock, IndexSlice, IndexSource, IndexWidth, Position, PositionBuffer,
    VertexReadLock, VertexSource,
};
pub use builder::{Attempt, ConnectivityBuilder};
pub use classify::classify_triangles;
pub use collector::{GeometrySourceCollector, IndexSourceEntry, PrimitiveTopology};
pub use edge_data::{face_normal, Edge, EdgeData, EdgeGroup, SilhouetteSide, Triangle};
pub use error::{BuildConflict, Error, Result};
pub use policy::{WeldTolerance, WeldingPolicy, DEFAULT_WELD_TOLERANCE};
pub use serialization::EdgeDataSnapshot;
