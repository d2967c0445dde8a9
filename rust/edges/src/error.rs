// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for edge list construction.

use crate::policy::WeldingPolicy;

/// Result type alias for edge list operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or querying edge data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The collector is missing vertex or index sources.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Every welding policy produced an edge shared by three or more triangles.
    #[error("geometry is not manifold: an edge is shared by more than two triangles under every welding policy ({attempts} attempts)")]
    NonManifoldGeometry { attempts: usize },

    /// An index source refers to a vertex set that was never registered.
    #[error("vertex set {vertex_set} is out of range ({available} vertex sources registered)")]
    VertexSetOutOfRange { vertex_set: usize, available: usize },

    /// A buffer read or write addressed an element past its end.
    #[error("index {index} is out of range for a buffer of {len} elements")]
    IndexOutOfRange { index: usize, len: usize },

    /// An index value does not fit the element width of its buffer.
    #[error("index value {value} does not fit a {width} index buffer")]
    IndexOverflow {
        value: u32,
        width: crate::buffer::IndexWidth,
    },

    /// A destination buffer is too small for the data written into it.
    #[error("buffer overrun: {required} elements required, capacity is {capacity}")]
    BufferOverrun { required: usize, capacity: usize },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A single welding attempt claimed one edge for a third triangle.
///
/// Internal to the policy cascade: the builder escalates to the next policy
/// and only reports [`Error::NonManifoldGeometry`] once every policy failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildConflict {
    /// Policy that was active when the conflict was found.
    pub policy: WeldingPolicy,
    /// The common vertex pair of the over-shared edge.
    pub shared_vertices: (usize, usize),
    /// Triangle that tried to claim the edge.
    pub triangle: usize,
}

impl std::fmt::Display for BuildConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "triangle {} is the third claim on edge ({}, {}) under {}",
            self.triangle, self.shared_vertices.0, self.shared_vertices.1, self.policy
        )
    }
}
