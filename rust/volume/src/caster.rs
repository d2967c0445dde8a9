// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Software shadow volume pipeline for one mesh.
//!
//! [`ShadowCaster`] owns the mesh's [`EdgeData`] and one doubled position
//! buffer per vertex set. Each update classifies triangles for the light,
//! extrudes the second half of every position buffer, and writes the volume
//! indices. Vertex sets map one-to-one onto edge groups.

use shadow_lite_edges::{
    ConnectivityBuilder, EdgeData, IndexBuffer, PositionBuffer, VertexReadLock, VertexSource,
};

use crate::error::{Error, Result};
use crate::extrude::{extrude_bounds, extrude_vertices, Aabb};
use crate::light::Light;
use crate::volume::{generate_shadow_volume, ExtrusionOptions, ShadowVolumeRange};

/// Edge data plus extrusion buffers for a shadow-casting mesh.
#[derive(Debug)]
pub struct ShadowCaster {
    edge_data: EdgeData,
    shadow_positions: Vec<PositionBuffer>,
}

impl ShadowCaster {
    /// Builds the edge list and copies every registered vertex source into
    /// its shadow buffer.
    pub fn build(builder: &mut ConnectivityBuilder<'_>) -> Result<Self> {
        let edge_data = builder.build()?;
        let sources = builder.sources().vertex_sources().to_vec();
        Self::new(edge_data, &sources)
    }

    /// Wraps previously built edge data. `sources[i]` must be the vertex
    /// source of vertex set `i`.
    pub fn new(edge_data: EdgeData, sources: &[&dyn VertexSource]) -> Result<Self> {
        if sources.len() != edge_data.edge_groups.len() {
            return Err(Error::InvalidExtrusion(format!(
                "{} vertex sources supplied for {} edge groups",
                sources.len(),
                edge_data.edge_groups.len()
            )));
        }

        let shadow_positions = sources
            .iter()
            .zip(&edge_data.edge_groups)
            .map(|(source, group)| shadow_buffer(*source, group.vertex_count))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            edge_data,
            shadow_positions,
        })
    }

    pub fn edge_data(&self) -> &EdgeData {
        &self.edge_data
    }

    /// Doubled position buffer for `vertex_set`: originals, then extruded copies.
    pub fn shadow_positions(&self, vertex_set: usize) -> Option<&PositionBuffer> {
        self.shadow_positions.get(vertex_set)
    }

    /// Refreshes the original positions of `vertex_set` and the normals of
    /// its triangles after the mesh deformed.
    pub fn update_positions(&mut self, vertex_set: usize, source: &dyn VertexSource) -> Result<()> {
        let vertex_count = self
            .edge_data
            .edge_groups
            .get(vertex_set)
            .map(|g| g.vertex_count)
            .ok_or_else(|| {
                Error::InvalidExtrusion(format!("vertex set {vertex_set} has no edge group"))
            })?;

        {
            let lock = VertexReadLock::acquire(source)?;
            if lock.len() != vertex_count {
                return Err(Error::InvalidExtrusion(format!(
                    "vertex set {vertex_set} changed size from {vertex_count} to {}",
                    lock.len()
                )));
            }
            self.shadow_positions[vertex_set].as_mut_slice()[..vertex_count]
                .copy_from_slice(lock.positions());
        }

        self.edge_data.update_face_normals(vertex_set, source)?;
        Ok(())
    }

    /// Bounds of the original (non-extruded) geometry.
    pub fn bounds(&self) -> Option<Aabb> {
        self.edge_data
            .edge_groups
            .iter()
            .zip(&self.shadow_positions)
            .filter_map(|(group, buffer)| {
                Aabb::from_positions(&buffer.as_slice()[..group.vertex_count])
            })
            .reduce(|mut acc, b| {
                acc.include(&b.min);
                acc.include(&b.max);
                acc
            })
    }

    /// Extrusion distance for this mesh, measured from its bounds centre.
    pub fn extrusion_distance(&self, light: &Light, directional_distance: f32) -> f32 {
        match self.bounds() {
            Some(bounds) => light.extrusion_distance(&bounds.center(), directional_distance),
            None => directional_distance,
        }
    }

    /// Bounds of the far end of the shadow volume.
    pub fn dark_cap_bounds(&self, light: &Light, extrude_distance: f32) -> Option<Aabb> {
        self.bounds()
            .map(|b| extrude_bounds(&b, &light.as_homogeneous(), extrude_distance))
    }

    /// Classifies, extrudes and writes the shadow volume for `light`.
    ///
    /// Extrusion happens here in software, so the extruded vertices are
    /// always at `options.extrusion_distance` and the volume is generated as
    /// finite whatever `options.extrude_to_infinity` says.
    pub fn update_shadow_volume(
        &mut self,
        light: &Light,
        options: &ExtrusionOptions,
        dest: &mut IndexBuffer,
        index_start: usize,
    ) -> Result<Vec<ShadowVolumeRange>> {
        let homogeneous = light.as_homogeneous();
        self.edge_data.classify_triangles(&homogeneous);

        for (group, buffer) in self
            .edge_data
            .edge_groups
            .iter()
            .zip(self.shadow_positions.iter_mut())
        {
            extrude_vertices(
                buffer.as_mut_slice(),
                group.vertex_count,
                &homogeneous,
                options.extrusion_distance,
            )?;
        }

        let finite = ExtrusionOptions {
            extrude_to_infinity: false,
            ..*options
        };
        generate_shadow_volume(&self.edge_data, light, dest, index_start, &finite)
    }
}

fn shadow_buffer(source: &dyn VertexSource, vertex_count: usize) -> Result<PositionBuffer> {
    let lock = VertexReadLock::acquire(source)?;
    if lock.len() != vertex_count {
        return Err(Error::InvalidExtrusion(format!(
            "vertex source has {} vertices, edge data expects {vertex_count}",
            lock.len()
        )));
    }

    let mut positions = Vec::with_capacity(vertex_count * 2);
    positions.extend_from_slice(lock.positions());
    positions.extend_from_slice(lock.positions());
    Ok(PositionBuffer::new(positions))
}
