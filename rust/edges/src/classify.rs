// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light-facing classification and face normal refresh.

use nalgebra::Vector4;

use crate::buffer::{VertexReadLock, VertexSource};
use crate::edge_data::{face_normal, EdgeData};
use crate::error::Result;

impl EdgeData {
    /// Marks every triangle as light-facing or not.
    ///
    /// `light` is homogeneous: `(direction_to_light, 0)` for a directional
    /// light, `(position, 1)` for a point or spot light. A triangle faces the
    /// light when the 4D dot product with its plane is positive.
    pub fn classify_triangles(&mut self, light: &Vector4<f32>) {
        for tri in &mut self.triangles {
            tri.light_facing = tri.normal.dot(light) > 0.0;
        }
    }

    /// Number of triangles currently marked light-facing.
    pub fn light_facing_count(&self) -> usize {
        self.triangles.iter().filter(|t| t.light_facing).count()
    }

    /// Recomputes the normals of every triangle in `vertex_set` from the
    /// current contents of `positions`, leaving connectivity untouched.
    ///
    /// Used for deforming meshes (e.g. skinned animation) where positions
    /// change every frame but topology does not.
    pub fn update_face_normals(
        &mut self,
        vertex_set: usize,
        positions: &dyn VertexSource,
    ) -> Result<()> {
        let lock = VertexReadLock::acquire(positions)?;

        // Nothing is written until every triangle's corners were readable.
        let normals = self
            .triangles
            .iter()
            .enumerate()
            .filter(|(_, t)| t.vertex_set == vertex_set)
            .map(|(i, t)| -> Result<(usize, Vector4<f32>)> {
                let v0 = lock.position(t.vert_index[0])?;
                let v1 = lock.position(t.vert_index[1])?;
                let v2 = lock.position(t.vert_index[2])?;
                Ok((i, face_normal(&v0, &v1, &v2)))
            })
            .collect::<Result<Vec<_>>>()?;

        for (i, normal) in normals {
            self.triangles[i].normal = normal;
        }

        Ok(())
    }
}

/// Free-function form of [`EdgeData::classify_triangles`].
pub fn classify_triangles(edge_data: &mut EdgeData, light: &Vector4<f32>) {
    edge_data.classify_triangles(light);
}
