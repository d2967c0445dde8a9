// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Software vertex and bounds extrusion.
//!
//! Shadow volumes use a doubled vertex buffer: the first half holds the
//! original positions and the second half the same vertices pushed away from
//! the light. Silhouette quads then index across both halves.

use nalgebra::{Vector3, Vector4};
use shadow_lite_edges::Position;

use crate::error::{Error, Result};

/// Fills the second half of `positions` with the first `original_vertex_count`
/// vertices extruded away from `light` by `extrude_distance`.
///
/// `light` is homogeneous: with `w == 0` every vertex moves along the
/// negated light vector, otherwise each vertex moves away from the light
/// position.
pub fn extrude_vertices(
    positions: &mut [Position],
    original_vertex_count: usize,
    light: &Vector4<f32>,
    extrude_distance: f32,
) -> Result<()> {
    let required = original_vertex_count * 2;
    if positions.len() < required {
        return Err(Error::BufferOverrun {
            required,
            capacity: positions.len(),
        });
    }
    if !extrude_distance.is_finite() {
        return Err(Error::InvalidExtrusion(format!(
            "extrusion distance must be finite, got {extrude_distance}"
        )));
    }

    let (originals, extruded) = positions.split_at_mut(original_vertex_count);
    let light_xyz = light.xyz();

    if light.w == 0.0 {
        let offset = direction(&-light_xyz) * extrude_distance;
        for (src, dst) in originals.iter().zip(extruded.iter_mut()) {
            *dst = offset_position(src, &offset);
        }
    } else {
        for (src, dst) in originals.iter().zip(extruded.iter_mut()) {
            let v = Vector3::new(src[0], src[1], src[2]);
            let offset = direction(&(v - light_xyz)) * extrude_distance;
            *dst = offset_position(src, &offset);
        }
    }

    Ok(())
}

#[inline]
fn direction(v: &Vector3<f32>) -> Vector3<f32> {
    v.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros)
}

#[inline]
fn offset_position(p: &Position, offset: &Vector3<f32>) -> Position {
    [p[0] + offset.x, p[1] + offset.y, p[2] + offset.z]
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every position, or `None` for an empty slice.
    pub fn from_positions(positions: &[Position]) -> Option<Self> {
        let (first, rest) = positions.split_first()?;
        let start = Vector3::from(*first);
        let mut bounds = Self::new(start, start);
        for p in rest {
            bounds.include(&Vector3::from(*p));
        }
        Some(bounds)
    }

    /// Grows the box to contain `p`.
    pub fn include(&mut self, p: &Vector3<f32>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    /// The eight corners.
    pub fn corners(&self) -> [Vector3<f32>; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vector3::new(a.x, a.y, a.z),
            Vector3::new(b.x, a.y, a.z),
            Vector3::new(b.x, b.y, a.z),
            Vector3::new(a.x, b.y, a.z),
            Vector3::new(a.x, a.y, b.z),
            Vector3::new(b.x, a.y, b.z),
            Vector3::new(b.x, b.y, b.z),
            Vector3::new(a.x, b.y, b.z),
        ]
    }
}

/// Bounds of the far end of a shadow volume cast by geometry inside `bounds`.
///
/// Directional extrusion moves every point by the same offset, so the box is
/// translated. Positional extrusion moves each corner away from the light
/// and refits the box around the moved corners.
pub fn extrude_bounds(bounds: &Aabb, light: &Vector4<f32>, extrude_distance: f32) -> Aabb {
    let light_xyz = light.xyz();

    if light.w == 0.0 {
        let offset = direction(&-light_xyz) * extrude_distance;
        return Aabb::new(bounds.min + offset, bounds.max + offset);
    }

    let corners = bounds.corners();
    let moved = |c: &Vector3<f32>| c + direction(&(c - light_xyz)) * extrude_distance;
    let first = moved(&corners[0]);
    let mut result = Aabb::new(first, first);
    for c in &corners[1..] {
        result.include(&moved(c));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn directional_extrusion_moves_away_from_light() {
        let mut positions = vec![[0.0, 0.0, 0.0], [0.0; 3]];
        extrude_vertices(&mut positions, 1, &Vector4::new(0.0, 0.0, -1.0, 0.0), 5.0).unwrap();
        assert_eq!(positions[1], [0.0, 0.0, 5.0]);
        assert_eq!(positions[0], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn point_extrusion_is_per_vertex() {
        let mut positions = vec![[1.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0; 3], [0.0; 3]];
        extrude_vertices(&mut positions, 2, &Vector4::new(0.0, 0.0, 0.0, 1.0), 3.0).unwrap();
        assert_relative_eq!(Vector3::from(positions[2]), Vector3::new(4.0, 0.0, 0.0));
        assert_relative_eq!(Vector3::from(positions[3]), Vector3::new(0.0, 5.0, 0.0));
    }

    #[test]
    fn vertex_at_light_stays_put() {
        let mut positions = vec![[1.0, 1.0, 1.0], [0.0; 3]];
        extrude_vertices(&mut positions, 1, &Vector4::new(1.0, 1.0, 1.0, 1.0), 3.0).unwrap();
        assert_eq!(positions[1], [1.0, 1.0, 1.0]);
    }

    #[test]
    fn undersized_buffer_is_rejected() {
        let mut positions = vec![[0.0; 3]; 3];
        assert!(matches!(
            extrude_vertices(&mut positions, 2, &Vector4::z(), 1.0),
            Err(Error::BufferOverrun {
                required: 4,
                capacity: 3,
            })
        ));
    }

    #[test]
    fn infinite_distance_is_rejected() {
        let mut positions = vec![[0.0; 3]; 2];
        assert!(matches!(
            extrude_vertices(&mut positions, 1, &Vector4::z(), f32::INFINITY),
            Err(Error::InvalidExtrusion(_))
        ));
    }

    #[test]
    fn directional_bounds_translate() {
        let bounds = Aabb::new(Vector3::zeros(), Vector3::new(1.0, 1.0, 1.0));
        let far = extrude_bounds(&bounds, &Vector4::new(0.0, 1.0, 0.0, 0.0), 10.0);
        assert_relative_eq!(far.min, Vector3::new(0.0, -10.0, 0.0));
        assert_relative_eq!(far.max, Vector3::new(1.0, -9.0, 1.0));
    }

    #[test]
    fn point_bounds_refit_corners() {
        let bounds = Aabb::new(Vector3::new(-1.0, 1.0, -1.0), Vector3::new(1.0, 2.0, 1.0));
        let far = extrude_bounds(&bounds, &Vector4::new(0.0, 0.0, 0.0, 1.0), 10.0);
        // Every corner moves outward, so the far box sits higher and wider.
        assert!(far.min.y > bounds.min.y);
        assert!(far.max.x > bounds.max.x);
        assert!(far.min.x < bounds.min.x);
    }

    #[test]
    fn bounds_from_positions() {
        let bounds = Aabb::from_positions(&[[1.0, -2.0, 0.0], [-1.0, 3.0, 0.5]]).unwrap();
        assert_eq!(bounds.min, Vector3::new(-1.0, -2.0, 0.0));
        assert_eq!(bounds.max, Vector3::new(1.0, 3.0, 0.5));
        assert_eq!(bounds.center(), Vector3::new(0.0, 0.5, 0.25));
        assert!(Aabb::from_positions(&[]).is_none());
    }
}
