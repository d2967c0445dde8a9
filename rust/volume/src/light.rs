// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light descriptors as seen by shadow volume extrusion.

use nalgebra::{Vector3, Vector4};

/// A shadow-casting light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    /// Parallel light travelling along `direction`.
    Directional { direction: Vector3<f32> },
    /// Omnidirectional light with an attenuation range.
    Point { position: Vector3<f32>, range: f32 },
    /// Cone light; only its position and range matter for extrusion.
    Spot {
        position: Vector3<f32>,
        direction: Vector3<f32>,
        range: f32,
    },
}

impl Light {
    pub fn directional(direction: Vector3<f32>) -> Self {
        Light::Directional { direction }
    }

    pub fn point(position: Vector3<f32>, range: f32) -> Self {
        Light::Point { position, range }
    }

    pub fn spot(position: Vector3<f32>, direction: Vector3<f32>, range: f32) -> Self {
        Light::Spot {
            position,
            direction,
            range,
        }
    }

    pub fn is_directional(&self) -> bool {
        matches!(self, Light::Directional { .. })
    }

    /// Homogeneous light vector.
    ///
    /// Directional lights give the unit direction *towards* the light with
    /// `w = 0`; point and spot lights give their position with `w = 1`.
    pub fn as_homogeneous(&self) -> Vector4<f32> {
        match self {
            Light::Directional { direction } => {
                let to_light = -direction.try_normalize(f32::EPSILON).unwrap_or(*direction);
                Vector4::new(to_light.x, to_light.y, to_light.z, 0.0)
            }
            Light::Point { position, .. } | Light::Spot { position, .. } => {
                Vector4::new(position.x, position.y, position.z, 1.0)
            }
        }
    }

    /// How far to extrude an object centred at `object_center`.
    ///
    /// Directional lights have no range, so `directional_distance` is used
    /// as-is. Positional lights extrude to the end of their attenuation
    /// range, never below zero.
    pub fn extrusion_distance(
        &self,
        object_center: &Vector3<f32>,
        directional_distance: f32,
    ) -> f32 {
        match self {
            Light::Directional { .. } => directional_distance,
            Light::Point { position, range } | Light::Spot { position, range, .. } => {
                (range - (object_center - position).norm()).max(0.0)
            }
        }
    }
}
