// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Shadow-Lite Volume
//!
//! Shadow volume extrusion on top of `shadow-lite-edges`.
//!
//! Given classified [`EdgeData`](shadow_lite_edges::EdgeData) and a [`Light`],
//! [`generate_shadow_volume`] writes the index list of the volume's side
//! walls along the silhouette, optionally closed by a dark cap (far end) and
//! a light cap (near end). [`extrude_vertices`] fills the extruded half of
//! the doubled vertex buffer those indices refer to, and [`ShadowCaster`]
//! ties both together for a single mesh.

pub mod caster;
pub mod error;
pub mod extrude;
pub mod light;
pub mod volume;

pub use caster::ShadowCaster;
pub use error::{Error, Result};
pub use extrude::{extrude_bounds, extrude_vertices, Aabb};
pub use light::Light;
pub use volume::{
    count_shadow_indices, generate_shadow_volume, shadow_index_upper_bound, ExtrusionOptions,
    IndexRange, ShadowVolumeRange, DEFAULT_EXTRUSION_DISTANCE,
};
