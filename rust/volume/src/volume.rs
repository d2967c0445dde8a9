// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shadow volume index generation.
//!
//! One index range is produced per edge group (vertex set). Indices below
//! `N` (the group's original vertex count) address original vertices; `i + N`
//! addresses the extruded copy of vertex `i` in the doubled vertex buffer.
//!
//! Generation always runs twice: a counting pass sizes the output and checks
//! that every index fits the destination width, then a writing pass fills
//! the buffer. An undersized buffer is therefore rejected before any index
//! is written.

use shadow_lite_edges::{EdgeData, EdgeGroup, IndexBuffer, IndexWidth, SilhouetteSide};

use crate::error::{Error, Result};
use crate::light::Light;

/// Default distance used for finite extrusion of directional lights.
pub const DEFAULT_EXTRUSION_DISTANCE: f32 = 10_000.0;

/// Controls which parts of the shadow volume are generated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtrusionOptions {
    /// Extruded vertices lie at infinity (homogeneous `w = 0`).
    pub extrude_to_infinity: bool,
    /// Distance used when extruding in software.
    pub extrusion_distance: f32,
    /// Close the far end of the volume.
    pub include_dark_cap: bool,
    /// Close the near end of the volume with the lit triangles.
    pub include_light_cap: bool,
    /// Write the light cap as its own range after the volume, so it can be
    /// rendered with a different depth function.
    pub separate_light_cap: bool,
}

impl Default for ExtrusionOptions {
    fn default() -> Self {
        Self {
            extrude_to_infinity: true,
            extrusion_distance: DEFAULT_EXTRUSION_DISTANCE,
            include_dark_cap: false,
            include_light_cap: false,
            separate_light_cap: false,
        }
    }
}

/// A contiguous run of indices in the destination buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexRange {
    pub start: usize,
    pub count: usize,
}

impl IndexRange {
    pub fn end(&self) -> usize {
        self.start + self.count
    }
}

/// Index ranges written for one edge group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowVolumeRange {
    pub vertex_set: usize,
    /// Side walls, plus dark cap and (unless separate) light cap.
    pub volume: IndexRange,
    /// Present only when a separate light cap was requested.
    pub light_cap: Option<IndexRange>,
}

impl ShadowVolumeRange {
    /// Total indices written for this group.
    pub fn index_count(&self) -> usize {
        self.volume.count + self.light_cap.map_or(0, |r| r.count)
    }
}

/// Generates shadow volume indices for every edge group into `dest`,
/// starting at `index_start`.
///
/// Triangles must already be classified for `light`
/// (see [`EdgeData::classify_triangles`]).
///
/// # Errors
///
/// [`Error::BufferOverrun`] when `dest` cannot hold the output and
/// [`Error::IndexOverflow`] when an index does not fit its element width.
/// Both are detected before anything is written; `edge_data` stays usable.
pub fn generate_shadow_volume(
    edge_data: &EdgeData,
    light: &Light,
    dest: &mut IndexBuffer,
    index_start: usize,
    options: &ExtrusionOptions,
) -> Result<Vec<ShadowVolumeRange>> {
    let mut counter = CountingSink::new(index_start);
    emit(edge_data, light.is_directional(), options, &mut counter)?;

    let capacity = dest.len();
    if counter.cursor > capacity {
        return Err(Error::BufferOverrun {
            required: counter.cursor,
            capacity,
        });
    }
    let width = dest.width();
    if u64::from(counter.max_index) > u64::from(width.max_value()) {
        return Err(Error::IndexOverflow {
            value: u64::from(counter.max_index),
            width,
        });
    }

    let mut writer = BufferSink {
        buffer: dest,
        cursor: index_start,
    };
    let ranges = emit(edge_data, light.is_directional(), options, &mut writer)?;

    for range in &ranges {
        tracing::debug!(
            vertex_set = range.vertex_set,
            start = range.volume.start,
            volume_indices = range.volume.count,
            light_cap_indices = range.light_cap.map_or(0, |r| r.count),
            "Generated shadow volume"
        );
    }
    Ok(ranges)
}

/// Exact number of indices [`generate_shadow_volume`] would write.
pub fn count_shadow_indices(
    edge_data: &EdgeData,
    light: &Light,
    options: &ExtrusionOptions,
) -> Result<usize> {
    let mut counter = CountingSink::new(0);
    emit(edge_data, light.is_directional(), options, &mut counter)?;
    Ok(counter.cursor)
}

/// Light-independent upper bound on the number of indices generated:
/// six per edge, plus three per triangle for each requested cap.
pub fn shadow_index_upper_bound(edge_data: &EdgeData, options: &ExtrusionOptions) -> usize {
    let caps = usize::from(options.include_dark_cap) + usize::from(options.include_light_cap);
    6 * edge_data.edge_count() + 3 * edge_data.triangle_count() * caps
}

trait IndexSink {
    fn push(&mut self, index: u32) -> Result<()>;

    /// Position the next index will be written at.
    fn cursor(&self) -> usize;

    fn push_triangle(&mut self, a: u32, b: u32, c: u32) -> Result<()> {
        self.push(a)?;
        self.push(b)?;
        self.push(c)
    }
}

struct CountingSink {
    cursor: usize,
    max_index: u32,
}

impl CountingSink {
    fn new(start: usize) -> Self {
        Self {
            cursor: start,
            max_index: 0,
        }
    }
}

impl IndexSink for CountingSink {
    fn push(&mut self, index: u32) -> Result<()> {
        self.cursor += 1;
        self.max_index = self.max_index.max(index);
        Ok(())
    }

    fn cursor(&self) -> usize {
        self.cursor
    }
}

struct BufferSink<'a> {
    buffer: &'a mut IndexBuffer,
    cursor: usize,
}

impl IndexSink for BufferSink<'_> {
    fn push(&mut self, index: u32) -> Result<()> {
        let capacity = self.buffer.len();
        if self.cursor >= capacity {
            return Err(Error::BufferOverrun {
                required: self.cursor + 1,
                capacity,
            });
        }
        let width = self.buffer.width();
        if index > width.max_value() {
            return Err(Error::IndexOverflow {
                value: u64::from(index),
                width,
            });
        }
        self.buffer.set(self.cursor, index)?;
        self.cursor += 1;
        Ok(())
    }

    fn cursor(&self) -> usize {
        self.cursor
    }
}

fn emit<S: IndexSink>(
    edge_data: &EdgeData,
    directional: bool,
    options: &ExtrusionOptions,
    sink: &mut S,
) -> Result<Vec<ShadowVolumeRange>> {
    // A single fan closes the far end only when the silhouette is one closed
    // loop and every extruded vertex converges on the same point.
    let use_fan_dark_cap = directional && options.extrude_to_infinity && edge_data.is_closed;

    edge_data
        .edge_groups
        .iter()
        .map(|group| {
            emit_group(
                edge_data,
                group,
                directional,
                use_fan_dark_cap,
                options,
                &mut *sink,
            )
        })
        .collect()
}

fn emit_group<S: IndexSink>(
    edge_data: &EdgeData,
    group: &EdgeGroup,
    directional: bool,
    use_fan_dark_cap: bool,
    options: &ExtrusionOptions,
    sink: &mut S,
) -> Result<ShadowVolumeRange> {
    let n = u32::try_from(group.vertex_count).map_err(|_| Error::IndexOverflow {
        value: group.vertex_count as u64,
        width: IndexWidth::U32,
    })?;
    let ext = |i: u32| -> Result<u32> {
        i.checked_add(n).ok_or(Error::IndexOverflow {
            value: u64::from(i) + u64::from(n),
            width: IndexWidth::U32,
        })
    };
    let close_quads = !(directional && options.extrude_to_infinity);

    let start = sink.cursor();
    let mut fan_anchor: Option<u32> = None;

    for edge in &group.edges {
        // (a, b) runs counter-clockwise around the lit triangle.
        let (a, b) = match edge.silhouette(&edge_data.triangles) {
            Some(SilhouetteSide::First) => (edge.vert_index[0], edge.vert_index[1]),
            Some(SilhouetteSide::Second) => (edge.vert_index[1], edge.vert_index[0]),
            None => continue,
        };
        let (a_far, b_far) = (ext(a)?, ext(b)?);

        sink.push_triangle(b, a, a_far)?;
        if close_quads {
            sink.push_triangle(a_far, b_far, b)?;
        }

        if use_fan_dark_cap && options.include_dark_cap {
            match fan_anchor {
                None => fan_anchor = Some(a_far),
                Some(anchor) => sink.push_triangle(anchor, b_far, a_far)?,
            }
        }
    }

    if options.include_dark_cap && !use_fan_dark_cap {
        for tri in lit_triangles(edge_data, group) {
            let [v0, v1, v2] = tri;
            sink.push_triangle(ext(v0)?, ext(v2)?, ext(v1)?)?;
        }
    }

    let mut volume = IndexRange { start, count: 0 };
    let mut light_cap = None;

    if options.include_light_cap {
        if options.separate_light_cap {
            volume.count = sink.cursor() - start;
        }
        let cap_start = sink.cursor();
        for [v0, v1, v2] in lit_triangles(edge_data, group) {
            sink.push_triangle(v0, v1, v2)?;
        }
        if options.separate_light_cap {
            light_cap = Some(IndexRange {
                start: cap_start,
                count: sink.cursor() - cap_start,
            });
        }
    }

    if light_cap.is_none() {
        volume.count = sink.cursor() - start;
    }

    Ok(ShadowVolumeRange {
        vertex_set: group.vertex_set,
        volume,
        light_cap,
    })
}

fn lit_triangles<'a>(
    edge_data: &'a EdgeData,
    group: &'a EdgeGroup,
) -> impl Iterator<Item = [u32; 3]> + 'a {
    group
        .triangles
        .iter()
        .map(move |&t| &edge_data.triangles[t])
        .filter(|t| t.light_facing)
        .map(|t| t.vert_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use shadow_lite_edges::{ConnectivityBuilder, PositionBuffer, PrimitiveTopology};

    /// Single up-facing triangle: every edge is an open boundary.
    fn lone_triangle(lit: bool) -> EdgeData {
        let positions = PositionBuffer::from_flat(&[
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0,
        ]);
        let indices = IndexBuffer::from_u16(vec![0, 1, 2]);
        let mut builder = ConnectivityBuilder::new();
        builder.add_vertex_source(&positions);
        builder.add_index_source(&indices, 0, PrimitiveTopology::TriangleList);
        let mut data = builder.build().unwrap();
        let z = if lit { 1.0 } else { -1.0 };
        let light = Light::directional(Vector3::new(0.0, 0.0, -z));
        data.classify_triangles(&light.as_homogeneous());
        data
    }

    #[test]
    fn lit_boundary_edges_form_quads() {
        let data = lone_triangle(true);
        let light = Light::point(Vector3::new(0.0, 0.0, 5.0), 100.0);
        let options = ExtrusionOptions {
            extrude_to_infinity: false,
            ..Default::default()
        };
        let mut dest = IndexBuffer::zeroed(IndexWidth::U16, 18);
        let ranges = generate_shadow_volume(&data, &light, &mut dest, 0, &options).unwrap();

        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].volume.start, 0);
        assert_eq!(ranges[0].volume.count, 18);
        // First edge 0 -> 1, original vertex count 3.
        assert_eq!(&dest.to_vec()[..6], &[1, 0, 3, 3, 4, 1]);
    }

    #[test]
    fn unlit_triangle_casts_nothing() {
        let data = lone_triangle(false);
        let light = Light::directional(Vector3::new(0.0, 0.0, 1.0));
        let options = ExtrusionOptions {
            include_light_cap: true,
            include_dark_cap: true,
            ..Default::default()
        };
        assert_eq!(count_shadow_indices(&data, &light, &options).unwrap(), 0);
    }

    #[test]
    fn open_mesh_uses_per_triangle_dark_cap() {
        let data = lone_triangle(true);
        let light = Light::directional(Vector3::new(0.0, 0.0, -1.0));
        let options = ExtrusionOptions {
            include_dark_cap: true,
            ..Default::default()
        };
        let mut dest = IndexBuffer::zeroed(IndexWidth::U32, 12);
        let ranges = generate_shadow_volume(&data, &light, &mut dest, 0, &options).unwrap();

        // Three single-triangle walls, then the reversed extruded triangle.
        assert_eq!(ranges[0].volume.count, 12);
        assert_eq!(&dest.to_vec()[9..], &[3, 5, 4]);
    }

    #[test]
    fn separate_light_cap_gets_its_own_range() {
        let data = lone_triangle(true);
        let light = Light::directional(Vector3::new(0.0, 0.0, -1.0));
        let options = ExtrusionOptions {
            include_light_cap: true,
            separate_light_cap: true,
            ..Default::default()
        };
        let mut dest = IndexBuffer::zeroed(IndexWidth::U16, 20);
        let ranges = generate_shadow_volume(&data, &light, &mut dest, 4, &options).unwrap();

        assert_eq!(ranges[0].volume, IndexRange { start: 4, count: 9 });
        let cap = ranges[0].light_cap.unwrap();
        assert_eq!(cap.start, 13);
        assert_eq!(cap.count, 3);
        assert_eq!(&dest.to_vec()[13..16], &[0, 1, 2]);
        assert_eq!(ranges[0].index_count(), 12);
    }

    #[test]
    fn undersized_destination_is_untouched() {
        let data = lone_triangle(true);
        let light = Light::directional(Vector3::new(0.0, 0.0, -1.0));
        let mut dest = IndexBuffer::zeroed(IndexWidth::U16, 8);
        let result = generate_shadow_volume(
            &data,
            &light,
            &mut dest,
            0,
            &ExtrusionOptions::default(),
        );

        assert!(matches!(
            result,
            Err(Error::BufferOverrun {
                required: 9,
                capacity: 8,
            })
        ));
        assert!(dest.to_vec().iter().all(|&i| i == 0));
    }

    #[test]
    fn upper_bound_covers_caps() {
        let data = lone_triangle(true);
        let options = ExtrusionOptions {
            include_dark_cap: true,
            include_light_cap: true,
            ..Default::default()
        };
        assert_eq!(shadow_index_upper_bound(&data, &options), 6 * 3 + 3 * 2);
        let light = Light::point(Vector3::new(0.0, 0.0, 5.0), 100.0);
        let exact = count_shadow_indices(&data, &light, &options).unwrap();
        assert!(exact <= shadow_index_upper_bound(&data, &options));
    }
}
