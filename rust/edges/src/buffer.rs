// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Read access to vertex-position and index buffers.
//!
//! Buffers are owned outside this crate (typically by a renderer that keeps
//! them GPU-resident). The builder only ever sees them through
//! [`VertexSource`] and [`IndexSource`], which follow a lock/unlock contract:
//! `begin_read` pins the buffer for CPU reads and `end_read` releases it.
//! [`VertexReadLock`] and [`IndexReadLock`] pair the two calls so a buffer is
//! released on every exit path, including early returns on error.
//!
//! [`PositionBuffer`] and [`IndexBuffer`] are plain in-memory implementations.
//! They double as the writable destination buffers for shadow volume
//! generation.

use std::cell::Cell;
use std::fmt;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single vertex position (x, y, z).
pub type Position = [f32; 3];

/// Element width of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexWidth {
    U16,
    U32,
}

impl IndexWidth {
    /// Largest index value representable at this width.
    pub fn max_value(self) -> u32 {
        match self {
            IndexWidth::U16 => u16::MAX as u32,
            IndexWidth::U32 => u32::MAX,
        }
    }

    /// Size of one element in bytes.
    pub fn size_in_bytes(self) -> usize {
        match self {
            IndexWidth::U16 => 2,
            IndexWidth::U32 => 4,
        }
    }
}

impl fmt::Display for IndexWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexWidth::U16 => f.write_str("16-bit"),
            IndexWidth::U32 => f.write_str("32-bit"),
        }
    }
}

/// Borrowed view of index data at its native width.
#[derive(Debug, Clone, Copy)]
pub enum IndexSlice<'a> {
    U16(&'a [u16]),
    U32(&'a [u32]),
}

impl<'a> IndexSlice<'a> {
    /// Number of indices in the slice.
    pub fn len(&self) -> usize {
        match self {
            IndexSlice::U16(s) => s.len(),
            IndexSlice::U32(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the index at `position`, widened to `u32`.
    #[inline]
    pub fn get(&self, position: usize) -> Option<u32> {
        match self {
            IndexSlice::U16(s) => s.get(position).map(|&i| i as u32),
            IndexSlice::U32(s) => s.get(position).copied(),
        }
    }

    pub fn width(&self) -> IndexWidth {
        match self {
            IndexSlice::U16(_) => IndexWidth::U16,
            IndexSlice::U32(_) => IndexWidth::U32,
        }
    }
}

/// A source of vertex positions.
pub trait VertexSource {
    /// Number of vertices in the buffer.
    fn vertex_count(&self) -> usize;

    /// Pins the buffer for CPU reads and returns its positions.
    ///
    /// Every successful call must be balanced by one [`end_read`](Self::end_read).
    /// Prefer [`VertexReadLock::acquire`], which does this automatically.
    fn begin_read(&self) -> Result<&[Position]>;

    /// Releases a read started with [`begin_read`](Self::begin_read).
    fn end_read(&self);
}

/// A source of 16- or 32-bit vertex indices.
pub trait IndexSource {
    /// Number of indices in the buffer.
    fn index_count(&self) -> usize;

    /// Width of each stored index.
    fn index_width(&self) -> IndexWidth;

    /// Pins the buffer for CPU reads and returns its indices.
    fn begin_read(&self) -> Result<IndexSlice<'_>>;

    /// Releases a read started with [`begin_read`](Self::begin_read).
    fn end_read(&self);
}

/// Scoped read access to a [`VertexSource`]. Released on drop.
pub struct VertexReadLock<'a> {
    source: &'a dyn VertexSource,
    positions: &'a [Position],
}

impl<'a> VertexReadLock<'a> {
    /// Begins a read on `source`.
    pub fn acquire(source: &'a dyn VertexSource) -> Result<Self> {
        let positions = source.begin_read()?;
        Ok(Self { source, positions })
    }

    /// Number of readable vertices.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Bounds-checked position lookup.
    #[inline]
    pub fn position(&self, index: u32) -> Result<Vector3<f32>> {
        self.positions
            .get(index as usize)
            .map(|p| Vector3::new(p[0], p[1], p[2]))
            .ok_or(Error::IndexOutOfRange {
                index: index as usize,
                len: self.positions.len(),
            })
    }

    /// All positions in the locked buffer.
    pub fn positions(&self) -> &'a [Position] {
        self.positions
    }
}

impl Drop for VertexReadLock<'_> {
    fn drop(&mut self) {
        self.source.end_read();
    }
}

/// Scoped read access to an [`IndexSource`]. Released on drop.
pub struct IndexReadLock<'a> {
    source: &'a dyn IndexSource,
    indices: IndexSlice<'a>,
}

impl<'a> IndexReadLock<'a> {
    /// Begins a read on `source`.
    pub fn acquire(source: &'a dyn IndexSource) -> Result<Self> {
        let indices = source.begin_read()?;
        Ok(Self { source, indices })
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Bounds-checked index lookup.
    #[inline]
    pub fn index(&self, position: usize) -> Result<u32> {
        self.indices.get(position).ok_or(Error::IndexOutOfRange {
            index: position,
            len: self.indices.len(),
        })
    }
}

impl Drop for IndexReadLock<'_> {
    fn drop(&mut self) {
        self.source.end_read();
    }
}

/// In-memory position buffer.
///
/// Tracks outstanding reads so callers can verify that every lock was
/// released. Mutation requires `&mut self`, which rules out writing while a
/// read lock is alive.
#[derive(Debug, Default)]
pub struct PositionBuffer {
    positions: Vec<Position>,
    readers: Cell<usize>,
}

impl PositionBuffer {
    /// Wraps a list of positions.
    pub fn new(positions: Vec<Position>) -> Self {
        Self {
            positions,
            readers: Cell::new(0),
        }
    }

    /// Builds a buffer from packed `x, y, z` coordinates. Trailing values that
    /// do not form a full triple are ignored.
    pub fn from_flat(coords: &[f32]) -> Self {
        Self::new(coords.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect())
    }

    /// Creates a zero-filled buffer of `count` vertices.
    pub fn zeroed(count: usize) -> Self {
        Self::new(vec![[0.0; 3]; count])
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Returns `true` while a read started with `begin_read` is outstanding.
    pub fn is_locked(&self) -> bool {
        self.readers.get() > 0
    }

    pub fn as_slice(&self) -> &[Position] {
        &self.positions
    }

    pub fn as_mut_slice(&mut self) -> &mut [Position] {
        &mut self.positions
    }
}

impl VertexSource for PositionBuffer {
    fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    fn begin_read(&self) -> Result<&[Position]> {
        self.readers.set(self.readers.get() + 1);
        Ok(&self.positions)
    }

    fn end_read(&self) {
        self.readers.set(self.readers.get().saturating_sub(1));
    }
}

#[derive(Debug, Clone)]
enum IndexStorage {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

/// In-memory index buffer with 16- or 32-bit storage.
#[derive(Debug)]
pub struct IndexBuffer {
    storage: IndexStorage,
    readers: Cell<usize>,
}

impl IndexBuffer {
    /// Wraps 16-bit indices.
    pub fn from_u16(indices: Vec<u16>) -> Self {
        Self {
            storage: IndexStorage::U16(indices),
            readers: Cell::new(0),
        }
    }

    /// Wraps 32-bit indices.
    pub fn from_u32(indices: Vec<u32>) -> Self {
        Self {
            storage: IndexStorage::U32(indices),
            readers: Cell::new(0),
        }
    }

    /// Creates a zero-filled buffer of `len` indices at the given width.
    pub fn zeroed(width: IndexWidth, len: usize) -> Self {
        match width {
            IndexWidth::U16 => Self::from_u16(vec![0; len]),
            IndexWidth::U32 => Self::from_u32(vec![0; len]),
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn width(&self) -> IndexWidth {
        self.as_slice().width()
    }

    pub fn is_locked(&self) -> bool {
        self.readers.get() > 0
    }

    pub fn as_slice(&self) -> IndexSlice<'_> {
        match &self.storage {
            IndexStorage::U16(v) => IndexSlice::U16(v),
            IndexStorage::U32(v) => IndexSlice::U32(v),
        }
    }

    /// Copies the contents out as 32-bit values.
    pub fn to_vec(&self) -> Vec<u32> {
        match &self.storage {
            IndexStorage::U16(v) => v.iter().map(|&i| i as u32).collect(),
            IndexStorage::U32(v) => v.clone(),
        }
    }

    /// Writes `value` at `position`.
    ///
    /// Fails with [`Error::BufferOverrun`] past the end of the buffer and with
    /// [`Error::IndexOverflow`] when `value` does not fit the element width.
    #[inline]
    pub fn set(&mut self, position: usize, value: u32) -> Result<()> {
        let capacity = self.len();
        if position >= capacity {
            return Err(Error::BufferOverrun {
                required: position + 1,
                capacity,
            });
        }
        match &mut self.storage {
            IndexStorage::U16(v) => {
                v[position] = u16::try_from(value).map_err(|_| Error::IndexOverflow {
                    value,
                    width: IndexWidth::U16,
                })?;
            }
            IndexStorage::U32(v) => v[position] = value,
        }
        Ok(())
    }
}

impl IndexSource for IndexBuffer {
    fn index_count(&self) -> usize {
        self.len()
    }

    fn index_width(&self) -> IndexWidth {
        self.width()
    }

    fn begin_read(&self) -> Result<IndexSlice<'_>> {
        self.readers.set(self.readers.get() + 1);
        Ok(self.as_slice())
    }

    fn end_read(&self) {
        self.readers.set(self.readers.get().saturating_sub(1));
    }
}
