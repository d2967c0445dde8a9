// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use shadow_lite_edges::IndexWidth;
use thiserror::Error;

/// Result type for shadow volume operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while extruding shadow volumes
#[derive(Error, Debug)]
pub enum Error {
    /// The destination buffer cannot hold the generated data. This is a
    /// sizing bug in the caller, distinct from unusable geometry.
    #[error("Shadow buffer overrun: {required} elements required, capacity is {capacity}")]
    BufferOverrun { required: usize, capacity: usize },

    #[error("Index value {value} does not fit a {width} index buffer")]
    IndexOverflow { value: u64, width: IndexWidth },

    #[error("Invalid extrusion parameters: {0}")]
    InvalidExtrusion(String),

    #[error("Edge data error: {0}")]
    EdgeError(#[from] shadow_lite_edges::Error),
}
