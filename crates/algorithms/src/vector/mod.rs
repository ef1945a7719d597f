//! Vector operations on polygon footprints
//!
//! - Buffer: expand footprints by a fixed distance (round joins)
//! - Mask: drop sample points falling on a footprint
//! - Spatial: extents and geometry normalization

mod buffer;
mod mask;
mod spatial;

pub use buffer::buffer_polygons;
pub use mask::{any_within, remove_within};
pub use spatial::{extent_of, to_multi_polygon};
