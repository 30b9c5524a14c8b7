//! Regions: descriptors and the region list loader.
//!
//! ## Contents
//! - [`Region`], [`BoundingBox`] immutable per-region descriptors
//! - [`load_regions`], [`parse_regions`] region file loading and validation

mod region;
mod source;

pub use region::{BoundingBox, Region};
pub use source::{load_regions, parse_regions};
