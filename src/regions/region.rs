//! # Region descriptors.
//!
//! A [`Region`] is the unit of subscription and liveness tracking: one upstream
//! subscription, one activity counter and one worker per region.

use std::fmt;
use std::sync::Arc;

/// Geographic filter: four edges in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Western longitude.
    pub west: f64,
    /// Southern latitude.
    pub south: f64,
    /// Eastern longitude.
    pub east: f64,
    /// Northern latitude.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a box and checks it is usable as an upstream filter.
    ///
    /// Valid when every edge is finite, `-180 <= west < east <= 180`
    /// and `-90 <= south < north <= 90`.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self, String> {
        let bbox = Self {
            west,
            south,
            east,
            north,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    fn validate(&self) -> Result<(), String> {
        let edges = [self.west, self.south, self.east, self.north];
        if edges.iter().any(|v| !v.is_finite()) {
            return Err(format!("non-finite edge in {self}"));
        }
        if !(-180.0..=180.0).contains(&self.west) || !(-180.0..=180.0).contains(&self.east) {
            return Err(format!("longitude out of range in {self}"));
        }
        if !(-90.0..=90.0).contains(&self.south) || !(-90.0..=90.0).contains(&self.north) {
            return Err(format!("latitude out of range in {self}"));
        }
        if self.west >= self.east {
            return Err(format!("west must be less than east in {self}"));
        }
        if self.south >= self.north {
            return Err(format!("south must be less than north in {self}"));
        }
        Ok(())
    }

    /// Upstream filter form: `west,south,east,north`.
    pub fn filter(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

/// One region, immutable after load.
///
/// `raw_metadata` is the region's source record, passed through untouched
/// into outbound envelopes.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    /// Unique identifier.
    pub id: Arc<str>,
    /// Subscription filter.
    pub bbox: BoundingBox,
    /// Human-readable name.
    pub display_name: String,
    /// Opaque source record (JSON bytes).
    pub raw_metadata: Arc<[u8]>,
}

impl Region {
    /// Creates a region with empty metadata.
    pub fn new(id: impl Into<Arc<str>>, bbox: BoundingBox) -> Self {
        let id = id.into();
        Self {
            display_name: id.to_string(),
            id,
            bbox,
            raw_metadata: Arc::from(&b"{}"[..]),
        }
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Sets the pass-through metadata.
    pub fn with_metadata(mut self, raw: impl Into<Arc<[u8]>>) -> Self {
        self.raw_metadata = raw.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_is_west_south_east_north() {
        let bbox = BoundingBox::new(-74.0, 40.0, -73.0, 41.0).unwrap();
        assert_eq!(bbox.filter(), "-74,40,-73,41");
    }

    #[test]
    fn fractional_edges_keep_precision() {
        let bbox = BoundingBox::new(-105.3, 39.9, -105.1, 40.1).unwrap();
        assert_eq!(bbox.filter(), "-105.3,39.9,-105.1,40.1");
    }

    #[test]
    fn rejects_swapped_edges() {
        assert!(BoundingBox::new(-73.0, 40.0, -74.0, 41.0).is_err());
        assert!(BoundingBox::new(-74.0, 41.0, -73.0, 40.0).is_err());
    }

    #[test]
    fn rejects_out_of_range_and_nan() {
        assert!(BoundingBox::new(-190.0, 40.0, -73.0, 41.0).is_err());
        assert!(BoundingBox::new(-74.0, -91.0, -73.0, 41.0).is_err());
        assert!(BoundingBox::new(f64::NAN, 40.0, -73.0, 41.0).is_err());
    }
}
