//! Axis-aligned bounding rectangles in fixed-point coordinates.
//!
//! `Rectangle` is both an in-memory working type and an on-disk record: it is
//! embedded verbatim in branch nodes and leaf headers, so its layout is
//! pinned to four little-endian `i32`s in `(min_lon, max_lon, min_lat,
//! max_lat)` order.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::Coordinate;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Rectangle {
    pub min_lon: i32,
    pub max_lon: i32,
    pub min_lat: i32,
    pub max_lat: i32,
}

const _: () = assert!(std::mem::size_of::<Rectangle>() == 16);

impl Rectangle {
    /// Inverted extents; the identity for [`extend`](Self::extend) and
    /// [`merge`](Self::merge).
    pub const INVALID: Rectangle = Rectangle {
        min_lon: i32::MAX,
        max_lon: i32::MIN,
        min_lat: i32::MAX,
        max_lat: i32::MIN,
    };

    pub const fn new(min_lon: i32, max_lon: i32, min_lat: i32, max_lat: i32) -> Self {
        Self {
            min_lon,
            max_lon,
            min_lat,
            max_lat,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.min_lon <= self.max_lon && self.min_lat <= self.max_lat
    }

    /// Grows the rectangle to cover the given point.
    pub fn extend(&mut self, lon: i32, lat: i32) {
        self.min_lon = self.min_lon.min(lon);
        self.max_lon = self.max_lon.max(lon);
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
    }

    /// Grows the rectangle to cover `other`.
    pub fn merge(&mut self, other: &Rectangle) {
        self.min_lon = self.min_lon.min(other.min_lon);
        self.max_lon = self.max_lon.max(other.max_lon);
        self.min_lat = self.min_lat.min(other.min_lat);
        self.max_lat = self.max_lat.max(other.max_lat);
    }

    pub fn intersects(&self, other: &Rectangle) -> bool {
        self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
            && self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
    }

    pub fn centroid(&self) -> Coordinate {
        Coordinate {
            lon: ((i64::from(self.min_lon) + i64::from(self.max_lon)) / 2) as i32,
            lat: ((i64::from(self.min_lat) + i64::from(self.max_lat)) / 2) as i32,
        }
    }

    /// Minimum squared distance from `point` to this rectangle, in squared
    /// fixed-point units. Zero when the point lies inside. Components are
    /// widened to `i64` before squaring, so the full coordinate domain is
    /// overflow-free.
    pub fn min_squared_dist(&self, point: Coordinate) -> u64 {
        let d_lon = if point.lon < self.min_lon {
            i64::from(self.min_lon) - i64::from(point.lon)
        } else if point.lon > self.max_lon {
            i64::from(point.lon) - i64::from(self.max_lon)
        } else {
            0
        };
        let d_lat = if point.lat < self.min_lat {
            i64::from(self.min_lat) - i64::from(point.lat)
        } else if point.lat > self.max_lat {
            i64::from(point.lat) - i64::from(self.max_lat)
        } else {
            0
        };
        (d_lon * d_lon + d_lat * d_lat) as u64
    }
}
