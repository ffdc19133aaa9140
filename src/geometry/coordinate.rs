//! Fixed- and floating-point coordinates and the distance kernels built on
//! them.
//!
//! `Coordinate` is the storage representation: two `i32`s in 1e-6 degree
//! units, cheap to copy and embeddable in on-disk records. `FloatCoordinate`
//! exists only for the segment-projection math, where intermediate values are
//! fractional; results are rounded back to fixed point before any distance is
//! compared, so the engine's metric stays integral and deterministic.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::COORDINATE_PRECISION;

/// A fixed-point (lon, lat) pair. Depending on context the values are either
/// WGS84 degrees or Web-Mercator plane units, both scaled by
/// [`COORDINATE_PRECISION`](super::COORDINATE_PRECISION).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Coordinate {
    pub lon: i32,
    pub lat: i32,
}

impl Coordinate {
    pub const fn new(lon: i32, lat: i32) -> Self {
        Self { lon, lat }
    }

    /// Builds a fixed coordinate from floating degrees, rounding half away
    /// from zero.
    pub fn from_degrees(lon: f64, lat: f64) -> Self {
        Self {
            lon: (lon * f64::from(COORDINATE_PRECISION)).round() as i32,
            lat: (lat * f64::from(COORDINATE_PRECISION)).round() as i32,
        }
    }

    pub fn to_float(self) -> FloatCoordinate {
        FloatCoordinate {
            lon: f64::from(self.lon) / f64::from(COORDINATE_PRECISION),
            lat: f64::from(self.lat) / f64::from(COORDINATE_PRECISION),
        }
    }
}

/// A (lon, lat) pair in floating degrees, used for projection intermediates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatCoordinate {
    pub lon: f64,
    pub lat: f64,
}

impl FloatCoordinate {
    pub fn to_fixed(self) -> Coordinate {
        Coordinate::from_degrees(self.lon, self.lat)
    }
}

/// Integer midpoint of two fixed coordinates. This is only ever used as a
/// sort key, so the half-unit rounding bias is irrelevant.
pub fn centroid(a: Coordinate, b: Coordinate) -> Coordinate {
    Coordinate {
        lon: ((i64::from(a.lon) + i64::from(b.lon)) / 2) as i32,
        lat: ((i64::from(a.lat) + i64::from(b.lat)) / 2) as i32,
    }
}

/// Squared Euclidean distance between two fixed coordinates, in squared
/// fixed-point units. The deltas fit in `i64` and their squared sum fits in
/// `u64` for the whole ±180° domain.
pub fn squared_euclidean_distance(lhs: Coordinate, rhs: Coordinate) -> u64 {
    let d_lon = i64::from(lhs.lon) - i64::from(rhs.lon);
    let d_lat = i64::from(lhs.lat) - i64::from(rhs.lat);
    (d_lon * d_lon + d_lat * d_lat) as u64
}

/// Projects `point` onto the segment `source`–`target`, clamped to the
/// segment. Returns the clamped ratio along the segment and the nearest
/// point. A zero-length segment degenerates to `source` with ratio 0.
pub fn project_point_on_segment(
    source: FloatCoordinate,
    target: FloatCoordinate,
    point: FloatCoordinate,
) -> (f64, FloatCoordinate) {
    let slope_lon = target.lon - source.lon;
    let slope_lat = target.lat - source.lat;
    let squared_length = slope_lon * slope_lon + slope_lat * slope_lat;

    if squared_length == 0. {
        return (0., source);
    }

    let rel_lon = point.lon - source.lon;
    let rel_lat = point.lat - source.lat;
    let ratio = ((rel_lon * slope_lon + rel_lat * slope_lat) / squared_length).clamp(0., 1.);

    (
        ratio,
        FloatCoordinate {
            lon: source.lon + ratio * slope_lon,
            lat: source.lat + ratio * slope_lat,
        },
    )
}
