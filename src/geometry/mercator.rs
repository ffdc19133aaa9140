//! WGS84 to Web-Mercator projection, fixed-point in and out.
//!
//! Only the latitude is transformed; Web-Mercator longitude is WGS84
//! longitude. The output keeps the same 1e-6 fixed-point scale, which means
//! the projected plane spans the same ±180 "degree" range as the input and
//! fixed squared distances never overflow `u64`.
//!
//! Everything the tree compares (leaf MBRs, branch MBRs, query points,
//! nearest-point distances) must go through [`from_wgs84`]; mixing projected
//! and unprojected values silently breaks the branch-and-bound pruning.

use super::{Coordinate, FloatCoordinate};

/// Latitude of the Mercator square's edge; |y| == 180 exactly here.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Web-Mercator `y` in degrees for a WGS84 latitude in degrees. The input is
/// clamped to ±[`MAX_LATITUDE`], so the result is finite over the whole
/// `f64` domain.
pub fn lat_to_y(latitude: f64) -> f64 {
    let clamped = latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let rad = clamped.to_radians();
    (std::f64::consts::FRAC_PI_4 + rad / 2.).tan().ln().to_degrees()
}

/// Projects a fixed-point WGS84 coordinate into fixed-point Web-Mercator.
pub fn from_wgs84(coordinate: Coordinate) -> Coordinate {
    let wgs = coordinate.to_float();
    FloatCoordinate {
        lon: wgs.lon,
        lat: lat_to_y(wgs.lat),
    }
    .to_fixed()
}
