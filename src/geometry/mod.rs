//! Geometry primitives shared by the packers and the query engine.
//!
//! All coordinates are fixed-point WGS84 or Web-Mercator values with six
//! decimal digits of precision (`COORDINATE_PRECISION`). Distances are squared
//! Euclidean in fixed-point units of the Mercator plane, not meters; every
//! comparison the tree makes happens in that one metric, so builders and
//! queries must project through the same [`mercator`] functions.

pub mod coordinate;
pub mod hilbert;
pub mod mercator;
pub mod rectangle;

pub use coordinate::{
    centroid, project_point_on_segment, squared_euclidean_distance, Coordinate, FloatCoordinate,
};
pub use rectangle::Rectangle;

/// Fixed-point scale: 1e-6 degrees per unit, the precision OSM data carries.
pub const COORDINATE_PRECISION: i32 = 1_000_000;
