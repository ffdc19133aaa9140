//! Hilbert curve codes for bulk-load ordering.
//!
//! Maps a fixed-point 2D point to a 64-bit code such that lexicographic
//! order on codes approximates spatial proximity, which is what lets the
//! Hilbert packer fill leaves from a plain sort. The curve walks a
//! 2^32 x 2^32 grid, so one code cell is one fixed-point unit and distinct
//! coordinates get distinct codes.

use super::{Coordinate, COORDINATE_PRECISION};

/// Offset that biases signed fixed-point axes into the curve's unsigned grid.
const AXIS_BIAS: i64 = 180 * COORDINATE_PRECISION as i64;

/// Returns the Hilbert code of a point. Callers pass projected (Mercator)
/// coordinates; the projection keeps both axes within ±180 degrees, so the
/// bias below always lands in `u32` range.
pub fn hilbert_code(coordinate: Coordinate) -> u64 {
    let x = (i64::from(coordinate.lon) + AXIS_BIAS) as u32;
    let y = (i64::from(coordinate.lat) + AXIS_BIAS) as u32;
    xy_to_code(x, y)
}

/// Classic iterative xy->d conversion over a 2^32-sided grid. With a
/// power-of-two side length the quadrant reflection `side - 1 - v` is exactly
/// bitwise negation, which keeps the loop branch-light.
fn xy_to_code(mut x: u32, mut y: u32) -> u64 {
    let mut code = 0u64;
    let mut side = 1u32 << 31;

    while side > 0 {
        let rx = u32::from(x & side > 0);
        let ry = u32::from(y & side > 0);
        code += u64::from(side) * u64::from(side) * u64::from((3 * rx) ^ ry);

        if ry == 0 {
            if rx == 1 {
                x = !x;
                y = !y;
            }
            std::mem::swap(&mut x, &mut y);
        }
        side >>= 1;
    }
    code
}
