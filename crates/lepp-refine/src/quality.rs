//! Bad-triangle detection.
//!
//! A triangle is *bad* when its smallest interior angle is strictly below the
//! tolerance. Angles come from the law of cosines on squared side lengths.
//! Degenerate triangles (a zero-length side, or coordinates that are not
//! finite) report an angle of zero, so they are bad for any positive
//! tolerance and never bad at a tolerance of zero.

use nalgebra::Point3;
use tracing::debug;

use crate::error::RefineResult;
use crate::params::check_angle;
use crate::topology::Topology;

/// Interior angle opposite the side with squared length `opposite_sq`.
#[inline]
fn interior_angle(opposite_sq: f64, side_a_sq: f64, side_b_sq: f64) -> f64 {
    let denom = 2.0 * (side_a_sq * side_b_sq).sqrt();
    if !denom.is_finite() || denom <= 0.0 {
        return 0.0;
    }
    let cos = (side_a_sq + side_b_sq - opposite_sq) / denom;
    if cos.is_nan() {
        return 0.0;
    }
    cos.clamp(-1.0, 1.0).acos()
}

/// Interior angles at each corner, in radians.
pub fn triangle_angles(points: &[Point3<f64>; 3]) -> [f64; 3] {
    let a_sq = (points[2] - points[1]).norm_squared();
    let b_sq = (points[2] - points[0]).norm_squared();
    let c_sq = (points[1] - points[0]).norm_squared();
    [
        interior_angle(a_sq, b_sq, c_sq),
        interior_angle(b_sq, a_sq, c_sq),
        interior_angle(c_sq, a_sq, b_sq),
    ]
}

/// Smallest interior angle, in radians.
#[inline]
pub fn min_angle(points: &[Point3<f64>; 3]) -> f64 {
    let [a, b, c] = triangle_angles(points);
    a.min(b).min(c)
}

/// Whether the smallest angle is strictly below `tolerance_rad`.
#[inline]
pub fn is_bad(points: &[Point3<f64>; 3], tolerance_rad: f64) -> bool {
    min_angle(points) < tolerance_rad
}

/// Flag every triangle whose smallest angle is below `angle_deg`.
///
/// Every triangle's flag is rewritten, so repeated calls with the same angle
/// give the same result. Returns the number of bad triangles.
pub fn detect_bad_triangles(angle_deg: f64, topology: &mut Topology) -> RefineResult<usize> {
    let tolerance = check_angle(angle_deg)?;

    let mut flags = Vec::with_capacity(topology.triangle_count());
    for triangle in topology.triangles() {
        let points = topology.triangle_points(triangle)?;
        flags.push(is_bad(&points, tolerance));
    }
    let bad = apply_bad_flags(topology, &flags);

    debug!(angle_deg, bad, triangles = topology.triangle_count(), "Detected bad triangles");
    Ok(bad)
}

/// Write per-triangle bad flags. `flags` must have one entry per triangle.
pub(crate) fn apply_bad_flags(topology: &mut Topology, flags: &[bool]) -> usize {
    let mut bad = 0;
    for (triangle, &flag) in topology.triangles.iter_mut().zip(flags) {
        triangle.bad = flag;
        bad += usize::from(flag);
    }
    bad
}
