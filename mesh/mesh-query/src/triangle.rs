//! Per-triangle geometric primitives.
//!
//! Closest point on a triangle (with its Voronoi region and barycentric
//! coordinates) and the signed solid angle a triangle subtends at a point.
//! Both are pure functions and are shared by the brute-force and the
//! accelerated engines so that the two produce bit-identical per-triangle
//! results.

use mesh_types::Triangle;
use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Below this magnitude both terms of the solid-angle `atan2` are treated as zero.
const SOLID_ANGLE_EPSILON: f64 = 1e-300;

/// Triangles whose doubled area is below this fraction of their longest
/// squared edge are treated as their three edges.
const DEGENERATE_RATIO: f64 = 1e-14;

/// Barycentric coordinates `(u, v, w)` with respect to a triangle `(a, b, c)`.
///
/// The point is `u·a + v·b + w·c` and `u + v + w = 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Barycentric {
    /// Weight of the first vertex.
    pub u: f64,
    /// Weight of the second vertex.
    pub v: f64,
    /// Weight of the third vertex.
    pub w: f64,
}

impl Barycentric {
    /// Build coordinates from the weights of the second and third vertex.
    ///
    /// The first weight is derived as `1 - v - w`.
    #[inline]
    #[must_use]
    pub fn new(v: f64, w: f64) -> Self {
        Self { u: 1.0 - v - w, v, w }
    }

    /// Unit coordinates selecting vertex `slot` (0, 1 or 2; larger values select 2).
    #[must_use]
    pub const fn vertex(slot: usize) -> Self {
        match slot {
            0 => Self { u: 1.0, v: 0.0, w: 0.0 },
            1 => Self { u: 0.0, v: 1.0, w: 0.0 },
            _ => Self { u: 0.0, v: 0.0, w: 1.0 },
        }
    }

    /// Sum of the three weights.
    #[inline]
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.u + self.v + self.w
    }

    /// Whether all weights lie in `[-tolerance, 1 + tolerance]` and sum to one within `tolerance`.
    #[must_use]
    pub fn is_valid(&self, tolerance: f64) -> bool {
        let in_range = |x: f64| x >= -tolerance && x <= 1.0 + tolerance;
        in_range(self.u) && in_range(self.v) && in_range(self.w) && (self.sum() - 1.0).abs() <= tolerance
    }

    /// The point these coordinates describe on `tri`.
    #[inline]
    #[must_use]
    pub fn interpolate(&self, tri: &Triangle) -> Point3<f64> {
        tri.point_at(self.u, self.v, self.w)
    }

    /// As an array `[u, v, w]`.
    #[inline]
    #[must_use]
    pub const fn to_array(self) -> [f64; 3] {
        [self.u, self.v, self.w]
    }
}

/// Voronoi region of a triangle containing the projection of a query point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TriangleRegion {
    /// Closest to the first vertex.
    VertexA,
    /// Closest to the second vertex.
    VertexB,
    /// Closest to the third vertex.
    VertexC,
    /// Closest to the edge from the first to the second vertex.
    EdgeAB,
    /// Closest to the edge from the second to the third vertex.
    EdgeBC,
    /// Closest to the edge from the third to the first vertex.
    EdgeCA,
    /// Projects into the triangle's interior.
    Interior,
}

impl TriangleRegion {
    /// Whether the region is one of the three vertex regions.
    #[must_use]
    pub const fn is_vertex(self) -> bool {
        matches!(self, Self::VertexA | Self::VertexB | Self::VertexC)
    }

    /// Whether the region is one of the three edge regions.
    #[must_use]
    pub const fn is_edge(self) -> bool {
        matches!(self, Self::EdgeAB | Self::EdgeBC | Self::EdgeCA)
    }
}

/// `num / den`, or 0 when the denominator vanishes (degenerate edge).
#[inline]
fn ratio_or_zero(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

/// Compute the closest point on triangle `(a, b, c)` to `p`.
///
/// This implements the algorithm from "Real-Time Collision Detection" by
/// Christer Ericson. The regions are tested in a fixed order (vertex A,
/// vertex B, edge AB, vertex C, edge CA, edge BC, interior); points on a
/// shared boundary therefore always resolve to the same region.
///
/// The barycentric numerators are evaluated as triple products against the
/// face normal rather than as differences of dot products, so long thin
/// triangles keep full precision.
///
/// Degenerate triangles are handled numerically: a collapsed (near zero
/// area) triangle is treated as its three edges and the nearest edge point
/// wins, a zero-length edge yields parameter 0, and a round-off failure of
/// the interior solve also falls back to the edges. Finite input never
/// produces NaN coordinates.
///
/// # Example
///
/// ```
/// use mesh_query::{TriangleRegion, closest_point_on_triangle};
/// use nalgebra::Point3;
///
/// let a = Point3::new(0.0, 0.0, 0.0);
/// let b = Point3::new(1.0, 0.0, 0.0);
/// let c = Point3::new(0.0, 1.0, 0.0);
///
/// let (region, bary) = closest_point_on_triangle(a, b, c, Point3::new(0.5, 0.5, 5.0));
/// assert_eq!(region, TriangleRegion::EdgeBC);
/// assert!((bary.v - 0.5).abs() < 1e-12 && (bary.w - 0.5).abs() < 1e-12);
/// ```
#[must_use]
pub fn closest_point_on_triangle(
    a: Point3<f64>,
    b: Point3<f64>,
    c: Point3<f64>,
    p: Point3<f64>,
) -> (TriangleRegion, Barycentric) {
    let ab = b - a;
    let ac = c - a;
    let n = ab.cross(&ac);

    let longest_sq = ab
        .norm_squared()
        .max(ac.norm_squared())
        .max((c - b).norm_squared());
    let double_area = n.norm();
    if double_area.is_nan() || double_area <= DEGENERATE_RATIO * longest_sq {
        return closest_on_edges(a, b, c, p);
    }

    let ap = p - a;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);

    // Vertex region outside A
    if d1 <= 0.0 && d2 <= 0.0 {
        return (TriangleRegion::VertexA, Barycentric::vertex(0));
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);

    // Vertex region outside B
    if d3 >= 0.0 && d4 <= d3 {
        return (TriangleRegion::VertexB, Barycentric::vertex(1));
    }

    // Edge region AB
    let vc = n.dot(&ab.cross(&ap));
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = ratio_or_zero(d1, d1 - d3);
        return (TriangleRegion::EdgeAB, Barycentric { u: 1.0 - v, v, w: 0.0 });
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);

    // Vertex region outside C
    if d6 >= 0.0 && d5 <= d6 {
        return (TriangleRegion::VertexC, Barycentric::vertex(2));
    }

    // Edge region CA
    let vb = n.dot(&ap.cross(&ac));
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = ratio_or_zero(d2, d2 - d6);
        return (TriangleRegion::EdgeCA, Barycentric { u: 1.0 - w, v: 0.0, w });
    }

    // Edge region BC
    let va = n.dot(&bp.cross(&cp));
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = ratio_or_zero(d4 - d3, (d4 - d3) + (d5 - d6));
        return (TriangleRegion::EdgeBC, Barycentric { u: 0.0, v: 1.0 - w, w });
    }

    // Interior; va + vb + vc == |n|²
    let sum = n.norm_squared();
    if sum > 0.0 && sum.is_finite() {
        let denom = 1.0 / sum;
        let (v, w) = (vb * denom, vc * denom);
        if v >= 0.0 && w >= 0.0 && v + w <= 1.0 {
            return (TriangleRegion::Interior, Barycentric::new(v, w));
        }
    }

    closest_on_edges(a, b, c, p)
}

/// Nearest point over the three edges, used when the triangle has collapsed.
fn closest_on_edges(
    a: Point3<f64>,
    b: Point3<f64>,
    c: Point3<f64>,
    p: Point3<f64>,
) -> (TriangleRegion, Barycentric) {
    let segment_param = |s: Point3<f64>, e: Point3<f64>| {
        let d = e - s;
        let t = ratio_or_zero((p - s).dot(&d), d.norm_squared());
        // Overflowing coordinates give inf / inf
        if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 }
    };

    let t_ab = segment_param(a, b);
    let t_bc = segment_param(b, c);
    let t_ca = segment_param(c, a);

    let candidates = [
        (TriangleRegion::EdgeAB, Barycentric { u: 1.0 - t_ab, v: t_ab, w: 0.0 }),
        (TriangleRegion::EdgeBC, Barycentric { u: 0.0, v: 1.0 - t_bc, w: t_bc }),
        (TriangleRegion::EdgeCA, Barycentric { u: t_ca, v: 0.0, w: 1.0 - t_ca }),
    ];

    let tri = Triangle::new(a, b, c);
    let mut best = candidates[0];
    let mut best_dist = (best.1.interpolate(&tri) - p).norm_squared();
    for candidate in &candidates[1..] {
        let dist = (candidate.1.interpolate(&tri) - p).norm_squared();
        if dist < best_dist {
            best = *candidate;
            best_dist = dist;
        }
    }
    best
}

/// Closest point on `tri` to `p`, with region and barycentric coordinates.
///
/// Convenience wrapper around [`closest_point_on_triangle`].
#[must_use]
pub fn closest_point(tri: &Triangle, p: Point3<f64>) -> (TriangleRegion, Barycentric, Point3<f64>) {
    let (region, bary) = closest_point_on_triangle(tri.v0, tri.v1, tri.v2, p);
    (region, bary, bary.interpolate(tri))
}

/// Signed solid angle subtended by triangle `(v0, v1, v2)` as seen from `p`.
///
/// Uses the Van Oosterom–Strackee formula: with `a = v0 - p`, `b = v1 - p`,
/// `c = v2 - p`,
///
/// ```text
/// det = a · (b × c)
/// den = |a||b||c| + (a·b)|c| + (b·c)|a| + (c·a)|b|
/// Ω   = 2 · atan2(det, den)
/// ```
///
/// The angle is positive when `p` lies behind the triangle (opposite its
/// CCW normal), so summing over a closed, outward-oriented mesh gives 4π
/// for interior points and 0 for exterior points.
///
/// When `p` coincides with a vertex or the triangle is degenerate, both
/// terms vanish and the contribution is 0 rather than NaN.
///
/// # Example
///
/// ```
/// use mesh_query::signed_solid_angle;
/// use nalgebra::Point3;
///
/// // An octant of the unit sphere subtends 4π / 8 at the origin.
/// let omega = signed_solid_angle(
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
///     Point3::new(0.0, 0.0, 1.0),
///     Point3::origin(),
/// );
/// assert!((omega - std::f64::consts::PI / 2.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn signed_solid_angle(
    v0: Point3<f64>,
    v1: Point3<f64>,
    v2: Point3<f64>,
    p: Point3<f64>,
) -> f64 {
    let a = v0 - p;
    let b = v1 - p;
    let c = v2 - p;

    let a_len = a.norm();
    let b_len = b.norm();
    let c_len = c.norm();

    let det = a.dot(&b.cross(&c));
    let den = a_len * b_len * c_len + a.dot(&b) * c_len + b.dot(&c) * a_len + c.dot(&a) * b_len;

    if det.abs() <= SOLID_ANGLE_EPSILON && den.abs() <= SOLID_ANGLE_EPSILON {
        return 0.0;
    }

    let half = det.atan2(den);
    if half.is_nan() { 0.0 } else { 2.0 * half }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn unit_triangle() -> (Point3<f64>, Point3<f64>, Point3<f64>) {
        (
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        )
    }

    fn closest(p: Point3<f64>) -> (TriangleRegion, Barycentric, Point3<f64>) {
        let (a, b, c) = unit_triangle();
        closest_point(&Triangle::new(a, b, c), p)
    }

    #[test]
    fn interior_projection() {
        let (region, bary, cp) = closest(Point3::new(0.2, 0.3, 2.0));
        assert_eq!(region, TriangleRegion::Interior);
        assert_relative_eq!(bary.v, 0.2, epsilon = 1e-12);
        assert_relative_eq!(bary.w, 0.3, epsilon = 1e-12);
        assert_relative_eq!(cp.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn hypotenuse_scenario() {
        let p = Point3::new(0.5, 0.5, 5.0);
        let (region, bary, cp) = closest(p);
        assert_eq!(region, TriangleRegion::EdgeBC);
        assert_relative_eq!(cp.x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(cp.y, 0.5, epsilon = 1e-12);
        assert_relative_eq!((cp - p).norm(), 5.0, epsilon = 1e-3);
        assert_relative_eq!(bary.u, 0.0);
    }

    #[test]
    fn vertex_regions() {
        assert_eq!(closest(Point3::new(-1.0, -1.0, 0.0)).0, TriangleRegion::VertexA);
        assert_eq!(closest(Point3::new(2.0, -0.5, 1.0)).0, TriangleRegion::VertexB);
        assert_eq!(closest(Point3::new(-0.5, 2.0, -1.0)).0, TriangleRegion::VertexC);
    }

    #[test]
    fn edge_regions() {
        let (region, bary, cp) = closest(Point3::new(0.25, -3.0, 0.0));
        assert_eq!(region, TriangleRegion::EdgeAB);
        assert_relative_eq!(bary.v, 0.25, epsilon = 1e-12);
        assert_relative_eq!(cp.y, 0.0);

        let (region, bary, _) = closest(Point3::new(-3.0, 0.75, 0.0));
        assert_eq!(region, TriangleRegion::EdgeCA);
        assert_relative_eq!(bary.w, 0.75, epsilon = 1e-12);
    }

    #[test]
    fn query_on_vertices_is_exact() {
        let (a, b, c) = unit_triangle();
        for (slot, v) in [a, b, c].into_iter().enumerate() {
            let (region, bary) = closest_point_on_triangle(a, b, c, v);
            assert!(region.is_vertex());
            assert_eq!(bary, Barycentric::vertex(slot));
        }
    }

    #[test]
    fn shared_boundary_is_deterministic() {
        // Exactly on the A/AB boundary: vertex A wins because it is tested first.
        let (region, _) = closest_point_on_triangle(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, -1.0, 0.0),
        );
        assert_eq!(region, TriangleRegion::VertexA);
    }

    #[test]
    fn barycentrics_valid_over_grid() {
        let (a, b, c) = unit_triangle();
        for i in -4..=8 {
            for j in -4..=8 {
                for k in [-1.0, 0.0, 0.5] {
                    let p = Point3::new(f64::from(i) * 0.25, f64::from(j) * 0.25, k);
                    let (_, bary) = closest_point_on_triangle(a, b, c, p);
                    assert!(bary.is_valid(1e-6), "invalid {bary:?} for {p}");
                }
            }
        }
    }

    #[test]
    fn degenerate_collinear_triangle() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        let c = Point3::new(2.0, 0.0, 0.0);
        let p = Point3::new(1.5, 1.0, 0.0);
        let (_, bary) = closest_point_on_triangle(a, b, c, p);
        let cp = bary.interpolate(&Triangle::new(a, b, c));
        assert!(bary.is_valid(1e-9));
        assert_relative_eq!(cp.x, 1.5, epsilon = 1e-12);
        assert_relative_eq!((cp - p).norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_point_triangle() {
        let a = Point3::new(1.0, 1.0, 1.0);
        let (region, bary) = closest_point_on_triangle(a, a, a, Point3::new(3.0, 0.0, 0.0));
        assert!(bary.u.is_finite() && bary.v.is_finite() && bary.w.is_finite());
        assert!(bary.is_valid(1e-12));
        assert!(region.is_edge());
        assert_eq!(bary.interpolate(&Triangle::new(a, a, a)), a);
    }

    #[test]
    fn degenerate_repeated_vertex() {
        // a == b: the triangle is the segment from a to c.
        let a = Point3::new(0.0, 0.0, 0.0);
        let c = Point3::new(0.0, 1.0, 0.0);
        let tri = Triangle::new(a, a, c);
        for (p, expected) in [
            (Point3::new(0.3, 0.4, 0.0), Point3::new(0.0, 0.4, 0.0)),
            (Point3::new(0.0, 0.5, 2.0), Point3::new(0.0, 0.5, 0.0)),
            (Point3::new(1.0, 3.0, 0.0), c),
        ] {
            let (_, bary) = closest_point_on_triangle(a, a, c, p);
            assert!(bary.is_valid(1e-9), "invalid {bary:?} for {p}");
            assert_relative_eq!((bary.interpolate(&tri) - expected).norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn long_thin_triangle_keeps_interior() {
        // 2e6 long, 1 wide: a real triangle, not a segment
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(2.0e6, 0.0, 0.0);
        let c = Point3::new(2.0e6, 1.0, 0.0);
        let p = Point3::new(1.9e6, 0.4, 5.0);

        let (region, bary, cp) = closest_point(&Triangle::new(a, b, c), p);
        assert_eq!(region, TriangleRegion::Interior);
        assert_relative_eq!(bary.w, 0.4, epsilon = 1e-12);
        assert_relative_eq!(cp.y, 0.4, epsilon = 1e-9);
        assert_relative_eq!((cp - p).norm(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn thin_triangle_near_long_edge() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0e7, 0.0, 0.0);
        let c = Point3::new(4.0e6, 0.125, 0.0);
        // Projects inside, 0.015 away from edge AB
        let p = Point3::new(5.0e6, 0.015, 2.0);

        let (region, _, cp) = closest_point(&Triangle::new(a, b, c), p);
        assert_eq!(region, TriangleRegion::Interior);
        assert_relative_eq!((cp - p).norm(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn huge_coordinates_stay_finite() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1e200, 0.0, 0.0);
        let c = Point3::new(0.0, 1e200, 0.0);
        let p = Point3::new(3e199, 3e199, 1e199);

        let (_, bary) = closest_point_on_triangle(a, b, c, p);
        assert!(bary.u.is_finite() && bary.v.is_finite() && bary.w.is_finite());
        assert!(bary.is_valid(1e-12), "{bary:?}");
    }

    #[test]
    fn solid_angle_octant() {
        let omega = signed_solid_angle(
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::origin(),
        );
        assert_relative_eq!(omega, PI / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn solid_angle_flips_with_winding() {
        let (a, b, c) = unit_triangle();
        let p = Point3::new(0.2, 0.2, 1.0);
        let front = signed_solid_angle(a, b, c, p);
        let back = signed_solid_angle(a, c, b, p);
        assert!(front < 0.0, "point in front of the normal sees a negative angle");
        assert_relative_eq!(front, -back, epsilon = 1e-12);
    }

    #[test]
    fn solid_angle_at_vertex_is_zero() {
        let (a, b, c) = unit_triangle();
        assert_eq!(signed_solid_angle(a, b, c, a), 0.0);
        assert_eq!(signed_solid_angle(a, b, c, c), 0.0);
    }

    #[test]
    fn solid_angle_degenerate_triangle_is_finite() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        let omega = signed_solid_angle(a, b, b, Point3::new(0.0, 0.0, 1.0));
        assert!(omega.is_finite());
        assert_relative_eq!(omega, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn solid_angle_shrinks_with_distance() {
        let (a, b, c) = unit_triangle();
        let near = signed_solid_angle(a, b, c, Point3::new(0.2, 0.2, -1.0)).abs();
        let far = signed_solid_angle(a, b, c, Point3::new(0.2, 0.2, -10.0)).abs();
        assert!(far < near);
        // Far field: Ω ≈ A / d² for a small triangle facing the point
        assert_relative_eq!(far, 0.5 / 100.0, max_relative = 0.01);
    }
}
