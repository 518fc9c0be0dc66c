//! Brute-force reference engine.
//!
//! Scans every face for each query. O(T) per point, no preprocessing. Used
//! as the exact winding-number path of [`MeshIndex`](crate::MeshIndex) and
//! as the oracle the accelerated path is validated against.
//!
//! The public scans validate the mesh first and return the same
//! [`IndexError`] as [`MeshIndex::build`](crate::MeshIndex::build).

use std::f64::consts::TAU;

use mesh_types::{IndexedMesh, MeshTopology, Triangle};
use nalgebra::Point3;

use crate::error::{IndexError, IndexResult};
use crate::triangle::{Barycentric, TriangleRegion, closest_point, signed_solid_angle};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The closest face found by a linear scan.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClosestFace {
    /// Index of the closest face.
    pub face: usize,
    /// Barycentric coordinates of the closest point on that face.
    pub barycentric: Barycentric,
    /// Voronoi region of the face containing the closest point.
    pub region: TriangleRegion,
    /// The closest point on the surface.
    pub closest_point: Point3<f64>,
    /// Euclidean distance from the query point.
    pub distance: f64,
}

/// Closest face and winding number from a single scan.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BruteForceResult {
    /// Closest face, or `None` when the mesh has no faces.
    pub closest: Option<ClosestFace>,
    /// Sum of signed solid angles over all faces.
    pub winding_number: f64,
}

impl BruteForceResult {
    /// Whether the winding number exceeds half a full turn (2π).
    #[must_use]
    pub fn is_inside(&self) -> bool {
        self.winding_number > TAU
    }
}

/// Check that every face references an existing vertex and every vertex is finite.
///
/// # Errors
///
/// Returns [`IndexError::InvalidMesh`] for the first face with an
/// out-of-range vertex index, then [`IndexError::NonFiniteVertex`] for the
/// first vertex with NaN or infinite coordinates.
pub fn validate_mesh(mesh: &IndexedMesh) -> IndexResult<()> {
    if let Some((face, vertex)) = mesh.find_invalid_face() {
        return Err(IndexError::InvalidMesh {
            face,
            vertex,
            vertex_count: mesh.vertex_count(),
        });
    }
    if let Some(vertex) = mesh.vertices.iter().position(|v| !v.is_finite()) {
        return Err(IndexError::NonFiniteVertex { vertex });
    }
    Ok(())
}

/// Per-face closest point and squared distance.
///
/// Both engines go through this function so that equal inputs produce
/// bit-identical distances.
#[inline]
pub(crate) fn face_distance_squared(
    tri: &Triangle,
    p: Point3<f64>,
) -> (TriangleRegion, Barycentric, Point3<f64>, f64) {
    let (region, bary, cp) = closest_point(tri, p);
    (region, bary, cp, (cp - p).norm_squared())
}

/// Closest face among `triangles`, ties resolved to the lowest index.
#[must_use]
pub fn closest_among<I>(triangles: I, p: Point3<f64>) -> Option<ClosestFace>
where
    I: IntoIterator<Item = Triangle>,
{
    let mut best: Option<(ClosestFace, f64)> = None;

    for (face, tri) in triangles.into_iter().enumerate() {
        let (region, barycentric, cp, dist_sq) = face_distance_squared(&tri, p);
        if best.as_ref().is_none_or(|(_, best_sq)| dist_sq < *best_sq) {
            best = Some((
                ClosestFace {
                    face,
                    barycentric,
                    region,
                    closest_point: cp,
                    distance: dist_sq.sqrt(),
                },
                dist_sq,
            ));
        }
    }

    best.map(|(hit, _)| hit)
}

/// Sum of signed solid angles of `triangles` seen from `p`, in face order.
#[must_use]
pub fn solid_angle_sum<'a, I>(triangles: I, p: Point3<f64>) -> f64
where
    I: IntoIterator<Item = &'a Triangle>,
{
    triangles
        .into_iter()
        .map(|tri| signed_solid_angle(tri.v0, tri.v1, tri.v2, p))
        .sum()
}

/// Find the face of `mesh` closest to `p` by scanning every face.
///
/// Returns `Ok(None)` only when the mesh has no faces.
///
/// # Errors
///
/// Same as [`validate_mesh`].
///
/// # Example
///
/// ```
/// use mesh_query::brute;
/// use mesh_types::{Point3, unit_cube};
///
/// let cube = unit_cube();
/// let hit = brute::closest_face(&cube, Point3::new(0.5, 0.5, 3.0)).unwrap().unwrap();
/// assert!((hit.distance - 2.0).abs() < 1e-12);
/// ```
pub fn closest_face(mesh: &IndexedMesh, p: Point3<f64>) -> IndexResult<Option<ClosestFace>> {
    validate_mesh(mesh)?;
    Ok(closest_among(mesh.triangles(), p))
}

/// Generalized winding number of `mesh` at `p`.
///
/// About 0 outside and about 4π inside a closed, outward-oriented mesh;
/// 4π times the number of enclosing shells in general.
///
/// # Errors
///
/// Same as [`validate_mesh`].
pub fn winding_number(mesh: &IndexedMesh, p: Point3<f64>) -> IndexResult<f64> {
    validate_mesh(mesh)?;
    Ok(mesh
        .triangles()
        .map(|tri| signed_solid_angle(tri.v0, tri.v1, tri.v2, p))
        .sum())
}

/// Closest face and winding number in one pass over the faces.
///
/// # Errors
///
/// Same as [`validate_mesh`].
pub fn query_point(mesh: &IndexedMesh, p: Point3<f64>) -> IndexResult<BruteForceResult> {
    validate_mesh(mesh)?;
    Ok(scan(mesh, p))
}

/// [`query_point`] on a mesh that already passed [`validate_mesh`].
pub(crate) fn scan(mesh: &IndexedMesh, p: Point3<f64>) -> BruteForceResult {
    let mut best: Option<(ClosestFace, f64)> = None;
    let mut winding = 0.0;

    for (face, tri) in mesh.triangles().enumerate() {
        winding += signed_solid_angle(tri.v0, tri.v1, tri.v2, p);

        let (region, barycentric, cp, dist_sq) = face_distance_squared(&tri, p);
        if best.as_ref().is_none_or(|(_, best_sq)| dist_sq < *best_sq) {
            best = Some((
                ClosestFace {
                    face,
                    barycentric,
                    region,
                    closest_point: cp,
                    distance: dist_sq.sqrt(),
                },
                dist_sq,
            ));
        }
    }

    BruteForceResult {
        closest: best.map(|(hit, _)| hit),
        winding_number: winding,
    }
}
