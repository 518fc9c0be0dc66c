//! Accelerated point queries.
//!
//! [`MeshIndex`] owns a validated mesh together with a BVH built over its
//! triangles. Queries are read-only, so a built index can be shared across
//! threads and queried concurrently.

use std::f64::consts::TAU;

use mesh_types::{IndexedMesh, MeshTopology, Triangle};
use nalgebra::Point3;
use tracing::{debug, info};

use crate::brute::{face_distance_squared, solid_angle_sum, validate_mesh};
use crate::bvh::{Bvh, TraversalStats};
use crate::config::{QueryConfig, SignPolicy};
use crate::error::IndexResult;
use crate::triangle::{Barycentric, TriangleRegion, signed_solid_angle};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Faces with area below this are reported as degenerate at build time.
const DEGENERATE_AREA: f64 = 1e-12;

/// The closest surface point found by a query.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurfacePoint {
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
    /// -1.0 when the query point is inside, +1.0 when outside.
    pub sign: f64,
    /// Winding number used to decide the sign, if the policy computes one.
    pub winding_number: Option<f64>,
}

impl SurfacePoint {
    /// Whether the query point was classified as inside.
    #[must_use]
    pub fn is_inside(&self) -> bool {
        self.sign < 0.0
    }

    /// Signed distance: negative inside, positive outside.
    #[must_use]
    pub fn signed_distance(&self) -> f64 {
        self.sign * self.distance
    }
}

/// Outcome of a point query.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PointQuery {
    /// A surface point was found within the cutoff distance.
    Found(SurfacePoint),
    /// No surface point lies within the cutoff distance, or the mesh is empty.
    NotFound,
}

impl PointQuery {
    /// Whether a surface point was found.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// The surface point, if found.
    #[must_use]
    pub const fn surface_point(&self) -> Option<&SurfacePoint> {
        match self {
            Self::Found(hit) => Some(hit),
            Self::NotFound => None,
        }
    }

    /// Closest face index, if found.
    #[must_use]
    pub fn face(&self) -> Option<usize> {
        self.surface_point().map(|hit| hit.face)
    }

    /// Distance to the closest point, if found.
    #[must_use]
    pub fn distance(&self) -> Option<f64> {
        self.surface_point().map(|hit| hit.distance)
    }
}

impl From<PointQuery> for Option<SurfacePoint> {
    fn from(query: PointQuery) -> Self {
        match query {
            PointQuery::Found(hit) => Some(hit),
            PointQuery::NotFound => None,
        }
    }
}

/// A triangle mesh with a spatial index for closest-point and containment queries.
///
/// # Example
///
/// ```
/// use mesh_query::{MeshIndex, PointQuery};
/// use mesh_types::{Point3, unit_cube};
///
/// let index = MeshIndex::build(unit_cube()).unwrap();
///
/// let PointQuery::Found(hit) = index.query_point(Point3::new(0.5, 0.5, 0.25), f64::INFINITY) else {
///     panic!("expected a hit");
/// };
/// assert!((hit.distance - 0.25).abs() < 1e-12);
/// assert!(hit.is_inside());
///
/// assert!(!index.query_point(Point3::new(0.5, 0.5, 5.0), 1.0).is_found());
/// ```
#[derive(Debug, Clone)]
pub struct MeshIndex {
    mesh: IndexedMesh,
    triangles: Vec<Triangle>,
    bvh: Bvh,
    config: QueryConfig,
}

impl MeshIndex {
    /// Build an index with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidMesh`](crate::IndexError::InvalidMesh) if
    /// a face references a missing vertex and
    /// [`IndexError::NonFiniteVertex`](crate::IndexError::NonFiniteVertex) if
    /// a vertex has NaN or infinite coordinates.
    pub fn build(mesh: IndexedMesh) -> IndexResult<Self> {
        Self::build_with_config(mesh, QueryConfig::default())
    }

    /// Build an index from bare vertex positions and faces.
    ///
    /// # Errors
    ///
    /// Same as [`MeshIndex::build`].
    ///
    /// ```
    /// use mesh_query::{IndexError, MeshIndex};
    /// use nalgebra::Point3;
    ///
    /// let vertices = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)];
    /// let err = MeshIndex::from_raw_parts(vertices, vec![[0, 1, 3]]).unwrap_err();
    /// assert!(matches!(err, IndexError::InvalidMesh { face: 0, vertex: 3, .. }));
    /// ```
    pub fn from_raw_parts(vertices: Vec<Point3<f64>>, faces: Vec<[u32; 3]>) -> IndexResult<Self> {
        Self::build(IndexedMesh::from_positions(vertices, faces))
    }

    /// Build an index with an explicit configuration.
    ///
    /// The mesh is validated, then a BVH is built over its triangles (in
    /// parallel when `config.parallel` is set).
    ///
    /// # Errors
    ///
    /// Same as [`MeshIndex::build`]. No partial index is produced.
    pub fn build_with_config(mesh: IndexedMesh, config: QueryConfig) -> IndexResult<Self> {
        validate_mesh(&mesh)?;

        let triangles: Vec<Triangle> = mesh.triangles().collect();

        let degenerate = triangles
            .iter()
            .filter(|tri| tri.area() < DEGENERATE_AREA)
            .count();
        if degenerate > 0 {
            debug!(degenerate, "Mesh contains degenerate faces");
        }

        let bvh = if config.parallel {
            Bvh::build_parallel(
                &triangles,
                config.max_primitives_per_leaf,
                config.parallel_build_threshold,
            )
        } else {
            Bvh::build(&triangles, config.max_primitives_per_leaf)
        };

        let stats = bvh.stats();
        info!(
            vertices = mesh.vertex_count(),
            faces = triangles.len(),
            nodes = bvh.node_count(),
            leaves = stats.leaf_count,
            depth = stats.max_depth,
            sign_policy = ?config.resolve_sign_policy(triangles.len()),
            "Built mesh index"
        );

        Ok(Self {
            mesh,
            triangles,
            bvh,
            config,
        })
    }

    /// Find the closest surface point to `point` within `max_distance`.
    ///
    /// `max_distance` may be `f64::INFINITY` for an unbounded search; a
    /// negative or NaN cutoff always yields [`PointQuery::NotFound`], as does
    /// an empty mesh. The sign of a found point follows the configured
    /// [`SignPolicy`].
    #[must_use]
    pub fn query_point(&self, point: Point3<f64>, max_distance: f64) -> PointQuery {
        self.query_point_with_stats(point, max_distance).0
    }

    /// Like [`MeshIndex::query_point`], also returning traversal counters.
    ///
    /// Only the nearest-face search is counted; sign evaluation is not.
    #[must_use]
    pub fn query_point_with_stats(
        &self,
        point: Point3<f64>,
        max_distance: f64,
    ) -> (PointQuery, TraversalStats) {
        let mut stats = TraversalStats::default();
        if max_distance.is_nan() || max_distance < 0.0 {
            return (PointQuery::NotFound, stats);
        }

        let nearest = self.bvh.query_nearest(
            &point,
            max_distance * max_distance,
            |face| face_distance_squared(&self.triangles[face], point).3,
            &mut stats,
        );
        let Some((face, _)) = nearest else {
            return (PointQuery::NotFound, stats);
        };

        let tri = &self.triangles[face];
        let (region, barycentric, closest_point, dist_sq) = face_distance_squared(tri, point);
        let (sign, winding_number) = self.classify(point, tri, closest_point);

        let hit = SurfacePoint {
            face,
            barycentric,
            region,
            closest_point,
            distance: dist_sq.sqrt(),
            sign,
            winding_number,
        };
        (PointQuery::Found(hit), stats)
    }

    /// Sign and winding number for `point` whose closest point lies on `tri`.
    fn classify(
        &self,
        point: Point3<f64>,
        tri: &Triangle,
        closest_point: Point3<f64>,
    ) -> (f64, Option<f64>) {
        let winding = match self.sign_policy() {
            SignPolicy::FaceNormal => {
                return (face_normal_sign(tri, point, closest_point), None);
            }
            SignPolicy::ApproximateWinding => self.winding_number_approx(point, self.config.winding_accuracy),
            SignPolicy::ExactWinding | SignPolicy::Adaptive => self.winding_number_exact(point),
        };
        let sign = if winding > TAU { -1.0 } else { 1.0 };
        (sign, Some(winding))
    }

    /// The effective containment policy for this mesh.
    #[must_use]
    pub fn sign_policy(&self) -> SignPolicy {
        self.config.resolve_sign_policy(self.triangles.len())
    }

    /// Generalized winding number at `point`.
    ///
    /// Exact or hierarchical depending on the resolved policy.
    /// [`SignPolicy::FaceNormal`] does not use a winding number for its own
    /// queries; here it behaves like [`SignPolicy::Adaptive`].
    #[must_use]
    pub fn winding_number(&self, point: Point3<f64>) -> f64 {
        let policy = match self.sign_policy() {
            SignPolicy::FaceNormal if self.triangles.len() > self.config.exact_winding_face_limit => {
                SignPolicy::ApproximateWinding
            }
            other => other,
        };
        match policy {
            SignPolicy::ApproximateWinding => {
                self.winding_number_approx(point, self.config.winding_accuracy)
            }
            _ => self.winding_number_exact(point),
        }
    }

    /// Exact winding number: the solid-angle sum over every face.
    #[must_use]
    pub fn winding_number_exact(&self, point: Point3<f64>) -> f64 {
        solid_angle_sum(&self.triangles, point)
    }

    /// Hierarchical winding number with far-field threshold `accuracy`.
    ///
    /// Subtrees farther than `accuracy` times their radius are replaced by a
    /// dipole; larger values are more accurate.
    #[must_use]
    pub fn winding_number_approx(&self, point: Point3<f64>, accuracy: f64) -> f64 {
        self.bvh.winding_number(&point, accuracy, |face| {
            let tri = &self.triangles[face];
            signed_solid_angle(tri.v0, tri.v1, tri.v2, point)
        })
    }

    /// Whether `point` is inside the surface.
    ///
    /// Winding policies test the winding number against 2π. The face-normal
    /// policy uses the sign of the closest face; it reports `false` for an
    /// empty mesh.
    #[must_use]
    pub fn is_inside(&self, point: Point3<f64>) -> bool {
        match self.sign_policy() {
            SignPolicy::FaceNormal => self
                .query_point(point, f64::INFINITY)
                .surface_point()
                .is_some_and(SurfacePoint::is_inside),
            SignPolicy::ApproximateWinding => {
                self.winding_number_approx(point, self.config.winding_accuracy) > TAU
            }
            SignPolicy::ExactWinding | SignPolicy::Adaptive => {
                self.winding_number_exact(point) > TAU
            }
        }
    }

    /// The point on face `face` at barycentric coordinates `barycentric`.
    ///
    /// Returns `None` if `face` is out of range.
    ///
    /// ```
    /// use mesh_query::{Barycentric, MeshIndex};
    /// use mesh_types::unit_cube;
    ///
    /// let index = MeshIndex::build(unit_cube()).unwrap();
    /// let p = index.eval_position(0, Barycentric::vertex(0)).unwrap();
    /// assert_eq!(p, mesh_types::Point3::origin());
    /// assert!(index.eval_position(12, Barycentric::vertex(0)).is_none());
    /// ```
    #[must_use]
    pub fn eval_position(&self, face: usize, barycentric: Barycentric) -> Option<Point3<f64>> {
        self.triangles
            .get(face)
            .map(|tri| barycentric.interpolate(tri))
    }

    /// The indexed mesh.
    #[must_use]
    pub fn mesh(&self) -> &IndexedMesh {
        &self.mesh
    }

    /// The BVH over the mesh triangles.
    #[must_use]
    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// The configuration the index was built with.
    #[must_use]
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Triangles in face order.
    #[must_use]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Number of faces.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.triangles.len()
    }

    /// Consume the index, returning the mesh.
    #[must_use]
    pub fn into_mesh(self) -> IndexedMesh {
        self.mesh
    }
}

/// -1 when `point` lies behind `tri` as seen along its normal, +1 otherwise.
///
/// Points on the surface and degenerate faces count as outside.
fn face_normal_sign(tri: &Triangle, point: Point3<f64>, closest_point: Point3<f64>) -> f64 {
    match tri.normal() {
        Some(n) if (point - closest_point).dot(&n) < 0.0 => -1.0,
        _ => 1.0,
    }
}
