//! Property-based tests for point queries.
//!
//! The accelerated index is checked against the brute-force scan on random
//! meshes and random query points.
//!
//! Run with: cargo test -p mesh-query -- proptest

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::cast_possible_truncation)]

use mesh_query::{
    MeshIndex, PointQuery, QueryConfig, brute, closest_point_on_triangle, signed_solid_angle,
};
use mesh_types::{IndexedMesh, Point3, Vertex};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// Generate a random position in a bounded range.
fn arb_point() -> impl Strategy<Value = Point3<f64>> {
    prop::array::uniform3(-10.0..10.0f64).prop_map(|[x, y, z]| Point3::new(x, y, z))
}

/// Generate a mesh whose faces only reference existing vertices.
///
/// Faces may repeat vertices, so degenerate triangles are included.
fn arb_mesh(max_vertices: usize, max_faces: usize) -> impl Strategy<Value = IndexedMesh> {
    (3..=max_vertices).prop_flat_map(move |num_vertices| {
        let vertices = prop::collection::vec(arb_point().prop_map(Vertex::new), num_vertices);
        let face = prop::array::uniform3(0..num_vertices as u32);
        let faces = prop::collection::vec(face, 1..=max_faces);
        (vertices, faces).prop_map(|(vertices, faces)| IndexedMesh::from_parts(vertices, faces))
    })
}

fn arb_config() -> impl Strategy<Value = QueryConfig> {
    (1usize..=8, any::<bool>()).prop_map(|(leaf, parallel)| {
        QueryConfig::default()
            .with_max_primitives_per_leaf(leaf)
            .with_parallel(parallel)
            .with_parallel_build_threshold(16)
    })
}

// =============================================================================
// Property Tests: Triangle Primitives
// =============================================================================

proptest! {
    /// Barycentric coordinates are always a valid convex combination.
    #[test]
    fn barycentrics_are_valid(a in arb_point(), b in arb_point(), c in arb_point(), p in arb_point()) {
        let (_, bary) = closest_point_on_triangle(a, b, c, p);
        prop_assert!(bary.is_valid(1e-6), "{:?}", bary);
    }

    /// Degenerate triangles never produce NaN.
    #[test]
    fn degenerate_triangles_are_finite(a in arb_point(), b in arb_point(), t in 0.0..1.0f64, p in arb_point()) {
        let c = a + (b - a) * t;
        let (_, bary) = closest_point_on_triangle(a, b, c, p);
        prop_assert!(bary.u.is_finite() && bary.v.is_finite() && bary.w.is_finite());
        prop_assert!(bary.is_valid(1e-6), "{:?}", bary);
        prop_assert!(signed_solid_angle(a, b, c, p).is_finite());
        prop_assert!(signed_solid_angle(a, a, a, p).is_finite());
    }

    /// The closest point is no farther than any vertex.
    #[test]
    fn closest_point_beats_vertices(a in arb_point(), b in arb_point(), c in arb_point(), p in arb_point()) {
        let tri = mesh_types::Triangle::new(a, b, c);
        let (_, bary) = closest_point_on_triangle(a, b, c, p);
        let d = (bary.interpolate(&tri) - p).norm();
        for v in [a, b, c] {
            prop_assert!(d <= (v - p).norm() + 1e-9);
        }
    }

    /// Reversing the winding negates the solid angle.
    #[test]
    fn solid_angle_is_antisymmetric(a in arb_point(), b in arb_point(), c in arb_point(), p in arb_point()) {
        let forward = signed_solid_angle(a, b, c, p);
        let reverse = signed_solid_angle(a, c, b, p);
        prop_assert!((forward + reverse).abs() < 1e-9);
    }
}

// =============================================================================
// Property Tests: Accelerated vs Brute Force
// =============================================================================

proptest! {
    /// The index finds the same minimum distance as a linear scan.
    #[test]
    fn nearest_matches_brute_force(
        mesh in arb_mesh(30, 60),
        config in arb_config(),
        points in prop::collection::vec(arb_point(), 1..20),
    ) {
        let index = MeshIndex::build_with_config(mesh.clone(), config).unwrap();
        for p in points {
            let expected = brute::closest_face(&mesh, p).unwrap().unwrap();
            let PointQuery::Found(hit) = index.query_point(p, f64::INFINITY) else {
                return Err(TestCaseError::fail("unbounded query found nothing"));
            };
            prop_assert_eq!(hit.face, expected.face);
            prop_assert_eq!(hit.distance, expected.distance);
            prop_assert!(hit.barycentric.is_valid(1e-6));
        }
    }

    /// A cutoff below the true distance yields NotFound, one above finds it.
    #[test]
    fn cutoff_is_respected(mesh in arb_mesh(20, 40), p in arb_point()) {
        let index = MeshIndex::build(mesh.clone()).unwrap();
        let expected = brute::closest_face(&mesh, p).unwrap().unwrap();

        if expected.distance > 1e-6 {
            prop_assert!(!index.query_point(p, expected.distance * 0.999).is_found());
        }
        let slack = expected.distance.mul_add(1e-9, 1e-12);
        let found = index.query_point(p, expected.distance + slack);
        prop_assert_eq!(found.face(), Some(expected.face));
    }

    /// Repeated queries are bit-identical.
    #[test]
    fn queries_are_deterministic(mesh in arb_mesh(20, 40), p in arb_point()) {
        let index = MeshIndex::build(mesh.clone()).unwrap();
        let rebuilt = MeshIndex::build_with_config(mesh, QueryConfig::default().with_parallel(false)).unwrap();
        let first = index.query_point(p, f64::INFINITY);
        prop_assert_eq!(first, index.query_point(p, f64::INFINITY));
        prop_assert_eq!(first, rebuilt.query_point(p, f64::INFINITY));
    }

    /// Hierarchical winding converges to the exact sum.
    #[test]
    fn tight_hierarchical_winding_is_exact(mesh in arb_mesh(20, 40), p in arb_point()) {
        let index = MeshIndex::build(mesh.clone()).unwrap();
        let exact = brute::winding_number(&mesh, p).unwrap();
        let tight = index.winding_number_approx(p, 1e12);
        prop_assert!((tight - exact).abs() < 1e-8, "{} vs {}", tight, exact);
        prop_assert!((index.winding_number_exact(p) - exact).abs() < 1e-12);
    }
}
