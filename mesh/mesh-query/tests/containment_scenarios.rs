//! End-to-end scenarios: containment on closed meshes, batch behaviour and
//! query scaling.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::cast_precision_loss
)]

use std::f64::consts::{PI, TAU};

use mesh_query::{
    MeshIndex, PointQuery, QueryConfig, SignPolicy, TraversalStats, batch_query,
    batch_query_brute, brute, compare_batches,
};
use mesh_types::{IndexedMesh, MeshTopology, Point3, torus, unit_cube, uv_sphere};

// =============================================================================
// Helpers
// =============================================================================

const MAJOR: f64 = 2.0;
const MINOR: f64 = 0.5;

/// Signed distance to the analytic torus around the Z axis.
fn torus_sdf(p: &Point3<f64>) -> f64 {
    let ring = p.x.hypot(p.y) - MAJOR;
    ring.hypot(p.z) - MINOR
}

/// Regular grid of `n³` points spanning `[-extent, extent]³`.
fn grid(n: usize, extent: f64) -> Vec<Point3<f64>> {
    let step = 2.0 * extent / (n - 1) as f64;
    let coord = |i: usize| (i as f64).mul_add(step, -extent);
    let mut points = Vec::with_capacity(n * n * n);
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                points.push(Point3::new(coord(i), coord(j), coord(k) * 0.5));
            }
        }
    }
    points
}

// =============================================================================
// Torus grid
// =============================================================================

#[test]
fn torus_grid_winding_matches_analytic_solid() {
    // 1920 faces: below the adaptive limit, so signs use the exact winding number
    let mesh = torus(MAJOR, MINOR, 48, 20);
    let index = MeshIndex::build(mesh.clone()).unwrap();
    let points = grid(21, 3.0);

    let result = batch_query(&index, &points, f64::INFINITY);
    let mut checked = 0;

    for (i, p) in points.iter().enumerate() {
        let sdf = torus_sdf(p);
        if sdf.abs() < 0.05 {
            continue;
        }
        checked += 1;

        let winding = brute::winding_number(&mesh, *p).unwrap();
        let inside = sdf < 0.0;
        assert_eq!(winding > TAU, inside, "winding {winding} at {p}");
        if inside {
            assert!((winding - 4.0 * PI).abs() < 1e-6);
        } else {
            assert!(winding.abs() < 1e-6);
        }
        assert_eq!(result.signs[i] < 0.0, inside, "sign at {p}");
    }

    assert!(checked > points.len() / 2);
    let inside_points = result.inside_points(&points);
    assert!(!inside_points.is_empty());
    assert!(inside_points.iter().all(|p| torus_sdf(p) < 0.05));
}

#[test]
fn torus_hole_is_outside() {
    let index = MeshIndex::build(torus(MAJOR, MINOR, 32, 16)).unwrap();
    assert!(!index.is_inside(Point3::origin()));
    assert!(index.is_inside(Point3::new(MAJOR, 0.0, 0.0)));
    assert!(index.is_inside(Point3::new(0.0, -MAJOR, 0.1)));
}

#[test]
fn approximate_policy_agrees_on_torus() {
    let mesh = torus(MAJOR, MINOR, 48, 24);
    let config = QueryConfig::default().with_sign_policy(SignPolicy::ApproximateWinding);
    let index = MeshIndex::build_with_config(mesh, config).unwrap();

    for p in grid(11, 3.0) {
        if torus_sdf(&p).abs() < 0.1 {
            continue;
        }
        assert_eq!(index.is_inside(p), torus_sdf(&p) < 0.0, "at {p}");
    }
}

// =============================================================================
// Polygon input
// =============================================================================

#[test]
fn quad_cube_from_polygons() {
    let positions = unit_cube().vertices.iter().map(|v| v.position).collect();
    let quads = [
        0, 3, 2, 1, // bottom
        4, 5, 6, 7, // top
        0, 1, 5, 4, // front
        3, 7, 6, 2, // back
        0, 4, 7, 3, // left
        1, 2, 6, 5, // right
    ];
    let mesh = IndexedMesh::from_polygons(positions, &[4; 6], &quads);
    assert_eq!(mesh.face_count(), 12);
    assert!((mesh.signed_volume() - 1.0).abs() < 1e-12);

    let index = MeshIndex::build(mesh).unwrap();
    assert!(index.is_inside(Point3::new(0.5, 0.5, 0.5)));
    assert!(!index.is_inside(Point3::new(1.5, 0.5, 0.5)));
}

// =============================================================================
// Batch behaviour
// =============================================================================

#[test]
fn batch_marks_distant_points_not_found() {
    let index = MeshIndex::build(uv_sphere(1.0, 16, 8)).unwrap();
    let points = vec![
        Point3::origin(),
        Point3::new(10.0, 0.0, 0.0),
        Point3::new(0.0, 1.2, 0.0),
        Point3::new(0.0, 0.0, -50.0),
    ];

    let result = batch_query(&index, &points, 1.5);
    assert_eq!(result.faces.iter().map(Option::is_some).collect::<Vec<_>>(), vec![
        true, false, true, false
    ]);
    assert_eq!(result.signs, vec![-1.0, 0.0, 1.0, 0.0]);
    assert!(result.distances[1].is_infinite());
    assert_eq!(result.inside_points(&points), vec![Point3::origin()]);
}

#[test]
fn batch_validation_against_brute_force() {
    let mesh = torus(MAJOR, MINOR, 24, 12);
    let points = grid(9, 3.0);

    for config in [QueryConfig::exact(), QueryConfig::default(), QueryConfig::face_normal()] {
        let index = MeshIndex::build_with_config(mesh.clone(), config).unwrap();
        let accelerated = batch_query(&index, &points, f64::INFINITY);
        let reference = batch_query_brute(&mesh, &points).unwrap();
        let cmp = compare_batches(&accelerated, &reference, 1e-4);

        assert_eq!(cmp.found_mismatches, 0);
        assert_eq!(cmp.face_mismatches, 0);
        assert_eq!(cmp.max_distance_error, 0.0);
        if index.sign_policy() == SignPolicy::ExactWinding {
            assert_eq!(cmp.sign_mismatches, 0);
        }
    }
}

#[test]
fn batch_is_deterministic() {
    let index = MeshIndex::build(torus(MAJOR, MINOR, 24, 12)).unwrap();
    let points = grid(9, 3.0);
    let first = batch_query(&index, &points, 1.0);
    for _ in 0..3 {
        assert_eq!(batch_query(&index, &points, 1.0), first);
    }
}

#[test]
fn concurrent_queries_share_index() {
    let index = MeshIndex::build(uv_sphere(1.0, 24, 12)).unwrap();
    let p = Point3::new(0.3, 0.2, 0.1);
    let expected = index.query_point(p, f64::INFINITY);

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| assert_eq!(index.query_point(p, f64::INFINITY), expected));
        }
    });
}

// =============================================================================
// Scaling
// =============================================================================

/// Average triangles tested per query over a fixed set of near-surface points.
fn mean_triangles_tested(index: &MeshIndex) -> f64 {
    let directions = [
        (1.0, 0.0, 0.0),
        (0.0, 1.0, 0.0),
        (0.0, 0.0, 1.0),
        (0.6, 0.8, 0.0),
        (-0.48, 0.6, 0.64),
        (0.0, -0.6, -0.8),
    ];

    let mut total = TraversalStats::default();
    let mut queries = 0;
    for (x, y, z) in directions {
        for radius in [0.7, 1.3] {
            let p = Point3::new(x * radius, y * radius, z * radius);
            let (query, stats) = index.query_point_with_stats(p, f64::INFINITY);
            assert!(matches!(query, PointQuery::Found(_)));
            total.triangles_tested += stats.triangles_tested;
            queries += 1;
        }
    }
    total.triangles_tested as f64 / f64::from(queries)
}

#[test]
fn triangles_tested_grow_sublinearly() {
    let sizes = [16, 32, 64, 128];
    let mut measurements = Vec::new();

    for segments in sizes {
        let index = MeshIndex::build(uv_sphere(1.0, segments, segments / 2)).unwrap();
        measurements.push((index.face_count() as f64, mean_triangles_tested(&index)));
    }

    let (small_faces, small_tested) = measurements[0];
    let (large_faces, large_tested) = measurements[measurements.len() - 1];

    // 72x more faces should cost far less than 72x more triangle tests
    let face_growth = large_faces / small_faces;
    let test_growth = large_tested / small_tested;
    assert!(test_growth < face_growth / 4.0, "{measurements:?}");
    assert!(large_tested < large_faces / 20.0, "{measurements:?}");
}
