//! Procedural closed meshes.
//!
//! All shapes are watertight with CCW winding viewed from outside, which
//! makes them convenient fixtures for containment and distance queries.

// Segment counts are small; index casts cannot truncate in practice.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use std::f64::consts::{PI, TAU};

use crate::{IndexedMesh, Vertex};

/// Create a unit cube mesh from (0,0,0) to (1,1,1) with outward-facing normals.
///
/// # Example
///
/// ```
/// use mesh_types::{MeshTopology, unit_cube};
///
/// let cube = unit_cube();
/// assert_eq!(cube.vertex_count(), 8);
/// assert_eq!(cube.face_count(), 12);
/// ```
#[must_use]
pub fn unit_cube() -> IndexedMesh {
    let mut mesh = IndexedMesh::with_capacity(8, 12);

    mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0)); // 0
    mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0)); // 1
    mesh.vertices.push(Vertex::from_coords(1.0, 1.0, 0.0)); // 2
    mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0)); // 3
    mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 1.0)); // 4
    mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 1.0)); // 5
    mesh.vertices.push(Vertex::from_coords(1.0, 1.0, 1.0)); // 6
    mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 1.0)); // 7

    // Bottom face (z=0) - normal points -Z
    mesh.faces.push([0, 2, 1]);
    mesh.faces.push([0, 3, 2]);

    // Top face (z=1) - normal points +Z
    mesh.faces.push([4, 5, 6]);
    mesh.faces.push([4, 6, 7]);

    // Front face (y=0) - normal points -Y
    mesh.faces.push([0, 1, 5]);
    mesh.faces.push([0, 5, 4]);

    // Back face (y=1) - normal points +Y
    mesh.faces.push([3, 7, 6]);
    mesh.faces.push([3, 6, 2]);

    // Left face (x=0) - normal points -X
    mesh.faces.push([0, 4, 7]);
    mesh.faces.push([0, 7, 3]);

    // Right face (x=1) - normal points +X
    mesh.faces.push([1, 2, 6]);
    mesh.faces.push([1, 6, 5]);

    mesh
}

/// Create a UV sphere centred at the origin.
///
/// `segments` is the number of longitudinal slices (clamped to at least 3),
/// `rings` the number of latitudinal bands (clamped to at least 2). The
/// result has `2 * segments * (rings - 1)` triangles.
///
/// ```
/// use mesh_types::{MeshTopology, uv_sphere};
///
/// let sphere = uv_sphere(1.0, 16, 8);
/// assert_eq!(sphere.face_count(), 2 * 16 * 7);
/// assert!(sphere.signed_volume() > 0.0);
/// ```
#[must_use]
pub fn uv_sphere(radius: f64, segments: usize, rings: usize) -> IndexedMesh {
    let segments = segments.max(3);
    let rings = rings.max(2);
    let mut mesh = IndexedMesh::with_capacity(segments * (rings - 1) + 2, 2 * segments * (rings - 1));

    mesh.vertices.push(Vertex::from_coords(0.0, 0.0, radius));
    for i in 1..rings {
        let theta = PI * i as f64 / rings as f64;
        let (sin_t, cos_t) = theta.sin_cos();
        for j in 0..segments {
            let phi = TAU * j as f64 / segments as f64;
            let (sin_p, cos_p) = phi.sin_cos();
            mesh.vertices.push(Vertex::from_coords(
                radius * sin_t * cos_p,
                radius * sin_t * sin_p,
                radius * cos_t,
            ));
        }
    }
    mesh.vertices.push(Vertex::from_coords(0.0, 0.0, -radius));

    let north = 0u32;
    let south = (mesh.vertices.len() - 1) as u32;
    let ring_vertex = |ring: usize, seg: usize| (1 + ring * segments + seg % segments) as u32;

    for j in 0..segments {
        mesh.faces.push([north, ring_vertex(0, j), ring_vertex(0, j + 1)]);
    }
    for i in 0..rings - 2 {
        for j in 0..segments {
            let a = ring_vertex(i, j);
            let b = ring_vertex(i + 1, j);
            let c = ring_vertex(i + 1, j + 1);
            let d = ring_vertex(i, j + 1);
            mesh.faces.push([a, b, c]);
            mesh.faces.push([a, c, d]);
        }
    }
    for j in 0..segments {
        mesh.faces.push([south, ring_vertex(rings - 2, j + 1), ring_vertex(rings - 2, j)]);
    }

    mesh
}

/// Create a torus around the Z axis, centred at the origin.
///
/// * `major_radius` - distance from the axis to the tube centre
/// * `minor_radius` - tube radius
/// * `major_segments`, `minor_segments` - tessellation (each clamped to at least 3)
///
/// The solid region is the set of points within `minor_radius` of the
/// circle of radius `major_radius` in the XY plane.
///
/// ```
/// use mesh_types::{MeshTopology, torus};
///
/// let t = torus(2.0, 0.5, 24, 12);
/// assert_eq!(t.face_count(), 2 * 24 * 12);
/// assert!(t.signed_volume() > 0.0);
/// ```
#[must_use]
pub fn torus(
    major_radius: f64,
    minor_radius: f64,
    major_segments: usize,
    minor_segments: usize,
) -> IndexedMesh {
    let major_segments = major_segments.max(3);
    let minor_segments = minor_segments.max(3);
    let mut mesh = IndexedMesh::with_capacity(
        major_segments * minor_segments,
        2 * major_segments * minor_segments,
    );

    for i in 0..major_segments {
        let phi = TAU * i as f64 / major_segments as f64;
        let (sin_p, cos_p) = phi.sin_cos();
        for j in 0..minor_segments {
            let theta = TAU * j as f64 / minor_segments as f64;
            let (sin_t, cos_t) = theta.sin_cos();
            let ring = minor_radius.mul_add(cos_t, major_radius);
            mesh.vertices.push(Vertex::from_coords(
                ring * cos_p,
                ring * sin_p,
                minor_radius * sin_t,
            ));
        }
    }

    let index = |i: usize, j: usize| {
        ((i % major_segments) * minor_segments + (j % minor_segments)) as u32
    };
    for i in 0..major_segments {
        for j in 0..minor_segments {
            let a = index(i, j);
            let b = index(i + 1, j);
            let c = index(i + 1, j + 1);
            let d = index(i, j + 1);
            mesh.faces.push([a, b, c]);
            mesh.faces.push([a, c, d]);
        }
    }

    mesh
}
