//! Indexed triangle mesh.

use crate::{MeshTopology, Triangle, Vertex};
use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An indexed triangle mesh.
///
/// Stores vertices and faces separately, with faces referencing vertices
/// by index. Two meshes built from the same arrays are interchangeable.
///
/// # Winding Order
///
/// Faces use **counter-clockwise (CCW) winding** when viewed from outside.
/// This means normals point outward by the right-hand rule.
///
/// # Example
///
/// ```
/// use mesh_types::{IndexedMesh, Vertex, MeshTopology};
///
/// let mut mesh = IndexedMesh::new();
/// mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
/// mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
/// mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0));
/// mesh.faces.push([0, 1, 2]);
///
/// assert_eq!(mesh.vertex_count(), 3);
/// assert_eq!(mesh.face_count(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IndexedMesh {
    /// Vertex data.
    pub vertices: Vec<Vertex>,

    /// Triangle faces as indices into the vertex array.
    /// Each face is `[v0, v1, v2]` with counter-clockwise winding.
    pub faces: Vec<[u32; 3]>,
}

impl IndexedMesh {
    /// Create a new empty mesh.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Create a mesh with pre-allocated capacity.
    #[inline]
    #[must_use]
    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
        }
    }

    /// Create a mesh from vertices and faces.
    #[inline]
    #[must_use]
    pub const fn from_parts(vertices: Vec<Vertex>, faces: Vec<[u32; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Create a mesh from bare positions and faces.
    ///
    /// ```
    /// use mesh_types::{IndexedMesh, Point3, MeshTopology};
    ///
    /// let mesh = IndexedMesh::from_positions(
    ///     vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
    ///     vec![[0, 1, 2]],
    /// );
    /// assert_eq!(mesh.face_count(), 1);
    /// ```
    #[must_use]
    pub fn from_positions(positions: Vec<Point3<f64>>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            vertices: positions.into_iter().map(Vertex::new).collect(),
            faces,
        }
    }

    /// Create a mesh from flat coordinate and index arrays.
    ///
    /// * `positions` - `[x0, y0, z0, x1, y1, z1, ...]`
    /// * `indices` - `[a0, b0, c0, a1, b1, c1, ...]`
    ///
    /// Returns an empty mesh if either array length is not a multiple of 3.
    ///
    /// ```
    /// use mesh_types::{IndexedMesh, MeshTopology};
    ///
    /// let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    /// let mesh = IndexedMesh::from_raw(&positions, &[0, 1, 2]);
    /// assert_eq!(mesh.vertex_count(), 3);
    /// assert_eq!(mesh.face_count(), 1);
    /// ```
    #[must_use]
    pub fn from_raw(positions: &[f64], indices: &[u32]) -> Self {
        if positions.len() % 3 != 0 || indices.len() % 3 != 0 {
            return Self::new();
        }

        let vertices = positions
            .chunks_exact(3)
            .map(|c| Vertex::from_coords(c[0], c[1], c[2]))
            .collect();

        let faces = indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();

        Self { vertices, faces }
    }

    /// Create a mesh from polygon faces by fan triangulation.
    ///
    /// Polygon `k` has `face_vertex_counts[k]` corners, read consecutively
    /// from `face_vertex_indices`. A polygon `[p0, p1, ..., pn]` becomes the
    /// triangles `[p0, p(i+1), p(i+2)]` for `i in 0..n-2`, preserving the
    /// polygon's winding. Polygons with fewer than three corners produce no
    /// triangles.
    ///
    /// Returns an empty mesh if the counts do not add up to the number of
    /// indices.
    ///
    /// ```
    /// use mesh_types::{IndexedMesh, Point3, MeshTopology};
    ///
    /// let quad = vec![
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(1.0, 1.0, 0.0),
    ///     Point3::new(0.0, 1.0, 0.0),
    /// ];
    /// let mesh = IndexedMesh::from_polygons(quad, &[4], &[0, 1, 2, 3]);
    /// assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
    /// ```
    #[must_use]
    pub fn from_polygons(
        positions: Vec<Point3<f64>>,
        face_vertex_counts: &[u32],
        face_vertex_indices: &[u32],
    ) -> Self {
        let total: usize = face_vertex_counts.iter().map(|&n| n as usize).sum();
        if total != face_vertex_indices.len() {
            return Self::new();
        }

        let triangle_count: usize = face_vertex_counts
            .iter()
            .map(|&n| (n as usize).saturating_sub(2))
            .sum();
        let mut faces = Vec::with_capacity(triangle_count);

        let mut start = 0;
        for &count in face_vertex_counts {
            let count = count as usize;
            let polygon = &face_vertex_indices[start..start + count];
            for i in 0..count.saturating_sub(2) {
                faces.push([polygon[0], polygon[i + 1], polygon[i + 2]]);
            }
            start += count;
        }

        Self::from_positions(positions, faces)
    }

    /// Find the first face that references a vertex outside the vertex array.
    ///
    /// Returns `(face_index, vertex_index)` of the offending reference.
    #[must_use]
    pub fn find_invalid_face(&self) -> Option<(usize, u32)> {
        let vertex_count = self.vertices.len();
        self.faces.iter().enumerate().find_map(|(face_idx, face)| {
            face.iter()
                .find(|&&v| v as usize >= vertex_count)
                .map(|&v| (face_idx, v))
        })
    }

    /// Compute the signed volume of the mesh.
    ///
    /// Positive for a closed mesh with outward-facing normals, negative when
    /// inside-out. Not meaningful for open meshes.
    #[must_use]
    pub fn signed_volume(&self) -> f64 {
        let volume: f64 = self
            .triangles()
            .map(|tri| tri.v0.coords.dot(&tri.v1.coords.cross(&tri.v2.coords)))
            .sum();
        volume / 6.0
    }

    /// Flip all face normals by reversing winding order.
    pub fn flip_normals(&mut self) {
        for face in &mut self.faces {
            face.swap(1, 2);
        }
    }

    /// Merge another mesh into this one, offsetting its face indices.
    #[allow(clippy::cast_possible_truncation)]
    // Truncation: mesh indices are u32, so vertex counts > 4B are unsupported by design
    pub fn merge(&mut self, other: &Self) {
        let vertex_offset = self.vertices.len() as u32;

        self.vertices.extend(other.vertices.iter().copied());
        self.faces.extend(
            other
                .faces
                .iter()
                .map(|f| [f[0] + vertex_offset, f[1] + vertex_offset, f[2] + vertex_offset]),
        );
    }
}

impl MeshTopology for IndexedMesh {
    #[inline]
    fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    fn face_count(&self) -> usize {
        self.faces.len()
    }

    fn face(&self, index: usize) -> Option<[u32; 3]> {
        self.faces.get(index).copied()
    }

    /// Iterate over all triangles.
    ///
    /// # Panics
    ///
    /// Panics if a face references a missing vertex; see
    /// [`IndexedMesh::find_invalid_face`].
    fn triangles(&self) -> impl Iterator<Item = Triangle> {
        self.faces.iter().map(|&[i0, i1, i2]| Triangle {
            v0: self.vertices[i0 as usize].position,
            v1: self.vertices[i1 as usize].position,
            v2: self.vertices[i2 as usize].position,
        })
    }
}
