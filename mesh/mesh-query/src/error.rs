//! Error types for index construction.

use thiserror::Error;

/// Result type for index construction.
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors that can occur while building a [`MeshIndex`](crate::MeshIndex).
///
/// Queries themselves never fail: a point with no surface within the cutoff
/// is reported as [`PointQuery::NotFound`](crate::PointQuery::NotFound).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// A face references a vertex outside the vertex array.
    #[error("invalid mesh: face {face} references vertex {vertex}, but the mesh has {vertex_count} vertices")]
    InvalidMesh {
        /// Index of the offending face.
        face: usize,
        /// The out-of-range vertex index.
        vertex: u32,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },

    /// A vertex has NaN or infinite coordinates.
    #[error("invalid mesh: vertex {vertex} has non-finite coordinates")]
    NonFiniteVertex {
        /// Index of the offending vertex.
        vertex: usize,
    },
}
