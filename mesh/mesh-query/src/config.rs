//! Configuration and presets for mesh queries.
//!
//! [`QueryConfig`] controls how the spatial index is built and how the
//! inside/outside sign of a query is decided.
//!
//! # Presets
//!
//! - [`QueryConfig::default()`] - Exact winding for small meshes, hierarchical approximation above
//! - [`QueryConfig::exact()`] - Always sum the exact winding number over every face
//! - [`QueryConfig::fast()`] - Hierarchical winding with a looser accuracy and larger leaves
//! - [`QueryConfig::face_normal()`] - Sign from the closest face's normal, no winding number
//!
//! # Example
//!
//! ```
//! use mesh_query::{QueryConfig, SignPolicy};
//!
//! let config = QueryConfig::default()
//!     .with_sign_policy(SignPolicy::ApproximateWinding)
//!     .with_winding_accuracy(3.0);
//! assert_eq!(config.sign_policy, SignPolicy::ApproximateWinding);
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a query decides whether the point is inside the surface.
///
/// Exact and approximate winding trade performance against numerical
/// guarantees: the exact sum visits every face, the hierarchical
/// approximation is exact near the surface and approximate far from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SignPolicy {
    /// Brute-force solid-angle sum over all faces. O(T) per query.
    ExactWinding,

    /// Hierarchical winding number over the BVH, using far-field dipole
    /// approximations for distant nodes.
    ApproximateWinding,

    /// Exact winding when the mesh has at most
    /// [`QueryConfig::exact_winding_face_limit`] faces, approximate otherwise.
    #[default]
    Adaptive,

    /// Sign of the offset from the closest point along the closest face's
    /// normal. Cheapest, but unreliable near edges and on non-manifold input.
    /// No winding number is reported.
    FaceNormal,
}

/// Configuration for building and querying a [`MeshIndex`](crate::MeshIndex).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QueryConfig {
    /// Maximum triangles per BVH leaf.
    /// Smaller values create deeper trees with tighter pruning.
    pub max_primitives_per_leaf: usize,

    /// Subtrees with at least this many triangles are built in parallel.
    pub parallel_build_threshold: usize,

    /// Containment policy.
    pub sign_policy: SignPolicy,

    /// Far-field threshold β: a BVH node is approximated when the query point
    /// is farther than `β × radius` from the node's centroid. Larger is more
    /// accurate and slower.
    pub winding_accuracy: f64,

    /// Largest face count for which [`SignPolicy::Adaptive`] uses the exact sum.
    pub exact_winding_face_limit: usize,

    /// Whether to use parallel processing (via rayon) for builds and batches.
    pub parallel: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_primitives_per_leaf: 4,
            parallel_build_threshold: 4096,
            sign_policy: SignPolicy::default(),
            winding_accuracy: 2.0,
            exact_winding_face_limit: 2048,
            parallel: true,
        }
    }
}

impl QueryConfig {
    /// Always use the exact winding number.
    ///
    /// Use for validation runs and small meshes.
    ///
    /// ```
    /// use mesh_query::{QueryConfig, SignPolicy};
    ///
    /// assert_eq!(QueryConfig::exact().sign_policy, SignPolicy::ExactWinding);
    /// ```
    #[must_use]
    pub fn exact() -> Self {
        Self {
            sign_policy: SignPolicy::ExactWinding,
            ..Self::default()
        }
    }

    /// Favour throughput on large meshes.
    ///
    /// ```
    /// use mesh_query::QueryConfig;
    ///
    /// let config = QueryConfig::fast();
    /// assert!(config.winding_accuracy < QueryConfig::default().winding_accuracy);
    /// ```
    #[must_use]
    pub fn fast() -> Self {
        Self {
            max_primitives_per_leaf: 8,
            sign_policy: SignPolicy::ApproximateWinding,
            winding_accuracy: 1.5,
            ..Self::default()
        }
    }

    /// Classify by closest face normal only.
    #[must_use]
    pub fn face_normal() -> Self {
        Self {
            sign_policy: SignPolicy::FaceNormal,
            ..Self::default()
        }
    }

    /// Set the BVH leaf size (at least 1).
    #[must_use]
    pub fn with_max_primitives_per_leaf(mut self, max: usize) -> Self {
        self.max_primitives_per_leaf = max.max(1);
        self
    }

    /// Set the parallel build threshold.
    #[must_use]
    pub const fn with_parallel_build_threshold(mut self, threshold: usize) -> Self {
        self.parallel_build_threshold = threshold;
        self
    }

    /// Set the containment policy.
    #[must_use]
    pub const fn with_sign_policy(mut self, policy: SignPolicy) -> Self {
        self.sign_policy = policy;
        self
    }

    /// Set the far-field threshold β.
    #[must_use]
    pub const fn with_winding_accuracy(mut self, accuracy: f64) -> Self {
        self.winding_accuracy = accuracy;
        self
    }

    /// Set the face count limit for [`SignPolicy::Adaptive`].
    #[must_use]
    pub const fn with_exact_winding_face_limit(mut self, limit: usize) -> Self {
        self.exact_winding_face_limit = limit;
        self
    }

    /// Enable or disable rayon parallelism.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Resolve [`SignPolicy::Adaptive`] for a mesh with `face_count` faces.
    #[must_use]
    pub fn resolve_sign_policy(&self, face_count: usize) -> SignPolicy {
        match self.sign_policy {
            SignPolicy::Adaptive if face_count <= self.exact_winding_face_limit => {
                SignPolicy::ExactWinding
            }
            SignPolicy::Adaptive => SignPolicy::ApproximateWinding,
            other => other,
        }
    }
}
