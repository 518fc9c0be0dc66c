//! Closest-point and containment queries against triangle meshes.
//!
//! For a query point this crate finds the closest point on a triangle
//! surface (face, barycentric coordinates, distance) and decides whether the
//! point is inside the surface using the generalized winding number.
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with zero Bevy dependencies.
//!
//! # Engines
//!
//! - [`brute`] scans every face. No preprocessing, O(T) per query.
//! - [`MeshIndex`] builds a [`Bvh`] once and answers nearest-surface queries
//!   in roughly logarithmic time. Containment follows a [`SignPolicy`]:
//!   exact winding, hierarchical (approximate) winding, or the closest
//!   face's normal.
//!
//! Both engines share the per-triangle kernels in [`closest_point_on_triangle`]
//! and [`signed_solid_angle`], so they agree exactly on faces and distances.
//!
//! # Conventions
//!
//! Faces are wound counter-clockwise seen from outside. The winding number
//! is reported in steradians: about 0 outside and about 4π inside a closed
//! surface. A point counts as inside when its winding number exceeds 2π.
//!
//! # Example
//!
//! ```
//! use mesh_query::{MeshIndex, PointQuery, QueryConfig, batch_query};
//! use mesh_types::{Point3, uv_sphere};
//!
//! let index = MeshIndex::build_with_config(uv_sphere(1.0, 32, 16), QueryConfig::default()).unwrap();
//!
//! match index.query_point(Point3::new(0.0, 0.0, 0.5), f64::INFINITY) {
//!     PointQuery::Found(hit) => {
//!         assert!(hit.is_inside());
//!         assert!((hit.distance - 0.5).abs() < 0.01);
//!     }
//!     PointQuery::NotFound => unreachable!(),
//! }
//!
//! let points = vec![Point3::origin(), Point3::new(3.0, 0.0, 0.0)];
//! let result = batch_query(&index, &points, f64::INFINITY);
//! assert_eq!(result.signs, vec![-1.0, 1.0]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod batch;
pub mod brute;
pub mod bvh;
mod config;
mod error;
mod index;
mod triangle;

pub use batch::{BatchComparison, BatchResult, batch_query, batch_query_brute, compare_batches};
pub use bvh::{Bvh, BvhStats, TraversalStats, WindingMoment};
pub use config::{QueryConfig, SignPolicy};
pub use error::{IndexError, IndexResult};
pub use index::{MeshIndex, PointQuery, SurfacePoint};
pub use triangle::{
    Barycentric, TriangleRegion, closest_point, closest_point_on_triangle, signed_solid_angle,
};
