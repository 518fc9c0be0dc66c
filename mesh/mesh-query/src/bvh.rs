//! Bounding Volume Hierarchy over mesh triangles.
//!
//! The tree is built top-down:
//! 1. Compute the AABB and centroid of every triangle
//! 2. Find the longest axis of the node bounds
//! 3. Sort primitives by centroid along that axis (ties by face index)
//! 4. Split at the median and recurse
//!
//! Nodes live in a flat array in depth-first order with the root at index 0.
//! Each node also carries a [`WindingMoment`] so that the winding number of
//! a distant subtree can be approximated without visiting its triangles.
//!
//! Large subtrees are built with `rayon::join`. Because the split is a pure
//! function of the input, the parallel and sequential builds produce the
//! same tree.

// Node and primitive counts stay far below 2^52.
#![allow(clippy::cast_precision_loss)]

use mesh_types::{Aabb, Triangle};
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use smallvec::{SmallVec, smallvec};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Relative slack on the pruning bound, so that a closest point rounded
/// slightly outside its triangle's box is never culled.
const PRUNE_SLACK: f64 = 1.0 + 8.0 * f64::EPSILON;

/// Inline capacity of traversal stacks; a median-split tree over 2^32
/// triangles is at most 33 levels deep.
type NodeStack<T> = SmallVec<[T; 64]>;

/// A triangle stored in the BVH.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhPrimitive {
    /// Axis-aligned bounding box of the triangle.
    pub aabb: Aabb,
    /// Triangle centroid, used as the split key.
    pub centroid: Point3<f64>,
    /// Face index in the source mesh.
    pub index: usize,
}

impl BvhPrimitive {
    /// Create a primitive from a triangle.
    #[must_use]
    pub fn from_triangle(tri: &Triangle, index: usize) -> Self {
        Self {
            aabb: tri.aabb(),
            centroid: tri.centroid(),
            index,
        }
    }
}

/// First-order moments of the surface under a BVH node.
///
/// Used for the far-field winding approximation: seen from far enough away,
/// the subtree behaves like a single dipole of strength `normal` located at
/// `centroid`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WindingMoment {
    /// Total triangle area.
    pub area: f64,
    /// Area-weighted centroid (plain mean of centroids for zero-area subtrees).
    pub centroid: Point3<f64>,
    /// Area-weighted normal sum, `Σ ½ (b − a) × (c − a)`.
    pub normal: Vector3<f64>,
    /// Radius of a ball around `centroid` enclosing every vertex.
    pub radius: f64,
}

impl WindingMoment {
    fn from_triangles<'a>(triangles: impl Iterator<Item = &'a Triangle> + Clone) -> Self {
        let mut area = 0.0;
        let mut weighted = Vector3::zeros();
        let mut mean = Vector3::zeros();
        let mut normal = Vector3::zeros();
        let mut count = 0usize;

        for tri in triangles.clone() {
            let n = tri.normal_unnormalized() * 0.5;
            let a = n.norm();
            let c = tri.centroid().coords;
            area += a;
            weighted += c * a;
            mean += c;
            normal += n;
            count += 1;
        }

        let centroid = if area > 0.0 {
            Point3::from(weighted / area)
        } else {
            Point3::from(mean / count.max(1) as f64)
        };

        let radius = triangles
            .flat_map(|t| [t.v0, t.v1, t.v2])
            .map(|v| (v - centroid).norm())
            .fold(0.0, f64::max);

        Self {
            area,
            centroid,
            normal,
            radius,
        }
    }

    fn combine(left: &Self, right: &Self) -> Self {
        let area = left.area + right.area;
        let centroid = if area > 0.0 {
            Point3::from((left.centroid.coords * left.area + right.centroid.coords * right.area) / area)
        } else {
            nalgebra::center(&left.centroid, &right.centroid)
        };
        let radius = (left.radius + (left.centroid - centroid).norm())
            .max(right.radius + (right.centroid - centroid).norm());

        Self {
            area,
            centroid,
            normal: left.normal + right.normal,
            radius,
        }
    }

    /// Dipole approximation of the subtree's solid angle seen from `point`.
    #[inline]
    #[must_use]
    pub fn far_field(&self, point: &Point3<f64>) -> f64 {
        let offset = self.centroid - point;
        let dist = offset.norm();
        self.normal.dot(&offset) / (dist * dist * dist)
    }
}

/// A node in the flattened tree.
#[derive(Debug, Clone, PartialEq)]
enum BvhNode {
    /// Internal node with two children.
    Internal {
        aabb: Aabb,
        moment: WindingMoment,
        left: usize,
        right: usize,
    },
    /// Leaf node over a contiguous primitive range.
    Leaf {
        aabb: Aabb,
        moment: WindingMoment,
        first_primitive: usize,
        primitive_count: usize,
    },
}

impl BvhNode {
    fn aabb(&self) -> &Aabb {
        match self {
            Self::Internal { aabb, .. } | Self::Leaf { aabb, .. } => aabb,
        }
    }

    fn moment(&self) -> &WindingMoment {
        match self {
            Self::Internal { moment, .. } | Self::Leaf { moment, .. } => moment,
        }
    }
}

/// Boxed tree produced by the (possibly parallel) build, flattened afterwards.
enum BuildNode {
    Internal {
        aabb: Aabb,
        moment: WindingMoment,
        left: Box<Self>,
        right: Box<Self>,
    },
    Leaf {
        aabb: Aabb,
        moment: WindingMoment,
        first_primitive: usize,
        primitive_count: usize,
    },
}

impl BuildNode {
    fn moment(&self) -> &WindingMoment {
        match self {
            Self::Internal { moment, .. } | Self::Leaf { moment, .. } => moment,
        }
    }
}

/// Work counters for a single traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraversalStats {
    /// Nodes popped and not pruned.
    pub nodes_visited: usize,
    /// Triangles whose exact distance was evaluated.
    pub triangles_tested: usize,
}

/// Statistics about BVH structure.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BvhStats {
    /// Number of internal (branch) nodes.
    pub internal_count: usize,
    /// Number of leaf nodes.
    pub leaf_count: usize,
    /// Maximum depth of the tree.
    pub max_depth: usize,
    /// Maximum number of triangles in any leaf.
    pub max_leaf_size: usize,
    /// Total triangles stored across all leaves.
    pub total_triangles_in_leaves: usize,
}

/// Bounding Volume Hierarchy over a triangle list.
///
/// The BVH stores only face indices and bounds; distance and solid-angle
/// evaluation of individual triangles is supplied by the caller, which owns
/// the triangles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bvh {
    /// Tree nodes in depth-first order (index 0 is the root).
    nodes: Vec<BvhNode>,
    /// Primitives, reordered so that each leaf covers a contiguous range.
    primitives: Vec<BvhPrimitive>,
}

impl Bvh {
    /// Build a BVH over `triangles` on the calling thread.
    ///
    /// Face `i` of the tree refers to `triangles[i]`.
    #[must_use]
    pub fn build(triangles: &[Triangle], max_primitives_per_leaf: usize) -> Self {
        let primitives = triangles
            .iter()
            .enumerate()
            .map(|(i, tri)| BvhPrimitive::from_triangle(tri, i))
            .collect();
        Self::build_from(triangles, primitives, max_primitives_per_leaf, usize::MAX)
    }

    /// Build a BVH using rayon for subtrees with at least `parallel_threshold` triangles.
    ///
    /// The result is identical to [`Bvh::build`].
    #[must_use]
    pub fn build_parallel(
        triangles: &[Triangle],
        max_primitives_per_leaf: usize,
        parallel_threshold: usize,
    ) -> Self {
        let primitives = triangles
            .par_iter()
            .enumerate()
            .map(|(i, tri)| BvhPrimitive::from_triangle(tri, i))
            .collect();
        Self::build_from(
            triangles,
            primitives,
            max_primitives_per_leaf,
            parallel_threshold.max(2),
        )
    }

    fn build_from(
        triangles: &[Triangle],
        mut primitives: Vec<BvhPrimitive>,
        max_primitives_per_leaf: usize,
        parallel_threshold: usize,
    ) -> Self {
        if primitives.is_empty() {
            return Self::default();
        }

        let max_leaf = max_primitives_per_leaf.max(1);
        let root = Self::build_recursive(triangles, &mut primitives, 0, max_leaf, parallel_threshold);

        // Upper bound for a binary tree
        let mut nodes = Vec::with_capacity(primitives.len() * 2);
        Self::flatten(root, &mut nodes);

        Self { nodes, primitives }
    }

    fn build_recursive(
        triangles: &[Triangle],
        primitives: &mut [BvhPrimitive],
        offset: usize,
        max_leaf: usize,
        parallel_threshold: usize,
    ) -> BuildNode {
        let aabb = primitives
            .iter()
            .fold(Aabb::empty(), |acc, prim| acc.union(&prim.aabb));

        if primitives.len() <= max_leaf {
            let moment = WindingMoment::from_triangles(
                primitives.iter().map(|prim| &triangles[prim.index]),
            );
            return BuildNode::Leaf {
                aabb,
                moment,
                first_primitive: offset,
                primitive_count: primitives.len(),
            };
        }

        let axis = aabb.longest_axis();
        primitives.sort_unstable_by(|a, b| {
            a.centroid[axis]
                .total_cmp(&b.centroid[axis])
                .then(a.index.cmp(&b.index))
        });

        let count = primitives.len();
        let mid = count / 2;
        let (lower, upper) = primitives.split_at_mut(mid);

        let (left, right) = if count >= parallel_threshold {
            rayon::join(
                || Self::build_recursive(triangles, lower, offset, max_leaf, parallel_threshold),
                || Self::build_recursive(triangles, upper, offset + mid, max_leaf, parallel_threshold),
            )
        } else {
            (
                Self::build_recursive(triangles, lower, offset, max_leaf, parallel_threshold),
                Self::build_recursive(triangles, upper, offset + mid, max_leaf, parallel_threshold),
            )
        };

        BuildNode::Internal {
            aabb,
            moment: WindingMoment::combine(left.moment(), right.moment()),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Append `node` and its subtree in depth-first order, returning its index.
    fn flatten(node: BuildNode, nodes: &mut Vec<BvhNode>) -> usize {
        let node_idx = nodes.len();
        match node {
            BuildNode::Leaf {
                aabb,
                moment,
                first_primitive,
                primitive_count,
            } => {
                nodes.push(BvhNode::Leaf {
                    aabb,
                    moment,
                    first_primitive,
                    primitive_count,
                });
            }
            BuildNode::Internal {
                aabb,
                moment,
                left,
                right,
            } => {
                nodes.push(BvhNode::Internal {
                    aabb,
                    moment,
                    left: 0,  // Placeholder
                    right: 0, // Placeholder
                });
                let left_idx = Self::flatten(*left, nodes);
                let right_idx = Self::flatten(*right, nodes);
                if let BvhNode::Internal { left, right, .. } = &mut nodes[node_idx] {
                    *left = left_idx;
                    *right = right_idx;
                }
            }
        }
        node_idx
    }

    /// Find the face nearest to `point` within `max_distance_squared`.
    ///
    /// `distance_squared(face)` must return the exact squared distance from
    /// `point` to that face; it is only called for faces whose bounds are
    /// within the current best. Children are visited nearest-box first.
    ///
    /// Returns `(face, squared_distance)`. Among faces at the same distance
    /// the lowest face index wins, matching a linear scan. Returns `None` if
    /// the tree is empty, the bound is negative or NaN, or no face lies
    /// within the bound (a face exactly at the bound is accepted).
    pub fn query_nearest<F>(
        &self,
        point: &Point3<f64>,
        max_distance_squared: f64,
        mut distance_squared: F,
        stats: &mut TraversalStats,
    ) -> Option<(usize, f64)>
    where
        F: FnMut(usize) -> f64,
    {
        if max_distance_squared.is_nan() || max_distance_squared < 0.0 {
            return None;
        }
        let root = self.nodes.first()?;
        let root_lower = root.aabb().distance_squared_to(point);
        if root_lower > max_distance_squared * PRUNE_SLACK {
            return None;
        }

        let mut best: Option<(usize, f64)> = None;
        let mut stack: NodeStack<(usize, f64)> = smallvec![(0, root_lower)];

        while let Some((node_idx, lower)) = stack.pop() {
            let bound = best.map_or(max_distance_squared, |(_, d)| d) * PRUNE_SLACK;
            if lower > bound {
                continue;
            }
            stats.nodes_visited += 1;

            match &self.nodes[node_idx] {
                BvhNode::Leaf {
                    first_primitive,
                    primitive_count,
                    ..
                } => {
                    let range = *first_primitive..(*first_primitive + *primitive_count);
                    for prim in &self.primitives[range] {
                        stats.triangles_tested += 1;
                        let d = distance_squared(prim.index);
                        let accept = match best {
                            None => d <= max_distance_squared,
                            Some((best_idx, best_d)) => {
                                d < best_d || (d == best_d && prim.index < best_idx)
                            }
                        };
                        if accept {
                            best = Some((prim.index, d));
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    let d_left = self.nodes[*left].aabb().distance_squared_to(point);
                    let d_right = self.nodes[*right].aabb().distance_squared_to(point);
                    let bound = best.map_or(max_distance_squared, |(_, d)| d) * PRUNE_SLACK;

                    // Push the farther child first so the nearer one is popped next
                    let (near, far) = if d_left <= d_right {
                        ((*left, d_left), (*right, d_right))
                    } else {
                        ((*right, d_right), (*left, d_left))
                    };
                    if far.1 <= bound {
                        stack.push(far);
                    }
                    if near.1 <= bound {
                        stack.push(near);
                    }
                }
            }
        }

        best
    }

    /// Hierarchical winding number at `point`.
    ///
    /// A node whose moment centroid is farther than `accuracy × radius` from
    /// `point` contributes its dipole approximation; otherwise its children
    /// are descended and leaves are summed with `solid_angle(face)`, which
    /// must return the exact signed solid angle of that face.
    ///
    /// As `accuracy` grows the result converges to the exact sum.
    pub fn winding_number<F>(&self, point: &Point3<f64>, accuracy: f64, mut solid_angle: F) -> f64
    where
        F: FnMut(usize) -> f64,
    {
        if self.nodes.is_empty() {
            return 0.0;
        }

        let mut total = 0.0;
        let mut stack: NodeStack<usize> = smallvec![0];

        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx];
            let moment = node.moment();
            let dist = (moment.centroid - point).norm();

            if dist > 0.0 && dist > accuracy * moment.radius {
                total += moment.far_field(point);
                continue;
            }

            match node {
                BvhNode::Leaf {
                    first_primitive,
                    primitive_count,
                    ..
                } => {
                    let range = *first_primitive..(*first_primitive + *primitive_count);
                    for prim in &self.primitives[range] {
                        total += solid_angle(prim.index);
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }

        total
    }

    /// Primitive slices of every leaf, in depth-first order.
    pub fn leaves(&self) -> impl Iterator<Item = &[BvhPrimitive]> {
        self.nodes.iter().filter_map(|node| match node {
            BvhNode::Leaf {
                first_primitive,
                primitive_count,
                ..
            } => Some(&self.primitives[*first_primitive..*first_primitive + *primitive_count]),
            BvhNode::Internal { .. } => None,
        })
    }

    /// Get the root AABB of the BVH.
    #[must_use]
    pub fn root_aabb(&self) -> Option<&Aabb> {
        self.nodes.first().map(BvhNode::aabb)
    }

    /// Get the winding moment of the whole surface.
    #[must_use]
    pub fn root_moment(&self) -> Option<&WindingMoment> {
        self.nodes.first().map(BvhNode::moment)
    }

    /// Get the number of nodes in the BVH.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the number of primitives.
    #[must_use]
    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    /// Check if the BVH is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get statistics about the BVH structure.
    #[must_use]
    pub fn stats(&self) -> BvhStats {
        let mut stats = BvhStats::default();
        if self.nodes.is_empty() {
            return stats;
        }

        let mut stack: NodeStack<(usize, usize)> = smallvec![(0, 0)];
        while let Some((node_idx, depth)) = stack.pop() {
            stats.max_depth = stats.max_depth.max(depth);
            match &self.nodes[node_idx] {
                BvhNode::Leaf {
                    primitive_count, ..
                } => {
                    stats.leaf_count += 1;
                    stats.total_triangles_in_leaves += primitive_count;
                    stats.max_leaf_size = stats.max_leaf_size.max(*primitive_count);
                }
                BvhNode::Internal { left, right, .. } => {
                    stats.internal_count += 1;
                    stack.push((*right, depth + 1));
                    stack.push((*left, depth + 1));
                }
            }
        }
        stats
    }
}
