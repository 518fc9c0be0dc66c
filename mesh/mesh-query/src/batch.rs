//! Batch queries over many points.
//!
//! Each point is an independent query, so batches map over the points with
//! rayon and write one slot per point. A point with no surface within the
//! cutoff fills its slot with "not found" values; it never aborts the batch.

use std::f64::consts::TAU;

use mesh_types::IndexedMesh;
use nalgebra::Point3;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::brute;
use crate::error::IndexResult;
use crate::index::{MeshIndex, PointQuery};
use crate::triangle::Barycentric;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-point results of a batch query, as parallel arrays.
///
/// Slot `i` of every array describes point `i` of the input.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BatchResult {
    /// Closest face, or `None` if nothing was found.
    pub faces: Vec<Option<usize>>,
    /// Barycentric coordinates on the closest face.
    pub barycentrics: Vec<Option<Barycentric>>,
    /// -1.0 inside, +1.0 outside, 0.0 if nothing was found.
    pub signs: Vec<f64>,
    /// Winding number, when the sign policy computes one.
    pub winding_numbers: Vec<Option<f64>>,
    /// Distance to the closest point, `f64::INFINITY` if nothing was found.
    pub distances: Vec<f64>,
}

impl BatchResult {
    fn with_capacity(n: usize) -> Self {
        Self {
            faces: Vec::with_capacity(n),
            barycentrics: Vec::with_capacity(n),
            signs: Vec::with_capacity(n),
            winding_numbers: Vec::with_capacity(n),
            distances: Vec::with_capacity(n),
        }
    }

    fn push_not_found(&mut self, winding_number: Option<f64>) {
        self.faces.push(None);
        self.barycentrics.push(None);
        self.signs.push(0.0);
        self.winding_numbers.push(winding_number);
        self.distances.push(f64::INFINITY);
    }

    fn from_queries(queries: &[PointQuery]) -> Self {
        let mut result = Self::with_capacity(queries.len());
        for query in queries {
            match query {
                PointQuery::Found(hit) => {
                    result.faces.push(Some(hit.face));
                    result.barycentrics.push(Some(hit.barycentric));
                    result.signs.push(hit.sign);
                    result.winding_numbers.push(hit.winding_number);
                    result.distances.push(hit.distance);
                }
                PointQuery::NotFound => result.push_not_found(None),
            }
        }
        result
    }

    /// Number of points in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// Whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Number of points with a surface point found.
    #[must_use]
    pub fn found_count(&self) -> usize {
        self.faces.iter().filter(|f| f.is_some()).count()
    }

    /// Number of points classified as inside.
    #[must_use]
    pub fn inside_count(&self) -> usize {
        self.signs.iter().filter(|&&s| s < 0.0).count()
    }

    /// The points of `points` classified as inside.
    ///
    /// `points` must be the slice the batch was computed from.
    #[must_use]
    pub fn inside_points(&self, points: &[Point3<f64>]) -> Vec<Point3<f64>> {
        points
            .iter()
            .zip(&self.signs)
            .filter(|&(_, &sign)| sign < 0.0)
            .map(|(p, _)| *p)
            .collect()
    }
}

/// Query every point against `index` within `max_distance`.
///
/// Runs on the rayon pool when the index was configured with
/// `parallel = true`; the results are the same either way.
///
/// # Example
///
/// ```
/// use mesh_query::{MeshIndex, batch_query};
/// use mesh_types::{Point3, unit_cube};
///
/// let index = MeshIndex::build(unit_cube()).unwrap();
/// let points = [Point3::new(0.5, 0.5, 0.5), Point3::new(9.0, 0.0, 0.0)];
///
/// let result = batch_query(&index, &points, 2.0);
/// assert_eq!(result.signs, vec![-1.0, 0.0]);
/// assert!(result.faces[1].is_none());
/// assert_eq!(result.inside_points(&points), vec![points[0]]);
/// ```
#[must_use]
pub fn batch_query(index: &MeshIndex, points: &[Point3<f64>], max_distance: f64) -> BatchResult {
    let parallel = index.config().parallel;
    debug!(points = points.len(), parallel, max_distance, "Running batch query");

    let queries: Vec<PointQuery> = if parallel {
        points
            .par_iter()
            .map(|p| index.query_point(*p, max_distance))
            .collect()
    } else {
        points
            .iter()
            .map(|p| index.query_point(*p, max_distance))
            .collect()
    };

    let result = BatchResult::from_queries(&queries);
    log_summary(&result, "Batch query complete");
    result
}

/// Brute-force twin of [`batch_query`] with an unbounded cutoff.
///
/// Every slot carries the exact winding number, and the sign is derived
/// from it. Intended for validating accelerated results.
///
/// # Errors
///
/// Same as [`brute::validate_mesh`]; the mesh is checked once up front.
pub fn batch_query_brute(mesh: &IndexedMesh, points: &[Point3<f64>]) -> IndexResult<BatchResult> {
    brute::validate_mesh(mesh)?;
    debug!(points = points.len(), faces = mesh.faces.len(), "Running brute-force batch");

    let queries: Vec<brute::BruteForceResult> =
        points.par_iter().map(|p| brute::scan(mesh, *p)).collect();

    let mut result = BatchResult::with_capacity(queries.len());
    for query in &queries {
        match query.closest {
            Some(hit) => {
                result.faces.push(Some(hit.face));
                result.barycentrics.push(Some(hit.barycentric));
                result
                    .signs
                    .push(if query.winding_number > TAU { -1.0 } else { 1.0 });
                result.winding_numbers.push(Some(query.winding_number));
                result.distances.push(hit.distance);
            }
            None => result.push_not_found(Some(query.winding_number)),
        }
    }

    log_summary(&result, "Brute-force batch complete");
    Ok(result)
}

fn log_summary(result: &BatchResult, message: &str) {
    let found = result.found_count();
    if found == 0 && !result.is_empty() {
        warn!(points = result.len(), "No surface point found for any query");
        return;
    }
    info!(
        points = result.len(),
        found,
        inside = result.inside_count(),
        "{message}"
    );
}

/// Disagreements between two batches over the same points.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BatchComparison {
    /// Number of slots compared.
    pub compared: usize,
    /// Slots where one batch found a surface point and the other did not.
    pub found_mismatches: usize,
    /// Slots with different faces at distances that are not tied.
    pub face_mismatches: usize,
    /// Slots with different signs.
    pub sign_mismatches: usize,
    /// Largest absolute distance difference over slots found by both.
    pub max_distance_error: f64,
    /// Largest distance difference relative to `max(reference distance, 1)`.
    pub max_relative_distance_error: f64,
    /// Relative tolerance the comparison was made with.
    pub tolerance: f64,
}

impl BatchComparison {
    /// Whether the batches agree within tolerance.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.found_mismatches == 0
            && self.face_mismatches == 0
            && self.sign_mismatches == 0
            && self.max_relative_distance_error <= self.tolerance
    }
}

/// Compare `accelerated` against `reference`, slot by slot.
///
/// Distances agree when their difference is at most `tolerance` relative
/// to `max(reference distance, 1)`. Differing faces are only a mismatch when
/// their distances disagree; equal-distance faces are ties. Slots beyond
/// the shorter batch count as found mismatches.
#[must_use]
pub fn compare_batches(
    accelerated: &BatchResult,
    reference: &BatchResult,
    tolerance: f64,
) -> BatchComparison {
    let mut cmp = BatchComparison {
        compared: accelerated.len().min(reference.len()),
        found_mismatches: accelerated.len().abs_diff(reference.len()),
        tolerance,
        ..BatchComparison::default()
    };

    if accelerated.len() != reference.len() {
        warn!(
            accelerated = accelerated.len(),
            reference = reference.len(),
            "Comparing batches of different length"
        );
    }

    for i in 0..cmp.compared {
        let (face_a, face_b) = (accelerated.faces[i], reference.faces[i]);
        if face_a.is_some() != face_b.is_some() {
            cmp.found_mismatches += 1;
            continue;
        }
        if face_a.is_none() {
            continue;
        }

        let (da, db) = (accelerated.distances[i], reference.distances[i]);
        let error = (da - db).abs();
        let relative = error / db.abs().max(1.0);
        cmp.max_distance_error = cmp.max_distance_error.max(error);
        cmp.max_relative_distance_error = cmp.max_relative_distance_error.max(relative);

        if face_a != face_b && relative > tolerance {
            cmp.face_mismatches += 1;
        }
        if accelerated.signs[i] != reference.signs[i] {
            cmp.sign_mismatches += 1;
        }
    }

    debug!(
        compared = cmp.compared,
        face_mismatches = cmp.face_mismatches,
        sign_mismatches = cmp.sign_mismatches,
        max_distance_error = cmp.max_distance_error,
        "Compared batches"
    );
    cmp
}
