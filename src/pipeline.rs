//! Pipeline driver: centroids in, quaternion out
//!
//! A thin composition over [`crate::starid::pyramid`] and [`crate::attitude`]
//! -- reference wiring only, kept deliberately small since the pipeline
//! itself is explicitly out of depth-of-specification (§2, §6 "Pipeline
//! input protocol"). This is the one module allowed to use [`log`], since
//! the core algorithms themselves never log (§7 propagation policy).

use log::{info, warn};

use crate::attitude::{self, AttitudeEstimate, DirectionPair};
use crate::camera::Camera;
use crate::catalog::Catalog;
use crate::geometry::{Quaternion, Vec3};
use crate::pairdb::PairDistanceDatabase;
use crate::starid::{identify_pyramid, PyramidParams, StarIdentifier};

/// Outcome of running the full pipeline on one set of centroids.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub identifiers: Vec<StarIdentifier>,
    pub attitude: Option<AttitudeEstimate>,
}

/// Run star identification followed by attitude estimation over a list of
/// detected centroid directions (already unit vectors in the camera frame;
/// back-projection from pixel coordinates via `camera` is the caller's job
/// per §6).
pub fn run(
    centroids: &[Vec3],
    catalog: &Catalog,
    pair_db: &PairDistanceDatabase<'_>,
    params: PyramidParams,
) -> PipelineResult {
    let identifiers = identify_pyramid(centroids, catalog, pair_db, params);
    if identifiers.is_empty() {
        warn!("pyramid star identification returned no matches for {} centroids", centroids.len());
        return PipelineResult {
            identifiers,
            attitude: None,
        };
    }
    info!("identified {} of {} centroids", identifiers.len(), centroids.len());

    let pairs: Vec<DirectionPair> = identifiers
        .iter()
        .map(|id| DirectionPair::new(centroids[id.centroid_index], catalog[id.catalog_index].spatial))
        .collect();
    let attitude = attitude::estimate(&pairs);
    if attitude.is_none() {
        warn!("insufficient identifications ({}) for attitude estimation", identifiers.len());
    } else if attitude.as_ref().unwrap().ill_conditioned {
        warn!("attitude solution is ill-conditioned: identified stars may be nearly coplanar");
    }

    PipelineResult { identifiers, attitude }
}

/// Compare a pipeline result against ground-truth identifications (every
/// centroid's true catalog index), counting correct vs. incorrect guesses.
/// Used by the jittered-centroid comparison scenario (§8 scenario 5).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComparisonReport {
    pub correct: usize,
    pub incorrect: usize,
    pub unidentified: usize,
}

pub fn compare_to_ground_truth(identifiers: &[StarIdentifier], ground_truth: &[usize]) -> ComparisonReport {
    let mut report = ComparisonReport::default();
    let mut identified_centroids = vec![false; ground_truth.len()];
    for id in identifiers {
        identified_centroids[id.centroid_index] = true;
        if ground_truth[id.centroid_index] == id.catalog_index {
            report.correct += 1;
        } else {
            report.incorrect += 1;
        }
    }
    report.unidentified = identified_centroids.iter().filter(|&&seen| !seen).count();
    report
}

/// Back-project a list of pixel positions through `camera` into unit
/// direction vectors, the shape Pyramid expects (§6).
pub fn back_project_centroids(camera: &Camera, positions: &[crate::geometry::Vec2]) -> Vec<Vec3> {
    positions.iter().map(|p| camera.camera_to_spatial(p).normalize()).collect()
}
