//! Davenport q-method attitude estimator (§4.4)
//!
//! Solves Wahba's problem: given matched unit-direction pairs in the camera
//! and inertial frames, find the quaternion minimizing total squared
//! pointing error. Grounded on `lost`'s `DavenportQAlgorithm::Go`
//! (`attitude-estimators.cpp`), with one deliberate correction: the source
//! never separately populates its `b` vector (it pushes both `b` and `r`
//! into the same list, labeled `r`), which silently drops every measured
//! direction from the solution. Here `b_k` and `r_k` accumulate into
//! separate lists, as Wahba's problem requires.

use nalgebra::{Matrix3, Matrix4, SymmetricEigen, Vector3, Vector4};

use crate::geometry::{Quaternion, Vec3};

/// Eigenvalue separation below which the top two eigenvalues of `K` are
/// considered degenerate (§4.4, §7 `AttitudeIllConditioned`).
const ILL_CONDITIONED_EPSILON: f64 = 1e-6;

/// Result of [`estimate`]: the optimal quaternion, plus a flag (not an
/// error) warning that the solution may be ambiguous.
#[derive(Debug, Clone, Copy)]
pub struct AttitudeEstimate {
    pub quaternion: Quaternion,
    /// True if the top two eigenvalues of the Davenport `K` matrix are
    /// within [`ILL_CONDITIONED_EPSILON`] of each other -- the attitude
    /// solution may not be well-determined by the input directions.
    pub ill_conditioned: bool,
}

/// A single matched direction pair: `measured` in the camera frame,
/// `catalog` in the inertial frame, with an optional relative weight.
#[derive(Debug, Clone, Copy)]
pub struct DirectionPair {
    pub measured: Vec3,
    pub catalog: Vec3,
    pub weight: f64,
}

impl DirectionPair {
    pub fn new(measured: Vec3, catalog: Vec3) -> Self {
        DirectionPair {
            measured,
            catalog,
            weight: 1.0,
        }
    }
}

/// Solve Wahba's problem for `pairs` via the Davenport q-method. Returns
/// `None` if there are fewer than 2 pairs, or if every catalog direction is
/// parallel (the rotation is then underdetermined) -- both are
/// `InsufficientInput` conditions (§7), represented as an empty/absent
/// result rather than an error.
pub fn estimate(pairs: &[DirectionPair]) -> Option<AttitudeEstimate> {
    if pairs.len() < 2 {
        return None;
    }
    if !has_non_parallel_pair(pairs) {
        return None;
    }

    let mut b = Matrix3::<f64>::zeros();
    for pair in pairs {
        let bi = to_vector3(&pair.measured);
        let ri = to_vector3(&pair.catalog);
        b += bi * ri.transpose() * pair.weight;
    }

    let s = b + b.transpose();
    let sigma = b.trace();
    let z = Vector3::new(b[(1, 2)] - b[(2, 1)], b[(2, 0)] - b[(0, 2)], b[(0, 1)] - b[(1, 0)]);

    #[rustfmt::skip]
    let k = Matrix4::new(
        sigma,    z.x,                z.y,                z.z,
        z.x,      s[(0, 0)] - sigma,  s[(0, 1)],           s[(0, 2)],
        z.y,      s[(1, 0)],          s[(1, 1)] - sigma,   s[(1, 2)],
        z.z,      s[(2, 0)],          s[(2, 1)],           s[(2, 2)] - sigma,
    );

    let eigen = SymmetricEigen::new(k);
    let (max_index, second_max) = top_two_eigenvalue_indices(&eigen.eigenvalues);
    let ill_conditioned = (eigen.eigenvalues[max_index] - eigen.eigenvalues[second_max]).abs() < ILL_CONDITIONED_EPSILON;

    let v = eigen.eigenvectors.column(max_index);
    let quaternion = Quaternion::new(v[0], v[1], v[2], v[3]).canonicalize();

    Some(AttitudeEstimate {
        quaternion,
        ill_conditioned,
    })
}

fn to_vector3(v: &Vec3) -> Vector3<f64> {
    Vector3::new(v.x(), v.y(), v.z())
}

fn has_non_parallel_pair(pairs: &[DirectionPair]) -> bool {
    for i in 0..pairs.len() {
        for j in (i + 1)..pairs.len() {
            if pairs[i].catalog.cross(&pairs[j].catalog).magnitude() > 1e-9 {
                return true;
            }
        }
    }
    false
}

/// Indices of the largest and second-largest entries of `values`.
fn top_two_eigenvalue_indices(values: &Vector4<f64>) -> (usize, usize) {
    let mut order: [usize; 4] = [0, 1, 2, 3];
    order.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).expect("eigenvalues must not be NaN"));
    (order[0], order[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn rotated_pairs(q: &Quaternion, directions: &[Vec3]) -> Vec<DirectionPair> {
        directions
            .iter()
            .map(|r| DirectionPair::new(q.rotate(r), *r))
            .collect()
    }

    #[test]
    fn recovers_known_rotation_from_noiseless_pairs() {
        let q = Quaternion::from_axis_angle(&Vec3::new(0.0, 0.0, 1.0), 0.7).mul(&Quaternion::from_axis_angle(
            &Vec3::new(1.0, 0.0, 0.0),
            0.3,
        ));
        let q = q.canonicalize();

        let directions = [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.577, 0.577, 0.577),
        ];
        let pairs = rotated_pairs(&q, &directions);

        let result = estimate(&pairs).expect("estimate should succeed with 4 non-coplanar pairs");
        assert!(!result.ill_conditioned);
        assert_abs_diff_eq!(result.quaternion.w(), q.w(), epsilon = 1e-5);
        assert_abs_diff_eq!(result.quaternion.x(), q.x(), epsilon = 1e-5);
        assert_abs_diff_eq!(result.quaternion.y(), q.y(), epsilon = 1e-5);
        assert_abs_diff_eq!(result.quaternion.z(), q.z(), epsilon = 1e-5);
    }

    #[test]
    fn single_pair_is_insufficient() {
        let pairs = vec![DirectionPair::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0))];
        assert!(estimate(&pairs).is_none());
    }

    #[test]
    fn parallel_pairs_are_insufficient() {
        let r = Vec3::new(1.0, 0.0, 0.0);
        let pairs = vec![DirectionPair::new(r, r), DirectionPair::new(r, r)];
        assert!(estimate(&pairs).is_none());
    }

    #[test]
    fn output_quaternion_is_unit_norm() {
        let q = Quaternion::from_axis_angle(&Vec3::new(0.2, 0.5, 0.8).normalize(), 1.1);
        let directions = [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.2, 0.3, 0.9).normalize(),
        ];
        let pairs = rotated_pairs(&q, &directions);
        let result = estimate(&pairs).unwrap();
        assert_abs_diff_eq!(result.quaternion.norm(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn noisy_pairs_still_recover_approximate_rotation() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let q = Quaternion::from_axis_angle(&Vec3::new(0.0, 1.0, 0.0), 0.9);
        let directions = [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.4, 0.6, 0.7).normalize(),
            Vec3::new(-0.3, 0.5, 0.8).normalize(),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        let sigma = 1e-3;
        let pairs: Vec<DirectionPair> = directions
            .iter()
            .map(|r| {
                let measured = q.rotate(r);
                let noise = Vec3::new(rng.gen_range(-sigma..sigma), rng.gen_range(-sigma..sigma), rng.gen_range(-sigma..sigma));
                DirectionPair::new((measured + noise).normalize(), *r)
            })
            .collect();

        let result = estimate(&pairs).unwrap();
        assert_abs_diff_eq!(result.quaternion.w(), q.w(), epsilon = 1e-2);
        assert_abs_diff_eq!(result.quaternion.x(), q.x(), epsilon = 1e-2);
        assert_abs_diff_eq!(result.quaternion.y(), q.y(), epsilon = 1e-2);
        assert_abs_diff_eq!(result.quaternion.z(), q.z(), epsilon = 1e-2);
    }
}
