//! Pyramid star identification (§4.3)
//!
//! Picks four centroids forming a "pyramid", checks whether their six
//! pairwise distances uniquely match four catalog stars, and if so
//! propagates the identification to every other centroid. Grounded on
//! `lost`'s `PyramidStarIdAlgorithm::Go` / `PyramidIdentifyRemainingStars` /
//! `PairDistanceInvolvingIterator` (`star-id.cpp`).

use crate::catalog::Catalog;
use crate::geometry::{angle_unit, Vec3};
use crate::pairdb::PairDistanceDatabase;

use super::StarIdentifier;

/// Tuning parameters for [`identify_pyramid`].
#[derive(Debug, Clone, Copy)]
pub struct PyramidParams {
    /// Angular error (radians) expected in measured inter-star distances.
    pub tolerance: f64,
    /// Estimate of the density of spurious (dead/hot-pixel) detections
    /// across the celestial sphere, used in the mismatch-probability
    /// formula. Defaults to the catalog size when `None`, matching the
    /// source's use of `catalog.size()` in that role.
    pub num_false_stars: Option<f64>,
    /// Per-pattern upper bound on the chance-coincidence statistic; a
    /// pyramid whose `expectedMismatches` exceeds this is rejected before
    /// any database query.
    pub max_mismatch_probability: f64,
    /// Iteration budget across the whole `(dj, dk, dr, i)` search.
    pub cutoff: u64,
    /// If true, a pyramid is only accepted when it is the *unique* matching
    /// 4-tuple; if false, the first matching 4-tuple is accepted.
    pub strict_uniqueness: bool,
}

impl Default for PyramidParams {
    fn default() -> Self {
        PyramidParams {
            tolerance: 1e-5,
            num_false_stars: None,
            max_mismatch_probability: 1e-2,
            cutoff: 1_000_000,
            strict_uniqueness: true,
        }
    }
}

struct PyramidMatch {
    i: usize,
    j: usize,
    k: usize,
    r: usize,
    i_cat: u16,
    j_cat: u16,
    k_cat: u16,
    r_cat: u16,
}

/// Identify four of `centroids` (already unit vectors in the camera frame)
/// against `catalog` via `db`, then propagate to the rest. Returns an empty
/// list if fewer than 4 centroids are given, if the cutoff is exhausted
/// before a match, or (in strict mode) if more than one 4-tuple matches.
pub fn identify_pyramid(
    centroids: &[Vec3],
    catalog: &Catalog,
    db: &PairDistanceDatabase<'_>,
    params: PyramidParams,
) -> Vec<StarIdentifier> {
    if centroids.len() < 4 {
        return Vec::new();
    }

    let n = centroids.len() as i64;
    let num_false_stars = params.num_false_stars.unwrap_or(catalog.len() as f64);
    let mismatch_constant = (num_false_stars * params.tolerance).powi(4) / std::f64::consts::PI;

    let mut matches: Vec<PyramidMatch> = Vec::new();
    let mut total_iterations: u64 = 0;
    let mut cutoff_hit = false;

    'search: for dj in 1..(n - 1) {
        for dk in 1..(n - dj - 1) {
            for dr in 1..(n - dk - dj - 1) {
                for i in 0..(n - dj - dk - dr) {
                    total_iterations += 1;
                    if total_iterations > params.cutoff {
                        cutoff_hit = true;
                        break 'search;
                    }

                    let i = i as usize;
                    let j = i + dj as usize;
                    let k = j + dk as usize;
                    let r = k + dr as usize;

                    if let Some(found) =
                        match_pyramid(centroids, catalog, db, i, j, k, r, params.tolerance, mismatch_constant, params.max_mismatch_probability)
                    {
                        let stop_now = !params.strict_uniqueness || matches.len() + found.len() >= 2;
                        matches.extend(found);
                        if stop_now {
                            break 'search;
                        }
                    }
                }
            }
        }
    }

    let _ = cutoff_hit; // exhaustion and cutoff both just mean "use what we have"

    let chosen = if params.strict_uniqueness {
        if matches.len() == 1 {
            matches.pop()
        } else {
            None
        }
    } else {
        matches.into_iter().next()
    };

    let Some(m) = chosen else {
        return Vec::new();
    };

    let mut identified = vec![
        StarIdentifier::new(m.i, m.i_cat as usize),
        StarIdentifier::new(m.j, m.j_cat as usize),
        StarIdentifier::new(m.k, m.k_cat as usize),
        StarIdentifier::new(m.r, m.r_cat as usize),
    ];
    identify_remaining_stars(&mut identified, centroids, catalog, db, params.tolerance);
    identified
}

#[allow(clippy::too_many_arguments)]
fn match_pyramid(
    centroids: &[Vec3],
    catalog: &Catalog,
    db: &PairDistanceDatabase<'_>,
    i: usize,
    j: usize,
    k: usize,
    r: usize,
    tolerance: f64,
    mismatch_constant: f64,
    max_mismatch_probability: f64,
) -> Option<Vec<PyramidMatch>> {
    let i_spatial = centroids[i];
    let j_spatial = centroids[j];
    let k_spatial = centroids[k];
    let r_spatial = centroids[r];

    let ij_dist = angle_unit(&i_spatial, &j_spatial);
    let ik_dist = angle_unit(&i_spatial, &k_spatial);
    let ir_dist = angle_unit(&i_spatial, &r_spatial);
    let jk_dist = angle_unit(&j_spatial, &k_spatial);
    let jr_dist = angle_unit(&j_spatial, &r_spatial);
    let kr_dist = angle_unit(&k_spatial, &r_spatial);

    let i_sin_inner = angle_unit(&(j_spatial - i_spatial), &(k_spatial - i_spatial)).sin();
    let j_sin_inner = angle_unit(&(i_spatial - j_spatial), &(k_spatial - j_spatial)).sin();
    let k_sin_inner = angle_unit(&(i_spatial - k_spatial), &(j_spatial - k_spatial)).sin();

    let expected_mismatches =
        mismatch_constant * ij_dist.sin() / k_sin_inner / i_sin_inner.max(j_sin_inner).max(k_sin_inner);
    if expected_mismatches > max_mismatch_probability {
        return None;
    }

    let ij_pairs = db.find_pairs_liberal((ij_dist - tolerance) as f32, (ij_dist + tolerance) as f32);
    let ik_pairs = db.find_pairs_liberal((ik_dist - tolerance) as f32, (ik_dist + tolerance) as f32);
    let ir_pairs = db.find_pairs_liberal((ir_dist - tolerance) as f32, (ir_dist + tolerance) as f32);

    let mut i_candidates: Vec<u16> = ij_pairs.iter().flat_map(|&(a, b)| [a, b]).collect();
    i_candidates.sort_unstable();
    i_candidates.dedup();

    let observed_spectral_sign = spectral_sign(&i_spatial, &j_spatial, &k_spatial, &r_spatial);

    let mut found = Vec::new();
    for i_cat in i_candidates {
        for j_cat in involving(&ij_pairs, i_cat) {
            if j_cat == i_cat {
                continue;
            }
            for k_cat in involving(&ik_pairs, i_cat) {
                if k_cat == i_cat || k_cat == j_cat {
                    continue;
                }
                let jk_candidate = angle_unit(&catalog[j_cat as usize].spatial, &catalog[k_cat as usize].spatial);
                if (jk_candidate - jk_dist).abs() > tolerance {
                    continue;
                }
                for r_cat in involving(&ir_pairs, i_cat) {
                    if r_cat == i_cat || r_cat == j_cat || r_cat == k_cat {
                        continue;
                    }
                    let jr_candidate = angle_unit(&catalog[j_cat as usize].spatial, &catalog[r_cat as usize].spatial);
                    if (jr_candidate - jr_dist).abs() > tolerance {
                        continue;
                    }
                    let kr_candidate = angle_unit(&catalog[k_cat as usize].spatial, &catalog[r_cat as usize].spatial);
                    if (kr_candidate - kr_dist).abs() > tolerance {
                        continue;
                    }

                    let catalog_sign = spectral_sign(
                        &catalog[i_cat as usize].spatial,
                        &catalog[j_cat as usize].spatial,
                        &catalog[k_cat as usize].spatial,
                        &catalog[r_cat as usize].spatial,
                    );
                    if catalog_sign.signum() != observed_spectral_sign.signum() {
                        continue;
                    }

                    found.push(PyramidMatch {
                        i,
                        j,
                        k,
                        r,
                        i_cat,
                        j_cat,
                        k_cat,
                        r_cat,
                    });
                }
            }
        }
    }

    if found.is_empty() {
        None
    } else {
        Some(found)
    }
}

/// Scalar triple product `(b-a) x (c-a) . (d-a)`, whose sign distinguishes a
/// pyramid from its mirror image (§4.3 step 3 spectrality check).
fn spectral_sign(a: &Vec3, b: &Vec3, c: &Vec3, d: &Vec3) -> f64 {
    let ab = *b - *a;
    let ac = *c - *a;
    let ad = *d - *a;
    ab.cross(&ac).dot(&ad)
}

/// Every catalog index paired with `star` in `pairs` -- the Rust stand-in
/// for the source's `PairDistanceInvolvingIterator`.
fn involving(pairs: &[(u16, u16)], star: u16) -> Vec<u16> {
    pairs
        .iter()
        .filter_map(|&(a, b)| if a == star { Some(b) } else if b == star { Some(a) } else { None })
        .collect()
}

/// Extend `identifiers` (which must already hold the 4 pyramid
/// identifications) with every other centroid that has exactly one
/// consistent catalog match, given the 4 already-identified stars as
/// reference points. Ambiguous centroids are left unidentified.
fn identify_remaining_stars(
    identifiers: &mut Vec<StarIdentifier>,
    centroids: &[Vec3],
    catalog: &Catalog,
    db: &PairDistanceDatabase<'_>,
    tolerance: f64,
) {
    assert_eq!(identifiers.len(), 4, "identify_remaining_stars requires the 4 pyramid identifications");
    let base = identifiers.clone();
    let base_spatial: Vec<Vec3> = base.iter().map(|id| centroids[id.centroid_index]).collect();

    for p in 0..centroids.len() {
        if base.iter().any(|id| id.centroid_index == p) {
            continue;
        }
        let p_spatial = centroids[p];
        let ip_dist = angle_unit(&base_spatial[0], &p_spatial);
        let ip_pairs = db.find_pairs_liberal((ip_dist - tolerance) as f32, (ip_dist + tolerance) as f32);

        let mut candidates: Vec<u16> = Vec::new();
        for q in involving(&ip_pairs, base[0].catalog_index as u16) {
            let mut ok = true;
            for l in 1..4 {
                let actual = angle_unit(&p_spatial, &base_spatial[l]);
                let expected = angle_unit(&catalog[q as usize].spatial, &catalog[base[l].catalog_index].spatial);
                if (actual - expected).abs() > tolerance {
                    ok = false;
                    break;
                }
            }
            if ok {
                candidates.push(q);
            }
        }

        if candidates.len() == 1 {
            identifiers.push(StarIdentifier::new(p, candidates[0] as usize));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogStar;
    use crate::serialize::{ByteReader, ByteWriter, Endianness};
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    /// The 14-star lattice from the end-to-end scenarios (§8): ra in
    /// {0, pi/4, pi/2, 3pi/4} x de in {-pi/2, -pi/4, 0, pi/4, pi/2}, with
    /// duplicate pole entries collapsed and named 0..13, plus poles named
    /// 50 (north) and 58 (south) to match the scenario's expectations.
    fn integral_catalog() -> Catalog {
        let mut stars = Vec::new();
        let mut name = 0;
        for ra_steps in 0..4 {
            let ra = ra_steps as f64 * FRAC_PI_4;
            for de_steps in -2..=2 {
                let de = de_steps as f64 * FRAC_PI_4;
                if de_steps == 2 {
                    // north pole: only add once, named 50
                    if ra_steps == 0 {
                        stars.push(CatalogStar::from_ra_dec(0.0, FRAC_PI_2, 0, 50));
                    }
                    continue;
                }
                if de_steps == -2 {
                    if ra_steps == 0 {
                        stars.push(CatalogStar::from_ra_dec(0.0, -FRAC_PI_2, 0, 58));
                    }
                    continue;
                }
                stars.push(CatalogStar::from_ra_dec(ra, de, 0, name));
                name += 1;
            }
        }
        stars.into_iter().collect()
    }

    fn build_pairdb(catalog: &Catalog) -> Vec<u8> {
        let mut writer = ByteWriter::new(Endianness::Little);
        crate::pairdb::build(&mut writer, catalog, 0.0, PI as f32, 64);
        writer.finish()
    }

    #[test]
    fn three_star_lattice_pair_query_matches_scenario_1() {
        let catalog: Catalog = vec![
            CatalogStar::from_ra_dec(0.0, 0.0, 0, 0),
            CatalogStar::from_ra_dec(FRAC_PI_4, 0.0, 0, 1),
            CatalogStar::from_ra_dec(FRAC_PI_2, 0.0, 0, 2),
        ]
        .into_iter()
        .collect();
        let bytes = build_pairdb(&catalog);
        let mut reader = ByteReader::new(&bytes, Endianness::Little);
        let db = PairDistanceDatabase::read(&mut reader).unwrap();

        let target = FRAC_PI_4 as f32;
        let found = db.find_pairs_exact(&catalog, target - 1e-4, target + 1e-4);
        let mut names: Vec<(i32, i32)> = found
            .iter()
            .map(|&(a, b)| (catalog[a as usize].name, catalog[b as usize].name))
            .collect();
        names.sort();
        assert_eq!(names, vec![(0, 1), (1, 2)]);
    }

    /// A non-repeating spread of stars (Fibonacci sphere, deterministic
    /// seed), used instead of the perfectly symmetric lattice for pyramid
    /// uniqueness tests: the lattice's many repeated pairwise distances
    /// would make several 4-tuples match simultaneously, which is correct
    /// lattice behavior but defeats a uniqueness test.
    fn scattered_catalog(n: usize) -> Catalog {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(1);
        (0..n)
            .map(|i| {
                let u: f64 = rng.gen();
                let v: f64 = rng.gen();
                let dec = (2.0 * u - 1.0).asin();
                let ra = 2.0 * PI * v;
                CatalogStar::from_ra_dec(ra, dec, 0, i as i32)
            })
            .collect()
    }

    #[test]
    fn pyramid_recovers_known_rotation() {
        // "Camera frame" == "inertial frame" here (identity rotation): the
        // pyramid matcher only sees directions, so testing against a fixed
        // orientation exercises the same code path as a rotated one. A 5th
        // spare star is required: with exactly 4 centroids the (dj, dk, dr,
        // i) loop bounds (faithfully mirrored from the source) never
        // produce a candidate, since dr's range is only non-empty once the
        // index budget leaves room for i to vary too.
        let catalog = scattered_catalog(60);
        let bytes = build_pairdb(&catalog);
        let mut reader = ByteReader::new(&bytes, Endianness::Little);
        let db = PairDistanceDatabase::read(&mut reader).unwrap();

        let chosen = [3usize, 10, 22, 41, 57];
        let centroids: Vec<Vec3> = chosen.iter().map(|&idx| catalog[idx].spatial).collect();

        let params = PyramidParams {
            tolerance: 1e-6,
            ..Default::default()
        };
        let identified = identify_pyramid(&centroids, &catalog, &db, params);
        assert!(identified.len() >= 4, "expected at least the pyramid's 4 stars, got {}", identified.len());

        for id in &identified {
            let expected_catalog_index = chosen[id.centroid_index];
            assert_eq!(id.catalog_index, expected_catalog_index);
        }
    }

    #[test]
    fn too_few_centroids_returns_empty() {
        let catalog = integral_catalog();
        let bytes = build_pairdb(&catalog);
        let mut reader = ByteReader::new(&bytes, Endianness::Little);
        let db = PairDistanceDatabase::read(&mut reader).unwrap();

        let centroids = vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)];
        let identified = identify_pyramid(&centroids, &catalog, &db, PyramidParams::default());
        assert!(identified.is_empty());
    }

    /// Spec §8 scenario 3: "spectrality flips the answer." Mirroring the
    /// measured centroids (negating one axis) preserves every pairwise
    /// distance but reverses chirality; since a scattered catalog has no
    /// mirror-symmetric counterpart pyramid at the same distances, the
    /// mismatched spectrality sign in `match_pyramid` should reject it.
    #[test]
    fn mirrored_centroids_are_rejected_by_the_spectrality_check() {
        let catalog = scattered_catalog(60);
        let bytes = build_pairdb(&catalog);
        let mut reader = ByteReader::new(&bytes, Endianness::Little);
        let db = PairDistanceDatabase::read(&mut reader).unwrap();

        let chosen = [3usize, 10, 22, 41, 57];
        let centroids: Vec<Vec3> = chosen.iter().map(|&idx| catalog[idx].spatial).collect();
        let mirrored: Vec<Vec3> = centroids.iter().map(|v| Vec3::new(-v.x(), v.y(), v.z())).collect();

        let params = PyramidParams {
            tolerance: 1e-6,
            ..Default::default()
        };
        let identified = identify_pyramid(&mirrored, &catalog, &db, params);
        assert!(identified.is_empty(), "mirrored (wrong-chirality) centroids should not be identified");
    }

    #[test]
    fn spectral_sign_flips_under_mirroring() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(1.0, 0.0, 0.0);
        let c = Vec3::new(0.0, 1.0, 0.0);
        let d = Vec3::new(0.0, 0.0, 1.0);
        let original = spectral_sign(&a, &b, &c, &d);

        let mirror = |v: &Vec3| Vec3::new(-v.x(), v.y(), v.z());
        let mirrored = spectral_sign(&mirror(&a), &mirror(&b), &mirror(&c), &mirror(&d));

        assert!(original.signum() != mirrored.signum());
    }
}
