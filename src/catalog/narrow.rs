//! Catalog narrowing: three independent filters applied in sequence
//!
//! Grounded on `lost`'s `NarrowCatalog` (`star-utils.hpp`/`.cpp`), with the
//! ordering and "remove both" tie-break specified explicitly in §3 rather
//! than left to the implementation.

use super::{Catalog, CatalogStar};
use crate::geometry::angle;

/// Parameters controlling [`narrow`].
#[derive(Debug, Clone, Copy)]
pub struct NarrowOptions {
    /// Stars dimmer (numerically greater magnitude) than this are dropped.
    /// Magnitude is in hundredths, matching [`CatalogStar::magnitude`].
    pub max_magnitude: i32,
    /// Any two stars closer together than this angular separation (radians)
    /// are both dropped.
    pub min_separation: f64,
    /// After the above filters, keep only the `max_stars` brightest. `None`
    /// means no cap.
    pub max_stars: Option<usize>,
}

/// Apply the three catalog-narrowing filters in order:
///
/// 1. Drop stars dimmer than `options.max_magnitude`.
/// 2. Drop any two stars whose angular separation is below
///    `options.min_separation` (both are removed, not just one).
/// 3. Keep only the `options.max_stars` brightest remaining stars.
///
/// The postcondition (§3 invariant) is: for any two stars `i != j` in the
/// result, their angular distance is at least `min_separation`, and every
/// magnitude is at most `max_magnitude`.
pub fn narrow(catalog: &Catalog, options: NarrowOptions) -> Catalog {
    let bright_enough: Vec<CatalogStar> = catalog
        .iter()
        .copied()
        .filter(|s| s.magnitude <= options.max_magnitude)
        .collect();

    let too_close = find_pairs_below_separation(&bright_enough, options.min_separation);
    let well_separated: Vec<CatalogStar> = bright_enough
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !too_close.contains(i))
        .map(|(_, s)| s)
        .collect();

    let mut result = well_separated;
    if let Some(max_stars) = options.max_stars {
        result.sort_by_key(|s| s.magnitude);
        result.truncate(max_stars);
    }

    Catalog::new(result)
}

/// Returns the set of indices (into `stars`) that participate in at least
/// one pair closer together than `min_separation`. Both members of every
/// offending pair are marked, per the "remove both" rule in §3.
fn find_pairs_below_separation(stars: &[CatalogStar], min_separation: f64) -> std::collections::HashSet<usize> {
    let mut offenders = std::collections::HashSet::new();
    for i in 0..stars.len() {
        for j in (i + 1)..stars.len() {
            if angle(&stars[i].spatial, &stars[j].spatial) < min_separation {
                offenders.insert(i);
                offenders.insert(j);
            }
        }
    }
    offenders
}
