//! Star catalog: an ordered, immutable list of catalog stars
//!
//! A catalog's index *is* its position in the backing `Vec` (§3); there is no
//! separate id-to-index map the way the teacher's `HipparcosCatalog` keys
//! stars by HIP number, because the pair-distance database and the pyramid
//! matcher both address stars by catalog index, not by name.

mod narrow;
mod serialize;
mod text;

pub use narrow::{narrow, NarrowOptions};
pub use serialize::{deserialize_catalog, serialize_catalog, CATALOG_MAGIC};
pub use text::parse_catalog_text;

use crate::geometry::{angle, Vec3};

/// A single entry in a star catalog.
///
/// `magnitude` is stored as hundredths of a magnitude (so `523` means visual
/// magnitude `5.23`) to keep the on-disk representation an exact integer;
/// `name` is an opaque catalog identifier (e.g. a Hipparcos number).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogStar {
    pub spatial: Vec3,
    pub magnitude: i32,
    pub name: i32,
}

impl CatalogStar {
    pub fn new(spatial: Vec3, magnitude: i32, name: i32) -> Self {
        debug_assert!(spatial.is_unit(), "catalog star direction must be a unit vector");
        CatalogStar {
            spatial,
            magnitude,
            name,
        }
    }

    /// Convenience constructor from right ascension/declination in radians.
    pub fn from_ra_dec(ra: f64, dec: f64, magnitude: i32, name: i32) -> Self {
        CatalogStar::new(Vec3::from_ra_dec(ra, dec), magnitude, name)
    }

    /// Magnitude as a floating-point value (e.g. `5.23`).
    pub fn magnitude_f64(&self) -> f64 {
        self.magnitude as f64 / 100.0
    }
}

/// An ordered, immutable sequence of [`CatalogStar`]s. Once constructed from
/// a parsed source, a catalog is never mutated -- narrowing (§3) produces a
/// new catalog rather than editing in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    stars: Vec<CatalogStar>,
}

impl Catalog {
    pub fn new(stars: Vec<CatalogStar>) -> Self {
        Catalog { stars }
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }

    pub fn as_slice(&self) -> &[CatalogStar] {
        &self.stars
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CatalogStar> {
        self.stars.iter()
    }
}

impl std::ops::Index<usize> for Catalog {
    type Output = CatalogStar;
    fn index(&self, index: usize) -> &CatalogStar {
        &self.stars[index]
    }
}

impl FromIterator<CatalogStar> for Catalog {
    fn from_iter<I: IntoIterator<Item = CatalogStar>>(iter: I) -> Self {
        Catalog::new(iter.into_iter().collect())
    }
}

/// Angular separation (radians) between two catalog stars by index.
pub fn catalog_angle(catalog: &Catalog, i: usize, j: usize) -> f64 {
    angle(&catalog[i].spatial, &catalog[j].spatial)
}
