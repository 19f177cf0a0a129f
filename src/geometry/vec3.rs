//! Three-dimensional Cartesian vectors
//!
//! `Vec3` is the fundamental representation of a direction in the LOST
//! pipeline: camera-frame star directions and catalog star directions are
//! both unit vectors in this type. Internally a [`nalgebra::Vector3<f64>`] is
//! wrapped rather than used directly so that the wire-format conversions
//! (§6: each catalog star spatial direction is three `f32`s) live in one
//! place.

use nalgebra::Vector3;

/// A three-component vector, used both as a free vector (e.g. `b - a`) and as
/// a unit direction (e.g. a star's position on the celestial sphere).
///
/// # Invariant
///
/// Vectors that represent "spatial" directions (star directions, centroid
/// back-projections) must have magnitude within `1e-4` of 1. This is not
/// enforced by the type itself -- callers that produce directions are
/// expected to [`Vec3::normalize`] them, and [`Vec3::is_unit`] is provided for
/// assertions in debug builds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3(pub Vector3<f64>);

impl Vec3 {
    /// Construct a vector from components.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Vec3(Vector3::new(x, y, z))
    }

    pub fn x(&self) -> f64 {
        self.0.x
    }

    pub fn y(&self) -> f64 {
        self.0.y
    }

    pub fn z(&self) -> f64 {
        self.0.z
    }

    /// Euclidean length.
    pub fn magnitude(&self) -> f64 {
        self.0.norm()
    }

    /// Returns a unit vector in the same direction.
    ///
    /// # Panics
    ///
    /// Panics if the magnitude is zero; this is a programmer error (§7
    /// `ProgrammerError`), never a runtime condition callers should expect to
    /// recover from.
    pub fn normalize(&self) -> Vec3 {
        let mag = self.magnitude();
        assert!(mag > 0.0, "cannot normalize a zero-length vector");
        Vec3(self.0 / mag)
    }

    /// True if the magnitude is within `1e-4` of 1, per the spatial-vector
    /// invariant in §3.
    pub fn is_unit(&self) -> bool {
        (self.magnitude() - 1.0).abs() < 1e-4
    }

    pub fn dot(&self, other: &Vec3) -> f64 {
        self.0.dot(&other.0)
    }

    pub fn cross(&self, other: &Vec3) -> Vec3 {
        Vec3(self.0.cross(&other.0))
    }

    /// Spherical-to-Cartesian conversion: right ascension and declination
    /// (radians) to a unit vector.
    ///
    /// Ground truth: `lost`'s `SphericalToSpatial`, `x = cos(ra)cos(de)`, `y =
    /// sin(ra)cos(de)`, `z = sin(de)`.
    pub fn from_ra_dec(ra: f64, dec: f64) -> Self {
        Vec3::new(ra.cos() * dec.cos(), ra.sin() * dec.cos(), dec.sin())
    }

    /// Inverse of [`Vec3::from_ra_dec`]: returns `(ra, dec)` in radians, with
    /// `ra` normalized to `[0, 2*pi)`.
    pub fn to_ra_dec(&self) -> (f64, f64) {
        let unit = self.normalize();
        let dec = unit.z().clamp(-1.0, 1.0).asin();
        let mut ra = unit.y().atan2(unit.x());
        if ra < 0.0 {
            ra += 2.0 * std::f64::consts::PI;
        }
        (ra, dec)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3(self.0 - rhs.0)
    }
}

impl std::ops::Sub for &Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: &Vec3) -> Vec3 {
        Vec3(self.0 - rhs.0)
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3(self.0 + rhs.0)
    }
}

/// A 2D pixel coordinate, used for centroid positions and camera-plane math.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Vec2 { x, y }
    }

    pub fn distance(&self, other: &Vec2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Angular separation between two (not necessarily unit) direction vectors,
/// via `acos(dot)` with a saturating clamp on `[-1, 1]` to defeat
/// floating-point overshoot -- see §4.2 step 1 and the Design Notes on
/// `acos` of a slightly-out-of-range dot product.
///
/// Both inputs are normalized first, so this works for un-normalized free
/// vectors as well as unit directions. Always returns a value in `[0, pi]`.
pub fn angle(a: &Vec3, b: &Vec3) -> f64 {
    angle_unit(&a.normalize(), &b.normalize())
}

/// Like [`angle`], but assumes both inputs are already unit vectors (skips
/// the normalization). This is the hot path used throughout pyramid star
/// identification, where directions are normalized once and reused many
/// times.
pub fn angle_unit(a: &Vec3, b: &Vec3) -> f64 {
    let dot = a.dot(b).clamp(-1.0, 1.0);
    dot.acos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn normalize_produces_unit_vector() {
        let v = Vec3::new(3.0, 4.0, 0.0);
        let u = v.normalize();
        assert_abs_diff_eq!(u.magnitude(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(u.x(), 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(u.y(), 0.8, epsilon = 1e-12);
    }

    #[test]
    fn ra_dec_round_trip() {
        let cases = [
            (0.0, 0.0),
            (PI / 4.0, 0.3),
            (PI, -0.5),
            (3.0 * PI / 2.0, 1.2),
        ];
        for (ra, dec) in cases {
            let v = Vec3::from_ra_dec(ra, dec);
            let (ra2, dec2) = v.to_ra_dec();
            assert_abs_diff_eq!(ra, ra2, epsilon = 1e-9);
            assert_abs_diff_eq!(dec, dec2, epsilon = 1e-9);
        }
    }

    #[test]
    fn angle_is_bounded() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(-1.0, 1e-9, 0.0);
        let theta = angle(&a, &b);
        assert!((0.0..=PI).contains(&theta));
    }

    #[test]
    fn angle_clamps_out_of_range_dot() {
        // Two vectors that are numerically identical but for floating-point
        // noise that could push the dot product fractionally above 1.
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(1.0 + 1e-16, 0.0, 0.0);
        let theta = angle_unit(&a, &b);
        assert!(theta.is_finite());
        assert_abs_diff_eq!(theta, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn cross_product_orthogonal() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let y = Vec3::new(0.0, 1.0, 0.0);
        let z = x.cross(&y);
        assert_abs_diff_eq!(z.x(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(z.y(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(z.z(), 1.0, epsilon = 1e-12);
    }
}
