//! Quaternion attitude representation
//!
//! Grounded on `lost`'s `Quaternion` class (Hamilton product, conjugate,
//! `Rotate`, `SphericalToQuaternion`), re-expressed over
//! [`nalgebra::Quaternion`] rather than hand-rolled multiplication.

use crate::geometry::Vec3;
use nalgebra::{Quaternion as NaQuaternion, Vector3};

/// A unit quaternion `(w, x, y, z)` representing a 3-axis rotation.
///
/// The canonical form used throughout this crate has `w >= 0`; this is what
/// [`Quaternion::canonicalize`] enforces and what [`PartialEq`] assumes when
/// comparing quaternions in tests, since `q` and `-q` represent the same
/// rotation.
#[derive(Debug, Clone, Copy)]
pub struct Quaternion(pub NaQuaternion<f64>);

impl Quaternion {
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Quaternion(NaQuaternion::new(w, x, y, z))
    }

    pub fn identity() -> Self {
        Quaternion::new(1.0, 0.0, 0.0, 0.0)
    }

    pub fn w(&self) -> f64 {
        self.0.w
    }
    pub fn x(&self) -> f64 {
        self.0.i
    }
    pub fn y(&self) -> f64 {
        self.0.j
    }
    pub fn z(&self) -> f64 {
        self.0.k
    }

    /// A "pure" quaternion with zero scalar part, representing a vector.
    fn from_vector(v: &Vec3) -> Self {
        Quaternion::new(0.0, v.x(), v.y(), v.z())
    }

    /// Rotation of `theta` radians about unit axis `v`.
    pub fn from_axis_angle(axis: &Vec3, theta: f64) -> Self {
        let half = theta / 2.0;
        let s = half.sin();
        Quaternion::new(half.cos(), axis.x() * s, axis.y() * s, axis.z() * s)
    }

    /// Hamilton product `self * other`.
    pub fn mul(&self, other: &Quaternion) -> Quaternion {
        Quaternion(self.0 * other.0)
    }

    pub fn conjugate(&self) -> Quaternion {
        Quaternion(self.0.conjugate())
    }

    pub fn norm(&self) -> f64 {
        self.0.norm()
    }

    /// Returns the equivalent rotation with `w >= 0`. Both `q` and `-q`
    /// rotate vectors identically; fixing the sign of `w` gives a canonical
    /// form for equality comparisons (§3).
    pub fn canonicalize(&self) -> Quaternion {
        if self.0.w < 0.0 {
            Quaternion(-self.0)
        } else {
            *self
        }
    }

    /// Rotate a vector by this quaternion: `q * v * q^-1` (conjugate, since
    /// this is expected to be called on unit quaternions).
    pub fn rotate(&self, v: &Vec3) -> Vec3 {
        let qv = Quaternion::from_vector(v);
        let rotated = self.mul(&qv).mul(&self.conjugate());
        Vec3::new(rotated.x(), rotated.y(), rotated.z())
    }

    /// Build the quaternion that reorients the coordinate axes so that the
    /// x-axis points at `(ra, dec)`, then rolls the axes about that new
    /// x-axis. This is an improper z-y'-x' Euler rotation, matching `lost`'s
    /// `SphericalToQuaternion`.
    ///
    /// `ra` in `[0, 2*pi]`, `dec` in `[-pi/2, pi/2]`, `roll` in `[0, 2*pi]`.
    pub fn from_ra_dec_roll(ra: f64, dec: f64, roll: f64) -> Self {
        let z_axis = Vec3::new(0.0, 0.0, 1.0);
        let y_axis = Vec3::new(0.0, 1.0, 0.0);
        let x_axis = Vec3::new(1.0, 0.0, 0.0);

        let a = Quaternion::from_axis_angle(&z_axis, ra);
        let b = Quaternion::from_axis_angle(&y_axis, -dec);
        let c = Quaternion::from_axis_angle(&x_axis, -roll);
        a.mul(&b).mul(&c).conjugate()
    }

    /// Inverse of [`Quaternion::from_ra_dec_roll`]: returns `(ra, dec, roll)`
    /// in radians.
    ///
    /// `ra`/`dec` come from where this quaternion sends the body x-axis
    /// (the boresight), via `atan2`/`asin` on that direction -- safe at any
    /// attitude and, unlike a quaternion-component ratio, unaffected by the
    /// `q`/`-q` sign ambiguity. `roll` is then the signed angle, about the
    /// boresight, from the un-rolled frame's y-axis image to this
    /// quaternion's y-axis image, read off via `atan2` on their components
    /// in the plane perpendicular to the boresight (a DCM-style decomposition
    /// rather than a second quaternion-ratio formula, which degenerates near
    /// the poles).
    pub fn to_ra_dec_roll(&self) -> (f64, f64, f64) {
        let x_axis = Vec3::new(1.0, 0.0, 0.0);
        let y_axis = Vec3::new(0.0, 1.0, 0.0);

        let boresight = self.rotate(&x_axis);
        let mut ra = boresight.y().atan2(boresight.x());
        if ra < 0.0 {
            ra += 2.0 * std::f64::consts::PI;
        }
        let dec = boresight.z().clamp(-1.0, 1.0).asin();

        let unrolled = Quaternion::from_ra_dec_roll(ra, dec, 0.0);
        let y0 = unrolled.rotate(&y_axis);
        let y1 = self.rotate(&y_axis);

        let dot = y0.y() * y1.y() + y0.z() * y1.z();
        let cross = y0.y() * y1.z() - y0.z() * y1.y();
        let mut roll = cross.atan2(dot);
        if roll < 0.0 {
            roll += 2.0 * std::f64::consts::PI;
        }
        (ra, dec, roll)
    }

    /// Build a [`Quaternion`] from a [`nalgebra::UnitQuaternion`], as
    /// returned by the attitude estimator's eigendecomposition.
    pub fn from_vector3_wxyz(w: f64, xyz: Vector3<f64>) -> Self {
        Quaternion::new(w, xyz.x, xyz.y, xyz.z)
    }
}

impl PartialEq for Quaternion {
    fn eq(&self, other: &Self) -> bool {
        let a = self.canonicalize();
        let b = other.canonicalize();
        (a.w() - b.w()).abs() < 1e-6
            && (a.x() - b.x()).abs() < 1e-6
            && (a.y() - b.y()).abs() < 1e-6
            && (a.z() - b.z()).abs() < 1e-6
    }
}
