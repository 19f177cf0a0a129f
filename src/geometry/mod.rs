//! 3D unit vectors, quaternions, and small-angle numerics
//!
//! This module is the geometry primitives layer described in §2: it has no
//! dependency on the catalog or database layers, and everything above it
//! (camera model, pyramid star-id, attitude estimation) builds on these
//! types.

mod quaternion;
mod vec3;

pub use quaternion::Quaternion;
pub use vec3::{angle, angle_unit, Vec2, Vec3};
