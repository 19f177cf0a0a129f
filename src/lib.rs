//! lost: a star-tracker pipeline library
//!
//! Identifies which catalog stars a set of detected image centroids
//! correspond to, and estimates the camera's attitude from that
//! identification. The crate is organized bottom-up: geometry primitives
//! have no dependency on anything above them, the catalog and serialization
//! layers build on geometry, the database layer builds on catalog and
//! serialization, and star identification and attitude estimation build on
//! the database layer.
//!
//! ```text
//! geometry -> catalog, serialize -> kvector -> pairdb -> multidb -> starid, attitude -> pipeline
//! ```
//!
//! The core (everything except [`pipeline`] and the `lost` binary) never
//! logs and never panics on malformed external input; see [`errors`] for the
//! propagation policy.

pub mod attitude;
pub mod camera;
pub mod catalog;
pub mod errors;
pub mod geometry;
pub mod kvector;
pub mod multidb;
pub mod pairdb;
pub mod pipeline;
pub mod serialize;
pub mod starid;

pub use attitude::{estimate as estimate_attitude, AttitudeEstimate, DirectionPair};
pub use camera::Camera;
pub use catalog::{Catalog, CatalogStar};
pub use errors::{LostError, Result};
pub use geometry::{angle, Quaternion, Vec2, Vec3};
pub use multidb::{MultiDatabase, MultiDatabaseBuilder};
pub use pairdb::PairDistanceDatabase;
pub use starid::{identify_pyramid, PyramidParams, StarIdentifier};
