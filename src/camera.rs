//! Pinhole camera model
//!
//! Maps between pixel coordinates and unit direction vectors in the camera
//! frame. Grounded on `lost`'s `Camera` class (`camera.hpp`/`camera.cpp`):
//! the pinhole is placed at the origin, the optical axis is `+x`, and
//! directions are computed by placing the image plane one unit away from the
//! pinhole.

use crate::geometry::{Vec2, Vec3};

/// A pinhole camera with a square pixel grid and no distortion model.
///
/// `x_resolution`/`y_resolution` are the sensor size in pixels;
/// `x_center`/`y_center` default to the sensor midpoint but can be offset to
/// model a non-centered principal point.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    focal_length: f64,
    x_resolution: f64,
    y_resolution: f64,
    x_center: f64,
    y_center: f64,
}

impl Camera {
    /// Construct a camera with the principal point at the sensor center.
    pub fn new(focal_length: f64, x_resolution: f64, y_resolution: f64) -> Self {
        Camera {
            focal_length,
            x_resolution,
            y_resolution,
            x_center: x_resolution / 2.0,
            y_center: y_resolution / 2.0,
        }
    }

    /// Construct a camera from a horizontal field of view in radians.
    pub fn from_fov(x_fov: f64, x_resolution: f64, y_resolution: f64) -> Self {
        Camera::new(fov_to_focal_length(x_fov, x_resolution), x_resolution, y_resolution)
    }

    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    pub fn x_resolution(&self) -> f64 {
        self.x_resolution
    }

    pub fn y_resolution(&self) -> f64 {
        self.y_resolution
    }

    /// Full horizontal field of view, in radians.
    pub fn fov(&self) -> f64 {
        focal_length_to_fov(self.focal_length, self.x_resolution)
    }

    /// True if `pixel` lies within the sensor bounds (inclusive).
    pub fn in_sensor(&self, pixel: &Vec2) -> bool {
        pixel.x >= 0.0 && pixel.x <= self.x_resolution && pixel.y >= 0.0 && pixel.y <= self.y_resolution
    }

    /// Project a camera-frame direction onto the sensor plane.
    ///
    /// # Panics
    ///
    /// Panics (§7 `ProgrammerError`) if `vector.x() <= 0`: the camera cannot
    /// image anything behind the pinhole.
    pub fn spatial_to_camera(&self, vector: &Vec3) -> Vec2 {
        assert!(vector.x() > 0.0, "cannot image a point behind the camera");
        let focal_factor = self.focal_length / vector.x();
        let y_pixel = vector.y() * focal_factor;
        let z_pixel = vector.z() * focal_factor;
        Vec2::new(-y_pixel + self.x_center, -z_pixel + self.y_center)
    }

    /// Back-project a pixel coordinate to a (non-unit, `x = 1`) direction in
    /// the camera frame.
    ///
    /// # Panics
    ///
    /// Panics (§7 `ProgrammerError`) if `pixel` is outside the sensor.
    pub fn camera_to_spatial(&self, pixel: &Vec2) -> Vec3 {
        assert!(self.in_sensor(pixel), "pixel {:?} is outside the sensor", pixel);
        let x_pixel = -pixel.x + self.x_center;
        let y_pixel = -pixel.y + self.y_center;
        Vec3::new(1.0, x_pixel / self.focal_length, y_pixel / self.focal_length)
    }
}

/// Converts a field of view (radians) and sensor width (pixels) to the
/// equivalent focal length (pixels).
pub fn fov_to_focal_length(x_fov: f64, x_resolution: f64) -> f64 {
    x_resolution / 2.0 / (x_fov / 2.0).tan()
}

/// Converts a focal length (pixels) and sensor width (pixels) to the
/// equivalent field of view (radians).
pub fn focal_length_to_fov(focal_length: f64, x_resolution: f64) -> f64 {
    ((x_resolution / 2.0) / focal_length).atan() * 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn camera_spatial_round_trip() {
        let camera = Camera::from_fov(std::f64::consts::FRAC_PI_4, 256.0, 256.0);
        for (px, py) in [(0.0, 0.0), (128.0, 128.0), (256.0, 256.0), (40.0, 210.0)] {
            let pixel = Vec2::new(px, py);
            let spatial = camera.camera_to_spatial(&pixel);
            let back = camera.spatial_to_camera(&spatial);
            assert_abs_diff_eq!(back.x, pixel.x, epsilon = 1e-6);
            assert_abs_diff_eq!(back.y, pixel.y, epsilon = 1e-6);
        }
    }

    #[test]
    fn fov_focal_length_round_trip() {
        let fov = 0.5;
        let resolution = 1024.0;
        let focal = fov_to_focal_length(fov, resolution);
        let fov2 = focal_length_to_fov(focal, resolution);
        assert_abs_diff_eq!(fov, fov2, epsilon = 1e-9);
    }

    #[test]
    #[should_panic]
    fn camera_to_spatial_rejects_out_of_sensor_pixel() {
        let camera = Camera::new(500.0, 256.0, 256.0);
        camera.camera_to_spatial(&Vec2::new(-5.0, 10.0));
    }

    #[test]
    #[should_panic]
    fn spatial_to_camera_rejects_point_behind_camera() {
        let camera = Camera::new(500.0, 256.0, 256.0);
        camera.spatial_to_camera(&Vec3::new(-1.0, 0.0, 0.0));
    }
}
