//! Camera models and the calibration rig.
//!
//! Every camera is mounted on the rig with an extrinsic `t_pc` (camera frame
//! into pose frame). A pose's `t_wp` composed with `t_pc` gives the camera's
//! world pose.

use nalgebra::{Vector2, Vector3};

use crate::geometry::SE3;

/// Pinhole intrinsics in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

/// A single calibrated camera on the rig.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub intrinsics: PinholeIntrinsics,
    pub width: u32,
    pub height: u32,
    /// Extrinsic: camera frame into pose frame.
    pub t_pc: SE3,
}

impl Camera {
    pub fn new(intrinsics: PinholeIntrinsics, width: u32, height: u32, t_pc: SE3) -> Self {
        Self {
            intrinsics,
            width,
            height,
            t_pc,
        }
    }

    /// Project a point in camera coordinates to pixels.
    ///
    /// Returns `None` for points behind (or on) the image plane.
    pub fn project(&self, p_cam: &Vector3<f64>) -> Option<Vector2<f64>> {
        if p_cam.z <= 1e-9 {
            return None;
        }
        let k = &self.intrinsics;
        Some(Vector2::new(
            k.fx * p_cam.x / p_cam.z + k.cx,
            k.fy * p_cam.y / p_cam.z + k.cy,
        ))
    }

    /// Back-project a pixel to a unit-norm bearing in camera coordinates.
    pub fn unproject(&self, pixel: &Vector2<f64>) -> Vector3<f64> {
        let k = &self.intrinsics;
        Vector3::new((pixel.x - k.cx) / k.fx, (pixel.y - k.cy) / k.fy, 1.0).normalize()
    }

    pub fn in_image(&self, pixel: &Vector2<f64>) -> bool {
        pixel.x >= 0.0
            && pixel.y >= 0.0
            && pixel.x < self.width as f64
            && pixel.y < self.height as f64
    }
}

/// Ordered set of cameras rigidly attached to one pose.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rig {
    pub cameras: Vec<Camera>,
}

impl Rig {
    pub fn new(cameras: Vec<Camera>) -> Self {
        Self { cameras }
    }

    /// Single camera sitting at the pose origin.
    pub fn monocular(intrinsics: PinholeIntrinsics, width: u32, height: u32) -> Self {
        Self::new(vec![Camera::new(intrinsics, width, height, SE3::identity())])
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    pub fn camera(&self, cam_id: usize) -> Option<&Camera> {
        self.cameras.get(cam_id)
    }
}
