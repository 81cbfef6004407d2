//! Bundle adjustment solver seam.
//!
//! The nonlinear least-squares engine lives outside this crate. The windowed
//! adapter talks to it only through [`BundleAdjuster`]: register cameras,
//! poses (free or fixed), inverse-depth landmarks anchored to a pose and a
//! camera, and reprojection residuals; solve; read results back by the ids
//! the solver handed out.

use nalgebra::{Vector2, Vector4};
use serde::Deserialize;

use crate::camera::Camera;
use crate::geometry::SE3;

/// Solver configuration for one bundle adjustment pass.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BaOptions {
    /// Iteration budget handed to [`BundleAdjuster::solve`].
    pub max_iterations: usize,
    pub use_dogleg: bool,
    pub use_sparse_solver: bool,
    /// Robust (Huber-style) norm on reprojection residuals.
    pub use_robust_norm_for_proj: bool,
    /// Residuals above this many pixels count towards a landmark's outlier ratio.
    pub projection_outlier_threshold: f64,
    /// Stop when the relative parameter change falls below this.
    pub param_change_threshold: f64,
    /// Stop when the relative cost change falls below this.
    pub error_change_threshold: f64,
}

impl Default for BaOptions {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            use_dogleg: true,
            use_sparse_solver: true,
            use_robust_norm_for_proj: true,
            projection_outlier_threshold: 1.0,
            param_change_threshold: 1e-10,
            error_change_threshold: 1e-3,
        }
    }
}

/// Interface of an external bundle adjustment engine.
///
/// Ids returned by the `add_*` methods are only meaningful until the next
/// [`init`](BundleAdjuster::init).
pub trait BundleAdjuster {
    /// Start a new problem, discarding the previous one.
    fn init(&mut self, options: &BaOptions, num_poses: usize, landmark_capacity: usize);

    /// Register a rig camera; returns its camera id.
    fn add_camera(&mut self, camera: &Camera) -> usize;

    /// Register a pose (`t_wp`); `is_active` poses are free variables.
    fn add_pose(&mut self, t_wp: &SE3, is_active: bool) -> usize;

    /// Register a world-frame homogeneous landmark `[x; w]` anchored at
    /// `ref_pose` / `ref_cam`.
    fn add_landmark(
        &mut self,
        x_w: &Vector4<f64>,
        ref_pose: usize,
        ref_cam: usize,
        is_active: bool,
    ) -> usize;

    /// Reprojection residual of `landmark` observed at pixel `z` in `cam` at `pose`.
    fn add_projection_residual(&mut self, z: &Vector2<f64>, pose: usize, landmark: usize, cam: usize);

    fn solve(&mut self, max_iterations: usize);

    fn pose(&self, pose: usize) -> Option<SE3>;

    fn landmark(&self, landmark: usize) -> Option<Vector4<f64>>;

    /// Fraction of the landmark's residuals flagged as outliers by the last solve.
    fn landmark_outlier_ratio(&self, landmark: usize) -> Option<f64>;
}

impl<B: BundleAdjuster + ?Sized> BundleAdjuster for Box<B> {
    fn init(&mut self, options: &BaOptions, num_poses: usize, landmark_capacity: usize) {
        (**self).init(options, num_poses, landmark_capacity)
    }

    fn add_camera(&mut self, camera: &Camera) -> usize {
        (**self).add_camera(camera)
    }

    fn add_pose(&mut self, t_wp: &SE3, is_active: bool) -> usize {
        (**self).add_pose(t_wp, is_active)
    }

    fn add_landmark(
        &mut self,
        x_w: &Vector4<f64>,
        ref_pose: usize,
        ref_cam: usize,
        is_active: bool,
    ) -> usize {
        (**self).add_landmark(x_w, ref_pose, ref_cam, is_active)
    }

    fn add_projection_residual(&mut self, z: &Vector2<f64>, pose: usize, landmark: usize, cam: usize) {
        (**self).add_projection_residual(z, pose, landmark, cam)
    }

    fn solve(&mut self, max_iterations: usize) {
        (**self).solve(max_iterations)
    }

    fn pose(&self, pose: usize) -> Option<SE3> {
        (**self).pose(pose)
    }

    fn landmark(&self, landmark: usize) -> Option<Vector4<f64>> {
        (**self).landmark(landmark)
    }

    fn landmark_outlier_ratio(&self, landmark: usize) -> Option<f64> {
        (**self).landmark_outlier_ratio(landmark)
    }
}

/// A registered landmark as seen by the solver.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkEntry {
    pub x_w: Vector4<f64>,
    pub ref_pose: usize,
    pub ref_cam: usize,
    pub is_active: bool,
}

/// Solver that keeps every variable at its initial value.
///
/// Used for dry runs (the pipeline still exercises window selection,
/// outlier bookkeeping and inverse-depth read-back) and as the base of test
/// doubles. Reports an outlier ratio of zero for every landmark.
#[derive(Debug, Default)]
pub struct IdentityAdjuster {
    pub cameras: usize,
    pub poses: Vec<(SE3, bool)>,
    pub landmarks: Vec<LandmarkEntry>,
    pub residuals: Vec<(usize, usize, usize)>,
    pub solves: usize,
}

impl IdentityAdjuster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_active_poses(&self) -> usize {
        self.poses.iter().filter(|(_, active)| *active).count()
    }
}

impl BundleAdjuster for IdentityAdjuster {
    fn init(&mut self, _options: &BaOptions, num_poses: usize, landmark_capacity: usize) {
        self.cameras = 0;
        self.poses = Vec::with_capacity(num_poses);
        self.landmarks = Vec::with_capacity(landmark_capacity);
        self.residuals.clear();
    }

    fn add_camera(&mut self, _camera: &Camera) -> usize {
        self.cameras += 1;
        self.cameras - 1
    }

    fn add_pose(&mut self, t_wp: &SE3, is_active: bool) -> usize {
        self.poses.push((*t_wp, is_active));
        self.poses.len() - 1
    }

    fn add_landmark(
        &mut self,
        x_w: &Vector4<f64>,
        ref_pose: usize,
        ref_cam: usize,
        is_active: bool,
    ) -> usize {
        self.landmarks.push(LandmarkEntry {
            x_w: *x_w,
            ref_pose,
            ref_cam,
            is_active,
        });
        self.landmarks.len() - 1
    }

    fn add_projection_residual(&mut self, _z: &Vector2<f64>, pose: usize, landmark: usize, cam: usize) {
        self.residuals.push((pose, landmark, cam));
    }

    fn solve(&mut self, _max_iterations: usize) {
        self.solves += 1;
    }

    fn pose(&self, pose: usize) -> Option<SE3> {
        self.poses.get(pose).map(|(t_wp, _)| *t_wp)
    }

    fn landmark(&self, landmark: usize) -> Option<Vector4<f64>> {
        self.landmarks.get(landmark).map(|lm| lm.x_w)
    }

    fn landmark_outlier_ratio(&self, landmark: usize) -> Option<f64> {
        self.landmarks.get(landmark).map(|_| 0.0)
    }
}
