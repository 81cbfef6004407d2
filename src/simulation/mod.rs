//! Simulation and synthetic data generation.
//!
//! A seeded random point cloud observed from a known trajectory, plus a
//! feature tracker that follows those points exactly. Used by the demo
//! binary and the end-to-end tests.

mod tracker;

pub use tracker::SyntheticTracker;

use nalgebra::{UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::camera::{PinholeIntrinsics, Rig};
use crate::geometry::SE3;

/// Ground-truth world and trajectory.
#[derive(Debug, Clone)]
pub struct SyntheticScene {
    pub rig: Rig,
    /// Landmarks in world coordinates.
    pub points: Vec<Vector3<f64>>,
    /// Ground-truth `t_wp` per frame; the first one is identity.
    pub poses: Vec<SE3>,
}

impl SyntheticScene {
    /// Monocular VGA camera moving forward along +z while slowly turning
    /// about the vertical axis.
    ///
    /// `step` is the distance travelled per frame, `yaw_rate` the rotation
    /// per frame in radians.
    pub fn forward(num_frames: usize, step: f64, yaw_rate: f64, num_points: usize, seed: u64) -> Self {
        let rig = Rig::monocular(
            PinholeIntrinsics {
                fx: 400.0,
                fy: 400.0,
                cx: 320.0,
                cy: 240.0,
            },
            640,
            480,
        );

        let travel = step * num_frames as f64;
        let points = generate_random_points(
            num_points,
            [-8.0, 8.0, -5.0, 5.0, 3.0, 25.0 + travel],
            seed,
        );

        let poses = (0..num_frames)
            .map(|i| SE3 {
                rotation: UnitQuaternion::from_euler_angles(0.0, yaw_rate * i as f64, 0.0),
                translation: Vector3::new(0.0, 0.0, step * i as f64),
            })
            .collect();

        Self { rig, points, poses }
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}

/// Uniform random points inside `[min_x, max_x, min_y, max_y, min_z, max_z]`.
pub fn generate_random_points(n_points: usize, bounds: [f64; 6], seed: u64) -> Vec<Vector3<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let [min_x, max_x, min_y, max_y, min_z, max_z] = bounds;

    (0..n_points)
        .map(|_| {
            Vector3::new(
                rng.gen_range(min_x..max_x),
                rng.gen_range(min_y..max_y),
                rng.gen_range(min_z..max_z),
            )
        })
        .collect()
}
