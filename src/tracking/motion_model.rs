//! Constant-velocity motion guess between consecutive frames.

use nalgebra::Vector3;

use crate::geometry::SE3;

/// Predicts the keyframe-to-current transform of the next frame.
///
/// The tracker reports `t_ba`, the transform from the last keyframe into the
/// current frame. The model keeps the previous frame's `t_ba` (identity right
/// after a keyframe) and extrapolates the frame-to-frame delta one step.
pub struct MotionModel {
    /// Frame-to-frame delta observed on the previous step.
    prev_delta: SE3,
    /// Keyframe-to-frame transform of the previous frame.
    prev_t_ba: SE3,
    min_tracked_fraction: f64,
    degenerate_epsilon: f64,
}

impl MotionModel {
    pub fn new(min_tracked_fraction: f64, degenerate_epsilon: f64) -> Self {
        Self {
            prev_delta: SE3::identity(),
            prev_t_ba: SE3::identity(),
            min_tracked_fraction,
            degenerate_epsilon,
        }
    }

    /// Guess for the next frame.
    ///
    /// `t_ba` is the tracker's current keyframe-to-frame estimate,
    /// `prev_was_keyframe` whether the frame it belongs to became a keyframe
    /// and `tracked_fraction` its successful tracks over the feature budget.
    /// Returns identity when too few features were tracked.
    pub fn predict(&mut self, t_ba: &SE3, prev_was_keyframe: bool, tracked_fraction: f64) -> SE3 {
        self.prev_delta = t_ba.compose(&self.prev_t_ba.inverse());
        self.prev_t_ba = if prev_was_keyframe {
            SE3::identity()
        } else {
            *t_ba
        };

        if tracked_fraction > self.min_tracked_fraction {
            self.prev_delta.compose(&self.prev_t_ba)
        } else {
            SE3::identity()
        }
    }

    /// Nudge an exactly-zero translation along +z once the graph holds more
    /// than one pose. Other guesses pass through unchanged.
    pub fn correct_degenerate(&self, mut guess: SE3, num_poses: usize) -> SE3 {
        if guess.translation == Vector3::zeros() && num_poses > 1 {
            guess.translation = Vector3::new(0.0, 0.0, self.degenerate_epsilon);
        }
        guess
    }

    /// Forget the motion history.
    pub fn reset(&mut self) {
        self.prev_delta = SE3::identity();
        self.prev_t_ba = SE3::identity();
    }
}

impl Default for MotionModel {
    fn default() -> Self {
        Self::new(0.3, 0.001)
    }
}
