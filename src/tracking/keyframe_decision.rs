//! Keyframe decision criteria.
//!
//! A frame becomes a keyframe when tracking quality dropped relative to the
//! last keyframe, or when the camera moved or turned far enough away from
//! it. The translation threshold is in trajectory units, so it depends on
//! scene scale and is left configurable.

use crate::config::KeyframeThresholds;
use crate::geometry::SE3;

/// Outcome of one decision, with the quantities it was based on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyframeDecision {
    pub is_keyframe: bool,
    /// Successful tracks over the keyframe baseline; `None` without a baseline.
    pub track_ratio: Option<f64>,
    pub translation: f64,
    pub rotation: f64,
}

/// Criteria for deciding whether the current frame becomes a keyframe.
pub struct KeyframePolicy {
    thresholds: KeyframeThresholds,
    /// Successful track count at the last keyframe.
    baseline: Option<usize>,
}

impl KeyframePolicy {
    pub fn new(thresholds: KeyframeThresholds) -> Self {
        Self {
            thresholds,
            baseline: None,
        }
    }

    pub fn baseline(&self) -> Option<usize> {
        self.baseline
    }

    /// Decide for a frame with `num_successful` tracks and keyframe-to-frame
    /// motion `t_ba`.
    ///
    /// Without a baseline (or a zero one) every frame is a keyframe.
    pub fn decide(&self, num_successful: usize, t_ba: &SE3) -> KeyframeDecision {
        let translation = t_ba.translation.norm();
        let rotation = t_ba.rotation_angle();

        let track_ratio = match self.baseline {
            Some(baseline) if baseline > 0 => Some(num_successful as f64 / baseline as f64),
            _ => None,
        };

        let is_keyframe = match track_ratio {
            None => true,
            Some(ratio) => {
                ratio < self.thresholds.min_track_ratio
                    || translation > self.thresholds.max_translation
                    || rotation > self.thresholds.max_rotation
            }
        };

        KeyframeDecision {
            is_keyframe,
            track_ratio,
            translation,
            rotation,
        }
    }

    /// Record the successful track count of a new keyframe.
    pub fn record_baseline(&mut self, num_successful: usize) {
        self.baseline = Some(num_successful);
    }

    pub fn reset(&mut self) {
        self.baseline = None;
    }
}

impl Default for KeyframePolicy {
    fn default() -> Self {
        Self::new(KeyframeThresholds::default())
    }
}
