//! Pipeline configuration.
//!
//! Every toggle and policy constant of the frame pipeline lives here as a
//! plain value. The pipeline owns one `PipelineConfig`; runtime changes go
//! through [`Command`](crate::system::Command)s applied between frames.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::optimizer::{BaOptions, OutlierPolicy};

/// Keyframe trigger thresholds.
///
/// Translation is in the units of the trajectory (scene scale dependent),
/// rotation in radians.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct KeyframeThresholds {
    /// New keyframe when successful tracks drop below this fraction of the
    /// count at the last keyframe.
    pub min_track_ratio: f64,
    pub max_translation: f64,
    pub max_rotation: f64,
}

impl Default for KeyframeThresholds {
    fn default() -> Self {
        Self {
            min_track_ratio: 0.8,
            max_translation: 0.2,
            max_rotation: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Feature budget of the tracker.
    pub num_features: usize,
    /// Below this fraction of `num_features` tracked, no motion is assumed.
    pub min_tracked_fraction: f64,
    /// Nudge along +z applied to an exactly-zero translation guess.
    pub degenerate_translation_epsilon: f64,
    /// Fewer successful tracks than this counts as a tracking failure.
    pub min_successful_tracks: usize,
    pub keyframe: KeyframeThresholds,

    pub do_keyframing: bool,
    pub optimize_landmarks: bool,
    pub optimize_pose: bool,
    pub do_bundle_adjustment: bool,
    pub do_start_new_landmarks: bool,
    pub is_manual_mode: bool,
    pub do_outlier_rejection: bool,

    /// Number of trailing free poses in each bundle adjustment pass.
    pub ba_window_size: usize,
    pub max_outlier_ratio: f64,
    /// Tracks spanning this many poses are rejected on a high outlier ratio
    /// even if still tracked.
    pub outlier_track_length: usize,
    pub ba: BaOptions,

    /// Retention horizon of the pose graph; `None` keeps every pose.
    pub max_retained_poses: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_features: 128,
            min_tracked_fraction: 0.3,
            degenerate_translation_epsilon: 0.001,
            min_successful_tracks: 10,
            keyframe: KeyframeThresholds::default(),
            do_keyframing: true,
            optimize_landmarks: true,
            optimize_pose: true,
            do_bundle_adjustment: true,
            do_start_new_landmarks: true,
            is_manual_mode: false,
            do_outlier_rejection: true,
            ba_window_size: 10,
            max_outlier_ratio: 0.3,
            outlier_track_length: 9,
            ba: BaOptions::default(),
            max_retained_poses: None,
        }
    }
}

impl PipelineConfig {
    /// Load and validate a YAML config. Missing keys take their defaults.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let config: Self = serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse pipeline config {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("Failed to parse pipeline config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_features == 0 {
            bail!("num_features must be > 0");
        }
        if self.ba_window_size == 0 {
            bail!("ba_window_size must be > 0");
        }
        if !(0.0..=1.0).contains(&self.min_tracked_fraction) {
            bail!(
                "min_tracked_fraction must be in [0, 1] (got {})",
                self.min_tracked_fraction
            );
        }
        if !(0.0..=1.0).contains(&self.max_outlier_ratio) {
            bail!(
                "max_outlier_ratio must be in [0, 1] (got {})",
                self.max_outlier_ratio
            );
        }
        let kf = &self.keyframe;
        for (name, value) in [
            ("keyframe.min_track_ratio", kf.min_track_ratio),
            ("keyframe.max_translation", kf.max_translation),
            ("keyframe.max_rotation", kf.max_rotation),
            ("degenerate_translation_epsilon", self.degenerate_translation_epsilon),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("{name} must be finite and >= 0 (got {value})");
            }
        }
        if let Some(max_poses) = self.max_retained_poses {
            if max_poses < self.ba_window_size {
                bail!(
                    "max_retained_poses ({max_poses}) must be >= ba_window_size ({})",
                    self.ba_window_size
                );
            }
        }
        Ok(())
    }

    /// Outlier classification for bundle adjustment, if enabled.
    pub fn outlier_policy(&self) -> Option<OutlierPolicy> {
        self.do_outlier_rejection.then_some(OutlierPolicy {
            max_outlier_ratio: self.max_outlier_ratio,
            max_track_length: self.outlier_track_length,
        })
    }
}
