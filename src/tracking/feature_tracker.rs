//! Seam to the external feature tracker.
//!
//! The tracker owns images, pyramids and per-frame track bookkeeping; track
//! data itself lives in the pose graph's [`TrackTable`], which is lent to the
//! tracker on every call that creates or mutates tracks.

use crate::geometry::SE3;
use crate::map::{TrackId, TrackTable};

/// Options of a local track refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefineOptions {
    pub optimize_landmarks: bool,
    pub optimize_pose: bool,
    /// Pyramid level to refine at; `None` runs coarse to fine over all levels.
    pub pyramid_level: Option<usize>,
}

pub trait FeatureTracker {
    /// Image set of one time step, one entry per rig camera.
    type Frame;

    /// Track the current features into `frame`, starting from `guess`
    /// (keyframe-to-frame transform).
    fn add_frame(&mut self, frame: &Self::Frame, guess: &SE3, tracks: &mut TrackTable);

    /// Photometric/geometric micro-optimization of the current tracks and pose.
    fn refine_tracks(&mut self, options: &RefineOptions, tracks: &mut TrackTable);

    /// Drop tracks that can no longer be followed.
    fn prune_tracks(&mut self, tracks: &mut TrackTable);

    /// Start new landmarks on the current frame; returns the new track ids.
    fn start_new_landmarks(&mut self, tracks: &mut TrackTable) -> Vec<TrackId>;

    /// Mark the current frame as the new reference keyframe.
    fn add_keyframe(&mut self);

    /// Re-express the per-track keyframe transforms after the reference
    /// keyframe moved by `t_ba` without bundle adjustment.
    fn transform_track_tabs(&mut self, t_ba: &SE3, tracks: &mut TrackTable);

    /// Tracks currently followed, oldest first.
    fn current_tracks(&self) -> &[TrackId];

    fn num_successful_tracks(&self) -> usize;

    /// Id of the current track with the longest history, if any.
    fn longest_track_id(&self) -> Option<TrackId>;

    /// Keyframe-to-current-frame transform.
    fn t_ba(&self) -> SE3;

    fn set_t_ba(&mut self, t_ba: SE3);

    /// Drop all tracker state.
    fn reset(&mut self);
}
