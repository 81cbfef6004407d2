//! TrackerPose - a node of the pose graph.

use super::types::TrackId;
use crate::geometry::SE3;

/// A keyframe pose and the tracks that were started at it.
#[derive(Debug, Clone, Default)]
pub struct TrackerPose {
    /// Pose frame into world frame.
    ///
    /// Holds the chained motion estimate until the first bundle adjustment
    /// pass that includes this pose overwrites it.
    pub t_wp: SE3,

    /// Tracks originated at this pose.
    pub tracks: Vec<TrackId>,

    /// Longest keypoint history among the tracks visible while this pose was
    /// current. Sizes the fixed part of the optimization window.
    pub longest_track: usize,
}

impl TrackerPose {
    pub fn new(t_wp: SE3) -> Self {
        Self {
            t_wp,
            tracks: Vec::new(),
            longest_track: 0,
        }
    }
}
