//! Optimization window selection over the trailing poses of the graph.

use crate::map::PoseGraph;

/// Pose range of one bundle adjustment pass, as graph positions.
///
/// Poses in `[start_active_pose, end)` are free; poses in
/// `[start_pose, start_active_pose)` are only there to anchor landmarks of
/// long tracks and stay fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaWindow {
    pub start_pose: usize,
    pub start_active_pose: usize,
    pub end: usize,
}

impl BaWindow {
    /// Window over `num_poses` poses with `num_active_poses` free trailing
    /// poses, extended backwards to the anchor of a track spanning
    /// `longest_track` poses.
    pub fn from_counts(num_poses: usize, num_active_poses: usize, longest_track: usize) -> Self {
        let start_active_pose = num_poses.saturating_sub(num_active_poses);
        let start_pose = start_active_pose.min(num_poses.saturating_sub(longest_track));
        Self {
            start_pose,
            start_active_pose,
            end: num_poses,
        }
    }

    /// Window for the current state of `graph`, sized by the longest track
    /// seen at the most recent pose.
    pub fn select(graph: &PoseGraph, num_active_poses: usize) -> Self {
        let longest_track = graph.last().map_or(0, |pose| pose.longest_track);
        Self::from_counts(graph.len(), num_active_poses, longest_track)
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start_pose)
    }

    pub fn is_empty(&self) -> bool {
        self.start_pose >= self.end
    }

    pub fn num_active(&self) -> usize {
        self.end.saturating_sub(self.start_active_pose)
    }

    /// No fixed anchoring poses: every pose in the window is free.
    pub fn all_poses_active(&self) -> bool {
        self.start_pose == self.start_active_pose
    }

    pub fn is_active(&self, position: usize) -> bool {
        position >= self.start_active_pose && position < self.end
    }
}
