//! Control commands for the frame pipeline.
//!
//! Commands may be sent from any thread; they are queued and applied by the
//! pipeline between frames, so the pose graph keeps a single writer.

use std::path::PathBuf;

/// A control request applied between frames.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Clear the pose graph, the tracker and all motion history.
    Reset,
    /// Clear every outlier flag before the next bundle adjustment pass.
    ResetOutliers,
    SetOptimizeLandmarks(bool),
    SetOptimizePose(bool),
    SetBundleAdjustment(bool),
    SetStartNewLandmarks(bool),
    SetManualMode(bool),
    SetKeyframing(bool),
    SetOutlierRejection(bool),
    /// Number of free trailing poses per bundle adjustment pass.
    SetBaWindow(usize),
    /// Refine the current tracks at one pyramid level (`None`: all levels)
    /// and update the current pose.
    RefineTracks { level: Option<usize> },
    /// Prune tracks, update the current pose and, if the last frame was a
    /// keyframe, run bundle adjustment and start new landmarks.
    PruneAndOptimize,
    /// Export the trajectory as CSV.
    WriteTrajectory(PathBuf),
}
