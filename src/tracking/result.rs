//! Per-frame processing results.
//!
//! These types describe what happened during processing of a single frame:
//! - tracking state and the resulting pose
//! - keyframe decision and the bundle adjustment pass it triggered
//! - timing information for profiling

use crate::geometry::SE3;
use crate::map::TrackId;
use crate::optimizer::BaSummary;
use crate::tracking::keyframe_decision::KeyframeDecision;
use crate::tracking::TrackingState;

/// Summary of one processed frame.
#[derive(Debug, Clone)]
pub struct FrameResult {
    /// Zero-based index of the frame since the last reset.
    pub frame_index: u64,
    pub state: TrackingState,
    /// World pose of the frame.
    pub pose: SE3,
    /// Motion guess handed to the tracker.
    pub guess: SE3,
    pub num_successful_tracks: usize,
    pub keyframe: KeyframeDecision,
    /// Keyframe baseline after this frame.
    pub keyframe_baseline: Option<usize>,
    /// Present when the frame triggered a bundle adjustment pass that ran.
    pub ba: Option<BaSummary>,
    /// Tracks started at this frame.
    pub new_tracks: Vec<TrackId>,
    pub timing: TimingStats,
}

impl FrameResult {
    pub fn is_keyframe(&self) -> bool {
        self.keyframe.is_keyframe
    }
}

/// Timing breakdown for a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimingStats {
    pub total_ms: f64,
    pub track_ms: f64,
    pub ba_ms: f64,
}
