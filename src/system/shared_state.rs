//! State published by the frame pipeline for rendering and UI threads.
//!
//! The pipeline is the only writer. Readers take a snapshot of the pose
//! sequence and the current track overlay after each frame.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::Vector2;
use parking_lot::RwLock;

use crate::geometry::SE3;
use crate::map::TrackId;
use crate::tracking::TrackingState;

/// One current track, as drawn over the latest image.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackOverlay {
    pub id: TrackId,
    /// Latest keypoint in the reference camera, if observed.
    pub kp: Option<Vector2<f64>>,
    pub tracked: bool,
    pub is_outlier: bool,
    /// Number of poses the track spans.
    pub length: usize,
}

/// Pose graph and tracker view after the most recent frame.
#[derive(Debug, Clone, Default)]
pub struct MapSnapshot {
    /// Keyframe poses in graph order.
    pub poses: Vec<SE3>,
    /// Pose of the most recent frame.
    pub current_pose: SE3,
    pub tracks: Vec<TrackOverlay>,
    pub state: TrackingState,
    pub num_successful_tracks: usize,
}

pub struct SharedState {
    snapshot: RwLock<MapSnapshot>,
    frames_processed: AtomicU64,
    keyframes: AtomicU64,
}

impl SharedState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Clone of the latest snapshot.
    pub fn snapshot(&self) -> MapSnapshot {
        self.snapshot.read().clone()
    }

    /// Run `f` against the latest snapshot without cloning it.
    pub fn with_snapshot<R>(&self, f: impl FnOnce(&MapSnapshot) -> R) -> R {
        f(&self.snapshot.read())
    }

    pub fn publish(&self, snapshot: MapSnapshot, is_keyframe: bool) {
        *self.snapshot.write() = snapshot;
        self.frames_processed.fetch_add(1, Ordering::SeqCst);
        if is_keyframe {
            self.keyframes.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Drop the published view, e.g. after a pipeline reset.
    pub fn clear(&self) {
        *self.snapshot.write() = MapSnapshot::default();
        self.frames_processed.store(0, Ordering::SeqCst);
        self.keyframes.store(0, Ordering::SeqCst);
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed.load(Ordering::SeqCst)
    }

    pub fn keyframes(&self) -> u64 {
        self.keyframes.load(Ordering::SeqCst)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self {
            snapshot: RwLock::new(MapSnapshot::default()),
            frames_processed: AtomicU64::new(0),
            keyframes: AtomicU64::new(0),
        }
    }
}
