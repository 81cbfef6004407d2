#![allow(dead_code)]

use nalgebra::{Vector2, Vector3, Vector4};

use crate::camera::{Camera, PinholeIntrinsics, Rig};
use crate::geometry::SE3;
use crate::map::{Observation, PoseGraph, ReferenceKeypoint, Track, TrackId, TrackTable, TrackerPose};
use crate::optimizer::{BaOptions, BundleAdjuster, IdentityAdjuster};
use crate::tracking::{FeatureTracker, RefineOptions};

pub(crate) fn make_rig() -> Rig {
    Rig::monocular(
        PinholeIntrinsics {
            fx: 400.0,
            fy: 400.0,
            cx: 320.0,
            cy: 240.0,
        },
        640,
        480,
    )
}

/// Graph of `num_poses` poses spaced `step` apart along +z.
pub(crate) fn make_chain_graph(num_poses: usize, step: f64) -> PoseGraph {
    let mut graph = PoseGraph::new();
    for i in 0..num_poses {
        graph.push(TrackerPose::new(SE3::from_translation(Vector3::new(
            0.0,
            0.0,
            step * i as f64,
        ))));
    }
    graph
}

/// Add a track anchored at `anchor` with `history_len` tracked observations
/// and `num_good` good frames. Returns its id.
pub(crate) fn add_track(
    graph: &mut PoseGraph,
    anchor: usize,
    history_len: usize,
    num_good: u32,
) -> TrackId {
    let id = graph.tracks_mut().allocate_id();
    let mut track = Track::new(
        id,
        0,
        ReferenceKeypoint::new(Vector3::new(0.05, -0.02, 1.0), 0.2),
        vec![Observation::new(Vector2::new(330.0, 232.0), true)],
    );
    for _ in 1..history_len {
        track
            .keypoint_history
            .push(vec![Observation::new(Vector2::new(331.0, 232.0), true)]);
    }
    track.num_good_tracked_frames = num_good;
    graph.tracks_mut().insert(track);
    if let Some(pose) = graph.get_mut(anchor) {
        pose.tracks.push(id);
    }
    id
}

/// Solver double: behaves like [`IdentityAdjuster`] but reports a fixed
/// outlier ratio and shifts every free pose by `pose_shift`.
#[derive(Debug, Default)]
pub(crate) struct ScriptedAdjuster {
    pub inner: IdentityAdjuster,
    pub outlier_ratio: f64,
    pub pose_shift: Vector3<f64>,
}

impl BundleAdjuster for ScriptedAdjuster {
    fn init(&mut self, options: &BaOptions, num_poses: usize, landmark_capacity: usize) {
        self.inner.init(options, num_poses, landmark_capacity);
    }

    fn add_camera(&mut self, camera: &Camera) -> usize {
        self.inner.add_camera(camera)
    }

    fn add_pose(&mut self, t_wp: &SE3, is_active: bool) -> usize {
        self.inner.add_pose(t_wp, is_active)
    }

    fn add_landmark(
        &mut self,
        x_w: &Vector4<f64>,
        ref_pose: usize,
        ref_cam: usize,
        is_active: bool,
    ) -> usize {
        self.inner.add_landmark(x_w, ref_pose, ref_cam, is_active)
    }

    fn add_projection_residual(&mut self, z: &Vector2<f64>, pose: usize, landmark: usize, cam: usize) {
        self.inner.add_projection_residual(z, pose, landmark, cam);
    }

    fn solve(&mut self, max_iterations: usize) {
        self.inner.solve(max_iterations);
    }

    fn pose(&self, pose: usize) -> Option<SE3> {
        let (t_wp, active) = self.inner.poses.get(pose)?;
        let mut t_wp = *t_wp;
        if *active {
            t_wp.translation += self.pose_shift;
        }
        Some(t_wp)
    }

    fn landmark(&self, landmark: usize) -> Option<Vector4<f64>> {
        self.inner.landmark(landmark)
    }

    fn landmark_outlier_ratio(&self, landmark: usize) -> Option<f64> {
        self.inner
            .landmarks
            .get(landmark)
            .map(|_| self.outlier_ratio)
    }
}

/// One scripted frame: what the tracker will report after tracking it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScriptedFrame {
    pub successful: usize,
    pub t_ba: SE3,
    /// Keyframe-to-frame transform reported after `refine_tracks`.
    pub refined_t_ba: Option<SE3>,
}

impl ScriptedFrame {
    pub fn still(successful: usize) -> Self {
        Self {
            successful,
            t_ba: SE3::identity(),
            refined_t_ba: None,
        }
    }
}

/// Feature tracker double driven by [`ScriptedFrame`]s.
///
/// New landmarks top the current set up to `num_features`. Every call is
/// recorded in `calls`.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTracker {
    pub num_features: usize,
    pub current: Vec<TrackId>,
    pub successful: usize,
    pub t_ba: SE3,
    pub calls: Vec<&'static str>,
    pub keyframes: usize,
    refined_t_ba: Option<SE3>,
    open_history_entry: bool,
}

impl ScriptedTracker {
    pub fn new(num_features: usize) -> Self {
        Self {
            num_features,
            ..Default::default()
        }
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }
}

impl FeatureTracker for ScriptedTracker {
    type Frame = ScriptedFrame;

    fn add_frame(&mut self, frame: &ScriptedFrame, _guess: &SE3, tracks: &mut TrackTable) {
        self.calls.push("add_frame");
        self.successful = frame.successful;
        self.t_ba = frame.t_ba;
        self.refined_t_ba = frame.refined_t_ba;
        let open_entry = std::mem::take(&mut self.open_history_entry);
        for id in &self.current {
            if let Some(track) = tracks.get_mut(*id) {
                let obs = vec![Observation::new(Vector2::new(320.0, 240.0), true)];
                if open_entry {
                    track.keypoint_history.push(obs);
                } else if let Some(last) = track.keypoint_history.last_mut() {
                    *last = obs;
                }
                track.num_good_tracked_frames += 1;
            }
        }
    }

    fn refine_tracks(&mut self, _options: &RefineOptions, _tracks: &mut TrackTable) {
        self.calls.push("refine_tracks");
        if let Some(t_ba) = self.refined_t_ba {
            self.t_ba = t_ba;
        }
    }

    fn prune_tracks(&mut self, _tracks: &mut TrackTable) {
        self.calls.push("prune_tracks");
    }

    fn start_new_landmarks(&mut self, tracks: &mut TrackTable) -> Vec<TrackId> {
        self.calls.push("start_new_landmarks");
        let budget = self.num_features.saturating_sub(self.current.len());
        let new_tracks: Vec<TrackId> = (0..budget)
            .map(|_| {
                let id = tracks.allocate_id();
                tracks.insert(Track::new(
                    id,
                    0,
                    ReferenceKeypoint::new(Vector3::z(), 0.2),
                    vec![Observation::new(Vector2::new(320.0, 240.0), true)],
                ));
                id
            })
            .collect();
        self.current.extend_from_slice(&new_tracks);
        new_tracks
    }

    fn add_keyframe(&mut self) {
        self.calls.push("add_keyframe");
        self.keyframes += 1;
        self.open_history_entry = true;
    }

    fn transform_track_tabs(&mut self, _t_ba: &SE3, _tracks: &mut TrackTable) {
        self.calls.push("transform_track_tabs");
    }

    fn current_tracks(&self) -> &[TrackId] {
        &self.current
    }

    fn num_successful_tracks(&self) -> usize {
        self.successful
    }

    fn longest_track_id(&self) -> Option<TrackId> {
        self.current.first().copied()
    }

    fn t_ba(&self) -> SE3 {
        self.t_ba
    }

    fn set_t_ba(&mut self, t_ba: SE3) {
        self.calls.push("set_t_ba");
        self.t_ba = t_ba;
    }

    fn reset(&mut self) {
        self.calls.push("reset");
        self.current.clear();
        self.successful = 0;
        self.t_ba = SE3::identity();
        self.refined_t_ba = None;
        self.open_history_entry = false;
    }
}
