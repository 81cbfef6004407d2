//! Feature tracker over a synthetic scene.
//!
//! Frames are indices into the scene's trajectory. Keypoints are exact
//! projections of the ground-truth points, and the keyframe-to-frame
//! transform is taken from ground truth when pose refinement is enabled
//! (otherwise the motion guess is kept).

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use super::SyntheticScene;
use crate::geometry::SE3;
use crate::map::{Observation, ReferenceKeypoint, Track, TrackId, TrackTable};
use crate::tracking::{FeatureTracker, RefineOptions};

pub struct SyntheticTracker {
    scene: SyntheticScene,
    /// Feature budget: new landmarks top the current set up to this.
    num_features: usize,
    /// Inverse depth given to new landmarks.
    initial_rho: f64,

    /// Tracks currently followed, oldest first.
    current: Vec<TrackId>,
    /// Scene point followed by each live track.
    point_of: HashMap<TrackId, usize>,
    frame: Option<usize>,
    keyframe: Option<usize>,
    /// Set by `add_keyframe`: the next frame opens a new history entry.
    open_history_entry: bool,
    t_ba: SE3,
    num_successful: usize,
}

impl SyntheticTracker {
    pub fn new(scene: SyntheticScene, num_features: usize, initial_rho: f64) -> Self {
        Self {
            scene,
            num_features,
            initial_rho,
            current: Vec::new(),
            point_of: HashMap::new(),
            frame: None,
            keyframe: None,
            open_history_entry: false,
            t_ba: SE3::identity(),
            num_successful: 0,
        }
    }

    pub fn scene(&self) -> &SyntheticScene {
        &self.scene
    }

    /// Ground-truth keyframe-to-frame transform for the current frame.
    fn ground_truth_t_ba(&self) -> SE3 {
        match (self.frame, self.keyframe) {
            (Some(frame), Some(keyframe)) => {
                self.scene.poses[frame].inverse().compose(&self.scene.poses[keyframe])
            }
            _ => SE3::identity(),
        }
    }

    /// Observations of scene point `point` from every rig camera at `frame`.
    fn observe(&self, frame: usize, point: usize) -> Vec<Observation> {
        let t_wp = &self.scene.poses[frame];
        let p_w = &self.scene.points[point];
        self.scene
            .rig
            .cameras
            .iter()
            .map(|camera| {
                let p_c = t_wp.compose(&camera.t_pc).inverse().transform_point(p_w);
                camera
                    .project(&p_c)
                    .filter(|kp| camera.in_image(kp))
                    .map_or_else(Observation::lost, |kp| Observation::new(kp, true))
            })
            .collect()
    }
}

impl FeatureTracker for SyntheticTracker {
    type Frame = usize;

    fn add_frame(&mut self, frame: &usize, guess: &SE3, tracks: &mut TrackTable) {
        let frame = (*frame).min(self.scene.len().saturating_sub(1));
        self.frame = Some(frame);
        self.t_ba = *guess;
        let open_entry = std::mem::take(&mut self.open_history_entry);

        let mut num_successful = 0;
        for id in &self.current {
            let (Some(track), Some(&point)) = (tracks.get_mut(*id), self.point_of.get(id)) else {
                continue;
            };
            let observations = self.observe(frame, point);
            track.tracked = observations
                .get(track.ref_cam_id)
                .is_some_and(|obs| obs.tracked);
            if open_entry || track.keypoint_history.is_empty() {
                track.keypoint_history.push(observations);
            } else if let Some(last) = track.keypoint_history.last_mut() {
                *last = observations;
            }
            if track.tracked {
                track.num_good_tracked_frames += 1;
                if !track.is_outlier {
                    num_successful += 1;
                }
            }
        }
        self.num_successful = num_successful;
        trace!(frame, tracks = self.current.len(), num_successful, "Tracked frame");
    }

    fn refine_tracks(&mut self, options: &RefineOptions, _tracks: &mut TrackTable) {
        if options.optimize_pose {
            self.t_ba = self.ground_truth_t_ba();
        }
    }

    fn prune_tracks(&mut self, tracks: &mut TrackTable) {
        let before = self.current.len();
        self.current.retain(|id| {
            tracks
                .get(*id)
                .is_some_and(|track| track.tracked && !track.is_outlier)
        });
        self.point_of.retain(|id, _| self.current.contains(id));
        debug!(pruned = before - self.current.len(), "Pruned tracks");
    }

    fn start_new_landmarks(&mut self, tracks: &mut TrackTable) -> Vec<TrackId> {
        let Some(frame) = self.frame else {
            return Vec::new();
        };
        let Some(camera) = self.scene.rig.camera(0) else {
            return Vec::new();
        };
        let followed: HashSet<usize> = self.point_of.values().copied().collect();
        let budget = self.num_features.saturating_sub(self.current.len());

        let mut new_tracks = Vec::new();
        for point in 0..self.scene.points.len() {
            if new_tracks.len() >= budget {
                break;
            }
            if followed.contains(&point) {
                continue;
            }
            let observations = self.observe(frame, point);
            let Some(kp) = observations.first().filter(|obs| obs.tracked).map(|obs| obs.kp) else {
                continue;
            };

            let id = tracks.allocate_id();
            let ref_keypoint = ReferenceKeypoint::new(camera.unproject(&kp), self.initial_rho);
            tracks.insert(Track::new(id, 0, ref_keypoint, observations));
            self.point_of.insert(id, point);
            self.current.push(id);
            new_tracks.push(id);
        }
        debug!(frame, started = new_tracks.len(), "Started new landmarks");
        new_tracks
    }

    fn add_keyframe(&mut self) {
        self.keyframe = self.frame;
        self.open_history_entry = true;
    }

    fn transform_track_tabs(&mut self, t_ba: &SE3, tracks: &mut TrackTable) {
        for id in &self.current {
            if let Some(track) = tracks.get_mut(*id) {
                track.t_ba = t_ba.compose(&track.t_ba);
            }
        }
    }

    fn current_tracks(&self) -> &[TrackId] {
        &self.current
    }

    fn num_successful_tracks(&self) -> usize {
        self.num_successful
    }

    fn longest_track_id(&self) -> Option<TrackId> {
        // Tracks are kept oldest first, so the head has the longest history.
        self.current.first().copied()
    }

    fn t_ba(&self) -> SE3 {
        self.t_ba
    }

    fn set_t_ba(&mut self, t_ba: SE3) {
        self.t_ba = t_ba;
    }

    fn reset(&mut self) {
        self.current.clear();
        self.point_of.clear();
        self.frame = None;
        self.keyframe = None;
        self.open_history_entry = false;
        self.t_ba = SE3::identity();
        self.num_successful = 0;
    }
}
