//! Windowed bundle adjustment over the trailing poses of the pose graph.
//!
//! One pass:
//! 1. Select the window (free trailing poses plus fixed anchoring poses)
//! 2. Register cameras, poses and the landmarks of eligible tracks
//! 3. Add one reprojection residual per tracked observation
//! 4. Solve, then read poses back and re-derive each track's inverse depth
//! 5. Classify outlier landmarks (when enabled)
//!
//! Solver ids are kept in a [`RunIndex`] owned by the pass, so several
//! adapters can work over the same graph without touching its entities.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use super::adjuster::{BaOptions, BundleAdjuster};
use super::window::BaWindow;
use crate::camera::Rig;
use crate::geometry::SE3;
use crate::map::{PoseGraph, PoseId, TrackId};

/// Outlier classification applied to landmarks after solving.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierPolicy {
    /// Landmarks whose outlier ratio exceeds this are candidates.
    pub max_outlier_ratio: f64,
    /// Candidates spanning at least this many poses are rejected.
    pub max_track_length: usize,
}

/// Parameters of one pass.
#[derive(Debug, Clone)]
pub struct BaRequest<'a> {
    pub num_active_poses: usize,
    /// Distinguishes successive or concurrent passes in logs and summaries.
    pub run_id: u32,
    pub options: &'a BaOptions,
    /// `None` disables outlier rejection: flags are left as they are.
    pub outlier_policy: Option<OutlierPolicy>,
    /// Clear every outlier flag before building the problem.
    pub reset_outliers: bool,
    /// The tracker's longest-lived track; held fixed when the whole window is free.
    pub longest_track_id: Option<TrackId>,
}

/// What a pass did.
#[derive(Debug, Clone)]
pub struct BaSummary {
    pub run_id: u32,
    pub window: BaWindow,
    pub num_landmarks: usize,
    pub num_inactive_landmarks: usize,
    pub num_residuals: usize,
    pub num_outliers: usize,
    /// Optimized transform from the second-to-last pose into the last pose.
    pub last_t_ba: SE3,
}

/// Solver ids of the entities taking part in one pass.
///
/// Entities absent from the index did not participate.
#[derive(Debug, Default)]
pub struct RunIndex {
    poses: HashMap<PoseId, usize>,
    landmarks: HashMap<TrackId, usize>,
}

impl RunIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pose(&self, id: PoseId) -> Option<usize> {
        self.poses.get(&id).copied()
    }

    pub fn landmark(&self, id: TrackId) -> Option<usize> {
        self.landmarks.get(&id).copied()
    }

    pub fn num_landmarks(&self) -> usize {
        self.landmarks.len()
    }
}

/// Run one windowed bundle adjustment pass over `graph`.
///
/// Returns `None` when there is nothing to optimize (empty window or a
/// single pose); the graph is left untouched apart from an outlier reset.
pub fn windowed_bundle_adjustment<B: BundleAdjuster + ?Sized>(
    graph: &mut PoseGraph,
    rig: &Rig,
    adjuster: &mut B,
    request: &BaRequest<'_>,
) -> Option<BaSummary> {
    if request.reset_outliers {
        graph.reset_outliers();
    }

    let window = BaWindow::select(graph, request.num_active_poses);
    if window.is_empty() || graph.len() < 2 {
        debug!(
            run_id = request.run_id,
            num_poses = graph.len(),
            start_pose = window.start_pose,
            "Skipping bundle adjustment: nothing to optimize"
        );
        return None;
    }

    let pose_ids: Vec<PoseId> = (window.start_pose..window.end)
        .filter_map(|position| graph.pose_id(position))
        .collect();
    let all_poses_active = window.all_poses_active();

    let (poses, tracks) = graph.parts_mut();
    let landmark_capacity: usize = (window.start_pose..window.end)
        .map(|position| poses[position].tracks.len())
        .sum();

    adjuster.init(request.options, window.len(), landmark_capacity);
    for camera in &rig.cameras {
        adjuster.add_camera(camera);
    }

    // First add all the poses and landmarks.
    let mut run = RunIndex::new();
    let mut num_inactive_landmarks = 0;
    for (offset, position) in (window.start_pose..window.end).enumerate() {
        let pose = &poses[position];
        let pose_opt_id = adjuster.add_pose(&pose.t_wp, window.is_active(position));
        run.poses.insert(pose_ids[offset], pose_opt_id);

        for &track_id in &pose.tracks {
            let Some(track) = tracks.get(track_id) else {
                continue;
            };
            let constrains_active = track.len() + position > window.start_active_pose;
            if track.num_good_tracked_frames <= 1 || track.is_outlier || !constrains_active {
                continue;
            }
            let Some(camera) = rig.camera(track.ref_cam_id) else {
                warn!(track = %track_id, cam = track.ref_cam_id, "Track references unknown camera");
                continue;
            };

            let x_w = track.world_landmark(&pose.t_wp.compose(&camera.t_pc));
            let active = request.longest_track_id != Some(track_id) || !all_poses_active;
            if !active {
                debug!(track = %track_id, "Landmark inactive");
                num_inactive_landmarks += 1;
            }
            let landmark_id = adjuster.add_landmark(&x_w, pose_opt_id, track.ref_cam_id, active);
            run.landmarks.insert(track_id, landmark_id);
        }
    }

    // Now add all reprojections.
    let mut num_residuals = 0;
    for (offset, position) in (window.start_pose..window.end).enumerate() {
        for &track_id in &poses[position].tracks {
            let (Some(landmark_id), Some(track)) = (run.landmark(track_id), tracks.get(track_id))
            else {
                continue;
            };
            for cam_id in 0..rig.len() {
                for (jj, observations) in track.keypoint_history.iter().enumerate() {
                    let Some(obs) = observations.get(cam_id).filter(|obs| obs.tracked) else {
                        continue;
                    };
                    let Some(pose_opt_id) = pose_ids.get(offset + jj).and_then(|id| run.pose(*id))
                    else {
                        continue;
                    };
                    adjuster.add_projection_residual(&obs.kp, pose_opt_id, landmark_id, cam_id);
                    num_residuals += 1;
                }
            }
        }
    }

    adjuster.solve(request.options.max_iterations);

    // Read out the pose and landmark values. Relative transforms are taken
    // against the optimized last pose.
    let last_position = window.end - 1;
    let last_t_wp = run
        .pose(pose_ids[pose_ids.len() - 1])
        .and_then(|id| adjuster.pose(id))
        .unwrap_or(poses[last_position].t_wp);
    let last_t_pw = last_t_wp.inverse();

    let mut num_outliers = 0;
    let mut t_ba = SE3::identity();
    let mut last_t_ba = SE3::identity();
    for (offset, position) in (window.start_pose..window.end).enumerate() {
        let pose = &mut poses[position];
        match run.pose(pose_ids[offset]).and_then(|id| adjuster.pose(id)) {
            Some(t_wp) => pose.t_wp = t_wp,
            None => warn!(pose = %pose_ids[offset], "Solver returned no pose"),
        }

        last_t_ba = t_ba;
        t_ba = last_t_pw.compose(&pose.t_wp);

        for &track_id in &pose.tracks {
            let Some(landmark_id) = run.landmark(track_id) else {
                continue;
            };
            let Some(track) = tracks.get_mut(track_id) else {
                continue;
            };
            track.t_ba = t_ba;

            if let Some(policy) = request.outlier_policy {
                let ratio = adjuster.landmark_outlier_ratio(landmark_id).unwrap_or(0.0);
                if ratio > policy.max_outlier_ratio
                    && (track.len() >= policy.max_track_length || !track.tracked)
                {
                    num_outliers += 1;
                    track.is_outlier = true;
                } else {
                    track.is_outlier = false;
                }
            }

            let (Some(x_w), Some(camera)) =
                (adjuster.landmark(landmark_id), rig.camera(track.ref_cam_id))
            else {
                warn!(track = %track_id, "Solver returned no landmark");
                continue;
            };
            track.refresh_inverse_depth(&pose.t_wp.compose(&camera.t_pc), &x_w);
        }
    }

    info!(
        run_id = request.run_id,
        poses = window.len(),
        active_poses = window.num_active(),
        landmarks = run.num_landmarks(),
        residuals = num_residuals,
        "Rejected {} outliers",
        num_outliers
    );

    Some(BaSummary {
        run_id: request.run_id,
        window,
        num_landmarks: run.num_landmarks(),
        num_inactive_landmarks,
        num_residuals,
        num_outliers,
        last_t_ba,
    })
}
