//! Frame pipeline - the per-frame state machine.
//!
//! Each frame runs:
//! 1. Motion guess, then `add_frame` on the tracker
//! 2. Local refinement and pruning (skipped in manual mode)
//! 3. Tracking-failure fallback to the guess
//! 4. Current pose update by chaining onto the last keyframe
//! 5. Keyframe decision
//! 6. On a keyframe (outside manual mode): windowed bundle adjustment and
//!    new landmarks anchored at the keyframe
//! 7. Bookkeeping: keyframe baseline, retention horizon
//!
//! The pose graph only holds keyframe poses. The pose of the frame being
//! tracked is kept aside as the *current* pose and committed to the graph
//! when the frame is declared a keyframe.

use std::collections::HashSet;
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::camera::Rig;
use crate::config::PipelineConfig;
use crate::geometry::SE3;
use crate::io::write_trajectory;
use crate::map::{PoseGraph, TrackId, TrackerPose};
use crate::optimizer::{windowed_bundle_adjustment, BaRequest, BaSummary, BundleAdjuster};
use crate::system::Command;
use crate::tracking::feature_tracker::{FeatureTracker, RefineOptions};
use crate::tracking::keyframe_decision::{KeyframeDecision, KeyframePolicy};
use crate::tracking::motion_model::MotionModel;
use crate::tracking::result::{FrameResult, TimingStats};
use crate::tracking::TrackingState;

pub struct FramePipeline<T: FeatureTracker, B: BundleAdjuster> {
    config: PipelineConfig,
    rig: Rig,
    tracker: T,
    adjuster: B,

    graph: PoseGraph,
    /// Pose of the frame being tracked, not yet committed to the graph.
    current: TrackerPose,

    motion: MotionModel,
    keyframes: KeyframePolicy,
    state: TrackingState,
    /// Whether the previous frame became a keyframe.
    prev_was_keyframe: bool,
    /// The last processed frame is committed as the newest graph pose.
    current_committed: bool,
    /// Relative transform between the last two optimized keyframes.
    last_t_ba: SE3,
    /// Clear outlier flags before the next bundle adjustment pass.
    reset_outliers: bool,
    frame_index: u64,
    ba_runs: u32,
}

impl<T: FeatureTracker, B: BundleAdjuster> FramePipeline<T, B> {
    pub fn new(config: PipelineConfig, rig: Rig, tracker: T, adjuster: B) -> Result<Self> {
        config.validate()?;
        let motion = MotionModel::new(
            config.min_tracked_fraction,
            config.degenerate_translation_epsilon,
        );
        let keyframes = KeyframePolicy::new(config.keyframe.clone());
        Ok(Self {
            config,
            rig,
            tracker,
            adjuster,
            graph: PoseGraph::new(),
            current: TrackerPose::default(),
            motion,
            keyframes,
            state: TrackingState::NotInitialized,
            prev_was_keyframe: true,
            current_committed: false,
            last_t_ba: SE3::identity(),
            reset_outliers: false,
            frame_index: 0,
            ba_runs: 0,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn graph(&self) -> &PoseGraph {
        &self.graph
    }

    /// Pose of the most recently processed frame.
    pub fn current_pose(&self) -> &TrackerPose {
        &self.current
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    pub fn adjuster(&self) -> &B {
        &self.adjuster
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn keyframe_baseline(&self) -> Option<usize> {
        self.keyframes.baseline()
    }

    /// Number of frames processed since the last reset.
    pub fn frames_processed(&self) -> u64 {
        self.frame_index
    }

    /// Track ids the tracker currently follows.
    pub fn current_tracks(&self) -> &[TrackId] {
        self.tracker.current_tracks()
    }

    pub fn process_frame(&mut self, frame: &T::Frame) -> FrameResult {
        let t_start = Instant::now();
        let frame_index = self.frame_index;
        self.frame_index += 1;

        if self.prev_was_keyframe {
            self.start_current_pose();
        }
        self.current_committed = false;

        // Motion guess from the last frame's tracking result.
        let tracked_fraction =
            self.tracker.num_successful_tracks() as f64 / self.config.num_features as f64;
        let guess = self
            .motion
            .predict(&self.tracker.t_ba(), self.prev_was_keyframe, tracked_fraction);
        let guess = self
            .motion
            .correct_degenerate(guess, self.graph.len() + 1);
        debug!(frame = frame_index, translation = ?guess.translation, "Guess");

        self.tracker.add_frame(frame, &guess, self.graph.tracks_mut());
        if !self.config.is_manual_mode {
            let options = self.refine_options(Some(0));
            self.tracker.refine_tracks(&options, self.graph.tracks_mut());
            self.tracker.prune_tracks(self.graph.tracks_mut());
        }
        let track_ms = t_start.elapsed().as_secs_f64() * 1000.0;

        let num_successful = self.tracker.num_successful_tracks();
        self.state = if num_successful < self.config.min_successful_tracks {
            warn!(
                frame = frame_index,
                successful = num_successful,
                "Tracking failed, using guess"
            );
            self.tracker.set_t_ba(guess);
            self.discard_current_tracks();
            TrackingState::Lost
        } else {
            TrackingState::Ok
        };

        self.update_current_pose();

        let keyframe = self.decide_keyframe(num_successful);
        if keyframe.is_keyframe {
            self.tracker.add_keyframe();
        }
        self.prev_was_keyframe = keyframe.is_keyframe;

        let mut ba = None;
        let mut ba_ms = 0.0;
        let mut new_tracks = Vec::new();
        if keyframe.is_keyframe {
            self.commit_current_pose();
            if !self.config.is_manual_mode {
                let t_ba_start = Instant::now();
                (ba, new_tracks) = self.ba_and_start_new_landmarks();
                ba_ms = t_ba_start.elapsed().as_secs_f64() * 1000.0;
            }
            self.keyframes
                .record_baseline(self.tracker.current_tracks().len());
            self.enforce_retention();
        }
        let pose = match self.graph.last() {
            Some(last) if keyframe.is_keyframe => last.t_wp,
            _ => self.current.t_wp,
        };

        let timing = TimingStats {
            total_ms: t_start.elapsed().as_secs_f64() * 1000.0,
            track_ms,
            ba_ms,
        };
        info!(
            frame = frame_index,
            successful = num_successful,
            keyframe = keyframe.is_keyframe,
            poses = self.graph.len(),
            total_ms = timing.total_ms,
            "Processed frame"
        );

        FrameResult {
            frame_index,
            state: self.state,
            pose,
            guess,
            num_successful_tracks: num_successful,
            keyframe,
            keyframe_baseline: self.keyframes.baseline(),
            ba,
            new_tracks,
            timing,
        }
    }

    /// Apply a control command. Called between frames only.
    pub fn apply(&mut self, command: Command) -> Result<()> {
        debug!(?command, "Applying command");
        match command {
            Command::Reset => self.reset(),
            Command::ResetOutliers => self.reset_outliers = true,
            Command::SetOptimizeLandmarks(on) => self.config.optimize_landmarks = on,
            Command::SetOptimizePose(on) => self.config.optimize_pose = on,
            Command::SetBundleAdjustment(on) => self.config.do_bundle_adjustment = on,
            Command::SetStartNewLandmarks(on) => self.config.do_start_new_landmarks = on,
            Command::SetManualMode(on) => self.config.is_manual_mode = on,
            Command::SetKeyframing(on) => self.config.do_keyframing = on,
            Command::SetOutlierRejection(on) => self.config.do_outlier_rejection = on,
            Command::SetBaWindow(size) => {
                let mut config = self.config.clone();
                config.ba_window_size = size.max(1);
                config.validate()?;
                self.config = config;
            }
            Command::RefineTracks { level } => {
                let options = self.refine_options(level);
                self.tracker.refine_tracks(&options, self.graph.tracks_mut());
                self.update_current_pose();
            }
            Command::PruneAndOptimize => {
                self.tracker.prune_tracks(self.graph.tracks_mut());
                self.update_current_pose();
                if self.current_committed {
                    let (_, new_tracks) = self.ba_and_start_new_landmarks();
                    debug!(new_tracks = new_tracks.len(), "Manual optimization step");
                }
            }
            Command::WriteTrajectory(path) => write_trajectory(&path, &self.graph.trajectory())?,
        }
        Ok(())
    }

    /// Drop every pose, track and piece of motion history.
    pub fn reset(&mut self) {
        self.graph.clear();
        self.tracker.reset();
        self.current = TrackerPose::default();
        self.motion.reset();
        self.keyframes.reset();
        self.state = TrackingState::NotInitialized;
        self.prev_was_keyframe = true;
        self.current_committed = false;
        self.last_t_ba = SE3::identity();
        self.reset_outliers = false;
        self.frame_index = 0;
        info!("Pipeline reset");
    }

    fn refine_options(&self, pyramid_level: Option<usize>) -> RefineOptions {
        RefineOptions {
            optimize_landmarks: self.config.optimize_landmarks,
            optimize_pose: self.config.optimize_pose,
            pyramid_level,
        }
    }

    /// Begin a new current pose after a keyframe, seeded from the last one.
    fn start_current_pose(&mut self) {
        let t_wp = self
            .graph
            .last()
            .map_or(SE3::identity(), |last| last.t_wp.compose(&self.last_t_ba.inverse()));
        self.current = TrackerPose::new(t_wp);
    }

    /// Chain the current pose onto its keyframe and refresh the
    /// longest-track heuristic.
    ///
    /// Once the frame has been committed, the newest graph pose is the
    /// current pose and is re-chained from the keyframe before it.
    fn update_current_pose(&mut self) {
        let t_ab = self.tracker.t_ba().inverse();
        let tracks = self.graph.tracks();
        let longest_track = self
            .tracker
            .current_tracks()
            .iter()
            .filter_map(|&id| tracks.get(id))
            .map(|track| track.len())
            .max()
            .unwrap_or(0);

        if !self.current_committed {
            if let Some(last) = self.graph.last() {
                self.current.t_wp = last.t_wp.compose(&t_ab);
            }
            self.current.longest_track = longest_track;
            return;
        }

        let anchor = self
            .graph
            .len()
            .checked_sub(2)
            .and_then(|position| self.graph.get(position))
            .map(|pose| pose.t_wp);
        if let Some(last) = self.graph.last_mut() {
            if let Some(anchor) = anchor {
                last.t_wp = anchor.compose(&t_ab);
            }
            last.longest_track = longest_track;
            self.current.t_wp = last.t_wp;
        }
        self.current.longest_track = longest_track;
    }

    /// Drop tracks started at the current pose after a tracking failure.
    fn discard_current_tracks(&mut self) {
        for id in self.current.tracks.drain(..) {
            self.graph.tracks_mut().remove(id);
        }
    }

    fn decide_keyframe(&self, num_successful: usize) -> KeyframeDecision {
        let t_ba = self.tracker.t_ba();
        if !self.config.do_keyframing {
            return KeyframeDecision {
                is_keyframe: true,
                track_ratio: None,
                translation: t_ba.translation.norm(),
                rotation: t_ba.rotation_angle(),
            };
        }

        let decision = self.keyframes.decide(num_successful, &t_ba);
        debug!(
            ratio = ?decision.track_ratio,
            trans = decision.translation,
            rot = decision.rotation,
            keyframe = decision.is_keyframe,
            "Keyframe decision"
        );
        decision
    }

    fn commit_current_pose(&mut self) {
        let pose = std::mem::take(&mut self.current);
        let id = self.graph.push(pose);
        self.current = self.graph.last().cloned().unwrap_or_default();
        self.current.tracks.clear();
        self.current_committed = true;
        debug!(pose = %id, "Committed keyframe pose");
    }

    /// Bundle adjustment over the trailing window, then new landmarks
    /// anchored at the newest keyframe.
    fn ba_and_start_new_landmarks(&mut self) -> (Option<BaSummary>, Vec<TrackId>) {
        let mut summary = None;
        if self.config.do_bundle_adjustment {
            let request = BaRequest {
                num_active_poses: self.config.ba_window_size,
                run_id: self.ba_runs,
                options: &self.config.ba,
                outlier_policy: self.config.outlier_policy(),
                reset_outliers: std::mem::take(&mut self.reset_outliers),
                longest_track_id: self.tracker.longest_track_id(),
            };
            self.ba_runs = self.ba_runs.wrapping_add(1);
            summary = windowed_bundle_adjustment(
                &mut self.graph,
                &self.rig,
                &mut self.adjuster,
                &request,
            );
            if let Some(summary) = &summary {
                self.last_t_ba = summary.last_t_ba;
            }
        }

        let new_tracks = if self.config.do_start_new_landmarks {
            self.tracker.start_new_landmarks(self.graph.tracks_mut())
        } else {
            Vec::new()
        };
        if let Some(pose) = self.graph.last_mut() {
            pose.tracks.extend_from_slice(&new_tracks);
            self.current.t_wp = pose.t_wp;
        }

        if !self.config.do_bundle_adjustment {
            let t_ba = self.tracker.t_ba();
            self.tracker
                .transform_track_tabs(&t_ba, self.graph.tracks_mut());
        }

        (summary, new_tracks)
    }

    fn enforce_retention(&mut self) {
        let Some(max_poses) = self.config.max_retained_poses else {
            return;
        };
        let current: HashSet<TrackId> = self.tracker.current_tracks().iter().copied().collect();
        self.graph.enforce_retention(max_poses, &current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::IdentityAdjuster;
    use crate::test_helpers::{make_rig, ScriptedFrame, ScriptedTracker};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    type TestPipeline = FramePipeline<ScriptedTracker, IdentityAdjuster>;

    fn make_pipeline(config: PipelineConfig) -> TestPipeline {
        let tracker = ScriptedTracker::new(config.num_features);
        FramePipeline::new(config, make_rig(), tracker, IdentityAdjuster::new()).unwrap()
    }

    fn config_with_budget(num_features: usize) -> PipelineConfig {
        PipelineConfig {
            num_features,
            ..Default::default()
        }
    }

    fn moved(successful: usize, z: f64) -> ScriptedFrame {
        ScriptedFrame {
            successful,
            t_ba: SE3::from_translation(Vector3::new(0.0, 0.0, -z)),
            refined_t_ba: None,
        }
    }

    #[test]
    fn test_decreasing_track_ratios() {
        let mut pipeline = make_pipeline(config_with_budget(100));
        let results: Vec<FrameResult> = [100, 75, 50]
            .into_iter()
            .map(|n| pipeline.process_frame(&ScriptedFrame::still(n)))
            .collect();

        assert!(results[0].is_keyframe());
        assert_eq!(results[0].keyframe.track_ratio, None);
        assert_eq!(results[0].keyframe_baseline, Some(100));

        // 0.75 is below the 0.8 threshold.
        assert!(results[1].is_keyframe());
        assert_eq!(results[1].keyframe.track_ratio, Some(0.75));

        assert!(results[2].is_keyframe());
        assert_eq!(results[2].keyframe.track_ratio, Some(0.5));
        assert_eq!(pipeline.graph().len(), 3);
    }

    #[test]
    fn test_graph_length_equals_keyframe_count() {
        let mut pipeline = make_pipeline(config_with_budget(100));
        let frames = [
            ScriptedFrame::still(100),
            ScriptedFrame::still(95),
            moved(90, 0.1),
            ScriptedFrame::still(70),
            moved(100, 0.05),
            moved(100, 0.3),
        ];

        let mut keyframes = 0;
        for frame in &frames {
            if pipeline.process_frame(frame).is_keyframe() {
                keyframes += 1;
            }
            assert_eq!(pipeline.graph().len(), keyframes);
        }
        assert_eq!(keyframes, 3);
        assert_eq!(pipeline.tracker().keyframes, 3);
    }

    #[test]
    fn test_pose_chains_onto_last_keyframe() {
        let mut pipeline = make_pipeline(config_with_budget(100));
        pipeline.process_frame(&ScriptedFrame::still(100));
        let result = pipeline.process_frame(&moved(100, 0.1));

        assert!(!result.is_keyframe());
        assert_eq!(pipeline.graph().len(), 1);
        assert_relative_eq!(result.pose.translation, Vector3::new(0.0, 0.0, 0.1), epsilon = 1e-12);
        assert_relative_eq!(
            pipeline.current_pose().t_wp.translation,
            Vector3::new(0.0, 0.0, 0.1),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_tracking_failure_falls_back_to_guess() {
        let mut pipeline = make_pipeline(config_with_budget(100));
        pipeline.process_frame(&ScriptedFrame::still(100));
        let result = pipeline.process_frame(&moved(5, 1.0));

        assert_eq!(result.state, TrackingState::Lost);
        assert_eq!(pipeline.tracker().count("set_t_ba"), 1);
        // No motion so far: the guess is the degenerate-motion nudge.
        assert_eq!(result.guess.translation, Vector3::new(0.0, 0.0, 0.001));
        assert_eq!(pipeline.tracker().t_ba(), result.guess);
        assert_relative_eq!(result.pose.translation, Vector3::new(0.0, 0.0, -0.001), epsilon = 1e-12);
    }

    #[test]
    fn test_tracking_failure_keeps_keyframe_tracks() {
        let mut pipeline = make_pipeline(config_with_budget(100));
        pipeline.process_frame(&ScriptedFrame::still(100));
        let result = pipeline.process_frame(&moved(5, 1.0));

        assert_eq!(result.state, TrackingState::Lost);
        assert!(pipeline.current_pose().tracks.is_empty());
        assert_eq!(pipeline.graph().get(0).unwrap().tracks.len(), 100);
        assert_eq!(pipeline.graph().tracks().len(), 100);
    }

    #[test]
    fn test_keyframing_disabled_makes_every_frame_a_keyframe() {
        let mut pipeline = make_pipeline(PipelineConfig {
            num_features: 100,
            do_keyframing: false,
            ..Default::default()
        });
        for _ in 0..4 {
            assert!(pipeline.process_frame(&ScriptedFrame::still(100)).is_keyframe());
        }
        assert_eq!(pipeline.graph().len(), 4);
        assert_eq!(pipeline.tracker().keyframes, 4);
    }

    #[test]
    fn test_keyframe_runs_ba_and_starts_landmarks() {
        let mut pipeline = make_pipeline(config_with_budget(100));
        let first = pipeline.process_frame(&ScriptedFrame::still(100));
        assert!(first.ba.is_none());
        assert_eq!(first.new_tracks.len(), 100);
        assert_eq!(pipeline.graph().get(0).unwrap().tracks.len(), 100);

        let result = pipeline.process_frame(&moved(100, 0.3));
        assert!(result.is_keyframe());
        let ba = result.ba.expect("bundle adjustment ran");
        assert_eq!(ba.num_landmarks, 100);
        assert_eq!(ba.num_residuals, 200);
        // The longest track is held fixed while every pose is free.
        assert_eq!(ba.num_inactive_landmarks, 1);
        assert!(result.new_tracks.is_empty());
        assert_eq!(pipeline.adjuster().solves, 1);
        assert_relative_eq!(
            pipeline.graph().get(1).unwrap().t_wp.translation,
            Vector3::new(0.0, 0.0, 0.3),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_manual_mode_skips_refinement_and_ba() {
        let mut pipeline = make_pipeline(PipelineConfig {
            num_features: 100,
            is_manual_mode: true,
            ..Default::default()
        });
        let result = pipeline.process_frame(&ScriptedFrame::still(100));

        assert!(result.is_keyframe());
        assert_eq!(pipeline.graph().len(), 1);
        let tracker = pipeline.tracker();
        assert_eq!(tracker.count("refine_tracks"), 0);
        assert_eq!(tracker.count("prune_tracks"), 0);
        assert_eq!(tracker.count("start_new_landmarks"), 0);
    }

    fn manual_pipeline_at_second_keyframe() -> TestPipeline {
        let mut pipeline = make_pipeline(PipelineConfig {
            num_features: 100,
            is_manual_mode: true,
            ..Default::default()
        });
        pipeline.process_frame(&ScriptedFrame::still(100));
        let result = pipeline.process_frame(&ScriptedFrame {
            refined_t_ba: Some(SE3::from_translation(Vector3::new(0.0, 0.0, -0.25))),
            ..moved(100, 0.3)
        });
        assert!(result.is_keyframe());
        assert_relative_eq!(result.pose.translation, Vector3::new(0.0, 0.0, 0.3), epsilon = 1e-12);
        pipeline
    }

    #[test]
    fn test_manual_refine_updates_committed_keyframe() {
        let mut pipeline = manual_pipeline_at_second_keyframe();
        pipeline
            .apply(Command::RefineTracks { level: Some(0) })
            .unwrap();

        assert_eq!(pipeline.tracker().count("refine_tracks"), 1);
        assert_eq!(pipeline.graph().len(), 2);
        let expected = Vector3::new(0.0, 0.0, 0.25);
        assert_relative_eq!(pipeline.graph().get(0).unwrap().t_wp.translation, Vector3::zeros());
        assert_relative_eq!(pipeline.graph().get(1).unwrap().t_wp.translation, expected, epsilon = 1e-12);
        assert_relative_eq!(pipeline.current_pose().t_wp.translation, expected, epsilon = 1e-12);

        // Refining again does not compound the motion.
        pipeline
            .apply(Command::RefineTracks { level: None })
            .unwrap();
        assert_relative_eq!(pipeline.graph().get(1).unwrap().t_wp.translation, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_manual_prune_and_optimize_runs_ba_on_refined_keyframe() {
        let mut pipeline = manual_pipeline_at_second_keyframe();
        pipeline
            .apply(Command::RefineTracks { level: Some(0) })
            .unwrap();
        pipeline.apply(Command::PruneAndOptimize).unwrap();

        let tracker = pipeline.tracker();
        assert_eq!(tracker.count("prune_tracks"), 1);
        assert_eq!(tracker.count("start_new_landmarks"), 1);
        assert_eq!(pipeline.adjuster().solves, 1);

        let (t_wp, _) = pipeline.adjuster().poses[1];
        assert_relative_eq!(t_wp.translation, Vector3::new(0.0, 0.0, 0.25), epsilon = 1e-12);
        let last = pipeline.graph().last().unwrap();
        assert_eq!(last.tracks.len(), 100);
        assert_relative_eq!(last.t_wp.translation, Vector3::new(0.0, 0.0, 0.25), epsilon = 1e-12);
    }

    #[test]
    fn test_ba_disabled_propagates_relative_pose() {
        let mut pipeline = make_pipeline(config_with_budget(100));
        pipeline.apply(Command::SetBundleAdjustment(false)).unwrap();
        pipeline.process_frame(&ScriptedFrame::still(100));
        let result = pipeline.process_frame(&moved(100, 0.3));

        assert!(result.is_keyframe());
        assert!(result.ba.is_none());
        assert_eq!(pipeline.adjuster().solves, 0);
        assert_eq!(pipeline.tracker().count("transform_track_tabs"), 2);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut pipeline = make_pipeline(config_with_budget(100));
        pipeline.process_frame(&ScriptedFrame::still(100));
        pipeline.process_frame(&moved(100, 0.3));
        assert_eq!(pipeline.graph().len(), 2);

        pipeline.apply(Command::Reset).unwrap();
        assert!(pipeline.graph().is_empty());
        assert!(pipeline.graph().tracks().is_empty());
        assert_eq!(pipeline.keyframe_baseline(), None);
        assert_eq!(pipeline.frames_processed(), 0);
        assert_eq!(pipeline.state(), TrackingState::NotInitialized);
        assert_eq!(pipeline.tracker().count("reset"), 1);

        let result = pipeline.process_frame(&ScriptedFrame::still(100));
        assert_eq!(result.frame_index, 0);
        assert!(result.is_keyframe());
        assert_eq!(pipeline.graph().len(), 1);
    }

    #[test]
    fn test_toggle_commands_update_config() {
        let mut pipeline = make_pipeline(config_with_budget(100));
        pipeline.apply(Command::SetOutlierRejection(false)).unwrap();
        pipeline.apply(Command::SetKeyframing(false)).unwrap();
        pipeline.apply(Command::SetBaWindow(0)).unwrap();

        let config = pipeline.config();
        assert!(!config.do_outlier_rejection);
        assert!(!config.do_keyframing);
        assert_eq!(config.ba_window_size, 1);
    }

    #[test]
    fn test_ba_window_cannot_exceed_retention() {
        let mut pipeline = make_pipeline(PipelineConfig {
            num_features: 100,
            ba_window_size: 3,
            max_retained_poses: Some(4),
            ..Default::default()
        });

        assert!(pipeline.apply(Command::SetBaWindow(10)).is_err());
        assert_eq!(pipeline.config().ba_window_size, 3);

        pipeline.apply(Command::SetBaWindow(4)).unwrap();
        assert_eq!(pipeline.config().ba_window_size, 4);
    }

    #[test]
    fn test_retention_bounds_graph() {
        let mut pipeline = make_pipeline(PipelineConfig {
            num_features: 100,
            do_keyframing: false,
            ba_window_size: 3,
            max_retained_poses: Some(4),
            ..Default::default()
        });
        for _ in 0..7 {
            pipeline.process_frame(&ScriptedFrame::still(100));
        }
        assert_eq!(pipeline.graph().len(), 4);
        assert_eq!(pipeline.graph().total_poses(), 7);
    }

    #[test]
    fn test_write_trajectory_command() {
        let mut pipeline = make_pipeline(config_with_budget(100));
        pipeline.process_frame(&ScriptedFrame::still(100));
        pipeline.process_frame(&moved(100, 0.3));

        let path = std::env::temp_dir().join(format!("vtracker_pipeline_{}.csv", std::process::id()));
        pipeline.apply(Command::WriteTrajectory(path.clone())).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(contents.lines().count(), 2);
    }
}
