//! VO System - main entry point.
//!
//! `VoSystem` wraps the frame pipeline with a command queue and the shared
//! snapshot. Frames are processed on the calling thread; commands can be sent
//! from anywhere through [`VoSystem::control`] and are applied before the next
//! frame.

use std::sync::Arc;

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::warn;

use crate::camera::Rig;
use crate::config::PipelineConfig;
use crate::geometry::SE3;
use crate::io::write_trajectory;
use crate::optimizer::BundleAdjuster;
use crate::tracking::result::FrameResult;
use crate::tracking::{FeatureTracker, FramePipeline};

use super::messages::Command;
use super::shared_state::{MapSnapshot, SharedState, TrackOverlay};

pub struct VoSystem<T: FeatureTracker, B: BundleAdjuster> {
    pipeline: FramePipeline<T, B>,
    shared: Arc<SharedState>,
    command_tx: Sender<Command>,
    command_rx: Receiver<Command>,
}

impl<T: FeatureTracker, B: BundleAdjuster> VoSystem<T, B> {
    pub fn new(config: PipelineConfig, rig: Rig, tracker: T, adjuster: B) -> Result<Self> {
        let pipeline = FramePipeline::new(config, rig, tracker, adjuster)?;
        let (command_tx, command_rx) = unbounded();
        Ok(Self {
            pipeline,
            shared: SharedState::new(),
            command_tx,
            command_rx,
        })
    }

    /// Handle for queueing commands from other threads.
    pub fn control(&self) -> Sender<Command> {
        self.command_tx.clone()
    }

    /// Apply every queued command. Returns how many were applied.
    ///
    /// A failing command is logged and skipped.
    pub fn drain_commands(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(command) = self.command_rx.try_recv() {
            let is_reset = command == Command::Reset;
            if let Err(e) = self.pipeline.apply(command) {
                warn!("Command failed: {e:#}");
                continue;
            }
            if is_reset {
                self.shared.clear();
            }
            applied += 1;
        }
        applied
    }

    /// Apply pending commands, process one frame and publish the result.
    pub fn process_frame(&mut self, frame: &T::Frame) -> FrameResult {
        self.drain_commands();
        let result = self.pipeline.process_frame(frame);
        self.shared
            .publish(self.snapshot(&result), result.is_keyframe());
        result
    }

    pub fn pipeline(&self) -> &FramePipeline<T, B> {
        &self.pipeline
    }

    pub fn shared_state(&self) -> &Arc<SharedState> {
        &self.shared
    }

    /// Keyframe poses of the current run.
    pub fn trajectory(&self) -> Vec<SE3> {
        self.pipeline.graph().trajectory()
    }

    pub fn write_trajectory(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        write_trajectory(path, &self.trajectory())
    }

    fn snapshot(&self, result: &FrameResult) -> MapSnapshot {
        let graph = self.pipeline.graph();
        let tracks = self
            .pipeline
            .current_tracks()
            .iter()
            .filter_map(|&id| graph.tracks().get(id))
            .map(|track| TrackOverlay {
                id: track.id,
                kp: track
                    .last_observations()
                    .and_then(|obs| obs.get(track.ref_cam_id))
                    .filter(|obs| obs.tracked)
                    .map(|obs| obs.kp),
                tracked: track.tracked,
                is_outlier: track.is_outlier,
                length: track.len(),
            })
            .collect();

        MapSnapshot {
            poses: graph.trajectory(),
            current_pose: result.pose,
            tracks,
            state: result.state,
            num_successful_tracks: result.num_successful_tracks,
        }
    }
}
