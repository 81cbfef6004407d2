//! Tracking: the per-frame pipeline and the policies it composes.
//!
//! - Motion guess for the external feature tracker
//! - Tracking-failure fallback and current pose chaining
//! - Keyframe decision
//! - Keyframe-triggered windowed bundle adjustment and landmark initiation

pub mod feature_tracker;
pub mod keyframe_decision;
pub mod motion_model;
pub mod pipeline;
pub mod result;
pub mod state;

pub use feature_tracker::{FeatureTracker, RefineOptions};
pub use keyframe_decision::{KeyframeDecision, KeyframePolicy};
pub use motion_model::MotionModel;
pub use pipeline::FramePipeline;
pub use result::{FrameResult, TimingStats};
pub use state::TrackingState;
