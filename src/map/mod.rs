//! Pose/track store.
//!
//! This module contains:
//! - [`TrackerPose`] - keyframe poses with the tracks started at them
//! - [`Track`] - features followed across keyframes, anchored by inverse depth
//! - [`PoseGraph`] - the ordered pose sequence owning the [`TrackTable`]
//!
//! # Architecture
//!
//! Poses refer to the tracks they originate by [`TrackId`]; the track data
//! lives in the graph's [`TrackTable`]. The feature tracker borrows the table
//! mutably for the duration of each call and otherwise only keeps ids, so the
//! pipeline remains the single writer of the store.

pub mod pose;
pub mod pose_graph;
pub mod track;
pub mod types;

pub use pose::TrackerPose;
pub use pose_graph::PoseGraph;
pub use track::{Observation, ReferenceKeypoint, Track, TrackTable};
pub use types::{PoseId, TrackId};
