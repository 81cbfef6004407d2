//! System orchestration: command queue, shared snapshot and the top-level
//! `VoSystem` driving the frame pipeline.

pub mod messages;
pub mod shared_state;
mod vo_system;

pub use messages::Command;
pub use shared_state::{MapSnapshot, SharedState, TrackOverlay};
pub use vo_system::VoSystem;
