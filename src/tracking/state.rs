//! Per-frame tracking state.

/// Outcome of tracking for the most recent frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingState {
    /// No frame processed since start or the last reset.
    #[default]
    NotInitialized,
    /// Enough tracks succeeded.
    Ok,
    /// Too few tracks succeeded; the pose fell back to the motion guess.
    Lost,
}
