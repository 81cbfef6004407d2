//! File formats: calibration rig in, trajectory out.

pub mod rig;
pub mod trajectory;

pub use rig::{load_rig, parse_rig};
pub use trajectory::{euler_angles, write_trajectory};
