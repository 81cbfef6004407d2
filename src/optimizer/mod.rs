//! Optimization module for windowed Bundle Adjustment.
//!
//! - `adjuster`: the seam to the external least-squares engine
//! - `window`: which trailing poses are free and which anchor
//! - `windowed_ba`: building, solving and reading back one pass

pub mod adjuster;
pub mod window;
pub mod windowed_ba;

pub use adjuster::{BaOptions, BundleAdjuster, IdentityAdjuster, LandmarkEntry};
pub use window::BaWindow;
pub use windowed_ba::{
    windowed_bundle_adjustment, BaRequest, BaSummary, OutlierPolicy, RunIndex,
};
