//! Trajectory export.
//!
//! One CSV row per pose: `tx,ty,tz,roll,pitch,yaw`, angles in radians
//! (roll about x, pitch about y, yaw about z).

use std::path::Path;

use anyhow::{Context, Result};
use csv::WriterBuilder;
use nalgebra::Matrix3;
use tracing::info;

use crate::geometry::SE3;

/// Roll, pitch and yaw of a rotation matrix (ZYX convention).
pub fn euler_angles(r: &Matrix3<f64>) -> (f64, f64, f64) {
    let roll = r[(2, 1)].atan2(r[(2, 2)]);
    let pitch = -r[(2, 0)].clamp(-1.0, 1.0).asin();
    let yaw = r[(1, 0)].atan2(r[(0, 0)]);
    (roll, pitch, yaw)
}

pub fn write_trajectory<P: AsRef<Path>>(path: P, poses: &[SE3]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    for pose in poses {
        let t = pose.translation;
        let (roll, pitch, yaw) = euler_angles(&pose.rotation_matrix());
        writer.serialize((t.x, t.y, t.z, roll, pitch, yaw))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(poses = poses.len(), path = %path.display(), "Wrote trajectory");
    Ok(())
}
