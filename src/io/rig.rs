//! Calibration rig loading.
//!
//! A rig file lists the cameras in rig order:
//!
//! ```yaml
//! cameras:
//!   - intrinsics: [458.654, 457.296, 367.215, 248.375]  # fx, fy, cx, cy
//!     resolution: [752, 480]
//!     T_PC:                                              # optional, row-major
//!       data: [1.0, 0.0, 0.0, 0.0,
//!              0.0, 1.0, 0.0, 0.0,
//!              0.0, 0.0, 1.0, 0.0,
//!              0.0, 0.0, 0.0, 1.0]
//! ```

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use nalgebra::Matrix4;
use serde::Deserialize;

use crate::camera::{Camera, PinholeIntrinsics, Rig};
use crate::geometry::SE3;

#[derive(Debug, Deserialize)]
struct TransformYaml {
    data: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct CameraYaml {
    /// [fx, fy, cx, cy]
    intrinsics: Vec<f64>,
    /// [width, height]
    resolution: Vec<u32>,
    #[serde(rename = "T_PC", default)]
    t_pc: Option<TransformYaml>,
}

#[derive(Debug, Deserialize)]
struct RigYaml {
    cameras: Vec<CameraYaml>,
}

pub fn load_rig<P: AsRef<Path>>(path: P) -> Result<Rig> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let rig: RigYaml =
        serde_yaml::from_reader(file).with_context(|| format!("Failed to parse rig {:?}", path))?;
    rig_from_yaml(rig)
}

pub fn parse_rig(yaml: &str) -> Result<Rig> {
    let rig: RigYaml = serde_yaml::from_str(yaml).context("Failed to parse rig")?;
    rig_from_yaml(rig)
}

fn rig_from_yaml(rig: RigYaml) -> Result<Rig> {
    if rig.cameras.is_empty() {
        bail!("Rig has no cameras");
    }
    let cameras = rig
        .cameras
        .iter()
        .enumerate()
        .map(|(cam_id, cam)| {
            camera_from_yaml(cam).with_context(|| format!("Invalid camera {}", cam_id))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Rig::new(cameras))
}

fn camera_from_yaml(cam: &CameraYaml) -> Result<Camera> {
    let intrinsics = intrinsics_from(&cam.intrinsics)?;
    let [width, height] = cam.resolution[..] else {
        bail!(
            "Expected resolution [width, height], got {} values",
            cam.resolution.len()
        );
    };
    let t_pc = match &cam.t_pc {
        Some(t) => transform_from(&t.data)?,
        None => SE3::identity(),
    };
    Ok(Camera::new(intrinsics, width, height, t_pc))
}

fn intrinsics_from(intrinsics: &[f64]) -> Result<PinholeIntrinsics> {
    let [fx, fy, cx, cy] = intrinsics[..] else {
        bail!(
            "Expected 4 intrinsics [fx, fy, cx, cy], got {}",
            intrinsics.len()
        );
    };
    if fx <= 0.0 || fy <= 0.0 {
        bail!("Focal lengths must be positive (fx={fx}, fy={fy})");
    }
    Ok(PinholeIntrinsics { fx, fy, cx, cy })
}

fn transform_from(data: &[f64]) -> Result<SE3> {
    if data.len() != 16 {
        bail!("Expected 16 elements for transform, got {}", data.len());
    }
    let mat = Matrix4::from_row_slice(data);
    Ok(SE3::from_matrix(mat))
}
