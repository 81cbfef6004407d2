use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vtracker::config::PipelineConfig;
use vtracker::io::load_rig;
use vtracker::optimizer::IdentityAdjuster;
use vtracker::simulation::{SyntheticScene, SyntheticTracker};
use vtracker::system::VoSystem;
use vtracker::tracking::TrackingState;

/// Run the visual odometry pipeline over a synthetic forward-motion scene.
#[derive(Parser, Debug)]
#[command(name = "vtracker", about = "Keyframe-based visual odometry over a synthetic scene")]
struct Cli {
    /// Pipeline config (YAML). Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Camera rig (YAML). A monocular VGA pinhole is used when omitted.
    #[arg(long)]
    rig: Option<PathBuf>,
    #[arg(long, default_value_t = 120)]
    frames: usize,
    /// Distance travelled per frame.
    #[arg(long, default_value_t = 0.05)]
    step: f64,
    /// Yaw per frame in radians.
    #[arg(long, default_value_t = 0.002)]
    yaw_rate: f64,
    #[arg(long, default_value_t = 800)]
    points: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Inverse depth of newly started landmarks.
    #[arg(long, default_value_t = 0.2)]
    initial_rho: f64,
    /// Write the keyframe trajectory here (CSV: tx,ty,tz,roll,pitch,yaw).
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_yaml_file(path)?,
        None => PipelineConfig::default(),
    };

    let mut scene = SyntheticScene::forward(cli.frames, cli.step, cli.yaw_rate, cli.points, cli.seed);
    if let Some(path) = &cli.rig {
        scene.rig = load_rig(path)?;
    }
    info!(
        frames = scene.len(),
        points = scene.points.len(),
        cameras = scene.rig.len(),
        "Generated synthetic scene"
    );

    let rig = scene.rig.clone();
    let tracker = SyntheticTracker::new(scene, config.num_features, cli.initial_rho);
    let mut system = VoSystem::new(config, rig, tracker, IdentityAdjuster::new())
        .context("Failed to set up pipeline")?;

    let mut keyframes = 0;
    let mut lost = 0;
    for frame in 0..cli.frames {
        let result = system.process_frame(&frame);
        if result.is_keyframe() {
            keyframes += 1;
        }
        if result.state == TrackingState::Lost {
            lost += 1;
        }
    }

    let snapshot = system.shared_state().snapshot();
    info!(
        frames = cli.frames,
        keyframes,
        lost,
        poses = snapshot.poses.len(),
        tracks = snapshot.tracks.len(),
        "Finished"
    );

    if let Some(path) = cli.output {
        system.write_trajectory(&path)?;
    }

    Ok(())
}
