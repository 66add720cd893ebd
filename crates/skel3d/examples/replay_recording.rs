//! Run the detector on one image against a recorded engine session and
//! write a JSON report of the resulting world-frame skeletons.
//!
//! Usage: `replay_recording [config.json]`

use std::{env, fs, path::PathBuf};

use image::ImageReader;
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use skel3d::core::Skeleton;
use skel3d::detect;
use skel3d::detector::{
    DetectOptions, DetectorParams, JointTopology, PersonOverlay, RecordedEngine, SkeletonDetector,
};

#[cfg(not(feature = "tracing"))]
use log::{info, warn, LevelFilter};

#[cfg(feature = "tracing")]
use tracing::{info, warn};
#[cfg(feature = "tracing")]
use tracing_log::LogTracer;

#[cfg(feature = "tracing")]
use skel3d::core::init_tracing;
#[cfg(not(feature = "tracing"))]
use skel3d::core::init_from_env;

#[derive(Debug, Deserialize)]
struct ExampleConfig {
    image_path: String,
    recording_path: String,
    #[serde(default)]
    topology_path: Option<String>,
    #[serde(default)]
    output_path: Option<String>,
    /// Row-major 4x4 camera-to-world transform.
    #[serde(default = "identity_pose")]
    world_from_camera: [[f64; 4]; 4],
    #[serde(default)]
    params: DetectorParams,
    #[serde(default)]
    options: DetectOptions,
}

fn identity_pose() -> [[f64; 4]; 4] {
    [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

#[derive(Debug, Serialize)]
struct ExampleReport {
    image_path: String,
    config_path: String,
    image_size: [u32; 2],
    skeletons: Vec<Skeleton>,
    overlay: Option<Vec<PersonOverlay>>,
    error: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(not(feature = "tracing"))]
    init_from_env(LevelFilter::Info)?;

    #[cfg(feature = "tracing")]
    {
        // Forward `log` records from the library crates into the subscriber.
        let _ = LogTracer::init();
        init_tracing(false);
    }

    run()
}

#[cfg_attr(feature = "tracing", tracing::instrument(level = "info"))]
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = parse_config_path();
    let cfg = load_config(&config_path)?;

    let img = ImageReader::open(&cfg.image_path)?.decode()?.to_rgb8();
    info!("loaded {} ({}x{})", cfg.image_path, img.width(), img.height());

    let engine = RecordedEngine::from_path(&cfg.recording_path)?;
    let topology = match &cfg.topology_path {
        Some(path) => serde_json::from_str::<JointTopology>(&fs::read_to_string(path)?)?,
        None => JointTopology::default(),
    };
    let mut detector = SkeletonDetector::with_topology(engine, cfg.params.clone(), topology)?;

    let world_from_camera = Matrix4::from_fn(|r, c| cfg.world_from_camera[r][c]);
    let result = detect::detect_skeletons(&mut detector, &img, &world_from_camera, cfg.options);

    let report = match result {
        Ok(detection) => {
            if detection.is_empty() {
                warn!("no people detected");
            }
            ExampleReport {
                image_path: cfg.image_path.clone(),
                config_path: config_path.to_string_lossy().into_owned(),
                image_size: [img.width(), img.height()],
                skeletons: detection.skeletons,
                overlay: detection.overlay.map(|o| o.people),
                error: None,
            }
        }
        Err(err) => {
            warn!("detection failed: {err}");
            ExampleReport {
                image_path: cfg.image_path.clone(),
                config_path: config_path.to_string_lossy().into_owned(),
                image_size: [img.width(), img.height()],
                skeletons: Vec::new(),
                overlay: None,
                error: Some(err.to_string()),
            }
        }
    };

    write_report(cfg.output_path.as_deref(), report)
}

fn parse_config_path() -> PathBuf {
    env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("testdata/replay_config.json"))
}

#[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip(path)))]
fn load_config(path: &PathBuf) -> Result<ExampleConfig, Box<dyn std::error::Error>> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_report(
    path: Option<&str>,
    report: ExampleReport,
) -> Result<(), Box<dyn std::error::Error>> {
    let out_path = path
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tmpdata/replay_report.json"));
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&report)?;
    fs::write(&out_path, json)?;
    println!("wrote report JSON to {}", out_path.display());
    Ok(())
}
