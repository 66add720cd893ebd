//! High-level facade for the `skel3d-*` workspace.
//!
//! This crate provides:
//! - stable re-exports of the geometry core and the detector,
//! - (feature-gated) end-to-end helpers that take an `image::RgbImage` or a
//!   raw RGB buffer plus a 4x4 camera-to-world matrix and return skeletons.
//!
//! ## Quickstart
//!
//! ```no_run
//! use skel3d::detect;
//! use skel3d::detector::{DetectOptions, DetectorParams, RecordedEngine, SkeletonDetector};
//! use image::ImageReader;
//! use nalgebra::Matrix4;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = ImageReader::open("frame.png")?.decode()?.to_rgb8();
//! let engine = RecordedEngine::from_path("recording.json")?;
//! let mut detector = SkeletonDetector::new(engine, DetectorParams::default())?;
//!
//! let result = detect::detect_skeletons(
//!     &mut detector,
//!     &img,
//!     &Matrix4::identity(),
//!     DetectOptions::default(),
//! )?;
//! println!("detected {} skeleton(s)", result.skeletons.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `skel3d::core`: conventions, letterboxing, skeleton types, logging.
//! - `skel3d::detector`: the engine trait, joint topology, the detector and
//!   the recorded-output replay engine.
//! - `skel3d::detect` (feature `image`): end-to-end helpers from `image::RgbImage`.

pub use skel3d_core as core;
pub use skel3d_detector as detector;

pub use skel3d_core::{Keypoint, Skeleton};
pub use skel3d_detector::{
    DetectOptions, Detection, DetectorParams, PoseEngine, RecordedEngine, SkeletonDetector,
};

#[cfg(feature = "image")]
pub mod detect;
