//! Multi-person 3D skeleton detection on top of an opaque pose engine.
//!
//! The crate drives a [`PoseEngine`] (anything that turns a square RGB image
//! into per-person 3D joint positions and rotations) and converts its raw
//! output into world-frame [`skel3d_core::Skeleton`]s.
//!
//! ## Quickstart
//!
//! ```no_run
//! use nalgebra::Isometry3;
//! use skel3d_core::RgbImage;
//! use skel3d_detector::{DetectOptions, DetectorParams, RecordedEngine, SkeletonDetector};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = RecordedEngine::from_path("recording.json")?;
//! let mut detector = SkeletonDetector::new(engine, DetectorParams::default())?;
//!
//! let image = RgbImage::new(640, 480);
//! let detection = detector.detect(&image.view(), &Isometry3::identity(), DetectOptions::default())?;
//! println!("found {} skeleton(s)", detection.skeletons.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//! - [`engine`]: the engine capability trait and working-directory construction.
//! - [`topology`]: joint names, parent tree and bone pairs.
//! - [`replay`]: an engine replaying recorded output from JSON.

mod detector;
pub mod engine;
pub mod replay;
pub mod topology;

pub use detector::{
    extract_person, extractable_joints, person_overlay, DetectError, DetectOptions, Detection,
    DetectorParams, Overlay, OverlayBone, OverlayJoint, PersonOverlay, SkeletonDetector,
};
pub use engine::{construct_in_dir, EngineError, PersonColour, PoseEngine};
pub use replay::{
    EngineRecording, PinholeIntrinsics, RecordedEngine, RecordedFrame, RecordedPerson,
};
pub use topology::{JointSpec, JointTopology, TopologyError, MID_HIP};
