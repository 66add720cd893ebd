//! Detection pipeline.
//!
//! This module wires together detector-input letterboxing, one engine pass,
//! per-slot skeleton extraction and optional overlay projection.

mod error;
mod extract;
mod overlay;
mod params;
mod pipeline;
mod result;

pub use error::DetectError;
pub use extract::{extract_person, extractable_joints};
pub use overlay::{person_overlay, Overlay, OverlayBone, OverlayJoint, PersonOverlay};
pub use params::{DetectOptions, DetectorParams};
pub use pipeline::SkeletonDetector;
pub use result::Detection;
