//! Core geometry for monocular multi-person 3D skeleton extraction.
//!
//! This crate is purely geometric. It does *not* know about any pose engine
//! and does not depend on a concrete image crate:
//! - [`convention`]: engine axis/unit conventions to world-frame conversions,
//! - [`letterbox`]: centred square cropping and the inverse 2D mapping,
//! - [`skeleton`]: named keypoints, bone topology and skeleton assembly,
//! - a small RGB image view with bilinear resampling.

pub mod convention;
mod image;
pub mod letterbox;
mod logger;
pub mod skeleton;

pub use convention::{
    camera_root_rotation_to_engine, engine_local_rotation_to_world,
    engine_position_to_world, engine_root_rotation_to_camera, engine_rotation, engine_to_camera,
    rigid_from_matrix, root_axis_flip, rotation_from_matrix, ConventionError,
    ENGINE_ROTATION_TOLERANCE, RIGID_TOLERANCE,
};
pub use image::{resample_square, sample_bilinear_rgb, RgbImage, RgbImageView};
pub use letterbox::{GeometryError, Letterbox, SquareCrop};
pub use skeleton::{BonePair, Keypoint, Skeleton, SkeletonBuilder};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level, LOG_ENV_VAR};
