//! The pose-engine capability consumed by the detector.
//!
//! The engine is an opaque, stateful component: it is fed one square image
//! at a time and then queried per person slot and per joint. How it is
//! hosted (in-process binding, subprocess, RPC) is up to the implementor.

use std::path::{Path, PathBuf};

use log::info;
use nalgebra::{Matrix3, Point2, Vector3};
use serde::{Deserialize, Serialize};
use skel3d_core::RgbImageView;

/// Display colour an engine assigns to a person slot, as RGBA.
///
/// Engines that only report RGB get an opaque alpha. Serialized as a 3- or
/// 4-element array; always written back with 4 channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct PersonColour(pub [u8; 4]);

impl PersonColour {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, u8::MAX])
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    #[inline]
    pub fn channels(&self) -> [u8; 4] {
        self.0
    }

    /// Colour channels without alpha.
    #[inline]
    pub fn to_rgb(&self) -> [u8; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    #[inline]
    pub fn alpha(&self) -> u8 {
        self.0[3]
    }
}

impl From<[u8; 3]> for PersonColour {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::rgb(r, g, b)
    }
}

impl From<[u8; 4]> for PersonColour {
    fn from(rgba: [u8; 4]) -> Self {
        Self(rgba)
    }
}

impl TryFrom<Vec<u8>> for PersonColour {
    type Error = String;

    fn try_from(channels: Vec<u8>) -> Result<Self, Self::Error> {
        match channels.as_slice() {
            &[r, g, b] => Ok(Self::rgb(r, g, b)),
            &[r, g, b, a] => Ok(Self::rgba(r, g, b, a)),
            other => Err(format!(
                "person colour needs 3 or 4 channels, got {}",
                other.len()
            )),
        }
    }
}

impl From<PersonColour> for Vec<u8> {
    fn from(colour: PersonColour) -> Self {
        colour.0.to_vec()
    }
}

/// Errors reported by a pose engine.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("engine inference failed: {0}")]
    Inference(String),
    #[error("engine is not responding")]
    Unresponsive,
    #[error("no frame has been processed yet")]
    NoFrame,
    #[error("engine input must be {expected}x{expected}, got {width}x{height}")]
    InputSize {
        expected: usize,
        width: usize,
        height: usize,
    },
    #[error("person slot {slot} out of range (capacity {capacity})")]
    SlotOutOfRange { slot: usize, capacity: usize },
    #[error("joint {joint} out of range ({count} joints)")]
    JointOutOfRange { joint: usize, count: usize },
    #[error("invalid engine output: {what} (slot {slot:?}, joint {joint:?})")]
    InvalidOutput {
        what: &'static str,
        slot: Option<usize>,
        joint: Option<usize>,
    },
    #[error("cannot use engine working directory {}: {source}", .path.display())]
    WorkingDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid engine recording: {0}")]
    InvalidRecording(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Operations the detector needs from a 3D pose engine.
///
/// Positions are millimetres in the engine's own axis convention; 2D
/// projections are in the engine's fixed output resolution. Person slots
/// are a fixed-capacity array reused every frame: slot `i` carries no
/// identity across frames.
pub trait PoseEngine {
    /// Run inference on a square image of the engine's input resolution.
    fn process_image(&mut self, image: &RgbImageView<'_>) -> Result<(), EngineError>;

    /// Fixed number of person slots.
    fn num_people(&self) -> usize;

    fn is_person_active(&self, slot: usize) -> Result<bool, EngineError>;

    /// Total joint count, including trailing joints the detector may skip.
    fn num_joints(&self) -> usize;

    fn joint_position(&self, slot: usize, joint: usize) -> Result<Vector3<f64>, EngineError>;

    /// Parent joint index, `None` for the root.
    fn joint_parent(&self, joint: usize) -> Result<Option<usize>, EngineError>;

    /// Per-slot display colour; RGB-only engines report opaque alpha.
    fn person_colour(&self, slot: usize) -> Result<PersonColour, EngineError>;

    /// Project an engine-space point with the engine's camera intrinsics.
    fn project(&self, p_mm: &Vector3<f64>) -> Result<Point2<f64>, EngineError>;

    fn skeleton_global_rotation(&self, slot: usize) -> Result<Matrix3<f64>, EngineError>;

    fn joint_local_rotation(&self, slot: usize, joint: usize)
        -> Result<Matrix3<f64>, EngineError>;

    /// Re-initialise per-session engine state.
    fn restart(&mut self) -> Result<(), EngineError>;
}

impl<E: PoseEngine + ?Sized> PoseEngine for Box<E> {
    fn process_image(&mut self, image: &RgbImageView<'_>) -> Result<(), EngineError> {
        (**self).process_image(image)
    }

    fn num_people(&self) -> usize {
        (**self).num_people()
    }

    fn is_person_active(&self, slot: usize) -> Result<bool, EngineError> {
        (**self).is_person_active(slot)
    }

    fn num_joints(&self) -> usize {
        (**self).num_joints()
    }

    fn joint_position(&self, slot: usize, joint: usize) -> Result<Vector3<f64>, EngineError> {
        (**self).joint_position(slot, joint)
    }

    fn joint_parent(&self, joint: usize) -> Result<Option<usize>, EngineError> {
        (**self).joint_parent(joint)
    }

    fn person_colour(&self, slot: usize) -> Result<PersonColour, EngineError> {
        (**self).person_colour(slot)
    }

    fn project(&self, p_mm: &Vector3<f64>) -> Result<Point2<f64>, EngineError> {
        (**self).project(p_mm)
    }

    fn skeleton_global_rotation(&self, slot: usize) -> Result<Matrix3<f64>, EngineError> {
        (**self).skeleton_global_rotation(slot)
    }

    fn joint_local_rotation(
        &self,
        slot: usize,
        joint: usize,
    ) -> Result<Matrix3<f64>, EngineError> {
        (**self).joint_local_rotation(slot, joint)
    }

    fn restart(&mut self) -> Result<(), EngineError> {
        (**self).restart()
    }
}

/// Construct an engine whose initialisation resolves data files relative to
/// the current working directory.
///
/// Changes into `dir`, runs `ctor`, then restores the previous directory.
/// The process working directory is global: call this once, before any
/// detection and before spawning threads that depend on relative paths.
pub fn construct_in_dir<E, F>(dir: impl AsRef<Path>, ctor: F) -> Result<E, EngineError>
where
    F: FnOnce() -> Result<E, EngineError>,
{
    let dir = dir.as_ref();
    let previous = std::env::current_dir()?;
    std::env::set_current_dir(dir).map_err(|source| EngineError::WorkingDir {
        path: dir.to_path_buf(),
        source,
    })?;
    info!("constructing pose engine in {}", dir.display());

    let engine = ctor();

    std::env::set_current_dir(&previous).map_err(|source| EngineError::WorkingDir {
        path: previous.clone(),
        source,
    })?;
    engine
}
