use skel3d_core::{ConventionError, GeometryError};

use crate::engine::EngineError;
use crate::topology::TopologyError;

/// Errors returned by the skeleton detector.
///
/// Engine failures are passed through untouched so callers can tell "no
/// people" (an empty, successful detection) from "the engine is broken".
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("image buffer of {len} bytes does not hold a {width}x{height} RGB8 image")]
    InvalidImage {
        width: usize,
        height: usize,
        len: usize,
    },
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error("engine rotation for slot {slot} (joint {joint:?}) is not a proper rotation: {source}")]
    InvalidRotation {
        slot: usize,
        joint: Option<usize>,
        #[source]
        source: ConventionError,
    },
}
