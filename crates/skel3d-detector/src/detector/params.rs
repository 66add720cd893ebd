use serde::{Deserialize, Serialize};

/// Configuration for the skeleton detector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Side of the square image fed to the engine.
    pub input_size: usize,
    /// Side of the square space the engine reports 2D projections in.
    ///
    /// The engine downsamples internally, so this is usually half of
    /// `input_size`.
    pub output_resolution: usize,
    /// Number of trailing engine joints never extracted (the feet by
    /// default, which the engine estimates poorly).
    pub excluded_trailing_joints: usize,
    /// Check the joint table against the engine at construction.
    pub validate_topology: bool,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            input_size: 2048,
            output_resolution: 1024,
            excluded_trailing_joints: 2,
            validate_topology: true,
        }
    }
}

/// Per-call detection options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectOptions {
    /// Build overlay data mapped back to original-image pixels.
    pub visualize: bool,
    /// Fill local rotations and the root global pose from the engine.
    pub use_engine_poses: bool,
}
