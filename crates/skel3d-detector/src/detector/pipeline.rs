use log::{debug, info};
use nalgebra::Isometry3;
use skel3d_core::{Letterbox, RgbImageView};

#[cfg(feature = "tracing")]
use tracing::instrument;

use super::extract::{extract_person, extractable_joints};
use super::overlay::{person_overlay, Overlay};
use super::{DetectError, DetectOptions, Detection, DetectorParams};
use crate::engine::PoseEngine;
use crate::topology::JointTopology;

/// Multi-person 3D skeleton detector over an owned pose engine.
///
/// The detector owns the engine for its whole lifetime. `detect` takes
/// `&mut self`, so at most one frame is ever in flight per engine: the
/// detector is "processing" exactly while that borrow is held and idle
/// otherwise, on success and on failure alike. Share a detector across
/// threads behind a `Mutex` if needed.
pub struct SkeletonDetector<E> {
    engine: E,
    params: DetectorParams,
    topology: JointTopology,
}

impl<E: PoseEngine> SkeletonDetector<E> {
    /// Create a detector with the built-in 21-joint topology.
    pub fn new(engine: E, params: DetectorParams) -> Result<Self, DetectError> {
        Self::with_topology(engine, params, JointTopology::default())
    }

    /// Create a detector with a custom joint table.
    pub fn with_topology(
        engine: E,
        params: DetectorParams,
        topology: JointTopology,
    ) -> Result<Self, DetectError> {
        if params.validate_topology {
            topology.validate_against(&engine)?;
        }
        info!(
            "skeleton detector ready: {} person slots, {} joints ({} extracted), input {}px",
            engine.num_people(),
            engine.num_joints(),
            extractable_joints(engine.num_joints(), params.excluded_trailing_joints).len(),
            params.input_size
        );
        Ok(Self {
            engine,
            params,
            topology,
        })
    }

    #[inline]
    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    #[inline]
    pub fn topology(&self) -> &JointTopology {
        &self.topology
    }

    #[inline]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    #[inline]
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Re-initialise the engine, e.g. after a client reconnects.
    pub fn restart(&mut self) -> Result<(), DetectError> {
        info!("restarting pose engine");
        self.engine.restart()?;
        Ok(())
    }

    /// Detect every person in `image` and express their skeletons in the
    /// world frame given by `world_from_camera`.
    ///
    /// Blocks until the engine has processed the frame. Engine failures are
    /// returned as errors, never as an empty detection.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, image, world_from_camera),
            fields(width = image.width, height = image.height)
        )
    )]
    pub fn detect(
        &mut self,
        image: &RgbImageView<'_>,
        world_from_camera: &Isometry3<f64>,
        options: DetectOptions,
    ) -> Result<Detection, DetectError> {
        if !image.is_consistent() {
            return Err(DetectError::InvalidImage {
                width: image.width,
                height: image.height,
                len: image.data.len(),
            });
        }
        let letterbox = Letterbox::new(
            image.width,
            image.height,
            self.params.input_size,
            self.params.output_resolution,
        )?;
        let input = letterbox.prepare_input(image);

        self.run(image, &input.view(), &letterbox, world_from_camera, options)
    }

    fn run(
        &mut self,
        image: &RgbImageView<'_>,
        input: &RgbImageView<'_>,
        letterbox: &Letterbox,
        world_from_camera: &Isometry3<f64>,
        options: DetectOptions,
    ) -> Result<Detection, DetectError> {
        self.engine.process_image(input)?;

        let joints = extractable_joints(
            self.engine.num_joints(),
            self.params.excluded_trailing_joints,
        );
        let mut skeletons = Vec::new();
        let mut overlay = options.visualize.then(|| Overlay::new(image.to_owned_image()));

        for slot in 0..self.engine.num_people() {
            if !self.engine.is_person_active(slot)? {
                continue;
            }
            skeletons.push(extract_person(
                &self.engine,
                slot,
                &self.topology,
                joints.clone(),
                world_from_camera,
                options.use_engine_poses,
            )?);
            if let Some(overlay) = overlay.as_mut() {
                overlay.people.push(person_overlay(
                    &self.engine,
                    slot,
                    &self.topology,
                    joints.clone(),
                    letterbox,
                )?);
            }
        }

        debug!(
            "detected {} skeleton(s) in {}x{} image",
            skeletons.len(),
            image.width,
            image.height
        );
        Ok(Detection { skeletons, overlay })
    }
}
