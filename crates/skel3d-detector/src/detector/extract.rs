use std::ops::Range;

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use skel3d_core::{
    engine_local_rotation_to_world, engine_root_rotation_to_camera, engine_rotation,
    engine_to_camera, Keypoint, Skeleton, SkeletonBuilder,
};

use super::DetectError;
use crate::engine::{EngineError, PoseEngine};
use crate::topology::{JointTopology, TopologyError};

/// Joint indices extracted from an engine reporting `num_joints` joints:
/// `0 .. num_joints - excluded_trailing`.
#[inline]
pub fn extractable_joints(num_joints: usize, excluded_trailing: usize) -> Range<usize> {
    0..num_joints.saturating_sub(excluded_trailing)
}

fn finite_position<E: PoseEngine + ?Sized>(
    engine: &E,
    slot: usize,
    joint: usize,
) -> Result<Vector3<f64>, EngineError> {
    let p = engine.joint_position(slot, joint)?;
    if p.iter().all(|v| v.is_finite()) {
        Ok(p)
    } else {
        Err(EngineError::InvalidOutput {
            what: "non-finite joint position",
            slot: Some(slot),
            joint: Some(joint),
        })
    }
}

/// Build the skeleton of one active person slot.
///
/// Positions are converted into the world frame through `world_from_camera`.
/// With `use_engine_poses`, every keypoint also carries the engine's local
/// rotation and the root keypoint gets a world-frame global pose; otherwise
/// no orientation data is queried at all. Engine rotations are projected onto
/// the nearest proper rotation before conversion.
pub fn extract_person<E: PoseEngine + ?Sized>(
    engine: &E,
    slot: usize,
    topology: &JointTopology,
    joints: Range<usize>,
    world_from_camera: &Isometry3<f64>,
    use_engine_poses: bool,
) -> Result<Skeleton, DetectError> {
    let mut builder = SkeletonBuilder::new();

    for joint in joints {
        let name = topology
            .name(joint)
            .ok_or(TopologyError::JointCountMismatch {
                table: topology.len(),
                engine: engine.num_joints(),
            })?;
        let p_mm = finite_position(engine, slot, joint)?;
        let mut keypoint = Keypoint::new(name, world_from_camera * engine_to_camera(&p_mm));

        if use_engine_poses {
            let local = engine_rotation(&engine.joint_local_rotation(slot, joint)?).map_err(
                |source| DetectError::InvalidRotation {
                    slot,
                    joint: Some(joint),
                    source,
                },
            )?;
            keypoint = keypoint.with_local_rotation(engine_local_rotation_to_world(&local));
        }
        builder.keypoint(keypoint);
    }

    if use_engine_poses {
        let root = topology.root();
        let global = engine_rotation(&engine.skeleton_global_rotation(slot)?).map_err(
            |source| DetectError::InvalidRotation {
                slot,
                joint: None,
                source,
            },
        )?;
        let rotation = engine_root_rotation_to_camera(&global);
        let root_cam = engine_to_camera(&finite_position(engine, slot, root)?);
        let camera_from_root = Isometry3::from_parts(
            Translation3::from(root_cam.coords),
            UnitQuaternion::from_rotation_matrix(&rotation),
        );
        builder.global_pose(topology.root_name(), world_from_camera * camera_from_root);
    }

    Ok(builder.build(topology.bones()))
}
