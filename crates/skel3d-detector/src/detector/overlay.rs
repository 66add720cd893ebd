use std::ops::Range;

use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use skel3d_core::{Letterbox, RgbImage};

use super::DetectError;
use crate::engine::{PersonColour, PoseEngine};
use crate::topology::JointTopology;

/// A projected joint in original-image pixel coordinates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayJoint {
    pub joint: usize,
    pub name: String,
    pub pixel: Point2<i32>,
}

/// A bone from a joint to its engine parent, in original-image pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayBone {
    pub joint: usize,
    pub parent: usize,
    pub from: Point2<i32>,
    pub to: Point2<i32>,
}

/// Overlay primitives for one active person slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonOverlay {
    pub slot: usize,
    pub colour: PersonColour,
    pub joints: Vec<OverlayJoint>,
    pub bones: Vec<OverlayBone>,
}

/// Visualisation output: an untouched copy of the input image plus the
/// primitives a renderer needs to draw every detected person on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Overlay {
    pub image: RgbImage,
    pub people: Vec<PersonOverlay>,
}

impl Overlay {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            people: Vec::new(),
        }
    }
}

// Only lower bounds are checked; coordinates past the right or bottom edge
// still count as drawable.
#[inline]
fn is_drawable(p: Point2<i32>) -> bool {
    p.x > 0 && p.y > 0
}

fn joint_pixel<E: PoseEngine + ?Sized>(
    engine: &E,
    slot: usize,
    joint: usize,
    letterbox: &Letterbox,
) -> Result<Point2<i32>, DetectError> {
    let p_mm = engine.joint_position(slot, joint)?;
    let projected = engine.project(&p_mm)?;
    Ok(letterbox.output_to_pixel(projected))
}

/// Project the joints of one slot into the original image.
///
/// Every joint in `joints` is listed. A bone `(joint, parent)` is kept only
/// when both endpoints have strictly positive coordinates.
pub fn person_overlay<E: PoseEngine + ?Sized>(
    engine: &E,
    slot: usize,
    topology: &JointTopology,
    joints: Range<usize>,
    letterbox: &Letterbox,
) -> Result<PersonOverlay, DetectError> {
    let colour = engine.person_colour(slot)?;

    let mut overlay_joints = Vec::with_capacity(joints.len());
    for joint in joints.clone() {
        overlay_joints.push(OverlayJoint {
            joint,
            name: topology.name(joint).unwrap_or_default().to_string(),
            pixel: joint_pixel(engine, slot, joint, letterbox)?,
        });
    }

    let mut bones = Vec::new();
    let mut skipped = 0usize;
    for (k, joint) in joints.enumerate() {
        let Some(parent) = engine.joint_parent(joint)? else {
            continue;
        };
        let from = overlay_joints[k].pixel;
        let to = match overlay_joints.iter().find(|j| j.joint == parent) {
            Some(j) => j.pixel,
            None => joint_pixel(engine, slot, parent, letterbox)?,
        };
        if !is_drawable(from) || !is_drawable(to) {
            skipped += 1;
            continue;
        }
        bones.push(OverlayBone {
            joint,
            parent,
            from,
            to,
        });
    }
    if skipped > 0 {
        debug!("slot {slot}: skipped {skipped} bone(s) with non-positive endpoints");
    }

    Ok(PersonOverlay {
        slot,
        colour,
        joints: overlay_joints,
        bones,
    })
}
