//! A [`PoseEngine`] that replays engine output recorded as JSON.
//!
//! Each call to `process_image` advances to the next recorded frame
//! (wrapping around at the end); `restart` rewinds to the first frame.
//! Useful for offline runs, benchmarks and tests without the native engine.

use std::fs;
use std::path::Path;

use log::info;
use nalgebra::{Matrix3, Point2, Vector3};
use serde::{Deserialize, Serialize};
use skel3d_core::RgbImageView;

use crate::engine::{EngineError, PersonColour, PoseEngine};

/// Pinhole intrinsics in the engine's output resolution.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PinholeIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

/// Row-major 3x3 matrix as stored in recordings.
pub type RowMajor3 = [[f64; 3]; 3];

const IDENTITY: RowMajor3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

fn matrix(rows: &RowMajor3) -> Matrix3<f64> {
    Matrix3::new(
        rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2], rows[2][0],
        rows[2][1], rows[2][2],
    )
}

/// One recorded person slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedPerson {
    pub colour: PersonColour,
    /// Joint positions in millimetres, engine axes, one per joint.
    pub joints_mm: Vec<[f64; 3]>,
    #[serde(default)]
    pub global_rotation: Option<RowMajor3>,
    /// Either empty (identity everywhere) or one matrix per joint.
    #[serde(default)]
    pub local_rotations: Vec<RowMajor3>,
}

/// One recorded frame: `None` marks an inactive slot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub slots: Vec<Option<RecordedPerson>>,
}

/// Full recording: engine constants plus frames.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineRecording {
    pub max_people: usize,
    pub input_size: usize,
    /// Parent index per joint, `-1` for the root.
    pub parents: Vec<i32>,
    pub intrinsics: PinholeIntrinsics,
    pub frames: Vec<RecordedFrame>,
}

impl EngineRecording {
    fn validate(&self) -> Result<(), EngineError> {
        let bad = |msg: String| Err(EngineError::InvalidRecording(msg));
        let n = self.parents.len();
        if self.frames.is_empty() {
            return bad("recording has no frames".into());
        }
        if let Some(p) = self.parents.iter().find(|&&p| p < -1 || p >= n as i32) {
            return bad(format!("parent index {p} out of range for {n} joints"));
        }
        for (f, frame) in self.frames.iter().enumerate() {
            if frame.slots.len() > self.max_people {
                return bad(format!(
                    "frame {f} has {} slots, capacity is {}",
                    frame.slots.len(),
                    self.max_people
                ));
            }
            for (s, person) in frame.slots.iter().enumerate() {
                let Some(person) = person else { continue };
                if person.joints_mm.len() != n {
                    return bad(format!(
                        "frame {f} slot {s}: {} joints, expected {n}",
                        person.joints_mm.len()
                    ));
                }
                if !person.local_rotations.is_empty() && person.local_rotations.len() != n {
                    return bad(format!(
                        "frame {f} slot {s}: {} local rotations, expected {n}",
                        person.local_rotations.len()
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Engine replaying an [`EngineRecording`].
#[derive(Clone, Debug)]
pub struct RecordedEngine {
    recording: EngineRecording,
    current: Option<usize>,
    next: usize,
}

impl RecordedEngine {
    pub fn new(recording: EngineRecording) -> Result<Self, EngineError> {
        recording.validate()?;
        Ok(Self {
            recording,
            current: None,
            next: 0,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        Self::new(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let engine = Self::from_json_str(&fs::read_to_string(path)?)?;
        info!(
            "loaded engine recording {} ({} frames)",
            path.display(),
            engine.recording.frames.len()
        );
        Ok(engine)
    }

    #[inline]
    pub fn recording(&self) -> &EngineRecording {
        &self.recording
    }

    /// Index of the frame served by the latest `process_image`.
    #[inline]
    pub fn current_frame(&self) -> Option<usize> {
        self.current
    }

    fn check_slot(&self, slot: usize) -> Result<(), EngineError> {
        if slot >= self.recording.max_people {
            return Err(EngineError::SlotOutOfRange {
                slot,
                capacity: self.recording.max_people,
            });
        }
        Ok(())
    }

    fn check_joint(&self, joint: usize) -> Result<(), EngineError> {
        let count = self.recording.parents.len();
        if joint >= count {
            return Err(EngineError::JointOutOfRange { joint, count });
        }
        Ok(())
    }

    fn frame(&self) -> Result<&RecordedFrame, EngineError> {
        let idx = self.current.ok_or(EngineError::NoFrame)?;
        Ok(&self.recording.frames[idx])
    }

    fn person(&self, slot: usize) -> Result<Option<&RecordedPerson>, EngineError> {
        self.check_slot(slot)?;
        Ok(self.frame()?.slots.get(slot).and_then(Option::as_ref))
    }

    fn active_person(&self, slot: usize) -> Result<&RecordedPerson, EngineError> {
        self.person(slot)?.ok_or(EngineError::InvalidOutput {
            what: "slot is not active",
            slot: Some(slot),
            joint: None,
        })
    }
}

impl PoseEngine for RecordedEngine {
    fn process_image(&mut self, image: &RgbImageView<'_>) -> Result<(), EngineError> {
        let expected = self.recording.input_size;
        if image.width != expected || image.height != expected {
            return Err(EngineError::InputSize {
                expected,
                width: image.width,
                height: image.height,
            });
        }
        self.current = Some(self.next);
        self.next = (self.next + 1) % self.recording.frames.len();
        Ok(())
    }

    fn num_people(&self) -> usize {
        self.recording.max_people
    }

    fn is_person_active(&self, slot: usize) -> Result<bool, EngineError> {
        Ok(self.person(slot)?.is_some())
    }

    fn num_joints(&self) -> usize {
        self.recording.parents.len()
    }

    fn joint_position(&self, slot: usize, joint: usize) -> Result<Vector3<f64>, EngineError> {
        self.check_joint(joint)?;
        let [x, y, z] = self.active_person(slot)?.joints_mm[joint];
        Ok(Vector3::new(x, y, z))
    }

    fn joint_parent(&self, joint: usize) -> Result<Option<usize>, EngineError> {
        self.check_joint(joint)?;
        Ok(usize::try_from(self.recording.parents[joint]).ok())
    }

    fn person_colour(&self, slot: usize) -> Result<PersonColour, EngineError> {
        Ok(self.active_person(slot)?.colour)
    }

    /// Points at or behind the camera project to the origin.
    fn project(&self, p_mm: &Vector3<f64>) -> Result<Point2<f64>, EngineError> {
        if p_mm.z <= f64::EPSILON {
            return Ok(Point2::origin());
        }
        let k = &self.recording.intrinsics;
        Ok(Point2::new(
            k.fx * p_mm.x / p_mm.z + k.cx,
            k.fy * p_mm.y / p_mm.z + k.cy,
        ))
    }

    fn skeleton_global_rotation(&self, slot: usize) -> Result<Matrix3<f64>, EngineError> {
        let person = self.active_person(slot)?;
        Ok(matrix(person.global_rotation.as_ref().unwrap_or(&IDENTITY)))
    }

    fn joint_local_rotation(
        &self,
        slot: usize,
        joint: usize,
    ) -> Result<Matrix3<f64>, EngineError> {
        self.check_joint(joint)?;
        let person = self.active_person(slot)?;
        Ok(matrix(person.local_rotations.get(joint).unwrap_or(&IDENTITY)))
    }

    fn restart(&mut self) -> Result<(), EngineError> {
        self.current = None;
        self.next = 0;
        Ok(())
    }
}
