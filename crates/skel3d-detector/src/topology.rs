//! Joint topology: semantic names, parent tree and bone pairs.
//!
//! The table is tied to the engine's joint ordering. It is data, loadable
//! from JSON, so a table can be swapped when the engine version changes;
//! [`JointTopology::validate_against`] checks it against a live engine.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use skel3d_core::BonePair;

use crate::engine::{EngineError, PoseEngine};

/// Index of the root joint in the built-in 21-joint table.
pub const MID_HIP: usize = 14;

/// One entry of the joint table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointSpec {
    pub name: String,
    pub parent: Option<usize>,
}

/// Errors for malformed tables or tables that do not match the engine.
#[derive(thiserror::Error, Debug)]
pub enum TopologyError {
    #[error("joint table is empty")]
    Empty,
    #[error("duplicate joint name {0:?}")]
    DuplicateName(String),
    #[error("joint {joint} has out-of-range parent {parent}")]
    ParentOutOfRange { joint: usize, parent: usize },
    #[error("joint table must have exactly one root, found {count}")]
    RootCount { count: usize },
    #[error("joint {joint} is not connected to the root")]
    Disconnected { joint: usize },
    #[error("bone references unknown joint {0:?}")]
    UnknownBoneJoint(String),
    #[error("joint table has {table} joints, engine reports {engine}")]
    JointCountMismatch { table: usize, engine: usize },
    #[error("joint {joint}: table parent {table:?} != engine parent {engine:?}")]
    ParentMismatch {
        joint: usize,
        table: Option<usize>,
        engine: Option<usize>,
    },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Deserialize)]
struct RawTopology {
    joints: Vec<JointSpec>,
    bones: Vec<BonePair>,
}

impl TryFrom<RawTopology> for JointTopology {
    type Error = TopologyError;

    fn try_from(raw: RawTopology) -> Result<Self, Self::Error> {
        JointTopology::new(raw.joints, raw.bones)
    }
}

/// Validated joint table plus the bone pairs used for skeleton assembly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTopology")]
pub struct JointTopology {
    joints: Vec<JointSpec>,
    bones: Vec<BonePair>,
    #[serde(skip)]
    root: usize,
}

impl JointTopology {
    /// Validate a table: unique names, a single root, every joint reachable
    /// from the root, and bones naming existing joints.
    pub fn new(joints: Vec<JointSpec>, bones: Vec<BonePair>) -> Result<Self, TopologyError> {
        if joints.is_empty() {
            return Err(TopologyError::Empty);
        }

        let mut names = HashSet::new();
        for j in &joints {
            if !names.insert(j.name.as_str()) {
                return Err(TopologyError::DuplicateName(j.name.clone()));
            }
        }

        let n = joints.len();
        for (joint, spec) in joints.iter().enumerate() {
            if let Some(parent) = spec.parent {
                if parent >= n {
                    return Err(TopologyError::ParentOutOfRange { joint, parent });
                }
            }
        }

        let roots: Vec<usize> = (0..n).filter(|&i| joints[i].parent.is_none()).collect();
        let &[root] = roots.as_slice() else {
            return Err(TopologyError::RootCount { count: roots.len() });
        };

        // Walking parents must reach the root within n steps; a cycle never does.
        for joint in 0..n {
            let mut cur = joint;
            let mut steps = 0;
            while let Some(parent) = joints[cur].parent {
                cur = parent;
                steps += 1;
                if steps > n {
                    return Err(TopologyError::Disconnected { joint });
                }
            }
        }

        for (a, b) in &bones {
            for name in [a, b] {
                if !names.contains(name.as_str()) {
                    return Err(TopologyError::UnknownBoneJoint(name.clone()));
                }
            }
        }

        Ok(Self {
            joints,
            bones,
            root,
        })
    }

    /// The 21-joint table of the full-body engine.
    ///
    /// The engine's "Root" and "Head" joints are exposed as `MidHip` and
    /// `Nose` so skeletons line up with other detectors. The two feet come
    /// last and are usually excluded from extraction.
    pub fn full_body_21() -> Self {
        const JOINTS: [(&str, Option<usize>); 21] = [
            ("Head Top", Some(16)),
            ("Neck", Some(15)),
            ("RShoulder", Some(1)),
            ("RElbow", Some(2)),
            ("RWrist", Some(3)),
            ("LShoulder", Some(1)),
            ("LElbow", Some(5)),
            ("LWrist", Some(6)),
            ("RHip", Some(MID_HIP)),
            ("RKnee", Some(8)),
            ("RAnkle", Some(9)),
            ("LHip", Some(MID_HIP)),
            ("LKnee", Some(11)),
            ("LAnkle", Some(12)),
            ("MidHip", None),
            ("Spine", Some(MID_HIP)),
            ("Nose", Some(1)),
            ("RHand", Some(4)),
            ("LHand", Some(7)),
            ("RFoot", Some(10)),
            ("LFoot", Some(13)),
        ];
        // Neck-MidHip skips the spine joint; Head Top-Nose completes the head.
        const BONES: [(usize, usize); 15] = [
            (1, 2),
            (1, 5),
            (1, MID_HIP),
            (1, 16),
            (2, 3),
            (3, 4),
            (5, 6),
            (6, 7),
            (8, 9),
            (8, MID_HIP),
            (9, 10),
            (11, 12),
            (11, MID_HIP),
            (12, 13),
            (0, 16),
        ];

        let joints = JOINTS
            .iter()
            .map(|&(name, parent)| JointSpec {
                name: name.to_string(),
                parent,
            })
            .collect();
        let bones = BONES
            .iter()
            .map(|&(a, b)| (JOINTS[a].0.to_string(), JOINTS[b].0.to_string()))
            .collect();

        Self {
            joints,
            bones,
            root: MID_HIP,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    #[inline]
    pub fn joints(&self) -> &[JointSpec] {
        &self.joints
    }

    #[inline]
    pub fn name(&self, joint: usize) -> Option<&str> {
        self.joints.get(joint).map(|j| j.name.as_str())
    }

    #[inline]
    pub fn parent(&self, joint: usize) -> Option<usize> {
        self.joints.get(joint)?.parent
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    #[inline]
    pub fn root(&self) -> usize {
        self.root
    }

    #[inline]
    pub fn root_name(&self) -> &str {
        &self.joints[self.root].name
    }

    #[inline]
    pub fn bones(&self) -> &[BonePair] {
        &self.bones
    }

    /// Check joint count and parent indices against a live engine.
    pub fn validate_against<E: PoseEngine + ?Sized>(&self, engine: &E) -> Result<(), TopologyError> {
        let engine_joints = engine.num_joints();
        if engine_joints != self.joints.len() {
            return Err(TopologyError::JointCountMismatch {
                table: self.joints.len(),
                engine: engine_joints,
            });
        }
        for (joint, spec) in self.joints.iter().enumerate() {
            let engine_parent = engine.joint_parent(joint)?;
            if engine_parent != spec.parent {
                return Err(TopologyError::ParentMismatch {
                    joint,
                    table: spec.parent,
                    engine: engine_parent,
                });
            }
        }
        Ok(())
    }
}

impl Default for JointTopology {
    fn default() -> Self {
        Self::full_body_21()
    }
}
