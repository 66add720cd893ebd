//! Named-keypoint skeletons and their assembly.

use std::collections::BTreeMap;

use nalgebra::{Isometry3, Point3, Rotation3};
use serde::{Deserialize, Serialize};

/// A named joint of one skeleton, expressed in the world frame (metres).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    name: String,
    position: Point3<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    local_rotation: Option<Rotation3<f64>>,
}

impl Keypoint {
    pub fn new(name: impl Into<String>, position: Point3<f64>) -> Self {
        Self {
            name: name.into(),
            position,
            local_rotation: None,
        }
    }

    pub fn with_local_rotation(mut self, rotation: Rotation3<f64>) -> Self {
        self.local_rotation = Some(rotation);
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    #[inline]
    pub fn local_rotation(&self) -> Option<&Rotation3<f64>> {
        self.local_rotation.as_ref()
    }
}

/// A pair of keypoint names connected by a bone.
pub type BonePair = (String, String);

/// One detected person in one frame.
///
/// Keypoints are always keyed by their own [`Keypoint::name`], including
/// after deserialization. Bones may reference keypoints that are absent
/// (e.g. dropped feet); such bones are kept but never returned by
/// [`Skeleton::drawable_bones`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "SkeletonRepr")]
pub struct Skeleton {
    keypoints: BTreeMap<String, Keypoint>,
    bones: Vec<BonePair>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    global_poses: BTreeMap<String, Isometry3<f64>>,
}

#[derive(Deserialize)]
struct SkeletonRepr {
    keypoints: BTreeMap<String, Keypoint>,
    bones: Vec<BonePair>,
    #[serde(default)]
    global_poses: BTreeMap<String, Isometry3<f64>>,
}

impl From<SkeletonRepr> for Skeleton {
    fn from(repr: SkeletonRepr) -> Self {
        Skeleton::new(repr.keypoints.into_values(), repr.bones)
            .with_global_poses(repr.global_poses)
    }
}

impl Skeleton {
    /// Assemble a skeleton from keypoints and a bone topology.
    ///
    /// Keypoints are looked up by their own name; a later keypoint replaces
    /// an earlier one with the same name.
    pub fn new(keypoints: impl IntoIterator<Item = Keypoint>, bones: Vec<BonePair>) -> Self {
        Self {
            keypoints: keypoints
                .into_iter()
                .map(|k| (k.name.clone(), k))
                .collect(),
            bones,
            global_poses: BTreeMap::new(),
        }
    }

    pub fn with_global_poses(mut self, global_poses: BTreeMap<String, Isometry3<f64>>) -> Self {
        self.global_poses = global_poses;
        self
    }

    #[inline]
    pub fn keypoints(&self) -> &BTreeMap<String, Keypoint> {
        &self.keypoints
    }

    #[inline]
    pub fn keypoint(&self, name: &str) -> Option<&Keypoint> {
        self.keypoints.get(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// The full bone topology, including bones with missing endpoints.
    #[inline]
    pub fn bones(&self) -> &[BonePair] {
        &self.bones
    }

    /// Bones whose two endpoints are both present.
    pub fn drawable_bones(&self) -> impl Iterator<Item = (&Keypoint, &Keypoint)> + '_ {
        self.bones
            .iter()
            .filter_map(|(a, b)| Some((self.keypoints.get(a)?, self.keypoints.get(b)?)))
    }

    #[inline]
    pub fn global_poses(&self) -> &BTreeMap<String, Isometry3<f64>> {
        &self.global_poses
    }

    #[inline]
    pub fn global_pose(&self, name: &str) -> Option<&Isometry3<f64>> {
        self.global_poses.get(name)
    }

    /// Local rotations of the keypoints that carry one.
    pub fn local_rotations(&self) -> BTreeMap<&str, &Rotation3<f64>> {
        self.keypoints
            .values()
            .filter_map(|k| Some((k.name(), k.local_rotation()?)))
            .collect()
    }

    /// Copy of this skeleton without any orientation data.
    pub fn make_bare(&self) -> Self {
        let keypoints = self
            .keypoints
            .values()
            .map(|k| Keypoint::new(k.name.clone(), k.position));
        Self::new(keypoints, self.bones.clone())
    }
}

/// Incremental skeleton assembly used by the person extractor.
#[derive(Clone, Debug, Default)]
pub struct SkeletonBuilder {
    keypoints: BTreeMap<String, Keypoint>,
    global_poses: BTreeMap<String, Isometry3<f64>>,
}

impl SkeletonBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a keypoint, replacing any previous one with the same name.
    pub fn keypoint(&mut self, keypoint: Keypoint) -> &mut Self {
        self.keypoints.insert(keypoint.name.clone(), keypoint);
        self
    }

    pub fn global_pose(&mut self, name: impl Into<String>, pose: Isometry3<f64>) -> &mut Self {
        self.global_poses.insert(name.into(), pose);
        self
    }

    pub fn build(self, bones: &[BonePair]) -> Skeleton {
        Skeleton::new(self.keypoints.into_values(), bones.to_vec())
            .with_global_poses(self.global_poses)
    }
}
