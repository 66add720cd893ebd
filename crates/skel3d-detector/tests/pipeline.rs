use approx::assert_relative_eq;
use nalgebra::{Isometry3, Matrix3, Point2, Point3, Rotation3, Translation3, Vector3};
use skel3d_core::{RgbImage, RgbImageView};
use skel3d_detector::{
    DetectError, DetectOptions, DetectorParams, EngineError, EngineRecording, JointTopology,
    PersonColour, PinholeIntrinsics, PoseEngine, RecordedEngine, RecordedFrame, RecordedPerson,
    SkeletonDetector, TopologyError, MID_HIP,
};

const INPUT: usize = 64;
const OUTPUT: usize = 32;
const SLOTS: usize = 5;

fn parents() -> Vec<i32> {
    JointTopology::full_body_21()
        .joints()
        .iter()
        .map(|j| j.parent.map_or(-1, |p| p as i32))
        .collect()
}

fn rows(m: &Matrix3<f64>) -> [[f64; 3]; 3] {
    [
        [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
        [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
        [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
    ]
}

fn person(colour: [u8; 3], offset_mm: f64) -> RecordedPerson {
    RecordedPerson {
        colour: colour.into(),
        joints_mm: (0..21)
            .map(|j| {
                let j = j as f64;
                [10.0 * j + offset_mm, -5.0 * j, 3000.0 + j]
            })
            .collect(),
        global_rotation: None,
        local_rotations: vec![],
    }
}

fn recording(frames: Vec<RecordedFrame>) -> EngineRecording {
    EngineRecording {
        max_people: SLOTS,
        input_size: INPUT,
        parents: parents(),
        intrinsics: PinholeIntrinsics {
            fx: 10.0,
            fy: 10.0,
            cx: 16.0,
            cy: 16.0,
        },
        frames,
    }
}

fn two_people_frame() -> RecordedFrame {
    RecordedFrame {
        slots: vec![
            None,
            Some(person([255, 0, 0], 0.0)),
            None,
            Some(person([0, 0, 255], 500.0)),
            None,
        ],
    }
}

fn params() -> DetectorParams {
    DetectorParams {
        input_size: INPUT,
        output_resolution: OUTPUT,
        ..DetectorParams::default()
    }
}

fn detector(frames: Vec<RecordedFrame>) -> SkeletonDetector<RecordedEngine> {
    let engine = RecordedEngine::new(recording(frames)).expect("recording");
    SkeletonDetector::new(engine, params()).expect("detector")
}

fn gradient_image(width: usize, height: usize) -> RgbImage {
    let mut img = RgbImage::new(width, height);
    for (i, px) in img.data.chunks_exact_mut(3).enumerate() {
        px.copy_from_slice(&[(i % 251) as u8, (i % 7) as u8, 42]);
    }
    img
}

#[test]
fn two_active_slots_yield_two_skeletons_in_slot_order() {
    let mut det = detector(vec![two_people_frame()]);
    let img = gradient_image(80, 60);

    let result = det
        .detect(&img.view(), &Isometry3::identity(), DetectOptions::default())
        .expect("detect");

    assert_eq!(result.skeletons.len(), 2);
    for skeleton in &result.skeletons {
        assert_eq!(skeleton.len(), 19);
        assert!(skeleton.keypoint("RFoot").is_none());
        assert!(skeleton.keypoint("LFoot").is_none());
        assert_eq!(skeleton.bones(), det.topology().bones());
    }

    let hip = result.skeletons[0].keypoint("MidHip").expect("MidHip");
    assert_relative_eq!(hip.position(), Point3::new(-0.14, 0.07, 3.014), epsilon = 1e-12);
    let hip = result.skeletons[1].keypoint("MidHip").expect("MidHip");
    assert_relative_eq!(hip.position(), Point3::new(-0.64, 0.07, 3.014), epsilon = 1e-12);

    assert!(result.overlay.is_none());
}

#[test]
fn no_active_people_is_an_empty_success() {
    let mut det = detector(vec![RecordedFrame::default()]);
    let img = gradient_image(50, 70);

    let options = DetectOptions {
        visualize: true,
        ..DetectOptions::default()
    };
    let result = det
        .detect(&img.view(), &Isometry3::identity(), options)
        .expect("detect");

    assert!(result.is_empty());
    let overlay = result.overlay.expect("overlay");
    assert!(overlay.people.is_empty());
    assert_eq!(overlay.image, img);
}

#[test]
fn positions_are_expressed_in_the_world_frame() {
    let mut det = detector(vec![two_people_frame()]);
    let img = gradient_image(64, 64);
    let world_from_camera = Isometry3::from_parts(
        Translation3::new(1.0, 2.0, 3.0),
        Rotation3::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2).into(),
    );

    let result = det
        .detect(&img.view(), &world_from_camera, DetectOptions::default())
        .expect("detect");

    // camera (-0.14, 0.07, 3.014), rotated +90 deg about z, then translated
    let hip = result.skeletons[0].keypoint("MidHip").expect("MidHip");
    assert_relative_eq!(hip.position(), Point3::new(0.93, 1.86, 6.014), epsilon = 1e-12);
}

#[test]
fn bare_mode_carries_no_orientation_data() {
    let mut det = detector(vec![two_people_frame()]);
    let img = gradient_image(80, 60);

    let result = det
        .detect(&img.view(), &Isometry3::identity(), DetectOptions::default())
        .expect("detect");

    for skeleton in &result.skeletons {
        assert!(skeleton.global_poses().is_empty());
        assert!(skeleton.local_rotations().is_empty());
    }
}

#[test]
fn engine_poses_fill_local_rotations_and_root_global_pose() {
    let local = Rotation3::from_axis_angle(&Vector3::x_axis(), 0.3);
    let mut p = person([0, 255, 0], 0.0);
    p.local_rotations = vec![rows(local.matrix()); 21];
    let frame = RecordedFrame {
        slots: vec![Some(p)],
    };
    let mut det = detector(vec![frame]);
    let img = gradient_image(64, 64);
    let world_from_camera = Isometry3::translation(1.0, 2.0, 3.0);

    let options = DetectOptions {
        use_engine_poses: true,
        ..DetectOptions::default()
    };
    let result = det
        .detect(&img.view(), &world_from_camera, options)
        .expect("detect");
    let skeleton = &result.skeletons[0];

    // Engine X and Z flip: a rotation about +x becomes one about -x.
    let expected_local = Rotation3::from_axis_angle(&Vector3::x_axis(), -0.3);
    assert_eq!(skeleton.local_rotations().len(), 19);
    for rotation in skeleton.local_rotations().values() {
        assert_relative_eq!(**rotation, expected_local, epsilon = 1e-9);
    }

    assert_eq!(skeleton.global_poses().len(), 1);
    let pose = skeleton.global_pose("MidHip").expect("root pose");
    assert_relative_eq!(
        pose.translation.vector,
        Vector3::new(0.86, 2.07, 6.014),
        epsilon = 1e-12
    );
    // Identity engine rotation maps to a half-turn about camera x.
    assert_relative_eq!(
        pose.rotation.to_rotation_matrix().into_inner(),
        Matrix3::from_diagonal(&Vector3::new(1.0, -1.0, -1.0)),
        epsilon = 1e-12
    );

    let bare = result.bare_skeletons();
    assert!(bare[0].global_poses().is_empty());
    assert!(bare[0].local_rotations().is_empty());
    assert_eq!(bare[0].len(), skeleton.len());
}

#[test]
fn rounded_engine_rotations_are_accepted_and_re_orthonormalised() {
    let exact = Rotation3::from_euler_angles(0.3, -1.1, 2.4);
    let stored = exact.matrix().map(|v: f64| (v * 1e4).round() / 1e4);
    let mut p = person([0, 255, 0], 0.0);
    p.global_rotation = Some(rows(&stored));
    p.local_rotations = vec![rows(&stored); 21];
    let mut det = detector(vec![RecordedFrame {
        slots: vec![Some(p)],
    }]);
    let img = gradient_image(64, 64);
    let options = DetectOptions {
        use_engine_poses: true,
        ..DetectOptions::default()
    };

    let result = det
        .detect(&img.view(), &Isometry3::identity(), options)
        .expect("rounded rotations are within engine tolerance");
    assert_eq!(result.skeletons.len(), 1);
    let skeleton = &result.skeletons[0];

    let flip = Matrix3::from_diagonal(&Vector3::new(1.0, -1.0, -1.0));
    let root = skeleton
        .global_pose("MidHip")
        .expect("root pose")
        .rotation
        .to_rotation_matrix();
    assert_relative_eq!(
        root.into_inner(),
        flip * exact.matrix().transpose(),
        epsilon = 1e-3
    );
    let orthonormality = root.matrix().transpose() * root.matrix() - Matrix3::identity();
    assert!(orthonormality.amax() < 1e-9);

    for rotation in skeleton.local_rotations().values() {
        let m = rotation.matrix();
        assert!((m.transpose() * m - Matrix3::identity()).amax() < 1e-9);
        assert_relative_eq!(m.determinant(), 1.0, epsilon = 1e-9);
    }
}

#[test]
fn reflected_engine_rotation_is_rejected() {
    let mut p = person([0, 255, 0], 0.0);
    p.global_rotation = Some([[-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
    let mut det = detector(vec![RecordedFrame {
        slots: vec![Some(p)],
    }]);
    let img = gradient_image(64, 64);
    let options = DetectOptions {
        use_engine_poses: true,
        ..DetectOptions::default()
    };

    let err = det
        .detect(&img.view(), &Isometry3::identity(), options)
        .unwrap_err();
    assert!(matches!(
        err,
        DetectError::InvalidRotation {
            slot: 0,
            joint: None,
            ..
        }
    ));
}

#[test]
fn overlay_projects_joints_into_original_pixels() {
    let mut det = detector(vec![two_people_frame()]);
    let img = gradient_image(80, 60);
    let options = DetectOptions {
        visualize: true,
        ..DetectOptions::default()
    };

    let result = det
        .detect(&img.view(), &Isometry3::identity(), options)
        .expect("detect");
    let overlay = result.overlay.expect("overlay");

    assert_eq!(overlay.image, img);
    let slots: Vec<usize> = overlay.people.iter().map(|p| p.slot).collect();
    assert_eq!(slots, vec![1, 3]);
    assert_eq!(overlay.people[1].colour, PersonColour::rgb(0, 0, 255));

    let first = &overlay.people[0];
    assert_eq!(first.joints.len(), 19);
    // Joint 0 projects to the output centre, i.e. the centre of the 60x60 crop.
    assert_eq!(first.joints[0].pixel, Point2::new(40, 30));
    assert_eq!(first.joints[0].name, "Head Top");
    // Every extracted non-root joint has a bone to its parent.
    assert_eq!(first.bones.len(), 18);
    assert!(first.bones.iter().all(|b| b.joint != MID_HIP));
}

#[test]
fn overlay_skips_bones_with_non_positive_endpoints() {
    let mut p = person([9, 9, 9], 0.0);
    // Behind the camera: projects to the output origin, pixel (10, 0).
    p.joints_mm[7] = [0.0, 0.0, -100.0];
    let mut det = detector(vec![RecordedFrame {
        slots: vec![Some(p)],
    }]);
    let img = gradient_image(80, 60);
    let options = DetectOptions {
        visualize: true,
        ..DetectOptions::default()
    };

    let result = det
        .detect(&img.view(), &Isometry3::identity(), options)
        .expect("detect");
    let person = &result.overlay.expect("overlay").people[0];

    assert_eq!(person.joints[7].pixel, Point2::new(10, 0));
    // LWrist -> LElbow and LHand -> LWrist are dropped.
    assert_eq!(person.bones.len(), 16);
    assert!(person.bones.iter().all(|b| b.joint != 7 && b.parent != 7));
}

struct FailingEngine {
    inner: RecordedEngine,
    fail: bool,
}

impl PoseEngine for FailingEngine {
    fn process_image(&mut self, image: &RgbImageView<'_>) -> Result<(), EngineError> {
        if self.fail {
            return Err(EngineError::Inference("gpu lost".into()));
        }
        self.inner.process_image(image)
    }

    fn num_people(&self) -> usize {
        self.inner.num_people()
    }

    fn is_person_active(&self, slot: usize) -> Result<bool, EngineError> {
        self.inner.is_person_active(slot)
    }

    fn num_joints(&self) -> usize {
        self.inner.num_joints()
    }

    fn joint_position(&self, slot: usize, joint: usize) -> Result<Vector3<f64>, EngineError> {
        self.inner.joint_position(slot, joint)
    }

    fn joint_parent(&self, joint: usize) -> Result<Option<usize>, EngineError> {
        self.inner.joint_parent(joint)
    }

    fn person_colour(&self, slot: usize) -> Result<PersonColour, EngineError> {
        self.inner.person_colour(slot)
    }

    fn project(&self, p_mm: &Vector3<f64>) -> Result<Point2<f64>, EngineError> {
        self.inner.project(p_mm)
    }

    fn skeleton_global_rotation(&self, slot: usize) -> Result<Matrix3<f64>, EngineError> {
        self.inner.skeleton_global_rotation(slot)
    }

    fn joint_local_rotation(
        &self,
        slot: usize,
        joint: usize,
    ) -> Result<Matrix3<f64>, EngineError> {
        self.inner.joint_local_rotation(slot, joint)
    }

    fn restart(&mut self) -> Result<(), EngineError> {
        self.fail = false;
        self.inner.restart()
    }
}

#[test]
fn engine_failures_surface_as_errors_not_empty_results() {
    let engine = FailingEngine {
        inner: RecordedEngine::new(recording(vec![two_people_frame()])).expect("recording"),
        fail: true,
    };
    let mut det = SkeletonDetector::new(engine, params()).expect("detector");
    let img = gradient_image(80, 60);

    let err = det
        .detect(&img.view(), &Isometry3::identity(), DetectOptions::default())
        .unwrap_err();
    assert!(matches!(err, DetectError::Engine(EngineError::Inference(_))));

    det.restart().expect("restart");
    let result = det
        .detect(&img.view(), &Isometry3::identity(), DetectOptions::default())
        .expect("detect after restart");
    assert_eq!(result.skeletons.len(), 2);
}

#[test]
fn restart_rewinds_the_engine_session() {
    let mut det = detector(vec![two_people_frame(), RecordedFrame::default()]);
    let img = gradient_image(80, 60);
    let run = |det: &mut SkeletonDetector<RecordedEngine>| {
        det.detect(&img.view(), &Isometry3::identity(), DetectOptions::default())
            .expect("detect")
            .skeletons
            .len()
    };

    assert_eq!(run(&mut det), 2);
    assert_eq!(run(&mut det), 0);
    det.restart().expect("restart");
    assert_eq!(run(&mut det), 2);
}

#[test]
fn mismatched_topology_is_rejected_at_construction() {
    let mut rec = recording(vec![RecordedFrame::default()]);
    rec.parents.pop();
    let engine = RecordedEngine::new(rec).expect("recording");

    let err = SkeletonDetector::new(engine, params()).err().expect("error");
    assert!(matches!(
        err,
        DetectError::Topology(TopologyError::JointCountMismatch {
            table: 21,
            engine: 20
        })
    ));
}

#[test]
fn inconsistent_image_buffer_is_rejected_before_the_engine_runs() {
    let mut det = detector(vec![two_people_frame()]);
    let data = vec![0u8; 10];
    let view = RgbImageView {
        width: 4,
        height: 4,
        data: &data,
    };

    let err = det
        .detect(&view, &Isometry3::identity(), DetectOptions::default())
        .unwrap_err();
    assert!(matches!(err, DetectError::InvalidImage { len: 10, .. }));
    assert_eq!(det.engine().current_frame(), None);
}

#[test]
fn zero_area_image_is_a_geometry_error() {
    let mut det = detector(vec![two_people_frame()]);
    let img = RgbImage::new(0, 10);

    let err = det
        .detect(&img.view(), &Isometry3::identity(), DetectOptions::default())
        .unwrap_err();
    assert!(matches!(err, DetectError::Geometry(_)));
}
