//! End-to-end detection timing against a replayed engine session.
//!
//! The engine itself is free here, so this measures letterboxing, input
//! resampling and skeleton extraction for a full 21-joint table.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::Matrix4;
use skel3d::detect;
use skel3d::detector::{
    DetectOptions, DetectorParams, EngineRecording, JointTopology, PersonColour,
    PinholeIntrinsics, RecordedEngine, RecordedFrame, RecordedPerson, SkeletonDetector,
};

const INPUT: usize = 512;
const OUTPUT: usize = 256;

fn recording(people: usize) -> EngineRecording {
    let parents = JointTopology::full_body_21()
        .joints()
        .iter()
        .map(|j| j.parent.map_or(-1, |p| p as i32))
        .collect();
    let slots = (0..people)
        .map(|slot| {
            Some(RecordedPerson {
                colour: PersonColour::rgb(slot as u8 * 40, 128, 255),
                joints_mm: (0..21)
                    .map(|j| [slot as f64 * 600.0 - 900.0, 40.0 * j as f64 - 400.0, 3500.0])
                    .collect(),
                global_rotation: None,
                local_rotations: Vec::new(),
            })
        })
        .collect();
    EngineRecording {
        max_people: 8,
        input_size: INPUT,
        parents,
        intrinsics: PinholeIntrinsics {
            fx: 300.0,
            fy: 300.0,
            cx: OUTPUT as f64 / 2.0,
            cy: OUTPUT as f64 / 2.0,
        },
        frames: vec![RecordedFrame { slots }],
    }
}

fn bench_detect(c: &mut Criterion) {
    let img = image::RgbImage::from_fn(1280, 720, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let params = DetectorParams {
        input_size: INPUT,
        output_resolution: OUTPUT,
        ..DetectorParams::default()
    };

    let mut group = c.benchmark_group("detect_skeletons");
    for people in [0usize, 1, 4] {
        for (label, options) in [
            ("bare", DetectOptions::default()),
            (
                "poses+overlay",
                DetectOptions {
                    visualize: true,
                    use_engine_poses: true,
                },
            ),
        ] {
            let Ok(engine) = RecordedEngine::new(recording(people)) else {
                continue;
            };
            let Ok(mut detector) = SkeletonDetector::new(engine, params.clone()) else {
                continue;
            };
            group.bench_with_input(BenchmarkId::new(label, people), &people, |b, _| {
                b.iter(|| {
                    detect::detect_skeletons(
                        &mut detector,
                        black_box(&img),
                        &Matrix4::identity(),
                        options,
                    )
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_detect);
criterion_main!(benches);
