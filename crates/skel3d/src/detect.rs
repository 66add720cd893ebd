use crate::{core, detector};
use nalgebra::Matrix4;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the high-level facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("invalid RGB image buffer length (expected {expected} bytes, got {got})")]
    InvalidRgbBuffer { expected: usize, got: usize },

    #[error("invalid RGB image dimensions (width={width}, height={height})")]
    InvalidRgbDimensions { width: u32, height: u32 },

    #[error("camera pose is not a rigid transform: {0}")]
    Convention(#[from] core::ConventionError),

    #[error(transparent)]
    Detect(#[from] detector::DetectError),
}

/// Convert an `image::RgbImage` into the lightweight `skel3d-core` view type.
pub fn rgb_view(img: &::image::RgbImage) -> core::RgbImageView<'_> {
    core::RgbImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Build an `image::RgbImage` from a raw interleaved RGB8 buffer.
pub fn rgb_image_from_slice(
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<::image::RgbImage, DetectError> {
    let w = usize::try_from(width).ok();
    let h = usize::try_from(height).ok();
    let Some((w, h)) = w.zip(h) else {
        return Err(DetectError::InvalidRgbDimensions { width, height });
    };
    let Some(expected) = w.checked_mul(h).and_then(|n| n.checked_mul(3)) else {
        return Err(DetectError::InvalidRgbDimensions { width, height });
    };
    if pixels.len() != expected {
        return Err(DetectError::InvalidRgbBuffer {
            expected,
            got: pixels.len(),
        });
    }
    ::image::RgbImage::from_raw(width, height, pixels.to_vec())
        .ok_or(DetectError::InvalidRgbDimensions { width, height })
}

/// Run detection end-to-end: validate the camera pose, detect, and return
/// world-frame skeletons plus optional overlay data.
///
/// `world_from_camera` is a homogeneous 4x4 camera-to-world transform; it is
/// rejected unless its rotation block is orthonormal with determinant +1 and
/// its bottom row is `[0, 0, 0, 1]`.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(detector, img, world_from_camera, options),
        fields(width = img.width(), height = img.height())
    )
)]
pub fn detect_skeletons<E: detector::PoseEngine>(
    detector: &mut detector::SkeletonDetector<E>,
    img: &::image::RgbImage,
    world_from_camera: &Matrix4<f64>,
    options: detector::DetectOptions,
) -> Result<detector::Detection, DetectError> {
    let world_from_camera = core::rigid_from_matrix(world_from_camera)?;
    Ok(detector.detect(&rgb_view(img), &world_from_camera, options)?)
}

pub fn detect_skeletons_from_rgb_u8<E: detector::PoseEngine>(
    detector: &mut detector::SkeletonDetector<E>,
    width: u32,
    height: u32,
    pixels: &[u8],
    world_from_camera: &Matrix4<f64>,
    options: detector::DetectOptions,
) -> Result<detector::Detection, DetectError> {
    let img = rgb_image_from_slice(width, height, pixels)?;
    detect_skeletons(detector, &img, world_from_camera, options)
}

/// Overlay image as an `image::RgbImage`, ready for a renderer to draw on.
pub fn overlay_image(overlay: &detector::Overlay) -> Option<::image::RgbImage> {
    ::image::RgbImage::from_raw(
        u32::try_from(overlay.image.width).ok()?,
        u32::try_from(overlay.image.height).ok()?,
        overlay.image.data.clone(),
    )
}
