//! Square letterboxing for fixed-size detector inputs.
//!
//! A `w x h` image is centre-cropped along its longer axis to a `s x s`
//! square (`s = min(w, h)`, offset `floor(|w - h| / 2)`), then resampled to
//! the detector's input size. The detector reports 2D points in its own
//! output resolution `R`, which is independent of the input size (typically
//! half of it), so mapping back is
//!
//! ```text
//! x = ox * s / R + x0
//! y = oy * s / R + y0
//! ```
//!
//! where `(x0, y0)` is the crop origin (`(offset, 0)` for landscape,
//! `(0, offset)` for portrait, `(0, 0)` for square images).

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::image::{resample_square, RgbImage, RgbImageView};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors raised for images or detector sizes that cannot be letterboxed.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    #[error("image has zero area (width={width}, height={height})")]
    ZeroArea { width: usize, height: usize },
    #[error("detector sizes must be > 0 (input={input_size}, output={output_resolution})")]
    ZeroDetectorSize {
        input_size: usize,
        output_resolution: usize,
    },
}

/// Centred square crop of a `width x height` image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquareCrop {
    pub width: usize,
    pub height: usize,
    /// Top-left corner of the crop in image pixels.
    pub x0: usize,
    pub y0: usize,
    /// Side length of the crop, `min(width, height)`.
    pub side: usize,
}

impl SquareCrop {
    pub fn centered(width: usize, height: usize) -> Result<Self, GeometryError> {
        if width == 0 || height == 0 {
            return Err(GeometryError::ZeroArea { width, height });
        }
        let offset = width.abs_diff(height) / 2;
        let (x0, y0) = if width >= height {
            (offset, 0)
        } else {
            (0, offset)
        };
        Ok(Self {
            width,
            height,
            x0,
            y0,
            side: width.min(height),
        })
    }

    /// Crop offset along the longer axis.
    #[inline]
    pub fn offset(&self) -> usize {
        self.x0.max(self.y0)
    }

    /// `true` when the image is already square and nothing is cropped.
    #[inline]
    pub fn is_full_image(&self) -> bool {
        self.width == self.height
    }

    /// Whether an image-space point lies inside the cropped square.
    pub fn contains(&self, p: Point2<f64>) -> bool {
        let (x0, y0, s) = (self.x0 as f64, self.y0 as f64, self.side as f64);
        p.x >= x0 && p.y >= y0 && p.x < x0 + s && p.y < y0 + s
    }
}

/// Forward and inverse mapping between an input image and detector space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Letterbox {
    crop: SquareCrop,
    input_size: usize,
    output_resolution: usize,
}

impl Letterbox {
    pub fn new(
        width: usize,
        height: usize,
        input_size: usize,
        output_resolution: usize,
    ) -> Result<Self, GeometryError> {
        if input_size == 0 || output_resolution == 0 {
            return Err(GeometryError::ZeroDetectorSize {
                input_size,
                output_resolution,
            });
        }
        Ok(Self {
            crop: SquareCrop::centered(width, height)?,
            input_size,
            output_resolution,
        })
    }

    #[inline]
    pub fn crop(&self) -> SquareCrop {
        self.crop
    }

    #[inline]
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    #[inline]
    pub fn output_resolution(&self) -> usize {
        self.output_resolution
    }

    /// Image pixels per detector output unit, `s / R`.
    #[inline]
    pub fn scale(&self) -> f64 {
        self.crop.side as f64 / self.output_resolution as f64
    }

    /// Build the square detector input from the original image.
    ///
    /// A square image whose side already equals the input size is copied
    /// through untouched; a square image of another size is only resampled.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, image), fields(side = self.crop.side))
    )]
    pub fn prepare_input(&self, image: &RgbImageView<'_>) -> RgbImage {
        if self.crop.is_full_image() && self.crop.side == self.input_size {
            return image.to_owned_image();
        }
        resample_square(
            image,
            self.crop.x0,
            self.crop.y0,
            self.crop.side,
            self.input_size,
        )
    }

    /// Map a point in detector output space back to original-image pixels.
    #[inline]
    pub fn output_to_image(&self, p: Point2<f64>) -> Point2<f64> {
        let s = self.scale();
        Point2::new(
            p.x * s + self.crop.x0 as f64,
            p.y * s + self.crop.y0 as f64,
        )
    }

    /// Like [`Letterbox::output_to_image`], rounded to the nearest pixel
    /// (ties to even).
    pub fn output_to_pixel(&self, p: Point2<f64>) -> Point2<i32> {
        let q = self.output_to_image(p);
        Point2::new(q.x.round_ties_even() as i32, q.y.round_ties_even() as i32)
    }

    /// Map an original-image point into detector output space.
    #[inline]
    pub fn image_to_output(&self, p: Point2<f64>) -> Point2<f64> {
        let s = self.scale();
        Point2::new(
            (p.x - self.crop.x0 as f64) / s,
            (p.y - self.crop.y0 as f64) / s,
        )
    }
}
