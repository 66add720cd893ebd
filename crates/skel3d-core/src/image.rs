/// Borrowed RGB8 image, row-major, 3 bytes per pixel.
#[derive(Clone, Copy, Debug)]
pub struct RgbImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // len = w*h*3
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl RgbImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * 3],
        }
    }

    pub fn view(&self) -> RgbImageView<'_> {
        RgbImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }
}

impl RgbImageView<'_> {
    /// `true` if the buffer length matches `width * height * 3`.
    pub fn is_consistent(&self) -> bool {
        self.width
            .checked_mul(self.height)
            .and_then(|n| n.checked_mul(3))
            .is_some_and(|n| n == self.data.len())
    }

    pub fn to_owned_image(&self) -> RgbImage {
        RgbImage {
            width: self.width,
            height: self.height,
            data: self.data.to_vec(),
        }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }
}

#[inline]
fn get_rgb(src: &RgbImageView<'_>, x: i32, y: i32) -> [f32; 3] {
    // Clamp to edge so resampling never darkens the border.
    let x = x.clamp(0, src.width as i32 - 1) as usize;
    let y = y.clamp(0, src.height as i32 - 1) as usize;
    let [r, g, b] = src.pixel(x, y);
    [r as f32, g as f32, b as f32]
}

#[inline]
pub fn sample_bilinear_rgb(src: &RgbImageView<'_>, x: f32, y: f32) -> [f32; 3] {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_rgb(src, x0, y0);
    let p10 = get_rgb(src, x0 + 1, y0);
    let p01 = get_rgb(src, x0, y0 + 1);
    let p11 = get_rgb(src, x0 + 1, y0 + 1);

    let mut out = [0.0f32; 3];
    for c in 0..3 {
        let a = p00[c] + fx * (p10[c] - p00[c]);
        let b = p01[c] + fx * (p11[c] - p01[c]);
        out[c] = a + fy * (b - a);
    }
    out
}

/// Resample the square region `[x0, x0 + side) x [y0, y0 + side)` of `src`
/// into a `size x size` image using bilinear interpolation with pixel-centre
/// alignment.
pub fn resample_square(
    src: &RgbImageView<'_>,
    x0: usize,
    y0: usize,
    side: usize,
    size: usize,
) -> RgbImage {
    let mut out = RgbImage::new(size, size);
    if side == 0 || size == 0 || src.width == 0 || src.height == 0 {
        return out;
    }

    let scale = side as f32 / size as f32;
    for v in 0..size {
        let sy = y0 as f32 + (v as f32 + 0.5) * scale - 0.5;
        for u in 0..size {
            let sx = x0 as f32 + (u as f32 + 0.5) * scale - 0.5;
            let px = sample_bilinear_rgb(src, sx, sy);
            let i = (v * size + u) * 3;
            for c in 0..3 {
                out.data[i + c] = px[c].round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    out
}
