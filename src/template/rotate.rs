//! Rotation of templates and probe views.

use crate::image::{ImageView, OwnedImage};
use crate::util::math::sin_cos_deg;

/// Rotates an image counter-clockwise by `angle_deg` using bilinear sampling.
///
/// Rotation is performed about `cx = (w - 1) / 2`, `cy = (h - 1) / 2`. Each
/// destination pixel is mapped back to the source by the inverse rotation;
/// samples outside the source take `fill`. Works on any channel count; the
/// output keeps the input dimensions.
pub fn rotate_u8_bilinear(src: ImageView<'_, u8>, angle_deg: f32, fill: u8) -> OwnedImage {
    rotate_impl(src, angle_deg, fill).0
}

/// Same as [`rotate_u8_bilinear`] and also returns a validity mask
/// (`1` where the destination pixel was sampled from the source).
pub fn rotate_u8_bilinear_masked(
    src: ImageView<'_, u8>,
    angle_deg: f32,
    fill: u8,
) -> (OwnedImage, Vec<u8>) {
    rotate_impl(src, angle_deg, fill)
}

fn rotate_impl(src: ImageView<'_, u8>, angle_deg: f32, fill: u8) -> (OwnedImage, Vec<u8>) {
    let width = src.width();
    let height = src.height();
    let channels = src.channels();
    let mut out = vec![fill; width * height * channels];
    let mut mask = vec![0u8; width * height];

    // Image rows grow downward, so a counter-clockwise turn on screen uses
    // the negated angle in the usual rotation matrix.
    let (sin_a, cos_a) = sin_cos_deg(angle_deg);
    let cx = (width as f32 - 1.0) * 0.5;
    let cy = (height as f32 - 1.0) * 0.5;

    for y in 0..height {
        for x in 0..width {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let src_x = cos_a * dx - sin_a * dy + cx;
            let src_y = sin_a * dx + cos_a * dy + cy;

            let dst = (y * width + x) * channels;
            if sample_bilinear(src, src_x, src_y, &mut out[dst..dst + channels]) {
                mask[y * width + x] = 1;
            }
        }
    }

    (OwnedImage::from_parts(out, width, height, channels), mask)
}

/// Samples `src` at a real-valued coordinate into `dst` (one value per
/// channel). Returns `false` and leaves `dst` untouched when the coordinate
/// falls outside the image.
pub(crate) fn sample_bilinear(src: ImageView<'_, u8>, sx: f32, sy: f32, dst: &mut [u8]) -> bool {
    let max_x = src.width() as f32 - 1.0;
    let max_y = src.height() as f32 - 1.0;
    let epsilon = 1e-4;
    if !sx.is_finite()
        || !sy.is_finite()
        || sx < -epsilon
        || sy < -epsilon
        || sx > max_x + epsilon
        || sy > max_y + epsilon
    {
        return false;
    }

    let sx = sx.clamp(0.0, max_x);
    let sy = sy.clamp(0.0, max_y);
    let x0 = sx.floor() as usize;
    let y0 = sy.floor() as usize;
    let x1 = (x0 + 1).min(src.width() - 1);
    let y1 = (y0 + 1).min(src.height() - 1);
    let fx = sx - x0 as f32;
    let fy = sy - y0 as f32;

    let (Some(p00), Some(p10), Some(p01), Some(p11)) = (
        src.pixel(x0, y0),
        src.pixel(x1, y0),
        src.pixel(x0, y1),
        src.pixel(x1, y1),
    ) else {
        return false;
    };

    let w00 = (1.0 - fx) * (1.0 - fy);
    let w10 = fx * (1.0 - fy);
    let w01 = (1.0 - fx) * fy;
    let w11 = fx * fy;
    for (c, out) in dst.iter_mut().enumerate() {
        let value = f32::from(p00[c]) * w00
            + f32::from(p10[c]) * w10
            + f32::from(p01[c]) * w01
            + f32::from(p11[c]) * w11;
        *out = value.round().clamp(0.0, 255.0) as u8;
    }
    true
}
