//! Per-sample tonal transforms.

use crate::image::{ImageView, OwnedImage};

fn map_samples(src: ImageView<'_, u8>, f: impl Fn(u8) -> u8) -> OwnedImage {
    let mut out = Vec::with_capacity(src.width() * src.height() * src.channels());
    for y in 0..src.height() {
        if let Some(row) = src.row(y) {
            out.extend(row.iter().map(|&v| f(v)));
        }
    }
    OwnedImage::from_parts(out, src.width(), src.height(), src.channels())
}

/// `dst = saturate(round(|gain * v + offset|))` for every sample.
pub fn brightness_contrast(src: ImageView<'_, u8>, gain: f32, offset: f32) -> OwnedImage {
    let mut lut = [0u8; 256];
    for (v, slot) in lut.iter_mut().enumerate() {
        let mapped = (gain * v as f32 + offset).abs().round();
        *slot = mapped.clamp(0.0, 255.0) as u8;
    }
    map_samples(src, |v| lut[usize::from(v)])
}

/// `dst = 255 - v` for every sample.
pub fn invert(src: ImageView<'_, u8>) -> OwnedImage {
    map_samples(src, |v| 255 - v)
}

#[cfg(test)]
mod tests {
    use super::{brightness_contrast, invert};
    use crate::image::ImageView;

    #[test]
    fn brightness_contrast_saturates_and_folds_negatives() {
        let data = [0u8, 10, 100, 200];
        let view = ImageView::from_slice(&data, 4, 1).unwrap();
        let out = brightness_contrast(view, 1.6, -20.0);
        assert_eq!(out.data(), &[20, 4, 140, 255]);
    }

    #[test]
    fn unit_gain_zero_offset_is_identity() {
        let data: Vec<u8> = (0..=255).collect();
        let view = ImageView::from_slice(&data, 16, 16).unwrap();
        assert_eq!(brightness_contrast(view, 1.0, 0.0).data(), data.as_slice());
    }

    #[test]
    fn invert_flips_tones() {
        let data = [0u8, 55, 255];
        let view = ImageView::from_slice(&data, 3, 1).unwrap();
        assert_eq!(invert(view).data(), &[255, 200, 0]);
    }
}
