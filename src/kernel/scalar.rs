//! Scalar reference ZNCC kernels.

use crate::kernel::{Kernel, Peak};
use crate::template::{MaskedTemplatePlan, TemplatePlan};
use crate::ImageView;

/// Scalar masked ZNCC kernel for rotated templates.
pub struct ZnccMaskedScalar;

/// Scalar unmasked ZNCC kernel for upright templates.
pub struct ZnccUnmaskedScalar;

fn placement_range(
    image: ImageView<'_, u8>,
    tpl_width: usize,
    tpl_height: usize,
) -> Option<(usize, usize)> {
    if image.channels() != 1 || image.width() < tpl_width || image.height() < tpl_height {
        return None;
    }
    Some((image.width() - tpl_width, image.height() - tpl_height))
}

fn scan_with(
    max_x: usize,
    max_y: usize,
    mut score_at: impl FnMut(usize, usize) -> Option<f32>,
) -> Option<Peak> {
    let mut best: Option<Peak> = None;
    for y in 0..=max_y {
        for x in 0..=max_x {
            let Some(score) = score_at(x, y) else {
                continue;
            };
            if best.map_or(true, |b| score > b.score) {
                best = Some(Peak { x, y, score });
            }
        }
    }
    best
}

impl Kernel for ZnccMaskedScalar {
    type Plan = MaskedTemplatePlan;

    fn score_at(
        image: ImageView<'_, u8>,
        tpl: &Self::Plan,
        x: usize,
        y: usize,
        min_var_i: f32,
    ) -> Option<f32> {
        let (max_x, max_y) = placement_range(image, tpl.width(), tpl.height())?;
        if x > max_x || y > max_y {
            return None;
        }

        let tpl_width = tpl.width();
        let t_prime = tpl.t_prime();
        let mask = tpl.mask();
        let mut dot = 0.0f32;
        let mut sum_i = 0.0f32;
        let mut sum_i2 = 0.0f32;
        for ty in 0..tpl.height() {
            let img_row = image.row(y + ty)?;
            let base = ty * tpl_width;
            for tx in 0..tpl_width {
                let idx = base + tx;
                if mask[idx] == 0 {
                    continue;
                }
                let value = f32::from(img_row[x + tx]);
                dot += t_prime[idx] * value;
                sum_i += value;
                sum_i2 += value * value;
            }
        }

        let var_i = sum_i2 - (sum_i * sum_i) / tpl.sum_w();
        if var_i <= min_var_i {
            return None;
        }
        let score = dot / (tpl.var_t() * var_i).sqrt();
        score.is_finite().then_some(score)
    }

    fn scan_best(image: ImageView<'_, u8>, tpl: &Self::Plan, min_var_i: f32) -> Option<Peak> {
        let (max_x, max_y) = placement_range(image, tpl.width(), tpl.height())?;
        scan_with(max_x, max_y, |x, y| {
            Self::score_at(image, tpl, x, y, min_var_i)
        })
    }
}

impl Kernel for ZnccUnmaskedScalar {
    type Plan = TemplatePlan;

    fn score_at(
        image: ImageView<'_, u8>,
        tpl: &Self::Plan,
        x: usize,
        y: usize,
        min_var_i: f32,
    ) -> Option<f32> {
        let (max_x, max_y) = placement_range(image, tpl.width(), tpl.height())?;
        if x > max_x || y > max_y {
            return None;
        }

        let tpl_width = tpl.width();
        let zero_mean = tpl.zero_mean();
        let n = (tpl_width * tpl.height()) as f32;
        let mut dot = 0.0f32;
        let mut sum_i = 0.0f32;
        let mut sum_i2 = 0.0f32;
        for ty in 0..tpl.height() {
            let img_row = image.row(y + ty)?;
            let base = ty * tpl_width;
            for tx in 0..tpl_width {
                let value = f32::from(img_row[x + tx]);
                dot += zero_mean[base + tx] * value;
                sum_i += value;
                sum_i2 += value * value;
            }
        }

        let var_i = sum_i2 - (sum_i * sum_i) / n;
        if var_i <= min_var_i {
            return None;
        }
        let score = dot / (tpl.var_t() * var_i).sqrt();
        score.is_finite().then_some(score)
    }

    fn scan_best(image: ImageView<'_, u8>, tpl: &Self::Plan, min_var_i: f32) -> Option<Peak> {
        let (max_x, max_y) = placement_range(image, tpl.width(), tpl.height())?;
        scan_with(max_x, max_y, |x, y| {
            Self::score_at(image, tpl, x, y, min_var_i)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ZnccMaskedScalar, ZnccUnmaskedScalar};
    use crate::kernel::Kernel;
    use crate::template::{MaskedTemplatePlan, TemplatePlan};
    use crate::ImageView;

    fn pattern(width: usize, height: usize) -> Vec<u8> {
        (0..width * height)
            .map(|i| {
                let (x, y) = (i % width, i / width);
                (((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF) as u8
            })
            .collect()
    }

    #[test]
    fn unmasked_scan_finds_embedded_patch() {
        let img = pattern(24, 20);
        let view = ImageView::from_slice(&img, 24, 20).unwrap();
        let patch = view.roi(9, 6, 8, 8).unwrap().to_owned_image();
        let plan = TemplatePlan::from_view(patch.view()).unwrap();

        let peak = ZnccUnmaskedScalar::scan_best(view, &plan, 1e-3).unwrap();
        assert_eq!((peak.x, peak.y), (9, 6));
        assert!(peak.score > 0.999);
    }

    #[test]
    fn masked_scan_with_full_mask_matches_unmasked() {
        let img = pattern(16, 16);
        let view = ImageView::from_slice(&img, 16, 16).unwrap();
        let patch = view.roi(3, 4, 6, 6).unwrap().to_owned_image();
        let plain = TemplatePlan::from_view(patch.view()).unwrap();
        let masked = MaskedTemplatePlan::from_view_mask(patch.view(), &[1u8; 36]).unwrap();

        let a = ZnccUnmaskedScalar::score_at(view, &plain, 5, 5, 1e-3).unwrap();
        let b = ZnccMaskedScalar::score_at(view, &masked, 5, 5, 1e-3).unwrap();
        assert!((a - b).abs() < 1e-4);
    }

    #[test]
    fn flat_image_has_no_peak() {
        let img = vec![128u8; 100];
        let view = ImageView::from_slice(&img, 10, 10).unwrap();
        let tpl = pattern(4, 4);
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 4, 4).unwrap()).unwrap();
        assert!(ZnccUnmaskedScalar::scan_best(view, &plan, 1e-3).is_none());
    }
}
