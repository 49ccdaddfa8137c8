//! Template plan precomputation for ZNCC scoring.
//!
//! Both plans store the zero-mean template `t'` and its energy
//! `var_t = sum(t'^2)` so a placement scores as
//! `dot(t', I) / sqrt(var_t * var_i)`.

use crate::image::ImageView;
use crate::util::{DiceMatchError, DiceMatchResult};

const MIN_TEMPLATE_VARIANCE: f64 = 1e-8;

/// Unmasked plan for upright templates.
#[derive(Clone, Debug)]
pub struct TemplatePlan {
    width: usize,
    height: usize,
    mean: f32,
    var_t: f32,
    zero_mean: Vec<f32>,
}

impl TemplatePlan {
    /// Builds a plan from a single-channel template view.
    pub fn from_view(tpl: ImageView<'_, u8>) -> DiceMatchResult<Self> {
        ensure_gray(tpl)?;
        let width = tpl.width();
        let height = tpl.height();
        let samples = collect_samples(tpl);
        let count = samples.len() as f64;

        let mean = samples.iter().map(|&v| f64::from(v)).sum::<f64>() / count;
        let zero_mean: Vec<f32> = samples.iter().map(|&v| (f64::from(v) - mean) as f32).collect();
        let var_t = zero_mean.iter().map(|&v| f64::from(v) * f64::from(v)).sum::<f64>();
        if var_t / count <= MIN_TEMPLATE_VARIANCE {
            return Err(DiceMatchError::DegenerateTemplate {
                reason: "zero variance",
            });
        }

        Ok(Self {
            width,
            height,
            mean: mean as f32,
            var_t: var_t as f32,
            zero_mean,
        })
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the mean intensity of the template.
    pub fn mean(&self) -> f32 {
        self.mean
    }

    /// Returns `sum(t'^2)`.
    pub fn var_t(&self) -> f32 {
        self.var_t
    }

    /// Returns the zero-mean template buffer in row-major order.
    pub fn zero_mean(&self) -> &[f32] {
        &self.zero_mean
    }
}

/// Plan for rotated templates whose corners hold fill pixels.
///
/// Only pixels with `mask == 1` enter the statistics; `t_prime` is zero
/// elsewhere so the dot product needs no branch.
#[derive(Clone, Debug)]
pub struct MaskedTemplatePlan {
    width: usize,
    height: usize,
    sum_w: f32,
    var_t: f32,
    t_prime: Vec<f32>,
    mask: Vec<u8>,
}

impl MaskedTemplatePlan {
    /// Builds a plan from a template view and a same-sized validity mask.
    pub fn from_view_mask(tpl: ImageView<'_, u8>, mask: &[u8]) -> DiceMatchResult<Self> {
        ensure_gray(tpl)?;
        let width = tpl.width();
        let height = tpl.height();
        let samples = collect_samples(tpl);
        if mask.len() != samples.len() {
            return Err(DiceMatchError::BufferTooSmall {
                needed: samples.len(),
                got: mask.len(),
            });
        }

        let mut sum_w = 0.0f64;
        let mut sum = 0.0f64;
        for (&value, &m) in samples.iter().zip(mask) {
            if m != 0 {
                sum_w += 1.0;
                sum += f64::from(value);
            }
        }
        if sum_w < 2.0 {
            return Err(DiceMatchError::DegenerateTemplate {
                reason: "mask covers fewer than two pixels",
            });
        }

        let mean = sum / sum_w;
        let mut var_t = 0.0f64;
        let t_prime: Vec<f32> = samples
            .iter()
            .zip(mask)
            .map(|(&value, &m)| {
                if m == 0 {
                    return 0.0;
                }
                let d = f64::from(value) - mean;
                var_t += d * d;
                d as f32
            })
            .collect();
        if var_t / sum_w <= MIN_TEMPLATE_VARIANCE {
            return Err(DiceMatchError::DegenerateTemplate {
                reason: "zero variance",
            });
        }

        Ok(Self {
            width,
            height,
            sum_w: sum_w as f32,
            var_t: var_t as f32,
            t_prime,
            mask: mask.iter().map(|&m| u8::from(m != 0)).collect(),
        })
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of valid (masked-in) pixels.
    pub fn sum_w(&self) -> f32 {
        self.sum_w
    }

    /// Returns `sum(t'^2)` over valid pixels.
    pub fn var_t(&self) -> f32 {
        self.var_t
    }

    /// Zero-mean template, zero outside the mask.
    pub fn t_prime(&self) -> &[f32] {
        &self.t_prime
    }

    /// Validity mask with values in `{0, 1}`.
    pub fn mask(&self) -> &[u8] {
        &self.mask
    }
}

fn ensure_gray(tpl: ImageView<'_, u8>) -> DiceMatchResult<()> {
    if tpl.channels() != 1 {
        return Err(DiceMatchError::UnsupportedChannels {
            expected: 1,
            got: tpl.channels(),
        });
    }
    Ok(())
}

fn collect_samples(tpl: ImageView<'_, u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(tpl.width() * tpl.height());
    for y in 0..tpl.height() {
        if let Some(row) = tpl.row(y) {
            out.extend_from_slice(row);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{MaskedTemplatePlan, TemplatePlan};
    use crate::image::ImageView;

    #[test]
    fn plan_matches_known_stats() {
        let data = [0u8, 1, 2, 3];
        let view = ImageView::from_slice(&data, 2, 2).unwrap();
        let plan = TemplatePlan::from_view(view).unwrap();
        assert!((plan.mean() - 1.5).abs() < 1e-6);
        assert!((plan.var_t() - 5.0).abs() < 1e-5);
        assert_eq!(plan.zero_mean(), &[-1.5, -0.5, 0.5, 1.5]);
    }

    #[test]
    fn masked_plan_ignores_fill_pixels() {
        let data = [0u8, 10, 20, 200];
        let view = ImageView::from_slice(&data, 2, 2).unwrap();
        let plan = MaskedTemplatePlan::from_view_mask(view, &[1, 1, 1, 0]).unwrap();
        assert_eq!(plan.sum_w(), 3.0);
        assert_eq!(plan.t_prime()[3], 0.0);
        assert!((plan.t_prime()[0] + 10.0).abs() < 1e-5);
        assert!((plan.var_t() - 200.0).abs() < 1e-3);
    }

    #[test]
    fn flat_template_is_rejected() {
        let data = [7u8; 9];
        let view = ImageView::from_slice(&data, 3, 3).unwrap();
        assert!(TemplatePlan::from_view(view).is_err());
    }
}
