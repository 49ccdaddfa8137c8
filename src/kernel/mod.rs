//! Correlation kernels behind the built-in template scorers.
//!
//! A kernel scans every valid top-left placement of a template plan over a
//! single-channel image and reports the best-scoring placement.

use crate::ImageView;

/// Best placement found by a scan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    /// X coordinate (column) of the placement.
    pub x: usize,
    /// Y coordinate (row) of the placement.
    pub y: usize,
    /// ZNCC score at the placement, in `[-1, 1]`.
    pub score: f32,
}

/// Kernel trait for scoring and scan operations.
pub trait Kernel {
    type Plan;

    /// Computes the score at a single placement, or `None` when the image
    /// window is flat or the placement does not fit.
    fn score_at(
        image: ImageView<'_, u8>,
        plan: &Self::Plan,
        x: usize,
        y: usize,
        min_var_i: f32,
    ) -> Option<f32>;

    /// Scans the full placement range and returns the highest score.
    ///
    /// Ties keep the first placement in row-major order. Returns `None` when
    /// no placement can be scored.
    fn scan_best(image: ImageView<'_, u8>, plan: &Self::Plan, min_var_i: f32) -> Option<Peak>;
}

pub mod scalar;
