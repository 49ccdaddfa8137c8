//! Candidate space generation.
//!
//! Generation is pure and infallible; configuration is validated before a
//! space is built.

use crate::bank::{Angle, AngleGrid};
use crate::candidate::{Candidate, Corner};
use crate::util::{DiceMatchError, DiceMatchResult};

/// Fine angles `A` and the coarse subset `C ⊆ A` for the angular search.
#[derive(Clone, Debug)]
pub struct AngularSpace {
    grid: AngleGrid,
    coarse: Vec<Angle>,
}

impl AngularSpace {
    /// Builds `A = {0, step, ...} < 360` and `C = {a ∈ A : a % coarse_step == 0}`.
    pub fn new(angle_step_deg: u16, coarse_step_deg: u16) -> DiceMatchResult<Self> {
        if coarse_step_deg == 0 {
            return Err(DiceMatchError::InvalidConfig {
                reason: "coarse step must be > 0",
            });
        }
        let grid = AngleGrid::new(angle_step_deg)?;
        let coarse = grid.coarse_subset(coarse_step_deg);
        Ok(Self { grid, coarse })
    }

    /// The fine grid.
    pub fn grid(&self) -> &AngleGrid {
        &self.grid
    }

    /// Fine angles in ascending order.
    pub fn fine(&self) -> &[Angle] {
        self.grid.angles()
    }

    /// Coarse angles in ascending order; always contains 0°.
    pub fn coarse(&self) -> &[Angle] {
        &self.coarse
    }

    /// Fine angles within `half_range_deg` of `center` (circular distance),
    /// in ascending degree order.
    pub fn window(&self, center: Angle, half_range_deg: u16) -> Vec<Angle> {
        self.grid.within(center, half_range_deg)
    }
}

/// Transform family of a cascade batch, in priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchKind {
    BrightnessContrast,
    PerspectiveSkew,
    Inversion,
}

/// Candidates of one transform family, in enumeration order.
#[derive(Clone, Debug)]
pub struct CandidateBatch {
    pub kind: BatchKind,
    pub candidates: Vec<Candidate>,
}

/// Prioritized transform batches tried after the identity candidate.
#[derive(Clone, Debug)]
pub struct CascadeSpace {
    batches: Vec<CandidateBatch>,
}

impl CascadeSpace {
    /// Builds the batches:
    ///
    /// 1. brightness/contrast: gains outer, offsets inner;
    /// 2. perspective skews: magnitudes outer, corners inner;
    /// 3. tonal inversion (a single candidate, gated at search time).
    pub fn new(gains: &[f32], offsets: &[f32], magnitudes: &[i32], corners: &[Corner]) -> Self {
        let brightness = gains
            .iter()
            .flat_map(|&gain| {
                offsets
                    .iter()
                    .map(move |&offset| Candidate::BrightnessContrast { gain, offset })
            })
            .collect();
        let skews = magnitudes
            .iter()
            .flat_map(|&magnitude| {
                corners
                    .iter()
                    .map(move |&corner| Candidate::PerspectiveSkew { corner, magnitude })
            })
            .collect();

        Self {
            batches: vec![
                CandidateBatch {
                    kind: BatchKind::BrightnessContrast,
                    candidates: brightness,
                },
                CandidateBatch {
                    kind: BatchKind::PerspectiveSkew,
                    candidates: skews,
                },
                CandidateBatch {
                    kind: BatchKind::Inversion,
                    candidates: vec![Candidate::Inversion],
                },
            ],
        }
    }

    /// Batches in priority order.
    pub fn batches(&self) -> &[CandidateBatch] {
        &self.batches
    }

    /// Total candidates across all batches (identity excluded).
    pub fn len(&self) -> usize {
        self.batches.iter().map(|b| b.candidates.len()).sum()
    }

    /// True when no batch holds a candidate.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::{AngularSpace, BatchKind, CascadeSpace};
    use crate::bank::Angle;
    use crate::candidate::{Candidate, Corner};

    #[test]
    fn coarse_subset_keeps_exact_multiples() {
        let space = AngularSpace::new(10, 30).unwrap();
        assert_eq!(space.fine().len(), 36);
        let coarse: Vec<u16> = space.coarse().iter().map(|a| a.degrees()).collect();
        assert_eq!(coarse, vec![0, 30, 60, 90, 120, 150, 180, 210, 240, 270, 300, 330]);
    }

    #[test]
    fn window_wraps_through_zero() {
        let space = AngularSpace::new(10, 30).unwrap();
        let window: Vec<u16> = space
            .window(Angle::new(0), 20)
            .iter()
            .map(|a| a.degrees())
            .collect();
        assert_eq!(window, vec![0, 10, 20, 340, 350]);
    }

    #[test]
    fn zero_coarse_step_is_rejected() {
        assert!(AngularSpace::new(10, 0).is_err());
    }

    #[test]
    fn cascade_batches_follow_priority_and_nesting() {
        let space = CascadeSpace::new(&[0.5, 2.0], &[-10.0, 10.0], &[5, 10], &Corner::ALL);
        let kinds: Vec<BatchKind> = space.batches().iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BatchKind::BrightnessContrast,
                BatchKind::PerspectiveSkew,
                BatchKind::Inversion
            ]
        );

        let bc = &space.batches()[0].candidates;
        assert_eq!(
            bc[1],
            Candidate::BrightnessContrast {
                gain: 0.5,
                offset: 10.0
            }
        );
        let skews = &space.batches()[1].candidates;
        assert_eq!(skews.len(), 8);
        assert_eq!(
            skews[4],
            Candidate::PerspectiveSkew {
                corner: Corner::TopLeft,
                magnitude: 10
            }
        );
        assert_eq!(space.len(), 4 + 8 + 1);
    }
}
