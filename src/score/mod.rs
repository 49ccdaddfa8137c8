//! The scorer contract consumed by every search.
//!
//! A scorer is a pure function from one candidate to a `(label, confidence,
//! region)` triple. Two shapes exist: [`OrientationScorer`] scores a
//! `(label, angle)` pair against a fixed probe (template correlation), and
//! [`ViewScorer`] scores an already-transformed view (trained classifier).
//! Scorer state such as a template bank or model weights is built once by
//! the caller and borrowed immutably by the searches.

use crate::bank::Angle;
use crate::util::Unscored;
use crate::ImageView;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

mod zncc;

pub use zncc::{TemplateClassifier, ZnccOrientationScorer};

/// Identifier of a die side, `1..=N`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label(u16);

impl Label {
    /// Creates a label; `0` is reserved and yields `None`.
    pub fn new(id: u16) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    /// Label for a zero-based class index (`index + 1`).
    pub fn from_index(index: usize) -> Option<Self> {
        u16::try_from(index + 1).ok().map(Self)
    }

    /// Returns the numeric side id.
    pub fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "side_{:02}", self.0)
    }
}

/// Axis-aligned rectangle in image coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

/// One scorer evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreResult {
    pub label: Label,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Where the scorer located the die, when it reports one.
    pub region: Option<Region>,
}

impl ScoreResult {
    /// Creates a result without a locating region.
    pub fn new(label: Label, confidence: f32) -> Self {
        Self {
            label,
            confidence,
            region: None,
        }
    }

    /// Reads a class-probability vector: the first maximum wins and its
    /// index maps to label `index + 1`.
    ///
    /// Returns `None` for an empty vector or non-finite probabilities.
    pub fn from_probabilities(probs: &[f32]) -> Option<Self> {
        let mut best: Option<(usize, f32)> = None;
        for (idx, &p) in probs.iter().enumerate() {
            if !p.is_finite() {
                return None;
            }
            if best.map_or(true, |(_, b)| p > b) {
                best = Some((idx, p));
            }
        }
        let (idx, p) = best?;
        Some(Self::new(Label::from_index(idx)?, p.clamp(0.0, 1.0)))
    }
}

/// Scores `(label, angle)` candidates against a probe bound at construction.
pub trait OrientationScorer {
    /// Labels this scorer can evaluate, in ascending order.
    fn labels(&self) -> Vec<Label>;

    /// Scores one label at one orientation.
    fn score(&self, label: Label, angle: Angle) -> Result<ScoreResult, Unscored>;
}

/// Scores a single transformed view of the input image.
pub trait ViewScorer {
    fn score(&self, view: ImageView<'_, u8>) -> Result<ScoreResult, Unscored>;
}

impl<F> ViewScorer for F
where
    F: Fn(ImageView<'_, u8>) -> Result<ScoreResult, Unscored>,
{
    fn score(&self, view: ImageView<'_, u8>) -> Result<ScoreResult, Unscored> {
        self(view)
    }
}

impl<T: OrientationScorer + ?Sized> OrientationScorer for &T {
    fn labels(&self) -> Vec<Label> {
        (**self).labels()
    }

    fn score(&self, label: Label, angle: Angle) -> Result<ScoreResult, Unscored> {
        (**self).score(label, angle)
    }
}

/// Runs one scorer call, containing panics and rejecting confidences
/// outside `[0, 1]`. Every failure becomes an unscored candidate.
pub(crate) fn guarded<F>(call: F) -> Result<ScoreResult, Unscored>
where
    F: FnOnce() -> Result<ScoreResult, Unscored>,
{
    let result = catch_unwind(AssertUnwindSafe(call)).unwrap_or(Err(Unscored::ScorerPanicked))?;
    if !(0.0..=1.0).contains(&result.confidence) {
        return Err(Unscored::ScorerFailure(format!(
            "confidence {} outside [0, 1]",
            result.confidence
        )));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::{guarded, Label, ScoreResult};
    use crate::util::Unscored;

    #[test]
    fn probabilities_pick_first_maximum() {
        let result = ScoreResult::from_probabilities(&[0.1, 0.4, 0.4, 0.1]).unwrap();
        assert_eq!(result.label, Label::new(2).unwrap());
        assert!((result.confidence - 0.4).abs() < 1e-6);
        assert!(ScoreResult::from_probabilities(&[]).is_none());
        assert!(ScoreResult::from_probabilities(&[0.2, f32::NAN]).is_none());
    }

    #[test]
    fn label_zero_is_reserved() {
        assert!(Label::new(0).is_none());
        assert_eq!(Label::from_index(2).unwrap().get(), 3);
        assert_eq!(Label::new(4).unwrap().to_string(), "side_04");
    }

    #[test]
    fn guarded_contains_panics_and_bad_confidence() {
        let panicked = guarded(|| panic!("model exploded"));
        assert_eq!(panicked, Err(Unscored::ScorerPanicked));

        let label = Label::new(1).unwrap();
        let too_high = guarded(|| Ok(ScoreResult::new(label, 1.5)));
        assert!(matches!(too_high, Err(Unscored::ScorerFailure(_))));
        let nan = guarded(|| Ok(ScoreResult::new(label, f32::NAN)));
        assert!(matches!(nan, Err(Unscored::ScorerFailure(_))));
    }
}
