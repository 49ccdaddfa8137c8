//! Final acceptance of a search result.

use crate::score::{Label, Region, ScoreResult};
use crate::util::{DiceMatchError, DiceMatchResult};
use std::fmt;

/// Acceptance policy applied after a search has settled.
///
/// The threshold is independent of, and usually lower than, the cascade's
/// confidence threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecisionPolicy {
    pub acceptance_threshold: f32,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.70,
        }
    }
}

impl DecisionPolicy {
    pub fn new(acceptance_threshold: f32) -> DiceMatchResult<Self> {
        let policy = Self {
            acceptance_threshold,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> DiceMatchResult<()> {
        if !(0.0..=1.0).contains(&self.acceptance_threshold) {
            return Err(DiceMatchError::InvalidConfig {
                reason: "acceptance threshold must be in [0, 1]",
            });
        }
        Ok(())
    }

    /// Accepts `result` at or above the threshold; otherwise reports the
    /// confidence that fell short. Never falls back to a label.
    pub fn decide(&self, result: &ScoreResult) -> Decision {
        if result.confidence >= self.acceptance_threshold {
            Decision::Recognized {
                label: result.label,
                confidence: result.confidence,
                region: result.region,
            }
        } else {
            Decision::Unrecognized {
                best_confidence: result.confidence,
            }
        }
    }
}

/// Outcome reported to callers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Decision {
    Recognized {
        label: Label,
        confidence: f32,
        region: Option<Region>,
    },
    Unrecognized {
        best_confidence: f32,
    },
}

impl Decision {
    pub fn label(&self) -> Option<Label> {
        match self {
            Decision::Recognized { label, .. } => Some(*label),
            Decision::Unrecognized { .. } => None,
        }
    }

    pub fn is_recognized(&self) -> bool {
        matches!(self, Decision::Recognized { .. })
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Recognized {
                label, confidence, ..
            } => write!(f, "{label} ({confidence:.2})"),
            Decision::Unrecognized { best_confidence } => {
                write!(f, "unrecognized ({best_confidence:.2})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Decision, DecisionPolicy};
    use crate::score::{Label, ScoreResult};

    #[test]
    fn threshold_is_inclusive() {
        let policy = DecisionPolicy::default();
        let label = Label::new(3).unwrap();
        let at = policy.decide(&ScoreResult::new(label, 0.70));
        assert_eq!(at.label(), Some(label));
        assert_eq!(at.to_string(), "side_03 (0.70)");

        let below = policy.decide(&ScoreResult::new(label, 0.62));
        assert_eq!(
            below,
            Decision::Unrecognized {
                best_confidence: 0.62
            }
        );
        assert_eq!(below.to_string(), "unrecognized (0.62)");
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        assert!(DecisionPolicy::new(1.2).is_err());
        assert!(DecisionPolicy::new(f32::NAN).is_err());
    }
}
