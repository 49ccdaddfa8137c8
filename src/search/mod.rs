//! Confidence-gated searches over candidate spaces.
//!
//! Both searches follow one pattern: score a candidate, keep the global best
//! under an explicit replacement rule, and stop as soon as a confidence bar
//! is cleared or the candidate space (or budget) runs out.
//!
//! Enumeration order is part of the contract: labels ascend by id, angles
//! ascend by degree, and cascade batches follow their priority order. Ties
//! always keep the first-encountered candidate.

mod cascade;
mod coarse_fine;
mod fold;

pub use cascade::{CascadeConfig, CascadeOutcome, CascadeSearch};
pub use coarse_fine::{CoarseFineSearch, OrientationCandidate, OrientationConfig, OrientationMatch};

use crate::score::ScoreResult;
use std::time::Instant;

/// Best result seen so far together with the candidate that produced it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchState<C> {
    pub candidate: C,
    pub result: ScoreResult,
}

/// How a search ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// Coarse winner cleared the high-confidence bar; no refinement ran.
    EarlyExit,
    /// The fine pass around the coarse winner completed.
    Refined,
    /// A cascade candidate reached the confidence threshold.
    Accepted,
    /// Every cascade candidate was tried without reaching the threshold.
    Exhausted,
    /// The budget ran out; the result is the best found before that.
    OutOfBudget,
}

impl Termination {
    pub fn as_str(self) -> &'static str {
        match self {
            Termination::EarlyExit => "early_exit",
            Termination::Refined => "refined",
            Termination::Accepted => "accepted",
            Termination::Exhausted => "exhausted",
            Termination::OutOfBudget => "out_of_budget",
        }
    }
}

/// Scorer invocation counts for one search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Scorer calls made, scored or not.
    pub evaluations: usize,
    /// Calls that produced no score.
    pub unscored: usize,
}

/// Limits checked before every scorer call.
///
/// A spent budget ends the search like exhaustion does: the caller gets the
/// best state found so far, not an error.
#[derive(Clone, Copy, Debug, Default)]
pub struct SearchBudget {
    pub max_evaluations: Option<usize>,
    pub deadline: Option<Instant>,
}

impl SearchBudget {
    /// No limits.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Stop after `n` scorer calls.
    pub fn evaluations(n: usize) -> Self {
        Self {
            max_evaluations: Some(n),
            deadline: None,
        }
    }

    /// Stop once `deadline` has passed.
    pub fn until(deadline: Instant) -> Self {
        Self {
            max_evaluations: None,
            deadline: Some(deadline),
        }
    }

    pub(crate) fn is_spent(&self, evaluations: usize) -> bool {
        if self.max_evaluations.is_some_and(|max| evaluations >= max) {
            return true;
        }
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}
