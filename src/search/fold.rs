//! Best-so-far reduction shared by both searches.
//!
//! A search is a `try_fold` over its lazily produced candidates. The
//! accumulator holds the running best; the replacement rule decides whether
//! a new score displaces it, and reaching the acceptance bar breaks out of
//! the fold.

use crate::score::ScoreResult;
use crate::search::{SearchBudget, SearchState, SearchStats};
use crate::trace::{trace_event, trace_warn};
use crate::util::Unscored;
use std::ops::ControlFlow;

/// Outcome of scoring one candidate: the state to keep if it wins, or why
/// it could not be scored.
pub(crate) type Scored<C> = Result<(C, ScoreResult), Unscored>;

/// Slack on the margin comparison. Confidences are `f32`, so a decimal
/// tie such as `0.48 + 0.06` vs `0.54` can land a few ulps either side.
const MARGIN_EPSILON: f64 = 1e-6;

/// When a new score replaces the current best.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Improvement {
    /// `new > best`; ties keep the earlier candidate.
    Strict,
    /// `new - best > margin`; exactly `best + margin` (up to
    /// [`MARGIN_EPSILON`]) does not replace.
    Margin(f32),
}

impl Improvement {
    fn beats(self, new: f32, best: f32) -> bool {
        match self {
            Improvement::Strict => new > best,
            Improvement::Margin(margin) => {
                f64::from(new) - f64::from(best) > f64::from(margin) + MARGIN_EPSILON
            }
        }
    }
}

/// Why a fold stopped before consuming all candidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Stop {
    Accepted,
    OutOfBudget,
}

/// Fold accumulator.
#[derive(Clone, Debug)]
pub(crate) struct Reduction<C> {
    pub(crate) best: Option<SearchState<C>>,
    pub(crate) stats: SearchStats,
    rule: Improvement,
    accept_at: Option<f32>,
}

impl<C> Reduction<C> {
    pub(crate) fn new(rule: Improvement, accept_at: Option<f32>) -> Self {
        Self {
            best: None,
            stats: SearchStats::default(),
            rule,
            accept_at,
        }
    }

    /// Continues from an earlier phase's counts with a fresh best.
    pub(crate) fn with_stats(mut self, stats: SearchStats) -> Self {
        self.stats = stats;
        self
    }

    pub(crate) fn best_confidence(&self) -> Option<f32> {
        self.best.as_ref().map(|b| b.result.confidence)
    }

    /// Folds one scorer outcome into the accumulator.
    pub(crate) fn absorb(mut self, outcome: Scored<C>) -> ControlFlow<(Self, Stop), Self> {
        self.stats.evaluations += 1;
        let (candidate, result) = match outcome {
            Ok(scored) => scored,
            Err(reason) => {
                self.stats.unscored += 1;
                trace_warn!(
                    "candidate_unscored",
                    reason = reason.kind(),
                    evaluation = self.stats.evaluations
                );
                return ControlFlow::Continue(self);
            }
        };

        let replaces = self
            .best_confidence()
            .map_or(true, |best| self.rule.beats(result.confidence, best));
        if !replaces {
            return ControlFlow::Continue(self);
        }

        trace_event!(
            "best_replaced",
            label = result.label.get(),
            confidence = result.confidence,
            evaluation = self.stats.evaluations
        );
        self.best = Some(SearchState { candidate, result });
        match self.accept_at {
            Some(bar) if result.confidence >= bar => ControlFlow::Break((self, Stop::Accepted)),
            _ => ControlFlow::Continue(self),
        }
    }

    /// Scores items in order until they run out, the budget is spent, or
    /// the acceptance bar is reached. The budget is checked before every
    /// call to `score`.
    pub(crate) fn fold<I, F>(self, items: I, budget: &SearchBudget, mut score: F) -> (Self, Option<Stop>)
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Scored<C>,
    {
        let flow = items.into_iter().try_fold(self, |acc, item| {
            if budget.is_spent(acc.stats.evaluations) {
                return ControlFlow::Break((acc, Stop::OutOfBudget));
            }
            acc.absorb(score(item))
        });
        settle(flow)
    }

    /// Folds outcomes computed ahead of time (e.g. in parallel), in their
    /// logical order.
    #[cfg_attr(not(feature = "rayon"), allow(dead_code))]
    pub(crate) fn fold_scored<I>(self, scored: I) -> (Self, Option<Stop>)
    where
        I: IntoIterator<Item = Scored<C>>,
    {
        let flow = scored.into_iter().try_fold(self, Reduction::absorb);
        settle(flow)
    }
}

fn settle<C>(flow: ControlFlow<(Reduction<C>, Stop), Reduction<C>>) -> (Reduction<C>, Option<Stop>) {
    match flow {
        ControlFlow::Continue(acc) => (acc, None),
        ControlFlow::Break((acc, stop)) => (acc, Some(stop)),
    }
}
