//! Coarse-to-fine angular search over `(label, angle)` pairs.
//!
//! The coarse pass scores every label at every coarse angle and keeps the
//! global argmax (labels ascending outer, angles ascending inner, first
//! maximum wins). A coarse winner at or above the early-exit threshold is
//! final. Otherwise the fine pass rescans the winner's label over the fine
//! angles inside a circular window around the winning angle.
//!
//! A label whose true peak sits between coarse samples can lose the coarse
//! pass to a competitor; refinement never revisits other labels.

use crate::bank::Angle;
use crate::candidate::AngularSpace;
use crate::score::{guarded, Label, OrientationScorer, Region, ScoreResult};
use crate::search::fold::{Improvement, Reduction, Scored, Stop};
use crate::search::{SearchBudget, SearchState, SearchStats, Termination};
use crate::trace::{trace_event, trace_span};
use crate::util::{DiceMatchError, DiceMatchResult};

/// Parameters for [`CoarseFineSearch`].
#[derive(Clone, Debug, PartialEq)]
pub struct OrientationConfig {
    /// Fine angular step in degrees.
    pub angle_step_deg: u16,
    /// Coarse step; coarse angles are fine angles divisible by it.
    pub coarse_step_deg: u16,
    /// Half-width of the fine window around the coarse winner.
    pub fine_half_range_deg: u16,
    /// Coarse confidence that skips refinement.
    pub early_exit_threshold: f32,
    /// Fill value for pixels uncovered by template rotation.
    pub fill_value: u8,
    /// Variance floor below which an image window is not correlated.
    pub min_var_i: f32,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            angle_step_deg: 10,
            coarse_step_deg: 30,
            fine_half_range_deg: 20,
            early_exit_threshold: 0.95,
            fill_value: 0,
            min_var_i: 1e-3,
        }
    }
}

impl OrientationConfig {
    /// Rejects configurations that cannot produce a search.
    pub fn validate(&self) -> DiceMatchResult<()> {
        if self.angle_step_deg == 0 || self.angle_step_deg >= 360 {
            return Err(DiceMatchError::InvalidConfig {
                reason: "angle step must be in 1..360",
            });
        }
        if self.coarse_step_deg == 0 || self.coarse_step_deg >= 360 {
            return Err(DiceMatchError::InvalidConfig {
                reason: "coarse step must be in 1..360",
            });
        }
        if !(0.0..=1.0).contains(&self.early_exit_threshold) {
            return Err(DiceMatchError::InvalidConfig {
                reason: "early exit threshold must be in [0, 1]",
            });
        }
        if !self.min_var_i.is_finite() || self.min_var_i < 0.0 {
            return Err(DiceMatchError::InvalidConfig {
                reason: "min_var_i must be finite and >= 0",
            });
        }
        Ok(())
    }
}

/// One point of the angular candidate space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrientationCandidate {
    pub label: Label,
    pub angle: Angle,
}

/// Result of a coarse-to-fine search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrientationMatch {
    pub label: Label,
    pub angle: Angle,
    pub confidence: f32,
    pub region: Option<Region>,
    pub termination: Termination,
    pub stats: SearchStats,
}

impl OrientationMatch {
    fn from_state(
        state: SearchState<OrientationCandidate>,
        termination: Termination,
        stats: SearchStats,
    ) -> Self {
        Self {
            label: state.result.label,
            angle: state.candidate.angle,
            confidence: state.result.confidence,
            region: state.result.region,
            termination,
            stats,
        }
    }

    /// The winning score, for a [`crate::DecisionPolicy`].
    pub fn result(&self) -> ScoreResult {
        ScoreResult {
            label: self.label,
            confidence: self.confidence,
            region: self.region,
        }
    }
}

/// Coarse-to-fine orientation search with a validated configuration.
#[derive(Clone, Debug)]
pub struct CoarseFineSearch {
    cfg: OrientationConfig,
    space: AngularSpace,
}

impl CoarseFineSearch {
    /// Validates `cfg` and builds the angular candidate space.
    pub fn new(cfg: OrientationConfig) -> DiceMatchResult<Self> {
        cfg.validate()?;
        let space = AngularSpace::new(cfg.angle_step_deg, cfg.coarse_step_deg)?;
        Ok(Self { cfg, space })
    }

    pub fn config(&self) -> &OrientationConfig {
        &self.cfg
    }

    pub fn space(&self) -> &AngularSpace {
        &self.space
    }

    /// Runs the search without limits.
    pub fn run<S>(&self, scorer: &S) -> DiceMatchResult<OrientationMatch>
    where
        S: OrientationScorer + ?Sized,
    {
        self.run_with_budget(scorer, &SearchBudget::unlimited())
    }

    /// Runs the search, stopping early once `budget` is spent.
    ///
    /// Fails with [`DiceMatchError::NoValidCandidates`] when no coarse
    /// candidate could be scored.
    pub fn run_with_budget<S>(&self, scorer: &S, budget: &SearchBudget) -> DiceMatchResult<OrientationMatch>
    where
        S: OrientationScorer + ?Sized,
    {
        let labels = sorted_labels(scorer.labels())?;
        let score = |c: OrientationCandidate| -> Scored<OrientationCandidate> {
            guarded(|| scorer.score(c.label, c.angle)).map(|r| (c, r))
        };

        let (coarse, stop) = {
            let _guard = trace_span!("coarse_pass", labels = labels.len(), angles = self.space.coarse().len())
                .entered();
            Reduction::new(Improvement::Strict, None).fold(self.coarse_candidates(&labels), budget, score)
        };
        let winner = self.coarse_winner(&coarse)?;
        if stop == Some(Stop::OutOfBudget) {
            return Ok(OrientationMatch::from_state(winner, Termination::OutOfBudget, coarse.stats));
        }
        if let Some(done) = self.early_exit(winner, coarse.stats) {
            return Ok(done);
        }

        let _guard = trace_span!("fine_pass", label = winner.candidate.label.get()).entered();
        let (fine, stop) = Reduction::new(Improvement::Strict, None)
            .with_stats(coarse.stats)
            .fold(self.fine_candidates(winner), budget, score);
        Ok(self.settle_fine(winner, fine, stop))
    }

    /// Parallel variant of [`run`](Self::run): each pass is scored on the
    /// rayon pool and reduced in logical order, so the winner matches the
    /// sequential search.
    #[cfg(feature = "rayon")]
    pub fn run_par<S>(&self, scorer: &S) -> DiceMatchResult<OrientationMatch>
    where
        S: OrientationScorer + Sync + ?Sized,
    {
        use rayon::prelude::*;

        let labels = sorted_labels(scorer.labels())?;
        let score_all = |candidates: Vec<OrientationCandidate>| -> Vec<Scored<OrientationCandidate>> {
            candidates
                .into_par_iter()
                .map(|c| guarded(|| scorer.score(c.label, c.angle)).map(|r| (c, r)))
                .collect()
        };

        let coarse_scored = score_all(self.coarse_candidates(&labels).collect());
        let (coarse, _) = Reduction::new(Improvement::Strict, None).fold_scored(coarse_scored);
        let winner = self.coarse_winner(&coarse)?;
        if let Some(done) = self.early_exit(winner, coarse.stats) {
            return Ok(done);
        }

        let fine_scored = score_all(self.fine_candidates(winner).collect());
        let (fine, stop) = Reduction::new(Improvement::Strict, None)
            .with_stats(coarse.stats)
            .fold_scored(fine_scored);
        Ok(self.settle_fine(winner, fine, stop))
    }

    fn coarse_candidates<'a>(&'a self, labels: &'a [Label]) -> impl Iterator<Item = OrientationCandidate> + 'a {
        labels.iter().flat_map(move |&label| {
            self.space
                .coarse()
                .iter()
                .map(move |&angle| OrientationCandidate { label, angle })
        })
    }

    fn fine_candidates(
        &self,
        winner: SearchState<OrientationCandidate>,
    ) -> impl Iterator<Item = OrientationCandidate> {
        let label = winner.candidate.label;
        self.space
            .window(winner.candidate.angle, self.cfg.fine_half_range_deg)
            .into_iter()
            .map(move |angle| OrientationCandidate { label, angle })
    }

    fn coarse_winner(
        &self,
        coarse: &Reduction<OrientationCandidate>,
    ) -> DiceMatchResult<SearchState<OrientationCandidate>> {
        let winner = coarse.best.ok_or(DiceMatchError::NoValidCandidates {
            evaluated: coarse.stats.evaluations,
        })?;
        trace_event!(
            "coarse_winner",
            label = winner.candidate.label.get(),
            angle = winner.candidate.angle.degrees(),
            confidence = winner.result.confidence
        );
        Ok(winner)
    }

    /// Ends the search on a confident coarse winner. The region is the one
    /// recorded when the winner was scored; scorers are pure, so re-scoring
    /// that candidate would report the same region.
    fn early_exit(
        &self,
        winner: SearchState<OrientationCandidate>,
        stats: SearchStats,
    ) -> Option<OrientationMatch> {
        if winner.result.confidence < self.cfg.early_exit_threshold {
            return None;
        }
        trace_event!("early_exit", confidence = winner.result.confidence);
        Some(OrientationMatch::from_state(winner, Termination::EarlyExit, stats))
    }

    /// The fine best wins after a complete fine pass. An interrupted fine
    /// pass only overrides the coarse winner with a strictly better score.
    fn settle_fine(
        &self,
        coarse_winner: SearchState<OrientationCandidate>,
        fine: Reduction<OrientationCandidate>,
        stop: Option<Stop>,
    ) -> OrientationMatch {
        let (best, termination) = match (fine.best, stop) {
            (Some(best), None) => (best, Termination::Refined),
            (None, None) => (coarse_winner, Termination::Refined),
            (Some(best), Some(_)) if best.result.confidence > coarse_winner.result.confidence => {
                (best, Termination::OutOfBudget)
            }
            (_, Some(_)) => (coarse_winner, Termination::OutOfBudget),
        };
        OrientationMatch::from_state(best, termination, fine.stats)
    }
}

fn sorted_labels(mut labels: Vec<Label>) -> DiceMatchResult<Vec<Label>> {
    labels.sort_unstable();
    labels.dedup();
    if labels.is_empty() {
        return Err(DiceMatchError::InvalidConfig {
            reason: "scorer reports no labels",
        });
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::{CoarseFineSearch, OrientationConfig};
    use crate::bank::Angle;
    use crate::score::{Label, OrientationScorer, ScoreResult};
    use crate::search::{SearchBudget, Termination};
    use crate::util::{DiceMatchError, Unscored};

    struct Constant(f32);

    impl OrientationScorer for Constant {
        fn labels(&self) -> Vec<Label> {
            vec![Label::new(2).unwrap(), Label::new(1).unwrap()]
        }

        fn score(&self, label: Label, _angle: Angle) -> Result<ScoreResult, Unscored> {
            Ok(ScoreResult::new(label, self.0))
        }
    }

    struct NeverScores;

    impl OrientationScorer for NeverScores {
        fn labels(&self) -> Vec<Label> {
            vec![Label::new(1).unwrap()]
        }

        fn score(&self, label: Label, angle: Angle) -> Result<ScoreResult, Unscored> {
            Err(Unscored::MissingTemplate {
                label: label.get(),
                angle_deg: angle.degrees(),
            })
        }
    }

    #[test]
    fn ties_resolve_to_lowest_label_and_angle() {
        let search = CoarseFineSearch::new(OrientationConfig::default()).unwrap();
        let found = search.run(&Constant(0.5)).unwrap();
        assert_eq!(found.label, Label::new(1).unwrap());
        assert_eq!(found.angle, Angle::ZERO);
        assert_eq!(found.termination, Termination::Refined);
    }

    #[test]
    fn all_unscored_is_an_error() {
        let search = CoarseFineSearch::new(OrientationConfig::default()).unwrap();
        let err = search.run(&NeverScores).unwrap_err();
        assert_eq!(err, DiceMatchError::NoValidCandidates { evaluated: 12 });
    }

    #[test]
    fn budget_inside_coarse_pass_returns_best_so_far() {
        let search = CoarseFineSearch::new(OrientationConfig::default()).unwrap();
        let found = search
            .run_with_budget(&Constant(0.5), &SearchBudget::evaluations(3))
            .unwrap();
        assert_eq!(found.termination, Termination::OutOfBudget);
        assert_eq!(found.stats.evaluations, 3);
        assert_eq!(found.label, Label::new(1).unwrap());
    }

    #[test]
    fn invalid_steps_are_rejected() {
        let mut cfg = OrientationConfig::default();
        cfg.angle_step_deg = 0;
        assert!(CoarseFineSearch::new(cfg).is_err());
        let mut cfg = OrientationConfig::default();
        cfg.coarse_step_deg = 360;
        assert!(CoarseFineSearch::new(cfg).is_err());
    }
}
