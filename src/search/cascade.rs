//! Confidence-gated cascade over transformed views of one image.
//!
//! The identity view is scored first. Below the confidence threshold the
//! cascade walks the transform batches in priority order (brightness and
//! contrast, perspective skews, inversion). A candidate replaces the
//! running best only when it beats it by more than the margin, and the
//! first replacement that reaches the threshold ends the search.
//!
//! Inversion is only tried on bright images: the source mean luminance
//! must exceed the configured cutoff.

use crate::candidate::{BatchKind, Candidate, CascadeSpace, Corner};
use crate::image::{ImageView, OwnedImage};
use crate::score::{guarded, Label, Region, ScoreResult, ViewScorer};
use crate::search::fold::{Improvement, Reduction, Scored, Stop};
use crate::search::{SearchBudget, SearchState, SearchStats, Termination};
use crate::trace::{trace_event, trace_span};
use crate::transform;
use crate::util::{DiceMatchError, DiceMatchResult};

/// Parameters for [`CascadeSearch`].
#[derive(Clone, Debug, PartialEq)]
pub struct CascadeConfig {
    /// Confidence that accepts a candidate immediately.
    pub confidence_threshold: f32,
    /// Required improvement over the running best.
    pub margin: f32,
    pub contrast_gains: Vec<f32>,
    pub brightness_offsets: Vec<f32>,
    /// Skew magnitudes in pixels; negative values pull corners inward.
    pub skew_magnitudes: Vec<i32>,
    pub corners: Vec<Corner>,
    /// Inversion runs only when the mean luminance exceeds this.
    pub inversion_luminance_cutoff: f32,
    /// Fill value for pixels uncovered by a skew.
    pub fill_value: u8,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.88,
            margin: 0.06,
            contrast_gains: vec![0.4, 0.8, 1.0, 1.6, 1.8],
            brightness_offsets: vec![-20.0, 0.0, 10.0, 20.0, 50.0, 70.0],
            skew_magnitudes: vec![5, 10, 30, 50],
            corners: Corner::ALL.to_vec(),
            inversion_luminance_cutoff: 170.0,
            fill_value: 255,
        }
    }
}

impl CascadeConfig {
    /// Rejects configurations that cannot produce a search.
    pub fn validate(&self) -> DiceMatchResult<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(DiceMatchError::InvalidConfig {
                reason: "confidence threshold must be in [0, 1]",
            });
        }
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(DiceMatchError::InvalidConfig {
                reason: "margin must be finite and >= 0",
            });
        }
        if self.contrast_gains.is_empty() || self.brightness_offsets.is_empty() {
            return Err(DiceMatchError::InvalidConfig {
                reason: "brightness/contrast grid is empty",
            });
        }
        let grid = self.contrast_gains.iter().chain(&self.brightness_offsets);
        if grid.clone().any(|v| !v.is_finite()) {
            return Err(DiceMatchError::InvalidConfig {
                reason: "brightness/contrast values must be finite",
            });
        }
        if self.skew_magnitudes.contains(&0) {
            return Err(DiceMatchError::InvalidConfig {
                reason: "skew magnitude must be non-zero",
            });
        }
        if !self.inversion_luminance_cutoff.is_finite() {
            return Err(DiceMatchError::InvalidConfig {
                reason: "inversion cutoff must be finite",
            });
        }
        Ok(())
    }
}

/// Result of a cascade search.
#[derive(Clone, Debug, PartialEq)]
pub struct CascadeOutcome {
    pub label: Label,
    pub confidence: f32,
    pub region: Option<Region>,
    /// Transform that produced the best score.
    pub candidate: Candidate,
    /// The transformed view that was scored.
    pub view: OwnedImage,
    pub termination: Termination,
    pub stats: SearchStats,
}

impl CascadeOutcome {
    /// The winning score, for a [`crate::DecisionPolicy`].
    pub fn result(&self) -> ScoreResult {
        ScoreResult {
            label: self.label,
            confidence: self.confidence,
            region: self.region,
        }
    }
}

/// Candidate kept as best-so-far. Identity keeps no copy of the image.
#[derive(Debug)]
struct Viewed {
    candidate: Candidate,
    view: Option<OwnedImage>,
}

/// Cascade search with a validated configuration.
#[derive(Clone, Debug)]
pub struct CascadeSearch {
    cfg: CascadeConfig,
    space: CascadeSpace,
}

impl CascadeSearch {
    /// Validates `cfg` and builds the prioritized batches.
    pub fn new(cfg: CascadeConfig) -> DiceMatchResult<Self> {
        cfg.validate()?;
        let space = CascadeSpace::new(
            &cfg.contrast_gains,
            &cfg.brightness_offsets,
            &cfg.skew_magnitudes,
            &cfg.corners,
        );
        Ok(Self { cfg, space })
    }

    pub fn config(&self) -> &CascadeConfig {
        &self.cfg
    }

    pub fn space(&self) -> &CascadeSpace {
        &self.space
    }

    /// Runs the cascade without limits.
    pub fn run<S>(&self, image: ImageView<'_, u8>, scorer: &S) -> DiceMatchResult<CascadeOutcome>
    where
        S: ViewScorer + ?Sized,
    {
        self.run_with_budget(image, scorer, &SearchBudget::unlimited())
    }

    /// Runs the cascade, stopping early once `budget` is spent.
    ///
    /// Fails with [`DiceMatchError::NoValidCandidates`] when nothing,
    /// identity included, could be scored.
    pub fn run_with_budget<S>(
        &self,
        image: ImageView<'_, u8>,
        scorer: &S,
        budget: &SearchBudget,
    ) -> DiceMatchResult<CascadeOutcome>
    where
        S: ViewScorer + ?Sized,
    {
        let _guard = trace_span!("cascade_search", candidates = self.space.len() + 1).entered();
        let luminance = image.mean_luminance();
        let score = |candidate: Candidate| self.score_candidate(image, scorer, candidate);

        let (mut acc, mut stop) = self.reduction().fold([Candidate::Identity], budget, score);
        for batch in self.space.batches() {
            if stop.is_some() {
                break;
            }
            if batch.kind == BatchKind::Inversion && !self.inversion_gate(luminance, &acc) {
                continue;
            }
            trace_event!("batch_started", size = batch.candidates.len());
            (acc, stop) = acc.fold(batch.candidates.iter().copied(), budget, score);
        }
        self.finish(image, acc, stop)
    }

    /// Parallel variant of [`run`](Self::run). Each batch is scored on the
    /// rayon pool and reduced in enumeration order; once a batch yields an
    /// accept, later batches are not started. The accepted candidate
    /// matches the sequential search; `evaluations` counts the whole batch.
    #[cfg(feature = "rayon")]
    pub fn run_par<S>(&self, image: ImageView<'_, u8>, scorer: &S) -> DiceMatchResult<CascadeOutcome>
    where
        S: ViewScorer + Sync + ?Sized,
    {
        use rayon::prelude::*;

        let _guard = trace_span!("cascade_search", candidates = self.space.len() + 1).entered();
        let luminance = image.mean_luminance();
        let score = |candidate: Candidate| self.score_candidate(image, scorer, candidate);

        let (mut acc, mut stop) = self.reduction().fold_scored([score(Candidate::Identity)]);
        let mut evaluated = acc.stats.evaluations;
        for batch in self.space.batches() {
            if stop.is_some() {
                break;
            }
            if batch.kind == BatchKind::Inversion && !self.inversion_gate(luminance, &acc) {
                continue;
            }
            let scored: Vec<_> = batch.candidates.par_iter().map(|&c| score(c)).collect();
            evaluated += scored.len();
            (acc, stop) = acc.fold_scored(scored);
        }
        acc.stats.evaluations = evaluated;
        self.finish(image, acc, stop)
    }

    fn reduction(&self) -> Reduction<Viewed> {
        Reduction::new(
            Improvement::Margin(self.cfg.margin),
            Some(self.cfg.confidence_threshold),
        )
    }

    fn score_candidate<S>(&self, image: ImageView<'_, u8>, scorer: &S, candidate: Candidate) -> Scored<Viewed>
    where
        S: ViewScorer + ?Sized,
    {
        if candidate == Candidate::Identity {
            let result = guarded(|| scorer.score(image))?;
            return Ok((Viewed { candidate, view: None }, result));
        }
        let view = transform::apply(&candidate, image, self.cfg.fill_value)?;
        let result = guarded(|| scorer.score(view.view()))?;
        Ok((
            Viewed {
                candidate,
                view: Some(view),
            },
            result,
        ))
    }

    fn inversion_gate(&self, luminance: f32, acc: &Reduction<Viewed>) -> bool {
        let below_threshold = acc
            .best_confidence()
            .map_or(true, |best| best < self.cfg.confidence_threshold);
        let open = below_threshold && luminance > self.cfg.inversion_luminance_cutoff;
        trace_event!("inversion_gate", open = open, mean_luminance = luminance);
        open
    }

    fn finish(
        &self,
        image: ImageView<'_, u8>,
        acc: Reduction<Viewed>,
        stop: Option<Stop>,
    ) -> DiceMatchResult<CascadeOutcome> {
        let stats = acc.stats;
        let SearchState { candidate, result } = acc.best.ok_or(DiceMatchError::NoValidCandidates {
            evaluated: stats.evaluations,
        })?;
        let termination = match stop {
            Some(Stop::Accepted) => Termination::Accepted,
            Some(Stop::OutOfBudget) => Termination::OutOfBudget,
            None => Termination::Exhausted,
        };
        trace_event!(
            "cascade_done",
            termination = termination.as_str(),
            label = result.label.get(),
            confidence = result.confidence,
            evaluations = stats.evaluations
        );
        Ok(CascadeOutcome {
            label: result.label,
            confidence: result.confidence,
            region: result.region,
            candidate: candidate.candidate,
            view: candidate.view.unwrap_or_else(|| image.to_owned_image()),
            termination,
            stats,
        })
    }
}
