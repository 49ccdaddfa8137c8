//! Combined configuration, validated once before any image is processed.

use crate::decision::DecisionPolicy;
use crate::score::Label;
use crate::search::{CascadeConfig, CascadeSearch, CoarseFineSearch, OrientationConfig};
use crate::util::{DiceMatchError, DiceMatchResult};

/// Everything a run needs besides the scorer.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchConfig {
    /// Die sides to recognize.
    pub labels: Vec<Label>,
    pub orientation: OrientationConfig,
    pub cascade: CascadeConfig,
    pub decision: DecisionPolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            labels: (1..=6).filter_map(Label::new).collect(),
            orientation: OrientationConfig::default(),
            cascade: CascadeConfig::default(),
            decision: DecisionPolicy::default(),
        }
    }
}

impl SearchConfig {
    /// Validates each part, then the thresholds against each other: neither
    /// search may settle below the acceptance threshold.
    pub fn validate(&self) -> DiceMatchResult<()> {
        if self.labels.is_empty() {
            return Err(DiceMatchError::InvalidConfig {
                reason: "at least one label is required",
            });
        }
        self.orientation.validate()?;
        self.cascade.validate()?;
        self.decision.validate()?;

        let acceptance = self.decision.acceptance_threshold;
        if self.orientation.early_exit_threshold < acceptance {
            return Err(DiceMatchError::InvalidConfig {
                reason: "early exit threshold is below the acceptance threshold",
            });
        }
        if self.cascade.confidence_threshold < acceptance {
            return Err(DiceMatchError::InvalidConfig {
                reason: "cascade threshold is below the acceptance threshold",
            });
        }
        Ok(())
    }

    /// Validates and builds the orientation search.
    pub fn orientation_search(&self) -> DiceMatchResult<CoarseFineSearch> {
        self.validate()?;
        CoarseFineSearch::new(self.orientation.clone())
    }

    /// Validates and builds the cascade search.
    pub fn cascade_search(&self) -> DiceMatchResult<CascadeSearch> {
        self.validate()?;
        CascadeSearch::new(self.cascade.clone())
    }
}
