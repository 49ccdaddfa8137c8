//! dicematch recognizes which side of a die an image shows, and at what
//! orientation, by spending as few scorer calls as possible.
//!
//! Two searches drive an external or built-in scorer:
//!
//! - [`CoarseFineSearch`] finds the best `(label, angle)` pair with a sparse
//!   global scan followed by a dense scan around the winner, exiting early
//!   on a confident coarse match;
//! - [`CascadeSearch`] scores the unmodified image first and only then
//!   walks prioritized photometric and geometric variants, stopping at the
//!   first confident one.
//!
//! A [`DecisionPolicy`] turns the settled result into a [`Decision`].
//! Rayon-backed variants are available with the `rayon` feature.

pub mod bank;
pub mod candidate;
mod config;
mod decision;
pub mod image;
mod kernel;
pub mod lowlevel;
pub mod score;
pub mod search;
pub mod template;
mod trace;
pub mod transform;
pub mod util;

pub use bank::{Angle, TemplateBank};
pub use candidate::{Candidate, Corner};
pub use config::SearchConfig;
pub use decision::{Decision, DecisionPolicy};
#[cfg(feature = "image-io")]
pub use crate::image::io;
pub use crate::image::{ImageView, OwnedImage};
pub use score::{
    Label, OrientationScorer, Region, ScoreResult, TemplateClassifier, ViewScorer,
    ZnccOrientationScorer,
};
pub use search::{
    CascadeConfig, CascadeOutcome, CascadeSearch, CoarseFineSearch, OrientationCandidate,
    OrientationConfig, OrientationMatch, SearchBudget, SearchState, SearchStats, Termination,
};
pub use template::Template;
pub use util::{DiceMatchError, DiceMatchResult, Unscored};
