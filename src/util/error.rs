//! Error types for dicematch.

use thiserror::Error;

/// Result alias for dicematch operations.
pub type DiceMatchResult<T> = std::result::Result<T, DiceMatchError>;

/// Errors that abort setup or a whole search.
///
/// Per-candidate failures are not errors at this level; they are reported
/// as [`Unscored`] and recovered inside the search loop.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DiceMatchError {
    /// A configuration value was rejected during validation.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: &'static str },
    /// Image dimensions are zero or overflow.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is shorter than a row of samples.
    #[error("invalid stride {stride} for row of {row_len} samples")]
    InvalidStride { row_len: usize, stride: usize },
    /// Backing buffer is smaller than the view requires.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Template has no usable contrast.
    #[error("degenerate template: {reason}")]
    DegenerateTemplate { reason: &'static str },
    /// The operation needs a different channel layout.
    #[error("unsupported channel count {got}, expected {expected}")]
    UnsupportedChannels { expected: usize, got: usize },
    /// Two templates were registered under the same label.
    #[error("duplicate label {label}")]
    DuplicateLabel { label: u16 },
    /// Every candidate of a search was unscored, including the first one.
    #[error("no valid candidates ({evaluated} evaluated, all unscored)")]
    NoValidCandidates { evaluated: usize },
    /// Image decoding failed.
    #[cfg(feature = "image-io")]
    #[error("image io: {reason}")]
    ImageIo { reason: String },
}

/// Why a single candidate produced no score.
///
/// An unscored candidate is excluded from every comparison; it is never
/// treated as confidence 0.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Unscored {
    /// The bank holds no template for this label/angle slot.
    #[error("no template for label {label} at {angle_deg} deg")]
    MissingTemplate { label: u16, angle_deg: u16 },
    /// The transform collapsed the image or could not be inverted.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(&'static str),
    /// No placement of the template had enough variance to correlate.
    #[error("no scorable placement")]
    FlatImage,
    /// The scorer reported a failure for this input.
    #[error("scorer failed: {0}")]
    ScorerFailure(String),
    /// The scorer panicked; the panic was contained.
    #[error("scorer panicked")]
    ScorerPanicked,
}

impl Unscored {
    /// Stable short name, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Unscored::MissingTemplate { .. } => "missing_template",
            Unscored::DegenerateGeometry(_) => "degenerate_geometry",
            Unscored::FlatImage => "flat_image",
            Unscored::ScorerFailure(_) => "scorer_failure",
            Unscored::ScorerPanicked => "scorer_panicked",
        }
    }
}
