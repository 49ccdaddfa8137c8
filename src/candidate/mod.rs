//! Candidate transforms and the prioritized spaces they are drawn from.
//!
//! Candidates are plain values: generated once, never mutated, and scored
//! at most once per search.

mod space;

pub use space::{AngularSpace, BatchKind, CandidateBatch, CascadeSpace};

use crate::bank::Angle;
use std::fmt;

/// Image corner moved by a perspective skew.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// Canonical enumeration order.
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// Outward direction of the corner as `(dx, dy)` signs.
    pub(crate) fn outward(self) -> (f64, f64) {
        match self {
            Corner::TopLeft => (-1.0, -1.0),
            Corner::TopRight => (1.0, -1.0),
            Corner::BottomLeft => (-1.0, 1.0),
            Corner::BottomRight => (1.0, 1.0),
        }
    }

    /// Short name (`tl`, `tr`, `bl`, `br`).
    pub fn as_str(self) -> &'static str {
        match self {
            Corner::TopLeft => "tl",
            Corner::TopRight => "tr",
            Corner::BottomLeft => "bl",
            Corner::BottomRight => "br",
        }
    }
}

/// A transform applied to the input image before scoring.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Candidate {
    /// The unmodified image.
    Identity,
    /// Counter-clockwise rotation about the image center.
    Rotation { angle: Angle },
    /// Per-sample `|gain * v + offset|`, saturated to `[0, 255]`.
    BrightnessContrast { gain: f32, offset: f32 },
    /// One corner dragged outward by `magnitude` pixels on both axes.
    PerspectiveSkew { corner: Corner, magnitude: i32 },
    /// Tonal inversion `255 - v`.
    Inversion,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Candidate::Identity => write!(f, "identity"),
            Candidate::Rotation { angle } => write!(f, "rotate({angle})"),
            Candidate::BrightnessContrast { gain, offset } => {
                write!(f, "gain={gain:.2},offset={offset:+}")
            }
            Candidate::PerspectiveSkew { corner, magnitude } => {
                write!(f, "skew({},{magnitude}px)", corner.as_str())
            }
            Candidate::Inversion => write!(f, "invert"),
        }
    }
}
