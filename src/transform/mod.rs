//! Materializing candidates as transformed views.

mod photometric;
mod warp;

pub use photometric::{brightness_contrast, invert};
pub use warp::{perspective_skew, skew_homography};

use crate::candidate::Candidate;
use crate::image::{ImageView, OwnedImage};
use crate::template::rotate::rotate_u8_bilinear;
use crate::util::Unscored;

/// Applies `candidate` to `src`. Geometric transforms fill uncovered pixels
/// with `fill`.
///
/// Fails with [`Unscored::DegenerateGeometry`] when the transform cannot
/// produce a valid view; callers skip such candidates.
pub fn apply(candidate: &Candidate, src: ImageView<'_, u8>, fill: u8) -> Result<OwnedImage, Unscored> {
    match *candidate {
        Candidate::Identity => Ok(src.to_owned_image()),
        Candidate::Rotation { angle } => {
            Ok(rotate_u8_bilinear(src, f32::from(angle.degrees()), fill))
        }
        Candidate::BrightnessContrast { gain, offset } => Ok(brightness_contrast(src, gain, offset)),
        Candidate::PerspectiveSkew { corner, magnitude } => {
            perspective_skew(src, corner, magnitude, fill)
        }
        Candidate::Inversion => Ok(invert(src)),
    }
}
