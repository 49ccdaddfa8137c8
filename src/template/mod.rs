//! Template storage and planning utilities.

use crate::image::{ImageView, OwnedImage};
use crate::util::{DiceMatchError, DiceMatchResult};

mod plan;
pub mod rotate;

pub use plan::{MaskedTemplatePlan, TemplatePlan};

/// Owned single-channel template image for one die side.
#[derive(Clone, Debug)]
pub struct Template {
    img: OwnedImage,
}

impl Template {
    /// Creates a template from a contiguous grayscale buffer.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> DiceMatchResult<Self> {
        let img = OwnedImage::new(data, width, height)?;
        Ok(Self { img })
    }

    /// Wraps an owned image, converting it to grayscale when needed.
    pub fn from_image(img: OwnedImage) -> Self {
        Self { img: img.to_gray() }
    }

    /// Creates a template by copying a single-channel view.
    pub fn from_view(view: ImageView<'_, u8>) -> DiceMatchResult<Self> {
        if view.channels() != 1 {
            return Err(DiceMatchError::UnsupportedChannels {
                expected: 1,
                got: view.channels(),
            });
        }
        Ok(Self {
            img: view.to_owned_image(),
        })
    }

    /// Returns a borrowed view of the template data.
    pub fn view(&self) -> ImageView<'_, u8> {
        self.img.view()
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.img.width()
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.img.height()
    }
}
