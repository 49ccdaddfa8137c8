//! Loading probe and template images via the `image` crate.
//!
//! Available when the `image-io` feature is enabled. Probes are resized to
//! the scorer's fixed input size on load.

use crate::image::OwnedImage;
use crate::util::{DiceMatchError, DiceMatchResult};
use image::imageops::FilterType;
use std::path::Path;

/// Creates an owned single-channel image from a grayscale buffer.
pub fn owned_from_gray_image(img: &image::GrayImage) -> DiceMatchResult<OwnedImage> {
    OwnedImage::new(img.as_raw().clone(), img.width() as usize, img.height() as usize)
}

/// Creates an owned three-channel image from an RGB buffer.
pub fn owned_from_rgb_image(img: &image::RgbImage) -> DiceMatchResult<OwnedImage> {
    OwnedImage::with_channels(
        img.as_raw().clone(),
        img.width() as usize,
        img.height() as usize,
        3,
    )
}

fn open(path: &Path) -> DiceMatchResult<image::DynamicImage> {
    image::open(path).map_err(|err| DiceMatchError::ImageIo {
        reason: format!("{}: {err}", path.display()),
    })
}

fn resized(img: image::DynamicImage, size: Option<(u32, u32)>) -> image::DynamicImage {
    match size {
        Some((w, h)) if (w, h) != (img.width(), img.height()) => {
            img.resize_exact(w, h, FilterType::Triangle)
        }
        _ => img,
    }
}

/// Loads an image from disk as grayscale, optionally resizing it.
pub fn load_gray_image<P: AsRef<Path>>(
    path: P,
    size: Option<(u32, u32)>,
) -> DiceMatchResult<OwnedImage> {
    let img = resized(open(path.as_ref())?, size);
    owned_from_gray_image(&img.to_luma8())
}

/// Loads an image from disk as RGB, optionally resizing it.
pub fn load_rgb_image<P: AsRef<Path>>(
    path: P,
    size: Option<(u32, u32)>,
) -> DiceMatchResult<OwnedImage> {
    let img = resized(open(path.as_ref())?, size);
    owned_from_rgb_image(&img.to_rgb8())
}
