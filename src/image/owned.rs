//! Owned contiguous `u8` images.

use crate::image::ImageView;
use crate::util::{DiceMatchError, DiceMatchResult};

/// Owned contiguous image buffer with interleaved channels.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
    channels: usize,
}

impl OwnedImage {
    /// Creates a single-channel image from a contiguous buffer.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> DiceMatchResult<Self> {
        Self::with_channels(data, width, height, 1)
    }

    /// Creates an interleaved image; the buffer length must match exactly.
    pub fn with_channels(
        data: Vec<u8>,
        width: usize,
        height: usize,
        channels: usize,
    ) -> DiceMatchResult<Self> {
        if width == 0 || height == 0 {
            return Err(DiceMatchError::InvalidDimensions { width, height });
        }
        if channels == 0 {
            return Err(DiceMatchError::UnsupportedChannels {
                expected: 1,
                got: 0,
            });
        }
        let needed = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(channels))
            .ok_or(DiceMatchError::InvalidDimensions { width, height })?;
        if data.len() != needed {
            return Err(DiceMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self::from_parts(data, width, height, channels))
    }

    /// Creates an image filled with a constant sample value.
    pub fn filled(width: usize, height: usize, channels: usize, value: u8) -> DiceMatchResult<Self> {
        let len = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(channels))
            .ok_or(DiceMatchError::InvalidDimensions { width, height })?;
        Self::with_channels(vec![value; len], width, height, channels)
    }

    pub(crate) fn from_parts(data: Vec<u8>, width: usize, height: usize, channels: usize) -> Self {
        debug_assert_eq!(data.len(), width * height * channels);
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_, u8> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            channels: self.channels,
            stride: self.width * self.channels,
        }
    }

    /// Returns the raw samples in row-major interleaved order.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the image and returns its samples.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of samples per pixel.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Converts to a single-channel image.
    ///
    /// Three- and four-channel inputs are read as RGB(A) and weighted with
    /// 0.299/0.587/0.114; other layouts average their channels.
    pub fn to_gray(&self) -> OwnedImage {
        if self.channels == 1 {
            return self.clone();
        }
        let gray = self
            .data
            .chunks_exact(self.channels)
            .map(|px| {
                let value = if self.channels >= 3 {
                    0.299 * f32::from(px[0]) + 0.587 * f32::from(px[1]) + 0.114 * f32::from(px[2])
                } else {
                    px.iter().map(|&v| f32::from(v)).sum::<f32>() / self.channels as f32
                };
                value.round().clamp(0.0, 255.0) as u8
            })
            .collect();
        Self::from_parts(gray, self.width, self.height, 1)
    }

    /// Mean over the color samples, on the 0–255 scale.
    pub fn mean_luminance(&self) -> f32 {
        self.view().mean_luminance()
    }
}
