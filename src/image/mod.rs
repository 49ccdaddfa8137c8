//! Image views and owned buffers.
//!
//! `ImageView` is a borrowed 2D view into a 1D buffer with an explicit stride
//! and interleaved channels. The stride counts elements between the starts of
//! consecutive rows, so a stride larger than `width * channels` represents
//! padded rows. ROI slices are zero-copy views that retain the original stride.

use crate::util::{DiceMatchError, DiceMatchResult};

#[cfg(feature = "image-io")]
pub mod io;
mod owned;

pub use owned::OwnedImage;

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    channels: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous single-channel view.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> DiceMatchResult<Self> {
        Self::new(data, width, height, 1, width)
    }

    /// Creates a contiguous interleaved view with `channels` samples per pixel.
    pub fn from_interleaved(
        data: &'a [T],
        width: usize,
        height: usize,
        channels: usize,
    ) -> DiceMatchResult<Self> {
        let stride = width
            .checked_mul(channels)
            .ok_or(DiceMatchError::InvalidDimensions { width, height })?;
        Self::new(data, width, height, channels, stride)
    }

    /// Creates a view with an explicit stride (in elements).
    pub fn new(
        data: &'a [T],
        width: usize,
        height: usize,
        channels: usize,
        stride: usize,
    ) -> DiceMatchResult<Self> {
        let needed = required_len(width, height, channels, stride)?;
        if data.len() < needed {
            return Err(DiceMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of interleaved samples per pixel.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the samples of pixel `(x, y)` if it is within bounds.
    pub fn pixel(&self, x: usize, y: usize) -> Option<&'a [T]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = y
            .checked_mul(self.stride)?
            .checked_add(x.checked_mul(self.channels)?)?;
        self.data.get(start..start + self.channels)
    }

    /// Returns row `y` as `width * channels` samples.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width * self.channels)?;
        self.data.get(start..end)
    }

    /// Returns a zero-copy ROI view into the same backing buffer.
    pub fn roi(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> DiceMatchResult<ImageView<'a, T>> {
        if width == 0 || height == 0 {
            return Err(DiceMatchError::InvalidDimensions { width, height });
        }
        let fits = x
            .checked_add(width)
            .zip(y.checked_add(height))
            .is_some_and(|(end_x, end_y)| end_x <= self.width && end_y <= self.height);
        if !fits {
            return Err(DiceMatchError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let start = y * self.stride + x * self.channels;
        let data = self
            .data
            .get(start..)
            .ok_or(DiceMatchError::BufferTooSmall {
                needed: start.saturating_add(1),
                got: self.data.len(),
            })?;
        ImageView::new(data, width, height, self.channels, self.stride)
    }
}

impl ImageView<'_, u8> {
    /// Mean sample value on the 0–255 scale over at most the first three
    /// channels; a fourth (alpha) channel is ignored.
    pub fn mean_luminance(&self) -> f32 {
        let used = self.channels.min(3);
        let mut sum = 0u64;
        for y in 0..self.height {
            if let Some(row) = self.row(y) {
                sum += row
                    .chunks_exact(self.channels)
                    .flat_map(|px| &px[..used])
                    .map(|&v| u64::from(v))
                    .sum::<u64>();
            }
        }
        let count = (self.width * self.height * used) as f64;
        (sum as f64 / count) as f32
    }

    /// Copies the view into a contiguous owned image.
    pub fn to_owned_image(&self) -> OwnedImage {
        let row_len = self.width * self.channels;
        let mut data = Vec::with_capacity(row_len * self.height);
        for y in 0..self.height {
            if let Some(row) = self.row(y) {
                data.extend_from_slice(row);
            }
        }
        OwnedImage::from_parts(data, self.width, self.height, self.channels)
    }
}

fn required_len(
    width: usize,
    height: usize,
    channels: usize,
    stride: usize,
) -> DiceMatchResult<usize> {
    if width == 0 || height == 0 {
        return Err(DiceMatchError::InvalidDimensions { width, height });
    }
    if channels == 0 {
        return Err(DiceMatchError::UnsupportedChannels {
            expected: 1,
            got: 0,
        });
    }
    let row_len = width
        .checked_mul(channels)
        .ok_or(DiceMatchError::InvalidDimensions { width, height })?;
    if stride < row_len {
        return Err(DiceMatchError::InvalidStride { row_len, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(row_len))
        .ok_or(DiceMatchError::InvalidDimensions { width, height })
}
