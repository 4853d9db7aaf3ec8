//! Per-pixel feature vectors, owned multi-channel images and pyramids.
//!
//! An [`Image`] stores `rows * cols * channels` interleaved `f32` values in a
//! single contiguous buffer. The channel count is a runtime value checked once
//! when a pyramid level is assembled, so per-pixel code works on borrowed
//! `&[f32]` slices and never allocates.

use crate::geometry::{Coord, Dimensions};
use crate::util::{StyleError, StyleResult};
use std::ops::{AddAssign, DivAssign};

#[cfg(feature = "image-io")]
pub mod io;
pub mod pyramid;

/// Fixed-length accumulator with one component per channel.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector {
    values: Vec<f32>,
}

impl FeatureVector {
    /// Creates a zeroed vector with `len` components.
    pub fn zeros(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
        }
    }

    /// Resets every component to zero.
    pub fn reset(&mut self) {
        self.values.fill(0.0);
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true for a zero-length vector.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Borrows the components.
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}

impl AddAssign<&[f32]> for FeatureVector {
    fn add_assign(&mut self, rhs: &[f32]) {
        debug_assert_eq!(self.values.len(), rhs.len());
        for (acc, value) in self.values.iter_mut().zip(rhs) {
            *acc += *value;
        }
    }
}

impl AddAssign<&FeatureVector> for FeatureVector {
    fn add_assign(&mut self, rhs: &FeatureVector) {
        *self += rhs.as_slice();
    }
}

impl DivAssign<f32> for FeatureVector {
    fn div_assign(&mut self, rhs: f32) {
        for value in &mut self.values {
            *value /= rhs;
        }
    }
}

/// Owned image with interleaved `f32` channels.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    data: Vec<f32>,
    dims: Dimensions,
    channels: usize,
}

impl Image {
    /// Creates a zero-filled image.
    pub fn new(dims: Dimensions, channels: usize) -> StyleResult<Self> {
        check_shape(dims, channels)?;
        Ok(Self {
            data: vec![0.0; dims.len() * channels],
            dims,
            channels,
        })
    }

    /// Wraps an interleaved buffer of exactly `rows * cols * channels` values.
    pub fn from_vec(data: Vec<f32>, dims: Dimensions, channels: usize) -> StyleResult<Self> {
        check_shape(dims, channels)?;
        let expected = dims.len() * channels;
        if data.len() != expected {
            return Err(StyleError::BufferLengthMismatch {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            dims,
            channels,
        })
    }

    /// Returns the image dimensions.
    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    /// Returns the number of channels per pixel.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the interleaved backing buffer.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Returns the channels at `coord`, or `None` outside the image.
    #[inline]
    pub fn get(&self, coord: Coord) -> Option<&[f32]> {
        let idx = self.dims.index_of(coord)?;
        let start = idx * self.channels;
        self.data.get(start..start + self.channels)
    }

    /// Returns the channels at `coord`.
    ///
    /// # Panics
    ///
    /// Panics if `coord` lies outside the image.
    #[inline]
    pub fn pixel(&self, coord: Coord) -> &[f32] {
        match self.get(coord) {
            Some(px) => px,
            None => panic!("pixel {coord} outside image {}", self.dims),
        }
    }

    /// Returns mutable channels at `coord`, or `None` outside the image.
    pub fn pixel_mut(&mut self, coord: Coord) -> Option<&mut [f32]> {
        let idx = self.dims.index_of(coord)?;
        let start = idx * self.channels;
        self.data.get_mut(start..start + self.channels)
    }

    /// Overwrites the pixel at `coord`; returns false if it lies outside.
    pub fn set_pixel(&mut self, coord: Coord, value: &[f32]) -> bool {
        match self.pixel_mut(coord) {
            Some(px) if px.len() == value.len() => {
                px.copy_from_slice(value);
                true
            }
            _ => false,
        }
    }

    /// Downsamples by two with a 2x2 box average; odd trailing rows/cols drop.
    pub fn downscale(&self) -> StyleResult<Image> {
        let dst_dims = self.dims.half();
        let mut dst = Image::new(dst_dims, self.channels)?;
        for coord in dst_dims.raster() {
            let base = coord * 2;
            let out = dst
                .pixel_mut(coord)
                .ok_or(StyleError::InvalidDimensions {
                    rows: dst_dims.rows,
                    cols: dst_dims.cols,
                })?;
            for (dr, dc) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                let src = self.pixel(base + Coord::new(dr, dc));
                for (acc, value) in out.iter_mut().zip(src) {
                    *acc += *value * 0.25;
                }
            }
        }
        Ok(dst)
    }
}

fn check_shape(dims: Dimensions, channels: usize) -> StyleResult<()> {
    if dims.is_empty() {
        return Err(StyleError::InvalidDimensions {
            rows: dims.rows,
            cols: dims.cols,
        });
    }
    if channels == 0 {
        return Err(StyleError::InvalidConfig("images need at least one channel"));
    }
    Ok(())
}
