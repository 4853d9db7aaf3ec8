//! Error types for patchstyle.

use crate::geometry::{Coord, Dimensions};
use thiserror::Error;

/// Result alias for patchstyle operations.
pub type StyleResult<T> = std::result::Result<T, StyleError>;

/// Errors that can occur when computing or applying nearest-neighbor fields.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StyleError {
    /// The patch size is zero or even.
    #[error("patch size must be a positive odd integer, got {patch_size}")]
    InvalidPatchSize { patch_size: usize },
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// Image or NNF dimensions are zero.
    #[error("invalid dimensions: {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },
    /// A pixel buffer does not match `rows * cols * channels`.
    #[error("buffer length mismatch: expected {expected}, got {got}")]
    BufferLengthMismatch { expected: usize, got: usize },
    /// An image carries a different channel count than configured.
    #[error("{context}: expected {expected} channels, got {got}")]
    ChannelMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },
    /// Two coordinate spaces that must agree do not.
    #[error("{context}: expected dimensions {expected}, got {got}")]
    DimensionMismatch {
        context: &'static str,
        expected: Dimensions,
        got: Dimensions,
    },
    /// An NNF has domain coordinates without a mapping.
    #[error("{context}: {unmapped} domain coordinates are unmapped")]
    IncompleteNnf {
        context: &'static str,
        unmapped: usize,
    },
    /// An NNF maps a domain coordinate outside its codomain.
    #[error("mapping {domain} -> {codomain} lies outside codomain {target}")]
    MappingOutOfRange {
        domain: Coord,
        codomain: Coord,
        target: Dimensions,
    },
    /// A pyramid was constructed without levels.
    #[error("pyramid has no levels")]
    EmptyPyramid,
    /// The requested backend is not compiled in.
    #[error("backend not available: {0}")]
    UnsupportedBackend(&'static str),
    /// Image decoding or encoding failed.
    #[error("image I/O failed: {reason}")]
    ImageIo { reason: String },
    /// Processing of one pyramid level failed; the run is aborted.
    #[error("pyramid level {level} failed: {source}")]
    Level {
        level: usize,
        #[source]
        source: Box<StyleError>,
    },
}

impl StyleError {
    pub(crate) fn at_level(self, level: usize) -> Self {
        StyleError::Level {
            level,
            source: Box::new(self),
        }
    }
}
