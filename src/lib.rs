//! Patchstyle computes dense patch correspondences between image pairs and
//! uses them to synthesize stylized images.
//!
//! For every pyramid level, coarsest first, a nearest-neighbor field (NNF) is
//! seeded from the coarser level, refined with PatchMatch (optionally after a
//! reverse "knee point" pass whose best matches are pinned into the forward
//! field and withheld from every other target patch), and finally
//! applied by patch averaging to produce the stylized target. Per-pixel stages
//! can run in parallel via the `rayon` feature.

pub mod algorithm;
pub mod backend;
pub mod config;
pub mod geometry;
pub mod image;
pub mod lowlevel;
pub mod metric;
pub mod nnf;
mod trace;
pub mod util;

pub use algorithm::synthesis::StyleTransfer;
pub use algorithm::{
    apply_nnf, knee_blacklist, patch_match, patch_match_constrained, pin_knee_matches, upscale_nnf,
};
pub use backend::{Backend, Direction, MatchConstraints, MatchParams, MatchReport};
pub use config::{BackendKind, StyleConfig};
pub use geometry::{Coord, Dimensions};
pub use crate::image::pyramid::{ImagePair, LevelImages, Pyramid, PyramidLevel};
pub use crate::image::{FeatureVector, Image};
pub use metric::calculate_error;
pub use nnf::{Nnf, PinnedMask};
pub use util::{StyleError, StyleResult};

#[cfg(feature = "image-io")]
pub use crate::image::io;
