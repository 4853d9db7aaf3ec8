//! Run configuration shared by the matcher, upscaler and applicator.

use crate::backend::Backend;
use crate::util::{StyleError, StyleResult};

/// Which backend executes the algorithmic cores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum BackendKind {
    /// Sequential reference backend.
    #[default]
    Cpu,
    /// Rayon-parallel backend (requires the `rayon` feature).
    Parallel,
}

impl BackendKind {
    /// Instantiates the selected backend.
    pub fn create(self) -> StyleResult<Box<dyn Backend>> {
        match self {
            BackendKind::Cpu => Ok(Box::new(crate::backend::cpu::CpuBackend)),
            #[cfg(feature = "rayon")]
            BackendKind::Parallel => Ok(Box::new(crate::backend::rayon::RayonBackend)),
            #[cfg(not(feature = "rayon"))]
            BackendKind::Parallel => Err(StyleError::UnsupportedBackend(
                "parallel backend requires the `rayon` feature",
            )),
        }
    }
}

/// Parameters for nearest-neighbor field computation and synthesis.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct StyleConfig {
    /// Side length of the square patch window (positive, odd).
    pub patch_size: usize,
    /// Error weight per guide channel; its length is the guide channel count.
    pub guide_weights: Vec<f32>,
    /// Error weight per style channel; its length is the style channel count.
    pub style_weights: Vec<f32>,
    /// Maximum number of pyramid levels to build.
    pub num_levels: usize,
    /// PatchMatch sweeps per NNF computation.
    pub iterations: usize,
    /// Compute a reverse NNF first and blacklist its claimed patches.
    pub use_knee_point: bool,
    /// Seed for random initialization and random search.
    pub seed: u64,
    /// Initial random-search radius; defaults to the larger codomain side.
    pub search_radius: Option<usize>,
    /// Backend used for every stage.
    pub backend: BackendKind,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            patch_size: 5,
            guide_weights: vec![1.0; 3],
            style_weights: vec![1.0; 3],
            num_levels: 4,
            iterations: 6,
            use_knee_point: true,
            seed: 0,
            search_radius: None,
            backend: BackendKind::Cpu,
        }
    }
}

impl StyleConfig {
    /// Number of guide channels implied by the weights.
    pub fn guide_channels(&self) -> usize {
        self.guide_weights.len()
    }

    /// Number of style channels implied by the weights.
    pub fn style_channels(&self) -> usize {
        self.style_weights.len()
    }

    /// Checks every field against its documented range.
    pub fn validate(&self) -> StyleResult<()> {
        validate_patch_size(self.patch_size)?;
        if self.guide_weights.is_empty() {
            return Err(StyleError::InvalidConfig("guide_weights must not be empty"));
        }
        if self.style_weights.is_empty() {
            return Err(StyleError::InvalidConfig("style_weights must not be empty"));
        }
        let weights_ok = self
            .guide_weights
            .iter()
            .chain(&self.style_weights)
            .all(|w| w.is_finite() && *w >= 0.0);
        if !weights_ok {
            return Err(StyleError::InvalidConfig(
                "channel weights must be finite and non-negative",
            ));
        }
        if self.num_levels == 0 {
            return Err(StyleError::InvalidConfig("num_levels must be at least 1"));
        }
        if self.search_radius == Some(0) {
            return Err(StyleError::InvalidConfig("search_radius must be positive"));
        }
        Ok(())
    }
}

pub(crate) fn validate_patch_size(patch_size: usize) -> StyleResult<()> {
    if patch_size == 0 || patch_size % 2 == 0 {
        return Err(StyleError::InvalidPatchSize { patch_size });
    }
    Ok(())
}
