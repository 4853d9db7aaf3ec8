//! Backend implementations of the matcher, upscaler and applicator cores.
//!
//! Every backend implements [`Backend`]; the contract checks live in
//! [`crate::algorithm`] so all backends see validated inputs only.

use crate::config::StyleConfig;
use crate::geometry::Dimensions;
use crate::image::pyramid::PyramidLevel;
use crate::metric::PatchMetric;
use crate::nnf::{Nnf, PinnedMask};

/// Which image pair an NNF explains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Target patches explained by source patches (target -> source).
    Forward,
    /// Source patches explained by target patches (source -> target).
    Reverse,
}

impl Direction {
    /// Stable index used to derive per-direction random streams.
    pub(crate) fn stage(self) -> u64 {
        match self {
            Direction::Forward => 0,
            Direction::Reverse => 1,
        }
    }
}

/// Per-call PatchMatch parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchParams {
    /// Which image pair plays domain and codomain.
    pub direction: Direction,
    /// Randomly initialize every mapping before the sweeps.
    pub initialize: bool,
    /// Number of propagation + search sweeps.
    pub iterations: usize,
    /// Seed for initialization and random search.
    pub seed: u64,
    /// Initial random-search radius; `None` uses the larger codomain side.
    pub search_radius: Option<usize>,
    /// Record the mean patch error before and after every sweep.
    pub track_error: bool,
}

impl MatchParams {
    /// Parameters taken from `config` for one direction.
    pub fn from_config(config: &StyleConfig, direction: Direction) -> Self {
        Self {
            direction,
            initialize: false,
            iterations: config.iterations,
            seed: config.seed,
            search_radius: config.search_radius,
            track_error: false,
        }
    }

    /// Enables or disables random initialization.
    pub fn with_initialize(mut self, initialize: bool) -> Self {
        self.initialize = initialize;
        self
    }

    /// Overrides the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enables per-sweep error tracking.
    pub fn with_error_tracking(mut self, track_error: bool) -> Self {
        self.track_error = track_error;
        self
    }

    pub(crate) fn radius_for(&self, codomain: Dimensions) -> usize {
        self.search_radius
            .unwrap_or_else(|| codomain.rows.max(codomain.cols))
    }
}

/// Summary of one PatchMatch call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatchReport {
    /// Mean error before the first sweep (after initialization).
    pub initial_error: Option<f64>,
    /// Mean error after each sweep.
    pub pass_errors: Vec<f64>,
    /// Number of mapping updates accepted across all sweeps.
    pub updates: usize,
}

/// Restrictions on which mappings a PatchMatch run may choose or change.
#[derive(Clone, Copy, Debug, Default)]
pub struct MatchConstraints<'a> {
    /// Opposite-direction NNF; codomain candidates it has mapped are unavailable.
    pub blacklist: Option<&'a Nnf>,
    /// Domain coordinates whose current mapping is kept as is.
    pub pinned: Option<&'a PinnedMask>,
}

/// Algorithmic cores shared by every execution strategy.
///
/// Inputs are validated by the wrappers in [`crate::algorithm`]: the NNF and
/// blacklist dimensions agree with the metric, and NNFs that are not being
/// initialized are total with in-range mappings. Pinned coordinates are
/// mapped and in range.
pub trait Backend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Refines `nnf` in place with PatchMatch.
    fn patch_match_core(
        &self,
        metric: &PatchMetric<'_>,
        params: &MatchParams,
        nnf: &mut Nnf,
        constraints: &MatchConstraints<'_>,
    ) -> MatchReport;

    /// Writes into `full` the upscaled mappings of `half`.
    fn upscale_core(&self, patch_size: usize, half: &Nnf, full: &mut Nnf);

    /// Synthesizes the level's style target from its forward NNF.
    fn apply_core(&self, patch_size: usize, level: &mut PyramidLevel);

    /// Mean patch error of `nnf` under `metric`.
    fn mean_error(&self, metric: &PatchMetric<'_>, nnf: &Nnf) -> f64;
}

pub mod cpu;

#[cfg(feature = "rayon")]
pub mod rayon;
