//! Coarse-to-fine NNF computation and stylization over a pyramid.
//!
//! Levels run strictly one after another from coarsest to finest. A finer
//! level's forward NNF is seeded by upscaling the coarser one and applied once
//! to obtain a style estimate before PatchMatch refines it. With the knee point
//! enabled, a reverse NNF is refined first. Its best matches are written into
//! the forward NNF and pinned, and the source patches they use are withheld
//! from every other target coordinate.

use crate::algorithm::{
    apply_nnf, knee_blacklist, patch_match, patch_match_constrained, pin_knee_matches,
    upscale_nnf,
};
use crate::backend::{Backend, Direction, MatchConstraints, MatchParams};
use crate::config::StyleConfig;
use crate::image::pyramid::{Pyramid, PyramidLevel};
use crate::image::Image;
use crate::nnf::Nnf;
use crate::trace::{trace_event, trace_span};
use crate::util::math::mix_seed;
use crate::util::{StyleError, StyleResult};

/// Runs NNF computation and synthesis over a pyramid.
pub struct StyleTransfer {
    config: StyleConfig,
    backend: Box<dyn Backend>,
}

impl StyleTransfer {
    /// Validates `config` and instantiates its backend.
    pub fn new(config: StyleConfig) -> StyleResult<Self> {
        config.validate()?;
        let backend = config.backend.create()?;
        Ok(Self { config, backend })
    }

    /// Uses an explicit backend instead of `config.backend`.
    pub fn with_backend(config: StyleConfig, backend: Box<dyn Backend>) -> StyleResult<Self> {
        config.validate()?;
        Ok(Self { config, backend })
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &StyleConfig {
        &self.config
    }

    /// Returns the active backend.
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Computes every level's NNFs and returns the finest stylized target.
    ///
    /// Each level's `forward_nnf` (and `reverse_nnf` plus `blacklist` with the
    /// knee point enabled) is left in the pyramid. A failing level aborts the
    /// run.
    pub fn run(&self, pyramid: &mut Pyramid) -> StyleResult<Image> {
        let _span = trace_span!(
            "synthesize",
            levels = pyramid.len(),
            backend = self.backend.name()
        )
        .entered();

        for index in (0..pyramid.len()).rev() {
            self.process_level(pyramid, index)
                .map_err(|err| err.at_level(index))?;
        }
        Ok(pyramid.finest().stylized().clone())
    }

    fn process_level(&self, pyramid: &mut Pyramid, index: usize) -> StyleResult<()> {
        let _span = trace_span!("level", level = index).entered();
        let backend = self.backend.as_ref();

        let seeded = match pyramid.finer_and_coarser(index) {
            Some((level, coarser)) => {
                self.seed_from_coarser(level, coarser)?;
                true
            }
            None => false,
        };
        let level = pyramid
            .level_mut(index)
            .ok_or(StyleError::EmptyPyramid)?;

        // The coarsest level has no style estimate yet, so it matches on guides only.
        let guide_only;
        let config = if seeded {
            &self.config
        } else {
            guide_only = StyleConfig {
                style_weights: vec![0.0; self.config.style_channels()],
                ..self.config.clone()
            };
            &guide_only
        };

        let pinned = if config.use_knee_point {
            let mut reverse = level
                .reverse_nnf
                .take()
                .unwrap_or_else(|| Nnf::new(level.source_dims(), level.target_dims()));
            let params = MatchParams::from_config(config, Direction::Reverse)
                .with_initialize(!reverse.is_complete())
                .with_seed(self.stage_seed(index, Direction::Reverse));
            patch_match(backend, config, &level.images, &mut reverse, &params, None)?;

            let selection = knee_blacklist(config, &level.images, &reverse)?;
            trace_event!(
                "knee_point",
                claimed = selection.claimed(),
                knee_error = selection.knee_error.unwrap_or(f32::NAN)
            );
            let pinned = pin_knee_matches(&selection, &mut level.forward_nnf)?;
            level.reverse_nnf = Some(reverse);
            level.blacklist = Some(selection.blacklist);
            Some(pinned)
        } else {
            level.blacklist = None;
            None
        };

        let params = MatchParams::from_config(config, Direction::Forward)
            .with_initialize(!seeded)
            .with_seed(self.stage_seed(index, Direction::Forward));
        let PyramidLevel {
            images,
            forward_nnf,
            blacklist,
            ..
        } = &mut *level;
        let constraints = MatchConstraints {
            blacklist: blacklist.as_ref(),
            pinned: pinned.as_ref(),
        };
        let report = patch_match_constrained(
            backend,
            config,
            images,
            forward_nnf,
            &params,
            &constraints,
        )?;
        apply_nnf(backend, config, level)?;

        trace_event!("level_done", level = index, updates = report.updates);
        Ok(())
    }

    /// Upscales the coarser level's NNFs into `level` and pre-applies the
    /// forward one so the style target holds an estimate.
    fn seed_from_coarser(&self, level: &mut PyramidLevel, coarser: &PyramidLevel) -> StyleResult<()> {
        let backend = self.backend.as_ref();
        upscale_nnf(
            backend,
            &self.config,
            &coarser.forward_nnf,
            &mut level.forward_nnf,
        )?;
        apply_nnf(backend, &self.config, level)?;

        if let Some(coarse_reverse) = &coarser.reverse_nnf {
            let mut reverse = Nnf::new(level.source_dims(), level.target_dims());
            upscale_nnf(backend, &self.config, coarse_reverse, &mut reverse)?;
            level.reverse_nnf = Some(reverse);
        }
        Ok(())
    }

    fn stage_seed(&self, index: usize, direction: Direction) -> u64 {
        mix_seed(self.config.seed, index as u64 * 2 + direction.stage())
    }
}
