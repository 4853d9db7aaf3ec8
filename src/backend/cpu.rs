//! Sequential reference backend.
//!
//! PatchMatch sweeps are inherently sequential: each coordinate reads neighbor
//! mappings that may already have been updated earlier in the same sweep, which
//! is how good matches spread across the image within one pass. Every sweep
//! walks the domain in raster order; even sweeps consult the previous row and
//! column, odd sweeps the next ones. The row kernels for upscaling and
//! synthesis are shared with the parallel backend.

use crate::backend::{Backend, MatchConstraints, MatchParams, MatchReport};
use crate::geometry::{Coord, Dimensions};
use crate::image::pyramid::PyramidLevel;
use crate::image::{FeatureVector, Image};
use crate::metric::{mean_error, PatchMetric};
use crate::nnf::{Nnf, PinnedMask};
use crate::trace::{trace_event, trace_span};
use crate::util::math::patch_radius;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Single-threaded backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuBackend;

impl Backend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn patch_match_core(
        &self,
        metric: &PatchMetric<'_>,
        params: &MatchParams,
        nnf: &mut Nnf,
        constraints: &MatchConstraints<'_>,
    ) -> MatchReport {
        run_patch_match(metric, params, nnf, constraints, mean_error)
    }

    fn upscale_core(&self, patch_size: usize, half: &Nnf, full: &mut Nnf) {
        let target = full.target_dims();
        for (row, out) in full.rows_mut().enumerate() {
            upscale_row(patch_size, half, target, row, out);
        }
    }

    fn apply_core(&self, patch_size: usize, level: &mut PyramidLevel) {
        let PyramidLevel {
            images,
            forward_nnf,
            ..
        } = level;
        let source = &images.style.source;
        let target = &mut images.style.target;
        let channels = target.channels();
        let row_len = target.dims().cols * channels;
        let mut acc = FeatureVector::zeros(channels);
        for (row, out) in target.as_mut_slice().chunks_mut(row_len).enumerate() {
            apply_row(patch_size, source, forward_nnf, row, out, &mut acc);
        }
    }

    fn mean_error(&self, metric: &PatchMetric<'_>, nnf: &Nnf) -> f64 {
        mean_error(metric, nnf)
    }
}

/// Runs initialization and `params.iterations` sweeps over `nnf`.
///
/// `mean` evaluates the whole-field error when tracking is requested, so
/// backends can plug in a parallel evaluation.
pub(crate) fn run_patch_match<F>(
    metric: &PatchMetric<'_>,
    params: &MatchParams,
    nnf: &mut Nnf,
    constraints: &MatchConstraints<'_>,
    mean: F,
) -> MatchReport
where
    F: Fn(&PatchMetric<'_>, &Nnf) -> f64,
{
    let _span = trace_span!(
        "patch_match",
        direction = ?params.direction,
        iterations = params.iterations,
        blacklist = constraints.blacklist.is_some(),
        pinned = constraints.pinned.map_or(0, PinnedMask::count)
    )
    .entered();

    let codomain = nnf.target_dims();
    let available: Vec<Coord> = match constraints.blacklist {
        Some(blacklist) => codomain
            .raster()
            .filter(|c| blacklist.is_available(*c))
            .collect(),
        None => Vec::new(),
    };
    let mut sweeper = Sweeper {
        metric,
        blacklist: constraints.blacklist,
        pinned: constraints.pinned,
        available,
        codomain,
        radius: params.radius_for(codomain),
        rng: StdRng::seed_from_u64(params.seed),
    };

    if params.initialize {
        sweeper.initialize(nnf);
    }

    let mut report = MatchReport::default();
    if params.track_error {
        report.initial_error = Some(mean(metric, nnf));
    }

    let domain = nnf.source_dims();
    for pass in 0..params.iterations {
        let step = if pass % 2 == 0 { -1 } else { 1 };
        let mut updates = 0usize;
        for coord in domain.raster() {
            updates += usize::from(sweeper.visit(nnf, coord, step));
        }
        report.updates += updates;

        if params.track_error {
            let error = mean(metric, nnf);
            trace_event!("pass_error", pass = pass, updates = updates, error = error);
            report.pass_errors.push(error);
        }
    }

    report
}

struct Sweeper<'m, 'a> {
    metric: &'m PatchMetric<'a>,
    blacklist: Option<&'m Nnf>,
    pinned: Option<&'m PinnedMask>,
    /// Unclaimed codomain coordinates; empty without a blacklist.
    available: Vec<Coord>,
    codomain: Dimensions,
    radius: usize,
    rng: StdRng,
}

impl Sweeper<'_, '_> {
    /// In range and not claimed by the blacklist.
    #[inline]
    fn allowed(&self, candidate: Coord) -> bool {
        self.codomain.contains(candidate)
            && self.blacklist.map_or(true, |b| b.is_available(candidate))
    }

    #[inline]
    fn score(&self, domain: Coord, candidate: Coord) -> f32 {
        if self.allowed(candidate) {
            self.metric.error(domain, candidate)
        } else {
            f32::INFINITY
        }
    }

    #[inline]
    fn is_pinned(&self, domain: Coord) -> bool {
        self.pinned.is_some_and(|p| p.is_pinned(domain))
    }

    fn random_available(&mut self) -> Option<Coord> {
        if self.available.is_empty() {
            return None;
        }
        Some(self.available[self.rng.random_range(0..self.available.len())])
    }

    /// Random mappings for every unpinned coordinate, drawn from the
    /// unclaimed codomain when a blacklist leaves any.
    fn initialize(&mut self, nnf: &mut Nnf) {
        let rows = self.codomain.rows as i32;
        let cols = self.codomain.cols as i32;
        for domain in nnf.source_dims().raster() {
            if self.is_pinned(domain) {
                continue;
            }
            let codomain = match self.random_available() {
                Some(coord) => coord,
                None => Coord::new(self.rng.random_range(0..rows), self.rng.random_range(0..cols)),
            };
            nnf.set_mapping(domain, codomain);
        }
    }

    /// Propagation followed by random search at one coordinate.
    ///
    /// `step` is -1 to consult the earlier neighbors and +1 for the later ones.
    /// Pinned coordinates are skipped. A claimed mapping that nothing valid
    /// replaces is swapped for a random unclaimed one. Returns true if the
    /// mapping changed.
    fn visit(&mut self, nnf: &mut Nnf, domain: Coord, step: i32) -> bool {
        if self.is_pinned(domain) {
            return false;
        }
        let Some(current) = nnf.get_mapping(domain) else {
            return false;
        };
        let mut best = current;
        let mut best_err = self.score(domain, current);

        // Row candidate first; ties keep the earlier option.
        for delta in [Coord::new(step, 0), Coord::new(0, step)] {
            let Some(neighbor_map) = nnf.get_mapping(domain + delta) else {
                continue;
            };
            let candidate = neighbor_map - delta;
            let err = self.score(domain, candidate);
            if err < best_err {
                best = candidate;
                best_err = err;
            }
        }

        let center = best;
        self.search(domain, center, &mut best, &mut best_err);

        if !self.allowed(best) {
            if let Some(fallback) = self.random_available() {
                best = fallback;
            }
        }

        if best != current {
            nnf.set_mapping(domain, best);
            true
        } else {
            false
        }
    }

    /// Probes around `center` with a radius halved after every probe.
    fn search(&mut self, domain: Coord, center: Coord, best: &mut Coord, best_err: &mut f32) {
        let mut radius = self.radius;
        while radius >= 1 {
            let r = radius as i32;
            let offset = Coord::new(self.rng.random_range(-r..=r), self.rng.random_range(-r..=r));
            let probe = self.codomain.clamp(center + offset);
            let err = self.score(domain, probe);
            if err < *best_err {
                *best = probe;
                *best_err = err;
            }
            radius /= 2;
        }
    }
}

/// Upscales one full-resolution domain row.
pub(crate) fn upscale_row(
    patch_size: usize,
    half: &Nnf,
    full_target: Dimensions,
    row: usize,
    out: &mut [Option<Coord>],
) {
    let inset = patch_radius(patch_size);
    let half_domain = half.source_dims();
    let i = row as i32;
    for (col, slot) in out.iter_mut().enumerate() {
        let j = col as i32;
        let lookup = half_domain.clamp(Coord::new(i / 2, j / 2));
        let base = half.get_mapping(lookup).unwrap_or(lookup);
        let scaled = base * 2 + Coord::new(i % 2, j % 2);
        *slot = Some(full_target.clamp_inset(scaled, inset));
    }
}

/// Synthesizes one target row by voting over overlapping patches.
///
/// `out` holds `cols * channels` interleaved values; `acc` is scratch space
/// with one component per channel.
pub(crate) fn apply_row(
    patch_size: usize,
    source: &Image,
    forward: &Nnf,
    row: usize,
    out: &mut [f32],
    acc: &mut FeatureVector,
) {
    let r = patch_radius(patch_size);
    let channels = source.channels();
    for (col, out_px) in out.chunks_mut(channels).enumerate() {
        let here = Coord::new(row as i32, col as i32);
        acc.reset();
        let mut weight = 0u32;
        for dr in -r..=r {
            for dc in -r..=r {
                let offset = Coord::new(dr, dc);
                let Some(mapped) = forward.get_mapping(here + offset) else {
                    continue;
                };
                // Shift the contribution back so it lands on `here`.
                if let Some(px) = source.get(mapped - offset) {
                    *acc += px;
                    weight += 1;
                }
            }
        }

        if weight > 0 {
            *acc /= weight as f32;
            out_px.copy_from_slice(acc.as_slice());
            continue;
        }
        match forward.get_mapping(here) {
            Some(mapped) => out_px.copy_from_slice(source.pixel(source.dims().clamp(mapped))),
            None => out_px.fill(0.0),
        }
    }
}
