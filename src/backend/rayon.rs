//! Rayon-parallel backend (feature-gated).
//!
//! Synthesis, upscaling and error evaluation are independent per output row
//! and run on the rayon pool. PatchMatch sweeps stay sequential because each
//! coordinate reads neighbors updated earlier in the same sweep; results are
//! identical to [`CpuBackend`](crate::backend::cpu::CpuBackend).

use crate::backend::cpu::{apply_row, run_patch_match, upscale_row};
use crate::backend::{Backend, MatchConstraints, MatchParams, MatchReport};
use crate::geometry::Coord;
use crate::image::pyramid::PyramidLevel;
use crate::image::FeatureVector;
use crate::metric::PatchMetric;
use crate::nnf::Nnf;
use rayon::prelude::*;

/// Backend that parallelizes the per-pixel stages over rows.
#[derive(Clone, Copy, Debug, Default)]
pub struct RayonBackend;

impl Backend for RayonBackend {
    fn name(&self) -> &'static str {
        "rayon"
    }

    fn patch_match_core(
        &self,
        metric: &PatchMetric<'_>,
        params: &MatchParams,
        nnf: &mut Nnf,
        constraints: &MatchConstraints<'_>,
    ) -> MatchReport {
        run_patch_match(metric, params, nnf, constraints, mean_error_par)
    }

    fn upscale_core(&self, patch_size: usize, half: &Nnf, full: &mut Nnf) {
        let target = full.target_dims();
        full.par_rows_mut()
            .enumerate()
            .for_each(|(row, out)| upscale_row(patch_size, half, target, row, out));
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
        let forward: &Nnf = forward_nnf;
        target
            .as_mut_slice()
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each_init(
                || FeatureVector::zeros(channels),
                |acc, (row, out)| apply_row(patch_size, source, forward, row, out, acc),
            );
    }

    fn mean_error(&self, metric: &PatchMetric<'_>, nnf: &Nnf) -> f64 {
        mean_error_par(metric, nnf)
    }
}

/// Row-parallel mean patch error; matches [`crate::metric::mean_error`].
fn mean_error_par(metric: &PatchMetric<'_>, nnf: &Nnf) -> f64 {
    let dims = nnf.source_dims();
    let (sum, count) = (0..dims.rows)
        .into_par_iter()
        .map(|row| {
            let mut sum = 0.0f64;
            let mut count = 0usize;
            for col in 0..dims.cols {
                let domain = Coord::new(row as i32, col as i32);
                if let Some(codomain) = nnf.get_mapping(domain) {
                    sum += f64::from(metric.error(domain, codomain));
                    count += 1;
                }
            }
            (sum, count)
        })
        .reduce(|| (0.0, 0), |a, b| (a.0 + b.0, a.1 + b.1));
    if count == 0 {
        return 0.0;
    }
    sum / count as f64
}
