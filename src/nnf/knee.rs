//! Knee-point selection of reverse-NNF matches used as a forward blacklist.
//!
//! Sorting the reverse NNF's patch errors gives a convex curve: a run of good
//! matches followed by a steep tail. Matches up to the knee of that curve keep
//! their mapping and claim their source coordinate. The claimed pairs are
//! written into the forward NNF and pinned there, while every other target
//! coordinate may only pick unclaimed source patches.

use crate::geometry::Coord;
use crate::metric::PatchMetric;
use crate::nnf::Nnf;

/// Result of a knee-point selection.
#[derive(Clone, Debug, PartialEq)]
pub struct KneeSelection {
    /// Reverse NNF restricted to the claimed coordinates.
    pub blacklist: Nnf,
    /// Error at the knee, or `None` when the curve has no knee.
    pub knee_error: Option<f32>,
    claims: Vec<(Coord, Coord, f32)>,
}

impl KneeSelection {
    /// Number of claimed coordinates.
    pub fn claimed(&self) -> usize {
        self.blacklist.mapped_count()
    }

    /// Claimed matches flipped to `(target, source)`, one per target coordinate.
    ///
    /// A target claimed by several source patches keeps the lowest-error one,
    /// the earliest in raster order on ties. Output is in raster order of the
    /// claiming source coordinates.
    pub fn forward_pins(&self) -> Vec<(Coord, Coord)> {
        let targets = self.blacklist.target_dims();
        let mut best: Vec<Option<(Coord, f32)>> = vec![None; targets.len()];
        for &(source, target, err) in &self.claims {
            let Some(idx) = targets.index_of(target) else {
                continue;
            };
            if best[idx].map_or(true, |(_, e)| err < e) {
                best[idx] = Some((source, err));
            }
        }
        self.claims
            .iter()
            .filter_map(|&(source, target, _)| {
                let (winner, _) = best[targets.index_of(target)?]?;
                (winner == source).then_some((target, source))
            })
            .collect()
    }
}

/// Builds a blacklist from `reverse`, keeping matches at or below the knee.
///
/// `metric` must be bound to the reverse direction so that `reverse`'s domain
/// is the metric's domain.
pub fn knee_point_blacklist(metric: &PatchMetric<'_>, reverse: &Nnf) -> KneeSelection {
    let scored: Vec<_> = reverse
        .iter()
        .filter_map(|(domain, mapped)| {
            let codomain = mapped?;
            let err = metric.error(domain, codomain);
            err.is_finite().then_some((domain, codomain, err))
        })
        .collect();

    let mut sorted: Vec<f32> = scored.iter().map(|(_, _, err)| *err).collect();
    sorted.sort_by(f32::total_cmp);
    let knee_error = knee_index(&sorted).map(|idx| sorted[idx]);

    let mut blacklist = Nnf::new(reverse.source_dims(), reverse.target_dims());
    let claims: Vec<_> = match knee_error {
        Some(threshold) => scored
            .into_iter()
            .filter(|(_, _, err)| *err <= threshold)
            .collect(),
        None => Vec::new(),
    };
    for &(domain, codomain, _) in &claims {
        blacklist.set_mapping(domain, codomain);
    }

    KneeSelection {
        blacklist,
        knee_error,
        claims,
    }
}

/// Index of the point farthest below the chord of an ascending curve.
///
/// Both axes are normalized to `[0, 1]`; a flat or concave curve has no knee.
pub(crate) fn knee_index(sorted: &[f32]) -> Option<usize> {
    let n = sorted.len();
    if n < 2 {
        return None;
    }
    let lo = sorted[0];
    let hi = sorted[n - 1];
    let span = hi - lo;
    if !(span > 0.0) {
        return None;
    }

    let mut best: Option<(usize, f32)> = None;
    for (idx, err) in sorted.iter().enumerate() {
        let x = idx as f32 / (n - 1) as f32;
        let y = (err - lo) / span;
        let gap = x - y;
        if gap > f32::EPSILON && best.map_or(true, |(_, g)| gap > g) {
            best = Some((idx, gap));
        }
    }
    best.map(|(idx, _)| idx)
}
