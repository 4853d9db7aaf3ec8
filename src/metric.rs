//! Weighted patch distance between a domain patch and a codomain patch.
//!
//! Both patches are centred windows of `patch_size` pixels per side. Only
//! offsets where both windows stay inside their images contribute; the sum is
//! then rescaled to a full-window equivalent so patches near the border are not
//! favoured over interior ones. No overlap at all yields `f32::INFINITY`.

use crate::backend::Direction;
use crate::config::StyleConfig;
use crate::geometry::{Coord, Dimensions};
use crate::image::pyramid::LevelImages;
use crate::image::Image;
use crate::nnf::Nnf;
use crate::util::math::patch_radius;

/// Guide and style images on one side of a comparison.
#[derive(Clone, Copy, Debug)]
pub struct PatchImages<'a> {
    pub guide: &'a Image,
    pub style: &'a Image,
}

impl PatchImages<'_> {
    /// Dimensions shared by the guide and style image.
    pub fn dims(&self) -> Dimensions {
        self.guide.dims()
    }
}

/// Patch distance bound to one level and one matching direction.
#[derive(Clone, Copy, Debug)]
pub struct PatchMetric<'a> {
    domain: PatchImages<'a>,
    codomain: PatchImages<'a>,
    guide_weights: &'a [f32],
    style_weights: &'a [f32],
    radius: i32,
    window_area: f32,
}

impl<'a> PatchMetric<'a> {
    /// Resolves which image pair plays domain and codomain for `direction`.
    ///
    /// Forward NNFs explain target patches with source content; reverse NNFs
    /// explain source patches with target content.
    pub fn new(config: &'a StyleConfig, images: &'a LevelImages, direction: Direction) -> Self {
        let source = PatchImages {
            guide: &images.guide.source,
            style: &images.style.source,
        };
        let target = PatchImages {
            guide: &images.guide.target,
            style: &images.style.target,
        };
        let (domain, codomain) = match direction {
            Direction::Forward => (target, source),
            Direction::Reverse => (source, target),
        };
        Self::from_parts(config, domain, codomain)
    }

    /// Builds a metric from explicit domain and codomain images.
    pub fn from_parts(
        config: &'a StyleConfig,
        domain: PatchImages<'a>,
        codomain: PatchImages<'a>,
    ) -> Self {
        Self {
            domain,
            codomain,
            guide_weights: &config.guide_weights,
            style_weights: &config.style_weights,
            radius: patch_radius(config.patch_size),
            window_area: (config.patch_size * config.patch_size) as f32,
        }
    }

    /// Domain dimensions; an NNF evaluated with this metric must share them.
    pub fn domain_dims(&self) -> Dimensions {
        self.domain.dims()
    }

    /// Codomain dimensions.
    pub fn codomain_dims(&self) -> Dimensions {
        self.codomain.dims()
    }

    /// Error of explaining the patch at `domain` with the patch at `codomain`.
    ///
    /// Weighted squared differences over the overlapping offsets, rescaled to
    /// the full window area.
    pub fn error(&self, domain: Coord, codomain: Coord) -> f32 {
        let mut sum = 0.0f32;
        let mut overlap = 0u32;
        for dr in -self.radius..=self.radius {
            for dc in -self.radius..=self.radius {
                let offset = Coord::new(dr, dc);
                let (d, c) = (domain + offset, codomain + offset);
                let (Some(dg), Some(cg)) = (self.domain.guide.get(d), self.codomain.guide.get(c))
                else {
                    continue;
                };
                let (Some(ds), Some(cs)) = (self.domain.style.get(d), self.codomain.style.get(c))
                else {
                    continue;
                };
                sum += weighted_sq_diff(self.guide_weights, dg, cg);
                sum += weighted_sq_diff(self.style_weights, ds, cs);
                overlap += 1;
            }
        }
        if overlap == 0 {
            return f32::INFINITY;
        }
        sum * self.window_area / overlap as f32
    }
}

#[inline]
fn weighted_sq_diff(weights: &[f32], a: &[f32], b: &[f32]) -> f32 {
    weights
        .iter()
        .zip(a.iter().zip(b))
        .map(|(w, (x, y))| {
            let diff = x - y;
            w * diff * diff
        })
        .sum()
}

/// Error of explaining `domain_patch` with `codomain_patch` on one level.
///
/// Argument order is semantic: the first patch is always the one being
/// explained, whichever image pair `direction` assigns to it.
///
/// The value is not the raw weighted sum: the sum over offsets valid in both
/// patches is scaled by `patch_size² / overlap`, so a window clipped by an
/// image border is comparable with an interior one. Interior pairs get the
/// plain sum; no overlap gives `f32::INFINITY`.
pub fn calculate_error(
    config: &StyleConfig,
    images: &LevelImages,
    direction: Direction,
    domain_patch: Coord,
    codomain_patch: Coord,
) -> f32 {
    PatchMetric::new(config, images, direction).error(domain_patch, codomain_patch)
}

/// Mean patch error over the mapped domain coordinates of `nnf`.
///
/// Returns `f64::INFINITY` if any mapped patch has no valid overlap and `0.0`
/// for an NNF without mappings.
pub fn mean_error(metric: &PatchMetric<'_>, nnf: &Nnf) -> f64 {
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for (domain, mapped) in nnf.iter() {
        if let Some(codomain) = mapped {
            sum += f64::from(metric.error(domain, codomain));
            count += 1;
        }
    }
    if count == 0 {
        return 0.0;
    }
    sum / count as f64
}
