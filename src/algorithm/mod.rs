//! Contract-checking entry points for the backend cores.
//!
//! Each wrapper validates call shape (patch size, NNF orientation and
//! dimensions, totality of inputs) and then delegates to a [`Backend`]. A
//! precondition violation is returned as an error and nothing is modified.

use crate::backend::{Backend, Direction, MatchConstraints, MatchParams, MatchReport};
use crate::config::{validate_patch_size, StyleConfig};
use crate::geometry::Dimensions;
use crate::image::pyramid::{LevelImages, PyramidLevel};
use crate::metric::PatchMetric;
use crate::nnf::knee::{knee_point_blacklist, KneeSelection};
use crate::nnf::{Nnf, PinnedMask};
use crate::trace::trace_span;
use crate::util::{StyleError, StyleResult};

pub mod synthesis;

/// Refines `nnf` with PatchMatch over one level's images.
///
/// `nnf` must be oriented for `params.direction`: forward NNFs map target
/// coordinates to source coordinates, reverse NNFs the opposite. Unless
/// `params.initialize` is set, `nnf` must already be total and in range.
/// `blacklist`, when given, runs in the opposite direction; candidates it
/// has mapped are never chosen.
pub fn patch_match(
    backend: &dyn Backend,
    config: &StyleConfig,
    images: &LevelImages,
    nnf: &mut Nnf,
    params: &MatchParams,
    blacklist: Option<&Nnf>,
) -> StyleResult<MatchReport> {
    let constraints = MatchConstraints {
        blacklist,
        pinned: None,
    };
    patch_match_constrained(backend, config, images, nnf, params, &constraints)
}

/// [`patch_match`] with pinned coordinates as well as a blacklist.
///
/// Pinned coordinates must already hold an in-range mapping, which neither
/// initialization nor the sweeps change.
pub fn patch_match_constrained(
    backend: &dyn Backend,
    config: &StyleConfig,
    images: &LevelImages,
    nnf: &mut Nnf,
    params: &MatchParams,
    constraints: &MatchConstraints<'_>,
) -> StyleResult<MatchReport> {
    validate_patch_size(config.patch_size)?;
    check_channels(config, images)?;
    let metric = PatchMetric::new(config, images, params.direction);
    check_dims("nnf domain", metric.domain_dims(), nnf.source_dims())?;
    check_dims("nnf codomain", metric.codomain_dims(), nnf.target_dims())?;
    if let Some(blacklist) = constraints.blacklist {
        check_dims("blacklist domain", nnf.target_dims(), blacklist.source_dims())?;
        check_dims("blacklist codomain", nnf.source_dims(), blacklist.target_dims())?;
    }
    if let Some(pinned) = constraints.pinned {
        check_dims("pinned domain", nnf.source_dims(), pinned.dims())?;
        check_pinned(nnf, pinned)?;
    }
    if !params.initialize {
        nnf.validate_total("patch_match input")?;
    }
    if params.search_radius == Some(0) {
        return Err(StyleError::InvalidConfig("search_radius must be positive"));
    }
    Ok(backend.patch_match_core(&metric, params, nnf, constraints))
}

/// Writes the knee-point claims into `forward` and pins them.
///
/// Each claimed reverse match `source -> target` becomes `forward(target) =
/// source`; see [`KneeSelection::forward_pins`] for targets claimed twice.
pub fn pin_knee_matches(selection: &KneeSelection, forward: &mut Nnf) -> StyleResult<PinnedMask> {
    let blacklist = &selection.blacklist;
    check_dims("forward nnf domain", blacklist.target_dims(), forward.source_dims())?;
    check_dims("forward nnf codomain", blacklist.source_dims(), forward.target_dims())?;

    let mut pinned = PinnedMask::new(forward.source_dims());
    for (target, source) in selection.forward_pins() {
        forward.set_mapping(target, source);
        pinned.pin(target);
    }
    Ok(pinned)
}

/// Seeds `full` from the next coarser NNF `half`.
///
/// `half`'s domain and codomain must each be the floor half of `full`'s, and
/// `half` must be total. Every written mapping is clamped so a centred patch
/// of `config.patch_size` fits inside `full`'s codomain.
pub fn upscale_nnf(
    backend: &dyn Backend,
    config: &StyleConfig,
    half: &Nnf,
    full: &mut Nnf,
) -> StyleResult<()> {
    validate_patch_size(config.patch_size)?;
    check_dims("half-resolution domain", full.source_dims().half(), half.source_dims())?;
    check_dims("half-resolution codomain", full.target_dims().half(), half.target_dims())?;
    half.validate_total("upscale input")?;

    let _span = trace_span!(
        "upscale",
        rows = full.source_dims().rows,
        cols = full.source_dims().cols
    )
    .entered();
    backend.upscale_core(config.patch_size, half, full);
    Ok(())
}

/// Synthesizes the level's style target from its forward NNF.
pub fn apply_nnf(
    backend: &dyn Backend,
    config: &StyleConfig,
    level: &mut PyramidLevel,
) -> StyleResult<()> {
    validate_patch_size(config.patch_size)?;
    check_channels(config, &level.images)?;
    check_dims("forward nnf domain", level.target_dims(), level.forward_nnf.source_dims())?;
    check_dims("forward nnf codomain", level.source_dims(), level.forward_nnf.target_dims())?;
    level.forward_nnf.validate_total("apply input")?;

    let _span = trace_span!("apply", rows = level.target_dims().rows).entered();
    backend.apply_core(config.patch_size, level);
    Ok(())
}

/// Selects the knee-point blacklist from a reverse NNF over `images`.
pub fn knee_blacklist(
    config: &StyleConfig,
    images: &LevelImages,
    reverse: &Nnf,
) -> StyleResult<KneeSelection> {
    validate_patch_size(config.patch_size)?;
    check_channels(config, images)?;
    let metric = PatchMetric::new(config, images, Direction::Reverse);
    check_dims("reverse nnf domain", metric.domain_dims(), reverse.source_dims())?;
    check_dims("reverse nnf codomain", metric.codomain_dims(), reverse.target_dims())?;
    Ok(knee_point_blacklist(&metric, reverse))
}

fn check_channels(config: &StyleConfig, images: &LevelImages) -> StyleResult<()> {
    for (context, got, expected) in [
        ("guide source", images.guide.source.channels(), config.guide_channels()),
        ("guide target", images.guide.target.channels(), config.guide_channels()),
        ("style source", images.style.source.channels(), config.style_channels()),
        ("style target", images.style.target.channels(), config.style_channels()),
    ] {
        if got != expected {
            return Err(StyleError::ChannelMismatch {
                context,
                expected,
                got,
            });
        }
    }
    check_dims("style source", images.guide.source.dims(), images.style.source.dims())?;
    check_dims("style target", images.guide.target.dims(), images.style.target.dims())
}

fn check_pinned(nnf: &Nnf, pinned: &PinnedMask) -> StyleResult<()> {
    let unmapped = pinned.iter().filter(|c| !nnf.is_mapped(*c)).count();
    if unmapped > 0 {
        return Err(StyleError::IncompleteNnf {
            context: "pinned mappings",
            unmapped,
        });
    }
    for domain in pinned.iter() {
        if let Some(codomain) = nnf.get_mapping(domain) {
            if !nnf.target_dims().contains(codomain) {
                return Err(StyleError::MappingOutOfRange {
                    domain,
                    codomain,
                    target: nnf.target_dims(),
                });
            }
        }
    }
    Ok(())
}

fn check_dims(context: &'static str, expected: Dimensions, got: Dimensions) -> StyleResult<()> {
    if expected != got {
        return Err(StyleError::DimensionMismatch {
            context,
            expected,
            got,
        });
    }
    Ok(())
}
