//! Multi-resolution stack of guide/style image pairs.
//!
//! Level 0 is the finest resolution. Each coarser level is exactly the floor
//! half of the previous one, which is what the NNF upscaler relies on.
//! [`Pyramid::build`] downsamples with the same 2x2 box average as
//! [`Image::downscale`]; style targets start zeroed and are filled in by
//! synthesis.

use crate::config::StyleConfig;
use crate::geometry::Dimensions;
use crate::image::Image;
use crate::nnf::Nnf;
use crate::util::{StyleError, StyleResult};

/// A source image and the target image it is matched against.
#[derive(Clone, Debug, PartialEq)]
pub struct ImagePair {
    pub source: Image,
    pub target: Image,
}

impl ImagePair {
    /// Pairs a source with a target image.
    pub fn new(source: Image, target: Image) -> Self {
        Self { source, target }
    }
}

/// Guide and style image pairs at one resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelImages {
    pub guide: ImagePair,
    pub style: ImagePair,
}

impl LevelImages {
    /// Source-side dimensions (shared by guide and style).
    pub fn source_dims(&self) -> Dimensions {
        self.guide.source.dims()
    }

    /// Target-side dimensions (shared by guide and style).
    pub fn target_dims(&self) -> Dimensions {
        self.guide.target.dims()
    }
}

/// One pyramid resolution: images plus the NNFs computed over them.
#[derive(Clone, Debug, PartialEq)]
pub struct PyramidLevel {
    pub images: LevelImages,
    /// Target -> source mapping driving synthesis.
    pub forward_nnf: Nnf,
    /// Source -> target mapping from the knee-point pass, when computed.
    pub reverse_nnf: Option<Nnf>,
    /// Reverse matches claimed at the knee point. Their targets are pinned in
    /// `forward_nnf`; no other target maps onto a claimed source.
    pub blacklist: Option<Nnf>,
}

impl PyramidLevel {
    /// Assembles a level, checking shapes and channel counts against `config`.
    pub fn new(guide: ImagePair, style: ImagePair, config: &StyleConfig) -> StyleResult<Self> {
        check_same_dims("style source", guide.source.dims(), style.source.dims())?;
        check_same_dims("style target", guide.target.dims(), style.target.dims())?;
        for (context, image, expected) in [
            ("guide source", &guide.source, config.guide_channels()),
            ("guide target", &guide.target, config.guide_channels()),
            ("style source", &style.source, config.style_channels()),
            ("style target", &style.target, config.style_channels()),
        ] {
            if image.channels() != expected {
                return Err(StyleError::ChannelMismatch {
                    context,
                    expected,
                    got: image.channels(),
                });
            }
        }
        let forward_nnf = Nnf::new(guide.target.dims(), guide.source.dims());
        Ok(Self {
            images: LevelImages { guide, style },
            forward_nnf,
            reverse_nnf: None,
            blacklist: None,
        })
    }

    /// Source-side dimensions.
    pub fn source_dims(&self) -> Dimensions {
        self.images.source_dims()
    }

    /// Target-side dimensions.
    pub fn target_dims(&self) -> Dimensions {
        self.images.target_dims()
    }

    /// The synthesized style target at this resolution.
    pub fn stylized(&self) -> &Image {
        &self.images.style.target
    }
}

/// Ordered levels from finest (index 0) to coarsest.
#[derive(Clone, Debug, PartialEq)]
pub struct Pyramid {
    levels: Vec<PyramidLevel>,
}

impl Pyramid {
    /// Wraps prepared levels, checking the fixed factor-two ratio between them.
    pub fn new(levels: Vec<PyramidLevel>) -> StyleResult<Self> {
        if levels.is_empty() {
            return Err(StyleError::EmptyPyramid);
        }
        for pair in levels.windows(2) {
            let (finer, coarser) = (&pair[0], &pair[1]);
            check_same_dims(
                "coarser source level",
                finer.source_dims().half(),
                coarser.source_dims(),
            )?;
            check_same_dims(
                "coarser target level",
                finer.target_dims().half(),
                coarser.target_dims(),
            )?;
        }
        Ok(Self { levels })
    }

    /// Builds a pyramid by repeated 2x2 box downsampling.
    ///
    /// Stops after `config.num_levels` levels or before any side would drop
    /// below the patch size, whichever comes first.
    pub fn build(
        guide_source: Image,
        guide_target: Image,
        style_source: Image,
        config: &StyleConfig,
    ) -> StyleResult<Self> {
        config.validate()?;
        let style_target = Image::new(guide_target.dims(), style_source.channels())?;
        let mut levels = vec![PyramidLevel::new(
            ImagePair::new(guide_source, guide_target),
            ImagePair::new(style_source, style_target),
            config,
        )?];

        while levels.len() < config.num_levels {
            let Some(prev) = levels.last() else {
                return Err(StyleError::EmptyPyramid);
            };
            let next_source = prev.source_dims().half();
            let next_target = prev.target_dims().half();
            let too_small = [next_source, next_target]
                .iter()
                .any(|d| d.rows < config.patch_size || d.cols < config.patch_size);
            if too_small {
                break;
            }

            let images = &prev.images;
            let guide = ImagePair::new(
                images.guide.source.downscale()?,
                images.guide.target.downscale()?,
            );
            let style = ImagePair::new(
                images.style.source.downscale()?,
                Image::new(next_target, images.style.target.channels())?,
            );
            levels.push(PyramidLevel::new(guide, style, config)?);
        }

        Ok(Self { levels })
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always false; construction rejects empty pyramids.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// All levels, finest first.
    pub fn levels(&self) -> &[PyramidLevel] {
        &self.levels
    }

    /// Returns a level by index.
    pub fn level(&self, index: usize) -> Option<&PyramidLevel> {
        self.levels.get(index)
    }

    /// Returns a mutable level by index.
    pub fn level_mut(&mut self, index: usize) -> Option<&mut PyramidLevel> {
        self.levels.get_mut(index)
    }

    /// Returns the finest level.
    pub fn finest(&self) -> &PyramidLevel {
        &self.levels[0]
    }

    /// Splits into `(finer, coarser)` around `index`, i.e. `levels[index]` and
    /// `levels[index + 1]`.
    pub(crate) fn finer_and_coarser(
        &mut self,
        index: usize,
    ) -> Option<(&mut PyramidLevel, &PyramidLevel)> {
        if index + 1 >= self.levels.len() {
            return None;
        }
        let (head, tail) = self.levels.split_at_mut(index + 1);
        Some((&mut head[index], &tail[0]))
    }
}

fn check_same_dims(context: &'static str, expected: Dimensions, got: Dimensions) -> StyleResult<()> {
    if expected != got {
        return Err(StyleError::DimensionMismatch {
            context,
            expected,
            got,
        });
    }
    Ok(())
}
