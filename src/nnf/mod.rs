//! Nearest-neighbor fields.
//!
//! An [`Nnf`] maps every coordinate of a fixed domain grid (`source_dims`) to a
//! coordinate of a fixed codomain grid (`target_dims`). Entries start out
//! unmapped; an NNF reused as a blacklist keeps only the entries that claim a
//! coordinate and leaves the rest unmapped. A [`PinnedMask`] marks domain
//! coordinates whose mapping PatchMatch must leave alone.

use crate::geometry::{Coord, Dimensions};
use crate::util::{StyleError, StyleResult};

pub mod knee;

/// Dense per-pixel mapping between two coordinate spaces.
#[derive(Clone, Debug, PartialEq)]
pub struct Nnf {
    source_dims: Dimensions,
    target_dims: Dimensions,
    mappings: Vec<Option<Coord>>,
}

impl Nnf {
    /// Creates an NNF with every entry unmapped.
    pub fn new(source_dims: Dimensions, target_dims: Dimensions) -> Self {
        Self {
            source_dims,
            target_dims,
            mappings: vec![None; source_dims.len()],
        }
    }

    /// Creates an NNF mapping each coordinate onto itself.
    pub fn identity(dims: Dimensions) -> Self {
        Self {
            source_dims: dims,
            target_dims: dims,
            mappings: dims.raster().map(Some).collect(),
        }
    }

    /// Domain dimensions.
    pub fn source_dims(&self) -> Dimensions {
        self.source_dims
    }

    /// Codomain dimensions.
    pub fn target_dims(&self) -> Dimensions {
        self.target_dims
    }

    /// Returns the mapping of `coord`; `None` outside the domain or when unmapped.
    #[inline]
    pub fn get_mapping(&self, coord: Coord) -> Option<Coord> {
        let idx = self.source_dims.index_of(coord)?;
        self.mappings[idx]
    }

    /// Overwrites the mapping of `domain` without any bounds clamping of `codomain`.
    ///
    /// # Panics
    ///
    /// Panics if `domain` lies outside `source_dims`.
    #[inline]
    pub fn set_mapping(&mut self, domain: Coord, codomain: Coord) {
        *self.slot_mut(domain) = Some(codomain);
    }

    /// Marks `domain` as unmapped.
    ///
    /// # Panics
    ///
    /// Panics if `domain` lies outside `source_dims`.
    pub fn clear_mapping(&mut self, domain: Coord) {
        *self.slot_mut(domain) = None;
    }

    /// Returns true if `coord` is inside the domain and mapped.
    pub fn is_mapped(&self, coord: Coord) -> bool {
        self.get_mapping(coord).is_some()
    }

    /// Blacklist query: a codomain candidate is available iff it is unmapped here.
    ///
    /// Coordinates outside the domain are never available.
    #[inline]
    pub fn is_available(&self, coord: Coord) -> bool {
        match self.source_dims.index_of(coord) {
            Some(idx) => self.mappings[idx].is_none(),
            None => false,
        }
    }

    /// Number of mapped domain coordinates.
    pub fn mapped_count(&self) -> usize {
        self.mappings.iter().filter(|m| m.is_some()).count()
    }

    /// Returns true if every domain coordinate is mapped.
    pub fn is_complete(&self) -> bool {
        self.mappings.iter().all(Option::is_some)
    }

    /// Iterates `(domain, mapping)` pairs in raster order.
    pub fn iter(&self) -> impl Iterator<Item = (Coord, Option<Coord>)> + '_ {
        self.source_dims.raster().zip(self.mappings.iter().copied())
    }

    /// First mapped entry whose codomain lies outside `target_dims`.
    pub fn first_out_of_range(&self) -> Option<(Coord, Coord)> {
        self.iter().find_map(|(domain, mapped)| match mapped {
            Some(codomain) if !self.target_dims.contains(codomain) => Some((domain, codomain)),
            _ => None,
        })
    }

    /// Checks that the NNF is total and every mapping lies in the codomain.
    pub fn validate_total(&self, context: &'static str) -> StyleResult<()> {
        let unmapped = self.source_dims.len() - self.mapped_count();
        if unmapped > 0 {
            return Err(StyleError::IncompleteNnf { context, unmapped });
        }
        if let Some((domain, codomain)) = self.first_out_of_range() {
            return Err(StyleError::MappingOutOfRange {
                domain,
                codomain,
                target: self.target_dims,
            });
        }
        Ok(())
    }

    /// Mutable raw entries, one slice per domain row.
    pub(crate) fn rows_mut(&mut self) -> impl Iterator<Item = &mut [Option<Coord>]> + '_ {
        self.mappings.chunks_mut(self.source_dims.cols.max(1))
    }

    #[cfg(feature = "rayon")]
    pub(crate) fn par_rows_mut(
        &mut self,
    ) -> impl rayon::iter::IndexedParallelIterator<Item = &mut [Option<Coord>]> + '_ {
        use rayon::prelude::*;
        let cols = self.source_dims.cols.max(1);
        self.mappings.par_chunks_mut(cols)
    }

    fn slot_mut(&mut self, domain: Coord) -> &mut Option<Coord> {
        match self.source_dims.index_of(domain) {
            Some(idx) => &mut self.mappings[idx],
            None => panic!("domain coordinate {domain} outside {}", self.source_dims),
        }
    }
}

/// Domain coordinates whose mappings are held fixed during PatchMatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PinnedMask {
    dims: Dimensions,
    pinned: Vec<bool>,
}

impl PinnedMask {
    /// Creates a mask over `dims` with nothing pinned.
    pub fn new(dims: Dimensions) -> Self {
        Self {
            dims,
            pinned: vec![false; dims.len()],
        }
    }

    /// Grid the mask covers.
    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    /// Pins `coord`.
    ///
    /// # Panics
    ///
    /// Panics if `coord` lies outside the mask.
    pub fn pin(&mut self, coord: Coord) {
        match self.dims.index_of(coord) {
            Some(idx) => self.pinned[idx] = true,
            None => panic!("pinned coordinate {coord} outside {}", self.dims),
        }
    }

    /// Returns true if `coord` is inside the mask and pinned.
    #[inline]
    pub fn is_pinned(&self, coord: Coord) -> bool {
        self.dims
            .index_of(coord)
            .is_some_and(|idx| self.pinned[idx])
    }

    /// Number of pinned coordinates.
    pub fn count(&self) -> usize {
        self.pinned.iter().filter(|p| **p).count()
    }

    /// Pinned coordinates in raster order.
    pub fn iter(&self) -> impl Iterator<Item = Coord> + '_ {
        self.dims
            .raster()
            .zip(self.pinned.iter())
            .filter_map(|(coord, pinned)| pinned.then_some(coord))
    }
}
