//! Integer pixel coordinates and grid dimensions.
//!
//! Coordinates are signed so that patch offsets and neighbor deltas can step
//! outside a grid before being tested with [`Dimensions::contains`].

use crate::util::math::clamp_i32;
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// A `(row, col)` pixel coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Coord {
    pub row: i32,
    pub col: i32,
}

impl Coord {
    /// Creates a coordinate.
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

impl Add for Coord {
    type Output = Coord;

    fn add(self, rhs: Coord) -> Coord {
        Coord::new(self.row + rhs.row, self.col + rhs.col)
    }
}

impl Sub for Coord {
    type Output = Coord;

    fn sub(self, rhs: Coord) -> Coord {
        Coord::new(self.row - rhs.row, self.col - rhs.col)
    }
}

impl Mul<i32> for Coord {
    type Output = Coord;

    fn mul(self, rhs: i32) -> Coord {
        Coord::new(self.row * rhs, self.col * rhs)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Size of a pixel grid; valid coordinates are `0..rows` by `0..cols`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub rows: usize,
    pub cols: usize,
}

impl Dimensions {
    /// Creates grid dimensions.
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Number of cells in the grid.
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    /// Returns true when either side is zero.
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Returns true if `coord` lies inside the grid.
    #[inline]
    pub fn contains(&self, coord: Coord) -> bool {
        coord.row >= 0
            && coord.col >= 0
            && (coord.row as usize) < self.rows
            && (coord.col as usize) < self.cols
    }

    /// Row-major index of `coord`, or `None` outside the grid.
    #[inline]
    pub fn index_of(&self, coord: Coord) -> Option<usize> {
        if self.contains(coord) {
            Some(coord.row as usize * self.cols + coord.col as usize)
        } else {
            None
        }
    }

    /// Coordinate of a row-major index.
    #[inline]
    pub fn coord_of(&self, index: usize) -> Coord {
        Coord::new((index / self.cols) as i32, (index % self.cols) as i32)
    }

    /// Dimensions of the next coarser pyramid level (floor division by two).
    pub fn half(&self) -> Dimensions {
        Dimensions::new(self.rows / 2, self.cols / 2)
    }

    /// Returns true if `self` is exactly the floor half of `full`.
    pub fn is_half_of(&self, full: Dimensions) -> bool {
        *self == full.half()
    }

    /// Clamps `coord` into the grid.
    pub fn clamp(&self, coord: Coord) -> Coord {
        self.clamp_inset(coord, 0)
    }

    /// Clamps `coord` into the grid shrunk by `inset` on every side.
    ///
    /// When the grid is too small for the inset the coordinate collapses onto
    /// the grid's centre line along that axis.
    pub fn clamp_inset(&self, coord: Coord, inset: i32) -> Coord {
        Coord::new(
            clamp_i32(coord.row, inset, self.rows as i32 - 1 - inset),
            clamp_i32(coord.col, inset, self.cols as i32 - 1 - inset),
        )
    }

    /// Iterates every coordinate in raster (row-major) order.
    pub fn raster(self) -> impl DoubleEndedIterator<Item = Coord> {
        let cols = self.cols;
        (0..self.len()).map(move |idx| Coord::new((idx / cols) as i32, (idx % cols) as i32))
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}
