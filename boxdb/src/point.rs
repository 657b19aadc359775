//! Points, coordinates and query regions.
//!
//! A [`Point`] is an ordered sequence of N [`Coord`]s, where every coordinate
//! is either a scalar position or a `[lo, hi]` extent in that dimension. A
//! [`Region`] is an N-dimensional bounding box given as `lo`/`hi` vectors.
//!
//! Intersection is inclusive on both sides: a scalar `p` intersects the
//! bounds `(lo, hi)` when `lo <= p <= hi`, a range `[a, b]` when
//! `a <= hi && b >= lo`. A point matches a region when it intersects on
//! every dimension.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt::{Display, Formatter};

use crate::errors::{BoxDbError, BoxDbResult, ErrorKind};

/// Inline capacity for per-dimension vectors; covers the 2..8 dimension range
/// without heap allocation.
pub const INLINE_DIMENSIONS: usize = 8;

pub type Coords = SmallVec<[Coord; INLINE_DIMENSIONS]>;
pub type Bounds = SmallVec<[f64; INLINE_DIMENSIONS]>;

/// A single coordinate of a point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Coord {
    /// A position in this dimension
    Scalar(f64),
    /// An extent `[lo, hi]` in this dimension
    Range(f64, f64),
}

impl Coord {
    pub fn range(lo: f64, hi: f64) -> Coord {
        Coord::Range(lo, hi)
    }

    pub fn lo(&self) -> f64 {
        match *self {
            Coord::Scalar(x) => x,
            Coord::Range(lo, _) => lo,
        }
    }

    pub fn hi(&self) -> f64 {
        match *self {
            Coord::Scalar(x) => x,
            Coord::Range(_, hi) => hi,
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, Coord::Range(..))
    }

    /// Tests this coordinate against the query bounds `(lo, hi)` of one dimension.
    #[inline]
    pub fn intersects(&self, lo: f64, hi: f64) -> bool {
        match *self {
            Coord::Scalar(p) => lo <= p && p <= hi,
            Coord::Range(a, b) => a <= hi && b >= lo,
        }
    }

    fn validate(&self, dimension: usize) -> BoxDbResult<()> {
        match *self {
            Coord::Scalar(x) if !x.is_finite() => Err(BoxDbError::new(
                &format!("non-finite scalar {} in dimension {}", x, dimension),
                ErrorKind::MalformedInput,
            )),
            Coord::Range(lo, hi) if !lo.is_finite() || !hi.is_finite() => Err(BoxDbError::new(
                &format!("non-finite range [{}, {}] in dimension {}", lo, hi, dimension),
                ErrorKind::MalformedInput,
            )),
            Coord::Range(lo, hi) if lo > hi => Err(BoxDbError::new(
                &format!(
                    "!(min <= max) in dimension {} for range [{}, {}]",
                    dimension, lo, hi
                ),
                ErrorKind::MalformedInput,
            )),
            _ => Ok(()),
        }
    }
}

impl From<f64> for Coord {
    fn from(x: f64) -> Self {
        Coord::Scalar(x)
    }
}

impl From<(f64, f64)> for Coord {
    fn from((lo, hi): (f64, f64)) -> Self {
        Coord::Range(lo, hi)
    }
}

impl From<[f64; 2]> for Coord {
    fn from([lo, hi]: [f64; 2]) -> Self {
        Coord::Range(lo, hi)
    }
}

impl Display for Coord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Coord::Scalar(x) => write!(f, "{}", x),
            Coord::Range(lo, hi) => write!(f, "[{},{}]", lo, hi),
        }
    }
}

/// Builds a [`Point`] from scalars and `(lo, hi)` tuples.
///
/// ```rust
/// use boxdb::point;
/// use boxdb::point::Coord;
///
/// let p = point![1.0, (5.0, 12.0)];
/// assert_eq!(p.coords()[1], Coord::Range(5.0, 12.0));
/// ```
#[macro_export]
macro_rules! point {
    ($($c:expr),+ $(,)?) => {
        $crate::point::Point::new(vec![$($crate::point::Coord::from($c)),+])
    };
}

/// An ordered sequence of coordinates, one per dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    coords: Coords,
}

impl Point {
    pub fn new(coords: Vec<Coord>) -> Point {
        Point {
            coords: Coords::from_vec(coords),
        }
    }

    /// Creates a point whose coordinates are all scalar.
    pub fn from_scalars(values: &[f64]) -> Point {
        Point {
            coords: values.iter().map(|x| Coord::Scalar(*x)).collect(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.coords.len()
    }

    pub fn coords(&self) -> &[Coord] {
        &self.coords
    }

    /// Checks that the point has exactly `dimensions` well-formed coordinates.
    pub fn validate(&self, dimensions: usize) -> BoxDbResult<()> {
        if self.coords.len() != dimensions {
            return Err(BoxDbError::new(
                &format!(
                    "point has {} dimensions, expected {}",
                    self.coords.len(),
                    dimensions
                ),
                ErrorKind::MalformedInput,
            ));
        }
        for (i, c) in self.coords.iter().enumerate() {
            c.validate(i)?;
        }
        Ok(())
    }

    /// The smallest region enclosing this point.
    pub fn bounds(&self) -> Region {
        Region {
            lo: self.coords.iter().map(Coord::lo).collect(),
            hi: self.coords.iter().map(Coord::hi).collect(),
        }
    }

    /// True when the point intersects `region` on every dimension.
    pub fn intersects(&self, region: &Region) -> bool {
        self.coords.len() == region.dimensions()
            && self
                .coords
                .iter()
                .zip(region.lo.iter().zip(region.hi.iter()))
                .all(|(c, (lo, hi))| c.intersects(*lo, *hi))
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, c) in self.coords.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, "]")
    }
}

/// An N-dimensional bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    lo: Bounds,
    hi: Bounds,
}

impl Region {
    pub fn new(lo: Vec<f64>, hi: Vec<f64>) -> Region {
        Region {
            lo: Bounds::from_vec(lo),
            hi: Bounds::from_vec(hi),
        }
    }

    /// Parses the flat `[min_0, .., min_n-1, max_0, .., max_n-1]` form.
    ///
    /// ```rust
    /// use boxdb::point::Region;
    ///
    /// let region = Region::from_flat(&[-10.0, -10.0, 10.0, 10.0]).unwrap();
    /// assert_eq!(region.dimensions(), 2);
    /// assert_eq!(region.lo(), &[-10.0, -10.0]);
    /// ```
    pub fn from_flat(flat: &[f64]) -> BoxDbResult<Region> {
        if flat.is_empty() || flat.len() % 2 != 0 {
            return Err(BoxDbError::new(
                &format!("flat bounds must have an even, non-zero length, got {}", flat.len()),
                ErrorKind::MalformedInput,
            ));
        }
        let n = flat.len() / 2;
        Ok(Region {
            lo: Bounds::from_slice(&flat[..n]),
            hi: Bounds::from_slice(&flat[n..]),
        })
    }

    /// An inverted box that any `expand` call replaces.
    pub fn empty(dimensions: usize) -> Region {
        Region {
            lo: smallvec::smallvec![f64::INFINITY; dimensions],
            hi: smallvec::smallvec![f64::NEG_INFINITY; dimensions],
        }
    }

    pub fn dimensions(&self) -> usize {
        self.lo.len()
    }

    pub fn lo(&self) -> &[f64] {
        &self.lo
    }

    pub fn hi(&self) -> &[f64] {
        &self.hi
    }

    pub fn to_flat(&self) -> Vec<f64> {
        self.lo.iter().chain(self.hi.iter()).copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lo.iter().zip(self.hi.iter()).any(|(lo, hi)| lo > hi)
    }

    pub fn validate(&self, dimensions: usize) -> BoxDbResult<()> {
        if self.lo.len() != self.hi.len() || self.lo.len() != dimensions {
            return Err(BoxDbError::new(
                &format!(
                    "region has {} dimensions, expected {}",
                    self.lo.len().max(self.hi.len()),
                    dimensions
                ),
                ErrorKind::MalformedInput,
            ));
        }
        for (i, (lo, hi)) in self.lo.iter().zip(self.hi.iter()).enumerate() {
            if lo.is_nan() || hi.is_nan() || lo > hi {
                return Err(BoxDbError::new(
                    &format!("invalid bounds ({}, {}) in dimension {}", lo, hi, i),
                    ErrorKind::MalformedInput,
                ));
            }
        }
        Ok(())
    }

    /// Box-box overlap, inclusive on both sides.
    pub fn intersects(&self, other: &Region) -> bool {
        (0..self.dimensions()).all(|i| self.lo[i] <= other.hi[i] && self.hi[i] >= other.lo[i])
    }

    pub fn contains(&self, other: &Region) -> bool {
        (0..self.dimensions()).all(|i| self.lo[i] <= other.lo[i] && self.hi[i] >= other.hi[i])
    }

    pub fn expand(&mut self, other: &Region) {
        for i in 0..self.dimensions() {
            self.lo[i] = self.lo[i].min(other.lo[i]);
            self.hi[i] = self.hi[i].max(other.hi[i]);
        }
    }

    pub fn merge(&self, other: &Region) -> Region {
        let mut merged = self.clone();
        merged.expand(other);
        merged
    }

    pub fn volume(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.lo
            .iter()
            .zip(self.hi.iter())
            .map(|(lo, hi)| hi - lo)
            .product()
    }

    /// Sum of the extents; separates candidates when volumes are all zero.
    pub fn margin(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.lo.iter().zip(self.hi.iter()).map(|(lo, hi)| hi - lo).sum()
    }

    pub fn center(&self, dimension: usize) -> f64 {
        (self.lo[dimension] + self.hi[dimension]) / 2.0
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Region(")?;
        for (i, v) in self.to_flat().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, ")")
    }
}
