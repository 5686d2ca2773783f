use std::cmp::Ordering;

use crate::error::{Error, Result};

/// Tolerance used by every geometric predicate of the crate.
///
/// Two coordinates closer than this are considered equal, and a point whose signed area with respect
/// to a line is smaller than this is considered to lie on that line.
pub const EPSILON: f64 = 1e-7;

/// Returns `true` if `a` and `b` are within [`EPSILON`] of each other.
#[inline]
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON
}

/// Compares two scalars, treating values within [`EPSILON`] of each other as equal.
#[inline]
pub fn approx_cmp(a: f64, b: f64) -> Ordering {
    if approx_eq(a, b) {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}

/// A point of 3D space.
///
/// Point location only looks at `x` and `y`, the `z` coordinate is carried along for meshes that
/// come with one.
///
/// Equality is approximate: two points are equal if all their coordinates are within
/// [`EPSILON`] of each other.
#[derive(Debug, Clone, Copy, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        approx_eq(self.x, other.x) && approx_eq(self.y, other.y) && approx_eq(self.z, other.z)
    }
}

impl From<&[f64; 2]> for Point {
    fn from(&[x, y]: &[f64; 2]) -> Self {
        Self::new(x, y)
    }
}

impl From<[f64; 2]> for Point {
    fn from(value: [f64; 2]) -> Self {
        Self::from(&value)
    }
}

impl From<[f64; 3]> for Point {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::new_3d(x, y, z)
    }
}

impl From<&Point> for [f64; 2] {
    fn from(val: &Point) -> Self {
        [val.x, val.y]
    }
}

impl From<Point> for [f64; 2] {
    fn from(val: Point) -> Self {
        (&val).into()
    }
}

/// Positioning of a [`Point`] with respect to a directed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Positioning {
    Left,
    On,
    Right,
}

impl Point {
    /// Creates a point of the `z = 0` plane.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0. }
    }

    pub const fn new_3d(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a point from a slice of 2 or 3 coordinates.
    ///
    /// Extra coordinates beyond the third are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientDimensions`] if fewer than 2 coordinates are given.
    pub fn from_coords(coords: &[f64]) -> Result<Self> {
        match *coords {
            [x, y] => Ok(Self::new(x, y)),
            [x, y, z, ..] => Ok(Self::new_3d(x, y, z)),
            _ => Err(Error::InsufficientDimensions {
                expected: 2,
                actual: coords.len(),
            }),
        }
    }

    /// Returns the coordinate along `axis` (0 for x, 1 for y, 2 for z).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimension`] for any other axis.
    pub fn coord(&self, axis: usize) -> Result<f64> {
        match axis {
            0 => Ok(self.x),
            1 => Ok(self.y),
            2 => Ok(self.z),
            _ => Err(Error::InvalidDimension(axis)),
        }
    }

    /// Returns `true` if no coordinate is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Twice the signed area of the triangle `(self, a, b)` in the xy-plane.
    ///
    /// Positive when the triangle turns counter-clockwise.
    pub fn cross(&self, a: &Point, b: &Point) -> f64 {
        (a.x - self.x) * (b.y - self.y) - (b.x - self.x) * (a.y - self.y)
    }

    /// Tests if a point is Left|On|Right of an infinite 2D line defined by two points.
    pub fn position(&self, p1: &Point, p2: &Point) -> Positioning {
        let det = p1.cross(p2, self);
        if det.abs() <= EPSILON {
            Positioning::On
        } else if det > 0. {
            Positioning::Left
        } else {
            Positioning::Right
        }
    }

    /// Returns `true` if the three points lie on a common line.
    pub fn is_colinear(&self, a: &Point, b: &Point) -> bool {
        matches!(self.position(a, b), Positioning::On)
    }

    /// Lexicographic comparison on `(x, y)`.
    ///
    /// This is the order used by the sweeps: it behaves like a vertical order tilted by an
    /// infinitesimal amount, so that no two distinct points share an "x".
    pub fn lex_cmp(&self, other: &Point) -> Ordering {
        approx_cmp(self.x, other.x).then_with(|| approx_cmp(self.y, other.y))
    }

    /// Returns `true` if `self` comes after `other` in the `(x, y)` order.
    pub fn is_right_of(&self, other: &Point) -> bool {
        matches!(self.lex_cmp(other), Ordering::Greater)
    }

    /// Returns `true` if `self` is strictly higher than `other`.
    pub fn is_above(&self, other: &Point) -> bool {
        matches!(approx_cmp(self.y, other.y), Ordering::Greater)
    }

    /// Returns `true` if `self` is strictly lower than `other`.
    pub fn is_below(&self, other: &Point) -> bool {
        matches!(approx_cmp(self.y, other.y), Ordering::Less)
    }
}
