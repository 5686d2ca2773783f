use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::geometry::{approx_eq, BoundingBox, Point, Positioning, EPSILON};

/// An undirected segment between two points.
///
/// The endpoints are stored in no particular order, the accessors pick whichever endpoint is
/// lesser or greater along the axis of interest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FullEdge {
    pub a: Point,
    pub b: Point,
}

impl FullEdge {
    pub const fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    /// The endpoint that comes first in the `(x, y)` order.
    pub fn left(&self) -> Point {
        match self.a.lex_cmp(&self.b) {
            Ordering::Greater => self.b,
            _ => self.a,
        }
    }

    /// The endpoint that comes last in the `(x, y)` order.
    pub fn right(&self) -> Point {
        match self.a.lex_cmp(&self.b) {
            Ordering::Greater => self.a,
            _ => self.b,
        }
    }

    pub fn bottom(&self) -> Point {
        if self.a.y <= self.b.y {
            self.a
        } else {
            self.b
        }
    }

    pub fn top(&self) -> Point {
        if self.a.y <= self.b.y {
            self.b
        } else {
            self.a
        }
    }

    pub fn inner(&self) -> Point {
        if self.a.z <= self.b.z {
            self.a
        } else {
            self.b
        }
    }

    pub fn outer(&self) -> Point {
        if self.a.z <= self.b.z {
            self.b
        } else {
            self.a
        }
    }

    /// Returns `true` if both endpoints coincide.
    pub fn is_degenerate(&self) -> bool {
        self.a == self.b
    }

    pub fn is_vertical(&self) -> bool {
        approx_eq(self.a.x, self.b.x)
    }

    /// Slope of the edge in the xy-plane, infinite for vertical edges.
    pub fn slope(&self) -> f64 {
        let (l, r) = (self.left(), self.right());
        if approx_eq(l.x, r.x) {
            f64::INFINITY
        } else {
            (r.y - l.y) / (r.x - l.x)
        }
    }

    /// Evaluates the y-coordinate of the edge's supporting line at `x`.
    ///
    /// Vertical edges yield the y-coordinate of their lower endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `x` is outside of the edge's x-span.
    pub fn y_at(&self, x: f64) -> Result<f64> {
        let (l, r) = (self.left(), self.right());
        if x < l.x - EPSILON || x > r.x + EPSILON {
            return Err(Error::OutOfRange {
                value: x,
                min: l.x,
                max: r.x,
            });
        }
        if approx_eq(l.x, r.x) {
            return Ok(l.y.min(r.y));
        }
        let x = x.clamp(l.x, r.x);
        Ok(l.y + (x - l.x) * (r.y - l.y) / (r.x - l.x))
    }

    /// Returns the point at parameter `v` when walking from `a` to `b`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] unless `0 <= v <= 1`.
    pub fn point_at(&self, v: f64) -> Result<Point> {
        if !(0. ..=1.).contains(&v) {
            return Err(Error::OutOfRange {
                value: v,
                min: 0.,
                max: 1.,
            });
        }
        let Self { a, b } = self;
        Ok(Point::new_3d(
            a.x + v * (b.x - a.x),
            a.y + v * (b.y - a.y),
            a.z + v * (b.z - a.z),
        ))
    }

    /// Returns `true` if `point` lies strictly above the edge's supporting line.
    pub fn is_above(&self, point: &Point) -> bool {
        matches!(
            point.position(&self.left(), &self.right()),
            Positioning::Left
        )
    }

    /// Returns `true` if `point` lies strictly below the edge's supporting line.
    pub fn is_below(&self, point: &Point) -> bool {
        matches!(
            point.position(&self.left(), &self.right()),
            Positioning::Right
        )
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            xmin: self.a.x.min(self.b.x),
            xmax: self.a.x.max(self.b.x),
            ymin: self.a.y.min(self.b.y),
            ymax: self.a.y.max(self.b.y),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn diagonal() -> FullEdge {
        FullEdge::new(Point::new_3d(2., 2., 1.), Point::new_3d(0., 0., 3.))
    }

    #[test]
    fn accessors() {
        let edge = diagonal();

        assert_eq!(edge.left(), Point::new_3d(0., 0., 3.));
        assert_eq!(edge.right(), Point::new_3d(2., 2., 1.));
        assert_eq!(edge.bottom(), Point::new_3d(0., 0., 3.));
        assert_eq!(edge.top(), Point::new_3d(2., 2., 1.));
        assert_eq!(edge.inner(), Point::new_3d(2., 2., 1.));
        assert_eq!(edge.outer(), Point::new_3d(0., 0., 3.));
    }

    #[test]
    fn vertical_edge_is_ordered_by_y() {
        let edge = FullEdge::new(Point::new(1., 3.), Point::new(1., -1.));

        assert!(edge.is_vertical());
        assert_eq!(edge.left(), Point::new(1., -1.));
        assert_eq!(edge.slope(), f64::INFINITY);
        assert_eq!(edge.y_at(1.), Ok(-1.));
    }

    #[rstest]
    #[case(0., 0.)]
    #[case(0.5, 0.5)]
    #[case(2., 2.)]
    fn y_at_inside_span(#[case] x: f64, #[case] expected: f64) {
        assert_eq!(diagonal().y_at(x), Ok(expected));
    }

    #[rstest]
    #[case(-0.5)]
    #[case(2.5)]
    fn y_at_outside_span(#[case] x: f64) {
        assert!(matches!(diagonal().y_at(x), Err(Error::OutOfRange { .. })));
    }

    #[test]
    fn point_at() {
        let edge = FullEdge::new(Point::new(0., 0.), Point::new(2., 4.));

        assert_eq!(edge.point_at(0.5), Ok(Point::new(1., 2.)));
        assert_eq!(edge.point_at(0.), Ok(Point::new(0., 0.)));
        assert!(edge.point_at(1.5).is_err());
        assert!(edge.point_at(-0.1).is_err());
    }

    #[test]
    fn above_and_below() {
        let edge = diagonal();

        assert!(edge.is_above(&Point::new(0., 1.)));
        assert!(edge.is_below(&Point::new(1., 0.)));
        assert!(!edge.is_above(&Point::new(1., 1.)));
        assert!(!edge.is_below(&Point::new(1., 1.)));
    }

    #[test]
    fn degenerate() {
        let p = Point::new(1., 1.);
        assert!(FullEdge::new(p, p).is_degenerate());
        assert!(!diagonal().is_degenerate());
    }
}
