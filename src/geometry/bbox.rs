use crate::geometry::{Point, EPSILON};

/// An axis-aligned span of the xy-plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl BoundingBox {
    /// Computes the smallest box containing all the points.
    ///
    /// Returns [`None`] if there are no points.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bbox = Self {
            xmin: first.x,
            xmax: first.x,
            ymin: first.y,
            ymax: first.y,
        };
        for &Point { x, y, .. } in points {
            bbox.xmin = bbox.xmin.min(x);
            bbox.xmax = bbox.xmax.max(x);
            bbox.ymin = bbox.ymin.min(y);
            bbox.ymax = bbox.ymax.max(y);
        }
        Some(bbox)
    }

    /// Returns `true` if the point lies inside the box or on its border, up to the tolerance.
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.xmin - EPSILON
            && point.x <= self.xmax + EPSILON
            && point.y >= self.ymin - EPSILON
            && point.y <= self.ymax + EPSILON
    }

    /// Returns a copy of the box grown by `margin` on every side.
    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            xmin: self.xmin - margin,
            xmax: self.xmax + margin,
            ymin: self.ymin - margin,
            ymax: self.ymax + margin,
        }
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            xmin: 0.,
            xmax: 1.,
            ymin: 0.,
            ymax: 1.,
        }
    }
}
