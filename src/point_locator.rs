use rayon::prelude::*;

use crate::dcel::FaceId;
use crate::error::Result;
use crate::geometry::Point;

/// A trait to locate one or several query points within a planar subdivision.
pub trait PointLocator {
    /// Locates a point within the subdivision.
    ///
    /// Returns [`None`] if the point does not lie in any bounded face.
    fn locate_point(&self, point: &Point) -> Result<Option<FaceId>>;

    /// Locates one query point given by its coordinates.
    ///
    /// Only the first two coordinates are used.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientDimensions`](crate::Error::InsufficientDimensions) if fewer
    /// than two coordinates are given.
    fn locate_one(&self, coords: &[f64]) -> Result<Option<FaceId>> {
        self.locate_point(&Point::from_coords(coords)?)
    }

    /// Locates several query points.
    fn locate_many(&self, points: &[[f64; 2]]) -> Result<Vec<Option<FaceId>>> {
        points
            .iter()
            .map(|point| self.locate_point(&point.into()))
            .collect()
    }

    /// Locates several query points in parallel.
    fn par_locate_many(&self, points: &[[f64; 2]]) -> Result<Vec<Option<FaceId>>>
    where
        Self: std::marker::Sync,
    {
        points
            .par_iter()
            .map(|point| self.locate_point(&point.into()))
            .collect()
    }
}
