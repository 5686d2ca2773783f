use itertools::Itertools;

use crate::error::{Error, Result};
use crate::geometry::Point;

/// A polygon mesh described as a vertex list plus, for every cell, the list of its vertex indices.
///
/// This is the decoded form of an external mesh file: it carries no topology and is only meant to
/// be turned into a [`Dcel`](crate::Dcel).
#[derive(Debug, Clone)]
pub struct Mesh {
    points: Vec<Point>,
    cells: Vec<usize>,
    offsets: Offsets,
}

#[derive(Debug, Clone)]
enum Offsets {
    Implicit(usize),
    Explicit(Vec<usize>),
}

/// Iterator over the cells of a [`Mesh`], each cell being a slice of vertex indices.
pub struct Cells<'a> {
    cells: &'a [usize],
    offsets: &'a Offsets,
    idx: usize,
}

impl<'a> Iterator for Cells<'a> {
    type Item = &'a [usize];

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.idx;
        let (start, end) = match self.offsets {
            Offsets::Implicit(stride) if idx * stride < self.cells.len() => {
                (idx * stride, (idx + 1) * stride)
            }
            Offsets::Explicit(offsets) if idx + 1 < offsets.len() => {
                (offsets[idx], offsets[idx + 1])
            }
            _ => return None,
        };
        self.idx += 1;
        // This iterator can only be created from a valid `Mesh` so there cannot be bounds issues
        Some(&self.cells[start..end])
    }
}

impl Mesh {
    /// Creates a mesh whose cells all have `stride` vertices.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the cells cannot be split evenly, or if any cell is
    /// invalid (see [`Mesh::with_offsets`]).
    pub fn with_stride<P>(points: Vec<P>, cells: Vec<usize>, stride: usize) -> Result<Self>
    where
        P: Into<Point>,
    {
        if stride == 0 || cells.len() % stride != 0 {
            return Err(Error::MalformedInput(format!(
                "{} cell indices cannot be split in cells of {} vertices",
                cells.len(),
                stride
            )));
        }
        let mesh = Self {
            points: points.into_iter().map(Into::into).collect(),
            cells,
            offsets: Offsets::Implicit(stride),
        };
        mesh.validate()?;
        Ok(mesh)
    }

    /// Creates a mesh with cells of arbitrary sizes, cell `i` spanning
    /// `cells[offsets[i]..offsets[i + 1]]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the offsets are not increasing from `0` to
    /// `cells.len()`, if a cell has fewer than 3 vertices, references a vertex that does not exist
    /// or visits the same vertex twice in a row, or if a point is not finite.
    pub fn with_offsets<P>(points: Vec<P>, cells: Vec<usize>, offsets: Vec<usize>) -> Result<Self>
    where
        P: Into<Point>,
    {
        if offsets.first() != Some(&0) || offsets.last() != Some(&cells.len()) {
            return Err(Error::MalformedInput(
                "offsets should start at 0 and end at the number of cell indices".to_string(),
            ));
        }
        if offsets.iter().tuple_windows().any(|(a, b)| a > b) {
            return Err(Error::MalformedInput(
                "offsets should be non-decreasing".to_string(),
            ));
        }
        let mesh = Self {
            points: points.into_iter().map(Into::into).collect(),
            cells,
            offsets: Offsets::Explicit(offsets),
        };
        mesh.validate()?;
        Ok(mesh)
    }

    /// Creates a mesh from one vertex-index list per face.
    pub fn from_faces<P>(points: Vec<P>, faces: Vec<Vec<usize>>) -> Result<Self>
    where
        P: Into<Point>,
    {
        let mut offsets = Vec::with_capacity(faces.len() + 1);
        offsets.push(0);
        let mut cells = Vec::with_capacity(faces.iter().map(Vec::len).sum());
        for face in faces {
            cells.extend(face);
            offsets.push(cells.len());
        }
        Self::with_offsets(points, cells, offsets)
    }

    /// Creates a regular grid of `nx` by `ny` quadrangles covering `[xmin, xmax] x [ymin, ymax]`.
    ///
    /// Cells are numbered from left to right, then from bottom to top, and are counter-clockwise.
    pub fn grid(xmin: f64, xmax: f64, ymin: f64, ymax: f64, nx: usize, ny: usize) -> Result<Self> {
        if nx == 0 || ny == 0 || xmin >= xmax || ymin >= ymax {
            return Err(Error::MalformedInput(format!(
                "cannot build a {}x{} grid over [{}, {}] x [{}, {}]",
                nx, ny, xmin, xmax, ymin, ymax
            )));
        }
        let dx = (xmax - xmin) / nx as f64;
        let dy = (ymax - ymin) / ny as f64;
        let points: Vec<Point> = (0..=ny)
            .cartesian_product(0..=nx)
            .map(|(j, i)| Point::new(xmin + i as f64 * dx, ymin + j as f64 * dy))
            .collect();
        let cells: Vec<usize> = (0..ny)
            .cartesian_product(0..nx)
            .flat_map(|(j, i)| {
                let a = j * (nx + 1) + i;
                [a, a + 1, a + nx + 2, a + nx + 1]
            })
            .collect();
        Self::with_stride(points, cells, 4)
    }

    fn validate(&self) -> Result<()> {
        let nv = self.points.len();
        if let Some(idx) = self.points.iter().position(|p| !p.is_finite()) {
            return Err(Error::MalformedInput(format!(
                "point {} has a non-finite coordinate",
                idx
            )));
        }
        for (idx, cell) in self.cells().enumerate() {
            if cell.len() < 3 {
                return Err(Error::MalformedInput(format!(
                    "cell {} has {} vertices, at least 3 are needed",
                    idx,
                    cell.len()
                )));
            }
            if let Some(&v) = cell.iter().find(|&&v| v >= nv) {
                return Err(Error::MalformedInput(format!(
                    "cell {} references vertex {} but there are only {} vertices",
                    idx, v, nv
                )));
            }
            if cell.iter().circular_tuple_windows().any(|(a, b)| a == b) {
                return Err(Error::MalformedInput(format!(
                    "cell {} visits the same vertex twice in a row",
                    idx
                )));
            }
        }
        Ok(())
    }

    pub fn vertex_count(&self) -> usize {
        self.points.len()
    }

    pub fn cell_count(&self) -> usize {
        match &self.offsets {
            Offsets::Implicit(stride) => self.cells.len() / stride,
            Offsets::Explicit(offsets) => offsets.len() - 1,
        }
    }

    /// Total number of cell sides, counting shared sides once per cell.
    pub fn facet_count(&self) -> usize {
        self.cells.len()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn coords(&self, idx: usize) -> Point {
        self.points[idx]
    }

    pub fn cells(&self) -> Cells<'_> {
        Cells {
            cells: &self.cells,
            offsets: &self.offsets,
            idx: 0,
        }
    }

    /// Iterates over the points of cell `idx`.
    pub fn cell_vertices(&self, idx: usize) -> impl Iterator<Item = &Point> + Clone + '_ {
        let range = match &self.offsets {
            Offsets::Implicit(stride) => idx * stride..(idx + 1) * stride,
            Offsets::Explicit(offsets) => offsets[idx]..offsets[idx + 1],
        };
        self.cells[range].iter().map(|&v| &self.points[v])
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;

    #[test]
    fn create_mesh_with_stride() -> Result<()> {
        let points = vec![[0., 0.], [1., 0.], [0., 1.]];
        let cells = vec![0, 1, 2];
        let mesh = Mesh::with_stride(points, cells, 3)?;

        assert_eq!(mesh.cell_count(), 1);
        assert_eq!(mesh.vertex_count(), 3);

        Ok(())
    }

    #[test]
    fn create_mesh_with_offsets() -> Result<()> {
        let points = vec![[0., 0.], [1., 0.], [0., 1.]];
        let cells = vec![0, 1, 2];
        let offsets = vec![0, 3];
        let mesh = Mesh::with_offsets(points, cells, offsets)?;

        assert_eq!(mesh.cell_count(), 1);

        Ok(())
    }

    #[test]
    fn create_mesh_with_mixed_cell_types() -> Result<()> {
        let points = vec![[0., 0.], [1., 0.], [1., 1.], [0., 1.], [0.5, 1.5]];
        let faces = vec![vec![0, 1, 2, 3], vec![3, 2, 4]];
        let mesh = Mesh::from_faces(points, faces)?;

        assert_eq!(mesh.cell_count(), 2);
        assert_eq!(mesh.facet_count(), 7);

        Ok(())
    }

    #[test]
    fn iterate_over_cells_with_single_cell_type() -> Result<()> {
        let points = vec![[0., 0.], [1., 0.], [1., 1.], [0., 1.]];
        let cells = vec![0, 1, 3, 1, 2, 3];
        let mesh = Mesh::with_stride(points, cells, 3)?;

        let mut cells = mesh.cells();

        assert_eq!(cells.next(), Some([0, 1, 3].as_slice()));
        assert_eq!(cells.next(), Some([1, 2, 3].as_slice()));
        assert_eq!(cells.next(), None);

        Ok(())
    }

    #[test]
    fn iterate_over_cells_with_mixed_cell_type() -> Result<()> {
        let points = vec![[0., 0.], [1., 0.], [1., 1.], [0., 1.], [0.5, 1.5]];
        let cells = vec![0, 1, 2, 3, 3, 2, 4];
        let offsets = vec![0, 4, 7];
        let mesh = Mesh::with_offsets(points, cells, offsets)?;

        let mut cells = mesh.cells();

        assert_eq!(cells.next(), Some([0, 1, 2, 3].as_slice()));
        assert_eq!(cells.next(), Some([3, 2, 4].as_slice()));
        assert_eq!(cells.next(), None);

        Ok(())
    }

    #[test]
    fn invalid_inputs() {
        let points = || vec![[0., 0.], [1., 0.], [0., 1.]];

        // Indices cannot be split evenly
        assert!(Mesh::with_stride(points(), vec![0, 1, 2, 0], 3).is_err());
        // Vertex out of bounds
        assert!(Mesh::with_stride(points(), vec![0, 1, 3], 3).is_err());
        // Not enough vertices
        assert!(Mesh::with_stride(points(), vec![0, 1], 2).is_err());
        // Repeated vertex
        assert!(Mesh::with_stride(points(), vec![0, 1, 1], 3).is_err());
        // Offsets not covering the cells
        assert!(Mesh::with_offsets(points(), vec![0, 1, 2], vec![0, 2]).is_err());
        // Not finite
        assert!(Mesh::with_stride(vec![[0., f64::NAN], [1., 0.], [0., 1.]], vec![0, 1, 2], 3).is_err());

        assert!(matches!(
            Mesh::with_stride(points(), vec![0, 1, 3], 3),
            Err(Error::MalformedInput(..))
        ));
    }

    #[test]
    fn grid() -> Result<()> {
        let mesh = Mesh::grid(0., 2., 0., 1., 2, 1)?;

        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.cell_count(), 2);
        let first: Vec<_> = mesh.cell_vertices(0).copied().collect();
        assert_eq!(
            first,
            vec![
                Point::new(0., 0.),
                Point::new(1., 0.),
                Point::new(1., 1.),
                Point::new(0., 1.)
            ]
        );
        assert!(Mesh::grid(0., 1., 0., 1., 0, 1).is_err());

        Ok(())
    }
}
