use std::collections::HashMap;

use itertools::Itertools;
use smallvec::SmallVec;

use super::{Dcel, Face, FaceId, Hedge, HedgeId, VertexId};
use crate::error::{Error, Result};
use crate::geometry::{polygon, Point};
use crate::mesh::Mesh;

impl Dcel {
    /// Constructs a new [`Dcel`] from a [`Mesh`].
    ///
    /// Cell `i` of the mesh becomes face `i + 1`, face `0` being the unbounded face. Cells given
    /// clockwise are reversed so that every bounded face runs counter-clockwise. Sides that belong
    /// to a single cell get a twin on the unbounded face, and these boundary half-edges are linked
    /// into one inner chain of the unbounded face per boundary loop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] for cells with no area, and [`Error::NonManifold`] if two
    /// cells use the same side in the same direction (i.e. they overlap), or if the boundary loops
    /// cannot be closed.
    pub fn from_mesh(mesh: &Mesh) -> Result<Self> {
        let nv = mesh.vertex_count();
        let nc = mesh.cell_count();
        let nf = mesh.facet_count();

        let mut dcel = Self::with_capacity(nv, 2 * nf, nc + 1);
        for &point in mesh.points() {
            dcel.add_vertex(point);
        }

        let mut edges: HashMap<(usize, usize), HedgeId> = HashMap::with_capacity(nf);
        for (idx, cell) in mesh.cells().enumerate() {
            let points: Vec<Point> = cell.iter().map(|&v| mesh.coords(v)).collect();
            if polygon::signed_area(points.iter().copied()).abs() <= f64::EPSILON {
                return Err(Error::MalformedInput(format!("cell {} has no area", idx)));
            }
            let order: Vec<usize> = if polygon::is_counterclockwise(&points) {
                cell.to_vec()
            } else {
                cell.iter().rev().copied().collect()
            };

            let face = dcel.add_face(Face::default());
            let first = dcel.hedges.len();
            let n = order.len();
            for (k, (&a, &b)) in order.iter().circular_tuple_windows().enumerate() {
                let id = HedgeId(first + k);
                if edges.contains_key(&(a, b)) {
                    return Err(Error::NonManifold(format!(
                        "side {} -> {} is used by more than one cell",
                        a, b
                    )));
                }
                let twin = edges.get(&(b, a)).copied();
                if let Some(twin) = twin {
                    // We have already seen the current half-edge's twin, and we know the current
                    // half-edge is its twin!
                    dcel.get_hedge_mut(twin).twin = Some(id);
                }
                edges.insert((a, b), id);

                dcel.add_hedge(Hedge {
                    origin: VertexId(a),
                    twin,
                    face: Some(face),
                    next: Some(HedgeId(first + (k + 1) % n)),
                    prev: Some(HedgeId(first + (k + n - 1) % n)),
                });
                dcel.vertices[a].out_edge.get_or_insert(id);
            }
            dcel.faces[face.0].outer = Some(HedgeId(first));
        }

        dcel.close_boundary()?;
        tracing::debug!(
            vertices = dcel.vertex_count(),
            hedges = dcel.hedge_count(),
            faces = dcel.face_count(),
            boundary_loops = dcel.get_face(FaceId::OUTER).inner.len(),
            "built half-edge mesh"
        );
        Ok(dcel)
    }

    /// Builds a [`Dcel`] from a vertex list and one vertex-index list per face.
    pub fn build_from_faces(points: Vec<Point>, faces: Vec<Vec<usize>>) -> Result<Self> {
        Self::from_mesh(&Mesh::from_faces(points, faces)?)
    }

    /// Builds a [`Dcel`] made of a single axis-aligned rectangle.
    pub fn rectangle(min: Point, max: Point) -> Result<Self> {
        let points = vec![
            min,
            Point::new(max.x, min.y),
            max,
            Point::new(min.x, max.y),
        ];
        Self::build_from_faces(points, vec![vec![0, 1, 2, 3]])
    }

    /// Gives a twin on the unbounded face to every half-edge without one, then links these new
    /// half-edges into boundary loops.
    fn close_boundary(&mut self) -> Result<()> {
        let first_boundary = self.hedges.len();
        for inner in 0..first_boundary {
            let inner = HedgeId(inner);
            if self.get_hedge(inner).twin.is_some() {
                continue;
            }
            let origin = self.origin(self.next(inner)?);
            let boundary = self.add_hedge(Hedge {
                origin,
                twin: Some(inner),
                face: Some(FaceId::OUTER),
                next: None,
                prev: None,
            });
            self.get_hedge_mut(inner).twin = Some(boundary);
        }

        for boundary in (first_boundary..self.hedges.len()).map(HedgeId) {
            // Iterate over the umbrella of the boundary half-edge's destination to find the next
            // boundary half-edge
            let mut inner = self.twin(boundary)?;
            let mut steps = 0;
            let next = loop {
                let candidate = self.twin(self.prev(inner)?)?;
                if self.face(candidate)? == FaceId::OUTER {
                    break candidate;
                }
                steps += 1;
                if steps > first_boundary {
                    return Err(Error::NonManifold(format!(
                        "no boundary half-edge follows {:?}",
                        boundary
                    )));
                }
                inner = candidate;
            };
            if self.get_hedge(next).prev.is_some() {
                return Err(Error::NonManifold(format!(
                    "{:?} follows more than one boundary half-edge",
                    next
                )));
            }
            self.get_hedge_mut(boundary).next = Some(next);
            self.get_hedge_mut(next).prev = Some(boundary);
        }

        let mut seen = vec![false; self.hedges.len()];
        let mut loops = SmallVec::new();
        for start in first_boundary..self.hedges.len() {
            if seen[start] {
                continue;
            }
            for hedge in self.chain(HedgeId(start))? {
                seen[hedge.0] = true;
            }
            loops.push(HedgeId(start));
        }
        self.faces[FaceId::OUTER.0].inner = loops;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;
    use crate::dcel::tests::{four_quadrangles, two_triangles};

    fn one_triangle() -> Mesh {
        //
        //                             Half-edges
        //   2                |
        //   +                |        +
        //   |\               |        |\
        //   | \              |        | \
        //   |  \             |        |  \
        //   |   \            |       5|  1\4
        //   |    \           |        |2   \
        //   |  1  \          |        |     \
        //   |      \         |        |   0  \
        //   +-------+        |        +-------+
        //   0       1        |            3
        //
        let points = vec![[0., 0.], [1., 0.], [0., 1.]];
        let cells = vec![0, 1, 2];
        Mesh::with_stride(points, cells, 3).expect("This should be a valid input")
    }

    fn nexts_and_prevs(dcel: &Dcel, face: usize) -> Result<(Vec<usize>, Vec<usize>)> {
        let mut nexts = Vec::new();
        let mut prevs = Vec::new();
        let start = dcel.get_face(FaceId(face)).outer.unwrap();
        for hedge in dcel.chain(start)? {
            nexts.push(dcel.next(hedge)?.0);
            prevs.push(dcel.prev(hedge)?.0);
        }
        Ok((nexts, prevs))
    }

    fn boundary_origins(dcel: &Dcel, idx: usize) -> Result<Vec<usize>> {
        let start = dcel.get_face(FaceId::OUTER).inner[idx];
        Ok(dcel
            .chain(start)?
            .into_iter()
            .map(|hedge| dcel.origin(hedge).0)
            .collect())
    }

    #[test]
    fn create_one_triangle_dcel() -> Result<()> {
        let dcel = Dcel::from_mesh(&one_triangle())?;

        assert_eq!(dcel.face_count(), 2);
        assert_eq!(dcel.hedge_count(), 6);
        let vertex_ids: Vec<_> = dcel.face_vertices(FaceId(1))?;
        assert_eq!(vertex_ids, [0, 1, 2].map(VertexId));
        let verts = dcel.face_points(FaceId(1))?;
        assert_eq!(verts, [[0., 0.], [1., 0.], [0., 1.]].map(Point::from));
        assert_eq!(boundary_origins(&dcel, 0)?, vec![1, 0, 2]);
        dcel.check()?;

        Ok(())
    }

    #[test]
    fn create_two_triangle_dcel() -> Result<()> {
        //
        //                             Half-edges
        //   3       2        |            9
        //   +-------+        |        +-------+
        //   |\      |        |        |\  4   |
        //   | \  2  |        |        | \     |
        //   |  \    |        |        |  \   3|
        //   |   \   |        |       7|  1\5  |8
        //   |    \  |        |        |2   \  |
        //   |  1  \ |        |        |     \ |
        //   |      \|        |        |   0  \|
        //   +-------+        |        +-------+
        //   0       1        |            6
        //
        let dcel = Dcel::from_mesh(&two_triangles())?;

        assert_eq!(dcel.face_vertices(FaceId(1))?, [0, 1, 3].map(VertexId));
        assert_eq!(dcel.face_vertices(FaceId(2))?, [1, 2, 3].map(VertexId));

        for face in [1, 2] {
            let start = dcel.get_face(FaceId(face)).outer.unwrap();
            for hedge in dcel.chain(start)? {
                assert_eq!(dcel.face(hedge)?, FaceId(face));
            }
        }

        assert_eq!(nexts_and_prevs(&dcel, 1)?, (vec![1, 2, 0], vec![2, 0, 1]));
        assert_eq!(nexts_and_prevs(&dcel, 2)?, (vec![4, 5, 3], vec![5, 3, 4]));

        assert_eq!(dcel.get_face(FaceId::OUTER).inner.len(), 1);
        assert_eq!(boundary_origins(&dcel, 0)?, vec![1, 0, 3, 2]);

        Ok(())
    }

    #[test]
    fn create_four_quadrangle_dcel() -> Result<()> {
        //
        //                                   Half-edges
        //                        |           20   23
        //   +-----+-----+        |        +-----+-----+
        //   |     |     |        |        |  10 | 14  |
        //   |  3  |  4  |        |      21|11  9|15 13|22
        //   |     |     |        |        |  8  | 12  |
        //   +-----+-----+        |        +-----+-----+
        //   |     |     |        |        |  2  |  6  |
        //   |  1  |  2  |        |      17|3   1|7   5|19
        //   |     |     |        |        |  0  |  4  |
        //   +-----+-----+        |        +-----+-----+
        //                        |          16     18
        //
        let dcel = Dcel::from_mesh(&four_quadrangles())?;

        assert_eq!(dcel.face_vertices(FaceId(1))?, [0, 1, 4, 3].map(VertexId));
        assert_eq!(dcel.face_vertices(FaceId(2))?, [1, 2, 5, 4].map(VertexId));
        assert_eq!(dcel.face_vertices(FaceId(3))?, [3, 4, 7, 6].map(VertexId));
        assert_eq!(dcel.face_vertices(FaceId(4))?, [4, 5, 8, 7].map(VertexId));
        assert_eq!(
            dcel.face_points(FaceId(2))?,
            [[1., 0.], [2., 0.], [2., 1.], [1., 1.]].map(Point::from)
        );

        assert_eq!(
            nexts_and_prevs(&dcel, 1)?,
            (vec![1, 2, 3, 0], vec![3, 0, 1, 2])
        );
        assert_eq!(
            nexts_and_prevs(&dcel, 2)?,
            (vec![5, 6, 7, 4], vec![7, 4, 5, 6])
        );
        assert_eq!(
            nexts_and_prevs(&dcel, 3)?,
            (vec![9, 10, 11, 8], vec![11, 8, 9, 10])
        );
        assert_eq!(
            nexts_and_prevs(&dcel, 4)?,
            (vec![13, 14, 15, 12], vec![15, 12, 13, 14])
        );

        assert_eq!(boundary_origins(&dcel, 0)?, vec![1, 0, 3, 6, 7, 8, 5, 2]);

        Ok(())
    }

    #[test]
    fn twins() -> Result<()> {
        // Triangles
        let dcel = Dcel::from_mesh(&two_triangles())?;

        let twins = dcel
            .hedge_ids()
            .map(|hedge| dcel.twin(hedge))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let expected_twins = [6, 5, 7, 8, 9, 1, 0, 2, 3, 4].map(HedgeId);
        assert_eq!(twins, expected_twins);

        // Check that the twins' origin is the same as the next hedge's origin
        for hedge in dcel.hedge_ids() {
            assert_eq!(
                dcel.origin(dcel.twin(hedge)?),
                dcel.origin(dcel.next(hedge)?)
            );
        }

        // Quadrangles
        let dcel = Dcel::from_mesh(&four_quadrangles())?;

        let twins = dcel
            .hedge_ids()
            .map(|hedge| dcel.twin(hedge))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let expected_twins = [
            16, 7, 8, 17, 18, 19, 12, 1, 2, 15, 20, 21, 6, 22, 23, 9, 0, 3, 4, 5, 10, 11, 13, 14,
        ]
        .map(HedgeId);
        assert_eq!(twins, expected_twins);

        for hedge in dcel.hedge_ids() {
            assert_eq!(
                dcel.origin(dcel.twin(hedge)?),
                dcel.origin(dcel.next(hedge)?)
            );
        }

        Ok(())
    }

    #[test]
    fn clockwise_cells_are_reversed() -> Result<()> {
        let points = vec![[0., 0.], [1., 0.], [1., 1.], [0., 1.]];
        let dcel = Dcel::from_mesh(&Mesh::with_stride(points, vec![0, 3, 2, 1], 4)?)?;

        assert_eq!(dcel.face_vertices(FaceId(1))?, [1, 2, 3, 0].map(VertexId));
        dcel.check()?;

        Ok(())
    }

    #[test]
    fn hole_gives_a_second_boundary_loop() -> Result<()> {
        //
        //   12   13   14   15
        //   +----+----+----+
        //   |    |    |    |
        // 8 +----+----+----+ 11
        //   |    |    |    |
        // 4 +----+----+----+ 7
        //   |    |    |    |
        //   +----+----+----+
        //   0    1    2    3
        //
        // The middle cell is left out.
        let mesh = Mesh::grid(0., 3., 0., 3., 3, 3)?;
        let cells: Vec<Vec<usize>> = mesh
            .cells()
            .enumerate()
            .filter(|&(idx, _)| idx != 4)
            .map(|(_, cell)| cell.to_vec())
            .collect();
        let dcel = Dcel::build_from_faces(mesh.points().to_vec(), cells)?;

        dcel.check()?;
        assert_eq!(dcel.face_count(), 9);
        assert_eq!(dcel.get_face(FaceId::OUTER).inner.len(), 2);
        assert_eq!(boundary_origins(&dcel, 0)?.len(), 12);
        assert_eq!(boundary_origins(&dcel, 1)?.len(), 4);
        assert!(dcel.face_contains(FaceId::OUTER, &Point::new(1.5, 1.5))?);
        assert!(dcel.face_contains(FaceId::OUTER, &Point::new(-1., 1.5))?);
        assert!(!dcel.face_contains(FaceId::OUTER, &Point::new(0.5, 1.5))?);

        Ok(())
    }

    #[test]
    fn faces_touching_at_a_vertex() -> Result<()> {
        let points = vec![[0., 0.], [1., 0.], [1., 1.], [2., 1.], [2., 2.]];
        let dcel = Dcel::build_from_faces(
            points.into_iter().map(Point::from).collect(),
            vec![vec![0, 1, 2], vec![2, 3, 4]],
        )?;

        dcel.check()?;
        assert_eq!(dcel.get_face(FaceId::OUTER).inner.len(), 2);

        Ok(())
    }

    #[test]
    fn overlapping_cells_are_not_manifold() {
        let points = vec![[0., 0.], [1., 0.], [0., 1.]];
        let mesh = Mesh::with_stride(points, vec![0, 1, 2, 0, 1, 2], 3).unwrap();

        assert!(matches!(
            Dcel::from_mesh(&mesh),
            Err(Error::NonManifold(..))
        ));
    }

    #[test]
    fn flat_cells_are_rejected() {
        let points = vec![[0., 0.], [1., 0.], [2., 0.]];
        let mesh = Mesh::with_stride(points, vec![0, 1, 2], 3).unwrap();

        assert!(matches!(
            Dcel::from_mesh(&mesh),
            Err(Error::MalformedInput(..))
        ));
    }

    #[test]
    fn rectangle() -> Result<()> {
        let dcel = Dcel::rectangle(Point::new(-1., -2.), Point::new(3., 4.))?;

        assert_eq!(dcel.face_count(), 2);
        assert_eq!(dcel.vertex_count(), 4);
        assert!(dcel.face_contains(FaceId(1), &Point::new(0., 0.))?);
        dcel.check()?;

        Ok(())
    }
}
