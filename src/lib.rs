//! Planar point location.
//!
//! Given a planar subdivision stored as a doubly-connected edge list ([`Dcel`]), this crate answers
//! the question "which face contains this point?" with one of two search structures:
//!
//! - a [`SlabLocator`], which cuts the plane into vertical slabs and keeps the edges crossing each
//!   slab in a [`VersionedTree`](versioned_tree::VersionedTree),
//! - a [`TrapMap`], a trapezoidal map built by randomized incremental insertion of the edges and
//!   searched through a directed acyclic graph.
//!
//! Both implement [`PointLocator`] and agree on every query: a point on an edge shared by two
//! faces belongs to the face on its right or above it, the same way [`Dcel::face_contains`]
//! decides it.
//!
//! ```
//! use planeloc::{build_slab_locator, build_trapezoidal_locator, Dcel, FaceId, Mesh, PointLocator};
//!
//! # fn main() -> planeloc::Result<()> {
//! let mesh = Mesh::grid(0., 2., 0., 1., 2, 1)?;
//! let dcel = Dcel::from_mesh(&mesh)?;
//!
//! let slabs = build_slab_locator(&dcel)?;
//! let trap_map = build_trapezoidal_locator(&dcel)?;
//!
//! assert_eq!(slabs.locate_one(&[1.5, 0.5])?, Some(FaceId::new(2)));
//! assert_eq!(trap_map.locate_one(&[1.5, 0.5])?, Some(FaceId::new(2)));
//! assert_eq!(trap_map.locate_one(&[3., 0.5])?, None);
//! # Ok(())
//! # }
//! ```

pub mod dcel;
mod error;
pub mod geometry;
mod mesh;
mod point_locator;
mod slab;
mod trapezoidal_map;
pub mod versioned_tree;

pub use dcel::{Dcel, FaceId, HedgeId, VertexId};
pub use error::{Error, Result};
pub use geometry::{Point, EPSILON};
pub use mesh::Mesh;
pub use point_locator::PointLocator;
pub use slab::{SlabEdge, SlabKey, SlabLocator};
pub use trapezoidal_map::{TrapMap, TrapMapOptions};

/// Builds a [`SlabLocator`] for a mesh.
pub fn build_slab_locator(dcel: &Dcel) -> Result<SlabLocator<'_>> {
    SlabLocator::build(dcel)
}

/// Builds a [`TrapMap`] for a mesh, with the default options.
pub fn build_trapezoidal_locator(dcel: &Dcel) -> Result<TrapMap> {
    TrapMap::build(dcel)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;
    use rstest::rstest;

    use super::*;

    fn random_triangulation(n: usize, seed: u64) -> Result<Dcel> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let points: Vec<delaunator::Point> = (0..n)
            .map(|_| delaunator::Point {
                x: rng.gen::<f64>() * 10.,
                y: rng.gen::<f64>() * 10.,
            })
            .collect();
        let triangulation = delaunator::triangulate(&points);
        let coords: Vec<[f64; 2]> = points.iter().map(|p| [p.x, p.y]).collect();
        let mesh = Mesh::with_stride(coords, triangulation.triangles, 3)?;
        Ok(Dcel::from_mesh(&mesh)?)
    }

    /// A Delaunay triangulation of random points taken from a lattice of step 0.5.
    fn snapped_triangulation(n: usize, seed: u64) -> Result<Dcel> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut lattice: Vec<(i32, i32)> = (0..n)
            .map(|_| (rng.gen_range(0..=20), rng.gen_range(0..=20)))
            .collect();
        lattice.sort_unstable();
        lattice.dedup();
        let points: Vec<delaunator::Point> = lattice
            .into_iter()
            .map(|(i, j)| delaunator::Point {
                x: f64::from(i) * 0.5,
                y: f64::from(j) * 0.5,
            })
            .collect();
        let triangulation = delaunator::triangulate(&points);
        let coords: Vec<[f64; 2]> = points.iter().map(|p| [p.x, p.y]).collect();
        let mesh = Mesh::with_stride(coords, triangulation.triangles, 3)?;
        Ok(Dcel::from_mesh(&mesh)?)
    }

    /// The bounded faces containing a point, found by testing every face.
    fn containing_faces(dcel: &Dcel, point: &Point) -> Result<Vec<FaceId>> {
        let mut faces = Vec::new();
        for face in dcel.face_ids().filter(|face| !face.is_outer()) {
            if dcel.face_contains(face, point)? {
                faces.push(face);
            }
        }
        Ok(faces)
    }

    #[test]
    fn random_triangulation_is_valid() -> Result<()> {
        let dcel = random_triangulation(100, 7)?;

        dcel.check()?;
        assert_eq!(dcel.get_face(FaceId::OUTER).inner().len(), 1);

        Ok(())
    }

    #[rstest]
    fn locators_agree(#[values(1, 2, 3)] seed: u64) -> Result<()> {
        let dcel = random_triangulation(200, seed)?;
        let slabs = build_slab_locator(&dcel)?;
        let trap_map = build_trapezoidal_locator(&dcel)?;
        trap_map.check();

        // Some points fall outside of the convex hull of the triangulation
        let mut rng = ChaCha8Rng::seed_from_u64(seed + 100);
        let query: Vec<[f64; 2]> = (0..600)
            .map(|_| [rng.gen::<f64>() * 12. - 1., rng.gen::<f64>() * 12. - 1.])
            .collect();

        let from_slabs = slabs.locate_many(&query)?;
        let from_trap_map = trap_map.par_locate_many(&query)?;

        assert_eq!(from_slabs, from_trap_map);
        assert!(from_slabs.iter().any(Option::is_some));
        assert!(from_slabs.iter().any(Option::is_none));
        for (point, face) in query.iter().zip(&from_slabs) {
            if let Some(face) = face {
                assert!(dcel.face_contains(*face, &point.into())?);
            }
        }

        Ok(())
    }

    #[rstest]
    fn locators_agree_on_vertices_and_edges(#[values(5, 6)] mesh_seed: u64) -> Result<()> {
        let dcel = snapped_triangulation(100, mesh_seed)?;
        dcel.check()?;
        let slabs = build_slab_locator(&dcel)?;
        let trap_maps = [1, 42, 1234]
            .into_iter()
            .map(|seed| {
                let options = TrapMapOptions {
                    seed,
                    ..Default::default()
                };
                TrapMap::with_options(&dcel, options)
            })
            .collect::<crate::Result<Vec<_>>>()?;

        // Every vertex, the middle of every edge, and a lattice finer than the one of the mesh
        let mut query: Vec<Point> = dcel.vertex_ids().map(|v| dcel.point(v)).collect();
        for hedge in dcel.hedge_ids() {
            let a = dcel.point(dcel.origin(hedge));
            let b = dcel.point(dcel.destination(hedge)?);
            query.push(Point::new((a.x + b.x) / 2., (a.y + b.y) / 2.));
        }
        for i in -2..=42 {
            for j in -2..=42 {
                query.push(Point::new(f64::from(i) * 0.25, f64::from(j) * 0.25));
            }
        }

        for point in &query {
            let expected = containing_faces(&dcel, point)?;
            assert!(expected.len() <= 1, "{:?} is in {:?}", point, expected);
            let expected = expected.first().copied();
            assert_eq!(slabs.locate_point(point)?, expected, "{:?}", point);
            for trap_map in &trap_maps {
                assert_eq!(trap_map.locate_point(point)?, expected, "{:?}", point);
            }
        }

        Ok(())
    }

    #[test]
    fn point_on_shared_edge() -> Result<()> {
        let dcel = Dcel::from_mesh(&Mesh::grid(0., 2., 0., 1., 2, 1)?)?;
        let slabs = build_slab_locator(&dcel)?;
        let trap_map = build_trapezoidal_locator(&dcel)?;

        let point = [1., 0.5];

        assert_eq!(slabs.locate_one(&point)?, Some(FaceId::new(2)));
        assert_eq!(trap_map.locate_one(&point)?, Some(FaceId::new(2)));

        Ok(())
    }

    #[rstest]
    #[case([0.5, 0.5], Some(2))] // on the diagonal
    #[case([0., 0.], Some(1))]
    #[case([1., 0.], None)]
    #[case([0., 1.], None)]
    #[case([1., 1.], None)]
    #[case([0.5, 0.], Some(1))]
    #[case([1., 0.5], None)]
    fn points_on_the_boundaries(#[case] point: [f64; 2], #[case] face: Option<usize>) {
        // Two triangles splitting the unit square along its (1, 0)-(0, 1) diagonal
        let mesh = Mesh::with_stride(
            vec![[0., 0.], [1., 0.], [1., 1.], [0., 1.]],
            vec![0, 1, 3, 1, 2, 3],
            3,
        )
        .unwrap();
        let dcel = Dcel::from_mesh(&mesh).unwrap();
        let slabs = build_slab_locator(&dcel).unwrap();
        let trap_map = build_trapezoidal_locator(&dcel).unwrap();

        let expected = face.map(FaceId::new);
        assert_eq!(slabs.locate_one(&point).unwrap(), expected);
        assert_eq!(trap_map.locate_one(&point).unwrap(), expected);
    }

    #[test]
    fn locators_survive_a_copy() -> Result<()> {
        let dcel = random_triangulation(60, 11)?;
        let copy = dcel.copy();
        copy.check()?;

        assert_eq!(copy.vertex_count(), dcel.vertex_count());
        assert_eq!(copy.hedge_count(), dcel.hedge_count());
        assert_eq!(copy.face_count(), dcel.face_count());

        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let query: Vec<[f64; 2]> = (0..300)
            .map(|_| [rng.gen::<f64>() * 12. - 1., rng.gen::<f64>() * 12. - 1.])
            .collect();
        for point in &query {
            let point = Point::from(point);
            for face in dcel.face_ids() {
                assert_eq!(
                    copy.face_contains(face, &point)?,
                    dcel.face_contains(face, &point)?,
                    "{:?} in {:?}",
                    point,
                    face
                );
            }
        }

        let slabs = build_slab_locator(&dcel)?;
        let copied_slabs = build_slab_locator(&copy)?;
        let trap_map = build_trapezoidal_locator(&dcel)?;
        let copied_trap_map = build_trapezoidal_locator(&copy)?;
        let located = slabs.locate_many(&query)?;
        assert_eq!(copied_slabs.locate_many(&query)?, located);
        assert_eq!(trap_map.locate_many(&query)?, located);
        assert_eq!(copied_trap_map.locate_many(&query)?, located);

        Ok(())
    }
}
