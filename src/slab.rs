use std::cmp::Ordering;

use itertools::Itertools;
use smallvec::SmallVec;

use crate::dcel::{Dcel, FaceId, HedgeId};
use crate::error::{Error, Result};
use crate::geometry::{approx_cmp, FullEdge, Point, Positioning};
use crate::point_locator::PointLocator;
use crate::versioned_tree::{Compare, RbTree, VersionedTree};

/// Key of the sweep structure: either an edge of the mesh, or a query point probing the edges.
#[derive(Clone, Copy, Debug)]
pub enum SlabKey {
    Edge(FullEdge),
    Probe(Point),
}

/// An edge crossing a slab, with the faces on both of its sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlabEdge {
    /// The half-edge of the edge that goes from left to right.
    pub hedge: HedgeId,
    pub above: FaceId,
    pub below: FaceId,
}

/// Orders edges from bottom to top, and places probes among them.
///
/// Two edges are compared at the middle of the x-range they share, which is meaningful for edges
/// that cross a common slab and do not intersect.
#[derive(Clone, Copy, Debug, Default)]
pub struct EdgeOrder;

impl Compare<SlabKey> for EdgeOrder {
    fn compare(&self, a: &SlabKey, b: &SlabKey) -> Ordering {
        match (a, b) {
            (SlabKey::Edge(a), SlabKey::Edge(b)) => compare_edges(a, b),
            (SlabKey::Edge(edge), SlabKey::Probe(point)) => compare_edge_to_point(edge, point),
            (SlabKey::Probe(point), SlabKey::Edge(edge)) => {
                compare_edge_to_point(edge, point).reverse()
            }
            (SlabKey::Probe(a), SlabKey::Probe(b)) => approx_cmp(a.y, b.y),
        }
    }
}

fn compare_edges(a: &FullEdge, b: &FullEdge) -> Ordering {
    let lo = a.left().x.max(b.left().x);
    let hi = a.right().x.min(b.right().x);
    let x = if hi > lo { (lo + hi) / 2. } else { lo };
    approx_cmp(clamped_y(a, x), clamped_y(b, x)).then_with(|| a.slope().total_cmp(&b.slope()))
}

fn compare_edge_to_point(edge: &FullEdge, point: &Point) -> Ordering {
    match point.position(&edge.left(), &edge.right()) {
        Positioning::Left => Ordering::Less,
        Positioning::On => Ordering::Equal,
        Positioning::Right => Ordering::Greater,
    }
}

/// The y-coordinate of the edge at `x`, with `x` brought back into the edge's x-span.
fn clamped_y(edge: &FullEdge, x: f64) -> f64 {
    let (l, r) = (edge.left(), edge.right());
    if l.x == r.x {
        return l.y.min(r.y);
    }
    let x = x.clamp(l.x, r.x);
    l.y + (x - l.x) * (r.y - l.y) / (r.x - l.x)
}

/// A point locator based on slab decomposition.
///
/// The plane is cut into vertical slabs by the vertical lines going through the vertices of the
/// mesh. Within a slab, the edges crossing it are totally ordered from bottom to top, so locating
/// a point boils down to a binary search for the slab, then a binary search for the edges
/// directly above and below the point.
///
/// Storing the ordered edges of every slab separately would take *O*(*n*²) space, but two
/// consecutive slabs only differ by the edges that start or end in between. The slabs are thus
/// built by sweeping a vertical line from left to right and updating a single
/// [`VersionedTree`], one version per slab.
#[derive(Debug)]
pub struct SlabLocator<'a> {
    dcel: &'a Dcel,
    tree: VersionedTree<SlabKey, SlabEdge, EdgeOrder>,
}

impl<'a> SlabLocator<'a> {
    /// Builds the slabs of a mesh.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMesh`] if the mesh has fewer than 3 vertices, and propagates the
    /// errors met while traversing a malformed mesh.
    pub fn build(dcel: &'a Dcel) -> Result<Self> {
        if dcel.vertex_count() < 3 {
            return Err(Error::InvalidMesh(format!(
                "at least 3 vertices are needed, got {}",
                dcel.vertex_count()
            )));
        }

        let mut hedges: Vec<(f64, HedgeId)> = dcel
            .hedge_ids()
            .map(|hedge| (dcel.point(dcel.origin(hedge)).x, hedge))
            .collect();
        hedges.sort_by(|(x1, _), (x2, _)| x1.total_cmp(x2));

        let mut tree = VersionedTree::with_comparator(EdgeOrder);
        for (x, group) in &hedges.iter().group_by(|&&(x, _)| x) {
            tree.set_instant(x)?;
            let mut leaving = Vec::new();
            let mut entering = Vec::new();
            for &(_, hedge) in group {
                let destination = dcel.point(dcel.destination(hedge)?);
                if destination.x < x {
                    leaving.push(hedge);
                } else if destination.x > x {
                    entering.push(hedge);
                }
            }
            // Edges ending here go first, so that the edges starting here are only compared to
            // edges that keep going to the right
            for &hedge in &leaving {
                let (key, value) = slab_entry(dcel, hedge)?;
                tree.this_instant().delete(&key, Some(&value))?;
            }
            for &hedge in &entering {
                let (key, value) = slab_entry(dcel, hedge)?;
                tree.this_instant().insert(key, value);
            }
            tracing::trace!(
                x,
                removed = leaving.len(),
                inserted = entering.len(),
                "swept vertices"
            );
        }

        tracing::debug!(slabs = tree.version_count(), "built slab decomposition");
        Ok(Self { dcel, tree })
    }

    /// The mesh the locator was built for.
    pub fn mesh(&self) -> &'a Dcel {
        self.dcel
    }

    /// Number of slabs, including the unbounded one to the right of the mesh.
    pub fn slab_count(&self) -> usize {
        self.tree.version_count()
    }

    /// The edges crossing the slab containing abscissa `x`, from bottom to top.
    pub fn slab_at(&self, x: f64) -> Option<&RbTree<SlabKey, SlabEdge, EdgeOrder>> {
        self.tree.at_instant(x)
    }
}

fn slab_entry(dcel: &Dcel, hedge: HedgeId) -> Result<(SlabKey, SlabEdge)> {
    let hedge = if dcel.points_to_the_right(hedge)? {
        hedge
    } else {
        dcel.twin(hedge)?
    };
    let entry = SlabEdge {
        hedge,
        above: dcel.face(hedge)?,
        below: dcel.face(dcel.twin(hedge)?)?,
    };
    Ok((SlabKey::Edge(dcel.full_edge(hedge)?), entry))
}

impl SlabLocator<'_> {
    /// Returns `true` if `point` lies on the edge of a slab entry.
    fn touches(&self, entry: &SlabEdge, point: &Point) -> Result<bool> {
        let edge = self.dcel.full_edge(entry.hedge)?;
        Ok(point.position(&edge.left(), &edge.right()) == Positioning::On)
    }
}

fn push_candidate(candidates: &mut SmallVec<[FaceId; 8]>, face: FaceId) {
    if !face.is_outer() && !candidates.contains(&face) {
        candidates.push(face);
    }
}

impl PointLocator for SlabLocator<'_> {
    /// Locates a point with two binary searches: one for the slab, one for the edges around the
    /// point within the slab.
    ///
    /// When the point lies on an edge or at a vertex, the faces around it are tested one by one
    /// with [`Dcel::face_contains`].
    fn locate_point(&self, point: &Point) -> Result<Option<FaceId>> {
        let Some(slab) = self.tree.at_instant(point.x) else {
            return Ok(None);
        };
        let probe = SlabKey::Probe(*point);
        let (Some(upper), Some(lower)) = (slab.search_up(&probe), slab.search_down(&probe)) else {
            return Ok(None);
        };
        if upper.below == lower.above
            && !self.touches(upper, point)?
            && !self.touches(lower, point)?
        {
            return Ok((!upper.below.is_outer()).then_some(upper.below));
        }

        let mut candidates = SmallVec::new();
        for face in [upper.below, lower.above, upper.above, lower.below] {
            push_candidate(&mut candidates, face);
        }
        // Several edges start at a vertex, only the lowest and highest ones were found
        for entry in [upper, lower] {
            let origin = self.dcel.origin(entry.hedge);
            if self.dcel.point(origin) == *point {
                for hedge in self.dcel.all_edges(origin)? {
                    push_candidate(&mut candidates, self.dcel.face(hedge)?);
                }
            }
        }
        for face in candidates {
            if self.dcel.face_contains(face, point)? {
                return Ok(Some(face));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;
    use crate::mesh::Mesh;

    prop_compose! {
        fn coords_in_range(xmin: f64, xmax: f64, ymin: f64, ymax: f64)
                          (x in xmin..xmax, y in ymin..ymax) -> [f64; 2] {
           [x, y]
        }
    }

    fn triangle() -> Dcel {
        let points = vec![[0., 0.], [1., 0.], [0.5, 0.5]];
        let mesh = Mesh::with_stride(points, vec![0, 1, 2], 3).expect("This should be a valid input");
        Dcel::from_mesh(&mesh).expect("This should be a valid mesh")
    }

    #[test]
    fn too_few_vertices() {
        let dcel = Dcel::new();

        assert!(matches!(
            SlabLocator::build(&dcel),
            Err(Error::InvalidMesh(..))
        ));
    }

    #[test]
    fn edge_order() {
        let low = SlabKey::Edge(FullEdge::new(Point::new(0., 0.), Point::new(2., 0.)));
        let high = SlabKey::Edge(FullEdge::new(Point::new(1., 1.), Point::new(3., 0.5)));
        let probe = SlabKey::Probe(Point::new(1.5, 0.5));
        let on = SlabKey::Probe(Point::new(1., 0.));

        assert_eq!(EdgeOrder.compare(&low, &high), Ordering::Less);
        assert_eq!(EdgeOrder.compare(&high, &low), Ordering::Greater);
        assert_eq!(EdgeOrder.compare(&low, &low), Ordering::Equal);
        assert_eq!(EdgeOrder.compare(&low, &probe), Ordering::Less);
        assert_eq!(EdgeOrder.compare(&probe, &high), Ordering::Less);
        assert_eq!(EdgeOrder.compare(&on, &low), Ordering::Equal);
    }

    #[test]
    fn edges_sharing_a_left_endpoint() {
        let flat = SlabKey::Edge(FullEdge::new(Point::new(0., 0.), Point::new(1., 0.)));
        let steep = SlabKey::Edge(FullEdge::new(Point::new(0., 0.), Point::new(1., 1.)));

        assert_eq!(EdgeOrder.compare(&flat, &steep), Ordering::Less);
    }

    #[test]
    fn unit_square() -> Result<()> {
        let dcel = Dcel::rectangle(Point::new(0., 0.), Point::new(1., 1.))?;
        let locator = SlabLocator::build(&dcel)?;

        assert_eq!(locator.locate_one(&[0.5, 0.5])?, Some(FaceId::new(1)));
        assert_eq!(locator.locate_one(&[2., 2.])?, None);
        // Two slabs: the square and the empty one to its right
        assert_eq!(locator.slab_count(), 2);

        Ok(())
    }

    #[test]
    fn query_needs_two_coordinates() -> Result<()> {
        let dcel = triangle();
        let locator = SlabLocator::build(&dcel)?;

        assert!(matches!(
            locator.locate_one(&[0.5]),
            Err(Error::InsufficientDimensions { .. })
        ));
        assert_eq!(locator.locate_one(&[0.5, 0.1, 7.])?, Some(FaceId::new(1)));

        Ok(())
    }

    #[rstest]
    #[case([0.5, 0.1], Some(1))] // inside
    #[case([0.5, 0.], Some(1))] // on the bottom edge
    #[case([0.25, 0.25], Some(1))] // on the left edge
    #[case([0.75, 0.25], None)] // on the right edge
    #[case([0., 0.], Some(1))] // on the bottom left corner
    #[case([1., 0.], None)] // on the bottom right corner
    #[case([0.5, 0.5], None)] // on the top corner
    #[case([0.5, -0.1], None)] // below
    #[case([0.8, 0.8], None)] // above to the right
    #[case([0.2, 0.8], None)] // above to the left
    #[case([1.2, 0.8], None)] // to the right
    #[case([-0.2, 0.8], None)] // to the left
    fn locate_points_in_single_triangle(#[case] point: [f64; 2], #[case] face: Option<usize>) {
        let dcel = triangle();
        let locator = SlabLocator::build(&dcel).unwrap();

        assert_eq!(
            locator.locate_one(&point).unwrap(),
            face.map(FaceId::new)
        );
    }

    #[test]
    fn locate_points_in_grid() -> Result<()> {
        let dcel = Dcel::from_mesh(&Mesh::grid(0., 1., 0., 1., 2, 2)?)?;
        let locator = SlabLocator::build(&dcel)?;

        let faces = locator.locate_many(&[[0.25, 0.25], [0.75, 0.25], [0.25, 0.75], [0.75, 0.75]])?;

        assert_eq!(faces, [1, 2, 3, 4].map(|idx| Some(FaceId::new(idx))));

        Ok(())
    }

    #[test]
    fn point_on_shared_edge() -> Result<()> {
        //
        //   +-----+-----+
        //   |     |     |
        //   |  1  x  2  |
        //   |     |     |
        //   +-----+-----+
        //
        let dcel = Dcel::from_mesh(&Mesh::grid(0., 2., 0., 1., 2, 1)?)?;
        let locator = SlabLocator::build(&dcel)?;

        let point = Point::new(1., 0.5);
        let face = locator.locate_point(&point)?;

        assert_eq!(face, Some(FaceId::new(2)));
        let containing = dcel
            .face_ids()
            .skip(1)
            .filter(|&face| dcel.face_contains(face, &point).unwrap())
            .count();
        assert_eq!(containing, 1);

        Ok(())
    }

    #[test]
    fn multiply_connected_triangulation() -> Result<()> {
        //
        //  5
        //  +          +
        //  |\         |\
        //  | \        |3\
        // 3+--+4      +--+
        //  |\ |\      |\ |\
        //  | \| \     |1\|2\
        //  +--+--+    +--+--+
        //  0  1  2
        //
        let mesh = Mesh::with_stride(
            vec![[0., 0.], [1., 0.], [2., 0.], [0., 1.], [1., 1.], [0., 2.]],
            vec![0, 1, 3, 1, 2, 4, 3, 4, 5],
            3,
        )?;
        let dcel = Dcel::from_mesh(&mesh)?;
        let locator = SlabLocator::build(&dcel)?;

        assert_eq!(locator.locate_one(&[1. / 3., 1. / 3.])?, Some(FaceId::new(1)));
        assert_eq!(locator.locate_one(&[4. / 3., 1. / 3.])?, Some(FaceId::new(2)));
        assert_eq!(locator.locate_one(&[1. / 3., 4. / 3.])?, Some(FaceId::new(3)));
        // There is no triangle in the middle
        assert_eq!(locator.locate_one(&[2. / 3., 2. / 3.])?, None);

        Ok(())
    }

    #[test]
    fn slab_proptest() -> Result<()> {
        let (xmin, xmax) = (0., 10.);
        let (ymin, ymax) = (0., 10.);
        let (nx, ny) = (6, 7); // Use numbers that don't divide the sides evenly on purpose

        let dcel = Dcel::from_mesh(&Mesh::grid(xmin, xmax, ymin, ymax, nx, ny)?)?;
        let locator = SlabLocator::build(&dcel)?;

        let np = 20;
        proptest!(|(points in proptest::collection::vec(coords_in_range(xmin, xmax, ymin, ymax), np))| {
            let locations = locator.par_locate_many(&points).unwrap();

            // Check results using crossing parity
            for (point, face) in points.iter().map(Point::from).zip(&locations) {
                let Some(face) = face else {
                    panic!("All points should be in a face but {:?} is not", &point);
                };
                prop_assert!(dcel.face_contains(*face, &point).unwrap());
            }
        });

        Ok(())
    }
}
