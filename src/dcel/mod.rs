//! Doubly-connected edge list (DCEL), a.k.a. half-edge mesh.
//!
//! All the vertices, half-edges and faces are owned by the [`Dcel`] and stored in arenas, the
//! links between them are typed indices. This way the cyclic pointer graph of a half-edge mesh
//! can be expressed without shared ownership, and ids of one mesh never dangle because the arenas
//! never shrink.

mod build;
mod check;
mod edit;

use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::geometry::{polygon, BoundingBox, FullEdge, Point};

pub use edit::DcelMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct VertexId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct HedgeId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FaceId(pub(crate) usize);

impl VertexId {
    pub const fn new(idx: usize) -> Self {
        Self(idx)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl HedgeId {
    pub const fn new(idx: usize) -> Self {
        Self(idx)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl FaceId {
    /// The unbounded face that surrounds the mesh.
    pub const OUTER: FaceId = FaceId(0);

    pub const fn new(idx: usize) -> Self {
        Self(idx)
    }

    pub const fn index(self) -> usize {
        self.0
    }

    pub const fn is_outer(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone)]
pub struct Vertex {
    pub point: Point,
    pub(crate) out_edge: Option<HedgeId>,
}

impl Vertex {
    /// One half-edge leaving this vertex, if the vertex is connected.
    pub fn out_edge(&self) -> Option<HedgeId> {
        self.out_edge
    }
}

/// One directed side of an edge.
///
/// The face a half-edge bounds lies to its left.
#[derive(Debug, Clone)]
pub struct Hedge {
    pub(crate) origin: VertexId,
    pub(crate) twin: Option<HedgeId>,
    pub(crate) face: Option<FaceId>,
    pub(crate) next: Option<HedgeId>,
    pub(crate) prev: Option<HedgeId>,
}

impl Hedge {
    pub fn origin(&self) -> VertexId {
        self.origin
    }

    pub fn twin(&self) -> Option<HedgeId> {
        self.twin
    }

    pub fn face(&self) -> Option<FaceId> {
        self.face
    }

    pub fn next(&self) -> Option<HedgeId> {
        self.next
    }

    pub fn prev(&self) -> Option<HedgeId> {
        self.prev
    }
}

/// A face of the subdivision.
///
/// Bounded faces have an outer chain running counter-clockwise. The unbounded face has no outer
/// chain, and one inner chain for every boundary loop of the mesh (its outer rim as well as the
/// rims of uncovered holes).
#[derive(Debug, Clone, Default)]
pub struct Face {
    pub(crate) outer: Option<HedgeId>,
    pub(crate) inner: SmallVec<[HedgeId; 1]>,
}

impl Face {
    pub fn outer(&self) -> Option<HedgeId> {
        self.outer
    }

    pub fn inner(&self) -> &[HedgeId] {
        &self.inner
    }

    /// All the chains bounding this face, outer chain first.
    pub fn chains(&self) -> impl Iterator<Item = HedgeId> + '_ {
        self.outer.into_iter().chain(self.inner.iter().copied())
    }
}

/// A planar subdivision stored as a doubly-connected edge list.
#[derive(Debug, Clone)]
pub struct Dcel {
    vertices: Vec<Vertex>,
    hedges: Vec<Hedge>,
    faces: Vec<Face>,
}

impl Default for Dcel {
    fn default() -> Self {
        Self::new()
    }
}

impl Dcel {
    /// Creates an empty subdivision, made of the unbounded face only.
    pub fn new() -> Self {
        Self::with_capacity(0, 0, 1)
    }

    fn with_capacity(nv: usize, nh: usize, nf: usize) -> Self {
        let mut faces = Vec::with_capacity(nf.max(1));
        faces.push(Face::default());
        Self {
            vertices: Vec::with_capacity(nv),
            hedges: Vec::with_capacity(nh),
            faces,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn hedge_count(&self) -> usize {
        self.hedges.len()
    }

    /// Number of faces, the unbounded face included.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + Clone {
        (0..self.vertices.len()).map(VertexId)
    }

    pub fn hedge_ids(&self) -> impl Iterator<Item = HedgeId> + Clone {
        (0..self.hedges.len()).map(HedgeId)
    }

    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + Clone {
        (0..self.faces.len()).map(FaceId)
    }

    pub fn get_vertex(&self, VertexId(n): VertexId) -> &Vertex {
        &self.vertices[n]
    }

    pub fn get_hedge(&self, HedgeId(n): HedgeId) -> &Hedge {
        &self.hedges[n]
    }

    pub fn get_face(&self, FaceId(n): FaceId) -> &Face {
        &self.faces[n]
    }

    fn get_hedge_mut(&mut self, HedgeId(n): HedgeId) -> &mut Hedge {
        &mut self.hedges[n]
    }

    pub fn point(&self, vertex: VertexId) -> Point {
        self.get_vertex(vertex).point
    }

    pub fn origin(&self, hedge: HedgeId) -> VertexId {
        self.get_hedge(hedge).origin
    }

    pub fn twin(&self, hedge: HedgeId) -> Result<HedgeId> {
        self.get_hedge(hedge)
            .twin
            .ok_or_else(|| missing_link("twin", hedge))
    }

    pub fn next(&self, hedge: HedgeId) -> Result<HedgeId> {
        self.get_hedge(hedge)
            .next
            .ok_or_else(|| missing_link("next", hedge))
    }

    pub fn prev(&self, hedge: HedgeId) -> Result<HedgeId> {
        self.get_hedge(hedge)
            .prev
            .ok_or_else(|| missing_link("prev", hedge))
    }

    pub fn face(&self, hedge: HedgeId) -> Result<FaceId> {
        self.get_hedge(hedge)
            .face
            .ok_or_else(|| missing_link("face", hedge))
    }

    /// The vertex a half-edge points to.
    pub fn destination(&self, hedge: HedgeId) -> Result<VertexId> {
        Ok(self.origin(self.twin(hedge)?))
    }

    /// The segment supporting a half-edge.
    pub fn full_edge(&self, hedge: HedgeId) -> Result<FullEdge> {
        Ok(FullEdge::new(
            self.point(self.origin(hedge)),
            self.point(self.destination(hedge)?),
        ))
    }

    /// Returns `true` if the half-edge goes from left to right in the `(x, y)` order.
    pub fn points_to_the_right(&self, hedge: HedgeId) -> Result<bool> {
        let p = self.point(self.origin(hedge));
        let q = self.point(self.destination(hedge)?);
        Ok(q.is_right_of(&p))
    }

    /// Bounds of all the vertices, or [`None`] for an empty mesh.
    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.vertices.iter().map(|vertex| &vertex.point))
    }

    /// The half-edges of the cycle starting at `start`, following `next` links.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedTopology`] if a link is unset or if the cycle does not close.
    pub fn chain(&self, start: HedgeId) -> Result<Vec<HedgeId>> {
        let mut hedges = vec![start];
        let mut current = self.next(start)?;
        while current != start {
            if hedges.len() > self.hedges.len() {
                return Err(Error::MalformedTopology(format!(
                    "the cycle of {:?} does not close",
                    start
                )));
            }
            hedges.push(current);
            current = self.next(current)?;
        }
        Ok(hedges)
    }

    /// The origins of the half-edges of a chain.
    pub fn chain_points(&self, start: HedgeId) -> Result<Vec<Point>> {
        Ok(self
            .chain(start)?
            .into_iter()
            .map(|hedge| self.point(self.origin(hedge)))
            .collect())
    }

    /// Every half-edge leaving `vertex`, in rotational order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedTopology`] if the vertex has no outgoing half-edge or if its
    /// umbrella of half-edges cannot be walked around.
    pub fn all_edges(&self, vertex: VertexId) -> Result<Vec<HedgeId>> {
        let start = self.get_vertex(vertex).out_edge.ok_or_else(|| {
            Error::MalformedTopology(format!("{:?} has no outgoing half-edge", vertex))
        })?;
        let mut hedges = vec![start];
        let mut current = self.next(self.twin(start)?)?;
        while current != start {
            if hedges.len() > self.hedges.len() || self.origin(current) != vertex {
                return Err(Error::MalformedTopology(format!(
                    "the umbrella of {:?} does not close",
                    vertex
                )));
            }
            hedges.push(current);
            current = self.next(self.twin(current)?)?;
        }
        Ok(hedges)
    }

    /// The vertices along the outer chain of a face, empty for the unbounded face.
    pub fn face_vertices(&self, face: FaceId) -> Result<Vec<VertexId>> {
        match self.get_face(face).outer {
            Some(start) => Ok(self
                .chain(start)?
                .into_iter()
                .map(|hedge| self.origin(hedge))
                .collect()),
            None => Ok(Vec::new()),
        }
    }

    /// The points along the outer chain of a face, empty for the unbounded face.
    pub fn face_points(&self, face: FaceId) -> Result<Vec<Point>> {
        Ok(self
            .face_vertices(face)?
            .into_iter()
            .map(|vertex| self.point(vertex))
            .collect())
    }

    /// Tests whether `point` lies in `face`.
    ///
    /// Uses crossing parity over all the chains of the face, which means that faces do not have to
    /// be convex. Points on the left or bottom border of a face belong to it, points on its right or
    /// top border do not, so that a point on an edge shared by two faces belongs to exactly one of
    /// them.
    pub fn face_contains(&self, face: FaceId, point: &Point) -> Result<bool> {
        let record = self.get_face(face);
        if let Some(outer) = record.outer {
            let outer_points = self.chain_points(outer)?;
            let bbox = BoundingBox::from_points(&outer_points);
            if !bbox.map_or(false, |bbox| bbox.contains(point)) {
                return Ok(false);
            }
        }
        let mut crossings = 0;
        for start in record.chains() {
            crossings += polygon::crossings(point, self.chain_points(start)?);
        }
        let odd = crossings % 2 == 1;
        Ok(if record.outer.is_some() { odd } else { !odd })
    }

    fn add_vertex(&mut self, point: Point) -> VertexId {
        let id = VertexId(self.vertices.len());
        self.vertices.push(Vertex {
            point,
            out_edge: None,
        });
        id
    }

    fn add_hedge(&mut self, hedge: Hedge) -> HedgeId {
        let id = HedgeId(self.hedges.len());
        self.hedges.push(hedge);
        id
    }

    fn add_face(&mut self, face: Face) -> FaceId {
        let id = FaceId(self.faces.len());
        self.faces.push(face);
        id
    }
}

fn missing_link(link: &str, hedge: HedgeId) -> Error {
    Error::MalformedTopology(format!("{:?} has no {} half-edge", hedge, link))
}
