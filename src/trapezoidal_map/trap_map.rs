use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use smallvec::SmallVec;
use std::{cmp::Ordering, collections::HashMap};

use crate::dcel::{Dcel, FaceId};
use crate::error::{Error, Result};
use crate::geometry::{BoundingBox, FullEdge, Point, Positioning, EPSILON};
use crate::point_locator::PointLocator;
use crate::trapezoidal_map::dag::Dag;

/// Parameters of the construction of a [`TrapMap`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrapMapOptions {
    /// Seed of the shuffle of the edges.
    pub seed: u64,
    /// Gap between the mesh and the bounding trapezoid, on every side.
    pub margin: f64,
}

impl Default for TrapMapOptions {
    fn default() -> Self {
        Self {
            seed: 1234,
            margin: 0.1,
        }
    }
}

/// Trapezoidal map data structure.
///
/// This is essentially a directed acyclic graph (a.k.a. a DAG)
/// where the nodes can be one of three kinds:
/// - an x-node (associated with a vertex of the mesh)
/// - a y-node (associated with an edge of the mesh)
/// - a trapezoid-node (associated with... a trapezoid!)
///
/// The inner nodes of the DAG can only be x- and y-nodes, while
/// the leaf nodes can only be trapezoid-nodes.
///
/// This data structure has an *expected* *O*(log(*n*)) search time with *O*(*n*) storage, and the
/// probability of a bad maximum query time is very small (see [De Berg et al.]).
///
/// The construction is a *randomized incremental* algorithm: the edges of the mesh are added one
/// at a time in random order, and at each step of the process the DAG is a valid search structure.
/// When an edge is added, the trapezoids it crosses are found with the DAG itself and divided into
/// sub-trapezoids. This is expected to take *O*(*n* \* log(*n*)) time, provided the edges are
/// shuffled!
///
/// The map owns a copy of the mesh it was built from, with its chains oriented the conventional
/// way. Faces are reported with the ids of the original mesh.
///
/// [De Berg et al.]: https://doi.org/10.1007/978-3-540-77974-2
#[derive(Debug)]
pub struct TrapMap {
    pub(crate) dag: Dag<Node>,
    pub(crate) vertices: Vec<Point>,
    mesh: Dcel,
    face_map: HashMap<FaceId, FaceId>,
    source_faces: Vec<FaceId>,
    /// Bounded faces around each vertex of the mesh.
    vertex_faces: Vec<SmallVec<[FaceId; 4]>>,
    bbox: BoundingBox,
}

#[derive(Clone, Debug)]
pub(crate) enum Node {
    X(usize),
    Y(Edge),
    Trap(Trapezoid),
}

impl Node {
    pub(crate) fn get_trap(&self) -> &Trapezoid {
        let Self::Trap(trap) = self else {
            panic!("This is not a Trapezoid")
        };
        trap
    }

    pub(crate) fn get_trap_mut(&mut self) -> &mut Trapezoid {
        let Self::Trap(trap) = self else {
            panic!("This is not a Trapezoid")
        };
        trap
    }
}

/// An edge going from its left endpoint `p` to its right endpoint `q`.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub(crate) struct Edge {
    pub(crate) p: usize,
    pub(crate) q: usize,
    pub(crate) face_above: FaceId,
    pub(crate) face_below: FaceId,
}

impl Edge {
    fn segment(&self, vertices: &[Point]) -> FullEdge {
        FullEdge::new(vertices[self.p], vertices[self.q])
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Trapezoid {
    pub(crate) leftp: usize,
    pub(crate) rightp: usize,
    pub(crate) bottom: Edge,
    pub(crate) top: Edge,
    pub(crate) lower_left: Option<usize>,
    pub(crate) upper_left: Option<usize>,
    pub(crate) lower_right: Option<usize>,
    pub(crate) upper_right: Option<usize>,
}

/// The sides of a trapezoid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct TrapezoidBounds {
    pub(crate) xmin: f64,
    pub(crate) xmax: f64,
    pub(crate) top_left: f64,
    pub(crate) top_right: f64,
    pub(crate) bottom_left: f64,
    pub(crate) bottom_right: f64,
}

impl Trapezoid {
    pub(crate) fn new(leftp: usize, rightp: usize, bottom: Edge, top: Edge) -> Self {
        Self {
            leftp,
            rightp,
            bottom,
            top,
            lower_left: None,
            upper_left: None,
            lower_right: None,
            upper_right: None,
        }
    }

    pub(crate) fn bounds(&self, vertices: &[Point]) -> Result<TrapezoidBounds> {
        let xmin = vertices[self.leftp].x;
        let xmax = vertices[self.rightp].x;
        let top = self.top.segment(vertices);
        let bottom = self.bottom.segment(vertices);
        Ok(TrapezoidBounds {
            xmin,
            xmax,
            top_left: top.y_at(xmin)?,
            top_right: top.y_at(xmax)?,
            bottom_left: bottom.y_at(xmin)?,
            bottom_right: bottom.y_at(xmax)?,
        })
    }

    /// The faces seen from inside the trapezoid, through its bottom and its top.
    pub(crate) fn faces(&self) -> (FaceId, FaceId) {
        (self.bottom.face_above, self.top.face_below)
    }
}

impl TrapMap {
    /// Builds the trapezoidal map of a mesh with the default options.
    pub fn build(dcel: &Dcel) -> Result<Self> {
        Self::with_options(dcel, TrapMapOptions::default())
    }

    /// Builds the trapezoidal map of a mesh.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMesh`] if the mesh has fewer than 3 vertices or if the insertion of
    /// an edge runs into a dead end, which crossing edges may cause. Returns [`Error::OutOfRange`]
    /// if the margin is not positive.
    pub fn with_options(dcel: &Dcel, options: TrapMapOptions) -> Result<Self> {
        let mut trap_map = Self::init(dcel, &options)?;
        let mut edges = trap_map.edges()?;

        // Mix the edges to get good performance (this is a randomized incremental algorithm after all!)
        let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
        edges.shuffle(&mut rng);

        for edge in edges {
            trap_map.add_edge(edge)?;
        }

        let (x_node_count, y_node_count, trap_count) = trap_map.node_count();
        tracing::debug!(
            x_node_count,
            y_node_count,
            trap_count,
            seed = options.seed,
            "built trapezoidal map"
        );
        Ok(trap_map)
    }

    /// Sets up a map with a single trapezoid, the bounding box of the mesh.
    pub(crate) fn init(dcel: &Dcel, options: &TrapMapOptions) -> Result<Self> {
        if dcel.vertex_count() < 3 {
            return Err(Error::InvalidMesh(format!(
                "at least 3 vertices are needed, got {}",
                dcel.vertex_count()
            )));
        }
        if options.margin.is_nan() || options.margin <= 0. {
            return Err(Error::OutOfRange {
                value: options.margin,
                min: 0.,
                max: f64::INFINITY,
            });
        }

        let (mut mesh, map) = dcel.copy_with_map();
        let faces: Vec<FaceId> = mesh.face_ids().collect();
        for face in faces {
            mesh.correct_directionality(face)?;
        }

        let mut source_faces = vec![FaceId::OUTER; mesh.face_count()];
        for (&old, &new) in &map.faces {
            source_faces[new.index()] = old;
        }

        let bbox = mesh
            .bounds()
            .ok_or_else(|| Error::InvalidMesh("the mesh has no vertices".into()))?
            .expanded(options.margin);

        let mut vertex_faces: Vec<SmallVec<[FaceId; 4]>> =
            vec![SmallVec::new(); mesh.vertex_count()];
        for hedge in mesh.hedge_ids() {
            let face = mesh.face(hedge)?;
            let faces = &mut vertex_faces[mesh.origin(hedge).index()];
            if !face.is_outer() && !faces.contains(&face) {
                faces.push(face);
            }
        }

        // The corners of the bounding box go after the vertices of the mesh
        let mut vertices: Vec<Point> = mesh.vertex_ids().map(|v| mesh.point(v)).collect();
        let nv = vertices.len();
        vertices.extend([
            Point::new(bbox.xmin, bbox.ymin),
            Point::new(bbox.xmax, bbox.ymax),
            Point::new(bbox.xmin, bbox.ymax),
            Point::new(bbox.xmax, bbox.ymin),
        ]);
        let bottom = Edge {
            p: nv,
            q: nv + 3,
            face_above: FaceId::OUTER,
            face_below: FaceId::OUTER,
        };
        let top = Edge {
            p: nv + 2,
            q: nv + 1,
            face_above: FaceId::OUTER,
            face_below: FaceId::OUTER,
        };

        let mut dag = Dag::new();
        dag.add(Node::Trap(Trapezoid::new(nv, nv + 1, bottom, top)));

        Ok(Self {
            dag,
            vertices,
            mesh,
            face_map: map.faces,
            source_faces,
            vertex_faces,
            bbox,
        })
    }

    /// The edges of the mesh, each one taken once from left to right.
    ///
    /// Edges of zero length are left out.
    fn edges(&self) -> Result<Vec<Edge>> {
        let mesh = &self.mesh;
        let mut edges = Vec::with_capacity(mesh.hedge_count() / 2);
        for hedge in mesh.hedge_ids() {
            if !mesh.points_to_the_right(hedge)? {
                continue;
            }
            edges.push(Edge {
                p: mesh.origin(hedge).index(),
                q: mesh.destination(hedge)?.index(),
                face_above: mesh.face(hedge)?,
                face_below: mesh.face(mesh.twin(hedge)?)?,
            });
        }
        Ok(edges)
    }

    /// The mesh the map locates points in, with its chains oriented the conventional way.
    pub fn mesh(&self) -> &Dcel {
        &self.mesh
    }

    /// The correspondence between the faces of the original mesh and those of [`Self::mesh`].
    pub fn face_map(&self) -> &HashMap<FaceId, FaceId> {
        &self.face_map
    }

    /// The box covered by the initial trapezoid.
    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    fn trap(&self, idx: usize) -> &Trapezoid {
        self.dag[idx].data.get_trap()
    }

    pub(crate) fn add_edge(&mut self, edge: Edge) -> Result<()> {
        // Old trapezoids are replaced by up to 4 new trapezoids:
        // - `left` is the new trapezoid to the left of p, if it exists
        // - `right` is the new trapezoid to the right of q, if it exists
        // - `above` is the new trapezoid above the inserted edge
        // - `below` is the new trapezoid below the inserted edge

        let trap_ids = self.follow_segment(edge)?;
        tracing::trace!(
            p = edge.p,
            q = edge.q,
            crossed = trap_ids.len(),
            "inserting edge"
        );

        if trap_ids.len() == 1 {
            self.add_edge_crossing_one_trapezoid(edge, trap_ids[0]);
        } else {
            self.add_edge_crossing_multiple_trapezoids(edge, trap_ids);
        }
        Ok(())
    }

    fn add_edge_crossing_one_trapezoid(&mut self, edge: Edge, old_trap_idx: usize) {
        // The old trapezoid is replaced by either 2, 3 or 4 new trapezoids, depending on whether
        // p and q are different from the the old trapezoid's leftp and rightp respectively or
        // not.

        let Edge { p, q, .. } = edge;
        let old = &self.trap(old_trap_idx).clone();

        let p_is_new = p != old.leftp;
        let q_is_new = q != old.rightp;

        let below = Trapezoid::new(p, q, old.bottom, edge);
        let above = Trapezoid::new(p, q, edge, old.top);

        let below_idx = self.dag.add(Node::Trap(below));
        let above_idx = self.dag.add(Node::Trap(above));

        // Connect neighbors
        let left_idx = if p_is_new {
            let left = Trapezoid::new(old.leftp, p, old.bottom, old.top);
            let left_idx = self.dag.add(Node::Trap(left));
            self.connect_lower_neighbors(old.lower_left, Some(left_idx));
            self.connect_upper_neighbors(old.upper_left, Some(left_idx));
            self.connect_lower_neighbors(Some(left_idx), Some(below_idx));
            self.connect_upper_neighbors(Some(left_idx), Some(above_idx));
            Some(left_idx)
        } else {
            self.connect_lower_neighbors(old.lower_left, Some(below_idx));
            self.connect_upper_neighbors(old.upper_left, Some(above_idx));
            None
        };
        let right_idx = if q_is_new {
            let right = Trapezoid::new(q, old.rightp, old.bottom, old.top);
            let right_idx = self.dag.add(Node::Trap(right));
            self.connect_lower_neighbors(Some(right_idx), old.lower_right);
            self.connect_upper_neighbors(Some(right_idx), old.upper_right);
            self.connect_lower_neighbors(Some(below_idx), Some(right_idx));
            self.connect_upper_neighbors(Some(above_idx), Some(right_idx));
            Some(right_idx)
        } else {
            self.connect_lower_neighbors(Some(below_idx), old.lower_right);
            self.connect_upper_neighbors(Some(above_idx), old.upper_right);
            None
        };

        self.replace_old_trap_node(
            old_trap_idx,
            left_idx,
            right_idx,
            above_idx,
            below_idx,
            edge,
        );
    }

    fn add_edge_crossing_multiple_trapezoids(&mut self, edge: Edge, trap_ids: Vec<usize>) {
        let Edge { p, q, .. } = edge;

        // First trapezoid.
        //
        // The old trapezoid is replaced by either 2 or 3 new trapezoids, depending on whether
        // p is different from the the old trapezoid's leftp or not.

        let old_trap_idx = trap_ids[0];
        let old = &self.trap(old_trap_idx).clone();
        let p_is_new = p != old.leftp;

        let below = Trapezoid::new(p, old.rightp, old.bottom, edge);
        let above = Trapezoid::new(p, old.rightp, edge, old.top);

        let below_idx = self.dag.add(Node::Trap(below));
        let above_idx = self.dag.add(Node::Trap(above));

        // Connect neighbors
        self.connect_lower_neighbors(Some(below_idx), old.lower_right);
        self.connect_upper_neighbors(Some(above_idx), old.upper_right);
        let left_idx = if p_is_new {
            let left = Trapezoid::new(old.leftp, p, old.bottom, old.top);
            let left_idx = self.dag.add(Node::Trap(left));
            self.connect_lower_neighbors(old.lower_left, Some(left_idx));
            self.connect_upper_neighbors(old.upper_left, Some(left_idx));
            self.connect_lower_neighbors(Some(left_idx), Some(below_idx));
            self.connect_upper_neighbors(Some(left_idx), Some(above_idx));
            Some(left_idx)
        } else {
            self.connect_lower_neighbors(old.lower_left, Some(below_idx));
            self.connect_upper_neighbors(old.upper_left, Some(above_idx));
            None
        };

        self.replace_old_trap_node(old_trap_idx, left_idx, None, above_idx, below_idx, edge);

        // Keep track of old, above and below to make connections with the following trapezoids
        let mut left_old = old_trap_idx;
        let mut left_above = above_idx;
        let mut left_below = below_idx;

        for &old_trap_idx in trap_ids[1..trap_ids.len() - 1].iter() {
            // Middle trapezoids.
            //
            // The old trapezoid is always replaced by exactly 2 new trapezoids, possibly merged
            // with the ones on their left.

            let old = &self.trap(old_trap_idx).clone();

            let below_idx = if self.trap(left_below).bottom == old.bottom {
                self.dag
                    .entry(left_below)
                    .and_modify(|node| node.get_trap_mut().rightp = old.rightp);
                left_below
            } else {
                self.dag.add(Node::Trap(Trapezoid::new(
                    old.leftp, old.rightp, old.bottom, edge,
                )))
            };

            let above_idx = if self.trap(left_above).top == old.top {
                self.dag
                    .entry(left_above)
                    .and_modify(|node| node.get_trap_mut().rightp = old.rightp);
                left_above
            } else {
                self.dag.add(Node::Trap(Trapezoid::new(
                    old.leftp, old.rightp, edge, old.top,
                )))
            };

            // Connect neighbors
            if below_idx != left_below {
                self.connect_upper_neighbors(Some(left_below), Some(below_idx));
                self.connect_lower_neighbors(
                    if old.lower_left == Some(left_old) {
                        Some(left_below)
                    } else {
                        old.lower_left
                    },
                    Some(below_idx),
                );
            }
            if above_idx != left_above {
                self.connect_lower_neighbors(Some(left_above), Some(above_idx));
                self.connect_upper_neighbors(
                    if old.upper_left == Some(left_old) {
                        Some(left_above)
                    } else {
                        old.upper_left
                    },
                    Some(above_idx),
                );
            }
            self.connect_lower_neighbors(Some(below_idx), old.lower_right);
            self.connect_upper_neighbors(Some(above_idx), old.upper_right);

            self.replace_old_trap_node(old_trap_idx, None, None, above_idx, below_idx, edge);

            left_old = old_trap_idx;
            left_above = above_idx;
            left_below = below_idx;
        }

        // Last trapezoid.
        //
        // The old trapezoid is replaced by either 2 or 3 new trapezoids, depending on whether
        // q is different from the the old trapezoid's rightp or not.

        let old_trap_idx = trap_ids[trap_ids.len() - 1];
        let old = &self.trap(old_trap_idx).clone();
        let q_is_new = q != old.rightp;

        let below_idx = if self.trap(left_below).bottom == old.bottom {
            self.dag
                .entry(left_below)
                .and_modify(|node| node.get_trap_mut().rightp = q);
            left_below
        } else {
            self.dag
                .add(Node::Trap(Trapezoid::new(old.leftp, q, old.bottom, edge)))
        };

        let above_idx = if self.trap(left_above).top == old.top {
            self.dag
                .entry(left_above)
                .and_modify(|node| node.get_trap_mut().rightp = q);
            left_above
        } else {
            self.dag
                .add(Node::Trap(Trapezoid::new(old.leftp, q, edge, old.top)))
        };

        // Connect neighbors
        let right_idx = if q_is_new {
            let right = Trapezoid::new(q, old.rightp, old.bottom, old.top);
            let right_idx = self.dag.add(Node::Trap(right));
            self.connect_lower_neighbors(Some(right_idx), old.lower_right);
            self.connect_upper_neighbors(Some(right_idx), old.upper_right);
            self.connect_lower_neighbors(Some(below_idx), Some(right_idx));
            self.connect_upper_neighbors(Some(above_idx), Some(right_idx));
            Some(right_idx)
        } else {
            self.connect_lower_neighbors(Some(below_idx), old.lower_right);
            self.connect_upper_neighbors(Some(above_idx), old.upper_right);
            None
        };
        if below_idx != left_below {
            self.connect_upper_neighbors(Some(left_below), Some(below_idx));
            self.connect_lower_neighbors(
                if old.lower_left == Some(left_old) {
                    Some(left_below)
                } else {
                    old.lower_left
                },
                Some(below_idx),
            );
        }
        if above_idx != left_above {
            self.connect_lower_neighbors(Some(left_above), Some(above_idx));
            self.connect_upper_neighbors(
                if old.upper_left == Some(left_old) {
                    Some(left_above)
                } else {
                    old.upper_left
                },
                Some(above_idx),
            );
        }

        self.replace_old_trap_node(old_trap_idx, None, right_idx, above_idx, below_idx, edge);
    }

    /// Turns the node of an old trapezoid into the root of the subtree locating its replacements.
    ///
    /// The slot of the old node is reused, so every parent of the old trapezoid now leads to the
    /// new subtree.
    fn replace_old_trap_node(
        &mut self,
        old_trap_idx: usize,
        left_idx: Option<usize>,
        right_idx: Option<usize>,
        above_idx: usize,
        below_idx: usize,
        edge: Edge,
    ) {
        let Edge { p, q, .. } = edge;

        // We need to create a y-node and append the above and below trapezoid-node ids, but
        // before we may need to create 1 or 2 x-nodes.
        let si = match (left_idx, right_idx) {
            (None, None) => {
                let si = old_trap_idx;
                self.dag.entry(si).and_modify(|node| *node = Node::Y(edge));
                Some(si)
            }
            (None, Some(right_idx)) => {
                let qi = old_trap_idx;
                self.dag.entry(qi).and_modify(|node| *node = Node::X(q));
                let si = self.dag.entry(qi).append_new(Node::Y(edge));
                self.dag.entry(qi).append(right_idx);
                si
            }
            (Some(left_idx), None) => {
                let pi = old_trap_idx;
                self.dag.entry(pi).and_modify(|node| *node = Node::X(p));
                self.dag.entry(pi).append(left_idx);
                self.dag.entry(pi).append_new(Node::Y(edge))
            }
            (Some(left_idx), Some(right_idx)) => {
                let pi = old_trap_idx;
                self.dag.entry(pi).and_modify(|node| *node = Node::X(p));
                self.dag.entry(pi).append(left_idx);
                let qi = self.dag.entry(pi).append_new(Node::X(q));
                let si = qi.and_then(|qi| self.dag.entry(qi).append_new(Node::Y(edge)));
                if let Some(qi) = qi {
                    self.dag.entry(qi).append(right_idx);
                }
                si
            }
        };

        if let Some(si) = si {
            self.dag.entry(si).append(above_idx);
            self.dag.entry(si).append(below_idx);
        }
    }

    pub(crate) fn connect_lower_neighbors(&mut self, left: Option<usize>, right: Option<usize>) {
        if let Some(idx) = right {
            self.dag
                .entry(idx)
                .and_modify(|node| node.get_trap_mut().lower_left = left);
        }
        if let Some(idx) = left {
            self.dag
                .entry(idx)
                .and_modify(|node| node.get_trap_mut().lower_right = right);
        }
    }

    pub(crate) fn connect_upper_neighbors(&mut self, left: Option<usize>, right: Option<usize>) {
        if let Some(idx) = right {
            self.dag
                .entry(idx)
                .and_modify(|node| node.get_trap_mut().upper_left = left);
        }
        if let Some(idx) = left {
            self.dag
                .entry(idx)
                .and_modify(|node| node.get_trap_mut().upper_right = right);
        }
    }

    /// The trapezoids crossed by an edge, from left to right.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMesh`] if the walk runs into a trapezoid without a neighbor where
    /// the edge should continue, which happens when it crosses an edge inserted before.
    pub(crate) fn follow_segment(&self, edge: Edge) -> Result<Vec<usize>> {
        let p = self.vertices[edge.p];
        let q = self.vertices[edge.q];

        // Find the first trapezoid intersected by s
        let d0 = self.find_first_trapezoid(edge);

        // Loop to find all the other ones
        let mut res = vec![d0];
        let mut trap = self.trap(d0);
        while q.is_right_of(&self.vertices[trap.rightp]) {
            let rightp = self.vertices[trap.rightp];
            let rightp_above_s = !matches!(rightp.position(&p, &q), Positioning::Right);
            let next = if rightp_above_s {
                trap.lower_right
            } else {
                trap.upper_right
            };
            let Some(dj) = next else {
                return Err(Error::InvalidMesh(format!(
                    "the edge from {:?} to {:?} crosses another edge",
                    p, q
                )));
            };
            trap = self.trap(dj);
            res.push(dj);
        }

        Ok(res)
    }

    pub(crate) fn find_first_trapezoid(&self, edge: Edge) -> usize {
        let p = edge.p;
        let xy = self.vertices[p];
        let slope = edge.segment(&self.vertices).slope();

        let mut d0 = 0;
        loop {
            let node = &self.dag[d0];
            match &node.data {
                Node::Trap(..) => break,
                Node::X(idx) => {
                    let vert = self.vertices[*idx];
                    let left = !(p == *idx || xy.is_right_of(&vert));
                    d0 = if left {
                        node.children[0]
                    } else {
                        node.children[1]
                    };
                }
                Node::Y(edge_i) => {
                    let above = if p == edge_i.p {
                        // s and si share their left endpoint, so we compare the slopes
                        slope > edge_i.segment(&self.vertices).slope()
                    } else {
                        let xy_pi = self.vertices[edge_i.p];
                        let xy_qi = self.vertices[edge_i.q];
                        !matches!(xy.position(&xy_pi, &xy_qi), Positioning::Right)
                    };
                    d0 = if above {
                        node.children[0]
                    } else {
                        node.children[1]
                    };
                }
            }
        }
        d0
    }

    /// Walks the DAG down to the trapezoid containing `point`.
    ///
    /// A point on a vertex is sent to its right and a point on an edge is sent above it, as if it
    /// were shifted by an infinitesimal amount. The edges the point lies on are returned along
    /// with the leaf.
    pub(crate) fn find_node(&self, point: &Point) -> (usize, SmallVec<[Edge; 2]>) {
        let mut node_id = 0;
        let mut on_edges = SmallVec::new();
        loop {
            let node = &self.dag[node_id];
            match &node.data {
                Node::Trap(..) => break,
                Node::X(idx) => {
                    node_id = match point.lex_cmp(&self.vertices[*idx]) {
                        Ordering::Less => node.children[0],
                        Ordering::Equal | Ordering::Greater => node.children[1],
                    };
                }
                Node::Y(edge) => {
                    let p1 = self.vertices[edge.p];
                    let p2 = self.vertices[edge.q];
                    node_id = match point.position(&p1, &p2) {
                        Positioning::Right => node.children[1],
                        Positioning::Left => node.children[0],
                        Positioning::On => {
                            on_edges.push(*edge);
                            node.children[0]
                        }
                    };
                }
            }
        }
        (node_id, on_edges)
    }

    /// Checks some invariants of the DAG.
    ///
    /// This is meant for debugging purposes.
    ///
    /// # Panics
    ///
    /// Panics if there are isolated nodes in the DAG, if there are leaf nodes that are x- or
    /// y-nodes, if parent and child links disagree, or if a trapezoid is upside down.
    pub fn check(&self) {
        for (idx, node) in self.dag.iter().enumerate() {
            assert!(
                idx == 0 || !node.parents.is_empty(),
                "There shouldn't be isolated nodes"
            );
            match &node.data {
                Node::Trap(trap) => {
                    assert!(node.children.is_empty(), "All leaf nodes should be trapezoids");
                    let bounds = trap
                        .bounds(&self.vertices)
                        .expect("Trapezoids should lie within the span of their edges");
                    assert!(bounds.xmin <= bounds.xmax + EPSILON);
                    if bounds.xmax - bounds.xmin > EPSILON {
                        assert!(bounds.bottom_left <= bounds.top_left + EPSILON);
                        assert!(bounds.bottom_right <= bounds.top_right + EPSILON);
                    }
                }
                Node::X(..) | Node::Y(..) => {
                    assert_eq!(node.children.len(), 2, "Inner nodes should have 2 children");
                }
            }
            for &child in &node.children {
                assert!(self.dag[child].parents.contains(&idx));
            }
            for &parent in &node.parents {
                assert!(self.dag[parent].children.contains(&idx));
            }
        }
    }

    /// Returns the number of x-nodes in the DAG.
    pub fn x_node_count(&self) -> usize {
        self.dag
            .iter()
            .filter(|&node| matches!(node.data, Node::X(..)))
            .count()
    }

    /// Returns the number of y-nodes in the DAG.
    pub fn y_node_count(&self) -> usize {
        self.dag
            .iter()
            .filter(|&node| matches!(node.data, Node::Y { .. }))
            .count()
    }

    /// Returns the number of trapezoid-nodes in the DAG.
    pub fn trap_count(&self) -> usize {
        self.dag
            .iter()
            .filter(|&node| matches!(node.data, Node::Trap(..)))
            .count()
    }

    /// Returns the number of x-, y- and trapezoid-nodes in the DAG.
    pub fn node_count(&self) -> (usize, usize, usize) {
        self.dag.iter().fold(
            (0, 0, 0),
            |(mut x_count, mut y_count, mut trap_count), node| {
                match node.data {
                    Node::X(..) => x_count += 1,
                    Node::Y { .. } => y_count += 1,
                    Node::Trap(..) => trap_count += 1,
                };
                (x_count, y_count, trap_count)
            },
        )
    }

    /// Returns the average and maximum depth of the trapezoids in the DAG.
    pub fn depth_stats(&self) -> (f64, usize) {
        let mut trap_count = 0;
        let mut avg = 0;
        let mut max = 0;
        for (idx, node) in self.dag.iter().enumerate() {
            if matches!(node.data, Node::Trap(..)) {
                let Some(depth) = self.dag.depth(idx) else {
                    continue;
                };
                trap_count += 1;
                avg += depth;
                max = max.max(depth);
            }
        }
        let avg = avg as f64 / trap_count as f64;
        (avg, max)
    }
}

impl PointLocator for TrapMap {
    /// Locates a point by walking down the DAG, then testing the faces around the trapezoid found
    /// with [`Dcel::face_contains`].
    fn locate_point(&self, point: &Point) -> Result<Option<FaceId>> {
        let (leaf, on_edges) = self.find_node(point);
        let trap = self.dag[leaf].data.get_trap();
        let (below, above) = trap.faces();

        let mut candidates: SmallVec<[FaceId; 8]> = SmallVec::new();
        let mut push = |face: FaceId| {
            if !face.is_outer() && !candidates.contains(&face) {
                candidates.push(face);
            }
        };
        push(below);
        push(above);
        let on = |edge: &Edge| {
            let (p, q) = (self.vertices[edge.p], self.vertices[edge.q]);
            point.position(&p, &q) == Positioning::On
        };
        if on(&trap.bottom) {
            push(trap.bottom.face_below);
        }
        if on(&trap.top) {
            push(trap.top.face_above);
        }
        for edge in &on_edges {
            push(edge.face_above);
            push(edge.face_below);
        }

        // A point on a vertex may belong to any face around it
        let ends = on_edges.iter().flat_map(|edge| [edge.p, edge.q]);
        for idx in [trap.leftp, trap.rightp].into_iter().chain(ends) {
            let Some(faces) = self.vertex_faces.get(idx) else {
                continue;
            };
            if point.lex_cmp(&self.vertices[idx]) == Ordering::Equal {
                faces.iter().copied().for_each(&mut push);
            }
        }

        for face in candidates {
            if self.mesh.face_contains(face, point)? {
                return Ok(Some(self.source_faces[face.index()]));
            }
        }
        Ok(None)
    }
}
