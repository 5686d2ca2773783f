use std::collections::{HashMap, VecDeque};

use smallvec::SmallVec;

use super::{Dcel, Face, FaceId, Hedge, HedgeId, Vertex, VertexId};
use crate::error::{Error, Result};
use crate::geometry::polygon;

/// Correspondence between the records of a [`Dcel`] and those of its copy.
#[derive(Debug, Clone, Default)]
pub struct DcelMap {
    pub vertices: HashMap<VertexId, VertexId>,
    pub hedges: HashMap<HedgeId, HedgeId>,
    pub faces: HashMap<FaceId, FaceId>,
}

impl Dcel {
    /// Splits `face` in two with a new edge from `v1` to `v2`.
    ///
    /// Both vertices have to lie on the outer chain of `face` and must not already be adjacent on
    /// it. The part of the chain holding the new half-edge `v1 -> v2` keeps `face`, the other part
    /// becomes a new face. Returns the `v1 -> v2` half-edge and the new face.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMesh`] if the split is impossible, in which case the mesh is left
    /// untouched.
    pub fn connect_vertices(
        &mut self,
        v1: VertexId,
        v2: VertexId,
        face: FaceId,
    ) -> Result<(HedgeId, FaceId)> {
        let outer = self
            .get_face(face)
            .outer
            .ok_or_else(|| Error::InvalidMesh(format!("{:?} has no outer chain to split", face)))?;
        if v1 == v2 {
            return Err(Error::InvalidMesh(format!(
                "cannot connect {:?} to itself",
                v1
            )));
        }
        let chain = self.chain(outer)?;
        let find = |vertex: VertexId| {
            chain
                .iter()
                .position(|&hedge| self.origin(hedge) == vertex)
                .ok_or_else(|| {
                    Error::InvalidMesh(format!("{:?} is not on the boundary of {:?}", vertex, face))
                })
        };
        let ia = find(v1)?;
        let ib = find(v2)?;
        let n = chain.len();
        if (ia + 1) % n == ib || (ib + 1) % n == ia {
            return Err(Error::InvalidMesh(format!(
                "{:?} and {:?} are already connected",
                v1, v2
            )));
        }

        let a = chain[ia];
        let b = chain[ib];
        let a_prev = chain[(ia + n - 1) % n];
        let b_prev = chain[(ib + n - 1) % n];
        // Half-edges from `a` up to `b` (excluded) move to the new face
        let moved: Vec<HedgeId> = (0..n)
            .map(|k| chain[(ia + k) % n])
            .take_while(|&hedge| hedge != b)
            .collect();

        let h1 = HedgeId(self.hedges.len());
        let h2 = HedgeId(self.hedges.len() + 1);
        let new_face = FaceId(self.faces.len());
        self.add_hedge(Hedge {
            origin: v1,
            twin: Some(h2),
            face: Some(face),
            next: Some(b),
            prev: Some(a_prev),
        });
        self.add_hedge(Hedge {
            origin: v2,
            twin: Some(h1),
            face: Some(new_face),
            next: Some(a),
            prev: Some(b_prev),
        });
        self.get_hedge_mut(a_prev).next = Some(h1);
        self.get_hedge_mut(b).prev = Some(h1);
        self.get_hedge_mut(b_prev).next = Some(h2);
        self.get_hedge_mut(a).prev = Some(h2);
        for hedge in moved {
            self.get_hedge_mut(hedge).face = Some(new_face);
        }
        self.faces[face.0].outer = Some(h1);
        self.add_face(Face {
            outer: Some(h2),
            inner: SmallVec::new(),
        });

        tracing::trace!(?v1, ?v2, ?face, ?new_face, "split face");
        Ok((h1, new_face))
    }

    /// Makes the chains of `face` run the conventional way: counter-clockwise for the outer chain,
    /// clockwise for inner chains.
    ///
    /// A chain running the wrong way is fixed by reversing its whole connected component, which
    /// keeps twins consistent. Returns `true` if anything was reversed.
    pub fn correct_directionality(&mut self, face: FaceId) -> Result<bool> {
        let record = self.get_face(face).clone();
        let mut reversed = false;
        if let Some(outer) = record.outer {
            if !polygon::is_counterclockwise(&self.chain_points(outer)?) {
                self.reverse_component(outer)?;
                reversed = true;
            }
        }
        for inner in record.inner {
            if polygon::is_counterclockwise(&self.chain_points(inner)?) {
                self.reverse_component(inner)?;
                reversed = true;
            }
        }
        Ok(reversed)
    }

    /// Reverses every half-edge of the connected component holding `start`.
    fn reverse_component(&mut self, start: HedgeId) -> Result<()> {
        let mut seen = vec![false; self.hedges.len()];
        let mut component = Vec::new();
        let mut queue = VecDeque::from([start]);
        seen[start.0] = true;
        while let Some(hedge) = queue.pop_front() {
            component.push(hedge);
            for neighbor in [self.next(hedge)?, self.twin(hedge)?] {
                if !seen[neighbor.0] {
                    seen[neighbor.0] = true;
                    queue.push_back(neighbor);
                }
            }
        }

        let origins: Vec<VertexId> = component
            .iter()
            .map(|&hedge| self.destination(hedge))
            .collect::<Result<_>>()?;
        for (&hedge, origin) in component.iter().zip(origins) {
            let record = self.get_hedge_mut(hedge);
            record.origin = origin;
            std::mem::swap(&mut record.next, &mut record.prev);
        }
        for vertex in self.vertices.iter_mut() {
            if let Some(out_edge) = vertex.out_edge.filter(|hedge| seen[hedge.0]) {
                vertex.out_edge = self.hedges[out_edge.0].twin;
            }
        }
        tracing::debug!(hedges = component.len(), "reversed connected component");
        Ok(())
    }

    /// Deep copy of the mesh.
    pub fn copy(&self) -> Dcel {
        self.copy_with_map().0
    }

    /// Deep copy of the mesh, along with the correspondence between old and new records.
    ///
    /// Records of the copy are numbered in traversal order: faces keep their order, half-edges are
    /// numbered chain by chain and vertices in order of first appearance along the chains.
    /// Records that cannot be reached from a face are appended afterwards.
    pub fn copy_with_map(&self) -> (Dcel, DcelMap) {
        let mut map = DcelMap::default();
        let mut hedge_order = Vec::with_capacity(self.hedges.len());
        let mut vertex_order = Vec::with_capacity(self.vertices.len());

        for face in self.face_ids() {
            map.faces.insert(face, FaceId(map.faces.len()));
            for start in self.get_face(face).chains() {
                let mut current = Some(start);
                while let Some(hedge) = current {
                    if map.hedges.contains_key(&hedge) {
                        break;
                    }
                    map.hedges.insert(hedge, HedgeId(hedge_order.len()));
                    hedge_order.push(hedge);
                    let origin = self.origin(hedge);
                    if !map.vertices.contains_key(&origin) {
                        map.vertices.insert(origin, VertexId(vertex_order.len()));
                        vertex_order.push(origin);
                    }
                    current = self.get_hedge(hedge).next;
                }
            }
        }
        for hedge in self.hedge_ids() {
            if !map.hedges.contains_key(&hedge) {
                map.hedges.insert(hedge, HedgeId(hedge_order.len()));
                hedge_order.push(hedge);
            }
        }
        for vertex in self.vertex_ids() {
            if !map.vertices.contains_key(&vertex) {
                map.vertices.insert(vertex, VertexId(vertex_order.len()));
                vertex_order.push(vertex);
            }
        }

        let vertices = vertex_order
            .iter()
            .map(|&vertex| {
                let record = self.get_vertex(vertex);
                Vertex {
                    point: record.point,
                    out_edge: record.out_edge.map(|hedge| map.hedges[&hedge]),
                }
            })
            .collect();
        let hedges = hedge_order
            .iter()
            .map(|&hedge| {
                let record = self.get_hedge(hedge);
                Hedge {
                    origin: map.vertices[&record.origin],
                    twin: record.twin.map(|hedge| map.hedges[&hedge]),
                    face: record.face.map(|face| map.faces[&face]),
                    next: record.next.map(|hedge| map.hedges[&hedge]),
                    prev: record.prev.map(|hedge| map.hedges[&hedge]),
                }
            })
            .collect();
        let faces = self
            .faces
            .iter()
            .map(|face| Face {
                outer: face.outer.map(|hedge| map.hedges[&hedge]),
                inner: face.inner.iter().map(|hedge| map.hedges[hedge]).collect(),
            })
            .collect();

        (
            Dcel {
                vertices,
                hedges,
                faces,
            },
            map,
        )
    }
}
