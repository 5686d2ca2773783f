use super::{Dcel, FaceId, HedgeId};
use crate::error::{Error, Result};

impl Dcel {
    /// Verifies the structural invariants of the half-edge mesh.
    ///
    /// Checks that twins are mutual and have distinct origins, that `next` and `prev` are inverse of
    /// each other and close into cycles, that every cycle is bound to a single face, and that every
    /// face reaches its chains.
    ///
    /// It also requires every half-edge to end where its `next` starts. A general half-edge
    /// structure may link chains more loosely, but every constructor and edit of [`Dcel`] keeps
    /// this, and the traversals of the locators rely on it.
    pub fn check(&self) -> Result<()> {
        for vertex in self.vertex_ids() {
            if let Some(hedge) = self.get_vertex(vertex).out_edge {
                if self.origin(hedge) != vertex {
                    return Err(Error::MalformedTopology(format!(
                        "the outgoing half-edge of {:?} starts at {:?}",
                        vertex,
                        self.origin(hedge)
                    )));
                }
            }
        }

        for hedge in self.hedge_ids() {
            let twin = self.twin(hedge)?;
            if self.twin(twin)? != hedge {
                return Err(Error::MalformedTopology(format!(
                    "{:?} and {:?} are not mutual twins",
                    hedge, twin
                )));
            }
            if self.origin(twin) == self.origin(hedge) {
                return Err(Error::MalformedTopology(format!(
                    "{:?} and its twin share their origin",
                    hedge
                )));
            }
            let next = self.next(hedge)?;
            if self.prev(next)? != hedge {
                return Err(Error::MalformedTopology(format!(
                    "{:?} is not the previous half-edge of its next",
                    hedge
                )));
            }
            if self.next(self.prev(hedge)?)? != hedge {
                return Err(Error::MalformedTopology(format!(
                    "{:?} is not the next half-edge of its previous",
                    hedge
                )));
            }
            if self.origin(next) != self.origin(twin) {
                return Err(Error::MalformedTopology(format!(
                    "{:?} does not end where its next starts",
                    hedge
                )));
            }
            if self.face(next)? != self.face(hedge)? {
                return Err(Error::MalformedTopology(format!(
                    "{:?} and its next bound different faces",
                    hedge
                )));
            }
        }

        for face in self.face_ids() {
            let record = self.get_face(face);
            if record.outer.is_none() && record.inner.is_empty() && !self.hedges.is_empty() {
                return Err(Error::MalformedTopology(format!(
                    "{:?} has no boundary",
                    face
                )));
            }
            if face == FaceId::OUTER && record.outer.is_some() {
                return Err(Error::MalformedTopology(
                    "the unbounded face has an outer chain".to_string(),
                ));
            }
            for start in record.chains() {
                self.check_chain(start, face)?;
            }
        }
        Ok(())
    }

    fn check_chain(&self, start: HedgeId, face: FaceId) -> Result<()> {
        for hedge in self.chain(start)? {
            if self.face(hedge)? != face {
                return Err(Error::MalformedTopology(format!(
                    "{:?} is on a chain of {:?} but bounds {:?}",
                    hedge,
                    face,
                    self.face(hedge)?
                )));
            }
        }
        Ok(())
    }
}
