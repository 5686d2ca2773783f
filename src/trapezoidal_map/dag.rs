use smallvec::SmallVec;
use std::{collections::HashSet, ops::Index, slice::Iter};

/// A Directed Acyclic Graph (DAG) stored in an arena.
///
/// This is the search structure of a trapezoidal map. A tree won't do because some nodes have
/// several parents: when an edge crosses several trapezoids, they are replaced with y-nodes that
/// may share a child trapezoid.
///
/// Nodes are never removed, only replaced in place, so they are addressed with plain [`usize`]s
/// into a [`Vec`]. Replacing the data of a node keeps its slot, which means every parent of the old
/// node now leads to the new one without being touched.
#[derive(Debug, Default)]
pub(crate) struct Dag<T> {
    arena: Vec<Node<T>>,
}

impl<T> Dag<T> {
    /// Constructs a new empty DAG.
    pub(crate) fn new() -> Self {
        Dag { arena: Vec::new() }
    }

    /// Add a new node to the DAG. Returns the index of the node.
    pub(crate) fn add(&mut self, data: T) -> usize {
        let idx = self.arena.len();
        self.arena.push(Node::new(data));
        idx
    }

    /// Get a shared reference to the node with index `idx`, if it exists.
    pub(crate) fn get(&self, idx: usize) -> Option<&Node<T>> {
        self.arena.get(idx)
    }

    fn get_mut(&mut self, idx: usize) -> Option<&mut Node<T>> {
        self.arena.get_mut(idx)
    }

    /// Returns the number of nodes in the DAG.
    pub(crate) fn len(&self) -> usize {
        self.arena.len()
    }

    /// An iterator over the DAG's nodes.
    pub(crate) fn iter(&self) -> Iter<'_, Node<T>> {
        self.arena.iter()
    }

    /// Gets the given index’ corresponding entry in the DAG for in-place manipulation.
    pub(crate) fn entry(&mut self, idx: usize) -> Entry<'_, T> {
        Entry { idx, dag: self }
    }

    /// Length of the shortest path from the root to node `idx`.
    ///
    /// Returns [`None`] if there is no such node, or if it cannot be reached from the root.
    pub(crate) fn depth(&self, idx: usize) -> Option<usize> {
        if idx >= self.arena.len() {
            return None;
        }

        let mut to_visit = HashSet::new();
        to_visit.insert(0);
        let mut buf = HashSet::new();
        let mut depth = 0;
        while !to_visit.contains(&idx) {
            if to_visit.is_empty() {
                return None;
            }
            for id in to_visit.drain() {
                buf.extend(self.arena[id].children.iter());
            }
            std::mem::swap(&mut to_visit, &mut buf);
            depth += 1;
        }
        Some(depth)
    }
}

impl<T> Index<usize> for Dag<T> {
    type Output = Node<T>;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.arena[idx]
    }
}

/// A node of the DAG.
#[derive(Debug, Default)]
pub(crate) struct Node<T> {
    pub(crate) data: T,
    pub(crate) children: SmallVec<[usize; 2]>,
    pub(crate) parents: SmallVec<[usize; 2]>,
}

impl<T> Node<T> {
    fn new(data: T) -> Self {
        Node {
            data,
            children: SmallVec::new(),
            parents: SmallVec::new(),
        }
    }
}

/// A view into a single entry in a DAG.
pub(crate) struct Entry<'a, T> {
    idx: usize,
    dag: &'a mut Dag<T>,
}

impl<T> Entry<'_, T> {
    /// Creates a new [`Node`] with given data and appends it to the entry.
    pub(crate) fn append_new(&mut self, data: T) -> Option<usize> {
        let new_idx = self.dag.add(data);
        self.append(new_idx)
    }

    /// Appends an existing [`Node`] to the entry, if both exist.
    pub(crate) fn append(&mut self, idx: usize) -> Option<usize> {
        if self.idx >= self.dag.len() || self.dag.get(idx).is_none() {
            return None;
        }
        self.dag.arena[self.idx].children.push(idx);
        self.dag.arena[idx].parents.push(self.idx);
        Some(idx)
    }

    pub(crate) fn and_modify<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut T),
    {
        if let Some(node) = self.dag.get_mut(self.idx) {
            f(&mut node.data);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_empty_dag() {
        let dag = Dag::<usize>::new();

        assert_eq!(dag.len(), 0);
    }

    #[test]
    fn add_node_to_dag() {
        let mut dag = Dag::new();

        let idx_42 = dag.add(42);
        assert_eq!(idx_42, 0);
        assert_eq!(dag.len(), 1);
        assert_eq!(dag.depth(idx_42), Some(0));

        let idx_314 = dag.entry(idx_42).append_new(314).unwrap();
        assert_eq!(idx_314, 1);
        assert_eq!(dag.len(), 2);
        assert_eq!(dag.depth(idx_314), Some(1));
        assert_eq!(dag[idx_314].parents.as_slice(), &[idx_42]);
        assert_eq!(dag[idx_42].children.as_slice(), &[idx_314]);

        assert_eq!(dag.depth(2), None);
    }

    #[test]
    fn shared_child() {
        //    0
        //   / \
        //  1   2
        //   \ /
        //    3
        let mut dag = Dag::new();
        let root = dag.add('a');
        let left = dag.entry(root).append_new('b').unwrap();
        let right = dag.entry(root).append_new('c').unwrap();
        let shared = dag.entry(left).append_new('d').unwrap();
        dag.entry(right).append(shared);

        assert_eq!(dag[shared].parents.as_slice(), &[left, right]);
        assert_eq!(dag.depth(shared), Some(2));
        assert_eq!(dag.entry(right).append(42), None);
    }

    #[test]
    fn unreachable_node_has_no_depth() {
        let mut dag = Dag::new();
        dag.add(0);
        let orphan = dag.add(1);

        assert_eq!(dag.depth(orphan), None);
    }

    #[test]
    fn replace_in_place() {
        let mut dag = Dag::new();
        let root = dag.add(1);
        let leaf = dag.entry(root).append_new(2).unwrap();

        dag.entry(leaf).and_modify(|data| *data = 3);

        assert_eq!(dag[dag[root].children[0]].data, 3);
    }

    #[test]
    fn dag_iter() {
        let mut dag = Dag::new();
        dag.add(42);
        dag.add(314);

        let values: Vec<usize> = dag.iter().map(|node| node.data).collect();

        assert_eq!(&values, &[42, 314]);
    }
}
