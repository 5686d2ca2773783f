use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::versioned_tree::{Compare, NaturalOrder};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

#[derive(Clone, Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    color: Color,
    parent: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
}

/// A red-black tree used as an ordered multimap.
///
/// Entries are ordered by key according to the comparison strategy `C`, and entries with equal keys
/// are kept in insertion order. Nodes live in an arena, and the arena stays dense: removing a node
/// moves the last node of the arena into its slot.
#[derive(Clone, Debug)]
pub struct RbTree<K, V, C = NaturalOrder> {
    nodes: Vec<Node<K, V>>,
    root: Option<usize>,
    cmp: C,
}

impl<K, V> Default for RbTree<K, V, NaturalOrder>
where
    K: Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> RbTree<K, V, NaturalOrder>
where
    K: Ord,
{
    /// Creates an empty tree ordered by the keys' [`Ord`] implementation.
    pub fn new() -> Self {
        Self::with_comparator(NaturalOrder)
    }
}

impl<K, V, C> RbTree<K, V, C>
where
    C: Compare<K>,
{
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            cmp,
        }
    }

    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Inserts an entry. An entry whose key equals existing ones is placed after them.
    pub fn insert(&mut self, key: K, value: V) {
        let mut parent = None;
        let mut current = self.root;
        let mut go_left = false;
        while let Some(n) = current {
            parent = Some(n);
            go_left = self.cmp.compare(&key, &self.nodes[n].key) == Ordering::Less;
            current = if go_left {
                self.nodes[n].left
            } else {
                self.nodes[n].right
            };
        }

        let z = self.nodes.len();
        self.nodes.push(Node {
            key,
            value,
            color: Color::Red,
            parent,
            left: None,
            right: None,
        });
        match parent {
            None => self.root = Some(z),
            Some(p) if go_left => self.nodes[p].left = Some(z),
            Some(p) => self.nodes[p].right = Some(z),
        }
        self.insert_fixup(z);
    }

    /// Removes an entry and returns its value.
    ///
    /// With `Some(value)`, entries with a key equal to `key` are visited in order until one holding
    /// `value` is found. With `None`, the first entry with a key equal to `key` is removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no matching entry.
    pub fn delete(&mut self, key: &K, value: Option<&V>) -> Result<V>
    where
        V: PartialEq,
    {
        let mut current = self.lower_bound(key);
        while let Some(n) = current {
            if self.cmp.compare(&self.nodes[n].key, key) != Ordering::Equal {
                break;
            }
            if value.map_or(true, |value| &self.nodes[n].value == value) {
                return Ok(self.delete_node(n));
            }
            current = self.successor(n);
        }
        Err(Error::NotFound)
    }

    /// Returns the value of the first entry whose key equals `key`.
    pub fn search(&self, key: &K) -> Option<&V> {
        self.lower_bound(key)
            .filter(|&n| self.cmp.compare(&self.nodes[n].key, key) == Ordering::Equal)
            .map(|n| &self.nodes[n].value)
    }

    /// Returns the value of the first entry whose key is greater than or equal to `key`.
    pub fn search_up(&self, key: &K) -> Option<&V> {
        self.lower_bound(key).map(|n| &self.nodes[n].value)
    }

    /// Returns the value of the last entry whose key is less than or equal to `key`.
    pub fn search_down(&self, key: &K) -> Option<&V> {
        let mut candidate = None;
        let mut current = self.root;
        while let Some(n) = current {
            if self.cmp.compare(&self.nodes[n].key, key) == Ordering::Greater {
                current = self.nodes[n].left;
            } else {
                candidate = Some(n);
                current = self.nodes[n].right;
            }
        }
        candidate.map(|n| &self.nodes[n].value)
    }

    /// Iterates over the entries in order.
    pub fn iter(&self) -> Iter<'_, K, V, C> {
        Iter {
            tree: self,
            next: self.root.map(|root| self.minimum(root)),
        }
    }

    /// Checks the red-black invariants and returns the black height of the tree.
    ///
    /// This is meant for debugging purposes.
    ///
    /// # Panics
    ///
    /// Panics if the root is red, if a red node has a red child, if two paths from the root to a
    /// leaf go through different numbers of black nodes, if parent and child links disagree, or if
    /// the entries are out of order.
    pub fn check(&self) -> usize {
        if let Some(root) = self.root {
            assert_eq!(self.nodes[root].color, Color::Black, "The root should be black");
            assert_eq!(self.nodes[root].parent, None, "The root should have no parent");
        }
        let height = self.check_subtree(self.root);
        let keys: Vec<&K> = self.iter().map(|(key, _)| key).collect();
        assert_eq!(keys.len(), self.len(), "All nodes should be reachable");
        for pair in keys.windows(2) {
            assert_ne!(
                self.cmp.compare(pair[0], pair[1]),
                Ordering::Greater,
                "Entries should be in order"
            );
        }
        height
    }

    fn check_subtree(&self, node: Option<usize>) -> usize {
        let Some(n) = node else {
            return 1;
        };
        let Node {
            color, left, right, ..
        } = self.nodes[n];
        for child in [left, right].into_iter().flatten() {
            assert_eq!(
                self.nodes[child].parent,
                Some(n),
                "Child and parent links should agree"
            );
            if color == Color::Red {
                assert_eq!(
                    self.nodes[child].color,
                    Color::Black,
                    "A red node cannot have a red child"
                );
            }
        }
        let left_height = self.check_subtree(left);
        let right_height = self.check_subtree(right);
        assert_eq!(left_height, right_height, "Black heights should be equal");
        left_height + usize::from(color == Color::Black)
    }

    /// The first node whose key is greater than or equal to `key`.
    fn lower_bound(&self, key: &K) -> Option<usize> {
        let mut candidate = None;
        let mut current = self.root;
        while let Some(n) = current {
            if self.cmp.compare(&self.nodes[n].key, key) == Ordering::Less {
                current = self.nodes[n].right;
            } else {
                candidate = Some(n);
                current = self.nodes[n].left;
            }
        }
        candidate
    }

    fn minimum(&self, mut n: usize) -> usize {
        while let Some(left) = self.nodes[n].left {
            n = left;
        }
        n
    }

    fn successor(&self, mut n: usize) -> Option<usize> {
        if let Some(right) = self.nodes[n].right {
            return Some(self.minimum(right));
        }
        while let Some(parent) = self.nodes[n].parent {
            if self.nodes[parent].left == Some(n) {
                return Some(parent);
            }
            n = parent;
        }
        None
    }

    fn color(&self, node: Option<usize>) -> Color {
        node.map_or(Color::Black, |n| self.nodes[n].color)
    }

    fn set_color(&mut self, node: Option<usize>, color: Color) {
        if let Some(n) = node {
            self.nodes[n].color = color;
        }
    }

    /// Makes `new` take the place of `old` below `parent`.
    fn replace_child(&mut self, parent: Option<usize>, old: usize, new: Option<usize>) {
        match parent {
            None => self.root = new,
            Some(p) if self.nodes[p].left == Some(old) => self.nodes[p].left = new,
            Some(p) => self.nodes[p].right = new,
        }
    }

    fn rotate_left(&mut self, x: usize) {
        let Some(y) = self.nodes[x].right else {
            return;
        };
        let beta = self.nodes[y].left;
        self.nodes[x].right = beta;
        if let Some(beta) = beta {
            self.nodes[beta].parent = Some(x);
        }
        let parent = self.nodes[x].parent;
        self.nodes[y].parent = parent;
        self.replace_child(parent, x, Some(y));
        self.nodes[y].left = Some(x);
        self.nodes[x].parent = Some(y);
    }

    fn rotate_right(&mut self, x: usize) {
        let Some(y) = self.nodes[x].left else {
            return;
        };
        let beta = self.nodes[y].right;
        self.nodes[x].left = beta;
        if let Some(beta) = beta {
            self.nodes[beta].parent = Some(x);
        }
        let parent = self.nodes[x].parent;
        self.nodes[y].parent = parent;
        self.replace_child(parent, x, Some(y));
        self.nodes[y].right = Some(x);
        self.nodes[x].parent = Some(y);
    }

    fn insert_fixup(&mut self, mut z: usize) {
        while let Some(p) = self.nodes[z].parent {
            if self.nodes[p].color == Color::Black {
                break;
            }
            // A red node is never the root, so the grandparent exists
            let Some(g) = self.nodes[p].parent else {
                break;
            };
            if self.nodes[g].left == Some(p) {
                let uncle = self.nodes[g].right;
                if self.color(uncle) == Color::Red {
                    self.nodes[p].color = Color::Black;
                    self.set_color(uncle, Color::Black);
                    self.nodes[g].color = Color::Red;
                    z = g;
                } else {
                    // Left-right case is turned into the left-left case
                    let p = if self.nodes[p].right == Some(z) {
                        self.rotate_left(p);
                        z = p;
                        self.nodes[p].parent.unwrap_or(g)
                    } else {
                        p
                    };
                    self.nodes[p].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    self.rotate_right(g);
                }
            } else {
                let uncle = self.nodes[g].left;
                if self.color(uncle) == Color::Red {
                    self.nodes[p].color = Color::Black;
                    self.set_color(uncle, Color::Black);
                    self.nodes[g].color = Color::Red;
                    z = g;
                } else {
                    // Right-left case is turned into the right-right case
                    let p = if self.nodes[p].left == Some(z) {
                        self.rotate_right(p);
                        z = p;
                        self.nodes[p].parent.unwrap_or(g)
                    } else {
                        p
                    };
                    self.nodes[p].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    self.rotate_left(g);
                }
            }
        }
        let root = self.root;
        self.set_color(root, Color::Black);
    }

    fn transplant(&mut self, u: usize, v: Option<usize>) {
        let parent = self.nodes[u].parent;
        self.replace_child(parent, u, v);
        if let Some(v) = v {
            self.nodes[v].parent = parent;
        }
    }

    fn delete_node(&mut self, z: usize) -> V {
        let Node {
            left,
            right,
            color,
            parent,
            ..
        } = self.nodes[z];
        let (x, x_parent, removed_color) = match (left, right) {
            (None, _) => {
                self.transplant(z, right);
                (right, parent, color)
            }
            (Some(_), None) => {
                self.transplant(z, left);
                (left, parent, color)
            }
            (Some(left), Some(right)) => {
                let y = self.minimum(right);
                let removed_color = self.nodes[y].color;
                let x = self.nodes[y].right;
                let x_parent = if y == right {
                    Some(y)
                } else {
                    let y_parent = self.nodes[y].parent;
                    self.transplant(y, x);
                    self.nodes[y].right = Some(right);
                    self.nodes[right].parent = Some(y);
                    y_parent
                };
                self.transplant(z, Some(y));
                self.nodes[y].left = Some(left);
                self.nodes[left].parent = Some(y);
                self.nodes[y].color = color;
                (x, x_parent, removed_color)
            }
        };
        if removed_color == Color::Black {
            self.delete_fixup(x, x_parent);
        }
        self.release(z)
    }

    fn delete_fixup(&mut self, mut x: Option<usize>, mut parent: Option<usize>) {
        while x != self.root && self.color(x) == Color::Black {
            let Some(p) = parent else {
                break;
            };
            if self.nodes[p].left == x {
                let mut w = self.nodes[p].right;
                if self.color(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.nodes[p].color = Color::Red;
                    self.rotate_left(p);
                    w = self.nodes[p].right;
                }
                let Some(mut s) = w else {
                    x = Some(p);
                    parent = self.nodes[p].parent;
                    continue;
                };
                if self.color(self.nodes[s].left) == Color::Black
                    && self.color(self.nodes[s].right) == Color::Black
                {
                    self.nodes[s].color = Color::Red;
                    x = Some(p);
                    parent = self.nodes[p].parent;
                } else {
                    if self.color(self.nodes[s].right) == Color::Black {
                        self.set_color(self.nodes[s].left, Color::Black);
                        self.nodes[s].color = Color::Red;
                        self.rotate_right(s);
                        s = self.nodes[p].right.unwrap_or(s);
                    }
                    self.nodes[s].color = self.nodes[p].color;
                    self.nodes[p].color = Color::Black;
                    self.set_color(self.nodes[s].right, Color::Black);
                    self.rotate_left(p);
                    x = self.root;
                    parent = None;
                }
            } else {
                let mut w = self.nodes[p].left;
                if self.color(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.nodes[p].color = Color::Red;
                    self.rotate_right(p);
                    w = self.nodes[p].left;
                }
                let Some(mut s) = w else {
                    x = Some(p);
                    parent = self.nodes[p].parent;
                    continue;
                };
                if self.color(self.nodes[s].left) == Color::Black
                    && self.color(self.nodes[s].right) == Color::Black
                {
                    self.nodes[s].color = Color::Red;
                    x = Some(p);
                    parent = self.nodes[p].parent;
                } else {
                    if self.color(self.nodes[s].left) == Color::Black {
                        self.set_color(self.nodes[s].right, Color::Black);
                        self.nodes[s].color = Color::Red;
                        self.rotate_left(s);
                        s = self.nodes[p].left.unwrap_or(s);
                    }
                    self.nodes[s].color = self.nodes[p].color;
                    self.nodes[p].color = Color::Black;
                    self.set_color(self.nodes[s].left, Color::Black);
                    self.rotate_right(p);
                    x = self.root;
                    parent = None;
                }
            }
        }
        self.set_color(x, Color::Black);
    }

    /// Frees the slot of an unlinked node, moving the last node of the arena into it.
    fn release(&mut self, z: usize) -> V {
        let last = self.nodes.len() - 1;
        if z != last {
            let Node {
                parent,
                left,
                right,
                ..
            } = self.nodes[last];
            self.replace_child(parent, last, Some(z));
            for child in [left, right].into_iter().flatten() {
                self.nodes[child].parent = Some(z);
            }
        }
        self.nodes.swap_remove(z).value
    }
}

/// In-order iterator over the entries of a [`RbTree`].
pub struct Iter<'a, K, V, C> {
    tree: &'a RbTree<K, V, C>,
    next: Option<usize>,
}

impl<'a, K, V, C> Iterator for Iter<'a, K, V, C>
where
    C: Compare<K>,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.next?;
        self.next = self.tree.successor(n);
        let node = &self.tree.nodes[n];
        Some((&node.key, &node.value))
    }
}
