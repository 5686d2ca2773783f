//! Ordered multimap with a queryable history.
//!
//! A [`VersionedTree`] is a sequence of [`RbTree`] versions, each tagged with the instant at which
//! it was started. Versions are full copies of the previous one, which costs *O*(*n*) per version
//! but keeps every version an ordinary, independently usable tree.

mod rb_tree;

use std::cmp::Ordering;

pub use rb_tree::{Color, Iter, RbTree};

use crate::error::{Error, Result};

/// A strategy to order keys.
///
/// Comparators are stored in every tree and cloned into every version, so they should be cheap to
/// clone.
pub trait Compare<K>: Clone {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// Orders keys with their [`Ord`] implementation.
#[derive(Clone, Copy, Debug, Default)]
pub struct NaturalOrder;

impl<K: Ord> Compare<K> for NaturalOrder {
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

/// A red-black multimap whose past states can be queried by instant.
///
/// Instants only move forward: [`set_instant`](Self::set_instant) starts a new version, and
/// mutations through [`this_instant`](Self::this_instant) only ever affect the latest one.
#[derive(Clone, Debug)]
pub struct VersionedTree<K, V, C = NaturalOrder> {
    versions: Vec<(f64, RbTree<K, V, C>)>,
    cmp: C,
}

impl<K, V> Default for VersionedTree<K, V, NaturalOrder>
where
    K: Ord + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::with_comparator(NaturalOrder)
    }
}

impl<K, V, C> VersionedTree<K, V, C>
where
    K: Clone,
    V: Clone,
    C: Compare<K>,
{
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            versions: Vec::new(),
            cmp,
        }
    }

    /// Starts a new version at instant `t`, as a copy of the current one.
    ///
    /// Setting the current instant again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if `t` is NaN or earlier than the current instant.
    pub fn set_instant(&mut self, t: f64) -> Result<()> {
        let current = self.max_instant();
        if t.is_nan() || current.map_or(false, |current| t < current) {
            return Err(Error::OutOfRange {
                value: t,
                min: current.unwrap_or(f64::NEG_INFINITY),
                max: f64::INFINITY,
            });
        }
        if current == Some(t) {
            return Ok(());
        }
        let tree = match self.versions.last() {
            Some((_, tree)) => tree.clone(),
            None => RbTree::with_comparator(self.cmp.clone()),
        };
        self.versions.push((t, tree));
        Ok(())
    }

    /// The live tree, i.e. the version of the latest instant.
    ///
    /// If no instant was set yet, a first version is started at negative infinity.
    pub fn this_instant(&mut self) -> &mut RbTree<K, V, C> {
        if self.versions.is_empty() {
            self.versions
                .push((f64::NEG_INFINITY, RbTree::with_comparator(self.cmp.clone())));
        }
        let last = self.versions.len() - 1;
        &mut self.versions[last].1
    }

    /// The version that was live at instant `t`, that is the latest one started at or before `t`.
    ///
    /// Returns [`None`] if `t` precedes every version. Use [`Option::cloned`] to get a tree that
    /// can be mutated independently.
    pub fn at_instant(&self, t: f64) -> Option<&RbTree<K, V, C>> {
        let idx = self.versions.partition_point(|&(instant, _)| instant <= t);
        idx.checked_sub(1).map(|idx| &self.versions[idx].1)
    }

    pub fn min_instant(&self) -> Option<f64> {
        self.versions.first().map(|&(instant, _)| instant)
    }

    pub fn max_instant(&self) -> Option<f64> {
        self.versions.last().map(|&(instant, _)| instant)
    }

    pub fn version_count(&self) -> usize {
        self.versions.len()
    }
}
