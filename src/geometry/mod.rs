//! Geometric primitives and the epsilon-tolerant predicates shared by every algorithm of the crate.

mod bbox;
mod edge;
mod point;
pub mod polygon;

pub use bbox::BoundingBox;
pub use edge::FullEdge;
pub use point::{approx_cmp, approx_eq, Point, Positioning, EPSILON};
