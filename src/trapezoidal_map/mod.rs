//! Point location with a trapezoidal map.

mod dag;
mod trap_map;

pub use trap_map::{TrapMap, TrapMapOptions};
