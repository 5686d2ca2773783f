/// Errors returned by mesh construction, locator construction and queries.
///
/// Every variant is a recoverable condition: callers decide whether to abort the current build or
/// report it further.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Face-list data inconsistent with the expected layout.
    #[error("malformed input: {0}")]
    MalformedInput(String),
    /// Twin matching found an ambiguous partner or left dangling half-edges.
    #[error("non-manifold mesh: {0}")]
    NonManifold(String),
    /// Fewer coordinate axes than the operation requires.
    #[error("expected at least {expected} coordinates, got {actual}")]
    InsufficientDimensions { expected: usize, actual: usize },
    /// The requested axis does not exist on a point.
    #[error("axis {0} does not exist on a 3D point")]
    InvalidDimension(usize),
    /// Structural preconditions of a locator build are not met.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),
    /// A parametric or instant query fell outside its allowed range.
    #[error("value {value} is outside of [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },
    /// A delete or search addressed an entry absent from a tree.
    #[error("entry not found")]
    NotFound,
    /// A half-edge structure that is corrupted or not completely built.
    #[error("malformed topology: {0}")]
    MalformedTopology(String),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
