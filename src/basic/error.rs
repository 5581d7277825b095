use thiserror::Error;

/// Errors raised while building, solving or querying a [`Model`](super::model::Model).
///
/// Category mismatches (a fault targeting something that is neither a node
/// nor a branch, a ground endpoint spelled as a non-zero integer) are ruled
/// out by the typed constructor arguments and surface here only through the
/// fallible conversions that accept raw input.
#[derive(Debug, Error)]
pub enum Error {
    /// An id does not resolve to a live entity of this model.
    #[error("reference error: {0}")]
    Reference(String),

    /// A parameter is outside its admissible set (unknown fault code,
    /// mismatched section sizes, bad transformer ratio/group, ...).
    #[error("value error: {0}")]
    Value(String),

    /// The operation is not valid in the model's current phase, e.g.
    /// reading results before a successful `solve()`.
    #[error("state error: {0}")]
    State(String),

    /// The sparse factorization reported a numerically singular system.
    #[error("singular system: {0}")]
    Singular(String),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
