use thiserror::Error;

pub use crate::model::topology::TopologyError;

/// Per-request faults. None of these abort sibling requests; each becomes the
/// status of the request's result record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("unknown node {0}")]
    UnknownNode(String),
    #[error("unknown capability {0}")]
    UnknownCapability(String),
    #[error("source and destination are both {0}")]
    SameEndpoints(String),
    #[error("strict constraints unsatisfiable")]
    StrictInfeasible,
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),
    #[error("no disjoint path")]
    NoDisjointPath,
}
