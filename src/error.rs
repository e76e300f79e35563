//! Error types shared by every layer of the engine.
//!
//! All operations are all-or-nothing: when one of these errors is returned the
//! graph, the simulation state and the spatial index are exactly as they were
//! before the call.

/// Errors returned by the graph store, the simulator and the format bridge.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    #[error("node with name \"{0}\" already in graph")]
    DuplicateName(String),

    #[error("node \"{0}\" does not exist in graph")]
    UnknownNode(String),

    #[error("malformed graph: {0}")]
    MalformedGraph(String),

    #[error("invalid dimensionality {0}, must be at least 1")]
    InvalidDimension(usize),

    #[error("invalid time step {0}, must be a finite number greater than zero")]
    InvalidTimeStep(f64),

    #[error("node placement has not been initialized, call resetNodePlacement first")]
    UninitializedState,

    #[error("expected a point with {expected} coordinates, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("simulation step produced a non-finite position for node \"{0}\"")]
    NumericInstability(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
