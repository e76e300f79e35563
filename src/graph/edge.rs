//! Edge type and related structures.
//!
//! Edges are the springs between nodes. Each edge has:
//! - A stable identifier
//! - Source and target node ids (held by the underlying petgraph graph)
//! - An opaque metadata payload and the numeric strength derived from it

use std::fmt;

use serde_json::Value;

use super::node::{NodeInfo, numeric_weight};

/// Stable edge identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u32);

impl EdgeId {
    /// Create a new EdgeId from a raw u32.
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Edge({})", self.0)
    }
}

impl From<u32> for EdgeId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<EdgeId> for u32 {
    #[inline]
    fn from(id: EdgeId) -> Self {
        id.0
    }
}

/// Edge weight stored in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Caller payload, returned verbatim as the edge's metadata.
    pub metadata: Value,
    /// Spring weight used by the force model.
    pub strength: f64,
}

impl Edge {
    /// Create an edge whose strength is read from the payload.
    pub fn new(metadata: Value) -> Self {
        let strength = numeric_weight(&metadata);
        Self { metadata, strength }
    }

    /// Create an edge with an explicit strength, independent of the payload.
    pub fn with_strength(metadata: Value, strength: f64) -> Self {
        Self { metadata, strength }
    }
}

/// Read-only snapshot of an edge with both endpoints resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeView {
    pub id: EdgeId,
    pub source: NodeInfo,
    pub target: NodeInfo,
    pub metadata: Value,
}
