//! Node type and related structures.
//!
//! Nodes are the vertices in the graph. Each node has:
//! - A stable index (`NodeId`) and a unique name
//! - An opaque weight payload, stored verbatim
//! - A numeric strength derived from the payload, used by the force model
//! - Mass and pinned state for the integrator
//!
//! Positions and velocities live in the graph store's flat buffers, not here.

use std::fmt;

use serde_json::Value;

static NULL: Value = Value::Null;

/// Stable node identifier.
///
/// Indexes the graph store's node collection and position buffers. Nodes are
/// never removed individually, so an id stays valid until the graph is
/// cleared or replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a new NodeId from a raw u32.
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// The id as a buffer index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

impl From<u32> for NodeId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<NodeId> for u32 {
    #[inline]
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// A reference to a node, either by name or by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    Name(String),
    Id(NodeId),
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Id(id) => write!(f, "{}", id.0),
        }
    }
}

impl From<&str> for NodeRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<&String> for NodeRef {
    fn from(name: &String) -> Self {
        Self::Name(name.clone())
    }
}

impl From<String> for NodeRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<NodeId> for NodeRef {
    fn from(id: NodeId) -> Self {
        Self::Id(id)
    }
}

/// Read the numeric weight out of an opaque payload.
///
/// A number is used as-is, an object contributes its numeric `"weight"`
/// field, anything else counts as 1.0. Non-finite and non-positive values
/// also fall back to 1.0.
pub fn numeric_weight(payload: &Value) -> f64 {
    explicit_weight(payload).unwrap_or(1.0)
}

/// The weight a payload spells out, if it spells out a usable one.
pub fn explicit_weight(payload: &Value) -> Option<f64> {
    let weight = match payload {
        Value::Number(n) => n.as_f64(),
        Value::Object(map) => map.get("weight").and_then(Value::as_f64),
        _ => None,
    }?;

    (weight.is_finite() && weight > 0.0).then_some(weight)
}

/// A vertex of the simulated graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique name.
    pub name: String,
    /// Caller payload, returned verbatim.
    pub weight: Value,
    /// Numeric weight used by the force model.
    pub strength: f64,
    /// Inertia used by the integrator, the payload's `"mass"` field or 1.
    pub mass: f64,
    /// Pinned nodes keep their position during simulation steps.
    pub pinned: bool,
}

impl Node {
    /// Create a new node from its name and weight payload.
    pub fn new(name: impl Into<String>, weight: Value) -> Self {
        let strength = numeric_weight(&weight);
        let mass = weight
            .get("mass")
            .and_then(Value::as_f64)
            .filter(|m| m.is_finite() && *m > 0.0)
            .unwrap_or(1.0);

        Self {
            name: name.into(),
            weight,
            strength,
            mass,
            pinned: false,
        }
    }

    /// The `"label"` string of an object payload.
    pub fn label(&self) -> Option<&str> {
        self.weight.get("label").and_then(Value::as_str)
    }

    /// The `"metadata"` field of an object payload, `null` otherwise.
    pub fn metadata(&self) -> &Value {
        match &self.weight {
            Value::Object(map) => map.get("metadata").unwrap_or(&NULL),
            _ => &NULL,
        }
    }
}

/// Read-only snapshot of a node, detached from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    pub id: NodeId,
    pub name: String,
    pub label: Option<String>,
    pub location: Vec<f64>,
    pub metadata: Value,
}
