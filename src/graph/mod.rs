//! Graph data structures and operations.
//!
//! This module provides the graph store built on petgraph's StableGraph for
//! stable node/edge indices, with flat Structure of Arrays (SoA) buffers for
//! positions and velocities of any dimensionality.

mod description;
mod edge;
mod node;
mod store;

pub use description::{EdgeDescription, GraphDescription, NodeDescription};
pub use edge::{Edge, EdgeId, EdgeView};
pub use node::{Node, NodeId, NodeInfo, NodeRef, explicit_weight, numeric_weight};
pub use store::{Adjacency, DEFAULT_DIMENSIONS, GraphStore, Spring};
