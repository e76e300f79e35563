//! GraphStore - Core graph data structure.
//!
//! The GraphStore keeps the graph topology in petgraph's StableGraph and
//! maintains flat SoA (Structure of Arrays) buffers for positions and
//! velocities, `D` consecutive coordinates per node, so the force model and
//! integrator can work on plain slices whatever the dimensionality.

use std::collections::HashMap;

use petgraph::Directed;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences, NodeIndexable};
use serde_json::Value;
use tracing::debug;

use super::description::{EdgeDescription, GraphDescription, NodeDescription};
use super::edge::{Edge, EdgeId, EdgeView};
use super::node::{Node, NodeId, NodeInfo, NodeRef, numeric_weight};
use crate::error::{Result, SimError};
use crate::math;

/// Dimensionality of a freshly created store.
pub const DEFAULT_DIMENSIONS: usize = 2;

/// The graph store.
///
/// This struct manages:
/// - Graph topology via petgraph (edges reference nodes by index)
/// - The name → index mapping
/// - Position/velocity buffers in SoA layout
/// - The dimensionality those buffers are interpreted with
#[derive(Debug, Clone)]
pub struct GraphStore {
    /// Nodes carry their payload, edges their metadata and strength.
    graph: StableGraph<Node, Edge, Directed>,

    /// Map from node name to petgraph NodeIndex
    name_to_index: HashMap<String, NodeIndex>,

    /// Coordinates per node
    dimensions: usize,

    /// Positions, `dimensions` values per node
    positions: Vec<f64>,

    /// Velocities, `dimensions` values per node
    velocities: Vec<f64>,
}

impl GraphStore {
    /// Create a new empty store with the default dimensionality.
    pub fn new() -> Self {
        Self {
            graph: StableGraph::new(),
            name_to_index: HashMap::new(),
            dimensions: DEFAULT_DIMENSIONS,
            positions: Vec::new(),
            velocities: Vec::new(),
        }
    }

    /// Create an empty store with `dimensions` coordinates per node.
    pub fn with_dimensions(dimensions: usize) -> Result<Self> {
        if dimensions < 1 {
            return Err(SimError::InvalidDimension(dimensions));
        }

        Ok(Self {
            dimensions,
            ..Self::new()
        })
    }

    /// Create a store with pre-allocated capacity.
    pub fn with_capacity(node_capacity: usize, edge_capacity: usize) -> Self {
        Self {
            graph: StableGraph::with_capacity(node_capacity, edge_capacity),
            name_to_index: HashMap::with_capacity(node_capacity),
            dimensions: DEFAULT_DIMENSIONS,
            positions: Vec::with_capacity(node_capacity * DEFAULT_DIMENSIONS),
            velocities: Vec::with_capacity(node_capacity * DEFAULT_DIMENSIONS),
        }
    }

    /// Build a store from a graph description.
    ///
    /// Fails with `MalformedGraph` on duplicate node ids or on an edge that
    /// references an id not present in the node list.
    pub fn from_description(description: &GraphDescription, dimensions: usize) -> Result<Self> {
        let mut store = Self::with_dimensions(dimensions)?;

        for node in &description.nodes {
            if store.name_to_index.contains_key(&node.id) {
                return Err(SimError::MalformedGraph(format!(
                    "node id \"{}\" appears more than once",
                    node.id
                )));
            }
            store.insert_node(Node::new(node.id.clone(), node.payload()));
        }

        for edge in &description.edges {
            let source = store.lookup_endpoint(&edge.source)?;
            let target = store.lookup_endpoint(&edge.target)?;

            let strength = edge
                .weight
                .filter(|w| w.is_finite() && *w > 0.0)
                .unwrap_or_else(|| numeric_weight(&edge.metadata));

            store.graph.add_edge(
                source,
                target,
                Edge::with_strength(edge.metadata.clone(), strength),
            );
        }

        debug!(
            nodes = store.node_count(),
            edges = store.edge_count(),
            "graph loaded from description"
        );
        Ok(store)
    }

    fn lookup_endpoint(&self, id: &str) -> Result<NodeIndex> {
        self.name_to_index.get(id).copied().ok_or_else(|| {
            SimError::MalformedGraph(format!("edge references unknown node \"{id}\""))
        })
    }

    /// Export the graph as a description, in insertion order.
    pub fn to_description(&self) -> GraphDescription {
        let nodes = self
            .graph
            .node_weights()
            .map(NodeDescription::from_node)
            .collect();

        let edges = self
            .graph
            .edge_references()
            .map(|edge| {
                let weight = edge.weight();
                EdgeDescription {
                    source: self.graph[edge.source()].name.clone(),
                    target: self.graph[edge.target()].name.clone(),
                    metadata: weight.metadata.clone(),
                    weight: (weight.strength != numeric_weight(&weight.metadata))
                        .then_some(weight.strength),
                }
            })
            .collect();

        GraphDescription { nodes, edges }
    }

    // =========================================================================
    // Dimensionality
    // =========================================================================

    /// Coordinates per node.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Change the dimensionality, zeroing every position and velocity.
    pub fn set_dimensions(&mut self, dimensions: usize) -> Result<()> {
        if dimensions < 1 {
            return Err(SimError::InvalidDimension(dimensions));
        }

        self.dimensions = dimensions;
        let len = self.graph.node_count() * dimensions;
        self.positions = vec![0.0; len];
        self.velocities = vec![0.0; len];
        Ok(())
    }

    // =========================================================================
    // Node Operations
    // =========================================================================

    /// Add a node with a zeroed position and velocity.
    pub fn add_node(&mut self, name: impl Into<String>, weight: Value) -> Result<NodeId> {
        let name = name.into();
        if self.name_to_index.contains_key(&name) {
            return Err(SimError::DuplicateName(name));
        }

        Ok(self.insert_node(Node::new(name, weight)))
    }

    fn insert_node(&mut self, node: Node) -> NodeId {
        let name = node.name.clone();
        let index = self.graph.add_node(node);
        self.name_to_index.insert(name, index);

        self.positions
            .extend(std::iter::repeat_n(0.0, self.dimensions));
        self.velocities
            .extend(std::iter::repeat_n(0.0, self.dimensions));

        NodeId(index.index() as u32)
    }

    /// Resolve a name or index to a node id.
    pub fn resolve(&self, node: &NodeRef) -> Result<NodeId> {
        match node {
            NodeRef::Name(name) => self
                .index_of(name)
                .ok_or_else(|| SimError::UnknownNode(name.clone())),
            NodeRef::Id(id) => self
                .graph
                .node_weight(NodeIndex::new(id.index()))
                .map(|_| *id)
                .ok_or_else(|| SimError::UnknownNode(id.0.to_string())),
        }
    }

    /// Look up a node id by name.
    pub fn index_of(&self, name: &str) -> Option<NodeId> {
        self.name_to_index
            .get(name)
            .map(|index| NodeId(index.index() as u32))
    }

    /// Get the number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Borrow a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.graph.node_weight(NodeIndex::new(id.index()))
    }

    /// Snapshot of a node's name, label, location and metadata.
    pub fn node_info(&self, node: impl Into<NodeRef>) -> Result<NodeInfo> {
        let id = self.resolve(&node.into())?;
        Ok(self.info(id))
    }

    fn info(&self, id: NodeId) -> NodeInfo {
        let node = &self.graph[NodeIndex::new(id.index())];
        NodeInfo {
            id,
            name: node.name.clone(),
            label: node.label().map(str::to_string),
            location: self.slot(&self.positions, id).to_vec(),
            metadata: node.metadata().clone(),
        }
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeInfo> + '_ {
        self.graph
            .node_indices()
            .map(|index| self.info(NodeId(index.index() as u32)))
    }

    /// Borrow every node in insertion order.
    pub fn node_weights(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Get a node's position.
    pub fn position(&self, id: NodeId) -> Option<&[f64]> {
        self.node(id).map(|_| self.slot(&self.positions, id))
    }

    /// Get a node's velocity.
    pub fn velocity(&self, id: NodeId) -> Option<&[f64]> {
        self.node(id).map(|_| self.slot(&self.velocities, id))
    }

    /// Move a node, zeroing its velocity.
    pub fn set_node_position(
        &mut self,
        node: impl Into<NodeRef>,
        position: &[f64],
    ) -> Result<NodeId> {
        let id = self.resolve(&node.into())?;

        if position.len() != self.dimensions {
            return Err(SimError::DimensionMismatch {
                expected: self.dimensions,
                got: position.len(),
            });
        }
        if !math::is_finite(position) {
            let name = self.graph[NodeIndex::new(id.index())].name.clone();
            return Err(SimError::NumericInstability(name));
        }

        let range = self.range(id);
        self.positions[range.clone()].copy_from_slice(position);
        self.velocities[range].fill(0.0);
        Ok(id)
    }

    /// Pin a node (exclude from simulation).
    pub fn pin_node(&mut self, node: impl Into<NodeRef>) -> Result<()> {
        self.set_pinned(node.into(), true)
    }

    /// Unpin a node.
    pub fn unpin_node(&mut self, node: impl Into<NodeRef>) -> Result<()> {
        self.set_pinned(node.into(), false)
    }

    fn set_pinned(&mut self, node: NodeRef, pinned: bool) -> Result<()> {
        let id = self.resolve(&node)?;
        self.graph[NodeIndex::new(id.index())].pinned = pinned;
        Ok(())
    }

    /// Check if a node is pinned.
    pub fn is_node_pinned(&self, id: NodeId) -> bool {
        self.node(id).map(|node| node.pinned).unwrap_or(false)
    }

    // =========================================================================
    // Edge Operations
    // =========================================================================

    /// Add an edge between two existing nodes.
    ///
    /// Both endpoints are resolved before anything is inserted, so a failed
    /// call leaves the edge list unchanged.
    pub fn add_edge(
        &mut self,
        source: impl Into<NodeRef>,
        target: impl Into<NodeRef>,
        weight: Value,
    ) -> Result<EdgeId> {
        let source = self.resolve(&source.into())?;
        let target = self.resolve(&target.into())?;

        let index = self.graph.add_edge(
            NodeIndex::new(source.index()),
            NodeIndex::new(target.index()),
            Edge::new(weight),
        );
        Ok(EdgeId(index.index() as u32))
    }

    /// Get the number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All edges in insertion order, endpoints resolved.
    pub fn edges(&self) -> impl Iterator<Item = EdgeView> + '_ {
        self.graph.edge_references().map(|edge| EdgeView {
            id: EdgeId(edge.id().index() as u32),
            source: self.info(NodeId(edge.source().index() as u32)),
            target: self.info(NodeId(edge.target().index() as u32)),
            metadata: edge.weight().metadata.clone(),
        })
    }

    /// Get neighbors of a node, ignoring edge direction.
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        if self.node(id).is_none() {
            return Vec::new();
        }

        self.graph
            .neighbors_undirected(NodeIndex::new(id.index()))
            .map(|index| NodeId(index.index() as u32))
            .collect()
    }

    /// Per-node incident springs in CSR form.
    ///
    /// Every edge appears once under each endpoint, in insertion order.
    /// Self-loops are left out since they never exert a force.
    pub fn adjacency(&self) -> Adjacency {
        let node_bound = self.graph.node_bound();
        let mut offsets = vec![0usize; node_bound + 1];

        // Count incident edges per node
        for edge in self.graph.edge_references() {
            if edge.source() == edge.target() {
                continue;
            }
            offsets[edge.source().index() + 1] += 1;
            offsets[edge.target().index() + 1] += 1;
        }

        // Prefix sum
        for i in 1..=node_bound {
            offsets[i] += offsets[i - 1];
        }

        let mut springs = vec![Spring::default(); offsets[node_bound]];
        let mut cursor = offsets[..node_bound].to_vec();
        for edge in self.graph.edge_references() {
            let (source, target) = (edge.source().index(), edge.target().index());
            if source == target {
                continue;
            }
            let strength = edge.weight().strength;

            springs[cursor[source]] = Spring { other: target, strength };
            cursor[source] += 1;
            springs[cursor[target]] = Spring { other: source, strength };
            cursor[target] += 1;
        }

        Adjacency { offsets, springs }
    }

    // =========================================================================
    // Buffer Access
    // =========================================================================

    /// All positions, `dimensions()` values per node.
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// All velocities, `dimensions()` values per node.
    pub fn velocities(&self) -> &[f64] {
        &self.velocities
    }

    /// Mutable position and velocity buffers, for the integrator.
    pub(crate) fn buffers_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        (&mut self.positions, &mut self.velocities)
    }

    fn range(&self, id: NodeId) -> std::ops::Range<usize> {
        let start = id.index() * self.dimensions;
        start..start + self.dimensions
    }

    fn slot<'a>(&self, buffer: &'a [f64], id: NodeId) -> &'a [f64] {
        &buffer[self.range(id)]
    }

    // =========================================================================
    // Utilities
    // =========================================================================

    /// Per-axis minimum and maximum over all positions.
    pub fn bounds(&self) -> Option<(Vec<f64>, Vec<f64>)> {
        if self.graph.node_count() == 0 {
            return None;
        }

        let mut min = vec![f64::INFINITY; self.dimensions];
        let mut max = vec![f64::NEG_INFINITY; self.dimensions];

        for position in self.positions.chunks_exact(self.dimensions) {
            for axis in 0..self.dimensions {
                min[axis] = min[axis].min(position[axis]);
                max[axis] = max[axis].max(position[axis]);
            }
        }

        Some((min, max))
    }

    /// Clear all nodes and edges, keeping the dimensionality.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.name_to_index.clear();
        self.positions.clear();
        self.velocities.clear();
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

/// An edge as seen from one of its endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Spring {
    /// Index of the node at the other end.
    pub other: usize,
    /// Edge strength.
    pub strength: f64,
}

/// Incident springs of every node, in CSR layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Adjacency {
    offsets: Vec<usize>,
    springs: Vec<Spring>,
}

impl Adjacency {
    /// Springs attached to node `index`.
    pub fn springs(&self, index: usize) -> &[Spring] {
        match (self.offsets.get(index), self.offsets.get(index + 1)) {
            (Some(&start), Some(&end)) => &self.springs[start..end],
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn triangle() -> GraphStore {
        let mut store = GraphStore::new();
        store.add_node("A", json!(1)).unwrap();
        store.add_node("B", json!(1)).unwrap();
        store.add_node("C", json!(1)).unwrap();
        store.add_edge("A", "B", json!(1)).unwrap();
        store.add_edge("B", "C", json!(2)).unwrap();
        store.add_edge("C", "A", json!(null)).unwrap();
        store
    }

    #[test]
    fn test_add_node() {
        let mut store = GraphStore::with_dimensions(3).unwrap();
        let id = store.add_node("A", json!(1)).unwrap();

        assert_eq!(store.node_count(), 1);
        assert_eq!(id, NodeId(0));
        assert_eq!(store.position(id), Some(&[0.0, 0.0, 0.0][..]));
        assert_eq!(store.velocity(id), Some(&[0.0, 0.0, 0.0][..]));
    }

    #[test]
    fn test_duplicate_name() {
        let mut store = GraphStore::new();
        store.add_node("A", json!(1)).unwrap();

        let err = store.add_node("A", json!(2)).unwrap_err();
        assert_eq!(err, SimError::DuplicateName("A".to_string()));
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn test_add_edge() {
        let store = triangle();
        assert_eq!(store.edge_count(), 3);
    }

    #[test]
    fn test_add_edge_by_index() {
        let mut store = triangle();
        store.add_edge(NodeId(0), NodeId(2), json!(1)).unwrap();
        assert_eq!(store.edge_count(), 4);
    }

    #[test]
    fn test_add_edge_unknown_endpoint() {
        let mut store = triangle();

        let err = store.add_edge("A", "Z", json!(1)).unwrap_err();
        assert_eq!(err, SimError::UnknownNode("Z".to_string()));

        let err = store.add_edge(NodeId(9), "A", json!(1)).unwrap_err();
        assert_eq!(err, SimError::UnknownNode("9".to_string()));

        assert_eq!(store.edge_count(), 3);
    }

    #[test]
    fn test_self_loops_and_duplicates_are_kept() {
        let mut store = triangle();
        store.add_edge("A", "A", json!(1)).unwrap();
        store.add_edge("A", "B", json!(1)).unwrap();
        assert_eq!(store.edge_count(), 5);
    }

    #[test]
    fn test_get_neighbors() {
        let store = triangle();
        let neighbors = store.neighbors(NodeId(0));
        assert_eq!(neighbors.len(), 2);
        assert!(neighbors.contains(&NodeId(1)));
        assert!(neighbors.contains(&NodeId(2)));
    }

    #[test]
    fn test_node_info() {
        let mut store = GraphStore::new();
        store
            .add_node("A", json!({ "label": "Alpha", "metadata": [1, 2] }))
            .unwrap();

        let info = store.node_info("A").unwrap();
        assert_eq!(info.name, "A");
        assert_eq!(info.label.as_deref(), Some("Alpha"));
        assert_eq!(info.metadata, json!([1, 2]));
        assert_eq!(info.location, vec![0.0, 0.0]);

        assert_eq!(
            store.node_info("nope").unwrap_err(),
            SimError::UnknownNode("nope".to_string())
        );
    }

    #[test]
    fn test_enumeration_keeps_insertion_order() {
        let store = triangle();

        let names: Vec<_> = store.nodes().map(|n| n.name).collect();
        assert_eq!(names, ["A", "B", "C"]);

        let edges: Vec<_> = store
            .edges()
            .map(|e| (e.source.name, e.target.name, e.metadata))
            .collect();
        assert_eq!(
            edges,
            [
                ("A".to_string(), "B".to_string(), json!(1)),
                ("B".to_string(), "C".to_string(), json!(2)),
                ("C".to_string(), "A".to_string(), json!(null)),
            ]
        );
    }

    #[test]
    fn test_set_dimensions_resizes_buffers() {
        let mut store = triangle();
        store.set_dimensions(4).unwrap();

        assert_eq!(store.positions().len(), 12);
        assert_eq!(store.velocities().len(), 12);
        assert_eq!(store.node_info("C").unwrap().location.len(), 4);

        assert_eq!(store.set_dimensions(0), Err(SimError::InvalidDimension(0)));
        assert_eq!(store.dimensions(), 4);
    }

    #[test]
    fn test_set_node_position() {
        let mut store = triangle();
        store.set_node_position("B", &[3.0, -1.0]).unwrap();
        assert_eq!(store.position(NodeId(1)), Some(&[3.0, -1.0][..]));

        let err = store.set_node_position("B", &[1.0]).unwrap_err();
        assert_eq!(err, SimError::DimensionMismatch { expected: 2, got: 1 });

        assert!(store.set_node_position("B", &[f64::NAN, 0.0]).is_err());
        assert_eq!(store.position(NodeId(1)), Some(&[3.0, -1.0][..]));
    }

    #[test]
    fn test_pin_unpin() {
        let mut store = triangle();
        assert!(!store.is_node_pinned(NodeId(0)));

        store.pin_node("A").unwrap();
        assert!(store.is_node_pinned(NodeId(0)));

        store.unpin_node(NodeId(0)).unwrap();
        assert!(!store.is_node_pinned(NodeId(0)));

        assert!(store.pin_node("Z").is_err());
    }

    #[test]
    fn test_adjacency() {
        let mut store = triangle();
        store.add_edge("A", "A", json!(5)).unwrap();
        let adjacency = store.adjacency();

        assert_eq!(
            adjacency.springs(0),
            &[
                Spring { other: 1, strength: 1.0 },
                Spring { other: 2, strength: 1.0 },
            ]
        );
        assert_eq!(
            adjacency.springs(1),
            &[
                Spring { other: 0, strength: 1.0 },
                Spring { other: 2, strength: 2.0 },
            ]
        );
        assert!(adjacency.springs(7).is_empty());
    }

    #[test]
    fn test_adjacency_covers_isolated_last_node() {
        let mut store = triangle();
        store.add_node("D", json!(1)).unwrap();
        let adjacency = store.adjacency();

        assert_eq!(adjacency.springs(2).len(), 2);
        assert!(adjacency.springs(3).is_empty());
    }

    #[test]
    fn test_bounds() {
        let mut store = triangle();
        store.set_node_position("A", &[-10.0, -5.0]).unwrap();
        store.set_node_position("B", &[10.0, 5.0]).unwrap();

        let (min, max) = store.bounds().unwrap();
        assert_eq!(min, vec![-10.0, -5.0]);
        assert_eq!(max, vec![10.0, 5.0]);

        assert_eq!(GraphStore::new().bounds(), None);
    }

    #[test]
    fn test_clear() {
        let mut store = triangle();
        store.clear();
        assert_eq!(store.node_count(), 0);
        assert_eq!(store.edge_count(), 0);
        assert!(store.positions().is_empty());

        // names are free again after clearing
        assert_eq!(store.add_node("A", json!(1)).unwrap(), NodeId(0));
    }

    #[test]
    fn test_description_round_trip() {
        let store = triangle();
        let description = store.to_description();
        assert_eq!(description.nodes.len(), 3);
        assert_eq!(description.edges[1].metadata, json!(2));

        let rebuilt = GraphStore::from_description(&description, 2).unwrap();
        assert_eq!(rebuilt.to_description(), description);
    }

    #[test]
    fn test_from_description_rejects_unknown_endpoint() {
        let description = GraphDescription {
            nodes: vec![NodeDescription::new("A")],
            edges: vec![EdgeDescription::new("A", "ghost")],
        };

        let err = GraphStore::from_description(&description, 2).unwrap_err();
        assert!(matches!(err, SimError::MalformedGraph(_)));
    }

    #[test]
    fn test_from_description_rejects_duplicate_ids() {
        let description = GraphDescription {
            nodes: vec![NodeDescription::new("A"), NodeDescription::new("A")],
            edges: vec![],
        };

        let err = GraphStore::from_description(&description, 2).unwrap_err();
        assert!(matches!(err, SimError::MalformedGraph(_)));
    }

    #[test]
    fn test_explicit_edge_weight_overrides_metadata() {
        let description = GraphDescription {
            nodes: vec![NodeDescription::new("A"), NodeDescription::new("B")],
            edges: vec![EdgeDescription::new("A", "B")
                .with_metadata(json!(3))
                .with_weight(0.5)],
        };

        let store = GraphStore::from_description(&description, 2).unwrap();
        assert_eq!(store.adjacency().springs(0)[0].strength, 0.5);
        assert_eq!(store.to_description().edges[0].weight, Some(0.5));
    }
}
