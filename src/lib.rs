//! Force Graph - WASM Module
//!
//! This module provides an N-dimensional force-directed graph layout
//! engine. It is compiled to WebAssembly and exposes a JavaScript-friendly
//! API via wasm-bindgen; the same core is usable from Rust as an `rlib`.
//!
//! # Architecture
//!
//! - `math`: Vector operations over slices of any length
//! - `graph`: Graph store using petgraph's StableGraph with SoA position buffers
//! - `spatial`: R-tree spatial indexing for exact radius queries
//! - `layout`: Force models, integrator and the simulator state machine
//! - `format`: JSON Graph Format, GML and DOT conversions
//! - `console`: `tracing` output routed to the browser console

use js_sys::Array;
use serde::Serialize;
use serde_json::Value;
use serde_wasm_bindgen::Serializer;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

pub mod console;
pub mod error;
pub mod format;
pub mod graph;
pub mod layout;
pub mod math;
pub mod spatial;

pub use error::{Result, SimError};
pub use graph::{GraphDescription, GraphStore, NodeId, NodeInfo, NodeRef};
pub use layout::{SimulationConfig, SimulationState, Simulator};

/// Initialize the WASM module.
///
/// Panics and warnings (such as a discarded unstable step) go to the
/// browser console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    console::install(tracing::Level::WARN);
}

/// Convert JSON Graph Format text to DOT.
#[wasm_bindgen]
pub fn jsongraph_to_dot(json: String) -> std::result::Result<String, JsError> {
    Ok(format::jsongraph_to_dot(&json)?)
}

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(typescript_type = "ForceGraphNode[]")]
    pub type GraphNodes;

    #[wasm_bindgen(typescript_type = "ForceGraphEdge[]")]
    pub type GraphEdges;

    #[wasm_bindgen(typescript_type = "string | number")]
    pub type NodeReference;
}

fn to_js(value: &Value) -> std::result::Result<JsValue, JsError> {
    Ok(value.serialize(
        &Serializer::new()
            .serialize_maps_as_objects(true)
            .serialize_missing_as_null(true),
    )?)
}

fn node_ref(node: &JsValue) -> std::result::Result<NodeRef, JsError> {
    if let Some(name) = node.as_string() {
        return Ok(NodeRef::Name(name));
    }

    match node.as_f64() {
        Some(index) if index.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&index) => {
            Ok(NodeRef::Id(NodeId(index as u32)))
        }
        _ => Err(JsError::new("node must be a name or a non-negative integer index")),
    }
}

/// Read-only view of a node.
#[wasm_bindgen]
#[derive(Clone)]
pub struct ForceGraphNode {
    name: String,
    label: Option<String>,
    location: Vec<f64>,
    metadata: JsValue,
}

impl ForceGraphNode {
    fn from_info(info: NodeInfo) -> std::result::Result<Self, JsError> {
        Ok(Self {
            metadata: to_js(&info.metadata)?,
            name: info.name,
            label: info.label,
            location: info.location,
        })
    }
}

#[wasm_bindgen]
impl ForceGraphNode {
    #[wasm_bindgen(getter)]
    pub fn name(&self) -> String {
        self.name.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn label(&self) -> Option<String> {
        self.label.clone()
    }

    /// Position, one value per dimension.
    #[wasm_bindgen(getter)]
    pub fn location(&self) -> Vec<f64> {
        self.location.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn metadata(&self) -> JsValue {
        self.metadata.clone()
    }
}

/// Read-only view of an edge with its endpoints resolved.
#[wasm_bindgen]
pub struct ForceGraphEdge {
    source: ForceGraphNode,
    target: ForceGraphNode,
    metadata: JsValue,
}

#[wasm_bindgen]
impl ForceGraphEdge {
    #[wasm_bindgen(getter)]
    pub fn source(&self) -> ForceGraphNode {
        self.source.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn target(&self) -> ForceGraphNode {
        self.target.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn metadata(&self) -> JsValue {
        self.metadata.clone()
    }
}

/// Main entry point for the layout engine.
///
/// This struct wraps the internal Simulator and provides the public API
/// exposed to JavaScript.
#[wasm_bindgen]
pub struct ForceGraphSimulator {
    sim: Simulator,
}

#[wasm_bindgen]
impl ForceGraphSimulator {
    /// Create a simulator with no graph attached.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            sim: Simulator::new(),
        }
    }

    // =========================================================================
    // Graph
    // =========================================================================

    /// The graph as a JSON Graph Format object, nodes keyed by id.
    #[wasm_bindgen(getter, js_name = "graph")]
    pub fn get_graph(&self) -> std::result::Result<JsValue, JsError> {
        to_js(&format::graph_to_value(&self.sim.to_description()))
    }

    /// Replace the graph from a JSON Graph Format object.
    ///
    /// The current graph is kept if the new one is malformed.
    #[wasm_bindgen(setter, js_name = "graph")]
    pub fn set_graph(&mut self, graph: JsValue) -> std::result::Result<(), JsError> {
        let graph: Value = serde_wasm_bindgen::from_value(graph)?;
        let description = format::graph_from_value(graph)?;
        self.sim.set_graph(&description)?;
        Ok(())
    }

    /// Add a node and return its index.
    #[wasm_bindgen(js_name = "addNode")]
    pub fn add_node(&mut self, name: String, weight: JsValue) -> std::result::Result<u32, JsError> {
        let weight: Value = serde_wasm_bindgen::from_value(weight)?;
        Ok(self.sim.add_node(name, weight)?.raw())
    }

    /// Add an edge between two nodes given by name or index.
    #[wasm_bindgen(js_name = "addEdge")]
    pub fn add_edge(
        &mut self,
        source: NodeReference,
        target: NodeReference,
        weight: JsValue,
    ) -> std::result::Result<u32, JsError> {
        let source = node_ref(&source)?;
        let target = node_ref(&target)?;
        let weight: Value = serde_wasm_bindgen::from_value(weight)?;
        Ok(self.sim.add_edge(source, target, weight)?.0)
    }

    #[wasm_bindgen(getter, js_name = "nodes")]
    pub fn get_nodes(&self) -> std::result::Result<GraphNodes, JsError> {
        let array = Array::new();
        for node in self.sim.nodes() {
            array.push(&ForceGraphNode::from_info(node)?.into());
        }
        Ok(array.unchecked_into())
    }

    #[wasm_bindgen(getter, js_name = "edges")]
    pub fn get_edges(&self) -> std::result::Result<GraphEdges, JsError> {
        let array = Array::new();
        for edge in self.sim.edges() {
            let edge = ForceGraphEdge {
                source: ForceGraphNode::from_info(edge.source)?,
                target: ForceGraphNode::from_info(edge.target)?,
                metadata: to_js(&edge.metadata)?,
            };
            array.push(&edge.into());
        }
        Ok(array.unchecked_into())
    }

    #[wasm_bindgen(js_name = "nodeInfo")]
    pub fn node_info(&self, node: NodeReference) -> std::result::Result<ForceGraphNode, JsError> {
        let info = self.sim.node_info(node_ref(&node)?)?;
        ForceGraphNode::from_info(info)
    }

    #[wasm_bindgen(getter, js_name = "nodeCount")]
    pub fn node_count(&self) -> u32 {
        self.sim.node_count() as u32
    }

    #[wasm_bindgen(getter, js_name = "edgeCount")]
    pub fn edge_count(&self) -> u32 {
        self.sim.edge_count() as u32
    }

    /// Move a node by hand. Its velocity is reset.
    #[wasm_bindgen(js_name = "setNodePosition")]
    pub fn set_node_position(
        &mut self,
        node: NodeReference,
        position: Vec<f64>,
    ) -> std::result::Result<(), JsError> {
        self.sim.set_node_position(node_ref(&node)?, &position)?;
        Ok(())
    }

    /// Pin a node (exclude from simulation).
    #[wasm_bindgen(js_name = "pinNode")]
    pub fn pin_node(&mut self, node: NodeReference) -> std::result::Result<(), JsError> {
        Ok(self.sim.pin_node(node_ref(&node)?)?)
    }

    /// Unpin a node (include in simulation).
    #[wasm_bindgen(js_name = "unpinNode")]
    pub fn unpin_node(&mut self, node: NodeReference) -> std::result::Result<(), JsError> {
        Ok(self.sim.unpin_node(node_ref(&node)?)?)
    }

    // =========================================================================
    // Simulation
    // =========================================================================

    /// Set the number of coordinates per node. Positions are zeroed.
    #[wasm_bindgen(js_name = "setDimensions")]
    pub fn set_dimensions(&mut self, dimensions: usize) -> std::result::Result<(), JsError> {
        Ok(self.sim.set_dimensions(dimensions)?)
    }

    #[wasm_bindgen(getter)]
    pub fn dimensions(&self) -> usize {
        self.sim.dimensions()
    }

    #[wasm_bindgen(js_name = "resetNodePlacement")]
    pub fn reset_node_placement(&mut self) {
        self.sim.reset_node_placement();
    }

    /// Advance the simulation by `dt` seconds.
    #[wasm_bindgen]
    pub fn update(&mut self, dt: f64) -> std::result::Result<(), JsError> {
        Ok(self.sim.update(dt)?)
    }

    /// Every node within `radius` of `query`.
    #[wasm_bindgen]
    pub fn find(
        &mut self,
        query: Vec<f64>,
        radius: f64,
    ) -> std::result::Result<GraphNodes, JsError> {
        let array = Array::new();
        for id in self.sim.find(&query, radius)? {
            let info = self.sim.node_info(id)?;
            array.push(&ForceGraphNode::from_info(info)?.into());
        }
        Ok(array.unchecked_into())
    }

    /// The node closest to `query`, if any.
    #[wasm_bindgen]
    pub fn nearest(
        &mut self,
        query: Vec<f64>,
    ) -> std::result::Result<Option<ForceGraphNode>, JsError> {
        match self.sim.nearest(&query)? {
            Some(id) => Ok(Some(ForceGraphNode::from_info(self.sim.node_info(id)?)?)),
            None => Ok(None),
        }
    }

    /// Simulated seconds since the last placement reset.
    #[wasm_bindgen(getter)]
    pub fn time(&self) -> f64 {
        self.sim.time()
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Current configuration as a plain object.
    #[wasm_bindgen(getter)]
    pub fn config(&self) -> std::result::Result<JsValue, JsError> {
        to_js(&serde_json::to_value(self.sim.config())?)
    }

    /// Update configuration. Keys that are left out keep their current value.
    #[wasm_bindgen(js_name = "setConfig")]
    pub fn set_config(&mut self, changes: JsValue) -> std::result::Result<(), JsError> {
        let changes: Value = serde_wasm_bindgen::from_value(changes)?;
        let Value::Object(changes) = changes else {
            return Err(JsError::new("config must be an object"));
        };

        let mut merged = serde_json::to_value(self.sim.config())?;
        if let Value::Object(current) = &mut merged {
            current.extend(changes);
        }

        let config: SimulationConfig = serde_json::from_value(merged)?;
        Ok(self.sim.set_config(config)?)
    }

    /// Fix the placement seed, or pass nothing to draw fresh entropy.
    ///
    /// Any integer in `0..=Number.MAX_SAFE_INTEGER` is accepted.
    #[wasm_bindgen(js_name = "setSeed")]
    pub fn set_seed(&mut self, seed: Option<f64>) -> std::result::Result<(), JsError> {
        let seed = seed.map(seed_from_number).transpose()?;
        self.sim.set_seed(seed);
        Ok(())
    }
}

/// Largest integer a JS number holds exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn seed_from_number(seed: f64) -> Result<u64> {
    if seed.fract() == 0.0 && (0.0..=MAX_SAFE_INTEGER).contains(&seed) {
        Ok(seed as u64)
    } else {
        Err(SimError::InvalidConfig(format!(
            "seed must be an integer in 0..=2^53-1, got {seed}"
        )))
    }
}

impl Default for ForceGraphSimulator {
    fn default() -> Self {
        Self::new()
    }
}
