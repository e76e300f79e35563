//! DOT rendering.
//!
//! Graphs are rendered undirected, each node labelled with its id and edges
//! left unlabelled:
//!
//! ```text
//! graph {
//!     0 [ label = "A" ]
//!     1 [ label = "B" ]
//!     0 -- 1 [ ]
//! }
//! ```

use std::collections::HashMap;

use petgraph::Undirected;
use petgraph::dot::{Config, Dot};
use petgraph::stable_graph::{NodeIndex, StableGraph};

use super::json::graph_from_json;
use crate::error::{Result, SimError};
use crate::graph::GraphDescription;

/// Render a graph description as DOT.
///
/// Fails with `MalformedGraph` on duplicate node ids or on an edge that
/// references an id not present in the node list.
pub fn description_to_dot(description: &GraphDescription) -> Result<String> {
    let mut graph: StableGraph<String, String, Undirected> =
        StableGraph::with_capacity(description.nodes.len(), description.edges.len());
    let mut indices: HashMap<&str, NodeIndex> = HashMap::with_capacity(description.nodes.len());

    for node in &description.nodes {
        if indices.contains_key(node.id.as_str()) {
            return Err(SimError::MalformedGraph(format!(
                "node id \"{}\" appears more than once",
                node.id
            )));
        }
        indices.insert(node.id.as_str(), graph.add_node(node.id.clone()));
    }

    for edge in &description.edges {
        let lookup = |id: &str| {
            indices.get(id).copied().ok_or_else(|| {
                SimError::MalformedGraph(format!("edge references unknown node \"{id}\""))
            })
        };
        let (source, target) = (lookup(edge.source.as_str())?, lookup(edge.target.as_str())?);
        graph.add_edge(source, target, String::new());
    }

    Ok(Dot::with_config(&graph, &[Config::EdgeNoLabel]).to_string())
}

/// Read JSON Graph Format text and render it as DOT.
pub fn jsongraph_to_dot(text: &str) -> Result<String> {
    description_to_dot(&graph_from_json(text)?)
}
