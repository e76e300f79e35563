//! JSON Graph Format bridge.
//!
//! Reads graphs written in the
//! [JSON Graph Format](https://github.com/jsongraph/json-graph-specification):
//!
//! ```json
//! {
//!     "graph": {
//!         "nodes": {
//!             "A": { "label": "first" },
//!             "B": { "metadata": { "something": "here" } },
//!             "C": {}
//!         },
//!         "edges": [
//!             { "source": "A", "target": "B", "metadata": 2.5 },
//!             { "source": "B", "target": "C" }
//!         ]
//!     }
//! }
//! ```
//!
//! Nodes may also be a list of `{ "id": ..., ... }` objects (version 1 of the
//! format), and the outer `"graph"` wrapper may be left out. Hyperedges are
//! not supported. Graph level fields such as `directed` or `label` are
//! ignored.

use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::error::{Result, SimError};
use crate::graph::{EdgeDescription, GraphDescription, NodeDescription};

#[derive(Debug, Deserialize)]
struct JsonGraph {
    #[serde(default)]
    nodes: Option<JsonNodes>,
    #[serde(default)]
    edges: Option<Vec<JsonEdge>>,
    #[serde(default)]
    hyperedges: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonNodes {
    Keyed(Map<String, Value>),
    Listed(Vec<Value>),
}

#[derive(Debug, Default, Deserialize)]
struct JsonNode {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    metadata: Value,
}

#[derive(Debug, Deserialize)]
struct JsonEdge {
    source: String,
    target: String,
    #[serde(default)]
    metadata: Value,
}

fn malformed(message: impl Into<String>) -> SimError {
    SimError::MalformedGraph(message.into())
}

/// Parse JSON Graph Format text into a graph description.
pub fn graph_from_json(text: &str) -> Result<GraphDescription> {
    let document: Value =
        serde_json::from_str(text).map_err(|err| malformed(format!("input is not JSON: {err}")))?;
    graph_from_value(document)
}

/// Like [`graph_from_json`], for an already parsed document.
pub fn graph_from_value(document: Value) -> Result<GraphDescription> {
    let inner = match document {
        Value::Object(mut outer) if outer.contains_key("graph") => outer.remove("graph"),
        other => Some(other),
    };
    let inner = match inner {
        Some(inner @ Value::Object(_)) => inner,
        _ => return Err(malformed("graph must be an object")),
    };

    let graph: JsonGraph =
        serde_json::from_value(inner).map_err(|err| malformed(err.to_string()))?;

    if graph.hyperedges.as_ref().is_some_and(|h| !h.is_null()) {
        return Err(malformed("graphs with hyperedges are not supported"));
    }

    let nodes = match graph.nodes {
        None => Vec::new(),
        Some(JsonNodes::Keyed(map)) => map
            .into_iter()
            .map(|(id, node)| node_description(id, node))
            .collect::<Result<_>>()?,
        Some(JsonNodes::Listed(list)) => list
            .into_iter()
            .map(|node| {
                let id = node
                    .get("id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| malformed("node in list is missing a string \"id\""))?
                    .to_string();
                node_description(id, node)
            })
            .collect::<Result<_>>()?,
    };

    let edges = graph
        .edges
        .unwrap_or_default()
        .into_iter()
        .map(|edge| EdgeDescription::new(edge.source, edge.target).with_metadata(edge.metadata))
        .collect();

    Ok(GraphDescription { nodes, edges })
}

fn node_description(id: String, value: Value) -> Result<NodeDescription> {
    let node: JsonNode = if value.is_null() {
        JsonNode::default()
    } else {
        serde_json::from_value(value).map_err(|err| malformed(format!("node \"{id}\": {err}")))?
    };

    let mut description = NodeDescription::new(id).with_metadata(node.metadata);
    description.label = node.label;
    Ok(description)
}

/// The inner graph object (`{ "nodes": {...}, "edges": [...] }`) for a
/// description, nodes keyed by id.
///
/// The format has no notion of weight: edge strength comes back from the
/// metadata when the output is read again.
pub fn graph_to_value(description: &GraphDescription) -> Value {
    let mut nodes = Map::new();
    for node in &description.nodes {
        let mut entry = Map::new();
        if let Some(label) = &node.label {
            entry.insert("label".to_string(), Value::String(label.clone()));
        }
        if !node.metadata.is_null() {
            entry.insert("metadata".to_string(), node.metadata.clone());
        }
        nodes.insert(node.id.clone(), Value::Object(entry));
    }

    let edges: Vec<Value> = description
        .edges
        .iter()
        .map(|edge| {
            let mut entry = Map::new();
            entry.insert("source".to_string(), Value::String(edge.source.clone()));
            entry.insert("target".to_string(), Value::String(edge.target.clone()));
            if !edge.metadata.is_null() {
                entry.insert("metadata".to_string(), edge.metadata.clone());
            }
            Value::Object(entry)
        })
        .collect();

    json!({ "nodes": nodes, "edges": edges })
}

/// Serialize a description as JSON Graph Format text, wrapped in `"graph"`.
pub fn graph_to_json(description: &GraphDescription) -> Result<String> {
    let document = json!({ "graph": graph_to_value(description) });
    serde_json::to_string(&document).map_err(|err| malformed(err.to_string()))
}
