//! Normalized graph description used for bulk loading and export.
//!
//! This is the minimal contract between the graph store and the outside
//! world: a node list keyed by id and an edge list referencing those ids.
//! The interchange-format bridge converts to and from it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::node::{Node, explicit_weight};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDescription {
    #[serde(default)]
    pub nodes: Vec<NodeDescription>,
    #[serde(default)]
    pub edges: Vec<EdgeDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescription {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDescription {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl NodeDescription {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            metadata: Value::Null,
            weight: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// The payload a node built from this description carries.
    pub(crate) fn payload(&self) -> Value {
        let mut payload = Map::new();
        if let Some(label) = &self.label {
            payload.insert("label".to_string(), Value::String(label.clone()));
        }
        if !self.metadata.is_null() {
            payload.insert("metadata".to_string(), self.metadata.clone());
        }
        if let Some(weight) = self.weight {
            payload.insert("weight".to_string(), Value::from(weight));
        }
        Value::Object(payload)
    }

    pub(crate) fn from_node(node: &Node) -> Self {
        Self {
            id: node.name.clone(),
            label: node.label().map(str::to_string),
            metadata: node.metadata().clone(),
            weight: explicit_weight(&node.weight),
        }
    }
}

impl EdgeDescription {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            metadata: Value::Null,
            weight: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_round_trips_through_node() {
        let desc = NodeDescription::new("A")
            .with_label("Alpha")
            .with_metadata(json!({ "group": 2 }));

        let node = Node::new(desc.id.clone(), desc.payload());
        assert_eq!(node.label(), Some("Alpha"));
        assert_eq!(node.metadata(), &json!({ "group": 2 }));

        assert_eq!(NodeDescription::from_node(&node), desc);
    }

    #[test]
    fn test_missing_optional_fields_deserialize() {
        let desc: GraphDescription = serde_json::from_value(json!({
            "nodes": [{ "id": "A" }, { "id": "B", "label": "Bee" }],
            "edges": [{ "source": "A", "target": "B" }]
        }))
        .unwrap();

        assert_eq!(desc.nodes.len(), 2);
        assert_eq!(desc.nodes[1].label.as_deref(), Some("Bee"));
        assert_eq!(desc.edges[0].metadata, Value::Null);
    }

    #[test]
    fn test_missing_id_is_rejected() {
        let result: Result<GraphDescription, _> =
            serde_json::from_value(json!({ "nodes": [{ "label": "nameless" }] }));
        assert!(result.is_err());
    }
}
