//! GML (Graph Modelling Language) bridge.
//!
//! ```text
//! graph [
//!   directed 0
//!   node [
//!     id 0
//!     label "first"
//!   ]
//!   node [
//!     id 1
//!     weight 2.5
//!   ]
//!   edge [
//!     source 0
//!     target 1
//!     weight 3
//!   ]
//! ]
//! ```
//!
//! Node ids may be integers or strings. `id`, `label`, `source`, `target` and
//! `weight` map onto the description fields. A `metadata` attribute becomes
//! the metadata as is. Without one, any other attributes are gathered into a
//! metadata object, repeated keys turning into arrays. Graph level attributes
//! are ignored.

use regex_lite::Regex;
use serde_json::{Map, Number, Value};

use crate::error::{Result, SimError};
use crate::graph::{EdgeDescription, GraphDescription, NodeDescription};

const TOKEN: &str = r#"(#[^\n]*)|"([^"]*)"|([-+]?(?:\d+\.\d*|\.\d+|\d+)(?:[eE][-+]?\d+)?)|([A-Za-z_][A-Za-z0-9_]*)|(\[)|(\])|(\S)"#;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Key(String),
    Int(i64),
    Real(f64),
    Str(String),
    Open,
    Close,
}

#[derive(Debug, Clone, PartialEq)]
enum GmlValue {
    Int(i64),
    Real(f64),
    Str(String),
    List(Vec<(String, GmlValue)>),
}

fn malformed(message: impl Into<String>) -> SimError {
    SimError::MalformedGraph(message.into())
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let pattern = Regex::new(TOKEN).map_err(|err| malformed(err.to_string()))?;
    let mut tokens = Vec::new();

    for captures in pattern.captures_iter(text) {
        let token = if captures.get(1).is_some() {
            continue;
        } else if let Some(text) = captures.get(2) {
            Token::Str(unescape(text.as_str()))
        } else if let Some(number) = captures.get(3) {
            let number = number.as_str();
            match number.parse::<i64>() {
                Ok(int) => Token::Int(int),
                Err(_) => Token::Real(
                    number
                        .parse()
                        .map_err(|_| malformed(format!("bad number {number}")))?,
                ),
            }
        } else if let Some(key) = captures.get(4) {
            Token::Key(key.as_str().to_string())
        } else if captures.get(5).is_some() {
            Token::Open
        } else if captures.get(6).is_some() {
            Token::Close
        } else {
            let at = captures.get(0).map_or(0, |m| m.start());
            return Err(malformed(format!("unexpected character at byte {at}")));
        };
        tokens.push(token);
    }

    Ok(tokens)
}

fn parse_list(
    tokens: &mut impl Iterator<Item = Token>,
    nested: bool,
) -> Result<Vec<(String, GmlValue)>> {
    let mut entries = Vec::new();
    loop {
        let key = match tokens.next() {
            None if nested => return Err(malformed("unclosed \"[\"")),
            None => return Ok(entries),
            Some(Token::Close) if nested => return Ok(entries),
            Some(Token::Key(key)) => key,
            Some(other) => return Err(malformed(format!("expected a key, found {other:?}"))),
        };

        let value = match tokens.next() {
            Some(Token::Int(int)) => GmlValue::Int(int),
            Some(Token::Real(real)) => GmlValue::Real(real),
            Some(Token::Str(text)) => GmlValue::Str(text),
            Some(Token::Open) => GmlValue::List(parse_list(tokens, true)?),
            _ => return Err(malformed(format!("key \"{key}\" has no value"))),
        };
        entries.push((key, value));
    }
}

/// Parse GML text into a graph description.
///
/// Edge endpoints are not checked here; loading the description into a
/// store does that.
pub fn graph_from_gml(text: &str) -> Result<GraphDescription> {
    let mut tokens = tokenize(text)?.into_iter();
    let document = parse_list(&mut tokens, false)?;

    let items = document
        .into_iter()
        .find_map(|(key, value)| match (key.as_str(), value) {
            ("graph", GmlValue::List(items)) => Some(items),
            _ => None,
        })
        .ok_or_else(|| malformed("expected \"graph [ ... ]\""))?;

    let mut description = GraphDescription::default();
    for (key, value) in items {
        match (key.as_str(), value) {
            ("node", GmlValue::List(attrs)) => description.nodes.push(node_description(attrs)?),
            ("edge", GmlValue::List(attrs)) => description.edges.push(edge_description(attrs)?),
            ("node" | "edge", _) => return Err(malformed(format!("{key} must be a list"))),
            _ => {}
        }
    }

    Ok(description)
}

/// Attributes shared by nodes and edges once the known keys are taken out.
#[derive(Default)]
struct Attributes {
    weight: Option<f64>,
    metadata: Map<String, Value>,
    extra: Map<String, Value>,
}

impl Attributes {
    fn take(&mut self, key: String, value: GmlValue) -> Result<()> {
        match key.as_str() {
            "weight" => self.weight = Some(number(&key, &value)?),
            "metadata" => insert(&mut self.metadata, key, to_json(value)),
            _ => insert(&mut self.extra, key, to_json(value)),
        }
        Ok(())
    }

    fn into_metadata(mut self) -> Value {
        match self.metadata.remove("metadata") {
            Some(metadata) => metadata,
            None if self.extra.is_empty() => Value::Null,
            None => Value::Object(self.extra),
        }
    }
}

fn node_description(attrs: Vec<(String, GmlValue)>) -> Result<NodeDescription> {
    let (mut id, mut label) = (None, None);
    let mut rest = Attributes::default();

    for (key, value) in attrs {
        match key.as_str() {
            "id" => id = Some(identifier(&key, value)?),
            "label" => label = Some(text(value)),
            _ => rest.take(key, value)?,
        }
    }

    let id = id.ok_or_else(|| malformed("node is missing an id"))?;
    let mut node = NodeDescription::new(id);
    node.label = label;
    node.weight = rest.weight;
    node.metadata = rest.into_metadata();
    Ok(node)
}

fn edge_description(attrs: Vec<(String, GmlValue)>) -> Result<EdgeDescription> {
    let (mut source, mut target) = (None, None);
    let mut rest = Attributes::default();

    for (key, value) in attrs {
        match key.as_str() {
            "source" => source = Some(identifier(&key, value)?),
            "target" => target = Some(identifier(&key, value)?),
            _ => rest.take(key, value)?,
        }
    }

    let source = source.ok_or_else(|| malformed("edge is missing a source"))?;
    let target = target.ok_or_else(|| malformed("edge is missing a target"))?;
    let mut edge = EdgeDescription::new(source, target);
    edge.weight = rest.weight;
    edge.metadata = rest.into_metadata();
    Ok(edge)
}

fn identifier(key: &str, value: GmlValue) -> Result<String> {
    match value {
        GmlValue::Int(int) => Ok(int.to_string()),
        GmlValue::Str(text) => Ok(text),
        _ => Err(malformed(format!("{key} must be an integer or a string"))),
    }
}

fn number(key: &str, value: &GmlValue) -> Result<f64> {
    match *value {
        GmlValue::Int(int) => Ok(int as f64),
        GmlValue::Real(real) => Ok(real),
        _ => Err(malformed(format!("{key} must be a number"))),
    }
}

fn text(value: GmlValue) -> String {
    match value {
        GmlValue::Str(text) => text,
        GmlValue::Int(int) => int.to_string(),
        GmlValue::Real(real) => real.to_string(),
        GmlValue::List(_) => String::new(),
    }
}

fn insert(map: &mut Map<String, Value>, key: String, value: Value) {
    match map.get_mut(&key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(key, value);
        }
    }
}

fn to_json(value: GmlValue) -> Value {
    match value {
        GmlValue::Int(int) => Value::from(int),
        GmlValue::Real(real) => Number::from_f64(real).map_or(Value::Null, Value::Number),
        GmlValue::Str(text) => Value::String(text),
        GmlValue::List(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                insert(&mut map, key, to_json(value));
            }
            Value::Object(map)
        }
    }
}

fn unescape(text: &str) -> String {
    text.replace("&quot;", "\"").replace("&amp;", "&")
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('"', "&quot;")
}

/// Serialize a description as GML.
///
/// Ids that read as integers are written bare, others quoted. Booleans
/// become `0`/`1` and nulls are dropped, since GML has neither.
pub fn graph_to_gml(description: &GraphDescription) -> String {
    let mut out = String::from("graph [\n");

    for node in &description.nodes {
        out.push_str("  node [\n");
        write_identifier(&mut out, "id", &node.id);
        if let Some(label) = &node.label {
            out.push_str(&format!("    label \"{}\"\n", escape(label)));
        }
        write_common(&mut out, node.weight, &node.metadata);
        out.push_str("  ]\n");
    }

    for edge in &description.edges {
        out.push_str("  edge [\n");
        write_identifier(&mut out, "source", &edge.source);
        write_identifier(&mut out, "target", &edge.target);
        write_common(&mut out, edge.weight, &edge.metadata);
        out.push_str("  ]\n");
    }

    out.push_str("]\n");
    out
}

fn write_identifier(out: &mut String, key: &str, id: &str) {
    match id.parse::<i64>() {
        Ok(int) if int.to_string() == id => out.push_str(&format!("    {key} {int}\n")),
        _ => out.push_str(&format!("    {key} \"{}\"\n", escape(id))),
    }
}

fn write_common(out: &mut String, weight: Option<f64>, metadata: &Value) {
    if let Some(weight) = weight {
        out.push_str(&format!("    weight {weight:?}\n"));
    }
    write_value(out, 4, "metadata", metadata);
}

fn write_value(out: &mut String, indent: usize, key: &str, value: &Value) {
    let pad = " ".repeat(indent);
    match value {
        Value::Null => {}
        Value::Bool(flag) => out.push_str(&format!("{pad}{key} {}\n", u8::from(*flag))),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(int), _) => out.push_str(&format!("{pad}{key} {int}\n")),
            (None, Some(real)) => out.push_str(&format!("{pad}{key} {real:?}\n")),
            (None, None) => {}
        },
        Value::String(text) => out.push_str(&format!("{pad}{key} \"{}\"\n", escape(text))),
        Value::Array(items) => {
            for item in items {
                write_value(out, indent, key, item);
            }
        }
        Value::Object(map) => {
            out.push_str(&format!("{pad}{key} [\n"));
            for (inner, item) in map {
                write_value(out, indent + 2, inner, item);
            }
            out.push_str(&format!("{pad}]\n"));
        }
    }
}
