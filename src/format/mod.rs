//! Conversions between graph descriptions and text formats.
//!
//! These are pure transforms with no access to simulation state.

pub mod dot;
pub mod gml;
pub mod json;

pub use dot::{description_to_dot, jsongraph_to_dot};
pub use gml::{graph_from_gml, graph_to_gml};
pub use json::{graph_from_json, graph_from_value, graph_to_json, graph_to_value};
