//! JavaScript facade, run with `wasm-pack test --node`.

#![cfg(target_arch = "wasm32")]

use force_graph_wasm::{ForceGraphSimulator, jsongraph_to_dot};
use js_sys::{Array, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_test::*;

fn simulator() -> ForceGraphSimulator {
    let mut sim = ForceGraphSimulator::new();
    sim.set_seed(Some(3.0)).map_err(JsValue::from).unwrap();
    sim
}

fn name(value: &str) -> force_graph_wasm::NodeReference {
    JsValue::from_str(value).unchecked_into()
}

fn index(value: u32) -> force_graph_wasm::NodeReference {
    JsValue::from_f64(value as f64).unchecked_into()
}

#[wasm_bindgen_test]
fn add_nodes_and_edges() {
    let mut sim = simulator();
    assert_eq!(sim.add_node("A".into(), JsValue::from_f64(1.0)).map_err(JsValue::from).unwrap(), 0);
    assert_eq!(sim.add_node("B".into(), JsValue::UNDEFINED).map_err(JsValue::from).unwrap(), 1);
    assert!(sim.add_node("A".into(), JsValue::NULL).is_err());

    sim.add_edge(name("A"), index(1), JsValue::from_f64(2.0)).map_err(JsValue::from).unwrap();
    assert!(sim.add_edge(name("A"), name("Z"), JsValue::NULL).is_err());
    assert!(sim.add_edge(index(0), JsValue::from_f64(0.5).unchecked_into(), JsValue::NULL).is_err());

    assert_eq!(sim.node_count(), 2);
    assert_eq!(sim.edge_count(), 1);

    let edges: Array = sim.get_edges().map_err(JsValue::from).unwrap().unchecked_into();
    assert_eq!(edges.length(), 1);
}

#[wasm_bindgen_test]
fn step_and_find() {
    let mut sim = simulator();
    sim.add_node("A".into(), JsValue::from_f64(1.0)).map_err(JsValue::from).unwrap();
    sim.add_node("B".into(), JsValue::from_f64(1.0)).map_err(JsValue::from).unwrap();
    sim.add_edge(name("A"), name("B"), JsValue::from_f64(1.0)).map_err(JsValue::from).unwrap();

    assert!(sim.update(0.035).is_err());
    sim.reset_node_placement();
    for _ in 0..10 {
        sim.update(0.035).map_err(JsValue::from).unwrap();
    }
    assert!(sim.time() > 0.0);

    let a = sim.node_info(name("A")).map_err(JsValue::from).unwrap();
    assert_eq!(a.location().len(), 2);

    let found: Array = sim.find(a.location(), 0.0).map_err(JsValue::from).unwrap().unchecked_into();
    assert_eq!(found.length(), 1);
    assert!(sim.find(vec![0.0; 3], 1.0).is_err());
}

#[wasm_bindgen_test]
fn graph_setter_and_getter() {
    let mut sim = simulator();
    let graph = js_sys::JSON::parse(
        r#"{ "nodes": { "x": { "label": "Ex" }, "y": {} }, "edges": [{ "source": "x", "target": "y" }] }"#,
    )
    .unwrap();
    sim.set_graph(graph).map_err(JsValue::from).unwrap();

    let x = sim.node_info(name("x")).map_err(JsValue::from).unwrap();
    assert_eq!(x.label().as_deref(), Some("Ex"));

    let out = sim.get_graph().map_err(JsValue::from).unwrap();
    let nodes = Reflect::get(&out, &"nodes".into()).unwrap();
    assert!(Reflect::has(&nodes, &"y".into()).unwrap());

    let broken = js_sys::JSON::parse(
        r#"{ "nodes": { "x": {} }, "edges": [{ "source": "x", "target": "ghost" }] }"#,
    )
    .unwrap();
    assert!(sim.set_graph(broken).is_err());
    assert_eq!(sim.node_count(), 2);
}

#[wasm_bindgen_test]
fn config_merges_partial_objects() {
    let mut sim = simulator();
    let changes = js_sys::JSON::parse(r#"{ "dimensions": 3, "damping": 0.9 }"#).unwrap();
    sim.set_config(changes).map_err(JsValue::from).unwrap();
    assert_eq!(sim.dimensions(), 3);

    let config = sim.config().map_err(JsValue::from).unwrap();
    assert_eq!(Reflect::get(&config, &"seed".into()).unwrap().as_f64(), Some(3.0));

    let bad = js_sys::JSON::parse(r#"{ "damping": 1.5 }"#).unwrap();
    assert!(sim.set_config(bad).is_err());
}

#[wasm_bindgen_test]
fn seeds_beyond_32_bits() {
    let mut sim = simulator();
    sim.set_seed(Some(2f64.powi(40))).map_err(JsValue::from).unwrap();
    let config = sim.config().map_err(JsValue::from).unwrap();
    assert_eq!(Reflect::get(&config, &"seed".into()).unwrap().as_f64(), Some(2f64.powi(40)));

    assert!(sim.set_seed(Some(1.5)).is_err());
    assert!(sim.set_seed(Some(-1.0)).is_err());
    sim.set_seed(None).map_err(JsValue::from).unwrap();
}

#[wasm_bindgen_test]
fn converts_json_graph_to_dot() {
    let dot = jsongraph_to_dot(
        r#"{ "graph": { "nodes": { "a": {}, "b": {} }, "edges": [{ "source": "a", "target": "b" }] } }"#
            .to_string(),
    )
    .map_err(JsValue::from)
    .unwrap();
    assert!(dot.contains("0 -- 1"));
}

#[wasm_bindgen_test]
fn console_logging_installs_once() {
    force_graph_wasm::console::install(tracing::Level::WARN);
    assert!(!force_graph_wasm::console::install(tracing::Level::DEBUG));
    tracing::warn!("reaches the console");
}
