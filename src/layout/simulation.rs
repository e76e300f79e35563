//! The simulator: graph store, force model, integrator and spatial index
//! behind one exclusively owned value.
//!
//! A step evaluates every force against the positions at the start of the
//! step, integrates into scratch buffers and only commits when every
//! coordinate is finite, so a failed step leaves nothing behind.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::{Result, SimError};
use crate::graph::{
    EdgeId, EdgeView, GraphDescription, GraphStore, NodeId, NodeInfo, NodeRef,
};
use crate::math;
use crate::spatial::SpatialIndex;

use super::config::SimulationConfig;
use super::force::{ForceContext, ForceModel, compute_forces, model_from_config};

/// Where the simulator is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    /// Positions have not been placed since the last structural change.
    Unplaced,
    /// Positions are placed; stepping and queries are allowed.
    Ready,
}

/// A force-directed layout simulation.
pub struct Simulator {
    store: GraphStore,
    config: SimulationConfig,
    model: Box<dyn ForceModel>,
    spatial: SpatialIndex,
    spatial_dirty: bool,
    state: SimulationState,
    time: f64,
    steps: u64,
}

impl Simulator {
    /// Create a simulator with no graph attached and the default
    /// configuration.
    pub fn new() -> Self {
        let config = SimulationConfig::default();
        Self {
            store: GraphStore::new(),
            model: model_from_config(&config),
            config,
            spatial: SpatialIndex::new(),
            spatial_dirty: false,
            state: SimulationState::Unplaced,
            time: 0.0,
            steps: 0,
        }
    }

    /// Create a simulator with a validated configuration.
    pub fn with_config(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            store: GraphStore::with_dimensions(config.dimensions)?,
            model: model_from_config(&config),
            config,
            ..Self::new()
        })
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Replace the configuration.
    ///
    /// The force model is rebuilt from the new values. Changing the
    /// dimensionality behaves like [`Simulator::set_dimensions`].
    pub fn set_config(&mut self, config: SimulationConfig) -> Result<()> {
        config.validate()?;

        if config.dimensions != self.store.dimensions() {
            self.set_dimensions(config.dimensions)?;
        }
        self.model = model_from_config(&config);
        self.config = config;
        Ok(())
    }

    /// Fix (or release) the placement seed used by the next reset.
    pub fn set_seed(&mut self, seed: Option<u64>) {
        self.config.seed = seed;
    }

    /// Swap in a custom force model.
    pub fn set_force_model(&mut self, model: Box<dyn ForceModel>) {
        debug!(model = model.name(), "force model replaced");
        self.model = model;
    }

    pub fn force_model(&self) -> &dyn ForceModel {
        self.model.as_ref()
    }

    // =========================================================================
    // Graph
    // =========================================================================

    /// Read access to the underlying store.
    pub fn graph(&self) -> &GraphStore {
        &self.store
    }

    /// Add a node. Placement must be redone before the next step.
    pub fn add_node(&mut self, name: impl Into<String>, weight: Value) -> Result<NodeId> {
        let id = self.store.add_node(name, weight)?;
        self.invalidate();
        Ok(id)
    }

    /// Add an edge. Placement must be redone before the next step.
    pub fn add_edge(
        &mut self,
        source: impl Into<NodeRef>,
        target: impl Into<NodeRef>,
        weight: Value,
    ) -> Result<EdgeId> {
        let id = self.store.add_edge(source, target, weight)?;
        self.invalidate();
        Ok(id)
    }

    /// Replace the whole graph.
    ///
    /// The new graph is built on the side; on error the current one stays.
    pub fn set_graph(&mut self, description: &GraphDescription) -> Result<()> {
        let store = GraphStore::from_description(description, self.store.dimensions())?;
        self.store = store;
        self.invalidate();
        Ok(())
    }

    /// Export the graph as a description.
    pub fn to_description(&self) -> GraphDescription {
        self.store.to_description()
    }

    /// Drop every node and edge.
    pub fn clear(&mut self) {
        self.store.clear();
        self.invalidate();
    }

    pub fn node_count(&self) -> usize {
        self.store.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.store.edge_count()
    }

    pub fn node_info(&self, node: impl Into<NodeRef>) -> Result<NodeInfo> {
        self.store.node_info(node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeInfo> + '_ {
        self.store.nodes()
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeView> + '_ {
        self.store.edges()
    }

    /// Move a node by hand, zeroing its velocity.
    ///
    /// Keeps the simulator `Ready`; the spatial index is patched in place.
    pub fn set_node_position(&mut self, node: impl Into<NodeRef>, position: &[f64]) -> Result<()> {
        let node = node.into();
        let previous = self
            .store
            .resolve(&node)
            .ok()
            .and_then(|id| self.store.position(id).map(<[f64]>::to_vec));

        let id = self.store.set_node_position(node, position)?;

        if self.state == SimulationState::Ready && !self.spatial_dirty {
            if let Some(previous) = previous {
                self.spatial.remove(id, &previous);
            }
            self.spatial.insert(id, position);
        }
        Ok(())
    }

    pub fn pin_node(&mut self, node: impl Into<NodeRef>) -> Result<()> {
        self.store.pin_node(node)
    }

    pub fn unpin_node(&mut self, node: impl Into<NodeRef>) -> Result<()> {
        self.store.unpin_node(node)
    }

    fn invalidate(&mut self) {
        self.state = SimulationState::Unplaced;
        self.spatial.clear();
        self.spatial_dirty = false;
    }

    // =========================================================================
    // Simulation
    // =========================================================================

    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// Simulated seconds since the last placement reset.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Accepted steps since the last placement reset.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn dimensions(&self) -> usize {
        self.store.dimensions()
    }

    /// Change the dimensionality, zeroing every position and velocity.
    pub fn set_dimensions(&mut self, dimensions: usize) -> Result<()> {
        self.store.set_dimensions(dimensions)?;
        self.config.dimensions = dimensions;
        self.invalidate();
        debug!(dimensions, "dimensionality changed");
        Ok(())
    }

    /// Scatter every node uniformly in a cube sized to the node count and
    /// dimensionality, zero velocities and rebuild the spatial index.
    pub fn reset_node_placement(&mut self) {
        let dimensions = self.store.dimensions();
        let count = self.store.node_count();

        let per_axis = (count as f64).powf(1.0 / dimensions as f64).ceil().max(1.0);
        let half_extent =
            self.config.spring_length * per_axis * self.config.placement_scale / 2.0;

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let (positions, velocities) = self.store.buffers_mut();
        for x in positions.iter_mut() {
            *x = if half_extent > 0.0 {
                rng.gen_range(-half_extent..=half_extent)
            } else {
                0.0
            };
        }
        velocities.fill(0.0);

        self.spatial.rebuild(dimensions, self.store.positions());
        self.spatial_dirty = false;
        self.state = SimulationState::Ready;
        self.time = 0.0;
        self.steps = 0;

        debug!(
            nodes = count,
            dimensions,
            half_extent,
            seeded = self.config.seed.is_some(),
            "node placement reset"
        );
    }

    /// Advance the simulation by `dt` seconds.
    pub fn update(&mut self, dt: f64) -> Result<()> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SimError::InvalidTimeStep(dt));
        }
        self.ensure_ready()?;

        let dimensions = self.store.dimensions();
        let count = self.store.node_count();
        if count == 0 {
            self.time += dt;
            self.steps += 1;
            return Ok(());
        }

        let mut forces = vec![0.0; count * dimensions];
        let adjacency = self.store.adjacency();
        let strengths: Vec<f64> = self.store.node_weights().map(|n| n.strength).collect();
        let masses: Vec<f64> = self.store.node_weights().map(|n| n.mass).collect();
        let pinned: Vec<bool> = self.store.node_weights().map(|n| n.pinned).collect();

        let ctx = ForceContext {
            dimensions,
            positions: self.store.positions(),
            strengths: &strengths,
            adjacency: &adjacency,
        };
        compute_forces(self.model.as_ref(), &ctx, &mut forces);

        let mut positions = self.store.positions().to_vec();
        let mut velocities = self.store.velocities().to_vec();

        for index in 0..count {
            let range = index * dimensions..(index + 1) * dimensions;
            let (p, v, f) = (
                &mut positions[range.clone()],
                &mut velocities[range.clone()],
                &mut forces[range],
            );

            if pinned[index] {
                v.fill(0.0);
                continue;
            }

            if let Some(gravity) = self.config.gravity {
                math::add_scaled(f, p, -1.0 / gravity);
            }

            let acceleration = dt / masses[index];
            for (v, f) in v.iter_mut().zip(f.iter()) {
                *v = (*v + f * acceleration) * self.config.damping;
            }

            let speed = math::norm(v);
            if speed > self.config.max_speed {
                let clamp = self.config.max_speed / speed;
                v.iter_mut().for_each(|x| *x *= clamp);
            }

            math::add_scaled(p, v, dt);
        }

        if self.config.centering && !pinned.iter().any(|p| *p) {
            let mut centroid = vec![0.0; dimensions];
            for p in positions.chunks_exact(dimensions) {
                math::add_assign(&mut centroid, p);
            }
            centroid.iter_mut().for_each(|c| *c /= count as f64);
            for p in positions.chunks_exact_mut(dimensions) {
                math::add_scaled(p, &centroid, -1.0);
            }
        }

        if let Some(index) = (0..count).find(|&index| {
            let range = index * dimensions..(index + 1) * dimensions;
            !(math::is_finite(&positions[range.clone()]) && math::is_finite(&velocities[range]))
        }) {
            let name = self
                .store
                .node(NodeId(index as u32))
                .map(|node| node.name.clone())
                .unwrap_or_default();
            warn!(node = %name, step = self.steps, "non-finite position, step discarded");
            return Err(SimError::NumericInstability(name));
        }

        let (stored_positions, stored_velocities) = self.store.buffers_mut();
        stored_positions.copy_from_slice(&positions);
        stored_velocities.copy_from_slice(&velocities);

        self.spatial_dirty = true;
        self.time += dt;
        self.steps += 1;
        trace!(step = self.steps, time = self.time, "step applied");
        Ok(())
    }

    /// Every node within `radius` (inclusive) of `point`, sorted by id.
    pub fn find(&mut self, point: &[f64], radius: f64) -> Result<Vec<NodeId>> {
        self.prepare_query(point)?;
        Ok(self.spatial.in_radius(point, radius))
    }

    /// The node closest to `point`.
    pub fn nearest(&mut self, point: &[f64]) -> Result<Option<NodeId>> {
        self.prepare_query(point)?;
        Ok(self.spatial.nearest(point))
    }

    fn prepare_query(&mut self, point: &[f64]) -> Result<()> {
        let expected = self.store.dimensions();
        if point.len() != expected {
            return Err(SimError::DimensionMismatch {
                expected,
                got: point.len(),
            });
        }
        self.ensure_ready()?;

        if self.spatial_dirty {
            self.spatial.rebuild(expected, self.store.positions());
            self.spatial_dirty = false;
        }
        Ok(())
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            SimulationState::Ready => Ok(()),
            SimulationState::Unplaced => Err(SimError::UninitializedState),
        }
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded() -> Simulator {
        Simulator::with_config(SimulationConfig {
            seed: Some(7),
            ..Default::default()
        })
        .unwrap()
    }

    fn chain() -> Simulator {
        let mut sim = seeded();
        sim.add_node("A", json!(1)).unwrap();
        sim.add_node("B", json!(1)).unwrap();
        sim.add_node("C", json!(1)).unwrap();
        sim.add_edge("A", "B", json!(1)).unwrap();
        sim.add_edge("B", "C", json!(1)).unwrap();
        sim
    }

    #[test]
    fn test_state_machine() {
        let mut sim = chain();
        assert_eq!(sim.state(), SimulationState::Unplaced);
        assert_eq!(sim.update(0.1), Err(SimError::UninitializedState));
        assert_eq!(sim.find(&[0.0, 0.0], 1.0), Err(SimError::UninitializedState));

        sim.reset_node_placement();
        assert_eq!(sim.state(), SimulationState::Ready);
        sim.update(0.1).unwrap();

        sim.add_node("D", json!(1)).unwrap();
        assert_eq!(sim.state(), SimulationState::Unplaced);

        sim.reset_node_placement();
        sim.set_dimensions(3).unwrap();
        assert_eq!(sim.state(), SimulationState::Unplaced);
        assert_eq!(sim.node_info("D").unwrap().location, vec![0.0; 3]);
    }

    #[test]
    fn test_invalid_time_step() {
        let mut sim = chain();
        sim.reset_node_placement();

        for dt in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(sim.update(dt), Err(SimError::InvalidTimeStep(_))));
        }
        assert_eq!(sim.steps(), 0);
    }

    #[test]
    fn test_placement_fills_every_axis() {
        let mut sim = chain();
        sim.set_dimensions(4).unwrap();
        sim.reset_node_placement();

        // 3 nodes in 4D: ceil(3^(1/4)) = 2 per axis, half extent 45
        for node in sim.nodes() {
            assert_eq!(node.location.len(), 4);
            assert!(node.location.iter().all(|x| x.abs() <= 45.0));
        }
    }

    #[test]
    fn test_seeded_reset_is_repeatable() {
        let mut sim = chain();
        sim.reset_node_placement();
        let first = sim.graph().positions().to_vec();

        sim.update(0.035).unwrap();
        sim.reset_node_placement();
        assert_eq!(sim.graph().positions(), &first[..]);
        assert_eq!(sim.time(), 0.0);
    }

    #[test]
    fn test_pinned_node_stays_put() {
        let mut sim = chain();
        sim.reset_node_placement();
        sim.pin_node("B").unwrap();
        let before = sim.node_info("B").unwrap().location;

        for _ in 0..10 {
            sim.update(0.035).unwrap();
        }
        assert_eq!(sim.node_info("B").unwrap().location, before);
        assert_ne!(sim.node_info("A").unwrap().location, vec![0.0, 0.0]);
    }

    #[test]
    fn test_speed_is_clamped() {
        let mut sim = Simulator::with_config(SimulationConfig {
            seed: Some(1),
            max_speed: 2.0,
            ..Default::default()
        })
        .unwrap();
        sim.add_node("A", json!(1)).unwrap();
        sim.add_node("B", json!(1)).unwrap();
        sim.reset_node_placement();
        sim.set_node_position("A", &[0.0, 0.0]).unwrap();
        sim.set_node_position("B", &[1.0, 0.0]).unwrap();

        sim.update(1.0).unwrap();
        for v in sim.graph().velocities().chunks(2) {
            assert!(math::norm(v) <= 2.0 + 1e-12);
        }
    }

    #[test]
    fn test_gravity_pulls_lone_node_home() {
        let mut sim = Simulator::with_config(SimulationConfig {
            seed: Some(1),
            gravity: Some(10.0),
            ..Default::default()
        })
        .unwrap();
        sim.add_node("A", json!(1)).unwrap();
        sim.reset_node_placement();
        sim.set_node_position("A", &[100.0, -50.0]).unwrap();

        sim.update(0.1).unwrap();
        let location = sim.node_info("A").unwrap().location;
        assert!(location[0] < 100.0);
        assert!(location[1] > -50.0);
    }

    #[test]
    fn test_centering_keeps_centroid_at_origin() {
        let mut sim = Simulator::with_config(SimulationConfig {
            seed: Some(3),
            centering: true,
            ..Default::default()
        })
        .unwrap();
        for name in ["A", "B", "C", "D"] {
            sim.add_node(name, json!(1)).unwrap();
        }
        sim.add_edge("A", "B", json!(1)).unwrap();
        sim.reset_node_placement();

        for _ in 0..5 {
            sim.update(0.035).unwrap();
        }

        let mut centroid = [0.0, 0.0];
        for p in sim.graph().positions().chunks(2) {
            centroid[0] += p[0] / 4.0;
            centroid[1] += p[1] / 4.0;
        }
        assert!(centroid.iter().all(|c| c.abs() < 1e-9));
    }

    #[test]
    fn test_instability_discards_step() {
        let mut sim = seeded();
        sim.add_node("A", json!(1)).unwrap();
        sim.add_node("B", json!(1)).unwrap();
        sim.reset_node_placement();
        sim.set_node_position("A", &[-1e308, 0.0]).unwrap();
        sim.set_node_position("B", &[1e308, 0.0]).unwrap();
        let before = sim.graph().positions().to_vec();

        let err = sim.update(0.035).unwrap_err();
        assert!(matches!(err, SimError::NumericInstability(_)));
        assert_eq!(sim.graph().positions(), &before[..]);
        assert_eq!(sim.steps(), 0);
    }

    #[test]
    fn test_find_sees_moved_nodes() {
        let mut sim = chain();
        sim.reset_node_placement();
        sim.set_node_position("C", &[500.0, 500.0]).unwrap();

        assert_eq!(sim.find(&[500.0, 500.0], 0.0).unwrap(), vec![NodeId(2)]);
        assert_eq!(sim.nearest(&[499.0, 499.0]).unwrap(), Some(NodeId(2)));

        sim.update(0.035).unwrap();
        let c = sim.node_info("C").unwrap().location;
        assert!(sim.find(&c, 1e-9).unwrap().contains(&NodeId(2)));
    }

    #[test]
    fn test_find_dimension_mismatch() {
        let mut sim = chain();
        sim.reset_node_placement();

        assert_eq!(
            sim.find(&[0.0, 0.0, 0.0], 1.0),
            Err(SimError::DimensionMismatch { expected: 2, got: 3 })
        );
    }

    #[test]
    fn test_set_graph_failure_keeps_previous_graph() {
        let mut sim = chain();
        sim.reset_node_placement();

        let bad = GraphDescription {
            nodes: vec![crate::graph::NodeDescription::new("X")],
            edges: vec![crate::graph::EdgeDescription::new("X", "missing")],
        };
        assert!(matches!(sim.set_graph(&bad), Err(SimError::MalformedGraph(_))));
        assert_eq!(sim.node_count(), 3);
        assert_eq!(sim.edge_count(), 2);
        assert_eq!(sim.state(), SimulationState::Ready);
    }

    #[test]
    fn test_set_config_rebuilds_model() {
        let mut sim = chain();
        sim.set_config(SimulationConfig {
            dimensions: 3,
            force_model: crate::layout::ForceModelKind::FruchtermanReingold,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(sim.dimensions(), 3);
        assert_eq!(sim.force_model().name(), "Fruchterman-Reingold (1991)");

        let err = sim.set_config(SimulationConfig {
            damping: 2.0,
            ..Default::default()
        });
        assert!(matches!(err, Err(SimError::InvalidConfig(_))));
        assert_eq!(sim.dimensions(), 3);
    }
}
