//! Force-directed layout.
//!
//! The simulator owns a graph store and drives it with a force model:
//!
//! 1. `reset_node_placement` scatters nodes in a cube sized to the graph
//! 2. `update(dt)` evaluates forces on a frozen snapshot and integrates with
//!    semi-implicit Euler plus multiplicative damping
//! 3. `find` answers radius queries through the spatial index

pub mod config;
pub mod force;
pub mod simulation;

pub use config::{ForceModelKind, SimulationConfig};
pub use force::{
    ForceAtlas2, ForceContext, ForceModel, FruchtermanReingold, SpringElectrical,
    compute_forces, model_from_config,
};
pub use simulation::{SimulationState, Simulator};
