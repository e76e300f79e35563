//! Force models.
//!
//! A force model turns a frozen snapshot of node positions into one force
//! vector per node. Each node's force is gathered on its own: other nodes in
//! index order first, then its incident springs in edge insertion order. The
//! result therefore does not depend on how nodes are scheduled, which lets
//! [`compute_forces`] spread the work over threads without changing a bit of
//! the output.
//!
//! Two laws are built in:
//!
//! - **Spring-electrical**: repulsion `k_r * s_i * s_j / d^p`, springs
//!   `k_s * w * (d - L / w)`.
//! - **Fruchterman-Reingold**: repulsion `s_i * s_j * k^2 / d`, attraction
//!   `w * d^2 / k`.
//! - **ForceAtlas2**: repulsion `k * s_i * s_j * (deg_i + 1) * (deg_j + 1) / d`,
//!   attraction `w * d`. Hubs push harder, so they spread out.
//!
//! The [`ForceModel`] trait is the seam for anything else, including
//! approximate repulsion schemes.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::graph::Adjacency;
use crate::math;

use super::config::{ForceModelKind, SimulationConfig};

/// Everything a force model may read during one step.
pub struct ForceContext<'a> {
    /// Coordinates per node.
    pub dimensions: usize,
    /// Positions at the start of the step, `dimensions` values per node.
    pub positions: &'a [f64],
    /// Numeric node weights.
    pub strengths: &'a [f64],
    /// Incident springs per node.
    pub adjacency: &'a Adjacency,
}

impl ForceContext<'_> {
    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.strengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strengths.is_empty()
    }

    /// Position of node `index`.
    #[inline]
    pub fn position(&self, index: usize) -> &[f64] {
        let start = index * self.dimensions;
        &self.positions[start..start + self.dimensions]
    }

    /// Writes the unit vector pointing from `other` to `index` into `unit`
    /// and returns their distance, floored at `min_distance`.
    ///
    /// Coincident nodes are split along axis `min(index, other) mod D`, in
    /// opposite directions for the two nodes of the pair.
    pub fn separation(
        &self,
        index: usize,
        other: usize,
        min_distance: f64,
        unit: &mut [f64],
    ) -> f64 {
        let (a, b) = (self.position(index), self.position(other));
        for (u, (x, y)) in unit.iter_mut().zip(a.iter().zip(b)) {
            *u = x - y;
        }

        let distance = math::norm(unit);
        if distance > 0.0 {
            for u in unit.iter_mut() {
                *u /= distance;
            }
        } else {
            unit.fill(0.0);
            let axis = index.min(other) % self.dimensions;
            unit[axis] = if index > other { 1.0 } else { -1.0 };
        }

        distance.max(min_distance)
    }
}

/// A force law.
pub trait ForceModel: Send + Sync {
    /// Human readable name.
    fn name(&self) -> &'static str;

    /// Add the net force on node `index` to `out` (length `D`, zeroed by the
    /// caller).
    fn node_force(&self, ctx: &ForceContext<'_>, index: usize, out: &mut [f64]);
}

/// Build the model a configuration asks for.
pub fn model_from_config(config: &SimulationConfig) -> Box<dyn ForceModel> {
    match config.force_model {
        ForceModelKind::SpringElectrical => Box::new(SpringElectrical::from_config(config)),
        ForceModelKind::FruchtermanReingold => Box::new(FruchtermanReingold::from_config(config)),
        ForceModelKind::ForceAtlas2 => Box::new(ForceAtlas2::from_config(config)),
    }
}

/// Evaluate `model` for every node into `forces` (`D` values per node).
pub fn compute_forces(model: &dyn ForceModel, ctx: &ForceContext<'_>, forces: &mut [f64]) {
    debug_assert_eq!(forces.len(), ctx.len() * ctx.dimensions);
    if ctx.dimensions == 0 {
        return;
    }

    #[cfg(feature = "parallel")]
    forces
        .par_chunks_mut(ctx.dimensions)
        .enumerate()
        .for_each(|(index, out)| {
            out.fill(0.0);
            model.node_force(ctx, index, out);
        });

    #[cfg(not(feature = "parallel"))]
    forces
        .chunks_mut(ctx.dimensions)
        .enumerate()
        .for_each(|(index, out)| {
            out.fill(0.0);
            model.node_force(ctx, index, out);
        });
}

/// Inverse-power repulsion between every pair plus linear springs on edges.
#[derive(Debug, Clone, PartialEq)]
pub struct SpringElectrical {
    pub repulsion: f64,
    pub exponent: f64,
    pub stiffness: f64,
    pub spring_length: f64,
    pub min_distance: f64,
}

impl SpringElectrical {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            repulsion: config.repulsion,
            exponent: config.repulsion_exponent,
            stiffness: config.spring_stiffness,
            spring_length: config.spring_length,
            min_distance: config.min_distance,
        }
    }

    #[inline]
    fn falloff(&self, distance: f64) -> f64 {
        if self.exponent == 2.0 {
            distance * distance
        } else {
            distance.powf(self.exponent)
        }
    }
}

impl Default for SpringElectrical {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default())
    }
}

impl ForceModel for SpringElectrical {
    fn name(&self) -> &'static str {
        "Spring-Electrical"
    }

    fn node_force(&self, ctx: &ForceContext<'_>, index: usize, out: &mut [f64]) {
        let mut unit = vec![0.0; ctx.dimensions];
        let strength = ctx.strengths[index];

        for other in 0..ctx.len() {
            if other == index {
                continue;
            }

            let distance = ctx.separation(index, other, self.min_distance, &mut unit);
            let magnitude =
                self.repulsion * strength * ctx.strengths[other] / self.falloff(distance);
            math::add_scaled(out, &unit, magnitude);
        }

        for spring in ctx.adjacency.springs(index) {
            let distance = ctx.separation(index, spring.other, self.min_distance, &mut unit);
            let rest_length = self.spring_length / spring.strength;
            let magnitude = self.stiffness * spring.strength * (distance - rest_length);
            math::add_scaled(out, &unit, -magnitude);
        }
    }
}

/// Fruchterman-Reingold (1991) with weighted attraction.
#[derive(Debug, Clone, PartialEq)]
pub struct FruchtermanReingold {
    pub scale: f64,
    pub min_distance: f64,
}

impl FruchtermanReingold {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            scale: config.scale,
            min_distance: config.min_distance,
        }
    }
}

impl Default for FruchtermanReingold {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default())
    }
}

impl ForceModel for FruchtermanReingold {
    fn name(&self) -> &'static str {
        "Fruchterman-Reingold (1991)"
    }

    fn node_force(&self, ctx: &ForceContext<'_>, index: usize, out: &mut [f64]) {
        let mut unit = vec![0.0; ctx.dimensions];
        let strength = ctx.strengths[index];
        let scale_2 = self.scale * self.scale;

        for other in 0..ctx.len() {
            if other == index {
                continue;
            }

            let distance = ctx.separation(index, other, self.min_distance, &mut unit);
            math::add_scaled(out, &unit, strength * ctx.strengths[other] * scale_2 / distance);
        }

        for spring in ctx.adjacency.springs(index) {
            let distance = ctx.separation(index, spring.other, self.min_distance, &mut unit);
            math::add_scaled(out, &unit, -spring.strength * distance * distance / self.scale);
        }
    }
}

/// ForceAtlas2 (Jacomy et al., 2014) with linear attraction and
/// degree-scaled repulsion.
///
/// Degrees count incident springs, so self-loops are ignored and parallel
/// edges count once each. Two linked leaves settle at `2 * sqrt(scale)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceAtlas2 {
    pub scale: f64,
    pub min_distance: f64,
}

impl ForceAtlas2 {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            scale: config.scale,
            min_distance: config.min_distance,
        }
    }
}

impl Default for ForceAtlas2 {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default())
    }
}

impl ForceModel for ForceAtlas2 {
    fn name(&self) -> &'static str {
        "ForceAtlas2"
    }

    fn node_force(&self, ctx: &ForceContext<'_>, index: usize, out: &mut [f64]) {
        let mut unit = vec![0.0; ctx.dimensions];
        let mass = |node: usize| (ctx.adjacency.springs(node).len() + 1) as f64;
        let charge = self.scale * ctx.strengths[index] * mass(index);

        for other in 0..ctx.len() {
            if other == index {
                continue;
            }

            let distance = ctx.separation(index, other, self.min_distance, &mut unit);
            let magnitude = charge * ctx.strengths[other] * mass(other) / distance;
            math::add_scaled(out, &unit, magnitude);
        }

        for spring in ctx.adjacency.springs(index) {
            let distance = ctx.separation(index, spring.other, self.min_distance, &mut unit);
            math::add_scaled(out, &unit, -spring.strength * distance);
        }
    }
}
