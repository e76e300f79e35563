//! Simulation configuration.
//!
//! Every force-law constant is tunable here rather than baked into the
//! models. The struct deserializes from a partial object (missing keys take
//! their defaults), which is how the WASM API accepts configuration from
//! JavaScript.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::graph::DEFAULT_DIMENSIONS;

/// Which force law drives the simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ForceModelKind {
    /// Inverse-power repulsion with linear springs.
    #[default]
    SpringElectrical,
    /// Fruchterman-Reingold (1991).
    FruchtermanReingold,
    /// ForceAtlas2, degree-scaled repulsion with linear springs.
    #[serde(rename = "force-atlas-2")]
    ForceAtlas2,
}

/// Configuration for the force simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationConfig {
    /// Coordinates per node (default: 2).
    pub dimensions: usize,
    /// Placement seed; `None` draws fresh entropy on every reset (default: None).
    pub seed: Option<u64>,
    /// Force law (default: spring-electrical).
    pub force_model: ForceModelKind,
    /// Repulsion constant of the spring-electrical model (default: 20000.0).
    pub repulsion: f64,
    /// Distance exponent of the repulsion, 2 is inverse-square (default: 2.0).
    pub repulsion_exponent: f64,
    /// Spring constant (default: 1.0).
    pub spring_stiffness: f64,
    /// Rest length of a weight-1 spring (default: 45.0).
    pub spring_length: f64,
    /// Ideal edge length of the Fruchterman-Reingold model and repulsion
    /// constant of ForceAtlas2 (default: 45.0).
    pub scale: f64,
    /// Velocity multiplier applied each step, in `[0, 1)` (default: 0.975).
    pub damping: f64,
    /// Distances below this are treated as this (default: 1.0).
    pub min_distance: f64,
    /// Speed cap per node (default: 1000.0).
    pub max_speed: f64,
    /// Pull toward the origin, `-position / gravity` (default: None).
    pub gravity: Option<f64>,
    /// Recenter the layout on the origin after each step (default: false).
    pub centering: bool,
    /// Multiplier on the initial placement volume (default: 1.0).
    pub placement_scale: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
            seed: None,
            force_model: ForceModelKind::SpringElectrical,
            repulsion: 20_000.0,
            repulsion_exponent: 2.0,
            spring_stiffness: 1.0,
            spring_length: 45.0,
            scale: 45.0,
            damping: 0.975,
            min_distance: 1.0,
            max_speed: 1000.0,
            gravity: None,
            centering: false,
            placement_scale: 1.0,
        }
    }
}

impl SimulationConfig {
    /// Check every value is usable.
    pub fn validate(&self) -> Result<()> {
        if self.dimensions < 1 {
            return Err(SimError::InvalidDimension(self.dimensions));
        }

        let non_negative = [
            ("repulsion", self.repulsion),
            ("springStiffness", self.spring_stiffness),
            ("springLength", self.spring_length),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(name, value, "a finite number >= 0"));
            }
        }

        let mut positive = vec![
            ("repulsionExponent", self.repulsion_exponent),
            ("scale", self.scale),
            ("minDistance", self.min_distance),
            ("maxSpeed", self.max_speed),
            ("placementScale", self.placement_scale),
        ];
        if let Some(gravity) = self.gravity {
            positive.push(("gravity", gravity));
        }
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(name, value, "a finite number > 0"));
            }
        }

        if !(0.0..1.0).contains(&self.damping) {
            return Err(invalid("damping", self.damping, "in [0, 1)"));
        }

        Ok(())
    }
}

fn invalid(name: &str, value: f64, expected: &str) -> SimError {
    SimError::InvalidConfig(format!("{name} must be {expected}, got {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = SimulationConfig {
            damping: 1.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));

        let config = SimulationConfig {
            min_distance: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));

        let config = SimulationConfig {
            gravity: Some(f64::NAN),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));

        let config = SimulationConfig {
            dimensions: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(SimError::InvalidDimension(0)));
    }

    #[test]
    fn test_partial_object_deserializes() {
        let config: SimulationConfig = serde_json::from_str(
            r#"{ "dimensions": 3, "forceModel": "fruchterman-reingold", "seed": 7 }"#,
        )
        .unwrap();

        assert_eq!(config.dimensions, 3);
        assert_eq!(config.force_model, ForceModelKind::FruchtermanReingold);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.damping, 0.975);

        let config: SimulationConfig =
            serde_json::from_str(r#"{ "forceModel": "force-atlas-2" }"#).unwrap();
        assert_eq!(config.force_model, ForceModelKind::ForceAtlas2);
    }
}
