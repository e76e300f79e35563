//! Spatial indexing for radius queries over node positions.
//!
//! This module provides an R-tree based spatial index for exact
//! point-in-radius and nearest-neighbor queries in any dimensionality.

mod rtree;

pub use rtree::{NodePoint, SpatialIndex};
