//! R-tree based spatial index using the rstar crate.
//!
//! rstar points have a fixed arity, while node positions have `D`
//! coordinates. Each node is therefore keyed by its projection onto the first
//! three axes (zero-padded below three dimensions) and keeps its full
//! position alongside. Projection never increases a distance, so a query on
//! the projected keys returns a superset of the true answer, and the exact
//! `D`-dimensional check on that superset makes the result exact.
//!
//! Provides:
//! - Point-in-radius (inclusive, exact)
//! - Nearest neighbor

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::graph::NodeId;
use crate::math;

/// Axes the tree itself is built on.
const INDEXED_AXES: usize = 3;

type Key = [f64; INDEXED_AXES];

fn project(position: &[f64]) -> Key {
    let mut key = [0.0; INDEXED_AXES];
    for (k, x) in key.iter_mut().zip(position) {
        *k = *x;
    }
    key
}

/// A point in the spatial index with associated node ID.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePoint {
    /// The node identifier.
    pub id: NodeId,
    /// Projected coordinates the tree is built on.
    key: Key,
    /// Full position.
    pub position: Vec<f64>,
}

impl NodePoint {
    /// Create a new NodePoint.
    pub fn new(id: NodeId, position: &[f64]) -> Self {
        Self {
            id,
            key: project(position),
            position: position.to_vec(),
        }
    }
}

impl RTreeObject for NodePoint {
    type Envelope = AABB<Key>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.key)
    }
}

impl PointDistance for NodePoint {
    fn distance_2(&self, point: &Key) -> f64 {
        math::distance_squared(&self.key, point)
    }

    fn contains_point(&self, point: &Key) -> bool {
        self.key == *point
    }
}

/// Spatial index for graph nodes.
///
/// Uses an R*-tree for efficient spatial queries.
pub struct SpatialIndex {
    tree: RTree<NodePoint>,
}

impl SpatialIndex {
    /// Create a new empty spatial index.
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Insert a node into the index.
    pub fn insert(&mut self, id: NodeId, position: &[f64]) {
        self.tree.insert(NodePoint::new(id, position));
    }

    /// Remove a node from the index.
    ///
    /// `position` must be the position the node was indexed with. Returns
    /// true if the node was found and removed.
    pub fn remove(&mut self, id: NodeId, position: &[f64]) -> bool {
        let point = NodePoint::new(id, position);
        self.tree.remove(&point).is_some()
    }

    /// Find the node nearest to a point.
    pub fn nearest(&self, point: &[f64]) -> Option<NodeId> {
        let key = project(point);
        let mut best: Option<(f64, NodeId)> = None;

        // Candidates arrive by projected distance, a lower bound on the true one.
        for (candidate, projected_2) in self.tree.nearest_neighbor_iter_with_distance_2(&key) {
            if let Some((best_2, _)) = best {
                if projected_2 > best_2 {
                    break;
                }
            }

            let distance_2 = math::distance_squared(&candidate.position, point);
            match best {
                Some((best_2, best_id))
                    if best_2 < distance_2 || (best_2 == distance_2 && best_id < candidate.id) => {}
                _ => best = Some((distance_2, candidate.id)),
            }
        }

        best.map(|(_, id)| id)
    }

    /// Find all nodes within `radius` (inclusive) of a point.
    ///
    /// Results are sorted by node id. A negative or NaN radius matches
    /// nothing.
    pub fn in_radius(&self, point: &[f64], radius: f64) -> Vec<NodeId> {
        if radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }

        let key = project(point);
        let magnitude = key.iter().fold(radius, |acc, x| acc.max(x.abs()));
        let reach = radius + magnitude * 1e-9 + f64::MIN_POSITIVE;

        let envelope = AABB::from_corners(key.map(|x| x - reach), key.map(|x| x + reach));

        let mut found: Vec<NodeId> = self
            .tree
            .locate_in_envelope(&envelope)
            .filter(|candidate| math::distance(&candidate.position, point) <= radius)
            .map(|candidate| candidate.id)
            .collect();
        found.sort_unstable();
        found
    }

    /// Rebuild the index from a flat position buffer with `dimensions`
    /// coordinates per node; node `i` owns the `i`-th chunk.
    ///
    /// This is more efficient than incremental inserts for bulk updates.
    pub fn rebuild(&mut self, dimensions: usize, positions: &[f64]) {
        let node_points: Vec<_> = positions
            .chunks_exact(dimensions.max(1))
            .enumerate()
            .map(|(i, position)| NodePoint::new(NodeId(i as u32), position))
            .collect();

        self.tree = RTree::bulk_load(node_points);
    }

    /// Clear all nodes from the index.
    pub fn clear(&mut self) {
        self.tree = RTree::new();
    }

    /// Get the number of nodes in the index.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}
