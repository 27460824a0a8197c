//! Abstract road-network capability and an in-memory reference graph.
//!
//! Loading a road network from disk belongs to an external collaborator;
//! the core only needs two things from a graph: outgoing neighbors with
//! nonnegative edge weights in metres, and node coordinates for snapping.

use std::collections::HashMap;

use crate::spatial::NodeCoord;

/// The shortest-path collaborator contract consumed by the distance
/// matrix builder.
pub trait RoadNetwork {
    /// Outgoing `(neighbor, edge_length_m)` pairs of a node. Unknown nodes
    /// yield an empty list.
    fn neighbors(&self, node: &str) -> Vec<(String, f64)>;

    /// Whether the node exists in the graph.
    fn contains(&self, node: &str) -> bool;

    /// Coordinates of every node that has them, in insertion order.
    /// Used to snap raw coordinates onto the graph.
    fn node_coords(&self) -> Vec<NodeCoord>;
}

/// Directed weighted graph held in memory.
///
/// # Examples
///
/// ```
/// use cartage::graph::{AdjacencyGraph, RoadNetwork};
///
/// let mut g = AdjacencyGraph::new();
/// g.add_node("a", 35.0, 139.0);
/// g.add_node("b", 35.01, 139.0);
/// g.add_edge("a", "b", 1100.0);
/// assert_eq!(g.neighbors("a"), vec![("b".to_string(), 1100.0)]);
/// assert!(g.neighbors("b").is_empty()); // directed
/// ```
#[derive(Debug, Clone, Default)]
pub struct AdjacencyGraph {
    adjacency: HashMap<String, Vec<(String, f64)>>,
    coords: Vec<NodeCoord>,
    known: HashMap<String, usize>,
}

impl AdjacencyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node with coordinates. Re-adding updates the coordinates.
    pub fn add_node(&mut self, id: impl Into<String>, lat: f64, lon: f64) {
        let id = id.into();
        match self.known.get(&id) {
            Some(&idx) => {
                self.coords[idx] = NodeCoord::new(id, lat, lon);
            }
            None => {
                self.known.insert(id.clone(), self.coords.len());
                self.adjacency.entry(id.clone()).or_default();
                self.coords.push(NodeCoord::new(id, lat, lon));
            }
        }
    }

    /// Adds a directed edge. Negative lengths are clamped to zero since
    /// the shortest-path pass assumes nonnegative weights. Endpoints not
    /// added via [`AdjacencyGraph::add_node`] are created without
    /// coordinates being registered for snapping.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>, length_m: f64) {
        let from = from.into();
        let to = to.into();
        self.adjacency.entry(to.clone()).or_default();
        self.adjacency
            .entry(from)
            .or_default()
            .push((to, length_m.max(0.0)));
    }

    /// Adds edges in both directions with the same length.
    pub fn add_edge_bidirectional(
        &mut self,
        a: impl Into<String>,
        b: impl Into<String>,
        length_m: f64,
    ) {
        let a = a.into();
        let b = b.into();
        self.add_edge(a.clone(), b.clone(), length_m);
        self.add_edge(b, a, length_m);
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }
}

impl RoadNetwork for AdjacencyGraph {
    fn neighbors(&self, node: &str) -> Vec<(String, f64)> {
        self.adjacency.get(node).cloned().unwrap_or_default()
    }

    fn contains(&self, node: &str) -> bool {
        self.adjacency.contains_key(node)
    }

    fn node_coords(&self) -> Vec<NodeCoord> {
        self.coords.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directed_edges() {
        let mut g = AdjacencyGraph::new();
        g.add_edge("a", "b", 100.0);
        assert_eq!(g.neighbors("a").len(), 1);
        assert!(g.neighbors("b").is_empty());
        assert!(g.contains("b"));
    }

    #[test]
    fn test_bidirectional() {
        let mut g = AdjacencyGraph::new();
        g.add_edge_bidirectional("a", "b", 100.0);
        assert_eq!(g.neighbors("a"), vec![("b".to_string(), 100.0)]);
        assert_eq!(g.neighbors("b"), vec![("a".to_string(), 100.0)]);
    }

    #[test]
    fn test_negative_length_clamped() {
        let mut g = AdjacencyGraph::new();
        g.add_edge("a", "b", -5.0);
        assert_eq!(g.neighbors("a"), vec![("b".to_string(), 0.0)]);
    }

    #[test]
    fn test_coords_in_insertion_order() {
        let mut g = AdjacencyGraph::new();
        g.add_node("a", 35.0, 139.0);
        g.add_node("b", 35.1, 139.1);
        let coords = g.node_coords();
        assert_eq!(coords[0].id, "a");
        assert_eq!(coords[1].id, "b");
    }

    #[test]
    fn test_re_add_node_updates_coords() {
        let mut g = AdjacencyGraph::new();
        g.add_node("a", 35.0, 139.0);
        g.add_node("a", 36.0, 140.0);
        let coords = g.node_coords();
        assert_eq!(coords.len(), 1);
        assert_eq!(coords[0].lat, 36.0);
    }
}
