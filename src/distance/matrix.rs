//! Dense travel-distance matrix indexed by point id.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Sentinel distance for unreachable pairs. Any stored value at or above
/// this is treated as "no path".
pub const UNREACHABLE_COST: f64 = 1e9;

/// A point resolved onto a graph node.
///
/// The connector distance (raw coordinate → snapped node) is kept as a
/// side channel, never folded into the matrix cells, so it is added once
/// per route leg endpoint instead of being double-counted through
/// intermediate cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnappedPoint {
    /// Point id used to index the matrix.
    pub point_id: String,
    /// Graph node the point resolved to.
    pub node_id: String,
    /// Distance from the raw coordinate to the node, in metres.
    pub connector_distance_m: f64,
    /// Original raw coordinate, when the point was snapped from one.
    pub original_latlon: Option<(f64, f64)>,
}

impl SnappedPoint {
    /// A point already associated with a graph node (zero connector).
    pub fn at_node(point_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            point_id: point_id.into(),
            node_id: node_id.into(),
            connector_distance_m: 0.0,
            original_latlon: None,
        }
    }
}

/// Square matrix of shortest-path distances between named points, plus
/// per-point connector offsets.
///
/// The matrix is a snapshot: it must be rebuilt whenever the point set
/// changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceMatrix {
    /// Row-major base distances (node to node, no connectors).
    matrix: Vec<f64>,
    size: usize,
    ids: Vec<String>,
    index_map: HashMap<String, usize>,
    node_lookup: HashMap<String, String>,
    connector_offsets: HashMap<String, f64>,
}

impl DistanceMatrix {
    pub(crate) fn from_parts(
        matrix: Vec<f64>,
        ids: Vec<String>,
        node_lookup: HashMap<String, String>,
        connector_offsets: HashMap<String, f64>,
    ) -> Self {
        let size = ids.len();
        debug_assert_eq!(matrix.len(), size * size);
        let index_map = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        Self {
            matrix,
            size,
            ids,
            index_map,
            node_lookup,
            connector_offsets,
        }
    }

    /// Travel distance in metres from one point to another, connector
    /// offsets of both endpoints included. Self-distance is always zero.
    /// Unreachable pairs report the raw sentinel without offsets.
    ///
    /// # Panics
    ///
    /// Panics if either id is not in the matrix — an unknown id here is a
    /// caller bug, not a domain outcome.
    pub fn distance(&self, from: &str, to: &str) -> f64 {
        let i = self.index_of(from);
        let j = self.index_of(to);
        if i == j {
            return 0.0;
        }
        let base = self.matrix[i * self.size + j];
        if base >= UNREACHABLE_COST {
            return base;
        }
        base + self.connector_offset(from) + self.connector_offset(to)
    }

    /// True iff the pair is below the unreachable sentinel.
    pub fn is_reachable(&self, from: &str, to: &str) -> bool {
        self.distance(from, to) < UNREACHABLE_COST
    }

    /// Base matrix cell without connector offsets.
    ///
    /// # Panics
    ///
    /// Panics if either id is unknown.
    pub fn base_distance(&self, from: &str, to: &str) -> f64 {
        let i = self.index_of(from);
        let j = self.index_of(to);
        self.matrix[i * self.size + j]
    }

    /// Connector offset of a point (zero when none was recorded).
    pub fn connector_offset(&self, point_id: &str) -> f64 {
        self.connector_offsets.get(point_id).copied().unwrap_or(0.0)
    }

    /// Graph node a point resolved to.
    pub fn node_of(&self, point_id: &str) -> Option<&str> {
        self.node_lookup.get(point_id).map(String::as_str)
    }

    /// Point ids in matrix order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Whether a point id is present.
    pub fn contains(&self, point_id: &str) -> bool {
        self.index_map.contains_key(point_id)
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.size
    }

    /// True when the matrix holds no points.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Total distance along a visiting order, or the sentinel as soon as
    /// any leg is unreachable.
    pub fn route_distance(&self, order: &[String]) -> f64 {
        let mut total = 0.0;
        for pair in order.windows(2) {
            let step = self.distance(&pair[0], &pair[1]);
            if step >= UNREACHABLE_COST {
                return UNREACHABLE_COST;
            }
            total += step;
        }
        total
    }

    fn index_of(&self, point_id: &str) -> usize {
        match self.index_map.get(point_id) {
            Some(&i) => i,
            None => panic!("unknown point id: {point_id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 3-point matrix: a→b 100, b→c 150, c→a 200, other directions unreachable.
    fn asymmetric() -> DistanceMatrix {
        let u = UNREACHABLE_COST;
        #[rustfmt::skip]
        let cells = vec![
            0.0, 100.0, u,
            u,   0.0,   150.0,
            200.0, u,   0.0,
        ];
        DistanceMatrix::from_parts(
            cells,
            vec!["a".into(), "b".into(), "c".into()],
            HashMap::new(),
            HashMap::new(),
        )
    }

    #[test]
    fn test_zero_self_distance() {
        let m = asymmetric();
        for id in ["a", "b", "c"] {
            assert_eq!(m.distance(id, id), 0.0);
        }
    }

    #[test]
    fn test_asymmetry_stored_independently() {
        let m = asymmetric();
        assert_eq!(m.distance("a", "b"), 100.0);
        assert!(!m.is_reachable("b", "a"));
        assert_eq!(m.distance("c", "a"), 200.0);
        assert!(!m.is_reachable("a", "c"));
    }

    #[test]
    fn test_connector_offsets_added_per_endpoint() {
        let u = UNREACHABLE_COST;
        #[rustfmt::skip]
        let cells = vec![
            0.0, 100.0,
            u,   0.0,
        ];
        let offsets = HashMap::from([("a".to_string(), 10.0), ("b".to_string(), 5.0)]);
        let m = DistanceMatrix::from_parts(
            cells,
            vec!["a".into(), "b".into()],
            HashMap::new(),
            offsets,
        );
        assert_eq!(m.distance("a", "b"), 115.0);
        assert_eq!(m.base_distance("a", "b"), 100.0);
        // Self-distance stays zero despite offsets.
        assert_eq!(m.distance("a", "a"), 0.0);
        // Unreachable stays at the raw sentinel.
        assert_eq!(m.distance("b", "a"), u);
    }

    #[test]
    fn test_route_distance() {
        let m = asymmetric();
        let order = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(m.route_distance(&order), 250.0);
        let broken = vec!["b".to_string(), "a".to_string()];
        assert_eq!(m.route_distance(&broken), UNREACHABLE_COST);
    }

    #[test]
    #[should_panic(expected = "unknown point id")]
    fn test_unknown_id_panics() {
        asymmetric().distance("a", "zz");
    }
}
