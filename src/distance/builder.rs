//! Distance matrix construction: snapping and per-source Dijkstra.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::fmt::{self, Display};

use tracing::debug;

use crate::graph::RoadNetwork;
use crate::spatial::SpatialIndex;

use super::matrix::{DistanceMatrix, SnappedPoint, UNREACHABLE_COST};

/// Distance matrix construction failure. These indicate caller or data
/// bugs (a node missing from the graph, an empty point set) rather than
/// domain outcomes, so they surface as errors.
#[derive(Debug, Clone, PartialEq)]
pub enum DistanceMatrixError {
    /// No points were supplied.
    NoPoints,
    /// A point references a node the graph does not contain.
    NodeNotInGraph { point_id: String, node_id: String },
    /// Snapping was requested but the graph exposes no node coordinates.
    NoNodeCoordinates,
}

impl Display for DistanceMatrixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMatrixError::NoPoints => {
                write!(f, "at least one point is required to build a distance matrix")
            }
            DistanceMatrixError::NodeNotInGraph { point_id, node_id } => {
                write!(f, "point '{point_id}' references node '{node_id}' absent from the graph")
            }
            DistanceMatrixError::NoNodeCoordinates => {
                write!(f, "graph nodes carry no coordinates; cannot snap raw points")
            }
        }
    }
}

impl std::error::Error for DistanceMatrixError {}

/// A point handed to the builder: either pre-associated with a graph node
/// or a raw coordinate that needs snapping.
#[derive(Debug, Clone, PartialEq)]
pub enum PointSpec {
    /// Already tied to a graph node.
    Node {
        /// Point id.
        id: String,
        /// Graph node id.
        node_id: String,
    },
    /// Raw coordinate to be snapped to the nearest graph node.
    Coord {
        /// Point id.
        id: String,
        /// Latitude in degrees.
        lat: f64,
        /// Longitude in degrees.
        lon: f64,
    },
}

impl PointSpec {
    /// A point that is itself a graph node.
    pub fn node(id: impl Into<String>) -> Self {
        let id = id.into();
        PointSpec::Node {
            node_id: id.clone(),
            id,
        }
    }

    /// A point tied to a specific graph node.
    pub fn at_node(id: impl Into<String>, node_id: impl Into<String>) -> Self {
        PointSpec::Node {
            id: id.into(),
            node_id: node_id.into(),
        }
    }

    /// A raw coordinate.
    pub fn coord(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        PointSpec::Coord {
            id: id.into(),
            lat,
            lon,
        }
    }

    /// Point id.
    pub fn id(&self) -> &str {
        match self {
            PointSpec::Node { id, .. } | PointSpec::Coord { id, .. } => id,
        }
    }
}

/// Resolves a point onto the graph.
///
/// Points already carrying a node reference pass through with a zero
/// connector. Raw coordinates are matched against the graph's node
/// coordinates via a [`SpatialIndex`]; the great-circle distance to the
/// chosen node is recorded as the connector offset.
pub fn snap_to_graph<G: RoadNetwork>(
    graph: &G,
    point: &PointSpec,
) -> Result<SnappedPoint, DistanceMatrixError> {
    match point {
        PointSpec::Node { id, node_id } => snap_node(graph, id, node_id),
        PointSpec::Coord { id, lat, lon } => {
            let index = SpatialIndex::new(graph.node_coords())
                .ok_or(DistanceMatrixError::NoNodeCoordinates)?;
            Ok(snap_coord(&index, id, *lat, *lon))
        }
    }
}

fn snap_node<G: RoadNetwork>(
    graph: &G,
    id: &str,
    node_id: &str,
) -> Result<SnappedPoint, DistanceMatrixError> {
    if !graph.contains(node_id) {
        return Err(DistanceMatrixError::NodeNotInGraph {
            point_id: id.to_string(),
            node_id: node_id.to_string(),
        });
    }
    Ok(SnappedPoint::at_node(id, node_id))
}

fn snap_coord(index: &SpatialIndex, id: &str, lat: f64, lon: f64) -> SnappedPoint {
    let hit = index.nearest(lat, lon);
    debug!(
        point = %id,
        node = %hit.node_id,
        connector_m = hit.distance_m,
        "snapped point to graph"
    );
    SnappedPoint {
        point_id: id.to_string(),
        node_id: hit.node_id,
        connector_distance_m: hit.distance_m,
        original_latlon: Some((lat, lon)),
    }
}

/// Builds a dense distance matrix for the supplied points.
///
/// Raw-coordinate points are snapped against one shared [`SpatialIndex`]
/// built from the graph's node coordinates. Then one single-source
/// Dijkstra pass runs per point over the graph's nonnegative edge weights
/// and harvests the distances to every other point's node. Unreachable
/// targets keep the [`UNREACHABLE_COST`] sentinel. O(P · E log V) for P
/// points.
pub fn build_distance_matrix<G: RoadNetwork>(
    graph: &G,
    points: &[PointSpec],
) -> Result<DistanceMatrix, DistanceMatrixError> {
    if points.is_empty() {
        return Err(DistanceMatrixError::NoPoints);
    }

    let index = if points.iter().any(|p| matches!(p, PointSpec::Coord { .. })) {
        Some(SpatialIndex::new(graph.node_coords()).ok_or(DistanceMatrixError::NoNodeCoordinates)?)
    } else {
        None
    };

    let mut snapped: Vec<SnappedPoint> = Vec::with_capacity(points.len());
    for point in points {
        let sp = match (point, &index) {
            (PointSpec::Node { id, node_id }, _) => snap_node(graph, id, node_id)?,
            (PointSpec::Coord { id, lat, lon }, Some(idx)) => snap_coord(idx, id, *lat, *lon),
            // The index exists whenever a Coord point is present.
            (PointSpec::Coord { .. }, None) => {
                return Err(DistanceMatrixError::NoNodeCoordinates)
            }
        };
        snapped.push(sp);
    }

    let n = snapped.len();
    let mut cells = vec![UNREACHABLE_COST; n * n];
    let mut node_lookup = HashMap::with_capacity(n);
    let mut connector_offsets = HashMap::with_capacity(n);
    let ids: Vec<String> = snapped.iter().map(|sp| sp.point_id.clone()).collect();

    for (idx, sp) in snapped.iter().enumerate() {
        node_lookup.insert(sp.point_id.clone(), sp.node_id.clone());
        connector_offsets.insert(sp.point_id.clone(), sp.connector_distance_m);
        cells[idx * n + idx] = 0.0;
    }

    for (idx, source) in snapped.iter().enumerate() {
        let lengths = dijkstra(graph, &source.node_id);
        for (jdx, target) in snapped.iter().enumerate() {
            if target.node_id == source.node_id {
                cells[idx * n + jdx] = 0.0;
                continue;
            }
            if let Some(&d) = lengths.get(&target.node_id) {
                cells[idx * n + jdx] = d;
            }
        }
    }

    debug!(points = n, "built distance matrix");
    Ok(DistanceMatrix::from_parts(
        cells,
        ids,
        node_lookup,
        connector_offsets,
    ))
}

/// Binary-heap entry ordered by smallest distance first.
struct HeapEntry {
    distance: f64,
    node: String,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap behavior on BinaryHeap.
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
    }
}

/// Single-source shortest-path distances over nonnegative edge weights.
fn dijkstra<G: RoadNetwork>(graph: &G, source: &str) -> HashMap<String, f64> {
    let mut dist: HashMap<String, f64> = HashMap::new();
    let mut heap = BinaryHeap::new();
    dist.insert(source.to_string(), 0.0);
    heap.push(HeapEntry {
        distance: 0.0,
        node: source.to_string(),
    });

    while let Some(HeapEntry { distance, node }) = heap.pop() {
        if distance > dist.get(&node).copied().unwrap_or(f64::INFINITY) {
            continue;
        }
        for (next, weight) in graph.neighbors(&node) {
            let candidate = distance + weight;
            if candidate < dist.get(&next).copied().unwrap_or(f64::INFINITY) {
                dist.insert(next.clone(), candidate);
                heap.push(HeapEntry {
                    distance: candidate,
                    node: next,
                });
            }
        }
    }

    dist
}
