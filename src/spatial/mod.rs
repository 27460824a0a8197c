//! Grid-bucket spatial index for nearest-node lookup.
//!
//! Maps a free coordinate to the nearest known node id using an
//! expanding-ring search over angular grid cells, with a precomputed
//! batch-scan fallback. Distances are great-circle (haversine) over a
//! spherical Earth.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Spherical Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Conservative metres per degree of latitude, used for ring lower bounds.
const METERS_PER_DEGREE: f64 = 111_000.0;

/// A node coordinate fed into the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeCoord {
    /// Node id.
    pub id: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl NodeCoord {
    /// Creates a node coordinate.
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            lat,
            lon,
        }
    }
}

/// Result of a nearest-node query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestResult {
    /// Id of the nearest node.
    pub node_id: String,
    /// Great-circle distance to it in metres.
    pub distance_m: f64,
    /// Insertion index of the node.
    pub index: usize,
}

/// Great-circle distance between two coordinates in metres.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();
    let a = sin_dlat * sin_dlat + lat1_rad.cos() * lat2_rad.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    EARTH_RADIUS_M * c
}

/// Grid-bucket index over a fixed set of node coordinates.
///
/// Construction buckets each node into an angular grid cell (default
/// 0.005°). [`SpatialIndex::nearest`] expands square rings outward from
/// the query cell, comparing bucket contents by haversine distance, and
/// keeps expanding until the next ring cannot possibly beat the best
/// candidate — so the returned node is the true nearest, ties broken by
/// insertion order. An empty ring sweep falls back to a full linear scan.
///
/// # Examples
///
/// ```
/// use cartage::spatial::{NodeCoord, SpatialIndex};
///
/// let index = SpatialIndex::new(vec![
///     NodeCoord::new("a", 35.0000, 139.0000),
///     NodeCoord::new("b", 35.0100, 139.0100),
/// ]).expect("non-empty");
/// let hit = index.nearest(35.0001, 139.0001);
/// assert_eq!(hit.node_id, "a");
/// ```
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    nodes: Vec<NodeCoord>,
    cell_size: f64,
    max_radius: i64,
    buckets: HashMap<(i64, i64), Vec<usize>>,
    /// Precomputed radians for the batch-scan path.
    lat_rad: Vec<f64>,
    lon_rad: Vec<f64>,
    cos_lat: Vec<f64>,
}

impl SpatialIndex {
    /// Default angular cell size in degrees.
    pub const DEFAULT_CELL_SIZE: f64 = 0.005;
    /// Default maximum ring radius before the linear-scan fallback.
    pub const DEFAULT_MAX_RADIUS: i64 = 4;

    /// Builds an index with default cell size. Returns `None` for an empty
    /// node set — an index over nothing is a construction bug, not a
    /// runtime condition.
    pub fn new(nodes: Vec<NodeCoord>) -> Option<Self> {
        Self::with_cell_size(nodes, Self::DEFAULT_CELL_SIZE, Self::DEFAULT_MAX_RADIUS)
    }

    /// Builds an index with an explicit cell size and ring limit.
    pub fn with_cell_size(nodes: Vec<NodeCoord>, cell_size: f64, max_radius: i64) -> Option<Self> {
        if nodes.is_empty() {
            return None;
        }
        let cell_size = if cell_size > 0.0 {
            cell_size
        } else {
            Self::DEFAULT_CELL_SIZE
        };
        let mut buckets: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        let mut lat_rad = Vec::with_capacity(nodes.len());
        let mut lon_rad = Vec::with_capacity(nodes.len());
        let mut cos_lat = Vec::with_capacity(nodes.len());
        for (idx, node) in nodes.iter().enumerate() {
            let key = cell_key(node.lat, node.lon, cell_size);
            buckets.entry(key).or_default().push(idx);
            lat_rad.push(node.lat.to_radians());
            lon_rad.push(node.lon.to_radians());
            cos_lat.push(node.lat.to_radians().cos());
        }
        Some(Self {
            nodes,
            cell_size,
            max_radius: max_radius.max(1),
            buckets,
            lat_rad,
            lon_rad,
            cos_lat,
        })
    }

    /// Number of indexed nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nearest node to `(lat, lon)` via the expanding-ring search.
    pub fn nearest(&self, lat: f64, lon: f64) -> NearestResult {
        let origin = cell_key(lat, lon, self.cell_size);
        let mut best: Option<(usize, f64)> = None;

        for radius in 0..=self.max_radius {
            // Once a candidate exists, stop when the nearest possible point
            // in this ring is already farther than the candidate.
            if let Some((_, best_d)) = best {
                let ring_floor =
                    (radius - 1).max(0) as f64 * self.cell_size * METERS_PER_DEGREE
                        * lat.to_radians().cos().abs().min(1.0);
                if radius > 0 && ring_floor > best_d {
                    break;
                }
            }
            for cell in ring_cells(origin, radius) {
                let Some(indices) = self.buckets.get(&cell) else {
                    continue;
                };
                for &idx in indices {
                    let d = haversine_m(lat, lon, self.nodes[idx].lat, self.nodes[idx].lon);
                    let better = match best {
                        None => true,
                        Some((best_idx, best_d)) => {
                            d < best_d || (d == best_d && idx < best_idx)
                        }
                    };
                    if better {
                        best = Some((idx, d));
                    }
                }
            }
        }

        let (idx, distance_m) = match best {
            Some(hit) => hit,
            None => self.scan(lat, lon),
        };
        NearestResult {
            node_id: self.nodes[idx].id.clone(),
            distance_m,
            index: idx,
        }
    }

    /// Batch scan over the precomputed radian arrays. Exact, O(n); used as
    /// the fallback when the ring sweep finds nothing, and directly useful
    /// for callers that prefer predictable latency over grid lookups.
    pub fn scan(&self, lat: f64, lon: f64) -> (usize, f64) {
        let lat_q = lat.to_radians();
        let lon_q = lon.to_radians();
        let cos_q = lat_q.cos();
        let mut best_idx = 0usize;
        let mut best_d = f64::INFINITY;
        for i in 0..self.nodes.len() {
            let sin_dlat = ((self.lat_rad[i] - lat_q) / 2.0).sin();
            let sin_dlon = ((self.lon_rad[i] - lon_q) / 2.0).sin();
            let a = sin_dlat * sin_dlat + cos_q * self.cos_lat[i] * sin_dlon * sin_dlon;
            let d = EARTH_RADIUS_M * 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
            if d < best_d {
                best_d = d;
                best_idx = i;
            }
        }
        (best_idx, best_d)
    }
}

fn cell_key(lat: f64, lon: f64, cell_size: f64) -> (i64, i64) {
    (
        (lat / cell_size).floor() as i64,
        (lon / cell_size).floor() as i64,
    )
}

/// Cells on the square ring at Chebyshev distance `radius` from `origin`.
/// Radius 0 is the origin cell itself.
fn ring_cells(origin: (i64, i64), radius: i64) -> Vec<(i64, i64)> {
    if radius <= 0 {
        return vec![origin];
    }
    let (cx, cy) = origin;
    let mut cells = Vec::with_capacity((8 * radius) as usize);
    for dx in -radius..=radius {
        for dy in -radius..=radius {
            if dx.abs() == radius || dy.abs() == radius {
                cells.push((cx + dx, cy + dy));
            }
        }
    }
    cells
}
