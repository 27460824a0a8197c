//! Shortest-path distance matrices over a road network.
//!
//! [`build_distance_matrix`] snaps points onto the graph and runs one
//! Dijkstra pass per source; the resulting [`DistanceMatrix`] answers
//! point-to-point queries with connector offsets applied per endpoint.

mod builder;
mod matrix;

pub use builder::{build_distance_matrix, snap_to_graph, DistanceMatrixError, PointSpec};
pub use matrix::{DistanceMatrix, SnappedPoint, UNREACHABLE_COST};
