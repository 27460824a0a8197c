//! # cartage
//!
//! Resource-collection vehicle routing: snap pickup points onto a road
//! network, build shortest-path distance matrices, and solve capacitated
//! collection routes that visit every pickup before a mandatory drop-off
//! sink, with decimal-exact itemized cost breakdowns.
//!
//! ## Modules
//!
//! - [`models`] — Domain types (Pickup, VehicleType, master data, solution values)
//! - [`spatial`] — Haversine distance and grid-bucket nearest-node index
//! - [`graph`] — Road-network trait and in-memory adjacency graph
//! - [`distance`] — Point snapping and Dijkstra distance matrices
//! - [`cost`] — Decimal-exact cost calculator and breakdown aggregation
//! - [`solver`] — Single-route, open-path, and fleet solvers over a pluggable order search
//! - [`planner`] — Pre-solver vehicle allocation per resource group
//! - [`integrated`] — Two-stage multi-trip optimization within a physical vehicle budget
//! - [`compare`] — eCOM-10 alternative-fleet scenario and baseline deltas
//! - [`cache`] — Keyed build-once caching for graphs and matrices
//!
//! ## Example
//!
//! ```
//! use cartage::distance::{build_distance_matrix, PointSpec};
//! use cartage::graph::AdjacencyGraph;
//! use cartage::models::{Pickup, VehicleType};
//! use cartage::solver::{solve_routing, SolverConfig};
//!
//! let mut graph = AdjacencyGraph::new();
//! graph.add_node("depot", 35.000, 139.000);
//! graph.add_node("p1", 35.001, 139.000);
//! graph.add_node("sink", 35.002, 139.000);
//! graph.add_edge("depot", "p1", 100.0);
//! graph.add_edge("p1", "sink", 150.0);
//! graph.add_edge("sink", "depot", 200.0);
//!
//! let matrix = build_distance_matrix(
//!     &graph,
//!     &[
//!         PointSpec::node("depot"),
//!         PointSpec::node("p1"),
//!         PointSpec::node("sink"),
//!     ],
//! )?;
//! let vehicle = VehicleType::new("2t truck", 300)
//!     .with_fixed_cost(1000.0)
//!     .with_per_km_cost(50.0);
//! let outcome = solve_routing(
//!     &matrix,
//!     "depot",
//!     "sink",
//!     &[Pickup::new("p1", 50, "paper")],
//!     &[vehicle],
//!     None,
//!     &SolverConfig::default(),
//! )?;
//! let solution = outcome.solution().unwrap();
//! assert_eq!(solution.order, vec!["depot", "p1", "sink", "depot"]);
//! assert_eq!(solution.cost.total_cost, 1023);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod compare;
pub mod cost;
pub mod distance;
pub mod graph;
pub mod integrated;
pub mod models;
pub mod planner;
pub mod solver;
pub mod spatial;
