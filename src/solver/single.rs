//! Single-vehicle routing over a prepared distance matrix.

use tracing::{debug, info};

use crate::cost::CostCalculator;
use crate::distance::DistanceMatrix;
use crate::models::{
    total_demand_kg, validate_pickups, InputError, NoSolution, NoSolutionReason, Pickup,
    RoutingOutcome, Solution, VehicleMetadataMap, VehicleType,
};

use super::capability::{OrderRequest, Precedence, SolverConfig};

/// Solves one closed collection route: `depot → pickups… → sink → depot`.
///
/// Feasibility requires a candidate vehicle whose capacity covers the
/// total demand, every required leg reachable in the matrix, and a
/// visiting order found within the search budget. All three failures are
/// returned as [`NoSolution`] values; malformed pickups are the one
/// condition reported as an error.
///
/// When several vehicles are feasible the lowest total cost wins, cost
/// ties broken by input order. Pickups are ordered once (arc lengths do
/// not depend on the vehicle) and each candidate is cost-evaluated on
/// that order.
///
/// # Panics
///
/// Panics if the depot, sink, or a pickup id is missing from the matrix.
pub fn solve_routing(
    matrix: &DistanceMatrix,
    depot: &str,
    sink: &str,
    pickups: &[Pickup],
    vehicles: &[VehicleType],
    metadata: Option<&VehicleMetadataMap>,
    config: &SolverConfig,
) -> Result<RoutingOutcome, InputError> {
    validate_pickups(pickups)?;
    info!(
        depot,
        sink,
        pickups = pickups.len(),
        vehicles = vehicles.len(),
        search = config.search.name(),
        "solving single-vehicle route"
    );

    let demand = total_demand_kg(pickups);
    let candidates = match capacity_candidates(vehicles, demand) {
        Ok(c) => c,
        Err(no_solution) => return Ok(RoutingOutcome::Infeasible(no_solution)),
    };

    if let Some(no_solution) = detect_disconnects(matrix, depot, sink, pickups) {
        return Ok(RoutingOutcome::Infeasible(no_solution));
    }

    // With nothing to collect the route degenerates to a direct
    // depot → sink → depot run for the first feasible vehicle.
    if pickups.is_empty() {
        let order = vec![depot.to_string(), sink.to_string(), depot.to_string()];
        let (idx, vehicle) = candidates[0];
        debug!(vehicle = vehicle.name(), index = idx, "empty pickup set, direct route");
        return Ok(RoutingOutcome::Feasible(evaluate_route(
            matrix, order, vehicle, metadata, 0,
        )));
    }

    let request = OrderRequest {
        start: depot.to_string(),
        end: depot.to_string(),
        checkpoints: pickups
            .iter()
            .map(|p| p.id.clone())
            .chain(std::iter::once(sink.to_string()))
            .collect(),
        precedence: Some(Precedence::before(sink)),
        time_limit: config.time_limit,
    };
    let Some(order) = config.search.search(matrix, &request) else {
        return Ok(RoutingOutcome::Infeasible(NoSolution::new(
            NoSolutionReason::Infeasible,
            "no feasible visiting order found within the search budget",
        )));
    };

    Ok(RoutingOutcome::Feasible(cheapest_over(
        matrix, order, &candidates, metadata, demand,
    )))
}

/// Solves one open trip: `start → pickups… → end`, no closing leg.
///
/// Used when a physical vehicle chains trips: its second trip starts at
/// the sink it just unloaded at. Same failure taxonomy as
/// [`solve_routing`].
///
/// # Panics
///
/// Panics if the start, end, or a pickup id is missing from the matrix.
pub fn solve_path_routing(
    matrix: &DistanceMatrix,
    start: &str,
    end: &str,
    pickups: &[Pickup],
    vehicles: &[VehicleType],
    metadata: Option<&VehicleMetadataMap>,
    config: &SolverConfig,
) -> Result<RoutingOutcome, InputError> {
    validate_pickups(pickups)?;
    debug!(start, end, pickups = pickups.len(), "solving open path route");

    let demand = total_demand_kg(pickups);
    let candidates = match capacity_candidates(vehicles, demand) {
        Ok(c) => c,
        Err(no_solution) => return Ok(RoutingOutcome::Infeasible(no_solution)),
    };

    for p in pickups {
        for (from, to) in [(start, p.id.as_str()), (p.id.as_str(), end)] {
            if !matrix.is_reachable(from, to) {
                return Ok(RoutingOutcome::Infeasible(leg_unreachable(from, to)));
            }
        }
    }
    if pickups.is_empty() && !matrix.is_reachable(start, end) {
        return Ok(RoutingOutcome::Infeasible(leg_unreachable(start, end)));
    }

    let request = OrderRequest {
        start: start.to_string(),
        end: end.to_string(),
        checkpoints: pickups.iter().map(|p| p.id.clone()).collect(),
        precedence: None,
        time_limit: config.time_limit,
    };
    let Some(order) = config.search.search(matrix, &request) else {
        return Ok(RoutingOutcome::Infeasible(NoSolution::new(
            NoSolutionReason::Infeasible,
            "no feasible visiting order found within the search budget",
        )));
    };

    Ok(RoutingOutcome::Feasible(cheapest_over(
        matrix, order, &candidates, metadata, demand,
    )))
}

/// Vehicles able to carry `demand`, with their input indices, or the
/// capacity failure naming the shortfall.
fn capacity_candidates(
    vehicles: &[VehicleType],
    demand: i32,
) -> Result<Vec<(usize, &VehicleType)>, NoSolution> {
    if vehicles.is_empty() {
        return Err(NoSolution::new(
            NoSolutionReason::Capacity,
            "no candidate vehicles supplied",
        ));
    }
    let candidates: Vec<(usize, &VehicleType)> = vehicles
        .iter()
        .enumerate()
        .filter(|(_, v)| v.capacity_kg() >= demand)
        .collect();
    if candidates.is_empty() {
        let max_capacity = vehicles.iter().map(VehicleType::capacity_kg).max().unwrap_or(0);
        return Err(NoSolution::new(
            NoSolutionReason::Capacity,
            format!(
                "total demand {demand} kg exceeds the largest vehicle capacity \
                 {max_capacity} kg (short by {} kg)",
                demand - max_capacity
            ),
        ));
    }
    Ok(candidates)
}

/// Checks every leg a closed route must traverse.
fn detect_disconnects(
    matrix: &DistanceMatrix,
    depot: &str,
    sink: &str,
    pickups: &[Pickup],
) -> Option<NoSolution> {
    for p in pickups {
        for (from, to) in [(depot, p.id.as_str()), (p.id.as_str(), sink)] {
            if !matrix.is_reachable(from, to) {
                return Some(leg_unreachable(from, to));
            }
        }
    }
    for (from, to) in [(depot, sink), (sink, depot)] {
        if !matrix.is_reachable(from, to) {
            return Some(leg_unreachable(from, to));
        }
    }
    None
}

fn leg_unreachable(from: &str, to: &str) -> NoSolution {
    NoSolution::new(
        NoSolutionReason::Disconnected,
        format!("no path from '{from}' to '{to}' in the road network"),
    )
}

/// Cost-evaluates every candidate on the solved order and keeps the
/// cheapest, ties by input index.
fn cheapest_over(
    matrix: &DistanceMatrix,
    order: Vec<String>,
    candidates: &[(usize, &VehicleType)],
    metadata: Option<&VehicleMetadataMap>,
    demand: i32,
) -> Solution {
    let mut best: Option<Solution> = None;
    for &(idx, vehicle) in candidates {
        let solution = evaluate_route(matrix, order.clone(), vehicle, metadata, demand);
        let better = match &best {
            None => true,
            Some(b) => solution.total_cost() < b.total_cost(),
        };
        if better {
            debug!(
                vehicle = vehicle.name(),
                index = idx,
                total_cost = solution.total_cost(),
                "new best candidate"
            );
            best = Some(solution);
        }
    }
    // candidates is never empty here.
    best.unwrap_or_else(|| unreachable!("candidate list was checked non-empty"))
}

fn evaluate_route(
    matrix: &DistanceMatrix,
    order: Vec<String>,
    vehicle: &VehicleType,
    metadata: Option<&VehicleMetadataMap>,
    demand: i32,
) -> Solution {
    let total_distance_m = matrix.route_distance(&order);
    let meta = metadata.and_then(|m| m.get(vehicle.name()));
    let cost = CostCalculator::new().evaluate(vehicle, total_distance_m, meta, demand);
    Solution {
        vehicle: vehicle.clone(),
        order,
        total_distance_m,
        cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{build_distance_matrix, PointSpec};
    use crate::graph::AdjacencyGraph;
    use crate::models::NoSolutionReason;
    use proptest::prelude::*;

    /// depot→pickup1 100 m, pickup1→sink 150 m, sink→depot 200 m.
    fn triangle_matrix() -> DistanceMatrix {
        let mut g = AdjacencyGraph::new();
        g.add_node("depot", 35.000, 139.000);
        g.add_node("pickup1", 35.001, 139.000);
        g.add_node("sink", 35.002, 139.000);
        g.add_edge("depot", "pickup1", 100.0);
        g.add_edge("pickup1", "sink", 150.0);
        g.add_edge("sink", "depot", 200.0);
        build_distance_matrix(
            &g,
            &[
                PointSpec::node("depot"),
                PointSpec::node("pickup1"),
                PointSpec::node("sink"),
            ],
        )
        .unwrap()
    }

    fn truck() -> VehicleType {
        VehicleType::new("2t truck", 300)
            .with_fixed_cost(1000.0)
            .with_per_km_cost(50.0)
    }

    #[test]
    fn test_triangle_scenario() {
        let m = triangle_matrix();
        let pickups = vec![Pickup::new("pickup1", 50, "paper")];
        let outcome = solve_routing(
            &m,
            "depot",
            "sink",
            &pickups,
            &[truck()],
            None,
            &SolverConfig::default().with_time_limit(std::time::Duration::from_millis(100)),
        )
        .unwrap();
        let s = outcome.solution().expect("feasible");
        assert_eq!(s.order, vec!["depot", "pickup1", "sink", "depot"]);
        assert_eq!(s.total_distance_m, 450.0);
        assert_eq!(s.cost.distance_cost, 23); // round-half-up of 22.5
        assert_eq!(s.cost.fixed_cost, 1000);
        assert_eq!(s.cost.total_cost, 1023);
    }

    #[test]
    fn test_capacity_rejection() {
        let m = triangle_matrix();
        let pickups = vec![Pickup::new("pickup1", 500, "paper")];
        let outcome = solve_routing(
            &m,
            "depot",
            "sink",
            &pickups,
            &[truck()],
            None,
            &SolverConfig::default(),
        )
        .unwrap();
        let failure = outcome.failure().expect("infeasible");
        assert_eq!(failure.reason, NoSolutionReason::Capacity);
        assert!(failure.message.contains("200 kg"));
    }

    #[test]
    fn test_disconnection_rejection() {
        // Same triangle minus the pickup1→sink edge.
        let mut g = AdjacencyGraph::new();
        g.add_node("depot", 35.000, 139.000);
        g.add_node("pickup1", 35.001, 139.000);
        g.add_node("sink", 35.002, 139.000);
        g.add_edge("depot", "pickup1", 100.0);
        g.add_edge("sink", "depot", 200.0);
        g.add_edge("depot", "sink", 300.0);
        let m = build_distance_matrix(
            &g,
            &[
                PointSpec::node("depot"),
                PointSpec::node("pickup1"),
                PointSpec::node("sink"),
            ],
        )
        .unwrap();
        let pickups = vec![Pickup::new("pickup1", 50, "paper")];
        let outcome = solve_routing(
            &m,
            "depot",
            "sink",
            &pickups,
            &[truck()],
            None,
            &SolverConfig::default(),
        )
        .unwrap();
        let failure = outcome.failure().expect("infeasible");
        assert_eq!(failure.reason, NoSolutionReason::Disconnected);
        assert!(failure.message.contains("pickup1"));
        assert!(failure.message.contains("sink"));
    }

    #[test]
    fn test_cheaper_vehicle_wins() {
        let m = triangle_matrix();
        let pickups = vec![Pickup::new("pickup1", 50, "paper")];
        let pricey = VehicleType::new("pricey", 400)
            .with_fixed_cost(5000.0)
            .with_per_km_cost(80.0);
        let outcome = solve_routing(
            &m,
            "depot",
            "sink",
            &pickups,
            &[pricey, truck()],
            None,
            &SolverConfig::default().with_time_limit(std::time::Duration::from_millis(100)),
        )
        .unwrap();
        assert_eq!(outcome.solution().unwrap().vehicle.name(), "2t truck");
    }

    #[test]
    fn test_cost_tie_keeps_input_order() {
        let m = triangle_matrix();
        let pickups = vec![Pickup::new("pickup1", 50, "paper")];
        let twin_a = VehicleType::new("twin a", 300).with_per_km_cost(50.0);
        let twin_b = VehicleType::new("twin b", 300).with_per_km_cost(50.0);
        let outcome = solve_routing(
            &m,
            "depot",
            "sink",
            &pickups,
            &[twin_a, twin_b],
            None,
            &SolverConfig::default().with_time_limit(std::time::Duration::from_millis(100)),
        )
        .unwrap();
        assert_eq!(outcome.solution().unwrap().vehicle.name(), "twin a");
    }

    #[test]
    fn test_empty_pickups_direct_route() {
        let m = triangle_matrix();
        let outcome = solve_routing(
            &m,
            "depot",
            "sink",
            &[],
            &[truck()],
            None,
            &SolverConfig::default(),
        )
        .unwrap();
        let s = outcome.solution().expect("feasible");
        assert_eq!(s.order, vec!["depot", "sink", "depot"]);
        assert_eq!(s.total_distance_m, 450.0); // 100 + 150 via pickup1, then 200
    }

    #[test]
    fn test_invalid_pickup_is_error() {
        let m = triangle_matrix();
        let pickups = vec![Pickup::new("", 50, "paper")];
        let err = solve_routing(
            &m,
            "depot",
            "sink",
            &pickups,
            &[truck()],
            None,
            &SolverConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, InputError::MissingPickupId);
    }

    #[test]
    fn test_path_routing_has_no_closing_leg() {
        let m = triangle_matrix();
        let pickups = vec![Pickup::new("pickup1", 50, "paper")];
        let outcome = solve_path_routing(
            &m,
            "depot",
            "sink",
            &pickups,
            &[truck()],
            None,
            &SolverConfig::default().with_time_limit(std::time::Duration::from_millis(100)),
        )
        .unwrap();
        let s = outcome.solution().expect("feasible");
        assert_eq!(s.order, vec!["depot", "pickup1", "sink"]);
        assert_eq!(s.total_distance_m, 250.0);
    }

    #[test]
    fn test_no_vehicles_is_capacity_failure() {
        let m = triangle_matrix();
        let outcome = solve_routing(
            &m,
            "depot",
            "sink",
            &[],
            &[],
            None,
            &SolverConfig::default(),
        )
        .unwrap();
        assert_eq!(
            outcome.failure().unwrap().reason,
            NoSolutionReason::Capacity
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        /// Route shape invariant: depot first and last, sink second to
        /// last, every pickup visited exactly once before the sink, and
        /// the reported distance consistent with the matrix.
        #[test]
        fn prop_route_shape(qtys in proptest::collection::vec(1i32..100, 1..4)) {
            let mut g = AdjacencyGraph::new();
            g.add_node("depot", 35.000, 139.000);
            g.add_node("sink", 35.010, 139.010);
            let mut pickups = Vec::new();
            for (i, q) in qtys.iter().enumerate() {
                let id = format!("p{i}");
                g.add_node(id.clone(), 35.0 + 0.001 * i as f64, 139.0);
                g.add_edge_bidirectional("depot", id.clone(), 100.0 + 10.0 * i as f64);
                g.add_edge_bidirectional(id.clone(), "sink", 150.0);
                pickups.push(Pickup::new(id, *q, "paper"));
            }
            let mut points = vec![PointSpec::node("depot"), PointSpec::node("sink")];
            points.extend(pickups.iter().map(|p| PointSpec::node(p.id.clone())));
            let m = build_distance_matrix(&g, &points).unwrap();

            let outcome = solve_routing(
                &m,
                "depot",
                "sink",
                &pickups,
                &[VehicleType::new("van", 500).with_per_km_cost(30.0)],
                None,
                &SolverConfig::default().with_time_limit(std::time::Duration::from_millis(10)),
            )
            .unwrap();
            let s = outcome.solution().expect("feasible");

            prop_assert_eq!(s.order.first().map(String::as_str), Some("depot"));
            prop_assert_eq!(s.order.last().map(String::as_str), Some("depot"));
            let sink_pos = s.order.len() - 2;
            prop_assert_eq!(s.order[sink_pos].as_str(), "sink");
            for p in &pickups {
                let positions: Vec<usize> = s
                    .order
                    .iter()
                    .enumerate()
                    .filter(|(_, id)| **id == p.id)
                    .map(|(i, _)| i)
                    .collect();
                prop_assert_eq!(positions.len(), 1);
                prop_assert!(positions[0] < sink_pos);
            }
            prop_assert!((s.total_distance_m - m.route_distance(&s.order)).abs() < 1e-9);
        }
    }
}
