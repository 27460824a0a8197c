//! Fleet routing over pre-assigned vehicle/pickup groups.

use tracing::{info, warn};

use crate::cost::aggregate_breakdowns;
use crate::distance::DistanceMatrix;
use crate::models::{
    FleetOutcome, FleetSolution, InputError, Pickup, RoutingOutcome, VehicleMetadataMap,
    VehicleRoute, VehicleType,
};

use super::capability::SolverConfig;
use super::single::solve_routing;

/// One vehicle with the pickups it must serve.
#[derive(Debug, Clone)]
pub struct Assignment {
    /// The assigned vehicle.
    pub vehicle: VehicleType,
    /// Pickups served by this vehicle.
    pub pickups: Vec<Pickup>,
}

impl Assignment {
    /// Creates an assignment.
    pub fn new(vehicle: VehicleType, pickups: Vec<Pickup>) -> Self {
        Self { vehicle, pickups }
    }
}

/// Solves each assignment independently and aggregates the results.
///
/// All-or-nothing: the first infeasible assignment fails the whole call
/// with that assignment's [`NoSolution`](crate::models::NoSolution) — a
/// partially solved plan is not actionable for a dispatcher. The fleet
/// cost is the keyed sum of the per-route breakdowns with `total_cost`
/// recomputed after summation.
pub fn solve_fleet_routing(
    matrix: &DistanceMatrix,
    depot: &str,
    sink: &str,
    assignments: &[Assignment],
    metadata: Option<&VehicleMetadataMap>,
    config: &SolverConfig,
) -> Result<FleetOutcome, InputError> {
    info!(assignments = assignments.len(), "solving fleet routing");
    let mut routes = Vec::with_capacity(assignments.len());

    for assignment in assignments {
        let vehicles = std::slice::from_ref(&assignment.vehicle);
        let outcome = solve_routing(
            matrix,
            depot,
            sink,
            &assignment.pickups,
            vehicles,
            metadata,
            config,
        )?;
        match outcome {
            RoutingOutcome::Feasible(solution) => {
                routes.push(VehicleRoute {
                    vehicle: assignment.vehicle.clone(),
                    pickup_ids: assignment.pickups.iter().map(|p| p.id.clone()).collect(),
                    solution,
                });
            }
            RoutingOutcome::Infeasible(failure) => {
                warn!(
                    vehicle = assignment.vehicle.name(),
                    reason = %failure.reason,
                    "assignment infeasible, failing fleet call"
                );
                return Ok(FleetOutcome::Infeasible(failure));
            }
        }
    }

    let cost = aggregate_breakdowns(routes.iter().map(|r| &r.solution.cost));
    Ok(FleetOutcome::Feasible(FleetSolution { routes, cost }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{build_distance_matrix, PointSpec};
    use crate::graph::AdjacencyGraph;
    use crate::models::NoSolutionReason;
    use std::time::Duration;

    /// Bidirectional star: depot and sink connected to two pickups.
    fn star_matrix() -> DistanceMatrix {
        let mut g = AdjacencyGraph::new();
        g.add_node("depot", 35.000, 139.000);
        g.add_node("paper-1", 35.001, 139.000);
        g.add_node("metal-1", 35.000, 139.001);
        g.add_node("sink", 35.002, 139.002);
        g.add_edge_bidirectional("depot", "paper-1", 100.0);
        g.add_edge_bidirectional("depot", "metal-1", 120.0);
        g.add_edge_bidirectional("paper-1", "sink", 150.0);
        g.add_edge_bidirectional("metal-1", "sink", 160.0);
        build_distance_matrix(
            &g,
            &[
                PointSpec::node("depot"),
                PointSpec::node("paper-1"),
                PointSpec::node("metal-1"),
                PointSpec::node("sink"),
            ],
        )
        .unwrap()
    }

    fn config() -> SolverConfig {
        SolverConfig::default().with_time_limit(Duration::from_millis(100))
    }

    #[test]
    fn test_fleet_aggregates_routes() {
        let m = star_matrix();
        let assignments = vec![
            Assignment::new(
                VehicleType::new("van", 300).with_per_km_cost(50.0),
                vec![Pickup::new("paper-1", 50, "paper")],
            ),
            Assignment::new(
                VehicleType::new("truck", 2000)
                    .with_fixed_cost(1000.0)
                    .with_per_km_cost(80.0),
                vec![Pickup::new("metal-1", 200, "metal")],
            ),
        ];
        let outcome =
            solve_fleet_routing(&m, "depot", "sink", &assignments, None, &config()).unwrap();
        let fleet = outcome.fleet().expect("feasible");
        assert_eq!(fleet.routes.len(), 2);
        let route_total: i64 = fleet.routes.iter().map(VehicleRoute::total_cost).sum();
        assert_eq!(fleet.total_cost(), route_total);
        assert_eq!(
            fleet.cost.total_cost,
            fleet.cost.fixed_cost + fleet.cost.distance_cost
        );
    }

    #[test]
    fn test_fleet_all_or_nothing() {
        let m = star_matrix();
        let assignments = vec![
            Assignment::new(
                VehicleType::new("van", 300).with_per_km_cost(50.0),
                vec![Pickup::new("paper-1", 50, "paper")],
            ),
            // Demand above the vehicle's capacity.
            Assignment::new(
                VehicleType::new("mini", 100),
                vec![Pickup::new("metal-1", 200, "metal")],
            ),
        ];
        let outcome =
            solve_fleet_routing(&m, "depot", "sink", &assignments, None, &config()).unwrap();
        let failure = outcome.failure().expect("whole call fails");
        assert_eq!(failure.reason, NoSolutionReason::Capacity);
    }

    #[test]
    fn test_empty_assignment_list() {
        let m = star_matrix();
        let outcome = solve_fleet_routing(&m, "depot", "sink", &[], None, &config()).unwrap();
        let fleet = outcome.fleet().expect("trivially feasible");
        assert!(fleet.routes.is_empty());
        assert_eq!(fleet.total_cost(), 0);
    }
}
