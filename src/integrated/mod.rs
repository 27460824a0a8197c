//! Integrated multi-trip optimization.
//!
//! Handles the case where more resource trips are needed than physical
//! vehicles exist. Stage A solves a multi-vehicle VRP over virtual trip
//! slots (shared depot, every trip ending at the sink); Stage B folds the
//! trips onto physical vehicles, merging one pair of trips through the
//! sink when exactly one trip is over the physical budget.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cost::{aggregate_breakdowns, CostCalculator};
use crate::distance::{DistanceMatrix, UNREACHABLE_COST};
use crate::models::{
    required_resources, total_demand_kg, validate_pickups, vehicle_supports_resource,
    FleetSolution, InputError, MasterData, NoSolution, NoSolutionReason, Pickup,
    RoutingOutcome, Solution, VehicleCatalog, VehicleMetadataMap, VehicleRoute, VehicleType,
};
use crate::solver::{solve_path_routing, SearchTier, SolverConfig};

/// Upper bound on virtual trip slots in Stage A.
pub const MAX_TRIPS: usize = 5;

/// Physical vehicles available to carry the trips in Stage B.
pub const MAX_PHYSICAL_VEHICLES: usize = 4;

/// Wall-clock budget for the Stage A assignment improvement.
pub const STAGE_A_TIME_LIMIT: Duration = Duration::from_secs(8);

/// One solved trip: a `depot → pickups… → sink` traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripRoute {
    /// Vehicle type serving the trip.
    pub vehicle: VehicleType,
    /// Pickups in visit order.
    pub pickups: Vec<Pickup>,
    /// Full visiting order, depot first, sink last.
    pub order: Vec<String>,
    /// Trip distance in metres.
    pub distance_m: f64,
    /// Summed demand in kilograms.
    pub demand_kg: i32,
}

impl TripRoute {
    /// Pickup ids in visit order.
    pub fn pickup_ids(&self) -> Vec<String> {
        self.pickups.iter().map(|p| p.id.clone()).collect()
    }
}

/// Result of a successful integrated solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegratedFleetSolution {
    /// Physical routes with closing legs and final costs.
    pub fleet: FleetSolution,
    /// The Stage A trips the routes were folded from.
    pub trips: Vec<TripRoute>,
    /// Number of Stage A trips.
    pub trip_count: usize,
    /// Number of physical vehicles used.
    pub vehicle_count: usize,
}

/// Outcome of the integrated optimizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IntegratedOutcome {
    /// A valid physical fleet plan.
    Feasible(IntegratedFleetSolution),
    /// No plan within the trip and vehicle budgets.
    Infeasible(NoSolution),
}

impl IntegratedOutcome {
    /// True for the feasible variant.
    pub fn is_feasible(&self) -> bool {
        matches!(self, IntegratedOutcome::Feasible(_))
    }

    /// The solution, if feasible.
    pub fn solution(&self) -> Option<&IntegratedFleetSolution> {
        match self {
            IntegratedOutcome::Feasible(s) => Some(s),
            IntegratedOutcome::Infeasible(_) => None,
        }
    }

    /// The failure, if infeasible.
    pub fn failure(&self) -> Option<&NoSolution> {
        match self {
            IntegratedOutcome::Feasible(_) => None,
            IntegratedOutcome::Infeasible(f) => Some(f),
        }
    }
}

/// Runs the two-stage multi-trip optimization.
///
/// Requires the metaheuristic search tier; unlike the single-vehicle
/// solver there is no simpler fallback, so a fallback-tier configuration
/// fails fast with `infeasible`. Other fail-fast conditions: depot equal
/// to sink, a resource with zero compatible vehicles, and an unreachable
/// `sink → depot` closing leg.
///
/// # Panics
///
/// Panics if the depot, sink, or a pickup id is missing from the matrix.
pub fn solve_integrated_routing(
    matrix: &DistanceMatrix,
    depot: &str,
    sink: &str,
    pickups: &[Pickup],
    catalog: &VehicleCatalog,
    master: Option<&MasterData>,
    config: &SolverConfig,
) -> Result<IntegratedOutcome, InputError> {
    validate_pickups(pickups)?;
    info!(
        depot,
        sink,
        pickups = pickups.len(),
        vehicle_types = catalog.len(),
        "integrated multi-trip optimization"
    );

    if config.search.tier() != SearchTier::Metaheuristic {
        return Ok(infeasible(
            NoSolutionReason::Infeasible,
            "integrated optimization requires the combinatorial search capability, \
             which is not configured",
        ));
    }
    if depot == sink {
        return Ok(infeasible(
            NoSolutionReason::Infeasible,
            "depot and sink must be distinct points",
        ));
    }
    if catalog.is_empty() {
        return Ok(infeasible(
            NoSolutionReason::Capacity,
            "the vehicle catalog is empty",
        ));
    }

    let metadata = master.map(MasterData::metadata_map);

    // Every resource must have at least one compatible type before any
    // search effort is spent.
    for resource in required_resources(pickups) {
        let any = catalog
            .list()
            .iter()
            .any(|v| vehicle_supports_resource(v.name(), &resource, master));
        if !any {
            return Ok(infeasible(
                NoSolutionReason::Infeasible,
                format!("no compatible vehicle for resource '{resource}'"),
            ));
        }
    }

    if let Some(no_solution) = check_connectivity(matrix, depot, sink, pickups) {
        return Ok(IntegratedOutcome::Infeasible(no_solution));
    }

    let slots = select_trip_slots(pickups, catalog, master);
    let slot_capacity: i64 = slots.iter().map(|v| v.capacity_kg() as i64).sum();
    let demand = total_demand_kg(pickups);
    if slot_capacity < demand as i64 {
        return Ok(infeasible(
            NoSolutionReason::Capacity,
            format!(
                "total demand {demand} kg exceeds the combined trip capacity \
                 {slot_capacity} kg across {MAX_TRIPS} trips"
            ),
        ));
    }

    let trips = match assign_trips(
        matrix,
        depot,
        sink,
        pickups,
        &slots,
        master,
        metadata.as_ref(),
    ) {
        Ok(trips) => trips,
        Err(no_solution) => return Ok(IntegratedOutcome::Infeasible(no_solution)),
    };
    debug!(trips = trips.len(), "stage A produced trips");

    fold_to_physical(matrix, depot, sink, trips, catalog, master, metadata.as_ref(), config)
}

fn infeasible(reason: NoSolutionReason, message: impl Into<String>) -> IntegratedOutcome {
    IntegratedOutcome::Infeasible(NoSolution::new(reason, message))
}

fn check_connectivity(
    matrix: &DistanceMatrix,
    depot: &str,
    sink: &str,
    pickups: &[Pickup],
) -> Option<NoSolution> {
    let mut legs: Vec<(&str, &str)> = vec![(depot, sink), (sink, depot)];
    for p in pickups {
        legs.push((depot, p.id.as_str()));
        legs.push((p.id.as_str(), sink));
    }
    for (from, to) in legs {
        if !matrix.is_reachable(from, to) {
            return Some(NoSolution::new(
                NoSolutionReason::Disconnected,
                format!("no path from '{from}' to '{to}' in the road network"),
            ));
        }
    }
    None
}

/// Picks up to [`MAX_TRIPS`] virtual vehicle slots.
///
/// One slot per required resource (its cheapest compatible type by cost
/// score, capacity as the tie-break), deduplicated by type name, then
/// backfilled by cycling the cheapest types until the trip budget is
/// reached.
fn select_trip_slots(
    pickups: &[Pickup],
    catalog: &VehicleCatalog,
    master: Option<&MasterData>,
) -> Vec<VehicleType> {
    let mut ranked: Vec<&VehicleType> = catalog.list();
    ranked.sort_by(|a, b| {
        score(a)
            .partial_cmp(&score(b))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.capacity_kg().cmp(&a.capacity_kg()))
    });

    let mut slots: Vec<VehicleType> = Vec::new();
    for resource in required_resources(pickups) {
        let pick = ranked
            .iter()
            .find(|v| vehicle_supports_resource(v.name(), &resource, master));
        if let Some(v) = pick {
            if !slots.iter().any(|s| s.name() == v.name()) {
                slots.push((*v).clone());
            }
        }
        if slots.len() == MAX_TRIPS {
            return slots;
        }
    }

    let mut cycle = ranked.iter().cycle();
    while slots.len() < MAX_TRIPS {
        match cycle.next() {
            Some(v) => slots.push((*v).clone()),
            None => break,
        }
    }
    slots
}

fn score(v: &VehicleType) -> f64 {
    v.fixed_cost_per_km() + v.per_km_cost()
}

/// Per-metre arc rate for a slot: amortized fixed rate, variable rate,
/// and the driver wage spread over the average speed.
fn arc_rate_per_m(vehicle: &VehicleType, metadata: Option<&VehicleMetadataMap>) -> f64 {
    let wage_per_km = metadata
        .and_then(|m| m.get(vehicle.name()))
        .filter(|meta| meta.average_speed_km_per_h > 0.0)
        .map(|meta| meta.hourly_wage / meta.average_speed_km_per_h)
        .unwrap_or(0.0);
    (vehicle.fixed_cost_per_km() + vehicle.per_km_cost() + wage_per_km) / 1000.0
}

/// Loading-labor cost of collecting `qty_kg` with this slot's crew.
fn load_cost(vehicle: &VehicleType, metadata: Option<&VehicleMetadataMap>, qty_kg: i32) -> f64 {
    metadata
        .and_then(|m| m.get(vehicle.name()))
        .map(|meta| meta.hourly_wage * (qty_kg as f64 * meta.loading_time_per_kg) / 3600.0)
        .unwrap_or(0.0)
}

struct Slot {
    vehicle: VehicleType,
    route: Vec<Pickup>,
    rate: f64,
}

impl Slot {
    fn used_kg(&self) -> i32 {
        self.route.iter().map(|p| p.qty_kg).sum()
    }

    fn remaining_kg(&self) -> i32 {
        self.vehicle.capacity_kg() - self.used_kg()
    }
}

/// Stage A: assigns every pickup to a slot and orders each slot's route.
///
/// Cheapest insertion under per-slot arc and loading rates, then a
/// time-budgeted improvement pass (inter-slot relocate plus intra-slot
/// segment reversal). Capacity and compatibility restrict where a pickup
/// may go.
#[allow(clippy::too_many_arguments)]
fn assign_trips(
    matrix: &DistanceMatrix,
    depot: &str,
    sink: &str,
    pickups: &[Pickup],
    slot_vehicles: &[VehicleType],
    master: Option<&MasterData>,
    metadata: Option<&VehicleMetadataMap>,
) -> Result<Vec<TripRoute>, NoSolution> {
    let mut slots: Vec<Slot> = slot_vehicles
        .iter()
        .map(|v| Slot {
            vehicle: v.clone(),
            route: Vec::new(),
            rate: arc_rate_per_m(v, metadata),
        })
        .collect();

    // Heaviest first packs the tight capacities before the easy ones.
    let mut ordered: Vec<&Pickup> = pickups.iter().collect();
    ordered.sort_by(|a, b| b.qty_kg.cmp(&a.qty_kg));

    for pickup in ordered {
        let mut best: Option<(usize, usize, f64)> = None;
        for (si, slot) in slots.iter().enumerate() {
            if slot.remaining_kg() < pickup.qty_kg {
                continue;
            }
            if !vehicle_supports_resource(slot.vehicle.name(), &pickup.kind, master) {
                continue;
            }
            let extra = load_cost(&slot.vehicle, metadata, pickup.qty_kg);
            for pos in 0..=slot.route.len() {
                let Some(delta) = insertion_delta(matrix, depot, sink, slot, pickup, pos) else {
                    continue;
                };
                let cost = delta * slot.rate + extra;
                if best.map_or(true, |(_, _, c)| cost < c) {
                    best = Some((si, pos, cost));
                }
            }
        }
        match best {
            Some((si, pos, _)) => slots[si].route.insert(pos, pickup.clone()),
            None => {
                return Err(NoSolution::new(
                    NoSolutionReason::Infeasible,
                    format!(
                        "pickup '{}' ({} kg of {}) could not be assigned to any trip",
                        pickup.id, pickup.qty_kg, pickup.kind
                    ),
                ))
            }
        }
    }

    improve_assignment(matrix, depot, sink, &mut slots, master, metadata);

    Ok(slots
        .into_iter()
        .filter(|s| !s.route.is_empty())
        .map(|s| {
            let order = slot_order(depot, sink, &s.route);
            let distance_m = matrix.route_distance(&order);
            TripRoute {
                demand_kg: s.used_kg(),
                pickups: s.route,
                vehicle: s.vehicle,
                order,
                distance_m,
            }
        })
        .collect())
}

fn slot_order(depot: &str, sink: &str, route: &[Pickup]) -> Vec<String> {
    let mut order = Vec::with_capacity(route.len() + 2);
    order.push(depot.to_string());
    order.extend(route.iter().map(|p| p.id.clone()));
    order.push(sink.to_string());
    order
}

/// Added distance of inserting `pickup` at `pos`, or `None` when a leg
/// involved is unreachable.
fn insertion_delta(
    matrix: &DistanceMatrix,
    depot: &str,
    sink: &str,
    slot: &Slot,
    pickup: &Pickup,
    pos: usize,
) -> Option<f64> {
    let prev = if pos == 0 {
        depot
    } else {
        slot.route[pos - 1].id.as_str()
    };
    let next = if pos == slot.route.len() {
        sink
    } else {
        slot.route[pos].id.as_str()
    };
    let d_in = matrix.distance(prev, &pickup.id);
    let d_out = matrix.distance(&pickup.id, next);
    if d_in >= UNREACHABLE_COST || d_out >= UNREACHABLE_COST {
        return None;
    }
    let d_skip = matrix.distance(prev, next);
    Some(d_in + d_out - d_skip)
}

/// First-improvement relocate between slots and segment reversal within
/// slots, until no move helps or the budget runs out.
fn improve_assignment(
    matrix: &DistanceMatrix,
    depot: &str,
    sink: &str,
    slots: &mut [Slot],
    master: Option<&MasterData>,
    metadata: Option<&VehicleMetadataMap>,
) {
    let deadline = Instant::now() + STAGE_A_TIME_LIMIT;
    let mut improved = true;
    while improved && Instant::now() < deadline {
        improved = false;

        // Intra-slot reversal: pure distance, the rate is constant.
        for slot in slots.iter_mut() {
            let n = slot.route.len();
            if n < 2 {
                continue;
            }
            let current = matrix.route_distance(&slot_order(depot, sink, &slot.route));
            'rev: for i in 0..n {
                for j in i + 1..n {
                    slot.route[i..=j].reverse();
                    if matrix.route_distance(&slot_order(depot, sink, &slot.route)) < current {
                        improved = true;
                        break 'rev;
                    }
                    slot.route[i..=j].reverse();
                }
            }
        }

        // Inter-slot relocate under each slot's own rates.
        'relocate: for from in 0..slots.len() {
            for i in 0..slots[from].route.len() {
                let pickup = slots[from].route[i].clone();
                let removal_gain = removal_delta(matrix, depot, sink, &slots[from], i)
                    * slots[from].rate
                    + load_cost(&slots[from].vehicle, metadata, pickup.qty_kg);
                for to in 0..slots.len() {
                    if to == from {
                        continue;
                    }
                    if slots[to].remaining_kg() < pickup.qty_kg {
                        continue;
                    }
                    if !vehicle_supports_resource(slots[to].vehicle.name(), &pickup.kind, master)
                    {
                        continue;
                    }
                    let extra = load_cost(&slots[to].vehicle, metadata, pickup.qty_kg);
                    for pos in 0..=slots[to].route.len() {
                        let Some(delta) =
                            insertion_delta(matrix, depot, sink, &slots[to], &pickup, pos)
                        else {
                            continue;
                        };
                        if delta * slots[to].rate + extra < removal_gain {
                            slots[from].route.remove(i);
                            slots[to].route.insert(pos, pickup.clone());
                            improved = true;
                            break 'relocate;
                        }
                    }
                }
            }
        }
    }
}

/// Distance saved by removing the pickup at `pos`.
fn removal_delta(
    matrix: &DistanceMatrix,
    depot: &str,
    sink: &str,
    slot: &Slot,
    pos: usize,
) -> f64 {
    let prev = if pos == 0 {
        depot
    } else {
        slot.route[pos - 1].id.as_str()
    };
    let next = if pos + 1 == slot.route.len() {
        sink
    } else {
        slot.route[pos + 1].id.as_str()
    };
    let id = slot.route[pos].id.as_str();
    matrix.distance(prev, id) + matrix.distance(id, next) - matrix.distance(prev, next)
}

/// Stage B: folds trips onto physical vehicles.
#[allow(clippy::too_many_arguments)]
fn fold_to_physical(
    matrix: &DistanceMatrix,
    depot: &str,
    sink: &str,
    trips: Vec<TripRoute>,
    catalog: &VehicleCatalog,
    master: Option<&MasterData>,
    metadata: Option<&VehicleMetadataMap>,
    config: &SolverConfig,
) -> Result<IntegratedOutcome, InputError> {
    let trip_count = trips.len();

    if trip_count <= MAX_PHYSICAL_VEHICLES {
        let routes: Vec<VehicleRoute> = trips
            .iter()
            .map(|t| close_trip(matrix, depot, t, metadata))
            .collect();
        let cost = aggregate_breakdowns(routes.iter().map(|r| &r.solution.cost));
        let vehicle_count = routes.len();
        return Ok(IntegratedOutcome::Feasible(IntegratedFleetSolution {
            fleet: FleetSolution { routes, cost },
            trips,
            trip_count,
            vehicle_count,
        }));
    }

    if trip_count > MAX_PHYSICAL_VEHICLES + 1 {
        return Ok(infeasible(
            NoSolutionReason::Infeasible,
            format!(
                "{trip_count} trips are required but only {MAX_PHYSICAL_VEHICLES} \
                 physical vehicles are available"
            ),
        ));
    }

    // Exactly one trip over budget: try every pair of trips on every
    // capable vehicle, chaining the second trip from the sink.
    let mut best: Option<(i64, FleetSolution)> = None;
    for a in 0..trip_count {
        for b in 0..trip_count {
            if a == b {
                continue;
            }
            for vehicle in catalog.list() {
                if !can_cover_pair(vehicle, &trips[a], &trips[b], master) {
                    continue;
                }
                let Some(merged) =
                    merge_pair(matrix, depot, sink, &trips[a], &trips[b], vehicle, metadata, config)?
                else {
                    continue;
                };
                let mut routes = vec![merged];
                for (i, t) in trips.iter().enumerate() {
                    if i != a && i != b {
                        routes.push(close_trip(matrix, depot, t, metadata));
                    }
                }
                let cost = aggregate_breakdowns(routes.iter().map(|r| &r.solution.cost));
                let total = cost.total_cost;
                if best.as_ref().map_or(true, |(c, _)| total < *c) {
                    debug!(
                        first = a,
                        second = b,
                        vehicle = vehicle.name(),
                        total_cost = total,
                        "new best trip merge"
                    );
                    best = Some((total, FleetSolution { routes, cost }));
                }
            }
        }
    }

    match best {
        Some((_, fleet)) => {
            let vehicle_count = fleet.routes.len();
            Ok(IntegratedOutcome::Feasible(IntegratedFleetSolution {
                fleet,
                trips,
                trip_count,
                vehicle_count,
            }))
        }
        None => {
            warn!(trip_count, "no feasible trip merge");
            Ok(infeasible(
                NoSolutionReason::Infeasible,
                format!(
                    "{trip_count} trips exceed the {MAX_PHYSICAL_VEHICLES} physical \
                     vehicles and no pair of trips can be merged onto one vehicle"
                ),
            ))
        }
    }
}

/// A physical vehicle can chain two trips when it can carry each trip's
/// load (it unloads at the sink between them) and may serve every
/// resource kind in both.
fn can_cover_pair(
    vehicle: &VehicleType,
    first: &TripRoute,
    second: &TripRoute,
    master: Option<&MasterData>,
) -> bool {
    if vehicle.capacity_kg() < first.demand_kg.max(second.demand_kg) {
        return false;
    }
    first
        .pickups
        .iter()
        .chain(second.pickups.iter())
        .all(|p| vehicle_supports_resource(vehicle.name(), &p.kind, master))
}

/// Re-solves two trips as one chained physical route:
/// `depot → A… → sink → B… → sink → depot`.
#[allow(clippy::too_many_arguments)]
fn merge_pair(
    matrix: &DistanceMatrix,
    depot: &str,
    sink: &str,
    first: &TripRoute,
    second: &TripRoute,
    vehicle: &VehicleType,
    metadata: Option<&VehicleMetadataMap>,
    config: &SolverConfig,
) -> Result<Option<VehicleRoute>, InputError> {
    let vehicles = std::slice::from_ref(vehicle);

    let leg_a =
        solve_path_routing(matrix, depot, sink, &first.pickups, vehicles, metadata, config)?;
    let RoutingOutcome::Feasible(a) = leg_a else {
        return Ok(None);
    };
    let leg_b =
        solve_path_routing(matrix, sink, sink, &second.pickups, vehicles, metadata, config)?;
    let RoutingOutcome::Feasible(b) = leg_b else {
        return Ok(None);
    };

    let mut order = a.order;
    order.extend(b.order.into_iter().skip(1));
    order.push(depot.to_string());
    let total_distance_m = matrix.route_distance(&order);
    if total_distance_m >= UNREACHABLE_COST {
        return Ok(None);
    }

    let demand = first.demand_kg + second.demand_kg;
    let meta = metadata.and_then(|m| m.get(vehicle.name()));
    let cost = CostCalculator::new().evaluate(vehicle, total_distance_m, meta, demand);
    let mut pickup_ids = first.pickup_ids();
    pickup_ids.extend(second.pickup_ids());
    Ok(Some(VehicleRoute {
        vehicle: vehicle.clone(),
        pickup_ids,
        solution: Solution {
            vehicle: vehicle.clone(),
            order,
            total_distance_m,
            cost,
        },
    }))
}

/// Appends the `sink → depot` closing leg and evaluates the trip's final
/// cost with its real demand.
fn close_trip(
    matrix: &DistanceMatrix,
    depot: &str,
    trip: &TripRoute,
    metadata: Option<&VehicleMetadataMap>,
) -> VehicleRoute {
    let mut order = trip.order.clone();
    order.push(depot.to_string());
    let total_distance_m = matrix.route_distance(&order);
    let meta = metadata.and_then(|m| m.get(trip.vehicle.name()));
    let cost =
        CostCalculator::new().evaluate(&trip.vehicle, total_distance_m, meta, trip.demand_kg);
    VehicleRoute {
        vehicle: trip.vehicle.clone(),
        pickup_ids: trip.pickup_ids(),
        solution: Solution {
            vehicle: trip.vehicle.clone(),
            order,
            total_distance_m,
            cost,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{build_distance_matrix, PointSpec};
    use crate::graph::AdjacencyGraph;
    use crate::models::{Compatibility, CompatibilityRecord};
    use std::time::Duration;

    /// depot and sink connected to five pickup nodes, all bidirectional.
    fn star_matrix() -> DistanceMatrix {
        let mut g = AdjacencyGraph::new();
        g.add_node("depot", 35.000, 139.000);
        g.add_node("sink", 35.010, 139.010);
        for i in 1..=5 {
            let id = format!("p{i}");
            g.add_node(id.clone(), 35.0 + 0.001 * i as f64, 139.0);
            g.add_edge_bidirectional("depot", id.clone(), 100.0 * i as f64);
            g.add_edge_bidirectional(id, "sink", 150.0);
        }
        g.add_edge_bidirectional("depot", "sink", 300.0);
        let mut points = vec![PointSpec::node("depot"), PointSpec::node("sink")];
        for i in 1..=5 {
            points.push(PointSpec::node(format!("p{i}")));
        }
        build_distance_matrix(&g, &points).unwrap()
    }

    fn config() -> SolverConfig {
        SolverConfig::default().with_time_limit(Duration::from_millis(100))
    }

    /// Five exclusive vehicle types, one per resource. When `t1_covers_r2`
    /// the first type may also serve the second resource.
    fn exclusive_master(t1_covers_r2: bool) -> MasterData {
        let mut master = MasterData::default();
        for i in 1..=5 {
            let mut record = CompatibilityRecord::default();
            for j in 1..=5 {
                let flag = if i == j || (i == 1 && j == 2 && t1_covers_r2) {
                    Compatibility::Supported
                } else {
                    Compatibility::Unsupported
                };
                record.supports.insert(format!("r{j}"), flag);
            }
            master.compatibility.insert(format!("t{i}"), record);
        }
        master
    }

    fn exclusive_catalog() -> VehicleCatalog {
        let mut catalog = VehicleCatalog::new();
        // t1 is deliberately the most expensive so it never wins a slot
        // for the second resource at selection time.
        for (i, per_km) in [(1, 50.0), (2, 10.0), (3, 20.0), (4, 30.0), (5, 40.0)] {
            catalog.add(VehicleType::new(format!("t{i}"), 100).with_per_km_cost(per_km));
        }
        catalog
    }

    fn five_pickups() -> Vec<Pickup> {
        (1..=5)
            .map(|i| Pickup::new(format!("p{i}"), 80, format!("r{i}")))
            .collect()
    }

    #[test]
    fn test_direct_mapping_within_vehicle_budget() {
        let m = star_matrix();
        let mut catalog = VehicleCatalog::new();
        catalog.add(VehicleType::new("van", 500).with_per_km_cost(30.0));
        let pickups = vec![
            Pickup::new("p1", 100, "paper"),
            Pickup::new("p2", 120, "metal"),
        ];
        let outcome =
            solve_integrated_routing(&m, "depot", "sink", &pickups, &catalog, None, &config())
                .unwrap();
        let s = outcome.solution().expect("feasible");
        assert!(s.vehicle_count <= MAX_PHYSICAL_VEHICLES);
        assert_eq!(s.trip_count, s.trips.len());

        let mut served: Vec<String> = s
            .fleet
            .routes
            .iter()
            .flat_map(|r| r.pickup_ids.iter().cloned())
            .collect();
        served.sort();
        assert_eq!(served, vec!["p1".to_string(), "p2".to_string()]);
        for route in &s.fleet.routes {
            let order = &route.solution.order;
            assert_eq!(order.first().map(String::as_str), Some("depot"));
            assert_eq!(order.last().map(String::as_str), Some("depot"));
            assert_eq!(order[order.len() - 2], "sink");
        }
    }

    #[test]
    fn test_depot_equal_sink_is_infeasible() {
        let m = star_matrix();
        let mut catalog = VehicleCatalog::new();
        catalog.add(VehicleType::new("van", 500));
        let outcome = solve_integrated_routing(
            &m,
            "depot",
            "depot",
            &[Pickup::new("p1", 10, "paper")],
            &catalog,
            None,
            &config(),
        )
        .unwrap();
        assert_eq!(
            outcome.failure().unwrap().reason,
            NoSolutionReason::Infeasible
        );
    }

    #[test]
    fn test_fallback_tier_fails_fast() {
        let m = star_matrix();
        let mut catalog = VehicleCatalog::new();
        catalog.add(VehicleType::new("van", 500));
        let outcome = solve_integrated_routing(
            &m,
            "depot",
            "sink",
            &[Pickup::new("p1", 10, "paper")],
            &catalog,
            None,
            &SolverConfig::fallback(),
        )
        .unwrap();
        let failure = outcome.failure().expect("no fallback tier");
        assert_eq!(failure.reason, NoSolutionReason::Infeasible);
        assert!(failure.message.contains("capability"));
    }

    #[test]
    fn test_resource_without_vehicle_fails_fast() {
        let m = star_matrix();
        let catalog = exclusive_catalog();
        let mut master = exclusive_master(false);
        // r6 is supported by nobody; leniency does not apply to explicit
        // Unsupported flags.
        for record in master.compatibility.values_mut() {
            record
                .supports
                .insert("r6".to_string(), Compatibility::Unsupported);
        }
        let outcome = solve_integrated_routing(
            &m,
            "depot",
            "sink",
            &[Pickup::new("p1", 10, "r6")],
            &catalog,
            Some(&master),
            &config(),
        )
        .unwrap();
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.reason, NoSolutionReason::Infeasible);
        assert!(failure.message.contains("r6"));
    }

    #[test]
    fn test_five_trips_merge_onto_four_vehicles() {
        let m = star_matrix();
        let catalog = exclusive_catalog();
        let master = exclusive_master(true);
        let outcome = solve_integrated_routing(
            &m,
            "depot",
            "sink",
            &five_pickups(),
            &catalog,
            Some(&master),
            &config(),
        )
        .unwrap();
        let s = outcome.solution().expect("mergeable");
        assert_eq!(s.trip_count, 5);
        assert_eq!(s.vehicle_count, 4);
        assert_eq!(s.fleet.routes.len(), 4);

        // The merged route carries both mergeable pickups and passes the
        // sink twice before returning to depot.
        let merged = s
            .fleet
            .routes
            .iter()
            .find(|r| r.pickup_ids.len() == 2)
            .expect("one merged route");
        let sink_visits = merged
            .solution
            .order
            .iter()
            .filter(|id| id.as_str() == "sink")
            .count();
        assert_eq!(sink_visits, 2);
        assert_eq!(merged.solution.order.last().map(String::as_str), Some("depot"));
    }

    #[test]
    fn test_five_trips_without_merge_candidate_fail() {
        let m = star_matrix();
        let catalog = exclusive_catalog();
        let master = exclusive_master(false);
        let outcome = solve_integrated_routing(
            &m,
            "depot",
            "sink",
            &five_pickups(),
            &catalog,
            Some(&master),
            &config(),
        )
        .unwrap();
        let failure = outcome.failure().expect("no merge possible");
        assert_eq!(failure.reason, NoSolutionReason::Infeasible);
        assert!(failure.message.contains('5'));
    }

    #[test]
    fn test_combined_trip_capacity_rejection() {
        let m = star_matrix();
        let mut catalog = VehicleCatalog::new();
        catalog.add(VehicleType::new("mini", 50).with_per_km_cost(10.0));
        // 5 trips of 50 kg each cannot carry 300 kg.
        let outcome = solve_integrated_routing(
            &m,
            "depot",
            "sink",
            &[Pickup::new("p1", 300, "paper")],
            &catalog,
            None,
            &config(),
        )
        .unwrap();
        assert_eq!(
            outcome.failure().unwrap().reason,
            NoSolutionReason::Capacity
        );
    }
}

