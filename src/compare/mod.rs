//! eCOM-10 alternative-fleet comparison.
//!
//! A concrete scenario built from the general primitives: partition the
//! pickups by explicit eCOM-10 compatibility, validate the compatible
//! subset against the vehicle's fixed constraints, hand incompatible
//! resources to conventional alternatives, solve the fleet, and report
//! structured deltas against a baseline plan.
//!
//! Unlike the general planner, the partition here requires an explicit
//! `Supported` flag: an experimental vehicle gets no benefit of the
//! doubt from missing master data.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::distance::DistanceMatrix;
use crate::models::{
    Compatibility, FleetOutcome, FleetSolution, InputError, MasterData, NoSolution,
    NoSolutionReason, Pickup, VehicleCatalog, VehicleType,
};
use crate::planner::vehicle_cost_score;
use crate::solver::{solve_fleet_routing, Assignment, SolverConfig};

/// Catalog name of the electric collection vehicle under evaluation.
pub const ECOM10_NAME: &str = "eCOM-10";

/// Payload limit of the eCOM-10 in kilograms.
pub const ECOM10_MAX_CAPACITY_KG: i32 = 1000;

/// Single-charge range of the eCOM-10 in metres.
pub const ECOM10_MAX_RANGE_M: f64 = 30_000.0;

/// Top speed of the eCOM-10 in km/h, used for the travel-time estimate.
pub const ECOM10_MAX_SPEED_KMH: f64 = 19.0;

/// Energy consumption of the eCOM-10 in kWh per km.
pub const ECOM10_ENERGY_CONSUMPTION_KWH_PER_KM: f64 = 0.5;

/// Splits pickups into eCOM-10-compatible and incompatible subsets.
///
/// Requires an explicit `Supported` flag in the master data; `Unknown`
/// and missing entries land in the incompatible subset.
pub fn partition_by_ecom10_support(
    pickups: &[Pickup],
    master: Option<&MasterData>,
) -> (Vec<Pickup>, Vec<Pickup>) {
    let mut compatible = Vec::new();
    let mut incompatible = Vec::new();
    for p in pickups {
        let supported = master
            .map(|m| m.compatibility_of(ECOM10_NAME, &p.kind) == Compatibility::Supported)
            .unwrap_or(false);
        if supported {
            compatible.push(p.clone());
        } else {
            incompatible.push(p.clone());
        }
    }
    (compatible, incompatible)
}

/// Constraint check of a planned eCOM-10 load and route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ecom10Validation {
    /// Violated constraints, empty when the plan fits.
    pub warnings: Vec<String>,
    /// Estimated route travel time at top speed, in hours.
    pub travel_time_h: f64,
}

impl Ecom10Validation {
    /// True when no constraint is violated.
    pub fn is_ok(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Validates a load and route distance against the eCOM-10 constraints.
pub fn validate_ecom10_constraints(total_demand_kg: i32, route_distance_m: f64) -> Ecom10Validation {
    let mut warnings = Vec::new();
    if total_demand_kg > ECOM10_MAX_CAPACITY_KG {
        warnings.push(format!(
            "load {total_demand_kg} kg exceeds the eCOM-10 capacity of \
             {ECOM10_MAX_CAPACITY_KG} kg"
        ));
    }
    if route_distance_m > ECOM10_MAX_RANGE_M {
        warnings.push(format!(
            "route distance {route_distance_m:.0} m exceeds the eCOM-10 range of \
             {ECOM10_MAX_RANGE_M:.0} m"
        ));
    }
    let travel_time_h = (route_distance_m / 1000.0) / ECOM10_MAX_SPEED_KMH;
    Ecom10Validation {
        warnings,
        travel_time_h,
    }
}

/// Catalog vehicles other than the eCOM-10 that are explicitly
/// compatible with `resource` and can carry `qty_kg`, cheapest cost
/// score first.
pub fn find_alternative_vehicles<'a>(
    resource: &str,
    qty_kg: i32,
    catalog: &'a VehicleCatalog,
    master: Option<&MasterData>,
) -> Vec<&'a VehicleType> {
    let mut found: Vec<&VehicleType> = catalog
        .with_capacity_for(qty_kg)
        .into_iter()
        .filter(|v| v.name() != ECOM10_NAME)
        .filter(|v| {
            master
                .map(|m| m.compatibility_of(v.name(), resource) == Compatibility::Supported)
                .unwrap_or(false)
        })
        .collect();
    found.sort_by(|a, b| {
        vehicle_cost_score(a)
            .partial_cmp(&vehicle_cost_score(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    found
}

/// An eCOM-10-based fleet plan with its constraint validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ecom10Alternative {
    /// The solved fleet, or why it could not be solved.
    pub outcome: FleetOutcome,
    /// Constraint check of the eCOM-10 route, when one was planned.
    pub validation: Option<Ecom10Validation>,
}

/// Builds and solves the eCOM-10 alternative plan.
///
/// Compatible pickups ride the eCOM-10; each incompatible resource group
/// goes to its cheapest explicitly-compatible conventional vehicle. A
/// missing eCOM-10 catalog entry or a group without an alternative is an
/// infeasible outcome, not an error.
#[allow(clippy::too_many_arguments)]
pub fn compute_ecom10_alternative(
    matrix: &DistanceMatrix,
    depot: &str,
    sink: &str,
    pickups: &[Pickup],
    catalog: &VehicleCatalog,
    master: Option<&MasterData>,
    config: &SolverConfig,
) -> Result<Ecom10Alternative, InputError> {
    info!(pickups = pickups.len(), "computing eCOM-10 alternative plan");
    let Some(ecom10) = catalog.get(ECOM10_NAME) else {
        return Ok(Ecom10Alternative {
            outcome: FleetOutcome::Infeasible(NoSolution::new(
                NoSolutionReason::Infeasible,
                format!("vehicle '{ECOM10_NAME}' is not in the catalog"),
            )),
            validation: None,
        });
    };

    let (compatible, incompatible) = partition_by_ecom10_support(pickups, master);
    debug!(
        compatible = compatible.len(),
        incompatible = incompatible.len(),
        "partitioned pickups"
    );

    let mut assignments = Vec::new();
    if !compatible.is_empty() {
        assignments.push(Assignment::new(ecom10.clone(), compatible.clone()));
    }

    let mut kinds: Vec<String> = incompatible.iter().map(|p| p.kind.clone()).collect();
    kinds.sort();
    kinds.dedup();
    for kind in kinds {
        let group: Vec<Pickup> = incompatible
            .iter()
            .filter(|p| p.kind == kind)
            .cloned()
            .collect();
        let qty: i32 = group.iter().map(|p| p.qty_kg).sum();
        let Some(alternative) = find_alternative_vehicles(&kind, qty, catalog, master)
            .into_iter()
            .next()
        else {
            return Ok(Ecom10Alternative {
                outcome: FleetOutcome::Infeasible(NoSolution::new(
                    NoSolutionReason::Infeasible,
                    format!("no alternative vehicle for resource '{kind}' ({qty} kg)"),
                )),
                validation: None,
            });
        };
        assignments.push(Assignment::new(alternative.clone(), group));
    }

    let metadata = master.map(MasterData::metadata_map);
    let outcome = solve_fleet_routing(
        matrix,
        depot,
        sink,
        &assignments,
        metadata.as_ref(),
        config,
    )?;

    let validation = outcome.fleet().and_then(|fleet| {
        fleet
            .routes
            .iter()
            .find(|r| r.vehicle.name() == ECOM10_NAME)
            .map(|r| {
                let demand: i32 = compatible.iter().map(|p| p.qty_kg).sum();
                validate_ecom10_constraints(demand, r.total_distance_m())
            })
    });

    Ok(Ecom10Alternative {
        outcome,
        validation,
    })
}

/// Candidate-minus-baseline deltas. Negative values mean the candidate
/// plan is shorter, cheaper, or uses less energy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonDeltas {
    /// Distance difference in metres.
    pub distance_m: f64,
    /// Total cost difference in currency units.
    pub total_cost: i64,
    /// Energy difference in kWh.
    pub energy_kwh: f64,
}

/// Structured comparison of a candidate fleet plan against a baseline.
pub fn compare_to_baseline(candidate: &FleetSolution, baseline: &FleetSolution) -> ComparisonDeltas {
    ComparisonDeltas {
        distance_m: candidate.total_distance_m() - baseline.total_distance_m(),
        total_cost: candidate.total_cost() - baseline.total_cost(),
        energy_kwh: fleet_energy_kwh(candidate) - fleet_energy_kwh(baseline),
    }
}

fn fleet_energy_kwh(fleet: &FleetSolution) -> f64 {
    fleet
        .routes
        .iter()
        .filter_map(|r| r.solution.cost.energy_kwh)
        .sum()
}
