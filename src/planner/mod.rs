//! Pre-solver vehicle allocation.
//!
//! Decides which vehicle serves which resource group before any precise
//! routing runs. Selection uses a marginal-cost proxy because total
//! distance is unknown at this stage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{
    vehicle_supports_resource, MasterData, Pickup, VehicleCatalog, VehicleType,
};
use crate::solver::Assignment;

/// One resource group and the vehicle chosen for it, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationGroup {
    /// Resource kind shared by the group's pickups.
    pub resource: String,
    /// Pickups of this kind, in input order.
    pub pickups: Vec<Pickup>,
    /// Summed demand of the group in kilograms.
    pub total_demand_kg: i32,
    /// Selected vehicle; `None` when no candidate passed the filters.
    pub vehicle: Option<VehicleType>,
}

/// The planner's output: per-resource groups plus human-readable
/// warnings for every group left without a vehicle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationPlan {
    /// Groups in resource-name order.
    pub groups: Vec<AllocationGroup>,
    /// Constructive warnings, surfaced verbatim by the UI layer.
    pub warnings: Vec<String>,
}

impl AllocationPlan {
    /// True when every group received a vehicle.
    pub fn is_complete(&self) -> bool {
        self.groups.iter().all(|g| g.vehicle.is_some())
    }

    /// Solver assignments for the allocated groups. Unallocated groups
    /// are skipped; check [`AllocationPlan::is_complete`] first when a
    /// full plan is required.
    pub fn assignments(&self) -> Vec<Assignment> {
        self.groups
            .iter()
            .filter_map(|g| {
                g.vehicle
                    .as_ref()
                    .map(|v| Assignment::new(v.clone(), g.pickups.clone()))
            })
            .collect()
    }
}

/// Marginal-cost proxy used to rank vehicles before distances are known.
pub fn vehicle_cost_score(vehicle: &VehicleType) -> f64 {
    vehicle.per_km_cost() + vehicle.fixed_cost_per_km()
}

/// Groups pickups by resource kind and picks the cheapest suitable
/// vehicle per group.
///
/// A vehicle is suitable when its compatibility declaration permits the
/// resource (unknown or missing entries count as permitted) and its
/// capacity covers the group's total demand. Among suitable vehicles the
/// lowest [`vehicle_cost_score`] wins, ties broken by catalog order.
///
/// Groups without a suitable vehicle stay in the plan with
/// `vehicle: None` and a warning that names the blocking condition.
pub fn plan_vehicle_allocations(
    pickups: &[Pickup],
    catalog: &VehicleCatalog,
    master: Option<&MasterData>,
) -> AllocationPlan {
    let mut by_kind: BTreeMap<String, Vec<Pickup>> = BTreeMap::new();
    for p in pickups {
        by_kind.entry(p.kind.clone()).or_default().push(p.clone());
    }

    let mut groups = Vec::with_capacity(by_kind.len());
    let mut warnings = Vec::new();

    for (resource, group_pickups) in by_kind {
        let total_demand_kg: i32 = group_pickups.iter().map(|p| p.qty_kg).sum();
        let compatible: Vec<&VehicleType> = catalog
            .list()
            .into_iter()
            .filter(|v| vehicle_supports_resource(v.name(), &resource, master))
            .collect();

        let vehicle = if compatible.is_empty() {
            warn!(resource = %resource, "no compatible vehicle");
            warnings.push(format!(
                "no compatible vehicle for resource '{resource}'"
            ));
            None
        } else {
            let fitting: Vec<&VehicleType> = compatible
                .iter()
                .copied()
                .filter(|v| v.capacity_kg() >= total_demand_kg)
                .collect();
            if fitting.is_empty() {
                let max_capacity = compatible
                    .iter()
                    .map(|v| v.capacity_kg())
                    .max()
                    .unwrap_or(0);
                warnings.push(format!(
                    "total weight {total_demand_kg} kg of resource '{resource}' exceeds \
                     the max available capacity {max_capacity} kg (short by {} kg); \
                     consider splitting the load",
                    total_demand_kg - max_capacity
                ));
                None
            } else {
                let mut best: Option<&VehicleType> = None;
                for v in fitting {
                    let better = match best {
                        None => true,
                        Some(b) => vehicle_cost_score(v) < vehicle_cost_score(b),
                    };
                    if better {
                        best = Some(v);
                    }
                }
                debug!(
                    resource = %resource,
                    vehicle = best.map(VehicleType::name),
                    demand_kg = total_demand_kg,
                    "allocated group"
                );
                best.cloned()
            }
        };

        groups.push(AllocationGroup {
            resource,
            pickups: group_pickups,
            total_demand_kg,
            vehicle,
        });
    }

    AllocationPlan { groups, warnings }
}
