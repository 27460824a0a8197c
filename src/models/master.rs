//! Master-data types: rich vehicle candidates and the vehicle/resource
//! compatibility table.
//!
//! The master-data collaborator owns the JSON files these are loaded from;
//! this crate only defines the shapes it consumes.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Whether a vehicle type may carry a resource type.
///
/// Missing master-data entries map to [`Compatibility::Unknown`], never to
/// a silent boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compatibility {
    /// Explicitly marked as supported.
    Supported,
    /// Explicitly marked as unsupported.
    Unsupported,
    /// No master-data entry for this pair.
    Unknown,
}

impl Compatibility {
    /// Leniency rule: `Unknown` counts as supported.
    ///
    /// Master data is frequently incomplete; treating missing entries as
    /// incompatible would over-restrict planning. Only an explicit
    /// `Unsupported` flag excludes a vehicle. Callers that need the strict
    /// reading (explicit support only) match on the enum instead.
    pub fn permits_by_leniency(self) -> bool {
        !matches!(self, Compatibility::Unsupported)
    }
}

/// Compatibility flags and free-text requirements for one vehicle type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompatibilityRecord {
    /// Resource name → tri-state flag.
    pub supports: HashMap<String, Compatibility>,
    /// Resource name → requirement note (e.g. why a pairing is excluded).
    pub requirements: HashMap<String, String>,
}

impl CompatibilityRecord {
    /// Flag for a resource, `Unknown` when absent.
    pub fn support_for(&self, resource: &str) -> Compatibility {
        self.supports
            .get(resource)
            .copied()
            .unwrap_or(Compatibility::Unknown)
    }
}

/// Rich vehicle metadata from the master-data collaborator.
///
/// When present this is the source of truth for itemized cost detail; the
/// plain [`VehicleType`](super::VehicleType) coefficients are the fallback.
/// Cost breakdowns are ordered lists so itemized output order is stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehicleCandidate {
    /// Vehicle type name, matching the catalog entry.
    pub name: String,
    /// Named variable cost items in currency per km. The cost calculator
    /// reads the canonical `fuel` and `damage` entries.
    pub variable_cost_breakdown: Vec<(String, f64)>,
    /// Named annual fixed cost items in 10,000-currency-units per year.
    pub fixed_cost_breakdown: Vec<(String, f64)>,
    /// Annual distance over which fixed items are amortized.
    pub annual_distance_km: f64,
    /// Driver wage in currency per hour.
    pub hourly_wage: f64,
    /// Average travel speed in km/h, for driver labor cost.
    pub average_speed_km_per_h: f64,
    /// Loading time in seconds per kilogram, for loading labor cost.
    pub loading_time_per_kg: f64,
}

impl VehicleCandidate {
    /// Creates an empty candidate for the named vehicle.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Value of a variable cost item, if present.
    pub fn variable_item(&self, key: &str) -> Option<f64> {
        self.variable_cost_breakdown
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }
}

/// Per-vehicle metadata lookup used by the cost calculator and solvers.
pub type VehicleMetadataMap = HashMap<String, VehicleCandidate>;

/// Processed master data: vehicle candidates, the compatibility table, and
/// the set of known resource names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MasterData {
    /// Rich vehicle candidates.
    pub vehicles: Vec<VehicleCandidate>,
    /// Vehicle name → compatibility record.
    pub compatibility: HashMap<String, CompatibilityRecord>,
    /// Names of resources the master data knows about.
    pub resources: BTreeSet<String>,
}

impl MasterData {
    /// Tri-state compatibility for a (vehicle, resource) pair. Pairs with
    /// no recorded flag are `Unknown`.
    pub fn compatibility_of(&self, vehicle: &str, resource: &str) -> Compatibility {
        match self.compatibility.get(vehicle) {
            Some(record) => record.support_for(resource),
            None => Compatibility::Unknown,
        }
    }

    /// Metadata map keyed by vehicle name.
    pub fn metadata_map(&self) -> VehicleMetadataMap {
        self.vehicles
            .iter()
            .map(|c| (c.name.clone(), c.clone()))
            .collect()
    }
}

/// Whether `vehicle` may serve `resource` under the leniency rule.
///
/// With no master data at all, every pairing is allowed.
pub fn vehicle_supports_resource(
    vehicle: &str,
    resource: &str,
    master: Option<&MasterData>,
) -> bool {
    if resource.is_empty() {
        return true;
    }
    match master {
        Some(m) => m.compatibility_of(vehicle, resource).permits_by_leniency(),
        None => true,
    }
}
