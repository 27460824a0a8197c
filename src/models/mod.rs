//! Domain model types for resource-collection routing.
//!
//! Provides the core value objects: pickups with resource kinds and
//! quantities, vehicle types with tariff coefficients, rich master-data
//! candidates with a tri-state compatibility table, and the solution /
//! failure types every solver returns.

mod catalog;
mod master;
mod pickup;
mod solution;
mod vehicle;

pub use catalog::VehicleCatalog;
pub use master::{
    vehicle_supports_resource, Compatibility, CompatibilityRecord, MasterData, VehicleCandidate,
    VehicleMetadataMap,
};
pub use pickup::{required_resources, total_demand_kg, validate_pickups, InputError, Pickup};
pub use solution::{
    FleetOutcome, FleetSolution, NoSolution, NoSolutionReason, RoutingOutcome, Solution,
    VehicleRoute,
};
pub use vehicle::VehicleType;
