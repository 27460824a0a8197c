//! Insertion-ordered catalog of vehicle type definitions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::VehicleType;

/// Stores vehicle type definitions keyed by name, preserving the order in
/// which they were first added. Order matters downstream: the solver breaks
/// cost ties by input order.
///
/// # Examples
///
/// ```
/// use cartage::models::{VehicleCatalog, VehicleType};
///
/// let mut catalog = VehicleCatalog::new();
/// catalog.add(VehicleType::new("light van", 350));
/// catalog.add(VehicleType::new("2t truck", 2000));
/// assert_eq!(catalog.len(), 2);
/// assert_eq!(catalog.get("2t truck").unwrap().capacity_kg(), 2000);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehicleCatalog {
    vehicles: HashMap<String, VehicleType>,
    order: Vec<String>,
}

impl VehicleCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a vehicle definition.
    pub fn add(&mut self, vehicle: VehicleType) {
        let name = vehicle.name().to_string();
        if !self.vehicles.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.vehicles.insert(name, vehicle);
    }

    /// Removes a vehicle by name. Missing names are ignored.
    pub fn remove(&mut self, name: &str) {
        if self.vehicles.remove(name).is_some() {
            self.order.retain(|n| n != name);
        }
    }

    /// Looks up a vehicle by name.
    pub fn get(&self, name: &str) -> Option<&VehicleType> {
        self.vehicles.get(name)
    }

    /// Returns vehicles in insertion order.
    pub fn list(&self) -> Vec<&VehicleType> {
        self.order.iter().filter_map(|n| self.vehicles.get(n)).collect()
    }

    /// Vehicles whose capacity can cover the given demand, in insertion order.
    pub fn with_capacity_for(&self, total_demand_kg: i32) -> Vec<&VehicleType> {
        let demand = total_demand_kg.max(0);
        self.list()
            .into_iter()
            .filter(|v| v.capacity_kg() >= demand)
            .collect()
    }

    /// Number of vehicles in the catalog.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when no vehicle is registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Removes all vehicles.
    pub fn clear(&mut self) {
        self.vehicles.clear();
        self.order.clear();
    }
}
