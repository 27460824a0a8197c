//! Vehicle type definitions with capacity and tariff coefficients.

use serde::{Deserialize, Serialize};

/// A candidate vehicle type for collection routes.
///
/// All cost coefficients are nonnegative; the constructor clamps negative
/// inputs to zero rather than failing, since master data occasionally
/// carries placeholder values.
///
/// # Examples
///
/// ```
/// use cartage::models::VehicleType;
///
/// let v = VehicleType::new("2t truck", 2000)
///     .with_fixed_cost(1000.0)
///     .with_per_km_cost(50.0);
/// assert_eq!(v.capacity_kg(), 2000);
/// assert_eq!(v.distance_cost(450.0), 22.5); // 0.45 km at 50/km
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleType {
    name: String,
    capacity_kg: i32,
    fixed_cost: f64,
    per_km_cost: f64,
    fixed_cost_per_km: f64,
    energy_consumption_kwh_per_km: f64,
}

impl VehicleType {
    /// Creates a vehicle type with the given name and capacity.
    ///
    /// Defaults: no fixed cost, no per-km cost, no amortized fixed rate,
    /// no energy consumption.
    pub fn new(name: impl Into<String>, capacity_kg: i32) -> Self {
        Self {
            name: name.into(),
            capacity_kg: capacity_kg.max(0),
            fixed_cost: 0.0,
            per_km_cost: 0.0,
            fixed_cost_per_km: 0.0,
            energy_consumption_kwh_per_km: 0.0,
        }
    }

    /// Sets the distance-independent dispatch cost (currency per route).
    pub fn with_fixed_cost(mut self, cost: f64) -> Self {
        self.fixed_cost = cost.max(0.0);
        self
    }

    /// Sets the simple variable rate (currency per km).
    pub fn with_per_km_cost(mut self, cost: f64) -> Self {
        self.per_km_cost = cost.max(0.0);
        self
    }

    /// Sets the amortized annual fixed cost expressed per km.
    pub fn with_fixed_cost_per_km(mut self, cost: f64) -> Self {
        self.fixed_cost_per_km = cost.max(0.0);
        self
    }

    /// Sets the energy consumption rate (kWh per km).
    pub fn with_energy_consumption(mut self, kwh_per_km: f64) -> Self {
        self.energy_consumption_kwh_per_km = kwh_per_km.max(0.0);
        self
    }

    /// Unique vehicle type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maximum payload in kilograms.
    pub fn capacity_kg(&self) -> i32 {
        self.capacity_kg
    }

    /// Distance-independent dispatch cost.
    pub fn fixed_cost(&self) -> f64 {
        self.fixed_cost
    }

    /// Simple variable rate (currency per km).
    pub fn per_km_cost(&self) -> f64 {
        self.per_km_cost
    }

    /// Amortized annual fixed cost per km.
    pub fn fixed_cost_per_km(&self) -> f64 {
        self.fixed_cost_per_km
    }

    /// Energy consumption rate (kWh per km).
    pub fn energy_consumption_kwh_per_km(&self) -> f64 {
        self.energy_consumption_kwh_per_km
    }

    /// Variable cost for a distance given in metres (unrounded).
    pub fn distance_cost(&self, distance_m: f64) -> f64 {
        self.per_km_cost * (distance_m / 1000.0)
    }

    /// Fixed cost that scales with travelled distance (unrounded).
    pub fn fixed_cost_for_distance(&self, distance_m: f64) -> f64 {
        self.fixed_cost + self.fixed_cost_per_km * (distance_m / 1000.0)
    }

    /// Energy consumed over a distance given in metres.
    pub fn energy_consumption_kwh(&self, distance_m: f64) -> f64 {
        self.energy_consumption_kwh_per_km * (distance_m / 1000.0)
    }
}
