//! Decimal-exact cost evaluation.
//!
//! The one place that turns (vehicle, distance, optional rich metadata,
//! total demand) into a monetary breakdown. The central property: the sum
//! of itemized components equals the reported category total, exactly.
//! Each item is rounded to the currency unit on its own and the category
//! total is defined as the sum of those already-rounded items — rounding a
//! rate first and a total independently would drift by a few units.
//!
//! Currency math runs on [`rust_decimal::Decimal`] built from the float's
//! shortest display form, with round-half-up at the currency unit, so
//! binary-float artifacts never reach the currency boundary.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::models::{VehicleCandidate, VehicleType};

/// Seconds per hour, for loading-labor conversion.
const SECONDS_PER_HOUR: u32 = 3600;

/// Conversion from the fixed-breakdown unit (10,000 currency units) to
/// currency units.
const MAN_UNIT: u32 = 10_000;

/// An itemized entry of a [`CostBreakdown`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostItem {
    /// Item key, e.g. `variable.fuel` or `fixed.base`.
    pub name: String,
    /// Tagged value; only currency amounts participate in sums.
    pub value: CostValue,
}

/// Distinguishes summable currency amounts from display-only rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CostValue {
    /// A rounded amount in currency units. Summable.
    Currency(i64),
    /// A reference rate (e.g. currency per kg). Never summed.
    ReferenceRate(f64),
}

impl CostItem {
    /// Creates a currency-amount item.
    pub fn currency(name: impl Into<String>, amount: i64) -> Self {
        Self {
            name: name.into(),
            value: CostValue::Currency(amount),
        }
    }

    /// Creates a reference-rate item.
    pub fn reference_rate(name: impl Into<String>, rate: f64) -> Self {
        Self {
            name: name.into(),
            value: CostValue::ReferenceRate(rate),
        }
    }

    /// The currency amount, if this item is one.
    pub fn currency_amount(&self) -> Option<i64> {
        match self.value {
            CostValue::Currency(v) => Some(v),
            CostValue::ReferenceRate(_) => None,
        }
    }
}

/// A route's monetary breakdown. All currency fields are integers after
/// rounding; `total_cost == fixed_cost + distance_cost` always holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Distance-independent cost plus amortized fixed items.
    pub fixed_cost: i64,
    /// Distance-proportional cost (variable items).
    pub distance_cost: i64,
    /// Always `fixed_cost + distance_cost`.
    pub total_cost: i64,
    /// Route distance in kilometres.
    pub distance_km: f64,
    /// Energy consumed, when the vehicle has an energy rate.
    pub energy_kwh: Option<f64>,
    /// Ordered itemized entries (currency amounts and reference rates).
    pub items: Vec<CostItem>,
}

impl CostBreakdown {
    /// Sum of currency items whose name starts with `prefix`.
    pub fn currency_sum(&self, prefix: &str) -> i64 {
        self.items
            .iter()
            .filter(|i| i.name.starts_with(prefix))
            .filter_map(|i| i.currency_amount())
            .sum()
    }
}

/// Evaluates vehicle costs consistently across the whole crate.
///
/// # Examples
///
/// ```
/// use cartage::cost::CostCalculator;
/// use cartage::models::VehicleType;
///
/// let vehicle = VehicleType::new("2t truck", 2000)
///     .with_fixed_cost(1000.0)
///     .with_per_km_cost(50.0);
/// let breakdown = CostCalculator::new().evaluate(&vehicle, 450.0, None, 0);
/// assert_eq!(breakdown.distance_cost, 23); // round-half-up of 22.5
/// assert_eq!(breakdown.fixed_cost, 1000);
/// assert_eq!(breakdown.total_cost, 1023);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CostCalculator;

impl CostCalculator {
    /// Creates a calculator.
    pub fn new() -> Self {
        Self
    }

    /// Computes the breakdown for `vehicle` travelling `distance_m` metres.
    ///
    /// With `metadata` present, variable cost is restricted to the
    /// canonical items (fuel, damage, driver labor, loading labor) and
    /// fixed cost to the amortized annual items plus the vehicle's flat
    /// fee; each item is rounded individually and the category totals are
    /// the sums of the rounded items. Without metadata the plain
    /// [`VehicleType`] coefficients apply.
    pub fn evaluate(
        &self,
        vehicle: &VehicleType,
        distance_m: f64,
        metadata: Option<&VehicleCandidate>,
        total_demand_kg: i32,
    ) -> CostBreakdown {
        let distance_km = to_decimal(distance_m) / Decimal::from(1000);
        let mut items: Vec<CostItem> = Vec::new();

        let (fixed_cost, distance_cost) = match metadata {
            Some(meta) => {
                let variable = self.variable_items(meta, distance_km, total_demand_kg.max(0));
                let mut fixed = self.fixed_items(meta, distance_km);

                let base_fixed = round_currency(to_decimal(vehicle.fixed_cost()));
                if base_fixed != 0 {
                    fixed.push(CostItem::currency("fixed.base", base_fixed));
                }

                let distance_cost = if variable.iter().any(|i| i.currency_amount().is_some()) {
                    variable.iter().filter_map(|i| i.currency_amount()).sum()
                } else {
                    round_currency(to_decimal(vehicle.per_km_cost()) * distance_km)
                };
                let fixed_cost = if fixed.is_empty() {
                    round_currency(
                        to_decimal(vehicle.fixed_cost())
                            + to_decimal(vehicle.fixed_cost_per_km()) * distance_km,
                    )
                } else {
                    fixed.iter().filter_map(|i| i.currency_amount()).sum()
                };

                items.extend(variable);
                items.extend(fixed);
                (fixed_cost, distance_cost)
            }
            None => {
                let fixed_cost = round_currency(
                    to_decimal(vehicle.fixed_cost())
                        + to_decimal(vehicle.fixed_cost_per_km()) * distance_km,
                );
                let distance_cost = round_currency(to_decimal(vehicle.per_km_cost()) * distance_km);
                (fixed_cost, distance_cost)
            }
        };

        let energy_kwh = if vehicle.energy_consumption_kwh_per_km() > 0.0 {
            let kwh = to_decimal(vehicle.energy_consumption_kwh_per_km()) * distance_km;
            // 3-dp banker's rounding, matching the rest of the reporting chain.
            kwh.round_dp(3).to_f64()
        } else {
            None
        };

        CostBreakdown {
            fixed_cost,
            distance_cost,
            total_cost: fixed_cost + distance_cost,
            distance_km: distance_km.to_f64().unwrap_or(0.0),
            energy_kwh,
            items,
        }
    }

    /// Canonical variable items: fuel, damage (both currency/km), driver
    /// labor (wage / speed × distance), loading labor (wage × demand ×
    /// seconds-per-kg / 3600). Each rounded on its own.
    fn variable_items(
        &self,
        meta: &VehicleCandidate,
        distance_km: Decimal,
        total_demand_kg: i32,
    ) -> Vec<CostItem> {
        let mut items = Vec::new();

        for key in ["fuel", "damage"] {
            if let Some(rate) = meta.variable_item(key) {
                let amount = round_currency(to_decimal(rate) * distance_km);
                items.push(CostItem::currency(format!("variable.{key}"), amount));
            }
        }

        let wage = meta.hourly_wage.max(0.0);
        let speed = meta.average_speed_km_per_h.max(0.0);
        if wage > 0.0 && speed > 0.0 && distance_km > Decimal::ZERO {
            let hours = distance_km / to_decimal(speed);
            let amount = round_currency(to_decimal(wage) * hours);
            items.push(CostItem::currency("variable.driver_labor", amount));
        }

        let sec_per_kg = meta.loading_time_per_kg.max(0.0);
        if wage > 0.0 && sec_per_kg > 0.0 && total_demand_kg > 0 {
            let hours = (Decimal::from(total_demand_kg) * to_decimal(sec_per_kg))
                / Decimal::from(SECONDS_PER_HOUR);
            let amount = round_currency(to_decimal(wage) * hours);
            items.push(CostItem::currency("variable.loading_labor", amount));

            let per_kg = (to_decimal(wage) * to_decimal(sec_per_kg))
                / Decimal::from(SECONDS_PER_HOUR);
            items.push(CostItem::reference_rate(
                "variable.loading_labor_per_kg",
                per_kg.to_f64().unwrap_or(0.0),
            ));
        }

        items
    }

    /// Amortized annual fixed items: 10,000-currency-units/year → currency
    /// per km via the annual distance, then scaled by the route distance.
    fn fixed_items(&self, meta: &VehicleCandidate, distance_km: Decimal) -> Vec<CostItem> {
        let mut items = Vec::new();
        if meta.annual_distance_km <= 0.0 {
            return items;
        }
        let annual_distance = to_decimal(meta.annual_distance_km);
        for (name, man_units_per_year) in &meta.fixed_cost_breakdown {
            let annual = to_decimal(*man_units_per_year) * Decimal::from(MAN_UNIT);
            let per_km = annual / annual_distance;
            let amount = round_currency(per_km * distance_km);
            items.push(CostItem::currency(format!("fixed.{name}"), amount));
        }
        items
    }
}

/// Converts a float to `Decimal` through its shortest display form, so
/// `0.1` becomes exactly `0.1` rather than its binary expansion.
fn to_decimal(value: f64) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    format!("{value}").parse().unwrap_or(Decimal::ZERO)
}

/// Round-half-up to the currency unit.
fn round_currency(value: Decimal) -> i64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

/// Aggregates per-route breakdowns into a fleet-level breakdown.
///
/// Currency items are summed by key (ordered by first appearance);
/// reference rates are display-only and never summed. `total_cost` is
/// recomputed as `fixed_cost + distance_cost` after summation so the
/// round-trip invariant holds at fleet scale too.
pub fn aggregate_breakdowns<'a, I>(breakdowns: I) -> CostBreakdown
where
    I: IntoIterator<Item = &'a CostBreakdown>,
{
    let mut total = CostBreakdown::default();
    let mut energy_sum: Option<f64> = None;
    let mut keys: Vec<String> = Vec::new();
    let mut sums: std::collections::HashMap<String, i64> = std::collections::HashMap::new();

    for b in breakdowns {
        total.fixed_cost += b.fixed_cost;
        total.distance_cost += b.distance_cost;
        total.distance_km += b.distance_km;
        if let Some(kwh) = b.energy_kwh {
            energy_sum = Some(energy_sum.unwrap_or(0.0) + kwh);
        }
        for item in &b.items {
            if let Some(amount) = item.currency_amount() {
                if !sums.contains_key(&item.name) {
                    keys.push(item.name.clone());
                }
                *sums.entry(item.name.clone()).or_insert(0) += amount;
            }
        }
    }

    total.total_cost = total.fixed_cost + total.distance_cost;
    total.energy_kwh = energy_sum;
    total.items = keys
        .into_iter()
        .map(|k| {
            let amount = sums[&k];
            CostItem::currency(k, amount)
        })
        .collect();
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn truck() -> VehicleType {
        VehicleType::new("2t truck", 2000)
            .with_fixed_cost(1000.0)
            .with_per_km_cost(50.0)
    }

    fn rich_meta() -> VehicleCandidate {
        let mut meta = VehicleCandidate::new("2t truck");
        meta.variable_cost_breakdown = vec![("fuel".into(), 12.4), ("damage".into(), 3.3)];
        meta.fixed_cost_breakdown = vec![("insurance".into(), 12.0), ("tax".into(), 4.5)];
        meta.annual_distance_km = 20_000.0;
        meta.hourly_wage = 1500.0;
        meta.average_speed_km_per_h = 30.0;
        meta.loading_time_per_kg = 2.0;
        meta
    }

    #[test]
    fn test_fallback_rounding_half_up() {
        let b = CostCalculator::new().evaluate(&truck(), 450.0, None, 0);
        assert_eq!(b.distance_cost, 23); // 50 * 0.45 = 22.5 → 23
        assert_eq!(b.fixed_cost, 1000);
        assert_eq!(b.total_cost, 1023);
        assert!((b.distance_km - 0.45).abs() < 1e-12);
        assert!(b.energy_kwh.is_none());
        assert!(b.items.is_empty());
    }

    #[test]
    fn test_fixed_cost_per_km_fallback() {
        let v = VehicleType::new("van", 350)
            .with_fixed_cost(100.0)
            .with_fixed_cost_per_km(10.0)
            .with_per_km_cost(20.0);
        let b = CostCalculator::new().evaluate(&v, 2500.0, None, 0);
        assert_eq!(b.fixed_cost, 125); // 100 + 10*2.5
        assert_eq!(b.distance_cost, 50);
        assert_eq!(b.total_cost, 175);
    }

    #[test]
    fn test_itemized_sum_matches_categories() {
        let b = CostCalculator::new().evaluate(&truck(), 12_345.0, Some(&rich_meta()), 800);
        assert_eq!(b.currency_sum("variable."), b.distance_cost);
        assert_eq!(b.currency_sum("fixed."), b.fixed_cost);
        assert_eq!(b.total_cost, b.fixed_cost + b.distance_cost);
    }

    #[test]
    fn test_rich_variable_items() {
        let b = CostCalculator::new().evaluate(&truck(), 10_000.0, Some(&rich_meta()), 600);
        // fuel: 12.4 * 10 = 124; damage: 3.3 * 10 = 33
        // driver: 1500 * 10/30 = 500; loading: 1500 * 600*2/3600 = 500
        let find = |name: &str| {
            b.items
                .iter()
                .find(|i| i.name == name)
                .and_then(|i| i.currency_amount())
        };
        assert_eq!(find("variable.fuel"), Some(124));
        assert_eq!(find("variable.damage"), Some(33));
        assert_eq!(find("variable.driver_labor"), Some(500));
        assert_eq!(find("variable.loading_labor"), Some(500));
        assert_eq!(b.distance_cost, 124 + 33 + 500 + 500);
    }

    #[test]
    fn test_loading_rate_is_reference_not_currency() {
        let b = CostCalculator::new().evaluate(&truck(), 10_000.0, Some(&rich_meta()), 600);
        let rate = b
            .items
            .iter()
            .find(|i| i.name == "variable.loading_labor_per_kg")
            .expect("rate item present");
        assert!(rate.currency_amount().is_none());
        match rate.value {
            CostValue::ReferenceRate(r) => assert!((r - 1500.0 * 2.0 / 3600.0).abs() < 1e-9),
            CostValue::Currency(_) => panic!("loading rate must be a reference rate"),
        }
    }

    #[test]
    fn test_base_fixed_item() {
        let b = CostCalculator::new().evaluate(&truck(), 10_000.0, Some(&rich_meta()), 0);
        let base = b
            .items
            .iter()
            .find(|i| i.name == "fixed.base")
            .and_then(|i| i.currency_amount());
        assert_eq!(base, Some(1000));
        // insurance: 12*10000/20000 * 10 = 60; tax: 4.5*10000/20000 * 10 = 22.5 → 23
        assert_eq!(b.fixed_cost, 60 + 23 + 1000);
    }

    #[test]
    fn test_no_demand_skips_loading_labor() {
        let b = CostCalculator::new().evaluate(&truck(), 10_000.0, Some(&rich_meta()), 0);
        assert!(!b.items.iter().any(|i| i.name == "variable.loading_labor"));
    }

    #[test]
    fn test_energy_rounded_to_3dp() {
        let v = VehicleType::new("ev", 1000).with_energy_consumption(0.5);
        let b = CostCalculator::new().evaluate(&v, 12_345.0, None, 0);
        assert_eq!(b.energy_kwh, Some(6.172)); // 0.5 * 12.345 = 6.1725, banker's → 6.172
    }

    #[test]
    fn test_zero_distance() {
        let b = CostCalculator::new().evaluate(&truck(), 0.0, None, 0);
        assert_eq!(b.distance_cost, 0);
        assert_eq!(b.fixed_cost, 1000);
        assert_eq!(b.total_cost, 1000);
    }

    #[test]
    fn test_aggregate_recomputes_total() {
        let a = CostCalculator::new().evaluate(&truck(), 450.0, None, 0);
        let b = CostCalculator::new().evaluate(&truck(), 1250.0, None, 0);
        let agg = aggregate_breakdowns([&a, &b]);
        assert_eq!(agg.fixed_cost, a.fixed_cost + b.fixed_cost);
        assert_eq!(agg.distance_cost, a.distance_cost + b.distance_cost);
        assert_eq!(agg.total_cost, agg.fixed_cost + agg.distance_cost);
    }

    #[test]
    fn test_aggregate_drops_reference_rates() {
        let a = CostCalculator::new().evaluate(&truck(), 10_000.0, Some(&rich_meta()), 600);
        let agg = aggregate_breakdowns([&a, &a]);
        assert!(!agg
            .items
            .iter()
            .any(|i| i.name == "variable.loading_labor_per_kg"));
        let fuel = agg
            .items
            .iter()
            .find(|i| i.name == "variable.fuel")
            .and_then(|i| i.currency_amount());
        assert_eq!(fuel, Some(248));
    }

    proptest! {
        #[test]
        fn prop_itemized_sum_invariant(
            distance_m in 0.0f64..500_000.0,
            demand in 0i32..5000,
            fuel in 0.0f64..100.0,
            damage in 0.0f64..50.0,
            wage in 0.0f64..5000.0,
            speed in 1.0f64..80.0,
            sec_per_kg in 0.0f64..10.0,
            insurance in 0.0f64..100.0,
            annual_km in 1.0f64..100_000.0,
        ) {
            let mut meta = VehicleCandidate::new("2t truck");
            meta.variable_cost_breakdown =
                vec![("fuel".into(), fuel), ("damage".into(), damage)];
            meta.fixed_cost_breakdown = vec![("insurance".into(), insurance)];
            meta.annual_distance_km = annual_km;
            meta.hourly_wage = wage;
            meta.average_speed_km_per_h = speed;
            meta.loading_time_per_kg = sec_per_kg;

            let b = CostCalculator::new().evaluate(&truck(), distance_m, Some(&meta), demand);
            prop_assert_eq!(b.currency_sum("variable."), b.distance_cost);
            prop_assert_eq!(b.currency_sum("fixed."), b.fixed_cost);
            prop_assert_eq!(b.total_cost, b.fixed_cost + b.distance_cost);
        }
    }
}
