//! Routing outcome value objects.
//!
//! "No feasible route" is an expected domain outcome, so it travels as a
//! [`NoSolution`] value inside the outcome enums — never as an error.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::cost::CostBreakdown;

use super::VehicleType;

/// Why a routing attempt produced no solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoSolutionReason {
    /// No candidate vehicle can carry the total demand.
    Capacity,
    /// A required leg has no path in the graph.
    Disconnected,
    /// No feasible ordering found within the solving budget, or a required
    /// solving capability is unavailable.
    Infeasible,
}

impl Display for NoSolutionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoSolutionReason::Capacity => write!(f, "capacity"),
            NoSolutionReason::Disconnected => write!(f, "disconnected"),
            NoSolutionReason::Infeasible => write!(f, "infeasible"),
        }
    }
}

/// An infeasible routing outcome with a self-explanatory message.
///
/// The message is surfaced verbatim by the UI layer, so it must carry
/// enough detail (shortfalls, resource names) to be actionable on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoSolution {
    /// Failure category.
    pub reason: NoSolutionReason,
    /// Human-readable explanation.
    pub message: String,
}

impl NoSolution {
    /// Creates a failure value.
    pub fn new(reason: NoSolutionReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

/// A single-vehicle routing solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// The vehicle serving the route.
    pub vehicle: VehicleType,
    /// Visiting order: `[depot, pickups..., sink, depot]` for closed
    /// routes, `[start, pickups..., end]` for open ones.
    pub order: Vec<String>,
    /// Total travelled distance in metres.
    pub total_distance_m: f64,
    /// Decimal-exact cost breakdown for the route.
    pub cost: CostBreakdown,
}

impl Solution {
    /// Total cost in currency units.
    pub fn total_cost(&self) -> i64 {
        self.cost.total_cost
    }
}

/// One vehicle's route within a fleet solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleRoute {
    /// The assigned vehicle.
    pub vehicle: VehicleType,
    /// Pickup ids served by this route.
    pub pickup_ids: Vec<String>,
    /// The solved route.
    pub solution: Solution,
}

impl VehicleRoute {
    /// Distance of this route in metres.
    pub fn total_distance_m(&self) -> f64 {
        self.solution.total_distance_m
    }

    /// Cost of this route in currency units.
    pub fn total_cost(&self) -> i64 {
        self.solution.total_cost()
    }
}

/// A composite solution covering multiple vehicles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetSolution {
    /// Per-vehicle routes, in assignment order.
    pub routes: Vec<VehicleRoute>,
    /// Keyed sum over all routes' breakdowns, with `total_cost` recomputed
    /// as `fixed_cost + distance_cost` after summation.
    pub cost: CostBreakdown,
}

impl FleetSolution {
    /// Total cost in currency units.
    pub fn total_cost(&self) -> i64 {
        self.cost.total_cost
    }

    /// Total distance across all routes in metres.
    pub fn total_distance_m(&self) -> f64 {
        self.routes.iter().map(|r| r.total_distance_m()).sum()
    }
}

/// Outcome of a single-vehicle solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RoutingOutcome {
    /// A feasible, cost-evaluated route.
    Feasible(Solution),
    /// No feasible route, with reason and message.
    Infeasible(NoSolution),
}

impl RoutingOutcome {
    /// True for the feasible variant.
    pub fn is_feasible(&self) -> bool {
        matches!(self, RoutingOutcome::Feasible(_))
    }

    /// The solution, if feasible.
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            RoutingOutcome::Feasible(s) => Some(s),
            RoutingOutcome::Infeasible(_) => None,
        }
    }

    /// The failure, if infeasible.
    pub fn failure(&self) -> Option<&NoSolution> {
        match self {
            RoutingOutcome::Feasible(_) => None,
            RoutingOutcome::Infeasible(f) => Some(f),
        }
    }
}

/// Outcome of a fleet solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FleetOutcome {
    /// All assignments solved.
    Feasible(FleetSolution),
    /// At least one assignment failed; nothing partial is returned.
    Infeasible(NoSolution),
}

impl FleetOutcome {
    /// True for the feasible variant.
    pub fn is_feasible(&self) -> bool {
        matches!(self, FleetOutcome::Feasible(_))
    }

    /// The fleet solution, if feasible.
    pub fn fleet(&self) -> Option<&FleetSolution> {
        match self {
            FleetOutcome::Feasible(s) => Some(s),
            FleetOutcome::Infeasible(_) => None,
        }
    }

    /// The failure, if infeasible.
    pub fn failure(&self) -> Option<&NoSolution> {
        match self {
            FleetOutcome::Feasible(_) => None,
            FleetOutcome::Infeasible(f) => Some(f),
        }
    }
}
